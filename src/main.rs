use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use attendanced::auth::{self, Credentials};
use attendanced::config::{Config, OnLoadError};
use attendanced::db;
use attendanced::ipc;
use attendanced::model::DAY_KEY_FORMAT;
use attendanced::remote::{HttpRemote, LocalRemote};
use attendanced::roll::run_roll;
use attendanced::server::start_server;
use attendanced::session::{AttendanceRemote, AttendanceSession, ScopeMode, SessionOptions};

#[derive(Parser)]
#[command(name = "attendanced", version, about = "Seven-period attendance tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Answer line-delimited JSON requests on stdin (default)
    Sidecar,
    /// Take attendance interactively
    Roll(RollArgs),
    /// Register an account on a running server
    Signup {
        #[command(flatten)]
        account: AccountArgs,
        #[arg(long)]
        confirm: String,
    },
    /// Check credentials against a running server
    Login {
        #[command(flatten)]
        account: AccountArgs,
    },
}

#[derive(Args)]
struct RollArgs {
    /// Server to talk to
    #[arg(long, conflicts_with = "workspace")]
    url: Option<String>,
    /// Open a workspace directly instead of a server
    #[arg(long)]
    workspace: Option<PathBuf>,
    /// Keep a separate roster for each date
    #[arg(long)]
    per_day: bool,
    #[arg(long, default_value = "return_empty")]
    on_load_error: OnLoadError,
    /// Display date, YYYY-MM-DD
    #[arg(long)]
    date: Option<String>,
}

#[derive(Args)]
struct AccountArgs {
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
}

fn main() -> anyhow::Result<()> {
    // stdout carries protocol and table output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Sidecar) {
        Command::Serve { port, workspace } => {
            let mut config = Config::load()?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(workspace) = workspace {
                config.workspace = workspace;
            }
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start runtime")?
                .block_on(start_server(config))
        }
        Command::Sidecar => {
            let mut state = ipc::AppState::new(Config::load()?);
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            ipc::run(&mut state, stdin.lock(), &mut stdout)?;
            Ok(())
        }
        Command::Roll(args) => roll(args),
        Command::Signup { account, confirm } => {
            let creds = auth::validate_signup(&account.email, &account.password, &confirm)?;
            let reply = HttpRemote::new(account.url).signup(&creds)?;
            println!("{reply}");
            Ok(())
        }
        Command::Login { account } => {
            let creds: Credentials = auth::validate_login(&account.email, &account.password)?;
            let reply = HttpRemote::new(account.url).login(&creds)?;
            println!("{reply}");
            Ok(())
        }
    }
}

fn roll(args: RollArgs) -> anyhow::Result<()> {
    let options = SessionOptions {
        on_load_error: args.on_load_error,
        scope_mode: if args.per_day {
            ScopeMode::PerDay
        } else {
            ScopeMode::Undated
        },
    };
    let date = args
        .date
        .as_deref()
        .map(|d| NaiveDate::parse_from_str(d, DAY_KEY_FORMAT))
        .transpose()
        .context("--date must be YYYY-MM-DD")?;

    match (args.url, args.workspace) {
        (_, Some(workspace)) => {
            info!("Opening workspace {}", workspace.to_string_lossy());
            let remote = LocalRemote::new(db::open_db(&workspace)?);
            roll_with(remote, options, date)
        }
        (url, None) => {
            let url = url.unwrap_or_else(|| "http://localhost:3000".to_string());
            info!("Using server {url}");
            roll_with(HttpRemote::new(url), options, date)
        }
    }
}

fn roll_with<R: AttendanceRemote>(
    remote: R,
    options: SessionOptions,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let mut session = match date {
        Some(date) => AttendanceSession::with_date(remote, options, date),
        None => AttendanceSession::new(remote, options),
    };
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_roll(&mut session, stdin.lock(), &mut stdout)?;
    stdout.flush()?;
    Ok(())
}
