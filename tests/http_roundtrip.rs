use std::net::SocketAddr;
use std::sync::mpsc;

use attendanced::auth::Credentials;
use attendanced::config::{Config, OnLoadError};
use attendanced::db::open_in_memory;
use attendanced::error::AttendanceError;
use attendanced::model::{AttendanceRecord, AttendanceSnapshot, SnapshotScope};
use attendanced::remote::HttpRemote;
use attendanced::server::{serve_on, State};
use attendanced::session::{AttendanceRemote, AttendanceSession, LoadOutcome, SessionOptions};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;

/// Starts a server on an ephemeral port in its own thread and runtime.
fn spawn_server() -> String {
    let config = Config {
        bcrypt_cost: 4,
        ..Config::default()
    };
    spawn_server_with(config, open_in_memory().expect("db"))
}

fn spawn_server_with(config: Config, conn: Connection) -> String {
    let (tx, rx) = mpsc::channel::<SocketAddr>();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        rt.block_on(async move {
            let state = State::with_connection(config, conn);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind");
            tx.send(listener.local_addr().expect("addr")).expect("send addr");
            serve_on(listener, state, std::future::pending())
                .await
                .expect("serve");
        });
    });
    let addr = rx.recv().expect("server address");
    format!("http://{addr}")
}

/// A server whose attendance table is gone, so every store call fails.
fn spawn_broken_server(on_load_error: OnLoadError) -> String {
    let conn = open_in_memory().expect("db");
    conn.execute("DROP TABLE attendance", []).expect("drop table");
    let config = Config {
        on_load_error,
        ..Config::default()
    };
    spawn_server_with(config, conn)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn session_saves_and_reloads_over_http() {
    let remote = HttpRemote::new(spawn_server());

    let mut session = AttendanceSession::new(&remote, SessionOptions::default());
    assert_eq!(session.load().unwrap(), LoadOutcome::Loaded { students: 0 });
    session.add_student("Alice").unwrap();
    assert!(session.toggle_period("Alice", 1).unwrap());
    assert!(session.toggle_period("Alice", 2).unwrap());
    let outcome = session.save().unwrap();
    assert_eq!(outcome.message, "Attendance saved successfully");
    assert!(outcome.confirmed);

    let mut fresh = AttendanceSession::new(&remote, SessionOptions::default());
    fresh.load().unwrap();
    assert_eq!(fresh.total_present("Alice"), Some(2));

    let carol = AttendanceSnapshot::from_records(vec![AttendanceRecord::with_periods("Carol", &[7])]);
    remote.replace(SnapshotScope::Undated, &carol).unwrap();
    let stored = AttendanceSnapshot::from(remote.fetch(SnapshotScope::Undated).unwrap());
    assert_eq!(stored, carol);
}

#[test]
fn dated_scope_is_separate_from_undated() {
    let remote = HttpRemote::new(spawn_server());
    let dan = AttendanceSnapshot::from_records(vec![AttendanceRecord::with_periods("Dan", &[1])]);
    remote
        .replace(SnapshotScope::Day(day(2024, 3, 15)), &dan)
        .unwrap();

    let undated = AttendanceSnapshot::from(remote.fetch(SnapshotScope::Undated).unwrap());
    assert!(undated.is_empty());
    let dated = AttendanceSnapshot::from(remote.fetch(SnapshotScope::Day(day(2024, 3, 15))).unwrap());
    assert_eq!(dated, dan);
}

#[test]
fn malformed_payloads_get_400() {
    let base = spawn_server();
    let client = reqwest::blocking::Client::new();

    let resp = client
        .post(format!("{base}/attendance"))
        .json(&json!({ "  ": { "studentName": "", "period1": true } }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = client
        .post(format!("{base}/attendance"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = client
        .get(format!("{base}/attendance?date=15-03-2024"))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let remote = HttpRemote::new(base);
    let empty = AttendanceSnapshot::from(remote.fetch(SnapshotScope::Undated).unwrap());
    assert!(empty.is_empty());
}

#[test]
fn accounts_over_http() {
    let remote = HttpRemote::new(spawn_server());
    let creds = Credentials {
        email: "staff@school.test".to_string(),
        password: "secret1".to_string(),
    };
    assert_eq!(remote.signup(&creds).unwrap(), "User registered");
    assert_eq!(remote.signup(&creds).unwrap(), "Email already exists");
    assert_eq!(remote.login(&creds).unwrap(), "Login success");

    let wrong = Credentials {
        password: "secret2".to_string(),
        ..creds.clone()
    };
    assert_eq!(remote.login(&wrong).unwrap(), "Wrong password");
    let stranger = Credentials {
        email: "nobody@school.test".to_string(),
        ..creds
    };
    assert_eq!(remote.login(&stranger).unwrap(), "User not found");
}

#[test]
fn unreachable_server_falls_back_to_empty() {
    let remote = HttpRemote::new("http://127.0.0.1:9");
    let mut session = AttendanceSession::new(&remote, SessionOptions::default());
    match session.load().unwrap() {
        LoadOutcome::FellBackToEmpty(AttendanceError::Network(_)) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(session.snapshot().is_empty());

    session.add_student("Alice").unwrap();
    assert!(matches!(session.save(), Err(AttendanceError::Network(_))));
}

#[test]
fn storage_failure_reads_as_empty_by_default() {
    let base = spawn_broken_server(OnLoadError::ReturnEmpty);
    let resp = reqwest::blocking::get(format!("{base}/attendance")).unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().unwrap(), "{}");

    let remote = HttpRemote::new(base);
    let mut session = AttendanceSession::new(&remote, SessionOptions::default());
    assert_eq!(session.load().unwrap(), LoadOutcome::Loaded { students: 0 });
}

#[test]
fn storage_failure_is_500_when_propagated() {
    let base = spawn_broken_server(OnLoadError::Propagate);
    let resp = reqwest::blocking::get(format!("{base}/attendance")).unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    let text = resp.text().unwrap();
    assert!(text.starts_with("Error fetching attendance:"), "{text}");
}

#[test]
fn failed_save_answers_500_with_error_text() {
    let base = spawn_broken_server(OnLoadError::ReturnEmpty);
    let client = reqwest::blocking::Client::new();
    let resp = client
        .post(format!("{base}/attendance"))
        .json(&json!({ "Alice": { "studentName": "Alice", "period1": true } }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    let text = resp.text().unwrap();
    assert!(text.starts_with("Error saving attendance:"), "{text}");
    assert!(text.contains("no such table"), "{text}");

    let remote = HttpRemote::new(base);
    let alice = AttendanceSnapshot::from_records(vec![AttendanceRecord::with_periods("Alice", &[1])]);
    match remote.replace(SnapshotScope::Undated, &alice) {
        Err(AttendanceError::Storage(text)) => {
            assert!(text.starts_with("Error saving attendance:"), "{text}")
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let mut session = AttendanceSession::new(&remote, SessionOptions::default());
    session.load().unwrap();
    session.add_student("Alice").unwrap();
    assert!(matches!(session.save(), Err(AttendanceError::Storage(_))));
    assert!(session.snapshot().contains("Alice"));
}

#[test]
fn cross_origin_requests_are_allowed() {
    let base = spawn_server();
    let resp = reqwest::blocking::Client::new()
        .get(format!("{base}/attendance"))
        .header("origin", "http://localhost:5173")
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
