use std::{env, fmt, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::anyhow;
use tracing::{info, warn};

use crate::auth::DEFAULT_BCRYPT_COST;

/// What a read does when the store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnLoadError {
    /// Answer with an empty roster and log the failure.
    #[default]
    ReturnEmpty,
    /// Surface the failure to the caller.
    Propagate,
}

impl FromStr for OnLoadError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "return_empty" | "returnempty" => Ok(OnLoadError::ReturnEmpty),
            "propagate" => Ok(OnLoadError::Propagate),
            other => Err(format!(
                "unknown load error policy '{other}', expected return_empty or propagate"
            )),
        }
    }
}

impl fmt::Display for OnLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnLoadError::ReturnEmpty => f.write_str("return_empty"),
            OnLoadError::Propagate => f.write_str("propagate"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub workspace: PathBuf,
    pub on_load_error: OnLoadError,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            port: try_load("ATTENDANCE_PORT", "3000")?,
            workspace: try_load("ATTENDANCE_WORKSPACE", ".")?,
            on_load_error: try_load("ATTENDANCE_ON_LOAD_ERROR", "return_empty")?,
            bcrypt_cost: try_load("ATTENDANCE_BCRYPT_COST", &DEFAULT_BCRYPT_COST.to_string())?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            workspace: PathBuf::from("."),
            on_load_error: OnLoadError::default(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("invalid {key} value '{raw}': {e}")
    })
}
