use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use rusqlite::Connection;

use crate::{config::Config, db::open_db};

pub struct State {
    pub config: Config,
    db: Mutex<Connection>,
}

impl State {
    pub fn open(config: Config) -> anyhow::Result<Arc<Self>> {
        let conn = open_db(&config.workspace)?;
        Ok(Self::with_connection(config, conn))
    }

    pub fn with_connection(config: Config, conn: Connection) -> Arc<Self> {
        Arc::new(Self {
            config,
            db: Mutex::new(conn),
        })
    }

    /// Runs `f` with exclusive use of the connection. Requests are serialized
    /// here, so a reader never overlaps a replace transaction.
    pub fn with_db<T>(&self, f: impl FnOnce(&Connection) -> anyhow::Result<T>) -> anyhow::Result<T> {
        let conn = self
            .db
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))?;
        f(&conn)
    }
}
