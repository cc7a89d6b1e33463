use crate::auth::Credentials;
use crate::error::AttendanceError;
use crate::model::{AttendanceSnapshot, SnapshotScope, WireSnapshot};
use crate::session::AttendanceRemote;
use crate::store;
use reqwest::blocking::{Client, RequestBuilder};
use rusqlite::Connection;

/// Talks to a running `attendanced serve`.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn scoped(&self, req: RequestBuilder, scope: SnapshotScope) -> RequestBuilder {
        match scope.query_value() {
            Some(date) => req.query(&[("date", date)]),
            None => req,
        }
    }

    /// Posts credentials and returns the server's reply text.
    pub fn signup(&self, creds: &Credentials) -> Result<String, AttendanceError> {
        self.post_credentials("/signup", creds)
    }

    pub fn login(&self, creds: &Credentials) -> Result<String, AttendanceError> {
        self.post_credentials("/login", creds)
    }

    fn post_credentials(&self, path: &str, creds: &Credentials) -> Result<String, AttendanceError> {
        let resp = self
            .client
            .post(self.url(path))
            .json(creds)
            .send()
            .map_err(network)?;
        let status = resp.status();
        let text = resp.text().map_err(network)?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(AttendanceError::Network(format!("{status}: {text}")))
        }
    }
}

fn network(e: reqwest::Error) -> AttendanceError {
    AttendanceError::Network(e.to_string())
}

impl AttendanceRemote for HttpRemote {
    fn fetch(&self, scope: SnapshotScope) -> Result<WireSnapshot, AttendanceError> {
        let req = self.scoped(self.client.get(self.url("/attendance")), scope);
        req.send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<WireSnapshot>())
            .map_err(network)
    }

    fn replace(
        &self,
        scope: SnapshotScope,
        snapshot: &AttendanceSnapshot,
    ) -> Result<String, AttendanceError> {
        let req = self.scoped(self.client.post(self.url("/attendance")), scope);
        let resp = req.json(snapshot).send().map_err(network)?;
        let status = resp.status();
        let text = resp.text().map_err(network)?;
        if status.is_success() {
            Ok(text)
        } else if status.is_server_error() {
            Err(AttendanceError::Storage(text))
        } else {
            Err(AttendanceError::Network(format!("{status}: {text}")))
        }
    }
}

/// Reads and writes a workspace database in-process.
pub struct LocalRemote {
    conn: Connection,
}

impl LocalRemote {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl AttendanceRemote for LocalRemote {
    fn fetch(&self, scope: SnapshotScope) -> Result<WireSnapshot, AttendanceError> {
        store::get_all(&self.conn, scope)
            .map(WireSnapshot::from)
            .map_err(|e| AttendanceError::Storage(format!("Error fetching attendance: {e:#}")))
    }

    fn replace(
        &self,
        scope: SnapshotScope,
        snapshot: &AttendanceSnapshot,
    ) -> Result<String, AttendanceError> {
        store::replace_all(&self.conn, scope, snapshot)
            .map(|_| store::SAVE_SUCCESS_MESSAGE.to_string())
            .map_err(|e| AttendanceError::Storage(format!("Error saving attendance: {e:#}")))
    }
}
