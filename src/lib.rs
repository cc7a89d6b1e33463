//! Seven-period attendance tracking backed by a SQLite workspace.
//!
//! The store keeps one roster per scope and only ever replaces it whole.
//! [`session::AttendanceSession`] edits a roster in memory against any
//! [`session::AttendanceRemote`]; the HTTP server and the stdio sidecar
//! expose the same store and account functions.
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ipc;
pub mod model;
pub mod remote;
pub mod render;
pub mod roll;
pub mod server;
pub mod session;
pub mod store;
