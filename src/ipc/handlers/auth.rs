use crate::auth;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::error;

fn get_required_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing {}", key))
}

fn handle_signup(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (email, password) = match (
        get_required_str(&req.params, "email"),
        get_required_str(&req.params, "password"),
    ) {
        (Ok(e), Ok(p)) => (e, p),
        (Err(m), _) | (_, Err(m)) => return err(&req.id, "bad_params", m, None),
    };
    match auth::register(conn, email, password, state.config.bcrypt_cost) {
        Ok(outcome) => ok(&req.id, json!({ "message": outcome.message() })),
        Err(e) => {
            error!("Error registering user: {e:#}");
            err(&req.id, "db_update_failed", format!("{e:#}"), None)
        }
    }
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (email, password) = match (
        get_required_str(&req.params, "email"),
        get_required_str(&req.params, "password"),
    ) {
        (Ok(e), Ok(p)) => (e, p),
        (Err(m), _) | (_, Err(m)) => return err(&req.id, "bad_params", m, None),
    };
    match auth::verify(conn, email, password) {
        Ok(outcome) => ok(&req.id, json!({ "message": outcome.message() })),
        Err(e) => {
            error!("Error verifying login: {e:#}");
            err(&req.id, "db_query_failed", format!("{e:#}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.signup" => Some(handle_signup(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        _ => None,
    }
}
