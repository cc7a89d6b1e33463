use crate::config::OnLoadError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceSnapshot, SnapshotScope};
use crate::store;
use rusqlite::Connection;
use serde_json::json;
use tracing::{error, info};

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn parse_scope(params: &serde_json::Value) -> Result<SnapshotScope, HandlerErr> {
    let raw = match params.get("date") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => Some(v.as_str().ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: "date must be a string or null".to_string(),
            details: None,
        })?),
    };
    SnapshotScope::from_param(raw).map_err(|e| HandlerErr {
        code: e.code(),
        message: e.to_string(),
        details: None,
    })
}

fn scope_json(scope: SnapshotScope) -> serde_json::Value {
    scope
        .query_value()
        .map(serde_json::Value::String)
        .unwrap_or(serde_json::Value::Null)
}

fn attendance_get_all(
    conn: &Connection,
    params: &serde_json::Value,
    policy: OnLoadError,
) -> Result<serde_json::Value, HandlerErr> {
    let scope = parse_scope(params)?;
    let snapshot = match store::get_all(conn, scope) {
        Ok(s) => s,
        Err(e) => {
            error!("Error fetching attendance: {e:#}");
            match policy {
                OnLoadError::ReturnEmpty => AttendanceSnapshot::new(),
                OnLoadError::Propagate => {
                    return Err(HandlerErr {
                        code: "db_query_failed",
                        message: format!("Error fetching attendance: {e:#}"),
                        details: None,
                    })
                }
            }
        }
    };
    Ok(json!({
        "date": scope_json(scope),
        "records": snapshot,
    }))
}

fn attendance_replace_all(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let scope = parse_scope(params)?;
    let Some(raw) = params.get("records") else {
        return Err(HandlerErr {
            code: "bad_params",
            message: "missing records".to_string(),
            details: None,
        });
    };
    let snapshot: AttendanceSnapshot =
        serde_json::from_value(raw.clone()).map_err(|e| HandlerErr {
            code: "bad_params",
            message: format!("records must map student names to records: {e}"),
            details: None,
        })?;

    let summary = store::replace_all(conn, scope, &snapshot).map_err(|e| {
        error!("Error saving attendance: {e:#}");
        HandlerErr {
            code: "db_update_failed",
            message: format!("Error saving attendance: {e:#}"),
            details: Some(json!({ "table": "attendance" })),
        }
    })?;
    info!(
        ?scope,
        deleted = summary.deleted,
        inserted = summary.inserted,
        "attendance replaced"
    );

    Ok(json!({
        "message": store::SAVE_SUCCESS_MESSAGE,
        "date": scope_json(scope),
        "deleted": summary.deleted,
        "inserted": summary.inserted,
    }))
}

fn handle_attendance_get_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_get_all(conn, &req.params, state.config.on_load_error) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_replace_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_replace_all(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.getAll" => Some(handle_attendance_get_all(state, req)),
        "attendance.replaceAll" => Some(handle_attendance_replace_all(state, req)),
        _ => None,
    }
}
