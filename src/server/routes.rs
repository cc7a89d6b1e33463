use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State as AxumState},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tokio::task::spawn_blocking;
use tracing::{error, info};

use super::{error::AppError, state::State};
use crate::{
    auth::{self, Credentials, LoginOutcome, SignupOutcome},
    config::OnLoadError,
    model::{AttendanceSnapshot, SnapshotScope},
    store,
};

#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    date: Option<String>,
}

impl ScopeQuery {
    fn scope(&self) -> Result<SnapshotScope, AppError> {
        SnapshotScope::from_param(self.date.as_deref())
            .map_err(|e| AppError::MalformedPayload(e.to_string()))
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::MalformedPayload(e.to_string()))
}

pub async fn health_handler(AxumState(state): AxumState<Arc<State>>) -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.config.workspace.to_string_lossy(),
    }))
}

pub async fn get_attendance_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<AttendanceSnapshot>, AppError> {
    let scope = query.scope()?;
    let policy = state.config.on_load_error;
    let fetched = spawn_blocking(move || state.with_db(|conn| store::get_all(conn, scope)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    match fetched {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(e) => {
            error!("Error fetching attendance: {e:#}");
            match policy {
                OnLoadError::ReturnEmpty => Ok(Json(AttendanceSnapshot::new())),
                OnLoadError::Propagate => {
                    Err(AppError::Storage(format!("Error fetching attendance: {e:#}")))
                }
            }
        }
    }
}

pub async fn save_attendance_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(query): Query<ScopeQuery>,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let scope = query.scope()?;
    let snapshot: AttendanceSnapshot = parse_body(&body)?;

    let summary = spawn_blocking(move || {
        state.with_db(|conn| store::replace_all(conn, scope, &snapshot))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
    .map_err(|e| {
        error!("Error saving attendance: {e:#}");
        AppError::Storage(format!("Error saving attendance: {e:#}"))
    })?;

    info!(
        ?scope,
        deleted = summary.deleted,
        inserted = summary.inserted,
        "attendance replaced"
    );
    Ok(store::SAVE_SUCCESS_MESSAGE)
}

pub async fn signup_handler(
    AxumState(state): AxumState<Arc<State>>,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let creds: Credentials = parse_body(&body)?;
    if creds.email.is_empty() || creds.password.is_empty() {
        return Err(AppError::MalformedPayload(
            "email and password are required".to_string(),
        ));
    }

    let outcome = spawn_blocking(move || -> anyhow::Result<SignupOutcome> {
        if state.with_db(|conn| auth::email_exists(conn, &creds.email))? {
            return Ok(SignupOutcome::EmailTaken);
        }
        let hash = auth::hash_password(&creds.password, state.config.bcrypt_cost)?;
        state.with_db(|conn| auth::insert_user(conn, &creds.email, &hash))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
    .map_err(|e| {
        error!("Error registering user: {e:#}");
        AppError::Internal(format!("{e:#}"))
    })?;

    if outcome == SignupOutcome::Registered {
        info!("user registered");
    }
    Ok(outcome.message())
}

pub async fn login_handler(
    AxumState(state): AxumState<Arc<State>>,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let creds: Credentials = parse_body(&body)?;

    let outcome = spawn_blocking(move || -> anyhow::Result<LoginOutcome> {
        let Some(hash) = state.with_db(|conn| auth::password_hash_for(conn, &creds.email))? else {
            return Ok(LoginOutcome::UserNotFound);
        };
        if auth::check_password(&creds.password, &hash)? {
            Ok(LoginOutcome::Success)
        } else {
            Ok(LoginOutcome::WrongPassword)
        }
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
    .map_err(|e| {
        error!("Error verifying login: {e:#}");
        AppError::Internal(format!("{e:#}"))
    })?;

    Ok(outcome.message())
}
