use crate::auth::Session;
use crate::error::StoreError;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::store::Student;
use rusqlite::Connection;
use serde_json::json;

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn db_conn_mut<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Connection, serde_json::Value> {
    state
        .db
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn current_session(state: &AppState, req: &Request) -> Result<Session, serde_json::Value> {
    state
        .session
        .clone()
        .ok_or_else(|| err(&req.id, "not_logged_in", "log in first", None))
}

/// Resolves the session and rejects anything but an admin.
pub fn admin_session(state: &AppState, req: &Request) -> Result<Session, serde_json::Value> {
    let session = current_session(state, req)?;
    session.require_admin().map_err(|e| store_err(req, e))?;
    Ok(session)
}

pub fn store_err(req: &Request, e: StoreError) -> serde_json::Value {
    err(&req.id, e.code(), e.to_string(), e.details())
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Like `required_str` but also rejects blank strings.
pub fn required_text(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    let v = required_str(req, key)?;
    if v.trim().is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", key),
            None,
        ));
    }
    Ok(v)
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    match req.params.get(key) {
        Some(v) => v.as_i64().ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be an integer", key),
                Some(json!({ key: v })),
            )
        }),
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn optional_i64(req: &Request, key: &str) -> Result<Option<i64>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => required_i64(req, key).map(Some),
    }
}

pub fn optional_f64(req: &Request, key: &str) -> Result<Option<f64>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a number", key),
                Some(json!({ key: v })),
            )
        }),
    }
}

pub fn student_json(s: &Student) -> serde_json::Value {
    let mut v = json!(s);
    v["hasCredential"] = json!(s.has_credential());
    v
}
