use crate::auth;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{admin_session, db_conn, required_i64, required_str, store_err};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_login_admin(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match auth::login_admin(conn, username.trim(), &password) {
        Ok(session) => {
            tracing::info!(username = %username.trim(), "admin logged in");
            let result = json!({ "session": session });
            state.session = Some(session);
            ok(&req.id, result)
        }
        Err(e) => {
            tracing::warn!(username = %username.trim(), "admin login rejected");
            store_err(req, e)
        }
    }
}

fn handle_login_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = req.params.get("password").and_then(|v| v.as_str());

    match auth::login_student(conn, student_id, password) {
        Ok(session) => {
            tracing::info!(student_id, "student logged in");
            let result = json!({ "session": session });
            state.session = Some(session);
            ok(&req.id, result)
        }
        Err(e) => {
            tracing::warn!(student_id, code = e.code(), "student login rejected");
            store_err(req, e)
        }
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let was_logged_in = state.session.take().is_some();
    ok(&req.id, json!({ "loggedOut": was_logged_in }))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "session": state.session }))
}

fn handle_change_admin_password(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let session = match admin_session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if password.is_empty() {
        return err(&req.id, "bad_params", "password must not be empty", None);
    }

    match auth::change_admin_password(conn, &session, &password) {
        Ok(()) => ok(&req.id, json!({})),
        Err(e) => store_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.loginAdmin" => Some(handle_login_admin(state, req)),
        "auth.loginStudent" => Some(handle_login_student(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        "auth.changeAdminPassword" => Some(handle_change_admin_password(state, req)),
        _ => None,
    }
}
