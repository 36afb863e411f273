use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    admin_session, current_session, db_conn, optional_i64, required_i64, required_text, store_err,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, DEFAULT_MAX_MARKS};
use serde_json::json;

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = current_session(state, req) {
        return e;
    }

    match store::list_subjects(conn) {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => store_err(req, e),
    }
}

fn handle_subjects_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = current_session(state, req) {
        return e;
    }
    let term = match required_text(req, "term") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match store::search_subjects(conn, &term) {
        Ok(subjects) => ok(&req.id, json!({ "term": term.trim(), "subjects": subjects })),
        Err(e) => store_err(req, e),
    }
}

fn handle_subjects_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = current_session(state, req) {
        return e;
    }
    let subject_id = match required_i64(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match store::require_subject(conn, subject_id) {
        Ok(subject) => ok(&req.id, json!({ "subject": subject })),
        Err(e) => store_err(req, e),
    }
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = admin_session(state, req) {
        return e;
    }
    let name = match required_text(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let max_marks = match optional_i64(req, "maxMarks") {
        Ok(v) => v.unwrap_or(DEFAULT_MAX_MARKS),
        Err(e) => return e,
    };
    if max_marks <= 0 {
        return err(
            &req.id,
            "bad_params",
            "maxMarks must be a positive integer",
            Some(json!({ "maxMarks": max_marks })),
        );
    }

    match store::create_subject(conn, &name, max_marks) {
        Ok(subject) => {
            tracing::info!(subject_id = subject.id, name = %subject.name, "subject created");
            ok(&req.id, json!({ "subject": subject }))
        }
        Err(e) => store_err(req, e),
    }
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = admin_session(state, req) {
        return e;
    }
    let subject_id = match required_i64(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match store::delete_subject(conn, subject_id) {
        Ok(()) => {
            tracing::info!(subject_id, "subject deleted");
            ok(&req.id, json!({ "deleted": subject_id }))
        }
        Err(e) => store_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.search" => Some(handle_subjects_search(state, req)),
        "subjects.get" => Some(handle_subjects_get(state, req)),
        "subjects.create" => Some(handle_subjects_create(state, req)),
        "subjects.delete" => Some(handle_subjects_delete(state, req)),
        _ => None,
    }
}
