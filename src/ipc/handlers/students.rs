use crate::auth;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    admin_session, current_session, db_conn, optional_str, required_i64, required_text,
    store_err, student_json,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, NewStudent, StudentPatch};
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = admin_session(state, req) {
        return e;
    }

    match store::list_students(conn) {
        Ok(students) => ok(
            &req.id,
            json!({ "students": students.iter().map(student_json).collect::<Vec<_>>() }),
        ),
        Err(e) => store_err(req, e),
    }
}

fn handle_students_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = admin_session(state, req) {
        return e;
    }
    let term = match required_text(req, "term") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match store::search_students(conn, &term) {
        Ok(students) => ok(
            &req.id,
            json!({
                "term": term.trim(),
                "students": students.iter().map(student_json).collect::<Vec<_>>()
            }),
        ),
        Err(e) => store_err(req, e),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let session = match current_session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = session.require_student_or_admin(student_id) {
        return store_err(req, e);
    }

    match store::require_student(conn, student_id) {
        Ok(s) => ok(&req.id, json!({ "student": student_json(&s) })),
        Err(e) => store_err(req, e),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = admin_session(state, req) {
        return e;
    }
    let first_name = match required_text(req, "firstName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let last_name = match required_text(req, "lastName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_section = optional_str(req, "classSection").filter(|s| !s.trim().is_empty());
    let credential = optional_str(req, "password")
        .filter(|p| !p.is_empty())
        .map(|p| auth::hash_credential(&p));

    let new = NewStudent {
        first_name,
        last_name,
        class_section,
        credential,
    };
    match store::create_student(conn, &new) {
        Ok(s) => {
            tracing::info!(student_id = s.id, name = %s.display_name(), "student created");
            ok(&req.id, json!({ "student": student_json(&s) }))
        }
        Err(e) => store_err(req, e),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = admin_session(state, req) {
        return e;
    }
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let patch = StudentPatch {
        first_name: optional_str(req, "firstName"),
        last_name: optional_str(req, "lastName"),
        class_section: optional_str(req, "classSection"),
        credential: optional_str(req, "password")
            .filter(|p| !p.is_empty())
            .map(|p| auth::hash_credential(&p)),
    };
    match store::update_student(conn, student_id, &patch) {
        Ok(s) => {
            tracing::info!(student_id, "student updated");
            ok(&req.id, json!({ "student": student_json(&s) }))
        }
        Err(e) => store_err(req, e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = admin_session(state, req) {
        return e;
    }
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match store::delete_student(conn, student_id) {
        Ok(()) => {
            tracing::info!(student_id, "student deleted");
            ok(&req.id, json!({ "deleted": student_id }))
        }
        Err(e) => store_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.search" => Some(handle_students_search(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
