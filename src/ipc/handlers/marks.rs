use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    current_session, db_conn, db_conn_mut, required_i64, store_err, student_json,
};
use crate::ipc::types::{AppState, Request};
use crate::marks;
use serde_json::json;

fn handle_marks_record(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match current_session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_i64(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let value = match required_i64(req, "value") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn_mut(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match marks::record_mark(conn, &session, student_id, subject_id, value) {
        Ok(mark) => ok(&req.id, json!({ "mark": mark })),
        Err(e) => store_err(req, e),
    }
}

fn handle_marks_marksheet(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    match calc::student_marksheet(conn, student_id) {
        Ok(sheet) => ok(
            &req.id,
            json!({
                "student": student_json(&sheet.student),
                "lines": sheet.lines,
                "totalObtained": sheet.total_obtained,
                "totalMax": sheet.total_max,
                "percentage": sheet.percentage,
            }),
        ),
        Err(e) => store_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marks.record" => Some(handle_marks_record(state, req)),
        "marks.marksheet" => Some(handle_marks_marksheet(state, req)),
        _ => None,
    }
}
