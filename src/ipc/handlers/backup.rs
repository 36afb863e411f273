use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{admin_session, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_export_workspace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Err(e) = admin_session(state, req) {
        return e;
    }
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => {
            tracing::info!(out = %out_path.to_string_lossy(), "workspace exported");
            ok(
                &req.id,
                json!({
                    "bundleFormat": summary.bundle_format,
                    "entryCount": summary.entry_count,
                    "dbSha256": summary.db_sha256,
                    "outPath": out_path.to_string_lossy(),
                }),
            )
        }
        Err(e) => err(&req.id, "backup_export_failed", format!("{e:#}"), None),
    }
}

fn handle_import_workspace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Err(e) = admin_session(state, req) {
        return e;
    }
    let in_path = match required_str(req, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    // Release the file before it is replaced.
    state.db = None;
    state.session = None;

    let imported = backup::import_workspace_bundle(&in_path, &workspace);
    let reopened = crate::ipc::open_workspace(state, &workspace);

    match (imported, reopened) {
        (Ok(summary), Ok(())) => {
            tracing::info!(source = %in_path.to_string_lossy(), "workspace imported");
            ok(
                &req.id,
                json!({
                    "bundleFormatDetected": summary.bundle_format_detected,
                    "workspacePath": workspace.to_string_lossy(),
                }),
            )
        }
        (Err(e), _) => err(&req.id, "backup_import_failed", format!("{e:#}"), None),
        (Ok(_), Err(e)) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspace" => Some(handle_export_workspace(state, req)),
        "backup.importWorkspace" => Some(handle_import_workspace(state, req)),
        _ => None,
    }
}
