use crate::export::csv_file_name;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::optional_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_timeline_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!(state.board.timeline()))
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let file_name = csv_file_name(state.board.current_date());
    let out_path = optional_str(req, "outPath")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let out_dir = optional_str(req, "outDir")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);

    let csv = state.board.export_csv();
    let rows_exported = state.board.assignments().len();

    let Some(out) = out_path.or_else(|| out_dir.map(|d| d.join(&file_name))) else {
        return ok(
            &req.id,
            json!({
                "fileName": file_name,
                "rowsExported": rows_exported,
                "csv": csv,
            }),
        );
    };

    if let Some(parent) = out.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out.to_string_lossy() })),
            );
        }
    }
    if let Err(e) = std::fs::write(&out, csv) {
        return err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": out.to_string_lossy() })),
        );
    }

    ok(
        &req.id,
        json!({
            "fileName": file_name,
            "rowsExported": rows_exported,
            "path": out.to_string_lossy(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timeline.get" => Some(handle_timeline_get(state, req)),
        "export.csv" => Some(handle_export_csv(state, req)),
        _ => None,
    }
}
