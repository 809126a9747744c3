use crate::ipc::error::err;
use crate::ipc::helpers::{applied_response, assignments_json, diagnostics_json};
use crate::ipc::types::{AppState, Request};
use crate::reconcile::{CommitPolicy, GridRow};
use serde_json::{json, Map, Value as JsonValue};

const GRID_COMMIT_MAX_ROWS: usize = 2000;

fn cell(obj: &Map<String, JsonValue>, key: &str) -> Option<String> {
    match obj.get(key) {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn read_rows(req: &Request) -> Result<Vec<GridRow>, JsonValue> {
    let Some(rows_arr) = req.params.get("rows").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "missing rows[]", None));
    };
    if rows_arr.len() > GRID_COMMIT_MAX_ROWS {
        return Err(err(
            &req.id,
            "bad_params",
            "grid payload has too many rows",
            Some(json!({
                "rows": rows_arr.len(),
                "maxRows": GRID_COMMIT_MAX_ROWS
            })),
        ));
    }

    let mut rows = Vec::with_capacity(rows_arr.len());
    for (i, row) in rows_arr.iter().enumerate() {
        let Some(obj) = row.as_object() else {
            return Err(err(
                &req.id,
                "bad_params",
                format!("row {} must be an object", i + 1),
                None,
            ));
        };
        rows.push(GridRow {
            id: cell(obj, "id"),
            technician: cell(obj, "technician"),
            task: cell(obj, "task"),
            start: cell(obj, "start"),
            end: cell(obj, "end"),
            notes: cell(obj, "notes"),
        });
    }
    Ok(rows)
}

fn read_policy(req: &Request) -> Result<CommitPolicy, JsonValue> {
    match req.params.get("policy").and_then(|v| v.as_str()) {
        None => Ok(CommitPolicy::default()),
        Some(s) => CommitPolicy::parse(s).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "policy must be one of: allOrNothing, dropInvalidRows",
                Some(json!({ "policy": s })),
            )
        }),
    }
}

fn handle_grid_commit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let rows = match read_rows(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let policy = match read_policy(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let outcome = state.board.replace_all(&rows, policy);
    let diagnostics = diagnostics_json(&outcome.batch.diagnostics);

    if !outcome.committed {
        let rejected = outcome.batch.diagnostics.len();
        return err(
            &req.id,
            "validation_failed",
            format!("{} row(s) rejected; nothing was committed", rejected),
            Some(json!({
                "policy": policy.as_str(),
                "diagnostics": diagnostics,
                "skippedRows": outcome.batch.skipped,
                "assignments": assignments_json(state.board.assignments()),
            })),
        );
    }

    let result = json!({
        "committed": true,
        "policy": policy.as_str(),
        "committedCount": outcome.batch.committed.len(),
        "diagnostics": diagnostics,
        "skippedRows": outcome.batch.skipped,
    });
    applied_response(req, &state.board, result, &outcome.write)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grid.commit" => Some(handle_grid_commit(state, req)),
        _ => None,
    }
}
