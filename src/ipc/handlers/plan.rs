use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{assignments_json, required_date, warnings_json};
use crate::ipc::types::{AppState, Request};
use crate::persistence::document_key;
use serde_json::json;

fn handle_plan_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let date = match required_date(req, "date") {
        Ok(v) => v,
        Err(e) => return e,
    };

    state.board.select_date(date);
    let board = &state.board;
    ok(
        &req.id,
        json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "key": document_key(date),
            "assignments": assignments_json(board.assignments()),
            "warnings": warnings_json(board.load_warnings()),
            "durable": board.persistence().is_durable(),
            "persistenceWarning": board.persistence_warning().map(|e| e.to_string()),
        }),
    )
}

fn handle_plan_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = state.board.session();
    ok(
        &req.id,
        json!({
            "date": session.current_date.format("%Y-%m-%d").to_string(),
            "key": document_key(session.current_date),
            "assignments": assignments_json(&session.assignments),
            "warnings": warnings_json(state.board.load_warnings()),
        }),
    )
}

fn handle_plan_dates(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.board.persistence().stored_dates() {
        Ok(dates) => {
            let dates: Vec<String> = dates
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect();
            ok(&req.id, json!({ "dates": dates }))
        }
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "plan.open" => Some(handle_plan_open(state, req)),
        "plan.get" => Some(handle_plan_get(state, req)),
        "plan.dates" => Some(handle_plan_dates(state, req)),
        _ => None,
    }
}
