use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::plan::DISPLAY_TIME_FORMAT;
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let board = &state.board;
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "durable": board.persistence().is_durable(),
            "persistenceWarning": board.persistence_warning().map(|e| e.to_string()),
            "currentDate": board.current_date().format("%Y-%m-%d").to_string(),
            "key": board.current_key(),
        }),
    )
}

fn handle_master_data_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let master = state.board.master();
    let hm = |t: chrono::NaiveTime| t.format(DISPLAY_TIME_FORMAT).to_string();
    ok(
        &req.id,
        json!({
            "roster": master.roster(),
            "catalog": master.catalog(),
            "displayOrder": master.display_order(),
            "shift": {
                "regularStart": hm(state.shift.regular_start),
                "regularEnd": hm(state.shift.regular_end),
                "overtimeEnd": hm(state.shift.overtime_end),
                "defaultStart": hm(state.shift.regular_start),
                "defaultEnd": hm(state.shift.regular_end),
            }
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "masterData.get" => Some(handle_master_data_get(state, req)),
        _ => None,
    }
}
