use crate::ipc::error::plan_err;
use crate::ipc::helpers::{
    applied_response, assignment_json, optional_str, required_str, required_time,
};
use crate::ipc::types::{AppState, Request};
use crate::plan::NewAssignment;
use serde_json::json;

fn read_new_assignment(req: &Request) -> Result<NewAssignment, serde_json::Value> {
    Ok(NewAssignment {
        technician: required_str(req, "technician")?,
        task: required_str(req, "task")?,
        start: required_time(req, "start")?,
        end: required_time(req, "end")?,
        notes: optional_str(req, "notes").unwrap_or_default(),
    })
}

fn handle_assignments_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let input = match read_new_assignment(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match state.board.add(input) {
        Ok(applied) => applied_response(
            req,
            &state.board,
            json!({ "assignment": assignment_json(&applied.value) }),
            &applied.write,
        ),
        Err(e) => plan_err(&req.id, &e, None),
    }
}

fn handle_assignments_remove_last(state: &mut AppState, req: &Request) -> serde_json::Value {
    let applied = state.board.remove_last();
    applied_response(
        req,
        &state.board,
        json!({ "removed": applied.value.as_ref().map(assignment_json) }),
        &applied.write,
    )
}

fn handle_assignments_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let applied = state.board.clear();
    applied_response(
        req,
        &state.board,
        json!({ "removedCount": applied.value }),
        &applied.write,
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.add" => Some(handle_assignments_add(state, req)),
        "assignments.removeLast" => Some(handle_assignments_remove_last(state, req)),
        "assignments.clear" => Some(handle_assignments_clear(state, req)),
        _ => None,
    }
}
