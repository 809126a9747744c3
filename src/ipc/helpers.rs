use crate::board::Board;
use crate::ipc::error::{err, ok, plan_err};
use crate::ipc::types::Request;
use crate::persistence::{LoadWarning, WriteStatus};
use crate::plan::{parse_time_text, Assignment, PlanError, STORED_TIME_FORMAT};
use crate::reconcile::RowError;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value as JsonValue};

pub fn required_str(req: &Request, key: &str) -> Result<String, JsonValue> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

pub fn required_date(req: &Request, key: &str) -> Result<NaiveDate, JsonValue> {
    let raw = required_str(req, key)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        err(
            &req.id,
            "bad_params",
            format!("{} must be YYYY-MM-DD", key),
            Some(json!({ "field": key, "value": raw })),
        )
    })
}

pub fn required_time(req: &Request, key: &str) -> Result<NaiveTime, JsonValue> {
    let raw = required_str(req, key)?;
    parse_time_text(&raw).map_err(|e| plan_err(&req.id, &e, Some(json!({ "field": key }))))
}

pub fn assignment_json(a: &Assignment) -> JsonValue {
    json!({
        "id": a.id,
        "technician": a.technician,
        "task": a.task,
        "start": a.start.format(STORED_TIME_FORMAT).to_string(),
        "end": a.end.format(STORED_TIME_FORMAT).to_string(),
        "notes": a.notes,
    })
}

pub fn assignments_json(list: &[Assignment]) -> JsonValue {
    JsonValue::Array(list.iter().map(assignment_json).collect())
}

pub fn warnings_json(warnings: &[LoadWarning]) -> JsonValue {
    JsonValue::Array(
        warnings
            .iter()
            .map(|w| json!({ "entry": w.entry, "message": w.to_string() }))
            .collect(),
    )
}

pub fn diagnostics_json(diagnostics: &[RowError]) -> JsonValue {
    JsonValue::Array(
        diagnostics
            .iter()
            .map(|d| {
                json!({
                    "row": d.row,
                    "code": d.error.code(),
                    "message": d.to_string(),
                })
            })
            .collect(),
    )
}

/// Finishes a mutation response. A failed save is reported as an error that
/// still carries the applied (unsaved) list.
pub fn applied_response(
    req: &Request,
    board: &Board,
    mut result: JsonValue,
    write: &Result<WriteStatus, PlanError>,
) -> JsonValue {
    match write {
        Ok(status) => {
            result["write"] = json!(status.as_str());
            result["assignments"] = assignments_json(board.assignments());
            ok(&req.id, result)
        }
        Err(e) => {
            result["applied"] = json!(true);
            result["assignments"] = assignments_json(board.assignments());
            plan_err(&req.id, e, Some(result))
        }
    }
}
