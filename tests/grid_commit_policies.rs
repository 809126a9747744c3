use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar(workspace: Option<&Path>) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_planboardd");
    let mut cmd = Command::new(exe);
    cmd.env_remove("PLANBOARD_WORKSPACE")
        .env_remove("PLANBOARD_STORE_TIMEOUT_MS")
        .env("PLANBOARD_ROSTER", "A;B")
        .env("PLANBOARD_TASKS", "Task1;Task2")
        .env("PLANBOARD_DATE", "2026-03-09")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    if let Some(w) = workspace {
        cmd.env("PLANBOARD_WORKSPACE", w);
    }
    let mut child = cmd.spawn().expect("spawn planboardd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn ids(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .expect("assignments[]")
        .iter()
        .map(|a| a["id"].as_str().unwrap_or("").to_string())
        .collect()
}

fn seed_two(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
) -> (String, String) {
    let a = request_ok(
        stdin,
        reader,
        "seed-1",
        "assignments.add",
        json!({ "technician": "A", "task": "Task1", "start": "08:00", "end": "09:00" }),
    );
    let b = request_ok(
        stdin,
        reader,
        "seed-2",
        "assignments.add",
        json!({ "technician": "B", "task": "Task2", "start": "09:00", "end": "10:00" }),
    );
    (
        a["assignment"]["id"].as_str().expect("id").to_string(),
        b["assignment"]["id"].as_str().expect("id").to_string(),
    )
}

#[test]
fn clean_grid_edit_replaces_plan_and_keeps_ids() {
    let workspace = temp_dir("planboard-grid-clean");
    let (_child, mut stdin, mut reader) = spawn_sidecar(Some(&workspace));
    let (a_id, b_id) = seed_two(&mut stdin, &mut reader);

    // Retime B, drop A, add a new row and a scratch row.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grid.commit",
        json!({
            "rows": [
                { "id": b_id, "technician": "B", "task": "Task2", "start": "09:30", "end": "11:00", "notes": "movido" },
                { "technician": "A", "task": "Task1", "start": "14:00:00", "end": "15:00:00" },
                { "technician": null, "task": "Task1", "start": "", "end": "" }
            ]
        }),
    );
    assert_eq!(result["committed"], json!(true));
    assert_eq!(result["policy"], "allOrNothing");
    assert_eq!(result["committedCount"], 2);
    assert_eq!(result["skippedRows"], json!([3]));
    assert_eq!(result["diagnostics"], json!([]));
    assert_eq!(result["write"], "saved");

    let committed = ids(&result["assignments"]);
    assert_eq!(committed.len(), 2);
    assert_eq!(committed[0], b_id);
    assert!(!committed.contains(&a_id));
    assert_eq!(result["assignments"][0]["start"], "09:30:00");
    assert_eq!(result["assignments"][0]["notes"], "movido");

    let plan = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "plan.open",
        json!({ "date": "2026-03-09" }),
    );
    assert_eq!(ids(&plan["assignments"]), committed);
}

#[test]
fn any_invalid_row_voids_commit_by_default() {
    let workspace = temp_dir("planboard-grid-all-or-nothing");
    let (_child, mut stdin, mut reader) = spawn_sidecar(Some(&workspace));
    let (a_id, b_id) = seed_two(&mut stdin, &mut reader);

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "grid.commit",
        json!({
            "rows": [
                { "id": a_id, "technician": "A", "task": "Task1", "start": "08:00", "end": "12:00" },
                { "id": b_id, "technician": "B", "task": "Task2", "start": "11:00", "end": "10:00" },
                { "technician": "A", "task": "Task2", "start": "25:99", "end": "26:00" }
            ]
        }),
    );
    assert_eq!(error_code(&resp), Some("validation_failed"));
    let details = &resp["error"]["details"];
    let diagnostics = details["diagnostics"].as_array().expect("diagnostics[]");
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0]["row"], 2);
    assert_eq!(diagnostics[0]["code"], "invalid_time_range");
    assert_eq!(diagnostics[1]["row"], 3);
    assert_eq!(diagnostics[1]["code"], "malformed_time");
    assert!(diagnostics[1]["message"]
        .as_str()
        .unwrap_or("")
        .starts_with("row 3: malformed time"));
    assert_eq!(ids(&details["assignments"]), vec![a_id.clone(), b_id.clone()]);

    let plan = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "plan.open",
        json!({ "date": "2026-03-09" }),
    );
    assert_eq!(ids(&plan["assignments"]), vec![a_id, b_id]);
    assert_eq!(plan["assignments"][0]["end"], "09:00:00");
}

#[test]
fn drop_invalid_rows_policy_commits_the_rest() {
    let workspace = temp_dir("planboard-grid-drop-invalid");
    let (_child, mut stdin, mut reader) = spawn_sidecar(Some(&workspace));
    let (a_id, b_id) = seed_two(&mut stdin, &mut reader);

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grid.commit",
        json!({
            "policy": "dropInvalidRows",
            "rows": [
                { "id": a_id, "technician": "A", "task": "Task1", "start": "08:00", "end": "09:00" },
                { "id": b_id, "technician": "B", "task": "Task2", "start": "11:00", "end": "10:00" }
            ]
        }),
    );
    assert_eq!(result["committed"], json!(true));
    assert_eq!(result["committedCount"], 1);
    assert_eq!(result["diagnostics"][0]["row"], 2);
    assert_eq!(result["write"], "saved");

    let plan = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "plan.open",
        json!({ "date": "2026-03-09" }),
    );
    assert_eq!(ids(&plan["assignments"]), vec![a_id]);
}

#[test]
fn duplicate_ids_and_bad_payloads_are_rejected() {
    let workspace = temp_dir("planboard-grid-bad");
    let (_child, mut stdin, mut reader) = spawn_sidecar(Some(&workspace));
    let (a_id, _) = seed_two(&mut stdin, &mut reader);

    let dup = request(
        &mut stdin,
        &mut reader,
        "1",
        "grid.commit",
        json!({
            "rows": [
                { "id": a_id, "technician": "A", "task": "Task1", "start": "08:00", "end": "09:00" },
                { "id": a_id, "technician": "B", "task": "Task1", "start": "10:00", "end": "11:00" }
            ]
        }),
    );
    assert_eq!(error_code(&dup), Some("validation_failed"));
    assert_eq!(
        dup["error"]["details"]["diagnostics"][0]["code"],
        "duplicate_id"
    );

    let missing = request(&mut stdin, &mut reader, "2", "grid.commit", json!({}));
    assert_eq!(error_code(&missing), Some("bad_params"));

    let not_object = request(
        &mut stdin,
        &mut reader,
        "3",
        "grid.commit",
        json!({ "rows": ["A,Task1,08:00,09:00"] }),
    );
    assert_eq!(error_code(&not_object), Some("bad_params"));

    let bad_policy = request(
        &mut stdin,
        &mut reader,
        "4",
        "grid.commit",
        json!({ "rows": [], "policy": "sometimes" }),
    );
    assert_eq!(error_code(&bad_policy), Some("bad_params"));

    let plan = request_ok(&mut stdin, &mut reader, "5", "plan.get", json!({}));
    assert_eq!(plan["assignments"].as_array().map(|a| a.len()), Some(2));
}
