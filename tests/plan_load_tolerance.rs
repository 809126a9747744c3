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


fn seed_document(workspace: &Path, key: &str, body: &str) {
    let conn = rusqlite::Connection::open(workspace.join("planboard.sqlite3")).expect("open db");
    // Early layout without the updated_at column.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(key TEXT PRIMARY KEY, body TEXT NOT NULL)",
        [],
    )
    .expect("create documents");
    conn.execute(
        "INSERT INTO documents(key, body) VALUES(?, ?)",
        (key, body),
    )
    .expect("insert document");
}

#[test]
fn malformed_entries_are_skipped_with_warnings() {
    let workspace = temp_dir("planboard-load-tolerance");
    let body = json!({
        "tasks": [
            { "ID": "t1", "Técnico": "A", "Tarea": "Task1", "Inicio": "7h45", "Fin": "16:45:00", "Notas": "", "Fecha": "2026-03-09" },
            { "ID": "t2", "Técnico": "B", "Tarea": "Task2", "Inicio": "08:00:00", "Fin": "09:30:00", "Notas": "muelle 2", "Fecha": "2026-03-09" },
            { "ID": "t2", "Técnico": "A", "Tarea": "Task1", "Inicio": "10:00:00", "Fin": "11:00:00" },
            { "Técnico": "Retirado", "Tarea": "Task1", "Inicio": "2026-03-09 12:00:00.250000", "Fin": "13:00:00" },
            { "ID": "t5", "Técnico": "B", "Tarea": "Task1", "Inicio": "15:00:00", "Fin": "14:00:00" }
        ],
        "updated_at": "2026-03-08T18:00:00Z"
    });
    seed_document(&workspace, "plan_20260309", &body.to_string());

    let (_child, mut stdin, mut reader) = spawn_sidecar(Some(&workspace));
    let plan = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "plan.open",
        json!({ "date": "2026-03-09" }),
    );

    let assignments = plan["assignments"].as_array().expect("assignments[]");
    assert_eq!(assignments.len(), 3);
    assert_eq!(assignments[0]["id"], "t2");
    assert_eq!(assignments[0]["notes"], "muelle 2");
    assert_ne!(assignments[1]["id"], "t2");
    assert_eq!(assignments[1]["technician"], "A");
    assert_eq!(assignments[2]["technician"], "Retirado");
    assert_eq!(assignments[2]["start"], "12:00:00");
    assert!(!assignments[2]["id"].as_str().unwrap_or("").is_empty());

    let entries: Vec<serde_json::Value> = plan["warnings"]
        .as_array()
        .expect("warnings[]")
        .iter()
        .map(|w| w["entry"].clone())
        .collect();
    assert_eq!(entries, vec![json!(1), json!(3), json!(5)]);

    // Technicians outside the roster still get a timeline row.
    let timeline = request_ok(&mut stdin, &mut reader, "2", "timeline.get", json!({}));
    let rows = timeline["rows"].as_array().expect("rows[]");
    assert_eq!(rows.last().map(|r| r["technician"].clone()), Some(json!("Retirado")));
    assert_eq!(rows.last().map(|r| r["inRoster"].clone()), Some(json!(false)));

    // The next write replaces the document with the cleaned list.
    let added = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "assignments.add",
        json!({ "technician": "A", "task": "Task2", "start": "17:00", "end": "20:30" }),
    );
    assert_eq!(added["write"], "saved");
    let current = request_ok(&mut stdin, &mut reader, "3b", "plan.get", json!({}));
    assert_eq!(current["warnings"], json!([]));
    let reopened = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "plan.open",
        json!({ "date": "2026-03-09" }),
    );
    assert_eq!(reopened["warnings"], json!([]));
    assert_eq!(reopened["assignments"].as_array().map(|a| a.len()), Some(4));
}

#[test]
fn unreadable_document_loads_as_empty_plan() {
    let workspace = temp_dir("planboard-load-garbage");
    seed_document(&workspace, "plan_20260309", "{\"tasks\": [");

    let (_child, mut stdin, mut reader) = spawn_sidecar(Some(&workspace));
    let plan = request_ok(&mut stdin, &mut reader, "1", "plan.get", json!({}));
    assert_eq!(plan["assignments"], json!([]));
    let warnings = plan["warnings"].as_array().expect("warnings[]");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["entry"], json!(null));
}
