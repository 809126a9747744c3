mod board;
mod config;
mod db;
mod export;
mod ipc;
mod persistence;
mod plan;
mod reconcile;
mod timeline;

use anyhow::Context;
use serde_json::json;
use std::io::{self, BufRead, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    // stdout carries the IPC protocol; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env(config::ENV_LOG)
                .unwrap_or_else(|_| "planboardd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let config = config::Config::from_env();
    init_tracing();
    let config = config.context("invalid configuration")?;

    let mut state = ipc::AppState::from_config(&config);
    tracing::info!(
        date = %state.board.current_date(),
        durable = state.board.persistence().is_durable(),
        "planboardd ready"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparsable request line");
                let _ = writeln!(
                    stdout,
                    "{}",
                    json!({ "ok": false, "error": { "code": "bad_json", "message": e.to_string() } })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
