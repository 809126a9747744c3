use crate::board::Board;
use crate::config::{Config, ShiftHours};
use crate::persistence::PersistenceAdapter;
use chrono::Local;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub board: Board,
    pub shift: ShiftHours,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let persistence =
            PersistenceAdapter::open(config.workspace.as_deref(), config.store_timeout);
        match persistence.unavailable() {
            Some(w) => warn!(warning = %w, "running without durable storage"),
            None => info!(
                workspace = %config.workspace.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
                "document store ready"
            ),
        }

        let date = config
            .initial_date
            .unwrap_or_else(|| Local::now().date_naive());
        let mut board = Board::new(config.master.clone(), persistence, date);
        board.select_date(date);

        AppState {
            board,
            shift: config.shift,
        }
    }
}
