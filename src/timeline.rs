use crate::plan::{Assignment, MasterData, DISPLAY_TIME_FORMAT};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

pub const WINDOW_START: (u32, u32) = (7, 0);
pub const WINDOW_END: (u32, u32) = (21, 0);
pub const TICK_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBar {
    pub id: String,
    pub task: String,
    pub start: String,
    pub end: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    pub technician: String,
    pub in_roster: bool,
    pub assigned_minutes: i64,
    pub bars: Vec<TimelineBar>,
}

/// Chart model for one day. `rows` run top to bottom; `category_order` is the
/// bottom-up axis order chart libraries expect.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub title: String,
    pub date: String,
    pub window_start: String,
    pub window_end: String,
    pub ticks: Vec<String>,
    pub category_order: Vec<String>,
    pub rows: Vec<TimelineRow>,
    pub legend: Vec<String>,
}

fn hm(pair: (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(pair.0, pair.1, 0).unwrap_or(NaiveTime::MIN)
}

fn window_ticks() -> Vec<String> {
    let start = hm(WINDOW_START);
    let end = hm(WINDOW_END);
    let mut ticks = Vec::new();
    let mut t = start;
    while t <= end {
        ticks.push(t.format(DISPLAY_TIME_FORMAT).to_string());
        let (next, wrapped) = t.overflowing_add_signed(chrono::Duration::minutes(TICK_MINUTES));
        if wrapped != 0 {
            break;
        }
        t = next;
    }
    ticks
}

pub fn build_timeline(date: NaiveDate, master: &MasterData, assignments: &[Assignment]) -> Timeline {
    let mut rows: Vec<TimelineRow> = master
        .roster()
        .iter()
        .map(|t| TimelineRow {
            technician: t.clone(),
            in_roster: true,
            assigned_minutes: 0,
            bars: Vec::new(),
        })
        .collect();
    let mut legend: Vec<String> = Vec::new();

    for a in assignments {
        let idx = match rows.iter().position(|r| r.technician == a.technician) {
            Some(i) => i,
            None => {
                rows.push(TimelineRow {
                    technician: a.technician.clone(),
                    in_roster: false,
                    assigned_minutes: 0,
                    bars: Vec::new(),
                });
                rows.len() - 1
            }
        };
        let row = &mut rows[idx];
        row.assigned_minutes += a.minutes();
        row.bars.push(TimelineBar {
            id: a.id.clone(),
            task: a.task.clone(),
            start: a.start.format(DISPLAY_TIME_FORMAT).to_string(),
            end: a.end.format(DISPLAY_TIME_FORMAT).to_string(),
            notes: a.notes.clone(),
        });
        if !legend.contains(&a.task) {
            legend.push(a.task.clone());
        }
    }

    Timeline {
        title: format!("Programación: {}", date.format("%d/%m/%Y")),
        date: date.format("%Y-%m-%d").to_string(),
        window_start: hm(WINDOW_START).format(DISPLAY_TIME_FORMAT).to_string(),
        window_end: hm(WINDOW_END).format(DISPLAY_TIME_FORMAT).to_string(),
        ticks: window_ticks(),
        category_order: rows.iter().rev().map(|r| r.technician.clone()).collect(),
        rows,
        legend,
    }
}
