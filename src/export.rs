use crate::plan::{Assignment, DISPLAY_TIME_FORMAT};
use chrono::NaiveDate;

pub const CSV_HEADER: &str = "ID,Técnico,Tarea,Inicio,Fin,Notas";

pub fn csv_file_name(date: NaiveDate) -> String {
    format!("plan_{}.csv", date.format("%Y-%m-%d"))
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn render_csv(assignments: &[Assignment]) -> String {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');
    for a in assignments {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_quote(&a.id),
            csv_quote(&a.technician),
            csv_quote(&a.task),
            a.start.format(DISPLAY_TIME_FORMAT),
            a.end.format(DISPLAY_TIME_FORMAT),
            csv_quote(&a.notes),
        ));
    }
    csv
}
