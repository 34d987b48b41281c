use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::report::Status;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn status_cell(status: Status) -> Cell {
    match status {
        Status::Passed => Cell::new("passed").fg(TableColor::Green),
        Status::Failed => Cell::new("failed").fg(TableColor::Red),
        Status::Skipped => Cell::new("skipped").fg(TableColor::Yellow),
    }
}

pub fn duration_cell(seconds: f64) -> Cell {
    if seconds >= 60.0 {
        Cell::new(format!("{:.1}min", seconds / 60.0))
    } else {
        Cell::new(format!("{seconds:.1}s"))
    }
}

pub fn exit_code_cell(exit_code: Option<i32>) -> Cell {
    match exit_code {
        Some(0) => Cell::new("0").fg(TableColor::Green),
        Some(code) => Cell::new(code.to_string()).fg(TableColor::Red),
        None => Cell::new("-"),
    }
}
