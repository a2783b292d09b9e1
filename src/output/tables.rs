use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::report::PackageStatus;
use crate::results::Outcome;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn color_coded_success_cell(rate: f64) -> Cell {
    let text = format!("{rate:.1}%");
    if rate > 80.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if rate >= 50.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn status_cell(status: PackageStatus) -> Cell {
    let color = match status {
        PackageStatus::Success => TableColor::Green,
        PackageStatus::Partial => TableColor::Yellow,
        PackageStatus::Failure => TableColor::Red,
    };
    Cell::new(status.label()).fg(color)
}

pub fn outcome_cell(outcome: Option<&Outcome>) -> Cell {
    match outcome {
        Some(outcome) if outcome.is_success() => {
            Cell::new(format!("{} {}", outcome.icon(), outcome.label())).fg(TableColor::Green)
        }
        Some(outcome) => {
            Cell::new(format!("{} {}", outcome.icon(), outcome.label())).fg(TableColor::Red)
        }
        None => Cell::new("no result").fg(TableColor::DarkGrey),
    }
}
