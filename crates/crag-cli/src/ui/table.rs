//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `crag resolve` | `render_evidence_table()` |
//! | `crag batch` | `render_log_table()` |
//! | `crag log` | `render_log_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use crag_core::{EvidenceUnit, OutcomeStatus, ResolutionLogEntry};

use super::format::{format_elapsed_ms, format_relative_time, one_line, truncate_str};

/// Render final evidence, one row per unit, in evidence order.
///
/// `text_width` bounds the TEXT column; pass the terminal width minus the
/// other columns.
pub fn render_evidence_table(units: &[EvidenceUnit], text_width: usize) -> String {
    if units.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("SOURCE"),
        Cell::new("SCORE").set_alignment(CellAlignment::Right),
        Cell::new("TEXT"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(2)), // #
        ColumnConstraint::LowerBoundary(Width::Fixed(8)), // SOURCE
        ColumnConstraint::LowerBoundary(Width::Fixed(5)), // SCORE
        ColumnConstraint::LowerBoundary(Width::Fixed(20)), // TEXT
    ]);

    for (i, unit) in units.iter().enumerate() {
        let score = unit
            .retrieval_score()
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        let mut text = truncate_str(&one_line(unit.text()), text_width.max(20));
        if let Some(url) = unit.url() {
            text = format!("{}\n{}", text, url);
        }

        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(unit.source()),
            Cell::new(score).set_alignment(CellAlignment::Right),
            Cell::new(text),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render resolution summaries, one row per cycle.
pub fn render_log_table(entries: &[ResolutionLogEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("WHEN"),
        Cell::new("QUERY"),
        Cell::new("STATUS"),
        Cell::new("DECISION"),
        Cell::new("SCORE").set_alignment(CellAlignment::Right),
        Cell::new("UNITS").set_alignment(CellAlignment::Right),
        Cell::new("TIME").set_alignment(CellAlignment::Right),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(10)), // WHEN
        ColumnConstraint::LowerBoundary(Width::Fixed(30)), // QUERY
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),  // STATUS
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // DECISION
        ColumnConstraint::LowerBoundary(Width::Fixed(5)),  // SCORE
        ColumnConstraint::LowerBoundary(Width::Fixed(5)),  // UNITS
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),  // TIME
    ]);

    for entry in entries {
        let decision = match (entry.decision, entry.scoring_failed) {
            (Some(_), true) => "insufficient*".to_string(),
            (Some(kind), false) => kind.to_string(),
            (None, _) => "-".to_string(),
        };
        let score = entry
            .score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        let units = match entry.status {
            OutcomeStatus::Done => format!("{}+{}", entry.primary_units, entry.fallback_units),
            OutcomeStatus::Failed => "-".to_string(),
        };

        table.add_row(vec![
            Cell::new(format_relative_time(entry.timestamp)),
            Cell::new(truncate_str(&one_line(&entry.query), 40)),
            Cell::new(entry.status),
            Cell::new(decision),
            Cell::new(score).set_alignment(CellAlignment::Right),
            Cell::new(units).set_alignment(CellAlignment::Right),
            Cell::new(format_elapsed_ms(entry.elapsed_ms)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.trim_fmt().to_string()
}
