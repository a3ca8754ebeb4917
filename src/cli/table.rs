//! Table output formatting for CLI commands
//!
//! Renders snapshots and scan history with comfy-table. Colors are dropped
//! when `NO_COLOR` is set or the terminal is dumb.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::cli::output::truncate;
use crate::domain::models::{CanonicalCommunity, Role, RunStatus, ScanRun};

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self { use_colors, max_width }
    }

    /// Format canonical communities, one row each
    pub fn format_communities<'a>(&self, communities: impl IntoIterator<Item = &'a CanonicalCommunity>) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Name", "Role", "Confidence", "Sources", "First seen"]));

        for community in communities {
            let role_cell = if self.use_colors {
                Cell::new(community.role).fg(role_color(community.role))
            } else {
                Cell::new(community.role)
            };
            table.add_row(vec![
                Cell::new(truncate(&community.id, 24)),
                Cell::new(truncate(&community.display_name, 40)),
                role_cell,
                Cell::new(format!("{:.2}", community.confidence)),
                Cell::new(community.methods_label()),
                Cell::new(community.first_seen_at.format("%Y-%m-%d %H:%M").to_string()),
            ]);
        }

        table.to_string()
    }

    /// Format scan runs, newest first as given
    pub fn format_runs(&self, runs: &[ScanRun]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Started", "Status", "Joined", "Left", "Role", "Hidden", "Error"]));

        for run in runs {
            let status_cell = if self.use_colors {
                Cell::new(run.status.as_str()).fg(status_color(run.status))
            } else {
                Cell::new(run.status.as_str())
            };
            table.add_row(vec![
                Cell::new(run.started_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                status_cell,
                Cell::new(run.joined_ids.len()),
                Cell::new(run.left_ids.len()),
                Cell::new(run.role_changed_ids.len()),
                Cell::new(run.suppressed),
                Cell::new(run.error.as_deref().map_or_else(|| "-".to_string(), |e| truncate(e, 48))),
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|title| Cell::new(title).add_attribute(Attribute::Bold))
        .collect()
}

fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn role_color(role: Role) -> Color {
    match role {
        Role::Creator => Color::Magenta,
        Role::Admin => Color::Cyan,
        Role::Moderator => Color::Blue,
        Role::Member => Color::White,
    }
}

fn status_color(status: RunStatus) -> Color {
    match status {
        RunStatus::Completed => Color::Green,
        RunStatus::Failed => Color::Red,
    }
}
