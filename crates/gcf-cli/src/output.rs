//! Terminal output formatting.

use std::path::Path;

use colored::Colorize;

use gcf_db::ImportReport;
use gcf_graph::{GraphCounts, SyncResult};

/// Print one line per imported table, with unresolved names underneath.
pub fn print_import_reports(reports: &[ImportReport]) {
    for report in reports {
        let status = if report.unresolved.is_empty() {
            "✓".green()
        } else {
            "!".yellow()
        };
        println!(
            "  {} {:<24} {} rows",
            status,
            report.table,
            report.rows_inserted.to_string().cyan()
        );

        for miss in &report.unresolved {
            println!(
                "      {} {} unresolved in {}: {}",
                "→".dimmed(),
                miss.count.to_string().yellow(),
                miss.column,
                truncate(&miss.missing.join(", "), 60).dimmed()
            );
        }
    }
}

pub fn print_table_counts(path: &Path, counts: &[(&str, i64)]) {
    println!("{} {}", "Database".bold(), path.display().to_string().dimmed());
    println!("{}", "─".repeat(40));
    for (table, count) in counts {
        let count = if *count == 0 {
            count.to_string().dimmed()
        } else {
            count.to_string().cyan()
        };
        println!("  {:<26} {}", table, count);
    }
    println!("{}", "─".repeat(40));
}

pub fn print_sync_result(result: &SyncResult) {
    println!("\n{}", "Sync complete:".green().bold());
    println!("  Nodes written:         {}", result.nodes_written);
    println!("  Relationships written: {}", result.relationships_written);
}

pub fn print_graph_counts(counts: &GraphCounts) {
    println!("{}", "Knowledge Graph Status".bold());
    println!("{}", "─".repeat(40));
    println!("  Nodes:         {}", counts.nodes.to_string().cyan());
    println!("  Relationships: {}", counts.relationships.to_string().cyan());

    for (label, count) in counts.by_label.iter().filter(|(_, c)| *c > 0) {
        println!("    {:<18} {}", label.as_str(), count);
    }
    println!("{}", "─".repeat(40));
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
