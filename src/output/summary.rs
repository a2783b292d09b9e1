use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::report::{PackageStatus, Report};

use super::styling::{bright, bright_yellow, cyan, dim, status_styled};
use super::tables::{
    color_coded_success_cell, create_cyan_header, create_table, outcome_cell, status_cell,
};

const MAX_PACKAGE_ROWS: usize = 20;

/// Prints a human-readable summary of the report to stdout.
///
/// Displays color-coded tables showing:
/// - Overview: project, package counts, flake inputs
/// - Platforms: success/failure/skipped counts per platform
/// - Broken Packages: packages failing on at least one platform
pub fn print_summary(report: &Report) {
    println!("{}", render_summary(report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn count_status(report: &Report, status: PackageStatus) -> usize {
    report.results.iter().filter(|r| r.status == status).count()
}

#[allow(clippy::format_push_string)]
pub fn render_summary(report: &Report) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");

    let _ = writeln!(output, "  {} {}", dim("Project:"), cyan(&report.project));
    let _ = writeln!(
        output,
        "  {} {}",
        dim("Packages reported:"),
        bright_yellow(report.results.len())
    );
    for status in [
        PackageStatus::Success,
        PackageStatus::Partial,
        PackageStatus::Failure,
    ] {
        let _ = writeln!(
            output,
            "    {} {}",
            status_styled(status),
            count_status(report, status)
        );
    }
    let _ = writeln!(
        output,
        "  {} {}",
        dim("Skipped during locking:"),
        bright_yellow(report.skipped_packages.len())
    );
    for (name, url) in &report.inputs {
        let _ = writeln!(output, "  {} {}", dim(format!("{name}:")), cyan(url));
    }
    let _ = writeln!(
        output,
        "  {} {}\n",
        dim("Generated:"),
        dim(report.generated_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if report.results.is_empty() {
        output.push_str(&format!("{}\n", bright_yellow("No package results found.")));
        return output;
    }

    add_section_header(&mut output, "🖥️", "Platforms");

    let mut platforms_table = create_table();
    platforms_table.set_header(create_cyan_header(&[
        "Platform",
        "Success",
        "Failure",
        "Skipped",
        "Total",
        "Success Rate",
    ]));

    for (system, stats) in &report.stats_per_system {
        let built = stats.success + stats.failure;
        #[allow(clippy::cast_precision_loss)]
        let rate = if built > 0 {
            stats.success as f64 / built as f64 * 100.0
        } else {
            0.0
        };

        platforms_table.add_row(vec![
            Cell::new(system),
            Cell::new(stats.success).fg(TableColor::Green),
            Cell::new(stats.failure).fg(TableColor::Red),
            Cell::new(stats.skipped_packages),
            Cell::new(stats.total),
            color_coded_success_cell(rate),
        ]);
    }
    output.push_str(&format!("{platforms_table}\n\n"));

    let broken: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.status != PackageStatus::Success)
        .collect();

    if broken.is_empty() {
        return output;
    }

    add_section_header(&mut output, "❌", "Broken Packages");

    let mut header = vec!["Package", "Status"];
    header.extend(report.systems.iter().map(String::as_str));
    header.push("Source");

    let mut packages_table = create_table();
    packages_table.set_header(create_cyan_header(&header));

    for result in broken.iter().take(MAX_PACKAGE_ROWS) {
        let mut row = vec![Cell::new(&result.name), status_cell(result.status)];
        row.extend(
            report
                .systems
                .iter()
                .map(|system| outcome_cell(result.outcome(system))),
        );
        row.push(Cell::new(if result.from_wheel { "wheel" } else { "sdist" }));
        packages_table.add_row(row);
    }

    if broken.len() > MAX_PACKAGE_ROWS {
        let mut row = vec![Cell::new(format!(
            "... and {} more",
            broken.len() - MAX_PACKAGE_ROWS
        ))
        .fg(TableColor::DarkGrey)];
        row.extend(vec![Cell::new(""); header.len() - 1]);
        packages_table.add_row(row);
    }

    output.push_str(&format!("{packages_table}\n"));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{PackageResult, SystemResult, SystemStats};
    use crate::results::{Outcome, StepRecord};
    use chrono::Utc;
    use indexmap::IndexMap;

    fn outcome(success: bool) -> Outcome {
        let record = StepRecord {
            log_tail: String::new(),
            log_uri: String::new(),
            started_at: None,
            complete_at: None,
        };
        if success {
            Outcome::Success(record)
        } else {
            Outcome::Failure(record)
        }
    }

    fn package(name: &str, status: PackageStatus, linux: bool) -> PackageResult {
        PackageResult {
            name: name.to_string(),
            status,
            from_wheel: false,
            systems: IndexMap::from([(
                "x86_64-linux".to_string(),
                SystemResult {
                    outcome: Some(outcome(linux)),
                    store_path: None,
                },
            )]),
        }
    }

    fn report(results: Vec<PackageResult>) -> Report {
        Report {
            project: "org/repo".into(),
            generated_at: Utc::now(),
            systems: vec!["x86_64-linux".into()],
            inputs: IndexMap::from([(
                "nixpkgs".to_string(),
                "https://github.com/NixOS/nixpkgs/tree/abc".to_string(),
            )]),
            results,
            stats_per_system: IndexMap::from([(
                "x86_64-linux".to_string(),
                SystemStats {
                    success: 1,
                    failure: 1,
                    skipped_packages: 0,
                    total: 2,
                },
            )]),
            skipped_packages: IndexMap::new(),
        }
    }

    #[test]
    fn test_empty_report() {
        let output = render_summary(&report(Vec::new()));
        assert!(output.contains("org/repo"));
        assert!(output.contains("No package results found."));
    }

    #[test]
    fn test_lists_broken_packages_only() {
        let output = render_summary(&report(vec![
            package("brokenpkg", PackageStatus::Failure, false),
            package("finepkg", PackageStatus::Success, true),
        ]));

        assert!(output.contains("Platforms"));
        assert!(output.contains("x86_64-linux"));
        assert!(output.contains("brokenpkg"));
        assert!(!output.contains("finepkg"));
        assert!(output.contains("github.com/NixOS/nixpkgs"));
    }

    #[test]
    fn test_truncates_long_package_list() {
        let results = (0..25)
            .map(|i| package(&format!("pkg{i}"), PackageStatus::Failure, false))
            .collect();

        let output = render_summary(&report(results));
        assert!(output.contains("... and 5 more"));
    }
}
