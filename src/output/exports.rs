use std::io::Write;

use anyhow::Result;

use crate::config::OutputFormat;
use crate::report::Report;
use crate::results::Outcome;

/// Writes the report in a machine-readable or static format.
///
/// - JSON: the full report view model
/// - HTML: a self-contained page with log tails folded per package
///
/// The terminal summary is printed separately by [`super::print_summary`].
pub fn export_report(
    report: &Report,
    format: &OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Summary => {
            write!(output, "{}", super::summary::render_summary(report))?;
            Ok(())
        }
        OutputFormat::Json => export_json(report, pretty, output),
        OutputFormat::Html => export_html(report, output),
    }
}

fn export_json(report: &Report, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn outcome_html(outcome: Option<&Outcome>, store_path: Option<&str>) -> String {
    let Some(outcome) = outcome else {
        return r#"<td class="missing">no result</td>"#.to_string();
    };

    let record = outcome.record();
    let timing = match (record.started_at, record.complete_at) {
        (Some(start), Some(end)) => format!(
            "<br><small>{} ({}s)</small>",
            start.format("%Y-%m-%d %H:%M"),
            (end - start).num_seconds()
        ),
        _ => String::new(),
    };
    let store = store_path
        .map(|p| format!("<br><code>{}</code>", escape_html(p)))
        .unwrap_or_default();

    format!(
        r#"<td class="{}"><a href="{}">{} {}</a>{timing}{store}<details><summary>log</summary><pre>{}</pre></details></td>"#,
        outcome.label(),
        escape_html(&record.log_uri),
        outcome.icon(),
        outcome.label(),
        escape_html(&record.log_tail)
    )
}

fn export_html(report: &Report, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "<!DOCTYPE html>")?;
    writeln!(output, "<html lang=\"en\">")?;
    writeln!(output, "<head>")?;
    writeln!(output, "    <meta charset=\"UTF-8\">")?;
    writeln!(
        output,
        "    <title>CI Report - {}</title>",
        escape_html(&report.project)
    )?;
    writeln!(output, "    <style>")?;
    writeln!(
        output,
        "        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; }}"
    )?;
    writeln!(
        output,
        "        table {{ border-collapse: collapse; margin: 20px 0; }}"
    )?;
    writeln!(
        output,
        "        th, td {{ padding: 8px; text-align: left; border-bottom: 1px solid #ddd; vertical-align: top; }}"
    )?;
    writeln!(output, "        .success {{ color: #27ae60; }}")?;
    writeln!(output, "        .some {{ color: #f39c12; }}")?;
    writeln!(output, "        .failure {{ color: #e74c3c; }}")?;
    writeln!(output, "        .missing {{ color: #999; }}")?;
    writeln!(
        output,
        "        pre {{ max-height: 400px; overflow: auto; background: #f8f9fa; }}"
    )?;
    writeln!(output, "    </style>")?;
    writeln!(output, "</head>")?;
    writeln!(output, "<body>")?;
    writeln!(output, "    <h1>{}</h1>", escape_html(&report.project))?;
    writeln!(
        output,
        "    <p>Generated {}</p>",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    )?;

    if !report.inputs.is_empty() {
        writeln!(output, "    <ul>")?;
        for (name, url) in &report.inputs {
            writeln!(
                output,
                "        <li>{}: <a href=\"{}\">{}</a></li>",
                escape_html(name),
                escape_html(url),
                escape_html(url)
            )?;
        }
        writeln!(output, "    </ul>")?;
    }

    writeln!(output, "    <h2>Platforms</h2>")?;
    writeln!(output, "    <table>")?;
    writeln!(
        output,
        "        <tr><th>Platform</th><th>Success</th><th>Failure</th><th>Skipped</th><th>Total</th></tr>"
    )?;
    for (system, stats) in &report.stats_per_system {
        writeln!(
            output,
            "        <tr><td>{}</td><td class=\"success\">{}</td><td class=\"failure\">{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(system),
            stats.success,
            stats.failure,
            stats.skipped_packages,
            stats.total
        )?;
    }
    writeln!(output, "    </table>")?;

    writeln!(output, "    <h2>Packages</h2>")?;
    writeln!(output, "    <table>")?;
    write!(
        output,
        "        <tr><th>Package</th><th>Status</th><th>Source</th>"
    )?;
    for system in &report.systems {
        write!(output, "<th>{}</th>", escape_html(system))?;
    }
    writeln!(output, "</tr>")?;

    for result in &report.results {
        write!(
            output,
            "        <tr><td>{}</td><td class=\"{}\">{}</td><td>{}</td>",
            escape_html(&result.name),
            result.status.label(),
            result.status.label(),
            if result.from_wheel { "wheel" } else { "sdist" }
        )?;
        for system in &report.systems {
            let entry = result.systems.get(system);
            write!(
                output,
                "{}",
                outcome_html(
                    entry.and_then(|e| e.outcome.as_ref()),
                    entry.and_then(|e| e.store_path.as_deref())
                )
            )?;
        }
        writeln!(output, "</tr>")?;
    }
    writeln!(output, "    </table>")?;

    if !report.skipped_packages.is_empty() {
        writeln!(output, "    <h2>Skipped Packages</h2>")?;
        writeln!(output, "    <ul>")?;
        for (name, reason) in &report.skipped_packages {
            let reason = reason
                .as_str()
                .map_or_else(|| reason.to_string(), ToString::to_string);
            writeln!(
                output,
                "        <li>{}: {}</li>",
                escape_html(name),
                escape_html(&reason)
            )?;
        }
        writeln!(output, "    </ul>")?;
    }

    writeln!(output, "</body>")?;
    writeln!(output, "</html>")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{PackageResult, PackageStatus, SystemResult, SystemStats};
    use crate::results::StepRecord;
    use chrono::{DateTime, Utc};
    use indexmap::IndexMap;

    fn sample_report() -> Report {
        let outcome = Outcome::Failure(StepRecord {
            log_tail: "error: <missing> & broken".into(),
            log_uri: "https://ci.example.org/api/v2/logs/1/raw_inline".into(),
            started_at: DateTime::from_timestamp(1_700_000_000, 0),
            complete_at: DateTime::from_timestamp(1_700_000_042, 0),
        });

        Report {
            project: "org/repo".into(),
            generated_at: Utc::now(),
            systems: vec!["x86_64-linux".into(), "aarch64-darwin".into()],
            inputs: IndexMap::new(),
            results: vec![PackageResult {
                name: "pkgB".into(),
                status: PackageStatus::Failure,
                from_wheel: true,
                systems: IndexMap::from([(
                    "x86_64-linux".to_string(),
                    SystemResult {
                        outcome: Some(outcome),
                        store_path: Some("/nix/store/x-pkgB".into()),
                    },
                )]),
            }],
            stats_per_system: IndexMap::from([(
                "x86_64-linux".to_string(),
                SystemStats {
                    success: 0,
                    failure: 1,
                    skipped_packages: 1,
                    total: 2,
                },
            )]),
            skipped_packages: IndexMap::from([(
                "legacy".to_string(),
                serde_json::json!("no sdist"),
            )]),
        }
    }

    #[test]
    fn test_export_json_contains_view_model() {
        let mut buffer = Vec::new();
        export_report(
            &sample_report(),
            &OutputFormat::Json,
            false,
            &mut buffer,
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["project"], "org/repo");
        assert_eq!(value["results"][0]["status"], "failure");
        assert_eq!(
            value["results"][0]["systems"]["x86_64-linux"]["outcome"]["status"],
            "failure"
        );
        assert_eq!(value["stats_per_system"]["x86_64-linux"]["total"], 2);
        assert_eq!(value["skipped_packages"]["legacy"], "no sdist");
    }

    #[test]
    fn test_export_html_escapes_logs() {
        let mut buffer = Vec::new();
        export_report(
            &sample_report(),
            &OutputFormat::Html,
            false,
            &mut buffer,
        )
        .unwrap();
        let html = String::from_utf8(buffer).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("error: &lt;missing&gt; &amp; broken"));
        assert!(html.contains("(42s)"));
        assert!(html.contains(r#"<td class="missing">no result</td>"#));
        assert!(html.contains("legacy: no sdist"));
    }
}
