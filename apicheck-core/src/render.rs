//! Report artifact renderers.
use itertools::Itertools;

use crate::{aggregator::RunReport, runner::Outcome, Result, ScenarioResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    Json,
    Html,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Html => "html",
        }
    }
}

pub fn render(report: &RunReport, format: Format) -> Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(report)?),
        Format::Html => Ok(html(report)),
    }
}

fn escape(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            c => c.to_string(),
        })
        .collect()
}

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin:.5em 0 1.5em}\
td,th{border:1px solid #ccc;padding:.3em .6em;text-align:left}\
.pass{color:#2e7d32}.fail{color:#c62828}.error{color:#ef6c00}\
h2{margin-bottom:.2em}";

fn status_label(result: &ScenarioResult) -> (&'static str, &'static str) {
    if result.overall_passed() {
        ("pass", "PASS")
    } else if result.is_errored() {
        ("error", "ERROR")
    } else {
        ("fail", "FAIL")
    }
}

fn html(report: &RunReport) -> String {
    let title = escape(&report.title);
    let mut out = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>{STYLE}</style></head><body>\n<h1>{title}</h1>\n"
    );
    out.push_str(&format!(
        "<p>Started {} &middot; finished {} &middot; \
         <span class=\"pass\">{} passed</span>, <span class=\"fail\">{} failed</span>, \
         <span class=\"error\">{} errored</span></p>\n",
        report.started_at.to_rfc3339(),
        report.finished_at.to_rfc3339(),
        report.passed(),
        report.failed(),
        report.errored()
    ));

    for result in &report.scenario_results {
        out.push_str(&scenario_section(result));
    }

    out.push_str("</body></html>\n");
    out
}

fn scenario_section(result: &ScenarioResult) -> String {
    let (class, label) = status_label(result);
    let actual = result
        .actual_status()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".into());
    let mut section = format!(
        "<h2><span class=\"{class}\">{label}</span> {}</h2>\n\
         <p><code>{} {}</code> &middot; expected status {} &middot; actual status {actual} &middot; {} ms</p>\n",
        escape(result.name()),
        escape(result.method()),
        escape(result.path()),
        result.expected_status(),
        result.elapsed().as_millis()
    );

    match result.outcome() {
        Outcome::Errored { error, .. } => {
            section.push_str(&format!("<p class=\"error\">{}</p>\n", escape(error)));
        }
        Outcome::Evaluated(evaluation) if !evaluation.field_results.is_empty() => {
            let rows = evaluation
                .field_results
                .iter()
                .map(|field| {
                    let (class, label) = if field.passed {
                        ("pass", "PASS")
                    } else {
                        ("fail", "FAIL")
                    };
                    format!(
                        "<tr><td class=\"{class}\">{label}</td><td><code>{}</code></td><td>{}</td><td>{}</td></tr>",
                        escape(&field.path),
                        escape(&field.matcher),
                        escape(&field.message)
                    )
                })
                .join("\n");
            section.push_str(&format!(
                "<table><tr><th>Result</th><th>Path</th><th>Matcher</th><th>Message</th></tr>\n{rows}\n</table>\n"
            ));
        }
        Outcome::Evaluated(_) => {}
    }
    section
}
