use console::{style, Term};
use eyre::WrapErr;
use std::collections::HashMap;
use tabled::{settings::Style, Table, Tabled};
use tokio::sync::broadcast;
use tracing::*;

use crate::{
    http,
    runner::{Message, ScenarioResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReporterType {
    List,
    Table,
    Null,
}

/// Reporter trait. The trait is based on the "template method" pattern.
/// You can implement on_xxx methods to hook into the runner. This way is enough for most usecases.
/// If you need more control, you can override the "run" method.
#[async_trait::async_trait]
pub trait Reporter {
    async fn run(&mut self, mut rx: broadcast::Receiver<Message>) -> eyre::Result<()> {
        loop {
            match rx.recv().await {
                Ok(Message::Start(name)) => {
                    self.on_start(name).await?;
                }
                Ok(Message::HttpLog(name, log)) => {
                    self.on_http_call(name, log).await?;
                }
                Ok(Message::End(name, result)) => {
                    self.on_end(name, result).await?;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("runner channel has been closed");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("reporter lagged behind by {n} message(s)");
                    continue;
                }
            }
        }

        self.on_finish().await
    }

    /// Called when a scenario is dispatched.
    async fn on_start(&mut self, _name: String) -> eyre::Result<()> {
        Ok(())
    }

    /// Called when an HTTP exchange was captured.
    async fn on_http_call(&mut self, _name: String, _log: Box<http::Log>) -> eyre::Result<()> {
        Ok(())
    }

    /// Called when a scenario has been evaluated or has errored.
    async fn on_end(&mut self, _name: String, _result: Box<ScenarioResult>) -> eyre::Result<()> {
        Ok(())
    }

    /// Called once after the run's channel closed.
    async fn on_finish(&mut self) -> eyre::Result<()> {
        Ok(())
    }
}

pub struct NullReporter;

#[async_trait::async_trait]
impl Reporter for NullReporter {}

/// Prints one line per scenario as soon as it finishes, followed by its
/// failing checks.
#[allow(clippy::vec_box)]
pub struct ListReporter {
    terminal: Term,
    buffer: HashMap<String, Vec<Box<http::Log>>>,
    capture_http: bool,
}

impl ListReporter {
    pub fn new(capture_http: bool) -> ListReporter {
        ListReporter {
            terminal: Term::stdout(),
            buffer: HashMap::new(),
            capture_http,
        }
    }
}

#[async_trait::async_trait]
impl Reporter for ListReporter {
    async fn on_start(&mut self, name: String) -> eyre::Result<()> {
        self.buffer.insert(name, Vec::new());
        Ok(())
    }

    async fn on_http_call(&mut self, name: String, log: Box<http::Log>) -> eyre::Result<()> {
        if self.capture_http {
            self.buffer
                .get_mut(&name)
                .ok_or_else(|| eyre::eyre!("scenario \"{name}\" not found in the buffer"))?
                .push(log);
        }
        Ok(())
    }

    async fn on_end(&mut self, name: String, result: Box<ScenarioResult>) -> eyre::Result<()> {
        let http_logs = self
            .buffer
            .remove(&name)
            .ok_or_else(|| eyre::eyre!("scenario \"{name}\" not found in the buffer"))?;

        for log in http_logs {
            write_log(&self.terminal, &log)?;
        }

        let elapsed = style(format!("({} ms)", result.elapsed().as_millis())).dim();
        if result.overall_passed() {
            let status = style("✓").green();
            self.terminal
                .write_line(&format!("{status} {name} {elapsed}"))?;
            return Ok(());
        }

        let status = style("✘").red();
        if let Some(error) = result.error() {
            self.terminal
                .write_line(&format!("{status} {name} {elapsed}: {error}"))?;
            return Ok(());
        }

        self.terminal
            .write_line(&format!("{status} {name} {elapsed}"))?;
        if !result.status_matched() {
            let actual = result
                .actual_status()
                .map(|s| s.to_string())
                .unwrap_or_default();
            self.terminal.write_line(&format!(
                "    status: expected {} but was {actual}",
                result.expected_status()
            ))?;
        }
        for field in result.field_results().iter().filter(|f| !f.passed) {
            self.terminal.write_line(&format!(
                "    {} ({}): {}",
                field.path, field.matcher, field.message
            ))?;
        }

        Ok(())
    }
}

fn write_log(term: &Term, log: &http::Log) -> eyre::Result<()> {
    write(
        term,
        format!(" => {} {}", log.request.method, log.request.target),
    )?;
    write(term, "  > request:")?;
    write(term, "    > headers:")?;
    for (key, value) in &log.request.headers {
        write(
            term,
            format!("       > {key}: {}", value.to_str().unwrap_or("<binary>")),
        )?;
    }
    let Some(response) = &log.response else {
        return write(term, "  < no response");
    };
    write(term, format!("  < response: {}", response.status))?;
    write(term, "    < headers:")?;
    for (key, value) in &response.headers {
        write(
            term,
            format!("       < {key}: {}", value.to_str().unwrap_or("<binary>")),
        )?;
    }
    write(term, format!("    < body: {}", response.body))
}

fn write(term: &Term, s: impl AsRef<str>) -> eyre::Result<()> {
    let colored = style(s.as_ref()).dim();
    term.write_line(&format!("{colored}"))
        .wrap_err("failed to write character on terminal")
}

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Scenario")]
    name: String,
    #[tabled(rename = "Request")]
    request: String,
    #[tabled(rename = "Expected")]
    expected: u16,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "Checks")]
    checks: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&ScenarioResult> for Row {
    fn from(result: &ScenarioResult) -> Row {
        let fields = result.field_results();
        let passed = fields.iter().filter(|f| f.passed).count();
        Row {
            name: result.name().to_string(),
            request: format!("{} {}", result.method(), result.path()),
            expected: result.expected_status(),
            actual: result
                .actual_status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".into()),
            checks: format!("{passed}/{}", fields.len()),
            result: if result.overall_passed() {
                "pass".into()
            } else if result.is_errored() {
                "error".into()
            } else {
                "fail".into()
            },
        }
    }
}

/// Prints a summary table once the run is over.
pub struct TableReporter {
    terminal: Term,
    results: Vec<ScenarioResult>,
}

impl TableReporter {
    pub fn new() -> TableReporter {
        TableReporter {
            terminal: Term::stdout(),
            results: Vec::new(),
        }
    }

    fn render(&self) -> String {
        let mut table = Table::new(self.results.iter().map(Row::from));
        table.with(Style::rounded());
        table.to_string()
    }
}

impl Default for TableReporter {
    fn default() -> Self {
        TableReporter::new()
    }
}

#[async_trait::async_trait]
impl Reporter for TableReporter {
    async fn on_end(&mut self, _name: String, result: Box<ScenarioResult>) -> eyre::Result<()> {
        self.results.push(*result);
        Ok(())
    }

    async fn on_finish(&mut self) -> eyre::Result<()> {
        if self.results.is_empty() {
            return Ok(());
        }
        self.terminal
            .write_line(&self.render())
            .wrap_err("failed to write summary table")
    }
}
