//! Run-level accumulation of scenario results.
//!
//! ```text
//!  record(r1) --+
//!  record(r2) --+--> [ Open: Vec<ScenarioResult> ] --finalize()--> [ Finalized: Arc<RunReport> ]
//!  record(r3) --+                                                      |
//!                                                                      +--> artifacts (json/html)
//! ```
//!
//! Recording is serialized by a mutex so results from concurrently running
//! scenarios are neither lost nor duplicated. Once finalized, the aggregator
//! rejects further records with [`Error::AggregatorClosed`] and every later
//! `finalize` returns the same report without rendering again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::*;

use crate::{
    render::{self, Format},
    Error, Result, ScenarioResult,
};

/// The aggregate record of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scenario_results: Vec<ScenarioResult>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.scenario_results
            .iter()
            .filter(|r| r.overall_passed())
            .count()
    }

    /// Scenarios that received a response but did not satisfy their contract.
    pub fn failed(&self) -> usize {
        self.scenario_results
            .iter()
            .filter(|r| !r.overall_passed() && !r.is_errored())
            .count()
    }

    pub fn errored(&self) -> usize {
        self.scenario_results
            .iter()
            .filter(|r| r.is_errored())
            .count()
    }

    /// `true` when every scenario passed. Drives the process exit status.
    pub fn all_passed(&self) -> bool {
        self.scenario_results.iter().all(|r| r.overall_passed())
    }
}

/// Where and how to write the report artifacts on finalize.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub dir: PathBuf,
    /// File stem; `report` yields `report.json` and `report.html`.
    pub stem: String,
    pub formats: Vec<Format>,
}

#[derive(Debug)]
enum State {
    Open {
        started_at: DateTime<Utc>,
        results: Vec<ScenarioResult>,
    },
    Finalized(Arc<RunReport>),
}

#[derive(Debug)]
pub struct Aggregator {
    title: String,
    state: Mutex<State>,
    artifacts: Option<Artifacts>,
}

impl Aggregator {
    /// Aggregator that keeps the report in memory only.
    pub fn new(title: impl Into<String>) -> Aggregator {
        Aggregator {
            title: title.into(),
            state: Mutex::new(State::Open {
                started_at: Utc::now(),
                results: Vec::new(),
            }),
            artifacts: None,
        }
    }

    /// Aggregator that also renders `artifacts` once on finalize.
    pub fn with_artifacts(title: impl Into<String>, artifacts: Artifacts) -> Aggregator {
        Aggregator {
            artifacts: Some(artifacts),
            ..Aggregator::new(title)
        }
    }

    /// Mark the start of the run. Ignored once results were recorded or the
    /// report is finalized.
    pub fn start(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let State::Open {
            started_at,
            results,
        } = &mut *state
        {
            if results.is_empty() {
                *started_at = Utc::now();
            }
        }
    }

    /// Append a completed scenario result.
    pub fn record(&self, result: ScenarioResult) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            State::Open { results, .. } => {
                results.push(result);
                Ok(())
            }
            State::Finalized(_) => {
                error!("record \"{}\" after finalize", result.name());
                Err(Error::AggregatorClosed)
            }
        }
    }

    pub fn is_finalized(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*state, State::Finalized(_))
    }

    /// Close the aggregator and produce the report. Artifacts are written on
    /// the first call only.
    pub fn finalize(&self) -> Result<Arc<RunReport>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let report = match &mut *state {
            State::Finalized(report) => return Ok(report.clone()),
            State::Open {
                started_at,
                results,
            } => Arc::new(RunReport {
                title: self.title.clone(),
                started_at: *started_at,
                finished_at: Utc::now(),
                scenario_results: std::mem::take(results),
            }),
        };
        *state = State::Finalized(report.clone());
        drop(state);

        debug!(
            "report \"{}\" finalized with {} result(s)",
            report.title,
            report.scenario_results.len()
        );

        if let Some(artifacts) = &self.artifacts {
            write_artifacts(&report, artifacts)?;
        }

        Ok(report)
    }
}

fn write_artifacts(report: &RunReport, artifacts: &Artifacts) -> Result<()> {
    std::fs::create_dir_all(&artifacts.dir).map_err(|source| Error::ReportWrite {
        path: artifacts.dir.display().to_string(),
        source,
    })?;

    for format in &artifacts.formats {
        let path = artifacts
            .dir
            .join(format!("{}.{}", artifacts.stem, format.extension()));
        let rendered = render::render(report, *format)?;
        std::fs::write(&path, rendered).map_err(|source| Error::ReportWrite {
            path: path.display().to_string(),
            source,
        })?;
        info!("report written to {}", path.display());
    }

    Ok(())
}
