//! # apicheck core
//!
//! Core functionality of the apicheck contract-verification harness: it
//! sends declared requests to a JSON/HTTP API, checks each response against
//! a contract and aggregates the outcomes into a report.
//!
//! ## Architecture (block diagram)
//!
//! ```text
//! +---------------------+      +---------------------+      +---------------------+
//! | scenarios           | ---> | runner              | ---> | aggregator          |
//! | request + contract  |      | dispatch + evaluate |      | RunReport, artifacts|
//! +---------------------+      +---------------------+      +---------------------+
//!                                 |      |       |
//!                                 v      |       +--publish--> reporters (list/table)
//!                       +-----------------+      |
//!                       | Transport       |      v
//!                       | (hyper client)  |  +---------------------+
//!                       +-----------------+  | assertion engine    |
//!                                            | path + matchers     |
//!                                            +---------------------+
//! ```
//!
//! Per-scenario failures (mismatches, missing fields, transport errors) are
//! data in the report. Only harness misuse such as a malformed scenario or
//! recording into a finalized aggregator is returned as an error.

pub mod aggregator;
pub mod assertion;
pub mod config;
pub mod error;
pub mod http;
pub mod masking;
pub mod matcher;
pub mod path;
pub mod render;
pub mod reporter;
pub mod runner;

pub use eyre;

/// Type alias for scenario names. Names are unique within a run.
pub type ScenarioName = String;

/// Type alias for project names in apicheck configuration.
pub type ProjectName = String;

pub use aggregator::{Aggregator, Artifacts, RunReport};
pub use assertion::{Evaluation, Expectation, FieldResult, ResponseContract};
pub use config::{get_apicheck_config, Config, ProjectConfig};
pub use error::{Error, Result};
pub use http::{Client, Request, Transport, TransportError};
pub use matcher::{Kind, Matcher};
pub use path::FieldPath;
pub use render::Format;
pub use reporter::{ListReporter, NullReporter, Reporter, ReporterType, TableReporter};
pub use runner::{
    run_scenario, CancelHandle, Filter, IgnoreFilter, NameFilter, Options, Outcome, Phase,
    Runner, Scenario, ScenarioResult,
};
