//! # apicheck
//!
//! Command-line harness that verifies a JSON/HTTP API against declared
//! response contracts. Each scenario pairs a request with the expected
//! status code and a list of field expectations; the run produces a
//! console summary and JSON/HTML report artifacts.
//!
//! ```rust,no_run
//! use apicheck::{Matcher, Request, ResponseContract, Scenario};
//!
//! fn suite(_: &apicheck::ProjectConfig) -> apicheck::eyre::Result<Vec<Scenario>> {
//!     Ok(vec![Scenario::new(
//!         "get_users",
//!         Request::get("/users"),
//!         ResponseContract::new(200)?.expect("users[0].id", Matcher::equals(1))?,
//!     )])
//! }
//!
//! #[tokio::main]
//! async fn main() -> apicheck::eyre::Result<()> {
//!     apicheck::App::with_suite(suite).run().await
//! }
//! ```

mod app;
pub mod suite;

pub use eyre;
pub use pretty_assertions;

pub use app::{App, Color, SuiteFactory};

pub use apicheck_core::{
    aggregator, assertion,
    config::{self, get_apicheck_config, Config, ProjectConfig},
    http,
    matcher::{self, Kind, Matcher},
    path::FieldPath,
    render::{self, Format},
    reporter::{ListReporter, NullReporter, Reporter, ReporterType, TableReporter},
    runner::{self, CancelHandle, Runner, Scenario, ScenarioResult},
    Aggregator, Artifacts, Client, Request, ResponseContract, RunReport,
};
