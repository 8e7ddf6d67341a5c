pub type Result<T> = std::result::Result<T, Error>;

/// Hard failures of the harness. Per-scenario mismatches and transport
/// failures are never reported through this type; they are recorded in
/// [`crate::ScenarioResult`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Occurs when `apicheck.toml` fails to load.
    #[error("failed to load apicheck.toml: {0}")]
    LoadError(String),
    /// Occurs when the specified key is not found in `apicheck.toml`.
    #[error("the specified key \"{0}\" not found in apicheck.toml")]
    ValueNotFound(String),
    /// Occurs when a config value cannot be converted into the requested type.
    #[error("failed to convert config value: {0:#}")]
    ValueError(eyre::Error),
    /// A field path could not be parsed.
    #[error("invalid field path \"{path}\": {reason}")]
    InvalidPath { path: String, reason: String },
    /// A scenario declaration is malformed.
    #[error("invalid scenario \"{name}\": {reason}")]
    InvalidScenario { name: String, reason: String },
    /// `record` was called on an aggregator that has already been finalized.
    #[error("aggregator closed: the run report has already been finalized")]
    AggregatorClosed,
    /// Writing the report artifact failed.
    #[error("failed to write report to {path}: {source}")]
    ReportWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}
