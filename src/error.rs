use thiserror::Error;

/// Errors surfaced to the caller before or outside a running search.
///
/// Conditions that occur during propagation (no forecast coverage, no
/// feasible heading) are recovered locally by dropping the affected
/// candidate and never appear here.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("polar file format: {0}")]
    PolarFormat(String),

    #[error("land mask: {0}")]
    MaskLoad(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
