//! Diagnostic error types for the tariff fetcher.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. [`TariffError`] wraps the ones a search
//! or refresh cycle can raise so they bubble up with `?`. Config and path
//! errors live next to their modules and go straight to the CLI.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the tariff fetcher.
#[derive(Debug, Error, Diagnostic)]
pub enum TariffError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Result type for tariff operations.
pub type TariffResult<T> = std::result::Result<T, TariffError>;

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TransportError {
    #[error("SPARQL HTTP {status}: {body}")]
    #[diagnostic(
        code(tariffs::transport::status),
        help(
            "The endpoint answered with a non-200 status. A 4xx usually means the \
             generated query was rejected; a 5xx means the endpoint is unhealthy. \
             The next scheduled refresh will try again."
        )
    )]
    Status { status: u16, body: String },

    #[error("network error talking to {endpoint}: {message}")]
    #[diagnostic(
        code(tariffs::transport::network),
        help("Check connectivity to the endpoint, DNS resolution, and the configured timeout.")
    )]
    Network { endpoint: String, message: String },

    #[error("failed to decode SPARQL results: {message}")]
    #[diagnostic(
        code(tariffs::transport::decode),
        help(
            "The endpoint did not return `application/sparql-results+json`. \
             Verify the endpoint URL points at a SPARQL query service."
        )
    )]
    Decode { message: String },

    #[error("local RDF store error: {message}")]
    #[diagnostic(
        code(tariffs::transport::store),
        help("The in-memory store could not load the graph file or evaluate the query.")
    )]
    Store { message: String },
}

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("municipality search text is empty")]
    #[diagnostic(
        code(tariffs::query::empty_search),
        help("Provide at least one non-whitespace character to search for.")
    )]
    EmptySearch,
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DiscoveryError {
    #[error("could not discover a municipality predicate in {sample_size} sampled triple(s)")]
    #[diagnostic(
        code(tariffs::discovery::no_municipality),
        help(
            "No sampled observation links to a resource by IRI. The named graph may \
             be empty, or its schema changed in an incompatible way."
        )
    )]
    NoMunicipalityPredicate { sample_size: usize },

    #[error("could not discover a year predicate in {sample_size} sampled triple(s)")]
    #[diagnostic(
        code(tariffs::discovery::no_year),
        help(
            "No sampled observation carries an xsd:integer literal. The named graph may \
             be empty, or its schema changed in an incompatible way."
        )
    )]
    NoYearPredicate { sample_size: usize },
}

/// Result type for predicate discovery.
pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

// ---------------------------------------------------------------------------
// Host-facing refresh failure
// ---------------------------------------------------------------------------

/// Opaque failure of one refresh cycle, handed to the scheduler.
///
/// Carries only a short diagnostic message. Retry policy belongs to the scheduler.
#[derive(Debug, Error, Diagnostic)]
#[error("tariff update failed: {message}")]
#[diagnostic(
    code(tariffs::update::failed),
    help("The previous snapshot (if any) is still served. Run with RUST_LOG=debug for details.")
)]
pub struct UpdateFailed {
    pub message: String,
}

impl From<TariffError> for UpdateFailed {
    fn from(e: TariffError) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_failed_carries_the_underlying_message() {
        let err = TariffError::from(TransportError::Status {
            status: 502,
            body: "bad gateway".into(),
        });
        let failed = UpdateFailed::from(err);
        assert_eq!(failed.message, "SPARQL HTTP 502: bad gateway");
    }
}
