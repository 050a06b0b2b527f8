//! High-level operations over a [`SparqlTransport`]: municipality search,
//! predicate discovery, observation fetch, and parsing.
//!
//! The client is stateless apart from its configuration. Every call issues
//! exactly one query, so a refresh cycle costs two round trips.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TariffConfig;
use crate::discovery::{self, DiscoveredPredicates, DiscoveryHints};
use crate::error::{QueryError, TariffResult};
use crate::observation::{self, ParsedComponents, ParserHints};
use crate::sparql::query::QueryBuilder;
use crate::sparql::{Binding, SparqlTransport, Term, Triple};

/// A municipality returned by [`TariffClient::search_municipalities`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MunicipalityMatch {
    pub uri: String,
    pub label: String,
}

/// Query limits applied by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub sample: usize,
    pub observations: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            sample: 2000,
            observations: 200_000,
        }
    }
}

/// Tariff operations against one named graph.
pub struct TariffClient<T> {
    transport: T,
    queries: QueryBuilder,
    limits: QueryLimits,
    discovery_hints: DiscoveryHints,
    parser_hints: ParserHints,
}

impl<T: SparqlTransport> TariffClient<T> {
    pub fn new(transport: T, named_graph: impl Into<String>) -> Self {
        Self {
            transport,
            queries: QueryBuilder::new(named_graph),
            limits: QueryLimits::default(),
            discovery_hints: DiscoveryHints::default(),
            parser_hints: ParserHints::default(),
        }
    }

    /// Build a client with the graph and limits from `config`.
    pub fn from_config(transport: T, config: &TariffConfig) -> Self {
        Self::new(transport, config.named_graph.clone()).with_limits(QueryLimits {
            sample: config.sample_limit,
            observations: config.observation_limit,
        })
    }

    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_discovery_hints(mut self, hints: DiscoveryHints) -> Self {
        self.discovery_hints = hints;
        self
    }

    pub fn with_parser_hints(mut self, hints: ParserHints) -> Self {
        self.parser_hints = hints;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Find municipalities whose label contains `text`, case-insensitively.
    ///
    /// Rows missing either the IRI or the label are skipped. Whitespace-only
    /// text is rejected before any query is sent.
    pub fn search_municipalities(
        &self,
        text: &str,
        limit: usize,
    ) -> TariffResult<Vec<MunicipalityMatch>> {
        let needle = text.trim();
        if needle.is_empty() {
            return Err(QueryError::EmptySearch.into());
        }

        let rows = self
            .transport
            .select(&self.queries.municipality_search(needle, limit))?;
        let total = rows.len();

        let matches: Vec<MunicipalityMatch> = rows
            .iter()
            .filter_map(|row| {
                let uri = row.get("muni").map(Term::value).unwrap_or_default();
                let label = row.get("label").map(Term::value).unwrap_or_default();
                (!uri.is_empty() && !label.is_empty()).then(|| MunicipalityMatch {
                    uri: uri.to_string(),
                    label: label.to_string(),
                })
            })
            .collect();

        debug!(needle, rows = total, matches = matches.len(), "municipality search");
        Ok(matches)
    }

    /// Sample observations and discover the municipality and year predicates.
    pub fn discover_model(&self) -> TariffResult<DiscoveredPredicates> {
        let rows = self
            .transport
            .select(&self.queries.discovery_sample(self.limits.sample))?;
        let sample = sample_triples(&rows);
        if sample.len() < rows.len() {
            debug!(
                dropped = rows.len() - sample.len(),
                "discovery rows without predicate or object"
            );
        }
        Ok(discovery::discover(&sample, &self.discovery_hints)?)
    }

    /// Fetch every triple of the observations matching `municipality_uri` and `year`.
    pub fn fetch_observations(
        &self,
        municipality_uri: &str,
        year: i32,
        predicates: &DiscoveredPredicates,
    ) -> TariffResult<Vec<Triple>> {
        let query = self.queries.observations(
            predicates,
            municipality_uri,
            year,
            self.limits.observations,
        );
        let rows = self.transport.select(&query)?;
        if rows.len() >= self.limits.observations {
            warn!(
                limit = self.limits.observations,
                "observation query hit its row limit; results may be truncated"
            );
        }
        let triples: Vec<Triple> = rows
            .iter()
            .filter_map(|row| Triple::from_binding(row, "obs", "p", "o"))
            .collect();
        debug!(
            municipality_uri,
            year,
            rows = rows.len(),
            triples = triples.len(),
            "fetched observations"
        );
        Ok(triples)
    }

    /// Parse fetched triples with the client's parser hints.
    pub fn parse(&self, triples: &[Triple]) -> ParsedComponents {
        observation::parse(triples, &self.parser_hints)
    }
}

/// Convert discovery rows into triples, filling in a literal's datatype from
/// `?otype` when the object cell did not carry one.
fn sample_triples(rows: &[Binding]) -> Vec<Triple> {
    rows.iter()
        .filter_map(|row| {
            let mut triple = Triple::from_binding(row, "obs", "p", "o")?;
            if let Term::Literal { datatype, .. } = &mut triple.object {
                if datatype.is_none() {
                    *datatype = row
                        .get("otype")
                        .map(|t| t.value().to_string())
                        .filter(|dt| !dt.is_empty());
                }
            }
            Some(triple)
        })
        .collect()
}
