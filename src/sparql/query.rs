//! Query builder for the three SPARQL templates.
//!
//! Pure string assembly: the named graph comes from configuration, search
//! text is escaped for use inside a double-quoted literal, and IRIs are
//! expected to have been validated by [`crate::config::TariffConfig::validate`].

use crate::discovery::DiscoveredPredicates;

use super::XSD_INTEGER;

const PREFIX_RDFS: &str = "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\n";
const PREFIX_SCHEMA: &str = "PREFIX schema: <http://schema.org/>\n";
const PREFIX_CUBE: &str = "PREFIX cube: <https://cube.link/>\n";

/// Builds query strings against one named graph.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    named_graph: String,
}

impl QueryBuilder {
    pub fn new(named_graph: impl Into<String>) -> Self {
        Self {
            named_graph: named_graph.into(),
        }
    }

    /// Case-insensitive substring search over `rdfs:label` and `schema:name`.
    ///
    /// Binds `?muni` and `?label`.
    pub fn municipality_search(&self, text: &str, limit: usize) -> String {
        let needle = escape_literal(text);
        format!(
            "{PREFIX_RDFS}{PREFIX_SCHEMA}\
             SELECT DISTINCT ?muni ?label\n\
             FROM <{graph}>\n\
             WHERE {{\n  \
               ?muni (rdfs:label|schema:name) ?label .\n  \
               FILTER(CONTAINS(LCASE(STR(?label)), LCASE(\"{needle}\")))\n\
             }}\n\
             LIMIT {limit}",
            graph = self.named_graph,
        )
    }

    /// Every predicate/object pair of a bounded sample of observations.
    ///
    /// Binds `?obs`, `?p`, `?o`, and `?otype` (the object's datatype, unbound for IRIs).
    pub fn discovery_sample(&self, limit: usize) -> String {
        format!(
            "{PREFIX_CUBE}\
             SELECT ?obs ?p ?o ?otype\n\
             FROM <{graph}>\n\
             WHERE {{\n  \
               ?obs a cube:Observation .\n  \
               ?obs ?p ?o .\n  \
               BIND(DATATYPE(?o) AS ?otype)\n\
             }}\n\
             LIMIT {limit}",
            graph = self.named_graph,
        )
    }

    /// Every predicate/object pair of the observations for one municipality and year.
    ///
    /// Binds `?obs`, `?p`, and `?o`.
    pub fn observations(
        &self,
        predicates: &DiscoveredPredicates,
        municipality_uri: &str,
        year: i32,
        limit: usize,
    ) -> String {
        format!(
            "{PREFIX_CUBE}\
             SELECT ?obs ?p ?o\n\
             FROM <{graph}>\n\
             WHERE {{\n  \
               ?obs a cube:Observation .\n  \
               ?obs ?p ?o .\n  \
               FILTER EXISTS {{ ?obs <{muni_pred}> <{municipality_uri}> }}\n  \
               FILTER EXISTS {{ ?obs <{year_pred}> \"{year}\"^^<{XSD_INTEGER}> }}\n\
             }}\n\
             LIMIT {limit}",
            graph = self.named_graph,
            muni_pred = predicates.municipality_predicate,
            year_pred = predicates.year_predicate,
        )
    }
}

/// Escape free text for a double-quoted SPARQL string literal.
///
/// Double quotes become spaces, backslashes are doubled, and line breaks
/// become spaces.
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' | '\n' | '\r' => out.push(' '),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}
