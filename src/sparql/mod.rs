//! SPARQL result model: RDF terms, triples, and the JSON results wire format.
//!
//! Results arrive as `application/sparql-results+json`. Each binding cell is
//! converted exactly once into a [`Term`] at this boundary, so discovery and
//! parsing work on typed values instead of raw JSON.
//!
//! - [`query`]: builds the three query strings
//! - [`transport`]: the [`SparqlTransport`] seam and its HTTP implementation
//! - [`local`]: an in-memory `oxigraph` store behind the same seam

pub mod local;
pub mod query;
pub mod transport;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportResult};

pub use local::LocalStore;
pub use transport::{HttpTransport, SparqlTransport};

/// Datatype IRI of `xsd:integer`.
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

/// `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Class tagging cube observations.
pub const CUBE_OBSERVATION: &str = "https://cube.link/Observation";

/// An RDF term as delivered by a SELECT result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
    /// An IRI.
    Uri(String),
    /// A literal with its lexical form and optional datatype IRI.
    Literal {
        value: String,
        datatype: Option<String>,
    },
    /// A blank node label.
    BlankNode(String),
}

impl Term {
    /// An IRI term.
    pub fn uri(iri: impl Into<String>) -> Self {
        Self::Uri(iri.into())
    }

    /// A plain literal without datatype.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: None,
        }
    }

    /// A typed literal.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: Some(datatype.into()),
        }
    }

    /// The IRI, lexical form, or blank node label.
    pub fn value(&self) -> &str {
        match self {
            Self::Uri(iri) => iri,
            Self::Literal { value, .. } => value,
            Self::BlankNode(label) => label,
        }
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, Self::Uri(_))
    }

    /// Datatype IRI of a typed literal.
    pub fn datatype(&self) -> Option<&str> {
        match self {
            Self::Literal { datatype, .. } => datatype.as_deref(),
            _ => None,
        }
    }

    /// Whether this is a literal whose datatype IRI ends with `suffix` (e.g. `#decimal`).
    pub fn has_datatype_suffix(&self, suffix: &str) -> bool {
        self.datatype().is_some_and(|dt| dt.ends_with(suffix))
    }
}

/// One solution row of a SELECT result, keyed by variable name.
pub type Binding = HashMap<String, Term>;

/// A (subject, predicate, object) statement taken verbatim from a result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    /// Subject IRI (the observation identifier). May be empty if unbound.
    pub subject: String,
    /// Predicate IRI.
    pub predicate: String,
    /// Object term.
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }

    /// Read a triple out of a result row.
    ///
    /// Returns `None` when the predicate is unbound or empty, or the object is
    /// unbound. An unbound subject becomes the empty string.
    pub fn from_binding(binding: &Binding, s: &str, p: &str, o: &str) -> Option<Self> {
        let predicate = binding.get(p).map(Term::value).unwrap_or_default();
        if predicate.is_empty() {
            return None;
        }
        let object = binding.get(o)?.clone();
        let subject = binding.get(s).map(Term::value).unwrap_or_default();
        Some(Self::new(subject, predicate, object))
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Top-level `application/sparql-results+json` document.
#[derive(Debug, Default, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub results: ResultSet,
}

/// The `results` member of a SELECT response.
#[derive(Debug, Default, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, WireTerm>>,
}

/// A binding cell exactly as it appears on the wire.
///
/// `value` is kept as raw JSON: RDF 1.2 triple terms carry an object there.
#[derive(Debug, Clone, Deserialize)]
pub struct WireTerm {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub datatype: Option<String>,
}

impl WireTerm {
    /// Convert to a [`Term`].
    ///
    /// Unknown cell types (e.g. triple terms) and cells whose value is not a
    /// string yield `None`.
    pub fn into_term(self) -> Option<Term> {
        let serde_json::Value::String(value) = self.value else {
            return None;
        };
        match self.kind.as_str() {
            "uri" => Some(Term::Uri(value)),
            "literal" | "typed-literal" => Some(Term::Literal {
                value,
                datatype: self.datatype.filter(|dt| !dt.is_empty()),
            }),
            "bnode" => Some(Term::BlankNode(value)),
            _ => None,
        }
    }
}

impl SparqlResults {
    /// Decode a response body.
    pub fn from_json(body: &str) -> TransportResult<Self> {
        serde_json::from_str(body).map_err(|e| TransportError::Decode {
            message: e.to_string(),
        })
    }

    /// Decode a response body straight from a reader.
    pub fn from_reader(reader: impl std::io::Read) -> TransportResult<Self> {
        serde_json::from_reader(reader).map_err(|e| TransportError::Decode {
            message: e.to_string(),
        })
    }

    /// Convert every row into typed bindings, dropping cells of unknown type.
    pub fn into_bindings(self) -> Vec<Binding> {
        self.results
            .bindings
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .filter_map(|(var, cell)| cell.into_term().map(|term| (var, term)))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "head": {"vars": ["obs", "p", "o"]},
        "results": {"bindings": [
            {
                "obs": {"type": "uri", "value": "https://example.org/obs/1"},
                "p": {"type": "uri", "value": "https://example.org/energy"},
                "o": {"type": "literal", "value": "0.0842",
                      "datatype": "http://www.w3.org/2001/XMLSchema#decimal"}
            },
            {
                "obs": {"type": "uri", "value": "https://example.org/obs/1"},
                "p": {"type": "uri", "value": "https://example.org/hasUnit"},
                "o": {"type": "literal", "value": "CHF/kWh", "xml:lang": "de"}
            },
            {
                "obs": {"type": "uri", "value": "https://example.org/obs/1"},
                "p": {"type": "uri", "value": "https://example.org/note"},
                "o": {"type": "bnode", "value": "b0"}
            }
        ]}
    }"#;

    #[test]
    fn decodes_typed_bindings() {
        let bindings = SparqlResults::from_json(BODY).unwrap().into_bindings();
        assert_eq!(bindings.len(), 3);

        let o = &bindings[0]["o"];
        assert_eq!(o.value(), "0.0842");
        assert!(o.has_datatype_suffix("#decimal"));
        assert!(bindings[0]["obs"].is_uri());

        assert_eq!(bindings[1]["o"], Term::literal("CHF/kWh"));
        assert_eq!(bindings[2]["o"], Term::BlankNode("b0".into()));
    }

    #[test]
    fn missing_results_decode_as_empty() {
        let bindings = SparqlResults::from_json(r#"{"head": {}, "boolean": true}"#)
            .unwrap()
            .into_bindings();
        assert!(bindings.is_empty());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = SparqlResults::from_json("<html>502</html>").unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
    }

    #[test]
    fn unknown_cell_types_are_dropped() {
        let body = r#"{"results": {"bindings": [
            {"s": {"type": "triple", "value": ""}, "p": {"type": "uri", "value": "x"}}
        ]}}"#;
        let bindings = SparqlResults::from_json(body).unwrap().into_bindings();
        assert!(!bindings[0].contains_key("s"));
        assert_eq!(bindings[0]["p"], Term::uri("x"));
    }

    #[test]
    fn triple_term_cells_do_not_sink_the_response() {
        let body = r#"{"results": {"bindings": [
            {
                "obs": {"type": "uri", "value": "https://example.org/obs/1"},
                "p": {"type": "uri", "value": "https://example.org/energy"},
                "o": {"type": "literal", "value": "0.0842",
                      "datatype": "http://www.w3.org/2001/XMLSchema#decimal"}
            },
            {
                "obs": {"type": "uri", "value": "https://example.org/obs/1"},
                "p": {"type": "uri", "value": "https://example.org/reifies"},
                "o": {"type": "triple", "value": {
                    "subject": {"type": "uri", "value": "https://example.org/s"},
                    "predicate": {"type": "uri", "value": "https://example.org/p"},
                    "object": {"type": "literal", "value": "o"}
                }}
            },
            {"s": {"type": "uri", "value": 42}}
        ]}}"#;
        let bindings = SparqlResults::from_json(body).unwrap().into_bindings();
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings[0]["o"].value(), "0.0842");

        assert!(!bindings[1].contains_key("o"));
        assert_eq!(bindings[1]["p"], Term::uri("https://example.org/reifies"));
        assert!(Triple::from_binding(&bindings[1], "obs", "p", "o").is_none());

        assert!(bindings[2].is_empty());
    }

    #[test]
    fn triple_from_binding_requires_predicate_and_object() {
        let mut row = Binding::new();
        row.insert("p".into(), Term::uri("https://example.org/p"));
        assert!(Triple::from_binding(&row, "obs", "p", "o").is_none());

        row.insert("o".into(), Term::literal("x"));
        let triple = Triple::from_binding(&row, "obs", "p", "o").unwrap();
        assert_eq!(triple.subject, "");
        assert_eq!(triple.predicate, "https://example.org/p");

        row.insert("p".into(), Term::uri(""));
        assert!(Triple::from_binding(&row, "obs", "p", "o").is_none());
    }
}
