//! In-memory RDF store answering the same queries as the remote endpoint.
//!
//! Wraps an `oxigraph` [`Store`]. Data is loaded into the configured named
//! graph so the `FROM <graph>` clause of every generated query resolves the
//! same way it does against the live endpoint. Used for offline runs against
//! a Turtle dump and for end-to-end tests.

use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{BlankNode, GraphName, Literal, NamedNode, Quad, Term as OxTerm};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use tracing::debug;

use crate::error::{TransportError, TransportResult};

use super::transport::SparqlTransport;
use super::{Binding, Term, Triple};

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// A SPARQL store held entirely in memory.
pub struct LocalStore {
    store: Store,
    graph: NamedNode,
}

impl LocalStore {
    /// Create an empty store whose data lives in `named_graph`.
    pub fn in_memory(named_graph: &str) -> TransportResult<Self> {
        let store = Store::new().map_err(|e| store_error("failed to create oxigraph store", e))?;
        let graph = named_node(named_graph)?;
        Ok(Self { store, graph })
    }

    /// Create a store and load a Turtle file into `named_graph`.
    pub fn from_turtle_file(path: &Path, named_graph: &str) -> TransportResult<Self> {
        let local = Self::in_memory(named_graph)?;
        let file = std::fs::File::open(path).map_err(|e| {
            store_error(&format!("failed to open {}", path.display()), e)
        })?;
        local.load_turtle(std::io::BufReader::new(file))?;
        Ok(local)
    }

    /// Load Turtle data into the named graph.
    pub fn load_turtle(&self, reader: impl std::io::Read) -> TransportResult<()> {
        let parser =
            RdfParser::from_format(RdfFormat::Turtle).with_default_graph(self.graph.clone());
        self.store
            .load_from_reader(parser, reader)
            .map_err(|e| store_error("failed to load Turtle", e))?;
        debug!(quads = self.len(), graph = %self.graph, "loaded Turtle into local store");
        Ok(())
    }

    /// Insert one triple into the named graph.
    pub fn insert(&self, triple: &Triple) -> TransportResult<()> {
        let predicate = named_node(&triple.predicate)?;
        let object: OxTerm = match &triple.object {
            Term::Uri(iri) => named_node(iri)?.into(),
            Term::Literal {
                value,
                datatype: Some(dt),
            } => Literal::new_typed_literal(value.as_str(), named_node(dt)?).into(),
            Term::Literal {
                value,
                datatype: None,
            } => Literal::new_simple_literal(value.as_str()).into(),
            Term::BlankNode(label) => blank_node(label)?.into(),
        };

        let graph = GraphName::NamedNode(self.graph.clone());
        let quad = match triple.subject.strip_prefix("_:") {
            Some(label) => Quad::new(blank_node(label)?, predicate, object, graph),
            None => Quad::new(named_node(&triple.subject)?, predicate, object, graph),
        };
        self.store
            .insert(&quad)
            .map_err(|e| store_error("insert failed", e))?;
        Ok(())
    }

    /// Insert a batch of triples.
    pub fn insert_all<'a>(
        &self,
        triples: impl IntoIterator<Item = &'a Triple>,
    ) -> TransportResult<()> {
        for triple in triples {
            self.insert(triple)?;
        }
        Ok(())
    }

    /// Number of quads in the store.
    pub fn len(&self) -> usize {
        self.store.len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SparqlTransport for LocalStore {
    #[allow(deprecated)]
    fn select(&self, query: &str) -> TransportResult<Vec<Binding>> {
        let results = self
            .store
            .query(query)
            .map_err(|e| store_error("SPARQL query failed", e))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| store_error("solution error", e))?;
                    let row: Binding = solution
                        .iter()
                        .filter_map(|(var, term)| {
                            convert_term(term).map(|t| (var.as_str().to_string(), t))
                        })
                        .collect();
                    rows.push(row);
                }
                Ok(rows)
            }
            _ => Err(TransportError::Store {
                message: "expected SELECT solutions".into(),
            }),
        }
    }
}

/// Map an oxigraph term to the shape the JSON results format would deliver.
fn convert_term(term: &OxTerm) -> Option<Term> {
    match term {
        OxTerm::NamedNode(node) => Some(Term::uri(node.as_str())),
        OxTerm::BlankNode(node) => Some(Term::BlankNode(node.as_str().to_string())),
        OxTerm::Literal(literal) => {
            let datatype = literal.datatype().as_str();
            if literal.language().is_some() || datatype == XSD_STRING {
                Some(Term::literal(literal.value()))
            } else {
                Some(Term::typed(literal.value(), datatype))
            }
        }
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn named_node(iri: &str) -> TransportResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| store_error(&format!("invalid IRI <{iri}>"), e))
}

fn blank_node(label: &str) -> TransportResult<BlankNode> {
    BlankNode::new(label).map_err(|e| store_error(&format!("invalid blank node _:{label}"), e))
}

fn store_error(context: &str, e: impl std::fmt::Display) -> TransportError {
    TransportError::Store {
        message: format!("{context}: {e}"),
    }
}
