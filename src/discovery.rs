//! Predicate discovery: which predicates link an observation to its
//! municipality and to its year.
//!
//! The graph schema is not known ahead of time. Every refresh scores the
//! predicates of a sample of observation triples:
//!
//! - IRI-valued objects are municipality candidates. A predicate whose IRI
//!   contains a municipality hint earns 3 points per triple, any other earns 1.
//! - `xsd:integer` literals are year candidates, scored the same way against
//!   the year hints.
//!
//! A predicate can collect points in both tables. The winner per role is the
//! strict maximum; ties go to the predicate encountered first, so the result
//! is only as stable as the endpoint's row order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::scoring::{ScoreTable, contains_any, keywords};
use crate::sparql::Triple;

/// Hint substrings and point values used for scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryHints {
    /// Substrings marking a municipality predicate (lowercase).
    pub municipality: Vec<String>,
    /// Substrings marking a year predicate (lowercase).
    pub year: Vec<String>,
    /// Points for a triple whose predicate matches a hint.
    pub hinted_points: u32,
    /// Points for any other candidate triple.
    pub baseline_points: u32,
}

impl Default for DiscoveryHints {
    fn default() -> Self {
        Self {
            municipality: keywords(&["municip", "gemeinde", "commune", "gemeindeid"]),
            year: keywords(&["year", "jahr"]),
            hinted_points: 3,
            baseline_points: 1,
        }
    }
}

/// The two predicates the observation query filters on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPredicates {
    pub municipality_predicate: String,
    pub year_predicate: String,
}

/// Score tables accumulated over a sample.
#[derive(Debug, Clone, Default)]
pub struct PredicateScores {
    pub municipality: ScoreTable,
    pub year: ScoreTable,
    /// Number of triples considered.
    pub sample_size: usize,
}

impl PredicateScores {
    /// Pick the best predicate per role.
    pub fn select(&self) -> DiscoveryResult<DiscoveredPredicates> {
        let (municipality_predicate, muni_score) =
            self.municipality
                .best()
                .ok_or(DiscoveryError::NoMunicipalityPredicate {
                    sample_size: self.sample_size,
                })?;
        let (year_predicate, year_score) =
            self.year.best().ok_or(DiscoveryError::NoYearPredicate {
                sample_size: self.sample_size,
            })?;

        debug!(
            municipality = municipality_predicate,
            muni_score,
            year = year_predicate,
            year_score,
            "discovered predicates"
        );

        Ok(DiscoveredPredicates {
            municipality_predicate: municipality_predicate.to_string(),
            year_predicate: year_predicate.to_string(),
        })
    }
}

/// Accumulate municipality and year scores over `sample`.
pub fn score_sample(sample: &[Triple], hints: &DiscoveryHints) -> PredicateScores {
    let mut scores = PredicateScores {
        sample_size: sample.len(),
        ..Default::default()
    };

    for triple in sample {
        let predicate = triple.predicate.as_str();
        if predicate.is_empty() {
            continue;
        }

        if triple.object.is_uri() {
            let points = if contains_any(predicate, &hints.municipality) {
                hints.hinted_points
            } else {
                hints.baseline_points
            };
            scores.municipality.award(predicate, points);
        }

        if triple.object.has_datatype_suffix("#integer") {
            let points = if contains_any(predicate, &hints.year) {
                hints.hinted_points
            } else {
                hints.baseline_points
            };
            scores.year.award(predicate, points);
        }
    }

    scores
}

/// Discover the municipality and year predicates from a sample of observation triples.
pub fn discover(
    sample: &[Triple],
    hints: &DiscoveryHints,
) -> DiscoveryResult<DiscoveredPredicates> {
    score_sample(sample, hints).select()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::{CUBE_OBSERVATION, RDF_TYPE, Term, XSD_INTEGER};

    const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";

    fn obs(n: u32, p: &str, o: Term) -> Triple {
        Triple::new(format!("https://example.org/obs/{n}"), p, o)
    }

    fn lindas_like_sample() -> Vec<Triple> {
        let mut sample = Vec::new();
        for n in 0..5 {
            sample.push(obs(n, RDF_TYPE, Term::uri(CUBE_OBSERVATION)));
            sample.push(obs(
                n,
                "https://energy.ld.admin.ch/elcom/electricityprice/dimension/municipality",
                Term::uri(format!("https://ld.admin.ch/municipality/{}", 350 + n)),
            ));
            sample.push(obs(
                n,
                "https://energy.ld.admin.ch/elcom/electricityprice/dimension/period",
                Term::typed("2024", XSD_INTEGER),
            ));
            sample.push(obs(
                n,
                "https://energy.ld.admin.ch/elcom/electricityprice/dimension/category",
                Term::uri("https://energy.ld.admin.ch/elcom/electricityprice/category/H4"),
            ));
            sample.push(obs(
                n,
                "https://energy.ld.admin.ch/elcom/electricityprice/total",
                Term::typed("27.5", DECIMAL),
            ));
        }
        sample
    }

    #[test]
    fn hinted_predicate_beats_more_frequent_baseline() {
        let preds = discover(&lindas_like_sample(), &DiscoveryHints::default()).unwrap();
        assert_eq!(
            preds.municipality_predicate,
            "https://energy.ld.admin.ch/elcom/electricityprice/dimension/municipality"
        );
        // "period" carries no year hint but is the only integer-valued predicate.
        assert_eq!(
            preds.year_predicate,
            "https://energy.ld.admin.ch/elcom/electricityprice/dimension/period"
        );
    }

    #[test]
    fn discovery_is_deterministic() {
        let sample = lindas_like_sample();
        let hints = DiscoveryHints::default();
        let first = discover(&sample, &hints).unwrap();
        for _ in 0..10 {
            assert_eq!(discover(&sample, &hints).unwrap(), first);
        }
    }

    #[test]
    fn hinted_and_frequent_year_candidates_tie_to_first_seen() {
        let sample = vec![
            obs(1, "https://example.org/count", Term::typed("7", XSD_INTEGER)),
            obs(1, "https://example.org/Jahr", Term::typed("2024", XSD_INTEGER)),
            obs(2, "https://example.org/count", Term::typed("9", XSD_INTEGER)),
            obs(3, "https://example.org/count", Term::typed("1", XSD_INTEGER)),
            obs(1, "https://example.org/gemeinde", Term::uri("https://example.org/m/1")),
        ];
        let scores = score_sample(&sample, &DiscoveryHints::default());
        assert_eq!(scores.year.score("https://example.org/count"), Some(3));
        assert_eq!(scores.year.score("https://example.org/Jahr"), Some(3));

        // Tied at 3: the predicate seen first wins.
        let preds = scores.select().unwrap();
        assert_eq!(preds.year_predicate, "https://example.org/count");
    }

    #[test]
    fn predicate_can_score_in_both_tables() {
        let sample = vec![
            obs(1, "https://example.org/ref", Term::uri("https://example.org/m/1")),
            obs(2, "https://example.org/ref", Term::typed("2024", XSD_INTEGER)),
        ];
        let preds = discover(&sample, &DiscoveryHints::default()).unwrap();
        assert_eq!(preds.municipality_predicate, "https://example.org/ref");
        assert_eq!(preds.year_predicate, "https://example.org/ref");
    }

    #[test]
    fn non_integer_literals_are_not_year_candidates() {
        let sample = vec![
            obs(1, "https://example.org/municipality", Term::uri("https://example.org/m/1")),
            obs(1, "https://example.org/year", Term::typed("2024.0", DECIMAL)),
            obs(1, "https://example.org/year", Term::literal("2024")),
        ];
        let err = discover(&sample, &DiscoveryHints::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoYearPredicate { sample_size: 3 }));
    }

    #[test]
    fn no_uri_and_no_integer_triples_fail() {
        let sample = vec![
            obs(1, "https://example.org/label", Term::literal("Bern")),
            obs(1, "https://example.org/price", Term::typed("0.3", DECIMAL)),
        ];
        let err = discover(&sample, &DiscoveryHints::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoMunicipalityPredicate { .. }));

        let err = discover(&[], &DiscoveryHints::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoMunicipalityPredicate { sample_size: 0 }));
    }

    #[test]
    fn empty_predicates_are_skipped() {
        let sample = vec![
            obs(1, "", Term::uri("https://example.org/m/1")),
            obs(1, "", Term::typed("2024", XSD_INTEGER)),
        ];
        let scores = score_sample(&sample, &DiscoveryHints::default());
        assert!(scores.municipality.is_empty());
        assert!(scores.year.is_empty());
    }
}
