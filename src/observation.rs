//! Observation parsing: turn the triples of matched observations into one
//! value and one unit per price component.
//!
//! 1. Triples are grouped by subject (the observation IRI), in encounter order.
//! 2. Per observation, numeric literals (`decimal`, `double`, `float`,
//!    `integer`) go into a numeric map; everything else into a text map. A
//!    numeric literal that does not parse is skipped and counted.
//! 3. The observation's unit is the first text value that either looks like a
//!    unit (a currency/usage hint and at most 20 characters) or sits under a
//!    unit-like predicate. Without one, the default `CHF/kWh` applies.
//! 4. Each numeric predicate is classified by keyword counts against its IRI;
//!    the highest count wins, ties resolved by [`PriceComponent::ALL`] order.
//! 5. Candidates are reduced to one per component: the first per-kWh
//!    candidate for total/energy/grid/fees, otherwise the first seen.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::scoring::{contains_any, keyword_score, keywords};
use crate::sparql::{Term, Triple};
use crate::tariff::PriceComponent;

/// Keyword tables and limits used while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserHints {
    pub total: Vec<String>,
    pub energy: Vec<String>,
    pub grid: Vec<String>,
    pub fees: Vec<String>,
    pub metering: Vec<String>,
    /// Fallback hints for a price predicate that matches no component group.
    pub generic_price: Vec<String>,
    /// Substrings of text values that look like a unit.
    pub unit_values: Vec<String>,
    /// Substrings of predicates whose value is a unit.
    pub unit_predicates: Vec<String>,
    /// Datatype IRI suffixes treated as numeric.
    pub numeric_datatypes: Vec<String>,
    /// Unit assumed when an observation names none.
    pub default_unit: String,
    /// Longest hint-matched text value still accepted as a unit, in characters.
    pub unit_max_chars: usize,
    /// Lowercase suffix identifying a per-kWh unit.
    pub per_kwh_suffix: String,
    /// Cap on the diagnostic observation id sample.
    pub sample_id_cap: usize,
}

impl Default for ParserHints {
    fn default() -> Self {
        Self {
            total: keywords(&["total", "gesamt", "sum"]),
            energy: keywords(&["energy", "arbeit"]),
            grid: keywords(&["grid", "netz"]),
            fees: keywords(&["fee", "abgabe"]),
            metering: keywords(&["meter", "measure", "grund", "base"]),
            generic_price: keywords(&["price", "tarif"]),
            unit_values: keywords(&["chf", "kwh", "month", "year", "/kwh", "/month", "/year"]),
            unit_predicates: keywords(&["unit", "einheit"]),
            numeric_datatypes: ["#decimal", "#double", "#float", "#integer"]
                .map(String::from)
                .to_vec(),
            default_unit: "CHF/kWh".into(),
            unit_max_chars: 20,
            per_kwh_suffix: "/kwh".into(),
            sample_id_cap: 25,
        }
    }
}

impl ParserHints {
    fn component_hints(&self, component: PriceComponent) -> &[String] {
        match component {
            PriceComponent::Total => &self.total,
            PriceComponent::Energy => &self.energy,
            PriceComponent::Grid => &self.grid,
            PriceComponent::Fees => &self.fees,
            PriceComponent::Metering => &self.metering,
        }
    }

    fn is_numeric(&self, term: &Term) -> bool {
        self.numeric_datatypes
            .iter()
            .any(|suffix| term.has_datatype_suffix(suffix))
    }

    fn is_per_kwh(&self, unit: &str) -> bool {
        unit.to_lowercase().ends_with(&self.per_kwh_suffix)
    }
}

/// A classified numeric value awaiting reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub component: PriceComponent,
    pub value: f64,
    pub unit: String,
}

/// Result of parsing one refresh worth of observation triples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedComponents {
    pub values: BTreeMap<PriceComponent, f64>,
    pub units: BTreeMap<PriceComponent, String>,
    /// First observation ids encountered, capped, regardless of classification.
    pub sample_ids: Vec<String>,
    pub observation_count: usize,
    pub candidate_count: usize,
    /// Numeric-typed literals whose text did not parse as a number.
    pub skipped_literals: usize,
    /// Triples without an observation id.
    pub skipped_triples: usize,
}

/// Parse observation triples into component values and units.
pub fn parse(triples: &[Triple], hints: &ParserHints) -> ParsedComponents {
    let mut parsed = ParsedComponents::default();

    let mut observations: IndexMap<&str, Vec<(&str, &Term)>> = IndexMap::new();
    for triple in triples {
        if triple.subject.is_empty() || triple.predicate.is_empty() {
            parsed.skipped_triples += 1;
            continue;
        }
        observations
            .entry(triple.subject.as_str())
            .or_default()
            .push((triple.predicate.as_str(), &triple.object));
    }
    parsed.observation_count = observations.len();

    let mut candidates = Vec::new();
    for (id, pairs) in &observations {
        if parsed.sample_ids.len() < hints.sample_id_cap {
            parsed.sample_ids.push((*id).to_string());
        }

        let (numeric, text) = split_values(pairs, hints, &mut parsed.skipped_literals);
        let unit = infer_unit(&text, hints);

        for (predicate, value) in numeric {
            if let Some(component) = classify(predicate, hints) {
                candidates.push(Candidate {
                    component,
                    value,
                    unit: unit.clone(),
                });
            }
        }
    }

    parsed.candidate_count = candidates.len();
    let (values, units) = reduce(&candidates, hints);
    parsed.values = values;
    parsed.units = units;

    debug!(
        observations = parsed.observation_count,
        candidates = parsed.candidate_count,
        components = parsed.values.len(),
        skipped_literals = parsed.skipped_literals,
        skipped_triples = parsed.skipped_triples,
        "parsed observations"
    );
    parsed
}

/// Split one observation's pairs into numeric and text maps.
///
/// A predicate that repeats keeps its first position and its last value.
fn split_values<'a>(
    pairs: &[(&'a str, &'a Term)],
    hints: &ParserHints,
    skipped: &mut usize,
) -> (IndexMap<&'a str, f64>, IndexMap<&'a str, &'a str>) {
    let mut numeric = IndexMap::new();
    let mut text = IndexMap::new();

    for &(predicate, object) in pairs {
        if hints.is_numeric(object) {
            match parse_number(object.value()) {
                Some(value) => {
                    numeric.insert(predicate, value);
                }
                None => *skipped += 1,
            }
        } else {
            text.insert(predicate, object.value());
        }
    }

    (numeric, text)
}

fn parse_number(lexical: &str) -> Option<f64> {
    lexical.trim().parse().ok()
}

/// Pick the unit for one observation from its text values.
pub fn infer_unit(text: &IndexMap<&str, &str>, hints: &ParserHints) -> String {
    let mut candidates: Vec<&str> = Vec::new();
    for (&predicate, &value) in text {
        if contains_any(value, &hints.unit_values) && value.chars().count() <= hints.unit_max_chars
        {
            candidates.push(value);
        }
        if contains_any(predicate, &hints.unit_predicates) {
            candidates.push(value);
        }
    }

    candidates
        .first()
        .map(|unit| unit.to_string())
        .unwrap_or_else(|| hints.default_unit.clone())
}

/// Classify a numeric predicate into a price component.
///
/// Returns `None` when no component hint matches and the predicate does not
/// look like a price at all.
pub fn classify(predicate: &str, hints: &ParserHints) -> Option<PriceComponent> {
    let scores = PriceComponent::ALL.map(|c| keyword_score(predicate, hints.component_hints(c)));
    let max = scores.iter().copied().max().unwrap_or(0);

    if max == 0 && !contains_any(predicate, &hints.generic_price) {
        return None;
    }

    PriceComponent::ALL
        .into_iter()
        .zip(scores)
        .find_map(|(component, score)| (score == max).then_some(component))
}

/// Reduce candidates to one value and unit per component.
///
/// Total, energy, grid, and fees take their first per-kWh candidate and fall
/// back to their first candidate of any unit. Metering always takes its first.
pub fn reduce(
    candidates: &[Candidate],
    hints: &ParserHints,
) -> (BTreeMap<PriceComponent, f64>, BTreeMap<PriceComponent, String>) {
    // (candidate, settled): settled once a preferred candidate is found.
    let mut chosen: BTreeMap<PriceComponent, (&Candidate, bool)> = BTreeMap::new();

    for candidate in candidates {
        let preferred = candidate.component.prefers_per_kwh() && hints.is_per_kwh(&candidate.unit);
        match chosen.get(&candidate.component).map(|&(_, settled)| settled) {
            None => {
                let settled = preferred || !candidate.component.prefers_per_kwh();
                chosen.insert(candidate.component, (candidate, settled));
            }
            Some(false) if preferred => {
                chosen.insert(candidate.component, (candidate, true));
            }
            Some(_) => {}
        }
    }

    let values = chosen
        .iter()
        .map(|(&component, (candidate, _))| (component, candidate.value))
        .collect();
    let units = chosen
        .into_iter()
        .map(|(component, (candidate, _))| (component, candidate.unit.clone()))
        .collect();
    (values, units)
}
