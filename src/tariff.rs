//! Tariff data model: price components and the refresh snapshot.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::observation::ParsedComponents;

/// Provenance name attached to every snapshot.
pub const SOURCE_NAME: &str = "ElCom/LINDAS";

/// One of the five classified tariff sub-values.
///
/// Declaration order is the classification priority: when a predicate matches
/// several component hint groups equally well, the earliest variant wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PriceComponent {
    Total,
    Energy,
    Grid,
    Fees,
    Metering,
}

impl PriceComponent {
    /// All components in priority order.
    pub const ALL: [Self; 5] = [
        Self::Total,
        Self::Energy,
        Self::Grid,
        Self::Fees,
        Self::Metering,
    ];

    /// Stable machine key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::Energy => "energy",
            Self::Grid => "grid",
            Self::Fees => "fees",
            Self::Metering => "metering",
        }
    }

    /// Human-readable reading suffix.
    pub fn label(self) -> &'static str {
        match self {
            Self::Total => "Total Price",
            Self::Energy => "Energy Price",
            Self::Grid => "Grid Price",
            Self::Fees => "Fees Price",
            Self::Metering => "Metering Price",
        }
    }

    /// Whether a per-kWh candidate should be preferred over earlier candidates.
    ///
    /// Metering is billed per meter and period, so it takes whatever comes first.
    pub fn prefers_per_kwh(self) -> bool {
        !matches!(self, Self::Metering)
    }
}

impl fmt::Display for PriceComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Provenance and context of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub municipality_label: String,
    pub municipality_uri: String,
    pub year: i32,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    /// Up to 25 observation IRIs seen during the refresh, for diagnostics.
    pub raw_observation_ids: Vec<String>,
}

impl SnapshotMeta {
    /// `fetched_at` as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn last_update(&self) -> String {
        self.fetched_at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

/// The immutable output of one successful refresh.
///
/// A component with no classified candidate is absent from both maps, which
/// is distinct from a component present with value `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TariffSnapshot {
    values: BTreeMap<PriceComponent, f64>,
    units: BTreeMap<PriceComponent, String>,
    meta: SnapshotMeta,
}

impl TariffSnapshot {
    /// Build a snapshot from parsed components, stamped with the current time.
    pub fn new(
        parsed: ParsedComponents,
        municipality_label: impl Into<String>,
        municipality_uri: impl Into<String>,
        year: i32,
    ) -> Self {
        Self::at(parsed, municipality_label, municipality_uri, year, Utc::now())
    }

    /// Build a snapshot with an explicit fetch time (truncated to whole seconds).
    pub fn at(
        parsed: ParsedComponents,
        municipality_label: impl Into<String>,
        municipality_uri: impl Into<String>,
        year: i32,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            values: parsed.values,
            units: parsed.units,
            meta: SnapshotMeta {
                municipality_label: municipality_label.into(),
                municipality_uri: municipality_uri.into(),
                year,
                source: SOURCE_NAME.to_string(),
                fetched_at: fetched_at.trunc_subsecs(0),
                raw_observation_ids: parsed.sample_ids,
            },
        }
    }

    pub fn value(&self, component: PriceComponent) -> Option<f64> {
        self.values.get(&component).copied()
    }

    pub fn unit(&self, component: PriceComponent) -> Option<&str> {
        self.units.get(&component).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<PriceComponent, f64> {
        &self.values
    }

    pub fn units(&self) -> &BTreeMap<PriceComponent, String> {
        &self.units
    }

    pub fn meta(&self) -> &SnapshotMeta {
        &self.meta
    }
}
