//! Presentation: one reading per price component, derived from the
//! coordinator state.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::config::TariffConfig;
use crate::refresh::CoordinatorState;
use crate::tariff::{PriceComponent, SOURCE_NAME, TariffSnapshot};

/// Reading name prefix when no municipality label is known.
pub const FALLBACK_NAME: &str = "Swiss Electricity Tariffs (ElCom/LINDAS)";

/// A single component as exposed to a host or printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TariffReading {
    pub key: &'static str,
    pub name: String,
    pub unique_id: String,
    /// `None` when the component was not found, never `0.0` in its place.
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub attributes: Map<String, Value>,
    pub available: bool,
    /// The value comes from an earlier snapshot because the latest refresh failed.
    pub stale: bool,
}

impl TariffReading {
    /// Build the reading for `component`.
    pub fn new(component: PriceComponent, config: &TariffConfig, state: &CoordinatorState) -> Self {
        let snapshot = state.snapshot.as_deref();
        Self {
            key: component.key(),
            name: reading_name(component, snapshot),
            unique_id: format!("{}|{}", config.municipality_uri, component.key()),
            value: snapshot.and_then(|s| s.value(component)),
            unit: snapshot.and_then(|s| s.unit(component)).map(str::to_string),
            attributes: attributes(snapshot),
            available: state.available(),
            stale: state.is_stale(),
        }
    }
}

impl fmt::Display for TariffReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.value, &self.unit) {
            (Some(value), Some(unit)) => write!(f, "{}: {value} {unit}", self.name)?,
            (Some(value), None) => write!(f, "{}: {value}", self.name)?,
            (None, _) => write!(f, "{}: unknown", self.name)?,
        }
        if self.stale {
            f.write_str(" (stale)")?;
        }
        Ok(())
    }
}

/// All five readings, in component order.
pub fn readings(config: &TariffConfig, state: &CoordinatorState) -> Vec<TariffReading> {
    PriceComponent::ALL
        .into_iter()
        .map(|component| TariffReading::new(component, config, state))
        .collect()
}

fn reading_name(component: PriceComponent, snapshot: Option<&TariffSnapshot>) -> String {
    let label = snapshot
        .map(|s| s.meta().municipality_label.as_str())
        .unwrap_or_default();
    if label.is_empty() {
        format!("{FALLBACK_NAME} {}", component.label())
    } else {
        format!("Swiss Tariff {label} {}", component.label())
    }
}

fn attributes(snapshot: Option<&TariffSnapshot>) -> Map<String, Value> {
    let mut attrs = Map::new();
    let Some(snapshot) = snapshot else {
        for key in ["municipality_label", "municipality_uri", "year", "source", "last_update"] {
            attrs.insert(key.into(), Value::Null);
        }
        return attrs;
    };

    let meta = snapshot.meta();
    attrs.insert("municipality_label".into(), json!(meta.municipality_label));
    attrs.insert("municipality_uri".into(), json!(meta.municipality_uri));
    attrs.insert("year".into(), json!(meta.year));
    attrs.insert("source".into(), json!(SOURCE_NAME));
    attrs.insert("last_update".into(), json!(meta.last_update()));
    if !meta.raw_observation_ids.is_empty() {
        attrs.insert("raw_observation_ids".into(), json!(meta.raw_observation_ids));
    }
    attrs
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::observation::ParsedComponents;

    fn config() -> TariffConfig {
        TariffConfig::new("https://ld.admin.ch/municipality/351", "Bern", 2024)
    }

    fn snapshot(label: &str, ids: Vec<String>) -> Arc<TariffSnapshot> {
        let mut parsed = ParsedComponents::default();
        parsed.values.insert(PriceComponent::Total, 27.5);
        parsed.units.insert(PriceComponent::Total, "Rp./kWh".into());
        parsed.values.insert(PriceComponent::Fees, 0.0);
        parsed.units.insert(PriceComponent::Fees, "Rp./kWh".into());
        parsed.sample_ids = ids;
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 0).unwrap();
        Arc::new(TariffSnapshot::at(
            parsed,
            label,
            "https://ld.admin.ch/municipality/351",
            2024,
            at,
        ))
    }

    fn state(snapshot: Option<Arc<TariffSnapshot>>, success: bool) -> CoordinatorState {
        CoordinatorState {
            snapshot,
            last_update_success: success,
            last_error: None,
        }
    }

    #[test]
    fn five_readings_with_stable_ids() {
        let state = state(Some(snapshot("Bern", Vec::new())), true);
        let readings = readings(&config(), &state);
        let keys: Vec<_> = readings.iter().map(|r| r.key).collect();
        assert_eq!(keys, ["total", "energy", "grid", "fees", "metering"]);
        assert_eq!(readings[0].unique_id, "https://ld.admin.ch/municipality/351|total");
        assert_eq!(readings[0].name, "Swiss Tariff Bern Total Price");
        assert!(readings.iter().all(|r| r.available && !r.stale));
    }

    #[test]
    fn absent_component_is_unknown_and_zero_is_zero() {
        let state = state(Some(snapshot("Bern", Vec::new())), true);
        let readings = readings(&config(), &state);
        assert_eq!(readings[1].value, None);
        assert_eq!(readings[1].to_string(), "Swiss Tariff Bern Energy Price: unknown");
        assert_eq!(readings[3].value, Some(0.0));
        assert_eq!(readings[3].to_string(), "Swiss Tariff Bern Fees Price: 0 Rp./kWh");
    }

    #[test]
    fn empty_label_falls_back_to_source_name() {
        let state = state(Some(snapshot("", Vec::new())), true);
        let reading = TariffReading::new(PriceComponent::Grid, &config(), &state);
        assert_eq!(
            reading.name,
            "Swiss Electricity Tariffs (ElCom/LINDAS) Grid Price"
        );
    }

    #[test]
    fn attributes_include_observation_ids_only_when_present() {
        let without = state(Some(snapshot("Bern", Vec::new())), true);
        let reading = TariffReading::new(PriceComponent::Total, &config(), &without);
        assert_eq!(reading.attributes["last_update"], "2024-03-01T06:30:00Z");
        assert_eq!(reading.attributes["source"], "ElCom/LINDAS");
        assert_eq!(reading.attributes["year"], 2024);
        assert!(!reading.attributes.contains_key("raw_observation_ids"));

        let with = state(
            Some(snapshot("Bern", vec!["https://example.org/obs/1".into()])),
            true,
        );
        let reading = TariffReading::new(PriceComponent::Total, &config(), &with);
        assert_eq!(
            reading.attributes["raw_observation_ids"],
            json!(["https://example.org/obs/1"])
        );
    }

    #[test]
    fn unavailable_before_first_refresh_and_stale_after_failure() {
        let never = state(None, false);
        let reading = TariffReading::new(PriceComponent::Total, &config(), &never);
        assert!(!reading.available);
        assert_eq!(reading.value, None);
        assert!(reading.attributes["year"].is_null());

        let stale = state(Some(snapshot("Bern", Vec::new())), false);
        let reading = TariffReading::new(PriceComponent::Total, &config(), &stale);
        assert!(reading.available);
        assert!(reading.stale);
        assert_eq!(reading.value, Some(27.5));
    }
}
