// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # swiss-tariffs
//!
//! Swiss electricity tariffs for one municipality and year, read from the
//! ElCom cube published on the LINDAS SPARQL endpoint.
//!
//! The cube's schema is not hard-coded. Each refresh samples observations,
//! scores their predicates to find the municipality and year dimensions, then
//! fetches the matching observations and classifies their numeric values into
//! five price components by keyword.
//!
//! ## Architecture
//!
//! - **SPARQL** (`sparql`): term model, query templates, HTTP and in-memory transports
//! - **Discovery** (`discovery`): scoring of predicates over a sample
//! - **Parsing** (`observation`): grouping, unit inference, classification, reduction
//! - **Refresh** (`refresh`, `daemon`): one cycle at a time, optional tokio scheduler
//! - **Presentation** (`sensor`): five readings with names, ids, and attributes
//!
//! ## Library usage
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use swiss_tariffs::config::TariffConfig;
//! use swiss_tariffs::refresh::TariffCoordinator;
//! use swiss_tariffs::sparql::HttpTransport;
//!
//! let config = TariffConfig::new("https://ld.admin.ch/municipality/351", "Bern", 2024);
//! let transport = HttpTransport::new(&config.endpoint, Duration::from_secs(60));
//! let coordinator = TariffCoordinator::new(config, transport);
//! let snapshot = coordinator.refresh().unwrap();
//! println!("{:?}", snapshot.values());
//! ```

pub mod client;
pub mod config;
#[cfg(feature = "daemon")]
pub mod daemon;
pub mod discovery;
pub mod error;
pub mod observation;
pub mod paths;
pub mod refresh;
pub mod scoring;
pub mod sensor;
pub mod sparql;
pub mod tariff;
