//! # plata - batch ETL for customer and card extracts
//!
//! Reads `Clientes-YYYY-MM-DD.csv` and `Tarjetas-YYYY-MM-DD.csv` extracts
//! (`;`-delimited, UTF-8 or Latin-1), cleans and validates every row,
//! anonymizes sensitive fields and persists the accepted rows to Postgres.
//! Rejected rows are written to quarantine files grouped by reason.
//!
//! ## Quick Start
//!
//! ```no_run
//! use plata::anonymizer::Anonymizer;
//! use plata::pipeline::{BatchSettings, run_batch};
//! use plata::store::PgStore;
//! use secrecy::SecretString;
//!
//! # async fn example() -> plata::error::Result<()> {
//! let store = PgStore::connect_lazy("postgres://postgres@localhost/etl")?;
//! let settings = BatchSettings {
//!     input_dir: "input".into(),
//!     output_dir: "output".into(),
//!     errors_dir: "errors".into(),
//!     run_id: BatchSettings::new_run_id(),
//! };
//! let anonymizer = Anonymizer::new(SecretString::from("salt".to_owned()));
//! let report = run_batch(&settings, &anonymizer, &store).await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`loader`]: reading and decoding extracts
//! - [`text`] and [`validators`]: cell cleaning and field validation
//! - [`anonymizer`]: salted hashing and card masking
//! - [`records`]: typed customer and card records
//! - [`pipeline`]: per-kind processing and the batch runner
//! - [`store`]: persistence gateway (Postgres and in-memory)
//! - [`output`]: cleaned files and quarantine
//! - [`discovery`]: input directory scanning
//! - [`config`], [`logging`], [`error`]: ambient concerns
//!
//! ## Referential integrity
//!
//! Cards are only accepted for customers present in the store. The set of
//! known customers is seeded from the store, extended with the ids each
//! insert reports, and refreshed before any card file is filtered:
//!
//! ```
//! use plata::pipeline::{KnownCustomerSet, SetState};
//!
//! let known = KnownCustomerSet::from_ids(["C1".to_owned()].into_iter().collect());
//! assert_eq!(known.state(), SetState::Seeded);
//! // Not refreshed yet, so card filtering is refused.
//! assert!(known.referential_filter().is_err());
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod anonymizer;
pub mod config;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod store;
pub mod text;
pub mod validators;
