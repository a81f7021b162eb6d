//! Record pipelines and the batch runner that drives them.
//!
//! # Overview
//!
//! ```text
//! input/Clientes-*.csv ─> loader ─> clients ─> output/*.cleaned.csv
//!                                      │   └─> quarantine
//!                                      └─> store.insert_clients ─> known customers
//!                                                                   │ refresh
//! input/Tarjetas-*.csv ─> loader ─> cards (referential filter) <────┘
//!                                      ├─> output/*.cleaned.csv
//!                                      ├─> quarantine
//!                                      └─> store.insert_cards
//! ```
//!
//! # Example
//!
//! ```no_run
//! use plata::anonymizer::Anonymizer;
//! use plata::pipeline::{BatchSettings, run_batch};
//! use plata::store::MemoryStore;
//! use secrecy::SecretString;
//!
//! # async fn example() -> plata::error::Result<()> {
//! let settings = BatchSettings {
//!     input_dir: "input".into(),
//!     output_dir: "output".into(),
//!     errors_dir: "errors".into(),
//!     run_id: BatchSettings::new_run_id(),
//! };
//! let anonymizer = Anonymizer::new(SecretString::from("salt".to_owned()));
//! let report = run_batch(&settings, &anonymizer, &MemoryStore::new()).await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod cards;
pub mod clients;
pub mod known_customers;
pub mod report;

pub use batch::{BatchSettings, run_batch};
pub use cards::{CardOutcome, process_cards};
pub use clients::{ClientOutcome, process_clients};
pub use known_customers::{KnownCustomerSet, ReferentialFilter, SetState};
pub use report::{FileReport, FileStatus, RunReport};
