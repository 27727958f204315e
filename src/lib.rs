#![doc = "babynames-etl: one-shot ETL pipeline for the US baby names dataset."]

//! This crate downloads a zip archive from the dataset provider through an
//! authenticated browser session, extracts one named CSV entry, bulk-loads
//! its rows into a relational table and replicates every stored record to an
//! external CRM, one HTTP call at a time.
//!
//! Stages run strictly sequentially; see [`pipeline`] for the orchestration
//! and [`contract`] for the seams the stages depend on.

pub mod acquire;
pub mod browser;
pub mod config;
pub mod contract;
pub mod crm;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod store;
pub mod sync;

pub use pipeline::{run_to_completion, PipelineError, PipelineReport};
