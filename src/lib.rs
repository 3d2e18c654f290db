//! Finds the Anexo I and Anexo II attachments of the ANS procedure list,
//! downloads them and bundles them into a zip.
//!
//! Discovery tries a static parse of the page first and renders it in a
//! headless browser only when that comes up short.

pub mod archive;
pub mod cancel;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod scrapers;
pub mod services;
pub mod utils;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::Config;
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome};
