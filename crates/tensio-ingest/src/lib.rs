//! The Tensio dataset ingestion pipeline.
//!
//! Four sequential stages, each feeding the next:
//!
//!   uploaded file
//!     └─ convert::normalize_to()      → staged canonical CSV
//!          └─ archive::archive_existing() → prior dataset preserved
//!               └─ Predictor::run()       → output CSV from the ML process
//!                    └─ reconcile::reconcile() → rows upserted, stale years archived
//!
//! Every stage fails fast; no stage is retried. [`pipeline::IngestPipeline`]
//! owns the orchestration and the resolved file locations.

pub mod archive;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod predictor;
pub mod reconcile;

pub use error::{Error, Result};
pub use pipeline::{IngestPaths, IngestPipeline, IngestReport};
pub use predictor::{CannedPredictor, Predictor, ProcessPredictor};
