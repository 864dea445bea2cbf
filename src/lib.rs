//! Implicit-feedback preprocessing and NCF training pipeline.
//!
//! The pipeline runs in two strictly sequential stages over an object-store
//! bucket of byte blobs:
//!
//! 1. **preprocess**: load raw `(user, product, event_type, event_time)`
//!    rows, keep only "view" events, derive an interaction-strength label,
//!    encode raw identifiers to dense indices, split deterministically into
//!    train/test sets and persist all three artifacts.
//! 2. **train**: load the encoded splits and the canonical encoders, build
//!    the two-tower embedding model, run the optimization loop and persist
//!    the fitted weights.
//!
//! Every failure is fatal to the run: there are no retries and no cleanup
//! of partially written blobs.

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod store;
pub mod train;

pub use config::PipelineConfig;
pub use error::{PipelineErr, Result};
