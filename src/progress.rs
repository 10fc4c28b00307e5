//! Observer trait for pipeline stage events.
//!
//! Pass a [`PipelineObserver`] to [`crate::session::Session::run`] to learn
//! when each stage starts, succeeds, fails, or is served from the session
//! cache. The CLI uses it to drive a spinner; the library never prints.
//!
//! # Example
//!
//! ```rust
//! use mealplan_extract::{PipelineObserver, Stage};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingObserver {
//!     started: AtomicUsize,
//! }
//!
//! impl PipelineObserver for CountingObserver {
//!     fn on_stage_start(&self, stage: Stage) {
//!         self.started.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} started", stage);
//!     }
//! }
//! ```

use crate::error::MealPlanError;
use std::fmt;

/// The two remote stages of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Stage {
    /// PDF → markdown via the parsing service.
    Parsing,
    /// Markdown → meal plan via the language model.
    Extraction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Parsing => f.write_str("parsing"),
            Stage::Extraction => f.write_str("extraction"),
        }
    }
}

/// Receives stage events. All methods default to no-ops.
pub trait PipelineObserver: Send + Sync {
    /// A remote call is about to be made.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// The stage succeeded.
    ///
    /// `output_len` is the markdown length in bytes for parsing and the
    /// number of days for extraction.
    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        let _ = (stage, output_len);
    }

    /// The stage result was already cached for this document; no call made.
    fn on_stage_cached(&self, stage: Stage) {
        let _ = stage;
    }

    /// The stage failed. The session is now in the `Failed` state.
    fn on_stage_error(&self, stage: Stage, error: &MealPlanError) {
        let _ = (stage, error);
    }
}

/// An observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}
