//! Session state: the current upload, its cached results, and where the
//! pipeline stands.
//!
//! ```text
//!            upload                run
//!   Idle ─────────────▶ Idle ───────────▶ Parsing ──▶ Parsed ──▶ Extracting ──▶ Extracted
//!     ▲                                      │                      │
//!     │ reset / new document                 ▼                      ▼
//!     └──────────────────────────────── Failed{Parsing}      Failed{Extraction}
//! ```
//!
//! Results are memoised per document fingerprint: running again after a
//! success makes no remote call, running again after a failure repeats only
//! the stage that failed, and uploading the same bytes again keeps the cache.
//! A different document, or [`Session::reset`], discards everything.

use crate::config::ApiKey;
use crate::error::{ErrorKind, MealPlanError};
use crate::extract::Extractor;
use crate::pipeline::input::UploadedDocument;
use crate::progress::{PipelineObserver, Stage};
use crate::schema::MealPlan;
use std::fmt;
use tracing::{debug, info};

/// Where the pipeline stands for the current upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SessionState {
    /// No run in progress and no result yet (with or without an upload).
    Idle,
    Parsing,
    /// Markdown is available.
    Parsed,
    Extracting,
    /// Markdown and meal plan are available.
    Extracted,
    /// The last run stopped at `stage`. Earlier results are kept.
    Failed { stage: Stage, kind: ErrorKind },
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Parsing => f.write_str("parsing"),
            SessionState::Parsed => f.write_str("parsed"),
            SessionState::Extracting => f.write_str("extracting"),
            SessionState::Extracted => f.write_str("extracted"),
            SessionState::Failed { stage, kind } => write!(f, "{stage} failed ({kind})"),
        }
    }
}

/// One interactive session over one upload at a time.
#[derive(Debug)]
pub struct Session {
    extractor: Extractor,
    state: SessionState,
    document: Option<UploadedDocument>,
    fingerprint: Option<String>,
    markdown: Option<String>,
    plan: Option<MealPlan>,
}

impl Session {
    pub fn new(extractor: Extractor) -> Self {
        Self {
            extractor,
            state: SessionState::Idle,
            document: None,
            fingerprint: None,
            markdown: None,
            plan: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> Option<&UploadedDocument> {
        self.document.as_ref()
    }

    pub fn markdown(&self) -> Option<&str> {
        self.markdown.as_deref()
    }

    pub fn plan(&self) -> Option<&MealPlan> {
        self.plan.as_ref()
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn set_parse_key(&mut self, key: Option<ApiKey>) {
        self.extractor.set_parse_api_key(key);
    }

    pub fn set_llm_key(&mut self, key: Option<ApiKey>) {
        self.extractor.set_llm_api_key(key);
    }

    /// Make `document` the current upload.
    ///
    /// Returns `true` when it has the same content as the current upload and
    /// the cached results were kept.
    pub fn upload(&mut self, document: UploadedDocument) -> bool {
        let fingerprint = document.fingerprint();
        let same = self.fingerprint.as_deref() == Some(fingerprint.as_str());

        if same {
            debug!("Re-upload of {}; keeping cached results", document.name);
        } else {
            info!("New document {}; cache invalidated", document.name);
            self.markdown = None;
            self.plan = None;
            self.state = SessionState::Idle;
            self.fingerprint = Some(fingerprint);
        }
        self.document = Some(document);
        same
    }

    /// Drop the upload and every derived result.
    pub fn reset(&mut self) {
        info!("Session reset");
        self.document = None;
        self.fingerprint = None;
        self.markdown = None;
        self.plan = None;
        self.state = SessionState::Idle;
    }

    /// Run whatever stages are not cached yet for the current upload.
    pub async fn run(&mut self, observer: &dyn PipelineObserver) -> Result<&MealPlan, MealPlanError> {
        let Some(document) = self.document.as_ref() else {
            return Err(MealPlanError::InvalidInput {
                input: "session".into(),
                reason: "no document uploaded".into(),
            });
        };

        if self.markdown.is_some() {
            observer.on_stage_cached(Stage::Parsing);
        } else {
            self.state = SessionState::Parsing;
            observer.on_stage_start(Stage::Parsing);
            match self.extractor.obtain_markdown(document).await {
                Ok(markdown) => {
                    observer.on_stage_complete(Stage::Parsing, markdown.len());
                    self.markdown = Some(markdown);
                    self.state = SessionState::Parsed;
                }
                Err(e) => return Err(self.fail(Stage::Parsing, e, observer)),
            }
        }

        if self.plan.is_some() {
            observer.on_stage_cached(Stage::Extraction);
        } else {
            let markdown = self.markdown.as_deref().unwrap_or_default();
            self.state = SessionState::Extracting;
            observer.on_stage_start(Stage::Extraction);
            match self.extractor.extract_structured(markdown).await {
                Ok(plan) => {
                    observer.on_stage_complete(Stage::Extraction, plan.days.len());
                    self.plan = Some(plan);
                }
                Err(e) => return Err(self.fail(Stage::Extraction, e, observer)),
            }
        }

        self.state = SessionState::Extracted;
        self.plan
            .as_ref()
            .ok_or_else(|| MealPlanError::Internal("meal plan missing after extraction".into()))
    }

    fn fail(&mut self, stage: Stage, error: MealPlanError, observer: &dyn PipelineObserver) -> MealPlanError {
        self.state = SessionState::Failed {
            stage,
            kind: error.kind(),
        };
        observer.on_stage_error(stage, &error);
        error
    }
}
