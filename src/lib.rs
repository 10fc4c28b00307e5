//! # mealplan-extract
//!
//! Turn a nutritionist's PDF meal plan into a structured week of meals.
//!
//! The heavy lifting is done by two hosted services: LlamaParse reads the PDF
//! into markdown, and an OpenAI chat model turns that markdown into JSON
//! following a fixed schema. This crate sequences the two calls, validates
//! the JSON against the schema, caches results per document within a
//! session, and renders the plan as tables and as a plain-text report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    local file or URL, `%PDF` check, temp copy for the parser
//!  ├─ 2. Parse    LlamaParse (Italian, multimodal) → markdown segments
//!  ├─ 3. Extract  gpt-4o-mini, temperature 0, JSON mode → meal-plan JSON
//!  ├─ 4. Validate strict schema check → MealPlan
//!  └─ 5. Render   weekly table, notes table, text report
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mealplan_extract::{
//!     render_text, weekly_table, ExtractionConfig, Extractor, Labels, NoopObserver, Session,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .parse_api_key(std::env::var("LLAMA_CLOUD_API_KEY")?)
//!         .llm_api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!
//!     let extractor = Extractor::new(config);
//!     let document = extractor.load_document("piano.pdf").await?;
//!     let mut session = Session::new(extractor);
//!     session.upload(document);
//!     let plan = session.run(&NoopObserver).await?;
//!
//!     println!("{}", weekly_table(plan, &Labels::ENGLISH).to_tsv());
//!     println!("{}", render_text(plan, &Labels::ENGLISH));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mealplan` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod schema;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ApiKey, ExtractionConfig, ExtractionConfigBuilder, SchemaValidation};
pub use error::{ErrorKind, MealPlanError};
pub use extract::Extractor;
pub use pipeline::input::{load_document, UploadedDocument};
pub use pipeline::llm::{CompletionBackend, CompletionRequest, OpenAiBackend};
pub use pipeline::parse::{DocumentParser, LlamaParseClient, ParseRequest};
pub use progress::{NoopObserver, PipelineObserver, Stage};
pub use render::table::{notes_table, weekly_table, Table};
pub use render::text::{render_text, render_text_value};
pub use render::{LabelLanguage, Labels};
pub use schema::{DayPlan, FoodItem, MealKind, MealPlan, MealSlot};
pub use session::{Session, SessionState};
