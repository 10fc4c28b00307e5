//! Pipeline stages for meal-plan extraction.
//!
//! Each submodule implements exactly one step, so the two remote services
//! can be swapped or mocked without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ parse ──▶ llm
//! (PDF)    (markdown) (JSON text)
//! ```
//!
//! 1. [`input`]: load the upload from a path or URL, validate the PDF
//!    header, stage a temporary copy for the parser
//! 2. [`parse`]: the document-parsing service (LlamaParse)
//! 3. [`llm`]: the language-model service (OpenAI, JSON mode)
//!
//! Sequencing, credential checks and response validation live in
//! [`crate::extract`].

pub mod input;
pub mod llm;
pub mod parse;
