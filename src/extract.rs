//! The extraction orchestrator: the two remote calls and their contracts.
//!
//! [`Extractor`] owns the configuration and the two service seams. Each
//! operation checks its credential before touching the network, performs
//! exactly one remote call (the parse job counts as one), and converts every
//! failure into a [`MealPlanError`]. Memoisation is not done here; see
//! [`crate::session::Session`].

use crate::config::{ApiKey, ExtractionConfig};
use crate::error::MealPlanError;
use crate::pipeline::input::{self, StagedDocument, UploadedDocument};
use crate::pipeline::llm::{CompletionBackend, CompletionRequest, OpenAiBackend, LLM_SERVICE};
use crate::pipeline::parse::{DocumentParser, LlamaParseClient, ParseRequest, PARSE_SERVICE};
use crate::prompts::{extraction_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::schema::MealPlan;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sequences document parsing and structured extraction.
#[derive(Clone)]
pub struct Extractor {
    config: ExtractionConfig,
    parser: Arc<dyn DocumentParser>,
    backend: Arc<dyn CompletionBackend>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.config)
            .field("parser", &"<dyn DocumentParser>")
            .field("backend", &"<dyn CompletionBackend>")
            .finish()
    }
}

impl Extractor {
    /// LlamaParse + OpenAI, configured from `config`.
    pub fn new(config: ExtractionConfig) -> Self {
        let parser = Arc::new(LlamaParseClient::from_config(&config));
        Self::with_services(config, parser, Arc::new(OpenAiBackend::new()))
    }

    /// Use caller-supplied service implementations.
    pub fn with_services(
        config: ExtractionConfig,
        parser: Arc<dyn DocumentParser>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            config,
            parser,
            backend,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn set_parse_api_key(&mut self, key: Option<ApiKey>) {
        self.config.parse_api_key = key;
    }

    pub fn set_llm_api_key(&mut self, key: Option<ApiKey>) {
        self.config.llm_api_key = key;
    }

    /// Load a PDF from a path or URL, downloading with the configured
    /// `download_timeout_secs`.
    pub async fn load_document(&self, source: &str) -> Result<UploadedDocument, MealPlanError> {
        input::load_document(source, self.config.download_timeout_secs).await
    }

    /// PDF → markdown.
    ///
    /// Segments are concatenated in service order, each followed by a
    /// newline. The staged temporary copy is removed before this returns.
    pub async fn obtain_markdown(&self, document: &UploadedDocument) -> Result<String, MealPlanError> {
        let api_key = require_key(
            self.config.parse_api_key.as_ref(),
            PARSE_SERVICE,
            "Set LLAMA_CLOUD_API_KEY or pass --llama-api-key.",
        )?;
        document.validate()?;

        let request = ParseRequest {
            api_key: api_key.expose().to_string(),
            language: self.config.language.clone(),
            vendor_model: self.config.vendor_model.clone(),
        };

        info!("Parsing {} ({} bytes)", document.name, document.bytes.len());
        let segments = {
            let staged = StagedDocument::stage(document).await?;
            self.parser.parse(staged.path(), &request).await?
        };

        if segments.iter().all(|s| s.trim().is_empty()) {
            warn!("{} returned {} empty segments", PARSE_SERVICE, segments.len());
            return Err(MealPlanError::EmptyResult {
                service: PARSE_SERVICE.to_string(),
            });
        }

        let markdown = join_segments(&segments);
        debug!("Markdown: {} segments, {} bytes", segments.len(), markdown.len());
        Ok(markdown)
    }

    /// Markdown → validated meal plan.
    pub async fn extract_structured(&self, markdown: &str) -> Result<MealPlan, MealPlanError> {
        let raw = self.request_completion(markdown).await?;
        parse_meal_plan(&raw, &self.config)
    }

    /// Markdown → raw model text, without parsing it.
    async fn request_completion(&self, markdown: &str) -> Result<String, MealPlanError> {
        let api_key = require_key(
            self.config.llm_api_key.as_ref(),
            LLM_SERVICE,
            "Set OPENAI_API_KEY or pass --openai-api-key.",
        )?;
        if markdown.trim().is_empty() {
            return Err(MealPlanError::InvalidInput {
                input: "markdown".into(),
                reason: "no markdown content to extract from".into(),
            });
        }

        let request = CompletionRequest {
            api_key: api_key.expose().to_string(),
            model: self.config.model.clone(),
            system_prompt: self
                .config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            user_prompt: extraction_prompt(markdown),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        info!("Extracting meal plan with {}", request.model);
        self.backend.complete_json(&request).await
    }
}

fn require_key<'a>(
    key: Option<&'a ApiKey>,
    service: &str,
    hint: &str,
) -> Result<&'a ApiKey, MealPlanError> {
    key.ok_or_else(|| MealPlanError::Configuration {
        service: service.to_string(),
        hint: hint.to_string(),
    })
}

/// Each segment followed by a newline, in order.
pub fn join_segments(segments: &[String]) -> String {
    let mut out = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
    for segment in segments {
        out.push_str(segment);
        out.push('\n');
    }
    out
}

/// Strict JSON parse followed by schema validation.
///
/// Both failures keep the raw text in [`MealPlanError::MalformedResponse`].
pub fn parse_meal_plan(raw: &str, config: &ExtractionConfig) -> Result<MealPlan, MealPlanError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| MealPlanError::MalformedResponse {
            reason: format!("not valid JSON: {e}"),
            raw: raw.to_string(),
        })?;

    let plan = MealPlan::from_json(&value, config.schema_validation).map_err(|v| {
        MealPlanError::MalformedResponse {
            reason: format!("does not match the meal-plan schema: {v}"),
            raw: raw.to_string(),
        }
    })?;

    info!("Extracted {} days, {} notes", plan.days.len(), plan.notes.len());
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaValidation;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeParser {
        calls: AtomicUsize,
        segments: Vec<String>,
        seen_path: Mutex<Option<std::path::PathBuf>>,
        seen_request: Mutex<Option<ParseRequest>>,
    }

    #[async_trait]
    impl DocumentParser for FakeParser {
        async fn parse(&self, path: &Path, request: &ParseRequest) -> Result<Vec<String>, MealPlanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(path.exists(), "staged file must exist during the call");
            *self.seen_path.lock().unwrap() = Some(path.to_path_buf());
            *self.seen_request.lock().unwrap() = Some(request.clone());
            Ok(self.segments.clone())
        }
    }

    struct FakeBackend {
        calls: AtomicUsize,
        reply: String,
        seen: Mutex<Option<CompletionRequest>>,
    }

    impl FakeBackend {
        fn replying(reply: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply: reply.to_string(),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for FakeBackend {
        async fn complete_json(&self, request: &CompletionRequest) -> Result<String, MealPlanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = Some(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn keyed_config() -> ExtractionConfig {
        ExtractionConfig::builder()
            .parse_api_key("llx-test")
            .llm_api_key("sk-test")
            .build()
            .unwrap()
    }

    fn pdf() -> UploadedDocument {
        UploadedDocument::new("piano.pdf", b"%PDF-1.7 test".to_vec())
    }

    #[test]
    fn join_appends_newline_to_each_segment() {
        let segs = vec!["# Lunedì".to_string(), "# Martedì".to_string()];
        assert_eq!(join_segments(&segs), "# Lunedì\n# Martedì\n");
        assert_eq!(join_segments(&[]), "");
    }

    #[tokio::test]
    async fn obtain_markdown_sends_italian_multimodal_request() {
        let parser = Arc::new(FakeParser {
            segments: vec!["page one".into(), "page two".into()],
            ..Default::default()
        });
        let ex = Extractor::with_services(keyed_config(), parser.clone(), Arc::new(FakeBackend::replying("{}")));

        let md = ex.obtain_markdown(&pdf()).await.unwrap();
        assert_eq!(md, "page one\npage two\n");

        let req = parser.seen_request.lock().unwrap().clone().unwrap();
        assert_eq!(req.api_key, "llx-test");
        assert_eq!(req.language, "it");
        assert_eq!(req.vendor_model.as_deref(), Some("anthropic-sonnet-3.7"));

        let staged = parser.seen_path.lock().unwrap().clone().unwrap();
        assert!(!staged.exists(), "staged copy must be removed after the call");
    }

    #[tokio::test]
    async fn obtain_markdown_empty_result() {
        let parser = Arc::new(FakeParser {
            segments: vec!["  ".into(), "\n".into()],
            ..Default::default()
        });
        let ex = Extractor::with_services(keyed_config(), parser, Arc::new(FakeBackend::replying("{}")));
        let err = ex.obtain_markdown(&pdf()).await.unwrap_err();
        assert!(matches!(err, MealPlanError::EmptyResult { .. }));
    }

    #[tokio::test]
    async fn obtain_markdown_rejects_non_pdf_before_calling() {
        let parser = Arc::new(FakeParser::default());
        let ex = Extractor::with_services(keyed_config(), parser.clone(), Arc::new(FakeBackend::replying("{}")));
        let doc = UploadedDocument::new("x.docx", b"PK\x03\x04".to_vec());
        assert!(matches!(ex.obtain_markdown(&doc).await, Err(MealPlanError::NotAPdf { .. })));
        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn extract_structured_builds_deterministic_json_request() {
        let backend = Arc::new(FakeBackend::replying(r#"{"giorni": []}"#));
        let ex = Extractor::with_services(keyed_config(), Arc::new(FakeParser::default()), backend.clone());

        let plan = ex.extract_structured("# Lunedì\nColazione: latte").await.unwrap();
        assert!(plan.days.is_empty());

        let req = backend.seen.lock().unwrap().clone().unwrap();
        assert_eq!(req.temperature, 0.0);
        assert_eq!(req.max_tokens, 8000);
        assert_eq!(req.model, "gpt-4o-mini");
        assert_eq!(req.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert!(req.user_prompt.contains("Colazione: latte"));
    }

    #[tokio::test]
    async fn extract_structured_rejects_blank_markdown() {
        let backend = Arc::new(FakeBackend::replying("{}"));
        let ex = Extractor::with_services(keyed_config(), Arc::new(FakeParser::default()), backend.clone());
        let err = ex.extract_structured(" \n ").await.unwrap_err();
        assert!(matches!(err, MealPlanError::InvalidInput { .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn parse_meal_plan_keeps_raw_on_invalid_json() {
        let err = parse_meal_plan("Here is the plan: {", &keyed_config()).unwrap_err();
        assert_eq!(err.raw_response(), Some("Here is the plan: {"));
    }

    #[test]
    fn parse_meal_plan_schema_violation_is_malformed() {
        let raw = r#"{"giorni": [{"giorno": "Lunedì"}]}"#;
        let err = parse_meal_plan(raw, &keyed_config()).unwrap_err();
        match &err {
            MealPlanError::MalformedResponse { reason, raw: r } => {
                assert!(reason.contains("giorni[0].colazione"), "got: {reason}");
                assert_eq!(r, raw);
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }

        let lenient = ExtractionConfig::builder()
            .schema_validation(SchemaValidation::Lenient)
            .build()
            .unwrap();
        let plan = parse_meal_plan(raw, &lenient).unwrap();
        assert_eq!(plan.days[0].day, "Lunedì");
    }

    #[test]
    fn missing_parse_key_fails_without_runtime() {
        let parser = Arc::new(FakeParser::default());
        let ex = Extractor::with_services(
            ExtractionConfig::default(),
            parser.clone(),
            Arc::new(FakeBackend::replying("{}")),
        );
        let err = tokio_test::block_on(ex.obtain_markdown(&pdf())).unwrap_err();
        assert!(matches!(err, MealPlanError::Configuration { .. }));
        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn load_document_uses_configured_download_timeout() {
        // Accepts the connection and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        });

        let config = ExtractionConfig::builder().download_timeout_secs(1).build().unwrap();
        let ex = Extractor::with_services(
            config,
            Arc::new(FakeParser::default()),
            Arc::new(FakeBackend::replying("{}")),
        );
        let err = ex
            .load_document(&format!("http://{addr}/piano.pdf"))
            .await
            .unwrap_err();
        match err {
            MealPlanError::DownloadTimeout { secs, .. } => assert_eq!(secs, 1),
            other => panic!("expected DownloadTimeout, got {other:?}"),
        }
        server.abort();
    }
}
