//! Document parsing: PDF file → ordered markdown segments.
//!
//! [`DocumentParser`] is the seam to the hosted parsing service; the
//! orchestrator only relies on "markdown segments for a file, or an error".
//! [`LlamaParseClient`] implements it against the LlamaParse REST API:
//!
//! ```text
//! POST /upload              multipart file + options → job id
//! GET  /job/{id}            poll until SUCCESS / ERROR
//! GET  /job/{id}/result/json  pages[].md, one segment per page
//! ```
//!
//! Nothing here retries: a failed job surfaces as
//! [`MealPlanError::Upstream`] and the user triggers the stage again.

use crate::config::ExtractionConfig;
use crate::error::MealPlanError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Name used in errors and logs for the parsing service.
pub const PARSE_SERVICE: &str = "LlamaParse";

/// What to ask the parsing service for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRequest {
    pub api_key: String,
    /// Document language hint, e.g. `it`.
    pub language: String,
    /// Vendor multimodal model; `None` uses the service's own text parser.
    pub vendor_model: Option<String>,
}

/// Produces markdown for a PDF on disk.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Markdown segments in document order (one per page for LlamaParse).
    async fn parse(&self, path: &Path, request: &ParseRequest) -> Result<Vec<String>, MealPlanError>;
}

/// LlamaParse REST client.
#[derive(Debug, Clone)]
pub struct LlamaParseClient {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl LlamaParseClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(1000),
            max_wait: Duration::from_secs(2000),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.parse_base_url.clone())
            .with_poll_interval(Duration::from_millis(config.poll_interval_ms))
            .with_max_wait(Duration::from_secs(config.parse_max_wait_secs))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    async fn upload(&self, path: &Path, request: &ParseRequest) -> Result<String, MealPlanError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MealPlanError::Internal(format!("Failed to read staged document: {}", e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| MealPlanError::upstream(PARSE_SERVICE, e))?;

        let mut form = Form::new()
            .part("file", part)
            .text("language", request.language.clone());
        if let Some(ref model) = request.vendor_model {
            form = form
                .text("use_vendor_multimodal_model", "true")
                .text("vendor_multimodal_model_name", model.clone());
        }

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .bearer_auth(&request.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MealPlanError::upstream(PARSE_SERVICE, e))?;

        let job: UploadResponse = read_json(response).await?;
        Ok(job.id)
    }

    async fn wait_for_job(&self, job_id: &str, api_key: &str) -> Result<(), MealPlanError> {
        poll_job(job_id, self.poll_interval, self.max_wait, move || {
            self.fetch_status(job_id, api_key)
        })
        .await
    }

    async fn fetch_status(&self, job_id: &str, api_key: &str) -> Result<JobStatus, MealPlanError> {
        let response = self
            .client
            .get(format!("{}/job/{}", self.base_url, job_id))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| MealPlanError::upstream(PARSE_SERVICE, e))?;
        read_json(response).await
    }

    async fn fetch_pages(&self, job_id: &str, api_key: &str) -> Result<Vec<String>, MealPlanError> {
        let response = self
            .client
            .get(format!("{}/job/{}/result/json", self.base_url, job_id))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| MealPlanError::upstream(PARSE_SERVICE, e))?;
        let result: JsonResult = read_json(response).await?;
        Ok(result.into_segments())
    }
}

#[async_trait]
impl DocumentParser for LlamaParseClient {
    async fn parse(&self, path: &Path, request: &ParseRequest) -> Result<Vec<String>, MealPlanError> {
        let job_id = self.upload(path, request).await?;
        info!("Parse job {} submitted", job_id);

        self.wait_for_job(&job_id, &request.api_key).await?;
        let segments = self.fetch_pages(&job_id, &request.api_key).await?;
        info!("Parse job {} returned {} segments", job_id, segments.len());
        Ok(segments)
    }
}

/// Poll `fetch` every `interval` until the job is done, failed, or
/// `max_wait` has passed since the first poll.
async fn poll_job<F, Fut>(
    job_id: &str,
    interval: Duration,
    max_wait: Duration,
    mut fetch: F,
) -> Result<(), MealPlanError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobStatus, MealPlanError>>,
{
    let start = Instant::now();
    loop {
        let job = fetch().await?;
        if job_outcome(job_id, &job)? {
            return Ok(());
        }
        if start.elapsed() >= max_wait {
            return Err(MealPlanError::upstream(
                PARSE_SERVICE,
                format!("job {} still pending after {}s", job_id, max_wait.as_secs()),
            ));
        }
        sleep(interval).await;
    }
}

/// `Ok(true)` when the job has finished, `Ok(false)` while it is pending.
fn job_outcome(job_id: &str, job: &JobStatus) -> Result<bool, MealPlanError> {
    match job.status.as_str() {
        "SUCCESS" => Ok(true),
        "PARTIAL_SUCCESS" => {
            warn!("Parse job {} finished with partial success", job_id);
            Ok(true)
        }
        "ERROR" | "CANCELED" | "CANCELLED" => {
            let detail = job
                .error_message
                .clone()
                .unwrap_or_else(|| format!("job {} ended with status {}", job_id, job.status));
            Err(MealPlanError::upstream(PARSE_SERVICE, detail))
        }
        other => {
            debug!("Parse job {}: {}", job_id, other);
            Ok(false)
        }
    }
}

/// Decode a JSON body, turning error statuses into upstream errors.
async fn read_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, MealPlanError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MealPlanError::upstream(
            PARSE_SERVICE,
            format!("HTTP {}: {}", status, body.trim()),
        ));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| MealPlanError::upstream(PARSE_SERVICE, format!("unexpected response body: {}", e)))
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonResult {
    #[serde(default)]
    pages: Vec<JsonPage>,
}

#[derive(Debug, Deserialize)]
struct JsonPage {
    #[serde(default)]
    md: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl JsonResult {
    /// Page markdown, falling back to plain text for pages without it.
    fn into_segments(self) -> Vec<String> {
        self.pages
            .into_iter()
            .map(|p| p.md.or(p.text).unwrap_or_default())
            .collect()
    }
}
