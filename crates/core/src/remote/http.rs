//! HTTP implementation of the job service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RemoteConfig;
use crate::metrics;
use crate::order::{Order, OrderLine, SheetSize};
use crate::session::Credential;

use super::{FileRef, JobStatusReport, JobSummary, RemoteError, RemoteJobService, RemoteStatus};

/// Job service reached over its REST API.
pub struct HttpJobService {
    client: Client,
    config: RemoteConfig,
}

#[derive(Serialize)]
struct CreateJobItem<'a> {
    print_id: &'a str,
    qty: u32,
}

#[derive(Serialize)]
struct CreateJobBody<'a> {
    items: Vec<CreateJobItem<'a>>,
    sheet_size: SheetSize,
}

#[derive(Deserialize)]
struct CreateJobResponse {
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    items: Option<Vec<OrderLine>>,
    /// Public URLs of the rendered sheets, in page order.
    #[serde(default)]
    result_urls: Option<Vec<String>>,
    #[serde(default, alias = "zip_url")]
    archive_url: Option<String>,
}

impl JobStatusResponse {
    fn into_report(self, requested_id: &str) -> JobStatusReport {
        let job_id = self.id.unwrap_or_else(|| requested_id.to_string());
        let result_files = self.result_urls.map(|urls| {
            urls.into_iter()
                .enumerate()
                .map(|(i, url)| FileRef {
                    id: format!("{}-result-{}", job_id, i + 1),
                    url,
                    page_index: Some(i as u32),
                })
                .collect()
        });

        JobStatusReport {
            status: RemoteStatus::parse(&self.status),
            error: self.error,
            items: self.items,
            result_files,
            archive_url: self.archive_url.filter(|url| !url.trim().is_empty()),
            job_id,
        }
    }
}

/// The files endpoint answers either with a bare list or wrapped in `files`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FilesResponse {
    List(Vec<FileRef>),
    Wrapped { files: Vec<FileRef> },
}

/// FastAPI-style error body.
#[derive(Deserialize)]
struct ErrorDetail {
    detail: serde_json::Value,
}

impl HttpJobService {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| RemoteError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn job_url(&self, job_id: &str, suffix: &str) -> String {
        format!(
            "{}/jobs/{}{}",
            self.base_url(),
            urlencoding::encode(job_id),
            suffix
        )
    }

    async fn parse_json<T: for<'de> Deserialize<'de>>(
        response: Response,
    ) -> Result<T, RemoteError> {
        let response = check_status(response).await?;
        let body = response.text().await.map_err(map_transport_error)?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

fn map_transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_connect() {
        RemoteError::ConnectionFailed(e.to_string())
    } else {
        RemoteError::Api {
            status: 0,
            message: e.to_string(),
        }
    }
}

/// Map non-2xx responses to [`RemoteError`].
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Unauthorized),
        StatusCode::NOT_FOUND => Err(RemoteError::NotFound(url)),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            })
        }
    }
}

/// Prefer the `detail` field of a JSON error body, else the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorDetail>(body) {
        Ok(ErrorDetail {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorDetail { detail }) => detail.to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

fn observe(operation: &str, started: Instant) {
    metrics::REMOTE_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(started.elapsed().as_secs_f64());
}

#[async_trait]
impl RemoteJobService for HttpJobService {
    async fn create_job(
        &self,
        credential: &Credential,
        order: &Order,
    ) -> Result<String, RemoteError> {
        let url = format!("{}/print-jobs", self.base_url());
        let body = CreateJobBody {
            items: order
                .lines()
                .iter()
                .map(|l| CreateJobItem {
                    print_id: &l.print_id,
                    qty: l.quantity,
                })
                .collect(),
            sheet_size: order.sheet_size(),
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Authorization", credential.bearer())
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error);
        observe("create_job", started);

        let parsed: CreateJobResponse = Self::parse_json(response?).await?;
        let job_id = parsed
            .job_id
            .or(parsed.id)
            .filter(|id| !id.trim().is_empty())
            .ok_or(RemoteError::MissingJobId)?;

        debug!(job_id = %job_id, units = order.total_units(), "Created print job");
        Ok(job_id)
    }

    async fn job_status(
        &self,
        credential: &Credential,
        job_id: &str,
    ) -> Result<JobStatusReport, RemoteError> {
        let started = Instant::now();
        let response = self
            .client
            .get(self.job_url(job_id, ""))
            .header("Authorization", credential.bearer())
            .send()
            .await
            .map_err(map_transport_error);
        observe("job_status", started);

        let parsed: JobStatusResponse = Self::parse_json(response?).await?;
        Ok(parsed.into_report(job_id))
    }

    async fn job_files(
        &self,
        credential: &Credential,
        job_id: &str,
    ) -> Result<Vec<FileRef>, RemoteError> {
        let started = Instant::now();
        let response = self
            .client
            .get(self.job_url(job_id, "/files"))
            .header("Authorization", credential.bearer())
            .send()
            .await
            .map_err(map_transport_error);
        observe("job_files", started);

        let mut files = match Self::parse_json::<FilesResponse>(response?).await? {
            FilesResponse::List(files) => files,
            FilesResponse::Wrapped { files } => files,
        };
        // Files without a page index keep their relative order at the end.
        files.sort_by_key(|f| f.page_index.unwrap_or(u32::MAX));
        Ok(files)
    }

    async fn confirm_job(&self, credential: &Credential, job_id: &str) -> Result<(), RemoteError> {
        let started = Instant::now();
        let response = self
            .client
            .post(self.job_url(job_id, "/confirm"))
            .header("Authorization", credential.bearer())
            .send()
            .await
            .map_err(map_transport_error);
        observe("confirm_job", started);

        check_status(response?).await?;
        Ok(())
    }

    async fn job_history(&self, credential: &Credential) -> Result<Vec<JobSummary>, RemoteError> {
        let url = format!("{}/jobs/history", self.base_url());
        let started = Instant::now();
        let response = self
            .client
            .get(&url)
            .header("Authorization", credential.bearer())
            .send()
            .await
            .map_err(map_transport_error);
        observe("job_history", started);

        let jobs: Vec<JobSummary> = Self::parse_json(response?).await?;
        debug!(jobs = jobs.len(), "Fetched job history");
        Ok(jobs)
    }

    fn service_name(&self) -> &'static str {
        "http"
    }
}
