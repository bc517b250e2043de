//! Agent-facing endpoints of the Jobbergate API.

use jobbergate_state::{
    ActiveJobSubmission, Page, PendingJobSubmission, RejectedReport, StatusReport,
    SubmittedReport,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::auth::TokenManager;
use crate::error::ClientError;
use crate::pagination::collect_pages;

/// Authenticated client for the Jobbergate API.
#[derive(Debug)]
pub struct JobbergateClient {
    http: Client,
    base_url: String,
    page_size: u64,
    tokens: TokenManager,
}

impl JobbergateClient {
    pub fn new(
        base_url: &str,
        tokens: TokenManager,
        page_size: u64,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jobbergate-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
            tokens,
        })
    }

    /// Constructs the full URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}/jobbergate{}", self.base_url, path)
    }

    /// URL of a job script file; the name is percent-encoded as one path segment.
    fn file_url(&self, job_script_id: i64, filename: &str) -> Result<Url, ClientError> {
        let base = self.url(&format!("/job-scripts/{}/upload", job_script_id));
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: base.clone(),
            reason,
        };
        let mut url = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .push(filename);
        Ok(url)
    }

        /// Send an authenticated request.
    ///
    /// A 401 drops the current token and the request is sent once more.
    async fn send<F>(&self, build: F) -> Result<Response, ClientError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.tokens.access_token(&self.http).await?;
        let response = build(&self.http).bearer_auth(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        tracing::debug!("access token rejected, requesting a new one");
        self.tokens.invalidate().await;
        let token = self.tokens.access_token(&self.http).await?;
        let response = build(&self.http).bearer_auth(&token).send().await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        let response = self.send(|http| http.get(&url).query(query)).await?;
        Ok(response.json().await?)
    }

    async fn all_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ClientError> {
        collect_pages(move |page| async move {
            self.get_json::<Page<T>>(
                path,
                &[
                    ("page", page.to_string()),
                    ("size", self.page_size.to_string()),
                ],
            )
            .await
        })
        .await
    }

    /// Submissions waiting to be handed to the scheduler.
    pub async fn pending_submissions(&self) -> Result<Vec<PendingJobSubmission>, ClientError> {
        self.all_pages("/job-submissions/agent/pending").await
    }

    /// Submissions the scheduler is running.
    pub async fn active_submissions(&self) -> Result<Vec<ActiveJobSubmission>, ClientError> {
        self.all_pages("/job-submissions/agent/active").await
    }

    pub async fn mark_submitted(&self, report: &SubmittedReport) -> Result<(), ClientError> {
        let url = self.url("/job-submissions/agent/submitted");
        self.send(|http| http.post(&url).json(report)).await?;
        Ok(())
    }

    pub async fn mark_rejected(&self, report: &RejectedReport) -> Result<(), ClientError> {
        let url = self.url("/job-submissions/agent/rejected");
        self.send(|http| http.post(&url).json(report)).await?;
        Ok(())
    }

    pub async fn update_status(
        &self,
        submission_id: i64,
        report: &StatusReport,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!("/job-submissions/agent/{}", submission_id));
        self.send(|http| http.put(&url).json(report)).await?;
        Ok(())
    }

    /// Download one file of a job script.
    pub async fn download_file(
        &self,
        job_script_id: i64,
        filename: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let url = self.file_url(job_script_id, filename)?;
        let response = self.send(|http| http.get(url.clone())).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Tell the API the agent is alive and when to expect the next report.
    pub async fn report_cluster_status(&self, interval: Duration) -> Result<(), ClientError> {
        let url = self.url("/clusters/status");
        let interval = interval.as_secs().to_string();
        self.send(|http| http.put(&url).query(&[("interval", interval.as_str())]))
            .await?;
        Ok(())
    }

    /// Version advertised in the API's OpenAPI document.
    pub async fn api_version(&self) -> Result<String, ClientError> {
        let url = self.url("/openapi.json");
        let response = check_status(self.http.get(&url).send().await?).await?;
        let document: serde_json::Value = response.json().await?;
        document
            .pointer("/info/version")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::Decode {
                url,
                reason: "missing info.version".to_string(),
            })
    }
}

/// Turn a non-2xx response into `ClientError::Status`.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        url,
        status: status.as_u16(),
        body,
    })
}
