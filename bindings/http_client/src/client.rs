use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use surge_instruments::prelude::{report_operation, OperationRecord, Reporter, HTTP_REQ_OPERATION};
use url::Url;

use crate::parsed_body::ParsedBody;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct HttpClientConfig {
    /// Applies to each request, from sending it until the whole response body is read.
    pub timeout: Duration,
    /// Sent as `Authorization: Bearer {token}` when set. No header is sent otherwise.
    pub access_token: Option<String>,
}

impl std::fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("timeout", &self.timeout)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    /// Statuses outside `200..=399` count as failed requests.
    pub fn is_success_or_redirect(&self) -> bool {
        (200..=399).contains(&self.status)
    }

    pub fn parsed_body(&self) -> ParsedBody {
        ParsedBody::parse(&self.body)
    }
}

/// An HTTP client that reports every request to the run's [Reporter] as an
/// [HTTP_REQ_OPERATION] operation.
#[derive(Debug, Clone)]
pub struct HttpClientInstrumented {
    client: reqwest::Client,
    reporter: Arc<Reporter>,
    config: HttpClientConfig,
}

impl HttpClientInstrumented {
    pub fn new(reporter: Arc<Reporter>, config: HttpClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            reporter,
            config,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// POST an empty body declared as JSON.
    ///
    /// The request is reported whether it succeeds or not. It counts as failed on a transport
    /// error, including a timeout, or a status outside `200..=399`. Only transport errors are
    /// returned as `Err`, any status is returned as a response.
    pub async fn post_empty_json(&self, url: &Url, name: &str) -> anyhow::Result<HttpResponse> {
        let mut record = OperationRecord::new(HTTP_REQ_OPERATION)
            .with_attr("name", name)
            .with_attr("method", "POST");

        let mut request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.config.timeout)
            .body(Bytes::new());
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let result = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(HttpResponse { status, body })
        }
        .await;

        match result {
            Ok(response) => {
                record.add_attr("status", response.status);
                let is_error = !response.is_success_or_redirect();
                report_operation(&self.reporter, record, is_error);
                Ok(response)
            }
            Err(e) => {
                record.add_attr("error", if e.is_timeout() { "timeout" } else { "transport" });
                report_operation(&self.reporter, record, true);
                log::debug!("Request {} to {} failed: {:?}", name, url, e);
                Err(e).with_context(|| format!("POST {url} failed"))
            }
        }
    }
}
