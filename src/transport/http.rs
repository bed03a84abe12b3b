use super::{
    CONNECTION_LOST, ChatTransport, FragmentSource, JobHandle, START_FAILED_FALLBACK,
    TransportError,
};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Transport against the chat server's `/chat` and `/stream/{id}` endpoints.
pub struct HttpTransport {
    client: Client,
    config: Config,
}

impl HttpTransport {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[derive(Serialize)]
struct StartRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct StartAccepted {
    session_id: String,
}

#[derive(Deserialize)]
struct StartRejected {
    #[serde(default)]
    error: Option<String>,
}

/// Interpret the start call's status and body.
///
/// Non-2xx responses surface the server's `error` message, or a generic
/// fallback when the body has none.
pub fn parse_start_response(status: StatusCode, body: &str) -> Result<JobHandle, TransportError> {
    if status.is_success() {
        return match serde_json::from_str::<StartAccepted>(body) {
            Ok(accepted) if !accepted.session_id.trim().is_empty() => {
                Ok(JobHandle::new(accepted.session_id))
            }
            Ok(_) => Err(TransportError::InvalidResponse("empty session id".to_string())),
            Err(err) => Err(TransportError::InvalidResponse(err.to_string())),
        };
    }

    let message = serde_json::from_str::<StartRejected>(body)
        .ok()
        .and_then(|rejected| rejected.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| START_FAILED_FALLBACK.to_string());
    tracing::warn!(%status, %message, "start request rejected");
    Err(TransportError::Rejected(message))
}

#[async_trait(?Send)]
impl ChatTransport for HttpTransport {
    async fn start_job(&self, prompt: &str) -> Result<JobHandle, TransportError> {
        let response = self
            .client
            .post(self.config.endpoint("/chat"))
            .json(&StartRequest { prompt })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        parse_start_response(status, &body)
    }

    async fn subscribe(&self, job: &JobHandle) -> FragmentSource {
        let url = self.config.endpoint(&format!("/stream/{}", job.as_str()));
        let response = match self
            .client
            .get(url)
            .header("accept", "text/event-stream")
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%err, job = %job, "failed to open stream");
                return FragmentSource::failed(CONNECTION_LOST);
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, job = %job, "stream subscription refused");
            return FragmentSource::failed(CONNECTION_LOST);
        }

        FragmentSource::from_byte_stream(response.bytes_stream())
    }
}
