use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use shared::{
    error::TransportError,
    protocol::{EndpointReply, EndpointResult},
};
use tracing::{info, warn};
use url::Url;

/// Content type for JSON submissions. Must stay a CORS simple-request type.
pub const TEXT_PLAIN_UTF8: &str = "text/plain;charset=utf-8";

#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Posts a JSON document as a plain-text body.
    async fn send_text(&self, body: String) -> Result<(), TransportError>;
    /// Posts URL-encoded form fields.
    async fn send_form(&self, fields: Vec<(String, String)>) -> Result<(), TransportError>;
}

pub struct MissingSubmissionEndpoint;

#[async_trait]
impl SubmissionTransport for MissingSubmissionEndpoint {
    async fn send_text(&self, _body: String) -> Result<(), TransportError> {
        Err(TransportError::MissingEndpoint)
    }

    async fn send_form(&self, _fields: Vec<(String, String)>) -> Result<(), TransportError> {
        Err(TransportError::MissingEndpoint)
    }
}

pub struct HttpSubmissionTransport {
    http: Client,
    endpoint: Url,
}

impl HttpSubmissionTransport {
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: &str) -> Result<Self, TransportError> {
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|_| TransportError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn interpret(&self, response: Response) -> Result<(), TransportError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "transport: endpoint returned failure status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Endpoints that answer with plain text or HTML are taken at their status code.
        if let Ok(reply) = serde_json::from_str::<EndpointReply>(&body) {
            if reply.result == EndpointResult::Error {
                let message = reply
                    .message
                    .unwrap_or_else(|| "endpoint reported an error".to_string());
                warn!(%message, "transport: endpoint rejected submission");
                return Err(TransportError::Rejected(message));
            }
        }

        info!(status = status.as_u16(), "transport: delivered");
        Ok(())
    }
}

#[async_trait]
impl SubmissionTransport for HttpSubmissionTransport {
    async fn send_text(&self, body: String) -> Result<(), TransportError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, TEXT_PLAIN_UTF8)
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        self.interpret(response).await
    }

    async fn send_form(&self, fields: Vec<(String, String)>) -> Result<(), TransportError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .form(&fields)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        self.interpret(response).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
