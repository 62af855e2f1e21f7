//! A model provider for Anthropic Claude models hosted on Amazon Bedrock.
//!
//! Requests are signed with SigV4 and streamed through the
//! `invoke-with-response-stream` endpoint.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;
mod sigv4;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use ask_agent_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use chrono::Utc;
use reqwest::{Client, header};

pub use config::{BedrockConfig, BedrockConfigBuilder, Credentials};
use io::{Chunks, EventStream};
use response::BedrockResponse;
use sigv4::SignableRequest;

const SERVICE: &str = "bedrock";

/// Error type for [`BedrockProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Bedrock model provider.
#[derive(Clone, Debug)]
pub struct BedrockProvider {
    client: Client,
    config: Arc<BedrockConfig>,
}

impl BedrockProvider {
    /// Creates a new `BedrockProvider` with the given configuration.
    #[inline]
    pub fn new(config: BedrockConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for BedrockProvider {
    type Error = Error;
    type Response = BedrockResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let body = serde_json::to_vec(&proto::create_request(req, &self.config));
        let config = Arc::clone(&self.config);
        let client = self.client.clone();

        async move {
            let body = body.map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::Other)
            })?;
            let path = config.stream_path();
            let signed = sigv4::sign(
                &SignableRequest {
                    method: "POST",
                    path: &path,
                    query: "",
                    headers: vec![
                        ("content-type".to_owned(), "application/json".to_owned()),
                        ("host".to_owned(), config.host().to_owned()),
                    ],
                    body: &body,
                },
                &config.credentials,
                &config.region,
                SERVICE,
                Utc::now(),
            );

            let mut builder = client
                .post(format!("{}{path}", config.endpoint))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "application/vnd.amazon.eventstream")
                .header("x-amz-date", signed.amz_date)
                .header(header::AUTHORIZATION, signed.authorization);
            if let Some(token) = signed.security_token {
                builder = builder.header("x-amz-security-token", token);
            }

            debug!("invoking bedrock model {}", config.model_id());
            let resp = builder.body(body).send().await.map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::Other)
            })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                let message = serde_json::from_str::<proto::ErrorBody>(&body)
                    .map(|body| body.message)
                    .unwrap_or(body);
                warn!("bedrock request failed: {status}: {message}");
                return Err(Error::new(
                    format!("{status}: {message}"),
                    ErrorKind::from_status(status.as_u16()),
                ));
            }

            let events = EventStream::new(Chunks::from_response(resp));
            Ok(BedrockResponse::from_event_stream(events))
        }
    }
}
