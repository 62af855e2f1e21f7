use std::fmt::Debug;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_MODEL_ID: &str = "anthropic.claude-v2";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// AWS credentials used to sign Bedrock requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub(crate) access_key_id: String,
    pub(crate) secret_access_key: String,
    pub(crate) session_token: Option<String>,
}

impl Credentials {
    /// Creates long-term credentials.
    #[inline]
    pub fn new<S1: Into<String>, S2: Into<String>>(
        access_key_id: S1,
        secret_access_key: S2,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Attaches a session token for temporary credentials.
    #[inline]
    pub fn with_session_token<S: Into<String>>(mut self, token: S) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<deducted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<deducted>"))
            .finish()
    }
}

/// Builder for [`BedrockConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BedrockConfigBuilder {
    credentials: Credentials,
    region: Option<String>,
    model_id: Option<String>,
    max_tokens: Option<u32>,
    endpoint: Option<String>,
}

impl BedrockConfigBuilder {
    /// Creates a builder with the given credentials.
    #[inline]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            region: None,
            model_id: None,
            max_tokens: None,
            endpoint: None,
        }
    }

    /// Sets the AWS region. Defaults to `us-east-1`.
    #[inline]
    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the foundation model. Defaults to `anthropic.claude-v2`.
    #[inline]
    pub fn with_model_id<S: Into<String>>(mut self, model_id: S) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Sets `max_tokens_to_sample`. Defaults to `1024`.
    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Overrides the runtime endpoint, e.g. for a VPC endpoint. Requests are
    /// still signed for the configured region.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> BedrockConfig {
        let region = self.region.unwrap_or_else(|| DEFAULT_REGION.to_owned());
        let endpoint = self.endpoint.unwrap_or_else(|| {
            format!("https://bedrock-runtime.{region}.amazonaws.com")
        });
        BedrockConfig {
            credentials: self.credentials,
            model_id: self
                .model_id
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_owned()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            region,
        }
    }
}

/// Configuration for the Bedrock provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BedrockConfig {
    pub(crate) credentials: Credentials,
    pub(crate) region: String,
    pub(crate) model_id: String,
    pub(crate) max_tokens: u32,
    pub(crate) endpoint: String,
}

impl BedrockConfig {
    /// Returns the foundation model identifier.
    #[inline]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Returns the host name requests are sent to.
    pub(crate) fn host(&self) -> &str {
        let without_scheme = self
            .endpoint
            .split_once("://")
            .map_or(self.endpoint.as_str(), |(_, rest)| rest);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }

    /// Returns the request path, with the model id encoded once.
    pub(crate) fn stream_path(&self) -> String {
        format!(
            "/model/{}/invoke-with-response-stream",
            urlencoding::encode(&self.model_id)
        )
    }
}
