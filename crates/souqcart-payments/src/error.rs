use thiserror::Error;

/// Errors returned by the payment gateway client.
#[derive(Debug, Error)]
pub enum PaymentsError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-2xx status.
    #[error("gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Client construction or request building failed before any I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Reasons a webhook delivery is rejected.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("signature header is malformed: {0}")]
    MalformedHeader(String),

    #[error("signature timestamp {timestamp} is outside the {tolerance_secs}s tolerance")]
    TimestampOutOfTolerance { timestamp: i64, tolerance_secs: i64 },

    #[error("no signature matched the payload")]
    SignatureMismatch,

    #[error("webhook secret is unusable: {0}")]
    InvalidSecret(String),

    #[error("webhook payload is not a valid event: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}
