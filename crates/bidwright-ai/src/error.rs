use thiserror::Error;

/// A generation backend could not produce text.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider}: no API credential configured")]
    MissingCredential { provider: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} returned {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },
    #[error("{provider}: malformed response: {reason}")]
    Decode { provider: String, reason: String },
}

/// Model output that couldn't be read as the expected JSON shape.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no JSON object found in model output: {preview:?}")]
    NoJson { preview: String },
    #[error("model output did not match the expected schema: {source}")]
    Schema {
        #[source]
        source: serde_json::Error,
        preview: String,
    },
}
