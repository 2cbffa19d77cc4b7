use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel '{0}' is not configured")]
    NotConfigured(&'static str),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("channel API rejected the request ({status}): {body}")]
    Api { status: u16, body: String },
}
