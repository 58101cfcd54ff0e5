//! Mail gateway errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification api rejected the request ({status}): {body}")]
    Api { status: u16, body: String },
}
