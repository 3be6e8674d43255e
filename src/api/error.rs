use http::StatusCode;

/// Failed call to one of the provider APIs.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum Error {
    /// The request did not go through, even after retrying.
    #[display("failed to call `{url}`")]
    Transport { url: String, source: ureq::Error },

    #[display("`{url}` responded with {status}")]
    Status { url: String, status: StatusCode },

    #[display("failed to deserialize the response from `{url}`")]
    Decode { url: String, source: ureq::Error },
}

impl Error {
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }

    /// Whether the provider refused the credentials.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN),
        )
    }
}
