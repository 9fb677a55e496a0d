use kaizen_types::BotError;
use thiserror::Error;

/// Why a call to a third-party service failed.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The feature's credential is not configured; carries the env var name.
    #[error("{0} is not configured")]
    MissingKey(&'static str),

    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IntegrationError {
    pub fn from_status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            message: truncate_body(body),
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Short text for the chat reply.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingKey(var) => {
                format!("This feature is not set up yet. Ask the bot owner to set {}.", var)
            }
            Self::Status { status: 401 | 403, .. } => {
                "The provider rejected our credentials. Please tell the bot owner.".into()
            }
            Self::Status { status: 429, .. } => {
                "The provider is rate limiting us. Please try again in a minute.".into()
            }
            Self::Status { status, .. } if *status >= 500 => {
                "The provider is having trouble right now. Please try again later.".into()
            }
            Self::Status { status, .. } => format!("The provider returned an error ({}).", status),
            Self::Timeout => "The request took too long. Please try again.".into(),
            Self::Network(_) => "Couldn't reach the service. Please try again.".into(),
            Self::InvalidResponse(_) => "Got an unexpected answer from the service.".into(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::Io(e) => format!("Couldn't write the file: {}", e),
        }
    }
}

impl From<IntegrationError> for BotError {
    fn from(err: IntegrationError) -> Self {
        BotError::Integration(err.user_message())
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= 300 {
        return body.to_string();
    }
    let mut end = 300;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bodies_are_truncated_on_char_boundary() {
        let body = "é".repeat(400);
        let IntegrationError::Status { message, .. } = IntegrationError::from_status(500, &body) else {
            panic!("expected status error");
        };
        assert!(message.ends_with("..."));
        assert!(message.len() <= 303);
    }

    #[test]
    fn missing_key_names_the_variable() {
        let err: BotError = IntegrationError::MissingKey("GROQ_API_KEY").into();
        assert!(err.user_message().contains("GROQ_API_KEY"));
        assert!(err.user_message().starts_with("❌"));
    }
}
