use thiserror::Error;

/// Why a turn (or a search-mode query) did not complete.
///
/// Every variant is terminal for the current turn. None of them poison the
/// session: the busy flag is always clear again once the error is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Missing query or API key. Rejected before any side effect.
    #[error("{0}")]
    Validation(String),

    /// Another turn is still in flight. Rejected with no side effect.
    #[error("A query is already in progress")]
    Busy,

    /// The retrieval endpoint answered with a non-success status or could
    /// not be reached. The user message stays in the transcript.
    #[error("Retrieval failed: {0}")]
    RetrievalFailed(String),

    /// The generation endpoint answered with a non-success status before
    /// any body bytes arrived.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// The generation body broke off mid-stream. `partial` holds the text
    /// decoded before the failure; the session discards it.
    #[error("Stream read failed: {message}")]
    StreamReadFailed { message: String, partial: String },
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn retrieval(err: anyhow::Error) -> Self {
        Self::RetrievalFailed(format!("{err:#}"))
    }

    pub fn generation(err: anyhow::Error) -> Self {
        Self::GenerationFailed(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("Failed to call search API");
        let chat_err = ChatError::retrieval(err);
        assert_eq!(
            chat_err.to_string(),
            "Retrieval failed: Failed to call search API: connection refused"
        );
    }

    #[test]
    fn test_stream_error_display_omits_partial_text() {
        let err = ChatError::StreamReadFailed {
            message: "reset by peer".into(),
            partial: "Exercise imp".into(),
        };
        assert_eq!(err.to_string(), "Stream read failed: reset by peer");
    }
}
