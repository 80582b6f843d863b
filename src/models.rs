use serde::{Deserialize, Serialize};

use crate::settings::Mode;

/// Who said a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One transcript entry. Fields are private so an appended message cannot
/// be edited in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    speaker: Speaker,
    text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A passage returned by the retrieval endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrievedPassage {
    pub content: String,
    pub title: String,
    pub url: String,
    pub date: String,
}

/// Query submitted from the page
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Result of `POST /api/query`, shaped by the mode that handled it
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QueryResponse {
    Chat { message: Message },
    Search { passages: Vec<RetrievedPassage> },
}

/// Transcript plus busy flag, everything the page renders
#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub messages: Vec<Message>,
    pub busy: bool,
}

/// Settings as shown to the page. The key itself never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    pub has_api_key: bool,
    pub match_count: u8,
    pub mode: Mode,
}

/// Partial settings update
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsUpdate {
    pub api_key: Option<String>,
    pub match_count: Option<i64>,
    pub mode: Option<Mode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_speaker_and_text() {
        let json = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "speaker": "assistant", "text": "hi" }));
    }

    #[test]
    fn test_query_response_is_tagged_by_mode() {
        let resp = QueryResponse::Search { passages: vec![] };
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["mode"], "search");
        assert!(json["passages"].as_array().unwrap().is_empty());
    }
}
