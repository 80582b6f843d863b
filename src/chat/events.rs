use serde::Serialize;

use crate::models::Message;

/// Buffered events per subscriber before the slowest one starts lagging.
pub const EVENT_CAPACITY: usize = 64;

/// Change notifications for whatever renders the session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    MessageAppended { message: Message },
    BusyChanged { busy: bool },
    /// A query finished successfully; the input box can take focus again.
    FocusInput,
}

impl SessionEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::MessageAppended { .. } => "message",
            SessionEvent::BusyChanged { .. } => "busy",
            SessionEvent::FocusInput => "focus",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(SessionEvent::BusyChanged { busy: true }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "busy_changed", "busy": true }));
        let json = serde_json::to_value(SessionEvent::FocusInput).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "focus_input" }));
    }
}
