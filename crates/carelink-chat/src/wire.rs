//! JSON bodies for the care assistant HTTP contract.

use serde::{Deserialize, Serialize};

/// Body of `POST /chat`. An empty `message` requests the session greeting.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub user_id: &'a str,
}

/// Response body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Body of `POST /check-followups`.
#[derive(Debug, Serialize)]
pub struct FollowupRequest<'a> {
    pub user_id: &'a str,
}

/// Response body of `POST /check-followups`. The server may omit the field
/// entirely when there is nothing pending.
#[derive(Debug, Deserialize)]
pub struct FollowupReply {
    #[serde(default)]
    pub followups: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_serializes() {
        let req = ChatRequest {
            message: "I feel dizzy",
            user_id: "user_john",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["message"], "I feel dizzy");
        assert_eq!(json["user_id"], "user_john");
    }

    #[test]
    fn test_greeting_request_has_empty_message() {
        let req = ChatRequest {
            message: "",
            user_id: "user_mary",
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"message\":\"\""));
    }

    #[test]
    fn test_chat_reply_deserializes() {
        let reply: ChatReply = serde_json::from_str(r#"{"response":"Please sit down"}"#).unwrap();
        assert_eq!(reply.response, "Please sit down");
    }

    #[test]
    fn test_followup_reply_preserves_order() {
        let reply: FollowupReply =
            serde_json::from_str(r#"{"followups":["a","b","c"]}"#).unwrap();
        assert_eq!(reply.followups, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_followup_reply_missing_field_defaults_empty() {
        let reply: FollowupReply = serde_json::from_str("{}").unwrap();
        assert!(reply.followups.is_empty());
    }
}
