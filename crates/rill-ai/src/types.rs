//! Core types shared across the rill pipeline

use serde::{Deserialize, Serialize};

/// Chat models the relay will route to upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatModel {
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4.1-mini")]
    Gpt41Mini,
}

impl ChatModel {
    /// The model identifier sent to the upstream provider
    pub fn id(&self) -> &'static str {
        match self {
            ChatModel::Gpt4oMini => "gpt-4o-mini",
            ChatModel::Gpt4o => "gpt-4o",
            ChatModel::Gpt41Mini => "gpt-4.1-mini",
        }
    }

    /// All known models
    pub fn all() -> &'static [ChatModel] {
        &[ChatModel::Gpt4oMini, ChatModel::Gpt4o, ChatModel::Gpt41Mini]
    }

    /// Look up a model by its upstream identifier
    pub fn parse(id: &str) -> Option<ChatModel> {
        Self::all().iter().copied().find(|m| m.id() == id)
    }

    /// Look up a model by identifier, substituting the default when the
    /// identifier is unrecognized or empty.
    pub fn parse_or_default(id: &str) -> ChatModel {
        Self::parse(id).unwrap_or_default()
    }
}

impl std::fmt::Display for ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Wire request sent from the Stream Client to the relay.
///
/// `model` travels as a free-form identifier; the relay substitutes the
/// default model when it is unrecognized rather than rejecting the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub developer_message: String,
    pub user_message: String,
    #[serde(default)]
    pub model: String,
}

impl ChatRequest {
    /// Create a request for the given user message with the default model
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            developer_message: String::new(),
            user_message: user_message.into(),
            model: String::new(),
        }
    }

    /// Set the developer message
    pub fn with_developer_message(mut self, message: impl Into<String>) -> Self {
        self.developer_message = message.into();
        self
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: ChatModel) -> Self {
        self.model = model.id().to_string();
        self
    }
}

/// A resolved completion request handed to the upstream layer
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: ChatModel,
    pub developer_message: String,
    pub user_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_ids() {
        assert_eq!(ChatModel::parse("gpt-4o"), Some(ChatModel::Gpt4o));
        assert_eq!(ChatModel::parse("gpt-4o-mini"), Some(ChatModel::Gpt4oMini));
        assert_eq!(ChatModel::parse("gpt-4.1-mini"), Some(ChatModel::Gpt41Mini));
    }

    #[test]
    fn test_serde_names_match_upstream_ids() {
        for model in ChatModel::all() {
            let json = serde_json::to_string(model).unwrap();
            assert_eq!(json, format!("\"{}\"", model.id()));
        }
    }

    #[test]
    fn test_parse_or_default_substitutes_unknown() {
        assert_eq!(ChatModel::parse_or_default("unknown-id"), ChatModel::Gpt4oMini);
        assert_eq!(ChatModel::parse_or_default(""), ChatModel::Gpt4oMini);
    }

    #[test]
    fn test_chat_request_round_trip() {
        let req = ChatRequest::new("Hello").with_model(ChatModel::Gpt4o);
        let json = serde_json::to_string(&req).unwrap();
        let back: ChatRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_message, "Hello");
        assert_eq!(back.model, "gpt-4o");
        assert!(back.developer_message.is_empty());
    }

    #[test]
    fn test_chat_request_missing_optional_fields() {
        let back: ChatRequest = serde_json::from_str(r#"{"user_message":"hi"}"#).unwrap();
        assert_eq!(back.user_message, "hi");
        assert!(back.model.is_empty());
    }
}
