//! The closed set of assistant commands and their outputs

use serde::{Deserialize, Serialize};

/// One user action, with the arguments it needs.
///
/// Serialized with a `command` tag, e.g.
/// `{"command": "specify_feature", "user_id": "u1", "feature_name": "Login"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Fetch the specification behind `doc_link` and index it
    LoadSpecification { user_id: String, doc_link: String },
    /// Fetch the existing test cases behind `doc_link` and index them
    LoadTestCases { user_id: String, doc_link: String },
    /// Choose, or change, the feature to generate test cases for
    SpecifyFeature { user_id: String, feature_name: String },
    GenerateTestCases { user_id: String },
    ChatHistory { user_id: String },
    /// What the assistant expects next from this user
    CurrentStep { user_id: String },
    /// Forget the loaded documents and start over, keeping the history
    UploadNewDocuments { user_id: String },
    ClearSession { user_id: String },
}

impl Command {
    pub fn user_id(&self) -> &str {
        match self {
            Command::LoadSpecification { user_id, .. }
            | Command::LoadTestCases { user_id, .. }
            | Command::SpecifyFeature { user_id, .. }
            | Command::GenerateTestCases { user_id }
            | Command::ChatHistory { user_id }
            | Command::CurrentStep { user_id }
            | Command::UploadNewDocuments { user_id }
            | Command::ClearSession { user_id } => user_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::LoadSpecification { .. } => "load_specification",
            Command::LoadTestCases { .. } => "load_test_cases",
            Command::SpecifyFeature { .. } => "specify_feature",
            Command::GenerateTestCases { .. } => "generate_test_cases",
            Command::ChatHistory { .. } => "chat_history",
            Command::CurrentStep { .. } => "current_step",
            Command::UploadNewDocuments { .. } => "upload_new_documents",
            Command::ClearSession { .. } => "clear_session",
        }
    }
}

/// One line of the chat protocol: a command plus the user's words, if any.
///
/// `{"message": "use this spec", "command": "load_specification", "user_id": "u1", "doc_link": "spec.txt"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub command: Command,
}

impl ChatRequest {
    /// What goes into the chat history for this request.
    pub fn message_text(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.command.name().to_string())
    }
}

/// Reply to a command.
///
/// Serializes to `{"response"}`, `{"response", "menu"}` or
/// `{"response", "reset": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandOutput {
    Menu { response: String, menu: Vec<String> },
    Reset { response: String, reset: bool },
    Text { response: String },
}

impl CommandOutput {
    pub fn text<S: Into<String>>(response: S) -> Self {
        CommandOutput::Text {
            response: response.into(),
        }
    }

    pub fn menu<S: Into<String>>(response: S, menu: &[&str]) -> Self {
        CommandOutput::Menu {
            response: response.into(),
            menu: menu.iter().map(|option| option.to_string()).collect(),
        }
    }

    pub fn reset<S: Into<String>>(response: S) -> Self {
        CommandOutput::Reset {
            response: response.into(),
            reset: true,
        }
    }

    pub fn response(&self) -> &str {
        match self {
            CommandOutput::Menu { response, .. }
            | CommandOutput::Reset { response, .. }
            | CommandOutput::Text { response } => response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_wire_format() {
        let command: Command = serde_json::from_value(json!({
            "command": "load_specification",
            "user_id": "u1",
            "doc_link": "docs/spec.txt"
        }))
        .unwrap();
        assert_eq!(
            command,
            Command::LoadSpecification {
                user_id: "u1".to_string(),
                doc_link: "docs/spec.txt".to_string()
            }
        );
        assert_eq!(command.user_id(), "u1");
        assert_eq!(command.name(), "load_specification");

        assert!(serde_json::from_value::<Command>(json!({"command": "dance", "user_id": "u1"})).is_err());
        assert!(serde_json::from_value::<Command>(json!({"command": "specify_feature", "user_id": "u1"})).is_err());
    }

    #[test]
    fn test_chat_request_flattens_command() {
        let request: ChatRequest = serde_json::from_value(json!({
            "message": "Login please",
            "command": "specify_feature",
            "user_id": "u1",
            "feature_name": "Login"
        }))
        .unwrap();
        assert_eq!(request.message_text(), "Login please");
        assert_eq!(
            request.command,
            Command::SpecifyFeature {
                user_id: "u1".to_string(),
                feature_name: "Login".to_string()
            }
        );

        let bare: ChatRequest =
            serde_json::from_str(r#"{"command": "current_step", "user_id": "u2"}"#).unwrap();
        assert_eq!(bare.message, None);
        assert_eq!(bare.message_text(), "current_step");
    }

    #[test]
    fn test_output_shapes() {
        assert_eq!(
            serde_json::to_value(CommandOutput::reset("The user's session has been cleared.")).unwrap(),
            json!({"response": "The user's session has been cleared.", "reset": true})
        );
        assert_eq!(
            serde_json::to_value(CommandOutput::menu("cases", &["a", "b"])).unwrap(),
            json!({"response": "cases", "menu": ["a", "b"]})
        );
        assert_eq!(
            serde_json::to_value(CommandOutput::text("ok")).unwrap(),
            json!({"response": "ok"})
        );
    }

    #[test]
    fn test_output_parses_back() {
        let output: CommandOutput =
            serde_json::from_str(r#"{"response": "cases", "menu": ["a"]}"#).unwrap();
        assert_eq!(output, CommandOutput::menu("cases", &["a"]));
        assert_eq!(output.response(), "cases");

        let output: CommandOutput = serde_json::from_str(r#"{"response": "hi"}"#).unwrap();
        assert_eq!(output, CommandOutput::text("hi"));
    }
}
