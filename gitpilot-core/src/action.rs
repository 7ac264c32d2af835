//! # Actions
//!
//! The fixed action set the model can invoke, and the uniform result every
//! invocation produces.
//!
//! Arguments always arrive as one JSON object string (`{"file_path": ...}`),
//! whether the model emitted a structured tool call or a ReAct
//! `Action Input:` line. They are parsed once, here, into a typed variant.

use gitpilot_error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Action Result
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// Outcome of one action invocation, fed back to the model as an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub message: String,
    /// Only set by read operations
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Success,
            message: message.into(),
            content: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Error result carrying the failure's message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            message: message.into(),
            content: None,
        }
    }

    /// Fold an internal result into an action result.
    pub fn from_outcome(outcome: Result<ActionResult>) -> Self {
        outcome.unwrap_or_else(|err| Self::error(err.message()))
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }

    /// JSON form handed to the model, e.g. `{"status":"success","message":"..."}`.
    pub fn to_observation(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!("{{\"status\":\"error\",\"message\":{:?}}}", self.message)
        })
    }
}

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WriteFileArgs {
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadFileArgs {
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitArgs {
    pub message: String,
}

/// Which action, without its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    WriteFile,
    ReadFile,
    CommitChanges,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::WriteFile,
        ActionKind::ReadFile,
        ActionKind::CommitChanges,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::WriteFile => "write_file",
            ActionKind::ReadFile => "read_file",
            ActionKind::CommitChanges => "commit_changes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Parameter names in the order the model should supply them.
    pub fn parameters(&self) -> &'static [&'static str] {
        match self {
            ActionKind::WriteFile => &["file_path", "content"],
            ActionKind::ReadFile => &["file_path"],
            ActionKind::CommitChanges => &["message"],
        }
    }
}

/// A fully parsed action, ready to run against a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    WriteFile(WriteFileArgs),
    ReadFile(ReadFileArgs),
    CommitChanges(CommitArgs),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::WriteFile(_) => ActionKind::WriteFile,
            Action::ReadFile(_) => ActionKind::ReadFile,
            Action::CommitChanges(_) => ActionKind::CommitChanges,
        }
    }

    /// Parse a JSON-object argument string for the given kind.
    pub fn parse(kind: ActionKind, arguments: &str) -> Result<Action> {
        let value: serde_json::Value = serde_json::from_str(arguments.trim()).map_err(|e| {
            Error::invalid_argument(format!(
                "invalid JSON for {}: {}. Expected {}",
                kind.name(),
                e,
                expected_encoding(kind)
            ))
            .with_operation("action::parse")
        })?;

        if !value.is_object() {
            return Err(Error::invalid_argument(format!(
                "arguments for {} must be a JSON object. Expected {}",
                kind.name(),
                expected_encoding(kind)
            ))
            .with_operation("action::parse"));
        }

        let action = match kind {
            ActionKind::WriteFile => serde_json::from_value(value).map(Action::WriteFile),
            ActionKind::ReadFile => serde_json::from_value(value).map(Action::ReadFile),
            ActionKind::CommitChanges => serde_json::from_value(value).map(Action::CommitChanges),
        };

        action.map_err(|e| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "bad arguments for {}: {}. Expected {}",
                    kind.name(),
                    e,
                    expected_encoding(kind)
                ),
            )
            .with_operation("action::parse")
            .with_context("action", kind.name())
        })
    }
}

/// Example argument object for a kind, quoted in descriptions and errors.
pub fn expected_encoding(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::WriteFile => r#"{"file_path": "path/to/file", "content": "file content"}"#,
        ActionKind::ReadFile => r#"{"file_path": "path/to/file"}"#,
        ActionKind::CommitChanges => r#"{"message": "commit message"}"#,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serialization_omits_missing_content() {
        let json = ActionResult::success("File notes.txt has been modified").to_observation();
        assert_eq!(
            json,
            r#"{"status":"success","message":"File notes.txt has been modified"}"#
        );

        let json = ActionResult::success("Read notes.txt")
            .with_content("hello")
            .to_observation();
        assert_eq!(
            json,
            r#"{"status":"success","message":"Read notes.txt","content":"hello"}"#
        );
    }

    #[test]
    fn test_from_outcome_keeps_only_message() {
        let result = ActionResult::from_outcome(Err(Error::nothing_to_commit()));
        assert_eq!(result.status, ActionStatus::Error);
        assert_eq!(result.message, "nothing to commit, working tree clean");
    }

    #[test]
    fn test_parse_write_file() {
        let action = Action::parse(
            ActionKind::WriteFile,
            r#"{"file_path": "notes.txt", "content": "hello"}"#,
        )
        .unwrap();

        assert_eq!(
            action,
            Action::WriteFile(WriteFileArgs {
                file_path: "notes.txt".into(),
                content: "hello".into(),
            })
        );
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let action = Action::parse(
            ActionKind::CommitChanges,
            r#"{"message": "add notes", "author": "me"}"#,
        )
        .unwrap();
        assert_eq!(action.kind(), ActionKind::CommitChanges);
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = Action::parse(ActionKind::ReadFile, r#"{"file_path": "notes.txt""#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains(r#"{"file_path": "path/to/file"}"#));
    }

    #[test]
    fn test_parse_non_object() {
        let err = Action::parse(ActionKind::CommitChanges, r#""add notes""#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("must be a JSON object"));
    }

    #[test]
    fn test_parse_missing_field() {
        let err =
            Action::parse(ActionKind::WriteFile, r#"{"file_path": "notes.txt"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("content"));
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ActionKind::from_name("modify_file"), None);
    }
}
