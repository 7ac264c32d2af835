//! # Action Registry
//!
//! Maps action names to descriptors the model reads and to the workspace
//! operation they dispatch to. The set is fixed when the registry is built.

use gitpilot_error::Error;
use tracing::{debug, instrument, warn};

use crate::action::{expected_encoding, Action, ActionKind, ActionResult};
use crate::provider::ToolDefinition;
use crate::workspace::Workspace;

/// What the model is told about one action.
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    pub name: &'static str,
    pub description: String,
    /// Ordered, all required, all strings
    pub parameters: Vec<ParamSpec>,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
}

impl ActionDescriptor {
    pub fn for_kind(kind: ActionKind) -> Self {
        let (summary, params): (&str, Vec<ParamSpec>) = match kind {
            ActionKind::WriteFile => (
                "Modify or create a file in the git repository. Use this when you need \
                 to create or update file content. The whole file is replaced with the \
                 given content; missing parent directories are created.",
                vec![
                    ParamSpec {
                        name: "file_path",
                        description: "Path of the file, relative to the repository root",
                    },
                    ParamSpec {
                        name: "content",
                        description: "Complete new content of the file",
                    },
                ],
            ),
            ActionKind::ReadFile => (
                "Read a file from the git repository. Use this to inspect existing \
                 content before changing it.",
                vec![ParamSpec {
                    name: "file_path",
                    description: "Path of the file, relative to the repository root",
                }],
            ),
            ActionKind::CommitChanges => (
                "Commit all changes in the repository. Use this after modifying files \
                 to save the changes. Stages every added, modified and deleted file.",
                vec![ParamSpec {
                    name: "message",
                    description: "Commit message",
                }],
            ),
        };

        Self {
            kind,
            name: kind.name(),
            description: format!(
                "{} Input must be a JSON object: {}",
                summary,
                expected_encoding(kind)
            ),
            parameters: params,
        }
    }

    /// OpenAI-style function definition for structured tool calling.
    pub fn to_tool_definition(&self) -> ToolDefinition {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    serde_json::json!({ "type": "string", "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self.parameters.iter().map(|p| p.name).collect();

        ToolDefinition::new(self.name, self.description.clone()).with_parameters(
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        )
    }

    /// One line for a text prompt: `name: description`.
    pub fn to_prompt_line(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

/// The fixed action set bound to one workspace.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    workspace: Workspace,
    descriptors: Vec<ActionDescriptor>,
}

impl ActionRegistry {
    /// Registry exposing every action.
    pub fn new(workspace: Workspace) -> Self {
        Self::with_actions(workspace, &ActionKind::ALL)
    }

    /// Registry exposing only the given actions, in the given order.
    pub fn with_actions(workspace: Workspace, kinds: &[ActionKind]) -> Self {
        let mut descriptors: Vec<ActionDescriptor> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if descriptors.iter().all(|d| d.kind != *kind) {
                descriptors.push(ActionDescriptor::for_kind(*kind));
            }
        }
        Self {
            workspace,
            descriptors,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn descriptors(&self) -> &[ActionDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.descriptors.iter().map(|d| d.to_tool_definition()).collect()
    }

    /// Resolve a name and argument string into a typed action.
    pub fn parse(&self, name: &str, arguments: &str) -> gitpilot_error::Result<Action> {
        let name = name.trim();
        let kind = self
            .descriptors
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.kind)
            .ok_or_else(|| {
                Error::unknown_action(name, &self.names()).with_operation("registry::parse")
            })?;
        Action::parse(kind, arguments)
    }

    /// Parse and run one action. Never fails: every problem becomes an error
    /// result for the model to read.
    #[instrument(skip(self, arguments), fields(args_len = arguments.len()))]
    pub fn dispatch(&self, name: &str, arguments: &str) -> ActionResult {
        let action = match self.parse(name, arguments) {
            Ok(action) => action,
            Err(err) => {
                warn!(error = %err, "rejected action call");
                return ActionResult::error(err.message());
            }
        };
        let result = self.workspace.execute(&action);
        debug!(status = ?result.status, "action finished");
        result
    }
}
