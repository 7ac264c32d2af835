//! Agent implementation - drives the model <-> action loop for one turn

use gitpilot_core::react::{self, ReactStep, OBSERVATION_STOP};
use gitpilot_core::{
    ActionRegistry, ChatMessage, CompletionRequest, CompletionResponse, Error, FinishReason,
    LlmProvider, Result, UsageTracker,
};
use tracing::{debug, info, instrument, warn};

use crate::prompt;
use crate::scratchpad::{Observation, Scratchpad};

/// How the model selects actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentStyle {
    /// Text protocol parsed by the ReAct parser; works with any model
    #[default]
    React,
    /// Structured tool calls; needs a model with tool support
    ToolCalls,
}

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model override; `None` uses the provider default
    pub model: Option<String>,
    pub style: AgentStyle,
    /// Model calls allowed per turn before giving up
    pub max_steps: usize,
    pub temperature: Option<f32>,
    /// Print thoughts, actions and observations as they happen
    pub verbose: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            style: AgentStyle::React,
            max_steps: 15,
            temperature: Some(0.0),
            verbose: false,
        }
    }
}

/// Result of one turn
#[derive(Debug, Clone)]
pub struct AgentResult {
    /// Final natural-language answer
    pub answer: String,
    /// Actions dispatched during the turn, in order
    pub observations: Vec<Observation>,
}

/// The agent - owns the provider and the action registry
pub struct Agent<P: LlmProvider> {
    provider: P,
    registry: ActionRegistry,
    config: AgentConfig,
    usage: UsageTracker,
}

impl<P: LlmProvider> Agent<P> {
    pub fn new(provider: P, registry: ActionRegistry) -> Self {
        Self::with_config(provider, registry, AgentConfig::default())
    }

    pub fn with_config(provider: P, registry: ActionRegistry, config: AgentConfig) -> Self {
        Self {
            provider,
            registry,
            config,
            usage: UsageTracker::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Model name requests are sent with
    pub fn model(&self) -> &str {
        self.config
            .model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Run one user request to a final answer.
    #[instrument(skip_all, fields(style = ?self.config.style))]
    pub async fn run(&mut self, input: &str) -> Result<AgentResult> {
        info!(chars = input.len(), "turn started");
        if self.config.verbose {
            println!("\n> Entering agent loop ({:?})", self.config.style);
        }

        let result = match self.config.style {
            AgentStyle::React => self.run_react(input).await,
            AgentStyle::ToolCalls => self.run_tool_calls(input).await,
        };

        if self.config.verbose {
            println!("> Finished agent loop");
        }
        result
    }

    async fn run_react(&mut self, input: &str) -> Result<AgentResult> {
        let system = prompt::react_system(&self.registry);
        let mut pad = Scratchpad::new();

        for step in 1..=self.config.max_steps {
            let user = prompt::react_user(input, &pad.to_react_transcript());
            let request = self
                .request(vec![ChatMessage::system(&system), ChatMessage::user(user)])
                .with_stop(vec![OBSERVATION_STOP.to_string()]);

            let response = self.complete(request, step).await?;
            let text = response.content.unwrap_or_default();

            match react::parse(&text) {
                Ok(ReactStep::Finish { thought, answer }) => {
                    if self.config.verbose {
                        if let Some(thought) = &thought {
                            println!("Thought: {}", thought);
                        }
                        println!("Final Answer: {}", answer);
                    }
                    return Ok(AgentResult {
                        answer,
                        observations: pad.into_observations(),
                    });
                }
                Ok(ReactStep::Action {
                    thought,
                    action,
                    input: arguments,
                }) => {
                    if self.config.verbose {
                        if let Some(thought) = &thought {
                            println!("Thought: {}", thought);
                        }
                        println!("Action: {}", action);
                        println!("Action Input: {}", arguments);
                    }
                    let observation = self.dispatch(action, arguments);
                    pad.record(thought, observation);
                }
                Err(err) => {
                    warn!(step, reason = %err, "could not parse model output");
                    if self.config.verbose {
                        println!("Invalid Format: {}", err);
                    }
                    pad.record_invalid(text, err.reason);
                }
            }
        }

        Err(Error::step_limit_exceeded(self.config.max_steps).with_operation("agent::run"))
    }

    async fn run_tool_calls(&mut self, input: &str) -> Result<AgentResult> {
        let tools = self.registry.tool_definitions();
        let mut messages = vec![
            ChatMessage::system(prompt::tools_system()),
            ChatMessage::user(input),
        ];
        let mut pad = Scratchpad::new();

        for step in 1..=self.config.max_steps {
            let request = self.request(messages.clone()).with_tools(tools.clone());
            let response = self.complete(request, step).await?;

            if response.tool_calls.is_empty() {
                let answer = response.content.unwrap_or_default().trim().to_string();
                if answer.is_empty() {
                    return Err(Error::inference_failed(
                        "model returned neither tool calls nor an answer",
                    )
                    .with_operation("agent::run"));
                }
                if self.config.verbose {
                    println!("Final Answer: {}", answer);
                }
                return Ok(AgentResult {
                    answer,
                    observations: pad.into_observations(),
                });
            }

            let thought = response
                .content
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            if self.config.verbose {
                if let Some(thought) = &thought {
                    println!("Thought: {}", thought);
                }
            }
            messages.push(ChatMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in response.tool_calls {
                if self.config.verbose {
                    println!("Action: {}", call.name);
                    println!("Action Input: {}", call.arguments);
                }
                let observation = self.dispatch(call.name, call.arguments);
                messages.push(ChatMessage::tool_result(
                    call.id,
                    observation.result.to_observation(),
                ));
                pad.record(thought.clone(), observation);
            }
        }

        Err(Error::step_limit_exceeded(self.config.max_steps).with_operation("agent::run"))
    }

    fn request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        let mut request = CompletionRequest::new(messages).with_model(self.model());
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }

    async fn complete(
        &mut self,
        request: CompletionRequest,
        step: usize,
    ) -> Result<CompletionResponse> {
        debug!(step, messages = request.messages.len(), "calling model");
        let model = self.model().to_string();
        let response = self.provider.complete(request).await.map_err(|e| {
            e.into_error()
                .with_context("model", model.clone())
                .with_context("step", step.to_string())
        })?;
        self.usage.track(&response.usage);

        // A cut-off reply would be parsed or dispatched as if it were whole.
        if response.finish_reason == FinishReason::Length {
            warn!(step, "model output hit the token limit");
            return Err(Error::inference_failed(
                "model output was truncated at the token limit",
            )
            .with_operation("agent::run")
            .with_context("model", model)
            .with_context("step", step.to_string()));
        }
        Ok(response)
    }

    fn dispatch(&self, action: String, arguments: String) -> Observation {
        let result = self.registry.dispatch(&action, &arguments);
        if self.config.verbose {
            println!("Observation: {}", result.to_observation());
        }
        Observation {
            action,
            arguments,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProvider;
    use gitpilot_core::test_support::{commit_count, init_repo};
    use gitpilot_core::{ActionStatus, ErrorKind, ProviderError, ToolCall, Workspace};

    fn agent(
        repo: &std::path::Path,
        provider: ScriptedProvider,
        config: AgentConfig,
    ) -> Agent<ScriptedProvider> {
        let registry = ActionRegistry::new(Workspace::open(repo).unwrap());
        Agent::with_config(provider, registry, config)
    }

    #[tokio::test]
    async fn test_react_turn_dispatches_then_answers() {
        let repo = init_repo();
        let provider = ScriptedProvider::new()
            .reply(
                "Thought: write it\n\
                 Action: write_file\n\
                 Action Input: {\"file_path\": \"a.txt\", \"content\": \"x\"}",
            )
            .reply("Thought: done\nFinal Answer: wrote a.txt");
        let mut agent = agent(repo.path(), provider, AgentConfig::default());

        let result = agent.run("create a.txt").await.unwrap();

        assert_eq!(result.answer, "wrote a.txt");
        assert_eq!(result.observations.len(), 1);
        assert_eq!(result.observations[0].action, "write_file");
        assert!(result.observations[0].result.is_success());
        assert_eq!(
            std::fs::read_to_string(repo.path().join("a.txt")).unwrap(),
            "x"
        );

        let requests = agent.provider().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].model.as_deref(), Some("scripted"));
        assert_eq!(requests[0].stop, Some(vec![OBSERVATION_STOP.to_string()]));
        let second_user = requests[1].messages[1].content.clone().unwrap();
        assert!(second_user.contains("Observation: {\"status\":\"success\""));
        assert!(second_user.ends_with("Thought:"));
    }

    #[tokio::test]
    async fn test_react_parse_error_is_fed_back() {
        let repo = init_repo();
        let provider = ScriptedProvider::new()
            .reply("I will just do it.")
            .reply("Final Answer: ok");
        let mut agent = agent(repo.path(), provider, AgentConfig::default());

        let result = agent.run("anything").await.unwrap();
        assert_eq!(result.answer, "ok");
        assert!(result.observations.is_empty());

        let requests = agent.provider().requests();
        let retry_prompt = requests[1].messages[1].content.clone().unwrap();
        assert!(retry_prompt.contains("I will just do it.\nObservation: Invalid Format:"));
    }

    #[tokio::test]
    async fn test_action_errors_are_observations() {
        let repo = init_repo();
        let provider = ScriptedProvider::new()
            .reply("Action: commit_changes\nAction Input: {\"message\": \"nothing here\"}")
            .reply("Action: read_file\nAction Input: {not json}")
            .reply("Action: delete_everything\nAction Input: {}")
            .reply("Final Answer: nothing to do");
        let mut agent = agent(repo.path(), provider, AgentConfig::default());

        let result = agent.run("commit").await.unwrap();
        let statuses: Vec<ActionStatus> = result
            .observations
            .iter()
            .map(|o| o.result.status)
            .collect();
        assert_eq!(statuses, vec![ActionStatus::Error; 3]);
        assert_eq!(commit_count(repo.path()), 0);
    }

    #[tokio::test]
    async fn test_step_limit() {
        let repo = init_repo();
        let mut provider = ScriptedProvider::new();
        for _ in 0..3 {
            provider = provider.reply("Thought: hmm");
        }
        let config = AgentConfig {
            max_steps: 3,
            ..AgentConfig::default()
        };
        let mut agent = agent(repo.path(), provider, config);

        let err = agent.run("loop forever").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StepLimitExceeded);
        assert_eq!(agent.provider().requests().len(), 3);
    }

    #[tokio::test]
    async fn test_backend_failure_ends_turn() {
        let repo = init_repo();
        let provider = ScriptedProvider::new()
            .fail(ProviderError::Network("connection refused".into()));
        let mut agent = agent(repo.path(), provider, AgentConfig::default());

        let err = agent.run("hello").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert!(err.context().iter().any(|(k, v)| *k == "model" && v == "scripted"));
    }

    #[tokio::test]
    async fn test_tool_call_style() {
        let repo = init_repo();
        let provider = ScriptedProvider::new()
            .respond(CompletionResponse::text("").with_tool_calls(vec![
                ToolCall {
                    id: "call_0".into(),
                    name: "write_file".into(),
                    arguments: r#"{"file_path": "notes.txt", "content": "hello"}"#.into(),
                },
                ToolCall {
                    id: "call_1".into(),
                    name: "commit_changes".into(),
                    arguments: r#"{"message": "add notes"}"#.into(),
                },
            ]))
            .reply("Created and committed notes.txt.");
        let config = AgentConfig {
            style: AgentStyle::ToolCalls,
            model: Some("llama3.1".into()),
            ..AgentConfig::default()
        };
        let mut agent = agent(repo.path(), provider, config);

        let result = agent.run("create notes.txt and commit").await.unwrap();
        assert_eq!(result.answer, "Created and committed notes.txt.");
        assert_eq!(result.observations.len(), 2);
        assert!(result.observations.iter().all(|o| o.result.is_success()));
        assert_eq!(commit_count(repo.path()), 1);

        let requests = agent.provider().requests();
        assert_eq!(requests[0].model.as_deref(), Some("llama3.1"));
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(3));
        let tool_messages: Vec<_> = requests[1]
            .messages
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(tool_messages, vec!["call_0", "call_1"]);
        assert_eq!(agent.usage().total_calls, 2);
    }

    #[tokio::test]
    async fn test_tool_call_style_verbose_keeps_model_text() {
        let repo = init_repo();
        let provider = ScriptedProvider::new()
            .respond(
                CompletionResponse::text("I'll write the file first.").with_tool_calls(vec![
                    ToolCall {
                        id: "call_0".into(),
                        name: "write_file".into(),
                        arguments: r#"{"file_path": "a.txt", "content": "x"}"#.into(),
                    },
                ]),
            )
            .reply("Done.");
        let config = AgentConfig {
            style: AgentStyle::ToolCalls,
            verbose: true,
            ..AgentConfig::default()
        };
        let mut agent = agent(repo.path(), provider, config);

        let result = agent.run("write a.txt").await.unwrap();
        assert_eq!(result.answer, "Done.");

        let requests = agent.provider().requests();
        let assistant = &requests[1].messages[2];
        assert_eq!(assistant.content.as_deref(), Some("I'll write the file first."));
        assert_eq!(assistant.tool_calls.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_truncated_reply_is_not_dispatched() {
        let repo = init_repo();
        let mut truncated = CompletionResponse::text(
            "Action: write_file\nAction Input: {\"file_path\": \"a.txt\", \"content\": \"par",
        );
        truncated.finish_reason = FinishReason::Length;
        let provider = ScriptedProvider::new().respond(truncated);
        let mut agent = agent(repo.path(), provider, AgentConfig::default());

        let err = agent.run("write a long file").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert!(err.message().contains("truncated"));
        assert!(!repo.path().join("a.txt").exists());
        assert_eq!(agent.usage().total_calls, 1);
    }

    #[tokio::test]
    async fn test_tool_call_style_empty_answer_is_error() {
        let repo = init_repo();
        let provider = ScriptedProvider::new().reply("   ");
        let config = AgentConfig {
            style: AgentStyle::ToolCalls,
            ..AgentConfig::default()
        };
        let mut agent = agent(repo.path(), provider, config);

        let err = agent.run("hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
    }
}
