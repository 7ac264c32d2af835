//! Prompt templates for both interaction styles.

use gitpilot_core::ActionRegistry;

const PREAMBLE: &str = "You are a helpful AI assistant that helps users with Git repository operations.
You can modify files and commit changes using the provided tools.
Always think step by step about what needs to be done, and use the appropriate tools when needed.
If you're modifying files, make sure to commit the changes afterwards.
All file paths are relative to the root of the repository.";

/// System prompt for the text (ReAct) style: tool list plus output grammar.
pub fn react_system(registry: &ActionRegistry) -> String {
    let tools: Vec<String> = registry
        .descriptors()
        .iter()
        .map(|d| format!("- {}", d.to_prompt_line()))
        .collect();

    format!(
        "{preamble}

You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{names}]
Action Input: the input to the action, a single-line JSON object
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Write exactly one Action or one Final Answer per response, then stop. \
Never write the Observation yourself.",
        preamble = PREAMBLE,
        tools = tools.join("\n"),
        names = registry.names().join(", "),
    )
}

/// User message for the text style: the question plus the running transcript.
pub fn react_user(question: &str, transcript: &str) -> String {
    format!("Begin!\n\nQuestion: {}\n{}", question, transcript)
}

/// System prompt for the structured tool-call style.
pub fn tools_system() -> String {
    format!(
        "{}\nWhen you are done, reply with a short summary for the user and no tool calls.",
        PREAMBLE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitpilot_core::test_support::init_repo;
    use gitpilot_core::Workspace;

    #[test]
    fn test_react_system_lists_every_tool() {
        let repo = init_repo();
        let registry = ActionRegistry::new(Workspace::open(repo.path()).unwrap());
        let prompt = react_system(&registry);

        for descriptor in registry.descriptors() {
            assert!(prompt.contains(&descriptor.to_prompt_line()));
        }
        assert!(prompt.contains("should be one of [write_file, read_file, commit_changes]"));
        assert!(prompt.contains("Final Answer:"));
    }

    #[test]
    fn test_react_user_ends_with_transcript() {
        let user = react_user("create notes.txt", "Thought:");
        assert!(user.ends_with("Question: create notes.txt\nThought:"));
    }
}
