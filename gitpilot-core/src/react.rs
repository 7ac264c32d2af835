//! # ReAct output parser
//!
//! Parses one model response in the text-style protocol. Grammar:
//!
//! ```text
//! step      := [thought] (action | final)
//! thought   := "Thought:" text
//! action    := "Action:" name NL "Action Input:" argument
//! final     := "Final Answer:" text
//! argument  := JSON object, optionally inside a ``` fence, ending at the end
//!              of the text or at a line starting with "Observation:"
//! ```
//!
//! Keywords are recognised only at the start of a line (after leading
//! whitespace). Anything the model writes after its first `Observation:` line
//! is a hallucinated continuation and is ignored.

use std::fmt;

/// Stop sequence to send with every text-style request.
pub const OBSERVATION_STOP: &str = "\nObservation:";

const THOUGHT: &str = "Thought:";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const OBSERVATION: &str = "Observation:";
const FINAL_ANSWER: &str = "Final Answer:";

/// One parsed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactStep {
    /// The model wants an action run
    Action {
        thought: Option<String>,
        action: String,
        /// Raw argument text, fences stripped
        input: String,
    },
    /// The model is done
    Finish {
        thought: Option<String>,
        answer: String,
    },
}

/// Why a response could not be parsed. Shown to the model verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub reason: String,
}

impl ParseError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for gitpilot_error::Error {
    fn from(err: ParseError) -> Self {
        gitpilot_error::Error::parse_failed(err.reason).with_operation("react::parse")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Thought,
    Action,
    ActionInput,
    FinalAnswer,
}

#[derive(Default)]
struct Sections {
    thought: Option<String>,
    action: Option<String>,
    input: Option<String>,
    answer: Option<String>,
}

/// Parse one model response.
pub fn parse(text: &str) -> Result<ReactStep, ParseError> {
    let mut sections = Sections::default();
    let mut current = Section::Preamble;
    let mut buffer: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if current == Section::ActionInput && trimmed.starts_with("```") {
            in_fence = !in_fence;
            buffer.push(line);
            continue;
        }
        if in_fence {
            buffer.push(line);
            continue;
        }

        if trimmed.starts_with(OBSERVATION) {
            break;
        }

        let keyword = [
            (ACTION_INPUT, Section::ActionInput),
            (ACTION, Section::Action),
            (THOUGHT, Section::Thought),
            (FINAL_ANSWER, Section::FinalAnswer),
        ]
        .into_iter()
        .find(|(kw, _)| trimmed.starts_with(kw));

        match keyword {
            Some((kw, section)) => {
                store(&mut sections, current, &buffer)?;
                buffer.clear();
                current = section;
                let rest = trimmed[kw.len()..].trim_start();
                buffer.push(rest);
                if section == Section::ActionInput && rest.starts_with("```") {
                    in_fence = !rest[3..].contains("```");
                }
            }
            None => buffer.push(line),
        }
    }
    store(&mut sections, current, &buffer)?;

    build(sections)
}

fn store(sections: &mut Sections, section: Section, lines: &[&str]) -> Result<(), ParseError> {
    let text = lines.join("\n").trim().to_string();
    let slot = match section {
        Section::Preamble => {
            // Models often open with free text instead of "Thought:".
            if !text.is_empty() && sections.thought.is_none() {
                sections.thought = Some(text);
            }
            return Ok(());
        }
        Section::Thought => &mut sections.thought,
        Section::Action => &mut sections.action,
        Section::ActionInput => &mut sections.input,
        Section::FinalAnswer => &mut sections.answer,
    };
    if section != Section::Thought && slot.is_some() {
        return Err(ParseError::new(format!(
            "Only one {} is allowed per response",
            keyword_of(section)
        )));
    }
    *slot = Some(text);
    Ok(())
}

fn keyword_of(section: Section) -> &'static str {
    match section {
        Section::Preamble => "preamble",
        Section::Thought => THOUGHT,
        Section::Action => ACTION,
        Section::ActionInput => ACTION_INPUT,
        Section::FinalAnswer => FINAL_ANSWER,
    }
}

fn build(sections: Sections) -> Result<ReactStep, ParseError> {
    let thought = sections.thought.filter(|t| !t.is_empty());

    match (sections.action, sections.input, sections.answer) {
        (Some(_), _, Some(_)) | (None, Some(_), Some(_)) => Err(ParseError::new(
            "Response contains both an action and a Final Answer; give exactly one",
        )),
        (None, None, Some(answer)) => {
            if answer.is_empty() {
                return Err(ParseError::new("Final Answer is empty"));
            }
            Ok(ReactStep::Finish { thought, answer })
        }
        (Some(action), Some(input), None) => {
            let action = action
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .trim_matches('`')
                .trim()
                .to_string();
            if action.is_empty() {
                return Err(ParseError::new("Action name is empty"));
            }
            Ok(ReactStep::Action {
                thought,
                action,
                input: strip_fence(&input),
            })
        }
        (Some(_), None, None) => Err(ParseError::new(
            "Missing 'Action Input:' after 'Action:'",
        )),
        (None, Some(_), None) => Err(ParseError::new(
            "Missing 'Action:' before 'Action Input:'",
        )),
        (None, None, None) => Err(ParseError::new(
            "Could not find 'Action:' or 'Final Answer:' in the response",
        )),
    }
}

/// Remove a surrounding ``` / ```json fence if present.
fn strip_fence(input: &str) -> String {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    let rest = rest.trim_start_matches([' ', '\t']);
    // Drop an info string such as `json`, on its own line or inline.
    let body = match rest.split_once('\n') {
        Some((info, body)) if !info.contains('{') => body,
        _ if rest.starts_with(['{', '[']) => rest,
        _ => {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '{')
                .unwrap_or(rest.len());
            &rest[end..]
        }
    };
    body.trim().to_string()
}
