//! Interactive read/answer loop.
//!
//! One line in, one turn run to completion, one answer out. Turn failures are
//! printed and the loop carries on; only I/O on the session streams ends it
//! early.

use std::io::{BufRead, Write};

use gitpilot_core::{Error, LlmProvider, Result};
use tracing::{debug, info};

use crate::agent::Agent;

/// Keyword that ends the session, compared case-insensitively
pub const EXIT_KEYWORD: &str = "exit";

const PROMPT: &str = "\nYou: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Dispatching,
    PrintingAnswer,
    Terminated,
}

pub struct Session<P: LlmProvider> {
    agent: Agent<P>,
    state: SessionState,
    turns: usize,
}

impl<P: LlmProvider> Session<P> {
    pub fn new(agent: Agent<P>) -> Self {
        Self {
            agent,
            state: SessionState::AwaitingInput,
            turns: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Turns that reached the agent, successful or not
    pub fn turns(&self) -> usize {
        self.turns
    }

    pub fn agent(&self) -> &Agent<P> {
        &self.agent
    }

    /// Drive the loop until `exit` or end of input.
    pub async fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> Result<()> {
        let mut line = String::new();
        loop {
            self.state = SessionState::AwaitingInput;
            write!(output, "{}", PROMPT)?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                debug!("end of input");
                writeln!(output)?;
                break;
            }

            let request = line.trim();
            if request.is_empty() {
                continue;
            }
            if request.eq_ignore_ascii_case(EXIT_KEYWORD) {
                break;
            }

            self.state = SessionState::Dispatching;
            self.turns += 1;
            let outcome = self.agent.run(request).await;

            self.state = SessionState::PrintingAnswer;
            match outcome {
                Ok(result) => {
                    info!(actions = result.observations.len(), "turn finished");
                    writeln!(output, "\nAssistant: {}", result.answer)?;
                }
                Err(err) => {
                    info!(error = %err, "turn failed");
                    write_failure(&mut output, &err, self.agent.model())?;
                }
            }
        }

        self.state = SessionState::Terminated;
        Ok(())
    }
}

fn write_failure<W: Write>(output: &mut W, err: &Error, model: &str) -> std::io::Result<()> {
    writeln!(output, "\nError occurred: {}", err.message())?;
    if err.kind().is_backend() {
        writeln!(
            output,
            "Tip: make sure Ollama is running (`ollama serve`) and the model is pulled (`ollama pull {}`).",
            model
        )?;
    }
    Ok(())
}
