//! Operator interaction
//!
//! The workflow suspends at two points, baseline confirmation and
//! cutover, and must not proceed without an explicit answer. The prompt
//! is a capability trait so the engine can be driven by a scripted
//! implementation in tests and by the console in the real CLI.

use crate::domain::{CaravelError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Yes/no confirmation capability
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    /// Ask the operator a yes/no question; `false` on anything but yes
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be obtained at all (closed
    /// stdin, broken terminal).
    async fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Console-backed prompt, answering from stdin
pub struct ConsolePrompt;

#[async_trait]
impl OperatorPrompt for ConsolePrompt {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        let prompt = prompt.to_string();
        // Stdin reads block, so keep them off the async worker threads
        tokio::task::spawn_blocking(move || {
            use std::io::{self, Write};

            print!("{prompt} [y/N]: ");
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            Ok(input.trim().eq_ignore_ascii_case("y"))
        })
        .await
        .map_err(|e| CaravelError::Other(format!("confirmation prompt task failed: {e}")))?
    }
}

/// Prompt with pre-scripted answers, for tests and non-interactive runs
///
/// Answers are consumed in order; asking more questions than were
/// scripted is an error. Every prompt text is recorded for inspection.
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<bool>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    /// Create a prompt that will give the supplied answers in order
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Prompts asked so far, in order
    pub fn prompts_seen(&self) -> Vec<String> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OperatorPrompt for ScriptedPrompt {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        self.seen
            .lock()
            .map_err(|_| CaravelError::Other("scripted prompt state poisoned".to_string()))?
            .push(prompt.to_string());

        self.answers
            .lock()
            .map_err(|_| CaravelError::Other("scripted prompt state poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| {
                CaravelError::Other(format!("no scripted answer left for prompt: {prompt}"))
            })
    }
}
