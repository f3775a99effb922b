//! Interactive confirmation prompts
//!
//! `PromptState` is shared across every repository of a run so that an
//! "apply to all" answer, or `--yes`, suppresses the remaining prompts.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptResult {
    pub confirmed: bool,
    pub apply_to_all: bool,
}

#[cfg_attr(test, mockall::automock)]
pub trait ConfirmationPrompter: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<PromptResult>;
}

#[derive(Debug, Default)]
pub struct PromptState {
    assume_yes: AtomicBool,
}

impl PromptState {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes: AtomicBool::new(assume_yes),
        }
    }

    pub fn is_assume_yes(&self) -> bool {
        self.assume_yes.load(Ordering::Relaxed)
    }

    pub fn set_assume_yes(&self, value: bool) {
        self.assume_yes.store(value, Ordering::Relaxed);
    }

    /// Ask unless assume-yes is active; remembers an "apply to all" answer
    pub fn confirm(&self, prompter: &dyn ConfirmationPrompter, prompt: &str) -> Result<bool> {
        if self.is_assume_yes() {
            return Ok(true);
        }
        let answer = prompter.confirm(prompt)?;
        if answer.confirmed && answer.apply_to_all {
            self.set_assume_yes(true);
        }
        Ok(answer.confirmed)
    }
}

/// Reads `y`/`n`/`a` answers from stdin
pub struct StdinPrompter;

impl ConfirmationPrompter for StdinPrompter {
    fn confirm(&self, prompt: &str) -> Result<PromptResult> {
        eprint!("{prompt} [y/N/a] ");
        std::io::stderr().flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(parse_answer(&line))
    }
}

fn parse_answer(line: &str) -> PromptResult {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => PromptResult {
            confirmed: true,
            apply_to_all: false,
        },
        "a" | "all" => PromptResult {
            confirmed: true,
            apply_to_all: true,
        },
        _ => PromptResult::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assume_yes_skips_prompter() {
        let mut prompter = MockConfirmationPrompter::new();
        prompter.expect_confirm().times(0);

        let state = PromptState::new(true);
        assert!(state.confirm(&prompter, "Rename?").unwrap());
    }

    #[test]
    fn test_apply_to_all_is_remembered() {
        let mut prompter = MockConfirmationPrompter::new();
        prompter.expect_confirm().times(1).returning(|_| {
            Ok(PromptResult {
                confirmed: true,
                apply_to_all: true,
            })
        });

        let state = PromptState::new(false);
        assert!(state.confirm(&prompter, "first").unwrap());
        assert!(state.confirm(&prompter, "second").unwrap());
        assert!(state.is_assume_yes());
    }

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("Y\n").confirmed);
        assert!(parse_answer("all").apply_to_all);
        assert_eq!(parse_answer(""), PromptResult::default());
    }
}
