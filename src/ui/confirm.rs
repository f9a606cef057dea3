use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Mutex;

use colored::Colorize;

/// Capability to ask the user a yes/no question.
///
/// Implementations return `false` when no answer can be obtained (closed
/// input, non-interactive session); callers treat that as a refusal.
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

/// Prompts on stdout and reads an answer from stdin. Defaults to "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str) -> bool {
        if !io::stdin().is_terminal() {
            tracing::debug!("stdin is not a terminal, declining: {question}");
            return false;
        }

        print!("{} ", format!("{question} [y/N]:").green());
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut response = String::new();
        match io::stdin().lock().read_line(&mut response) {
            Ok(0) | Err(_) => false,
            Ok(_) => parse_answer(&response),
        }
    }
}

fn parse_answer(response: &str) -> bool {
    matches!(response.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Answers every question the same way (`--yes`, or non-interactive runs).
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}

/// Replays a fixed sequence of answers and records the questions asked.
/// Once the answers run out every further question is declined.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.asked.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> bool {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        self.answers.lock().ok().and_then(|mut a| a.pop_front()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer(" YES "));
        assert!(!parse_answer("\n"));
        assert!(!parse_answer("n"));
        assert!(!parse_answer("maybe"));
    }

    #[test]
    fn test_scripted_confirm() {
        let confirm = ScriptedConfirm::new([true]);
        assert!(confirm.confirm("first?"));
        assert!(!confirm.confirm("second?"));
        assert_eq!(confirm.questions(), vec!["first?", "second?"]);
    }
}
