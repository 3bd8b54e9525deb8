//! Operator confirmation before statements that modify the warehouse.

use std::io::{self, BufRead, Write};

use crate::error::Result;

const MUTATING: [&str; 4] = ["DROP", "INSERT", "CREATE", "ALTER"];

pub const PROMPT: &str =
    "This command will modify the database, are you sure you want to continue [y/n]? ";

/// Asks the operator a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(self(prompt))
    }
}

/// Answers yes without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Prompts on stdout and reads one line from stdin; only `y`/`yes` proceeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl Confirm for StdinPrompt {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let mut out = io::stdout();
        out.write_all(prompt.as_bytes())?;
        out.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(is_affirmative(&line))
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Mutating keywords appearing as whole words in `statement`, any case.
pub fn mutating_keywords(statement: &str) -> Vec<&'static str> {
    let words: Vec<String> = statement
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_uppercase())
        .collect();
    MUTATING
        .into_iter()
        .filter(|kw| words.iter().any(|w| w == kw))
        .collect()
}

pub fn is_mutating(statement: &str) -> bool {
    !mutating_keywords(statement).is_empty()
}
