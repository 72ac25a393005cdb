//! Chat prompt input
//!
//! Wraps a rustyline editor and keeps sent messages in a history file
//! under the state directory.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// Chat prompt
pub const PROMPT: &str = "you> ";

/// What one prompt read produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Trimmed, non-empty line
    Line(String),
    /// Only whitespace was entered
    Blank,
    /// Ctrl-C at the prompt
    Interrupted,
    /// Ctrl-D or closed stdin
    Eof,
}

/// Line editor with persistent history
pub struct PromptReader {
    editor: DefaultEditor,
    history_file: PathBuf,
}

impl PromptReader {
    /// Open the editor, loading earlier messages if the file exists
    pub fn open(history_file: PathBuf) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if history_file.exists() {
            if let Err(e) = editor.load_history(&history_file) {
                tracing::debug!(error = %e, path = %history_file.display(), "history not loaded");
            }
        }

        Ok(Self { editor, history_file })
    }

    /// Read one line from the terminal
    pub fn read(&mut self) -> Result<UserInput> {
        let input = classify(self.editor.readline(PROMPT))?;
        if let UserInput::Line(line) = &input {
            let _ = self.editor.add_history_entry(line.as_str());
        }
        Ok(input)
    }

    /// Write history to disk, creating the state directory if needed
    pub fn save_history(&mut self) -> Result<()> {
        if let Some(parent) = self.history_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.editor.save_history(&self.history_file)?;
        Ok(())
    }
}

fn classify(read: std::result::Result<String, ReadlineError>) -> Result<UserInput> {
    match read {
        Ok(line) => {
            let line = line.trim();
            Ok(if line.is_empty() {
                UserInput::Blank
            } else {
                UserInput::Line(line.to_string())
            })
        }
        Err(ReadlineError::Interrupted) => Ok(UserInput::Interrupted),
        Err(ReadlineError::Eof) => Ok(UserInput::Eof),
        Err(err) => Err(anyhow::anyhow!("Readline error: {}", err)),
    }
}
