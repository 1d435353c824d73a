//! Line commands of the interactive shell.

use std::path::PathBuf;

use crate::models::{Condition, QueryField};
use crate::session::SearchMode;

/// Help text printed by the `help` command
pub const HELP: &str = "\
Commands:
  mode single|builder        switch search mode
  term <field> <text>        add a term (field: Title, Title/Abstract, Text)
  and | or                   add a condition
  query                      show the query being built
  search [query]             run a query (builder mode: the built query)
  download [path]            write the archive of the current results
  help                       show this help
  quit                       leave the shell";

/// One parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Mode(SearchMode),
    Term { field: QueryField, text: String },
    Condition(Condition),
    Query,
    Search(Option<String>),
    Download(Option<PathBuf>),
    Help,
    Quit,
    /// Blank line
    Nothing,
}

impl ShellCommand {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command.to_lowercase().as_str() {
            "" => Ok(ShellCommand::Nothing),
            "mode" => rest.parse().map(ShellCommand::Mode),
            "term" => {
                let (field, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "Usage: term <field> <text>".to_string())?;
                let field: QueryField = field.parse().map_err(|e| format!("{}", e))?;
                Ok(ShellCommand::Term {
                    field,
                    text: text.trim().to_string(),
                })
            }
            "and" | "or" => command
                .parse()
                .map(ShellCommand::Condition)
                .map_err(|e| format!("{}", e)),
            "query" => Ok(ShellCommand::Query),
            "search" => Ok(ShellCommand::Search(non_empty(rest))),
            "download" => Ok(ShellCommand::Download(non_empty(rest).map(PathBuf::from))),
            "help" | "?" => Ok(ShellCommand::Help),
            "quit" | "exit" => Ok(ShellCommand::Quit),
            other => Err(format!("Unknown command: {} (type 'help')", other)),
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
