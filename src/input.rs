use crate::commands::dispatcher::CommandDispatcher;
use crate::config::Config;
use crate::core::error::DocChatError;

use console::style;
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config as EditorConfig, Context, EditMode, Editor, Helper};
use std::borrow::Cow;

const MODES: [&str; 2] = ["sync", "stream"];
const DATASET_ACTIONS: [&str; 4] = ["add", "list", "update", "delete"];

/// What the cursor is completing on a slash-command line
#[derive(Debug, PartialEq)]
enum Completion<'a> {
    Command { start: usize, prefix: &'a str },
    Keyword { start: usize, prefix: &'a str, options: &'static [&'static str] },
    Path,
    Nothing,
}

fn classify(line: &str) -> Completion<'_> {
    let Some(rest) = line.strip_prefix('/') else {
        return Completion::Nothing;
    };
    let Some((command, argument)) = rest.split_once(' ') else {
        return Completion::Command {
            start: 1,
            prefix: rest,
        };
    };

    let start = line.len() - argument.len();
    match command {
        "upload" if !argument.contains(' ') => Completion::Path,
        "mode" if !argument.contains(' ') => Completion::Keyword {
            start,
            prefix: argument,
            options: &MODES,
        },
        "dataset" if !argument.contains(' ') => Completion::Keyword {
            start,
            prefix: argument,
            options: &DATASET_ACTIONS,
        },
        _ => Completion::Nothing,
    }
}

fn candidates<'a>(prefix: &str, options: impl IntoIterator<Item = &'a str>) -> Vec<Pair> {
    options
        .into_iter()
        .filter(|option| option.starts_with(prefix))
        .map(|option| Pair {
            display: option.to_string(),
            replacement: option.to_string(),
        })
        .collect()
}

/// Completes slash commands, their keywords, and file paths for `/upload`
pub struct ChatHelper {
    filename_completer: FilenameCompleter,
    history_hinter: HistoryHinter,
    commands: Vec<String>,
}

impl ChatHelper {
    pub fn new(command_registry: &CommandDispatcher) -> Self {
        Self {
            filename_completer: FilenameCompleter::new(),
            history_hinter: HistoryHinter::new(),
            commands: command_registry.get_command_names(),
        }
    }
}

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Some(typed) = line.get(..pos) else {
            return Ok((pos, Vec::new()));
        };
        match classify(typed) {
            Completion::Command { start, prefix } => Ok((
                start,
                candidates(prefix, self.commands.iter().map(String::as_str)),
            )),
            Completion::Keyword {
                start,
                prefix,
                options,
            } => Ok((start, candidates(prefix, options.iter().copied()))),
            Completion::Path => self.filename_completer.complete(line, pos, ctx),
            Completion::Nothing => Ok((pos, Vec::new())),
        }
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.history_hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for ChatHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(style(hint).dim().to_string())
    }
}

impl Validator for ChatHelper {}

/// Creates a configured rustyline editor
pub fn create_editor(
    command_registry: &CommandDispatcher,
) -> Result<Editor<ChatHelper, FileHistory>, DocChatError> {
    let config = EditorConfig::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)?;
    editor.set_helper(Some(ChatHelper::new(command_registry)));

    let history_path = Config::history_path();
    if let Err(e) = editor.load_history(&history_path) {
        tracing::debug!(path = %history_path.display(), error = %e, "no input history loaded");
    }

    Ok(editor)
}

/// Reads a line of input. `None` means the user asked to leave.
pub fn read_input(
    editor: &mut Editor<ChatHelper, FileHistory>,
) -> Result<Option<String>, DocChatError> {
    let prompt = if cfg!(windows) && std::env::var("PSModulePath").is_ok() {
        "> ".to_string()
    } else {
        style("> ").bold().cyan().to_string()
    };
    match editor.readline(&prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                editor.add_history_entry(line.as_str())?;
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            println!("Exiting...");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Saves the editor history next to the config file
pub fn save_history(editor: &mut Editor<ChatHelper, FileHistory>) -> Result<(), DocChatError> {
    let history_path = Config::history_path();
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    editor.save_history(&history_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_command_prefix() {
        assert_eq!(
            classify("/da"),
            Completion::Command {
                start: 1,
                prefix: "da"
            }
        );
        assert_eq!(classify("plain question"), Completion::Nothing);
    }

    #[test]
    fn test_classify_keywords_and_paths() {
        assert_eq!(
            classify("/mode st"),
            Completion::Keyword {
                start: 6,
                prefix: "st",
                options: &MODES
            }
        );
        assert_eq!(classify("/upload ./no"), Completion::Path);
        assert_eq!(classify("/upload ./notes.pdf Neuro"), Completion::Nothing);
    }

    #[test]
    fn test_candidates_filter_by_prefix() {
        let found = candidates("st", MODES);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].replacement, "stream");
    }
}
