//! Interactive editor commands

use std::path::PathBuf;

use crate::error::{EditorError, Result};
use crate::sync::{LineField, SpeakerField};

pub const HELP: &str = "\
Commands:
  analyze [text | @file]          Analyze dialogue text (no argument: type it, end with '.')
  show                            Show the current screen
  title <text>                    Rename the project (local only)
  speaker <id> <field> <value>    Edit a speaker: name, gender, age_group, voice_type
  line <id> <field> <value>       Edit a line: text, emotion, speed_ratio, volume_ratio, pitch_ratio
  regen <line-id>                 Regenerate one line's audio
  generate                        Generate audio for the whole project
  preview                         Preview previously generated audio
  download [path]                 Save the previewed audio
  back                            Go back one step
  new                             Start a new project
  load [project-id]               Load a project (no argument: choose from a list)
  list                            List stored projects
  voices                          List available voices
  help                            Show this help
  quit                            Exit";

/// Where `analyze` takes its text from
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeSource {
    /// Read lines until a lone `.`
    Prompt,
    Inline(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Analyze(AnalyzeSource),
    Show,
    Title(String),
    Speaker {
        id: String,
        field: SpeakerField,
        value: String,
    },
    Line {
        id: String,
        field: LineField,
        value: String,
    },
    Regen(String),
    Generate,
    Preview,
    Download(Option<PathBuf>),
    Back,
    New,
    Load(Option<String>),
    List,
    Voices,
    Help,
    Quit,
}

/// Split off the first whitespace-delimited word
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(end) => (&input[..end], input[end..].trim_start()),
        None => (input, ""),
    }
}

fn required<'a>(value: &'a str, usage: &str) -> Result<&'a str> {
    if value.is_empty() {
        Err(EditorError::Validation(format!("Usage: {}", usage)))
    } else {
        Ok(value)
    }
}

fn optional(value: &str) -> Option<String> {
    Some(value.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Parse one input line; blank input is `None`.
///
/// Field values are the rest of the line, so they may contain spaces or be
/// empty (an empty emotion clears it).
pub fn parse_command(input: &str) -> Result<Option<Command>> {
    let (word, rest) = split_word(input.trim());
    if word.is_empty() {
        return Ok(None);
    }

    let command = match word.to_ascii_lowercase().as_str() {
        "analyze" | "a" => {
            let source = match rest.trim() {
                "" => AnalyzeSource::Prompt,
                text => match text.strip_prefix('@') {
                    Some(path) => {
                        AnalyzeSource::File(PathBuf::from(required(path.trim(), "analyze @<file>")?))
                    }
                    None => AnalyzeSource::Inline(text.to_string()),
                },
            };
            Command::Analyze(source)
        }
        "show" | "s" => Command::Show,
        "title" => Command::Title(required(rest.trim(), "title <text>")?.to_string()),
        "speaker" => {
            let usage = "speaker <id> <field> <value>";
            let (id, rest) = split_word(rest);
            let (field, value) = split_word(rest);
            Command::Speaker {
                id: required(id, usage)?.to_string(),
                field: SpeakerField::parse(required(field, usage)?)?,
                value: value.trim_end().to_string(),
            }
        }
        "line" => {
            let usage = "line <id> <field> <value>";
            let (id, rest) = split_word(rest);
            let (field, value) = split_word(rest);
            Command::Line {
                id: required(id, usage)?.to_string(),
                field: LineField::parse(required(field, usage)?)?,
                value: value.trim_end().to_string(),
            }
        }
        "regen" => Command::Regen(required(rest.trim(), "regen <line-id>")?.to_string()),
        "generate" | "g" => Command::Generate,
        "preview" | "p" => Command::Preview,
        "download" | "d" => Command::Download(optional(rest).map(PathBuf::from)),
        "back" | "b" => Command::Back,
        "new" => Command::New,
        "load" => Command::Load(optional(rest)),
        "list" | "l" => Command::List,
        "voices" | "v" => Command::Voices,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => {
            return Err(EditorError::Validation(format!(
                "Unknown command '{}'. Type 'help' for a list of commands.",
                other
            )));
        }
    };

    Ok(Some(command))
}
