//! Line-oriented driver for an editing session

use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::commands::{AnalyzeSource, Command, HELP, parse_command};
use crate::config::Config;
use crate::session::{Phase, Session};
use crate::view::voice_listing;

/// Ends multi-line dialogue input
const END_OF_TEXT: &str = ".";

fn prompt(session: &Session) -> io::Result<()> {
    let label = match session.phase() {
        Phase::Input => "input".to_string(),
        phase => match session.active() {
            Some(active) => format!("{}:{}", phase, active.project.title),
            None => phase.to_string(),
        },
    };
    print!("{}> ", label);
    io::stdout().flush()
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Read dialogue lines until a lone `.` or end of input
fn read_dialogue(input: &mut impl BufRead) -> io::Result<String> {
    println!("Enter dialogue, one line per utterance. End with a line containing only '.'");

    let mut lines = Vec::new();
    while let Some(line) = read_line(input)? {
        if line.trim() == END_OF_TEXT {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

/// Run commands read from stdin until `quit` or end of input
pub async fn run(session: &mut Session, config: &Config) -> Result<()> {
    println!("dialogue-editor - type 'help' for commands\n");

    let stdin = io::stdin();
    loop {
        prompt(session)?;

        let Some(line) = read_line(&mut stdin.lock())? else {
            println!();
            return Ok(());
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        if command == Command::Quit {
            return Ok(());
        }
        dispatch(session, config, command).await?;
    }
}

/// Run one command. Session failures have already been shown to the user,
/// so only failing to read the terminal ends the loop.
async fn dispatch(session: &mut Session, config: &Config, command: Command) -> Result<()> {
    let outcome = match command {
        Command::Analyze(source) => {
            let text = match source {
                AnalyzeSource::Prompt => read_dialogue(&mut io::stdin().lock())?,
                AnalyzeSource::Inline(text) => text,
                AnalyzeSource::File(path) => match std::fs::read_to_string(&path) {
                    Ok(text) => text,
                    Err(e) => {
                        println!("Failed to read {}: {}", path.display(), e);
                        return Ok(());
                    }
                },
            };
            session.analyze(&text).await.map(drop)
        }
        Command::Show => {
            session.render();
            Ok(())
        }
        Command::Title(title) => session.rename_project(&title),
        Command::Speaker { id, field, value } => {
            session.edit_speaker(&id, field, &value).await.map(drop)
        }
        Command::Line { id, field, value } => session.edit_line(&id, field, &value).await.map(drop),
        Command::Regen(line_id) => session.generate_line(&line_id).await.map(drop),
        Command::Generate => session.generate_all().await.map(drop),
        Command::Preview => session.preview_existing(),
        Command::Download(path) => {
            let target = path.unwrap_or_else(|| PathBuf::from(&config.download_dir));
            session.download(&target).await.map(drop)
        }
        Command::Back => session.back(),
        Command::New => session.new_project().map(drop),
        Command::Load(Some(project_id)) => session.load_project(&project_id).await,
        Command::Load(None) => session.browse_projects().await.map(drop),
        Command::List => session
            .list_projects()
            .await
            .map(|listing| println!("{}", listing)),
        Command::Voices => {
            println!("{}", voice_listing(session.catalog(), None));
            Ok(())
        }
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
        Command::Quit => Ok(()),
    };

    if let Err(e) = outcome {
        log::debug!("Command failed: {}", e);
    }
    Ok(())
}
