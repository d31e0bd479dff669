//! Interactive chat loop: rustyline input, slash commands, session events.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{Config as ReadlineConfig, Editor};

use scout_core::AgentProgressHandler;

use crate::session::{QuickAction, ResearchSession, SessionEvent};
use crate::view;

/// Parsed user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(SessionEvent),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// Map one input line to a command. Lines not starting with `/` are
/// questions; slash commands have short aliases.
pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }
    if !trimmed.starts_with('/') {
        return Command::Event(SessionEvent::Submit(trimmed.to_string()));
    }

    match trimmed {
        "/help" | "/h" | "/?" => Command::Help,
        "/quit" | "/exit" | "/q" => Command::Quit,
        "/clear" | "/c" => Command::Event(SessionEvent::Clear),
        "/ai" => Command::Event(SessionEvent::QuickAction(QuickAction::ArxivPapers)),
        "/wiki" => Command::Event(SessionEvent::QuickAction(QuickAction::WikipediaNews)),
        "/web" => Command::Event(SessionEvent::QuickAction(QuickAction::WebTrends)),
        other => Command::Unknown(other.to_string()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /ai     Latest AI research papers from arXiv");
    println!("  /wiki   Current technology events from Wikipedia");
    println!("  /web    Recent machine learning developments from the web");
    println!("  /clear  Reset the conversation");
    println!("  /quit   Exit");
    println!();
    println!("Anything else is sent to the research assistant as a question.");
}

/// Run the chat loop until the user quits.
pub async fn run(
    mut session: ResearchSession,
    progress: Option<Arc<dyn AgentProgressHandler>>,
) -> Result<()> {
    let readline_config = ReadlineConfig::builder()
        .history_ignore_space(true)
        .history_ignore_dups(true)?
        .build();
    let mut editor: Editor<(), FileHistory> = Editor::with_config(readline_config)?;

    let history_path = get_history_path();
    if let Some(ref path) = history_path {
        let _ = editor.load_history(path);
    }

    // Greeting seeded by the session.
    view::print_message(session.latest())?;

    loop {
        let _ = view::print_prompt_hint();

        let line = match editor.readline("you> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(&line);
                line
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => return Err(anyhow::anyhow!("Error reading input: {}", e)),
        };

        match parse_command(&line) {
            Command::Empty => continue,
            Command::Help => print_help(),
            Command::Quit => {
                println!("Goodbye!");
                break;
            }
            Command::Unknown(cmd) => {
                let _ = view::print_error(&format!("Unknown command: {}", cmd));
            }
            Command::Event(event) => {
                let is_clear = event == SessionEvent::Clear;
                if !is_clear {
                    let _ = view::print_status("Searching for information...");
                }
                session.handle(event, progress.clone()).await;
                if !is_clear {
                    view::print_section_header("Response")?;
                }
                view::print_message(session.latest())?;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = editor.save_history(path);
    }
    Ok(())
}

fn get_history_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("scout").join("chat_history"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_free_text() {
        assert_eq!(
            parse_command("  what is rust?  "),
            Command::Event(SessionEvent::Submit("what is rust?".to_string()))
        );
    }

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(parse_command("/help"), Command::Help);
        assert_eq!(parse_command("/q"), Command::Quit);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(parse_command("/clear"), Command::Event(SessionEvent::Clear));
        assert_eq!(
            parse_command("/ai"),
            Command::Event(SessionEvent::QuickAction(QuickAction::ArxivPapers))
        );
        assert_eq!(
            parse_command("/wiki"),
            Command::Event(SessionEvent::QuickAction(QuickAction::WikipediaNews))
        );
        assert_eq!(
            parse_command("/web"),
            Command::Event(SessionEvent::QuickAction(QuickAction::WebTrends))
        );
    }

    #[test]
    fn test_parse_empty_and_unknown() {
        assert_eq!(parse_command("   "), Command::Empty);
        assert_eq!(
            parse_command("/frobnicate"),
            Command::Unknown("/frobnicate".to_string())
        );
    }
}
