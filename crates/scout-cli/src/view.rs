//! Stateless terminal rendering for the chat.
//!
//! Everything here takes session data and writes styled text to stdout;
//! no view state survives between calls.

use async_trait::async_trait;
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::terminal::size;
use crossterm::ExecutableCommand;

use scout_core::{AgentProgressEvent, AgentProgressHandler, Message, Role};

/// Print a section header with a horizontal rule.
pub fn print_section_header(title: &str) -> std::io::Result<()> {
    use std::io::Write;

    let width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let title_len = title.len() + 2;
    let remaining = width.saturating_sub(title_len).saturating_sub(1);
    let left_len = remaining / 2;
    let right_len = remaining - left_len;

    let left_rule = "─".repeat(left_len);
    let right_rule = "─".repeat(right_len);

    let mut stdout = std::io::stdout();
    stdout.execute(SetForegroundColor(Color::DarkGrey))?;
    print!("{} ", left_rule);
    stdout.execute(SetForegroundColor(Color::Cyan))?;
    print!("{}", title);
    stdout.execute(SetForegroundColor(Color::DarkGrey))?;
    println!(" {}", right_rule);
    stdout.execute(ResetColor)?;
    stdout.flush()?;
    Ok(())
}

/// Print one transcript message: role header, content, and its sources
/// panel when any were cited.
pub fn print_message(message: &Message) -> std::io::Result<()> {
    use std::io::Write;

    let mut stdout = std::io::stdout();
    match message.role {
        Role::Assistant => {
            stdout.execute(SetForegroundColor(Color::Green))?;
            println!("assistant:");
        }
        Role::User => {
            stdout.execute(SetForegroundColor(Color::Blue))?;
            println!("you:");
        }
        _ => {}
    }
    stdout.execute(ResetColor)?;
    println!("{}", message.content);

    if !message.sources.is_empty() {
        println!();
        print_section_header("Sources & References")?;
        for source in &message.sources {
            stdout.execute(SetForegroundColor(Color::DarkGrey))?;
            print!("  • ");
            stdout.execute(ResetColor)?;
            match &source.url {
                Some(url) => println!("{} — {}", source.title, url),
                None => println!("{}", source.title),
            }
        }
    }
    println!();
    stdout.flush()?;
    Ok(())
}

/// Print a status line.
pub fn print_status(msg: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut stdout = std::io::stdout();
    stdout.execute(SetForegroundColor(Color::Cyan))?;
    println!("{}", msg);
    stdout.execute(ResetColor)?;
    stdout.flush()?;
    Ok(())
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    stderr.execute(SetForegroundColor(Color::Red))?;
    eprintln!("Error: {}", msg);
    stderr.execute(ResetColor)?;
    stderr.flush()?;
    Ok(())
}

/// Print the hint line shown above the prompt.
pub fn print_prompt_hint() -> std::io::Result<()> {
    use std::io::Write;

    let mut stdout = std::io::stdout();
    stdout.execute(SetForegroundColor(Color::DarkGrey))?;
    println!("/help · /ai /wiki /web · /clear · /quit or Ctrl+D");
    stdout.execute(ResetColor)?;
    stdout.flush()?;
    Ok(())
}

/// Progress handler that surfaces agent activity while a run is in flight.
pub struct ConsoleProgress;

impl ConsoleProgress {
    fn print_tool_call(name: &str, is_error: bool) -> std::io::Result<()> {
        use std::io::Write;

        let mut stdout = std::io::stdout();
        stdout.execute(SetForegroundColor(Color::DarkGrey))?;
        print!("▶ ");
        if is_error {
            stdout.execute(SetForegroundColor(Color::Red))?;
        } else {
            stdout.execute(SetForegroundColor(Color::Yellow))?;
        }
        println!("{}", name);
        stdout.execute(ResetColor)?;
        stdout.flush()?;
        Ok(())
    }

    fn print_thinking(content: &str) -> std::io::Result<()> {
        use std::io::Write;

        let mut stdout = std::io::stdout();
        stdout.execute(SetForegroundColor(Color::DarkGrey))?;
        print!("{}", content);
        stdout.execute(ResetColor)?;
        stdout.flush()?;
        Ok(())
    }
}

#[async_trait]
impl AgentProgressHandler for ConsoleProgress {
    async fn on_progress(&self, event: AgentProgressEvent) {
        let result = match event {
            AgentProgressEvent::ToolStart { tool_name } => {
                Self::print_tool_call(&tool_name, false)
            }
            AgentProgressEvent::ToolComplete {
                tool_name,
                is_error,
            } => {
                if is_error {
                    Self::print_tool_call(&format!("{} (error)", tool_name), true)
                } else {
                    Ok(())
                }
            }
            AgentProgressEvent::ThinkingDelta { content } => Self::print_thinking(&content),
            AgentProgressEvent::IterationStart { .. }
            | AgentProgressEvent::UsageUpdate { .. } => Ok(()),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "Failed to render progress event");
        }
    }
}
