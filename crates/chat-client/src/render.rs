use std::io::{self, Stdout, Write};
use std::time::Duration;

use colored::Colorize;
use shared::models::RetrievalResult;

use crate::cli::ChatMode;
use crate::reveal::reveal;
use crate::session::TranscriptEntry;

pub const MAX_LISTED_SOURCES: usize = 3;
pub const PREVIEW_CHARS: usize = 100;

const USER_LABEL: &str = "You";
const BOT_LABEL: &str = "Bot";

/// Terminal output for the chat client. Colors follow the global `colored`
/// override, so `--no-color` only has to flip that switch.
pub struct TerminalRenderer<W: Write> {
    out: W,
    reveal_delay: Duration,
}

impl TerminalRenderer<Stdout> {
    pub fn stdout(reveal_delay: Duration) -> Self {
        Self::new(io::stdout(), reveal_delay)
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, reveal_delay: Duration) -> Self {
        Self { out, reveal_delay }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self, gateway_url: &str, mode: ChatMode) -> io::Result<()> {
        writeln!(self.out, "{}", "RAG Chatbot".bold())?;
        writeln!(self.out, "Gateway: {gateway_url}")?;
        for candidate in ChatMode::ALL {
            let marker = if candidate == mode { "*" } else { " " };
            writeln!(
                self.out,
                " {marker} {:<8} {}: {}",
                candidate.as_str(),
                candidate.label().bold(),
                candidate.description()
            )?;
        }
        writeln!(self.out, "Type /help for commands, /quit to exit\n")
    }

    pub fn print_info(&mut self, info: &str) -> io::Result<()> {
        writeln!(self.out, "{}", info.dimmed())
    }

    pub fn print_error(&mut self, error: &str) -> io::Result<()> {
        writeln!(self.out, "{}", error.red())
    }

    pub fn render_transcript(&mut self, transcript: &[TranscriptEntry]) -> io::Result<()> {
        if transcript.is_empty() {
            return self.print_info("(no messages yet)");
        }

        for entry in transcript {
            match entry {
                TranscriptEntry::User(text) => {
                    writeln!(self.out, "{} {text}", format!("{USER_LABEL}:").green().bold())?;
                }
                _ => {
                    self.write_bot_label(entry)?;
                    writeln!(self.out, "{}", paint(entry, entry.text()))?;
                    self.write_sources(entry)?;
                }
            }
        }
        Ok(())
    }

    /// Prints a freshly received bot entry with the word-by-word reveal.
    pub async fn reveal_entry(&mut self, entry: &TranscriptEntry) -> io::Result<()> {
        self.write_bot_label(entry)?;
        match entry {
            TranscriptEntry::Assistant(text) | TranscriptEntry::Rag { answer: text, .. } => {
                reveal(&mut self.out, text, self.reveal_delay).await?;
                writeln!(self.out)?;
            }
            other => writeln!(self.out, "{}", paint(other, other.text()))?,
        }
        self.write_sources(entry)?;
        writeln!(self.out)
    }

    fn write_bot_label(&mut self, entry: &TranscriptEntry) -> io::Result<()> {
        let label = format!("{BOT_LABEL}:");
        let label = match entry {
            TranscriptEntry::Weather(_) => label.blue().bold(),
            TranscriptEntry::Failure { .. } => label.red().bold(),
            _ => label.bold(),
        };
        write!(self.out, "{label} ")
    }

    fn write_sources(&mut self, entry: &TranscriptEntry) -> io::Result<()> {
        let TranscriptEntry::Rag { sources, .. } = entry else {
            return Ok(());
        };
        if sources.is_empty() {
            return Ok(());
        }

        writeln!(self.out, "{}", "Sources:".cyan())?;
        for line in source_lines(sources) {
            writeln!(self.out, "  {}", line.dimmed())?;
        }
        Ok(())
    }
}

fn paint(entry: &TranscriptEntry, text: &str) -> colored::ColoredString {
    match entry {
        TranscriptEntry::Weather(_) => text.blue(),
        TranscriptEntry::Failure { .. } => text.red(),
        _ => text.normal(),
    }
}

/// One line per listed source: `{i}. Score: {score:.3} | {preview}`.
pub fn source_lines(sources: &[RetrievalResult]) -> Vec<String> {
    sources
        .iter()
        .take(MAX_LISTED_SOURCES)
        .enumerate()
        .map(|(index, source)| {
            format!(
                "{}. Score: {:.3} | {}",
                index + 1,
                source.score,
                content_preview(&source.content)
            )
        })
        .collect()
}

pub fn content_preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}
