//! Terminal chat client for the knowledge base RAG gateway.
//!
//! ```bash
//! chat-client --gateway-url http://localhost:8000 --mode rag
//! ```

use std::sync::Arc;

use chat_client::cli::{CliError, CliOptions, usage_text};
use chat_client::commands::{ChatCommand, help_text, parse_command};
use chat_client::gateway::GatewayClient;
use chat_client::render::TerminalRenderer;
use chat_client::session::{ChatSession, SessionSettings};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let options = match CliOptions::parse(
        std::env::args().skip(1),
        std::env::var("CHAT_GATEWAY_URL").ok(),
    ) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            println!("{}", usage_text());
            return;
        }
        Err(err) => {
            eprintln!("{err}\n\n{}", usage_text());
            std::process::exit(2);
        }
    };

    if !options.use_color {
        colored::control::set_override(false);
    }

    let gateway = match GatewayClient::new(&options.gateway_url) {
        Ok(gateway) => gateway,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("failed to initialize line editor: {err}");
            std::process::exit(1);
        }
    };

    let mut session = ChatSession::new(Arc::new(gateway), SessionSettings::from(&options));
    let mut renderer = TerminalRenderer::stdout(options.reveal_delay);

    if let Err(err) = run(&mut editor, &mut session, &mut renderer, &options.gateway_url).await {
        error!("terminal output failed: {err}");
        std::process::exit(1);
    }
}

async fn run(
    editor: &mut DefaultEditor,
    session: &mut ChatSession,
    renderer: &mut TerminalRenderer<std::io::Stdout>,
    gateway_url: &str,
) -> std::io::Result<()> {
    renderer.banner(gateway_url, session.mode())?;

    loop {
        let prompt = format!("[{}] You: ", session.mode().as_str());
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                renderer.print_error(&format!("input error: {err}"))?;
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        let Some(command) = parse_command(line) else {
            let reply = session.submit(line).await;
            renderer.reveal_entry(&reply).await?;
            continue;
        };

        match command {
            ChatCommand::Quit => break,
            ChatCommand::Clear => {
                session.clear();
                renderer.print_info("Conversation cleared.")?;
            }
            ChatCommand::History => renderer.render_transcript(session.transcript())?,
            ChatCommand::Help => {
                for line in help_text().lines() {
                    renderer.print_info(line)?;
                }
            }
            ChatCommand::Mode(mode) => {
                session.set_mode(mode);
                renderer.print_info(&format!("Mode set to {}", mode.label()))?;
            }
            ChatCommand::Temperature(value) => {
                session.set_temperature(value);
                renderer.print_info(&format!("temperature set to {value:.2}"))?;
            }
            ChatCommand::MaxTokens(value) => {
                session.set_max_tokens(value);
                renderer.print_info(&format!("max tokens set to {value}"))?;
            }
            ChatCommand::Invalid(message) => renderer.print_error(&message)?,
        }
    }

    println!("Goodbye!");
    Ok(())
}

// Silent unless RUST_LOG is set, so log lines never interleave with the chat.
fn init_tracing() {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
