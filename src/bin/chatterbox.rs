//! Interactive multi-session chat client.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a service on localhost:8000
//! chatterbox
//!
//! # Talk to another service
//! chatterbox --base-url http://chat.example.com/api/
//!
//! # Disable colors (useful for piping output)
//! chatterbox --no-color
//! ```
//!
//! # Commands
//!
//! - `/new` - Start a new chat
//! - `/switch <n>` - Switch chats, cancelling any reply in progress
//! - `/list` - List chats
//! - `/show` - Reprint the current chat
//! - `/cancel` - Stop the reply in progress
//! - `/quit` - Exit the application
//!
//! Ctrl+C while a reply is streaming cancels it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use chatterbox::commands::{ChatCommand, help_text, parse_command};
use chatterbox::render::{PlainTextRenderer, Renderer, RenderingObserver};
use chatterbox::{ChatArgs, ChatClient, ChatConfig, Conversation, SendOutcome};

type SharedRenderer = Arc<Mutex<PlainTextRenderer>>;

fn lock(renderer: &SharedRenderer) -> MutexGuard<'_, PlainTextRenderer> {
    renderer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn show_active(conversation: &Conversation, renderer: &SharedRenderer) {
    let Some(session) = conversation.active() else {
        return;
    };
    let mut renderer = lock(renderer);
    renderer.print_info(&format!("[{}] {}", session.id(), session.name()));
    for turn in session.transcript() {
        renderer.print_turn(turn);
    }
}

async fn send(conversation: &Conversation, renderer: &SharedRenderer, line: &str) {
    let outcome = conversation.submit(line).await;
    let mut renderer = lock(renderer);
    match outcome {
        SendOutcome::Completed => renderer.finish_reply(),
        SendOutcome::Cancelled => {
            renderer.finish_reply();
            renderer.print_info("(cancelled)");
        }
        SendOutcome::FallbackCompleted | SendOutcome::FallbackFailed => {
            // The observer closed off the partial text; print the settled reply below it.
            renderer.finish_reply();
            if let Some(turn) = conversation.active().and_then(|s| s.last_turn().cloned()) {
                renderer.print_turn(&turn);
            }
        }
        SendOutcome::Busy => renderer.print_error("A reply is still in progress."),
        SendOutcome::Ignored => {}
    }
}

/// Main entry point for the chatterbox application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("chatterbox [OPTIONS]");
    let config = ChatConfig::from(args);

    let client = ChatClient::from_config(&config)?;
    let renderer: SharedRenderer = Arc::new(Mutex::new(PlainTextRenderer::with_color(
        config.use_color,
    )));
    let observer = RenderingObserver::new(Arc::clone(&renderer), config.verbose);
    let conversation = Conversation::new(Arc::new(client), config).with_observer(Arc::new(observer));
    let mut rl = DefaultEditor::new()?;

    // Ctrl+C during a reply cancels it.
    let interrupt = conversation.clone();
    ctrlc::set_handler(move || {
        interrupt.cancel_active();
    })?;

    println!("chatterbox");
    println!("Type /help for commands, /quit to exit\n");
    show_active(&conversation, &renderer);

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::New => {
                            conversation.new_session();
                            show_active(&conversation, &renderer);
                        }
                        ChatCommand::Switch(id) => {
                            if conversation.select_session(id) {
                                show_active(&conversation, &renderer);
                            } else {
                                lock(&renderer).print_error(&format!("No chat numbered {id}."));
                            }
                        }
                        ChatCommand::List => {
                            let sessions = conversation.sessions();
                            lock(&renderer).print_sessions(&sessions, conversation.active_id());
                        }
                        ChatCommand::Show => show_active(&conversation, &renderer),
                        ChatCommand::Cancel => {
                            if conversation.cancel_active().is_none() {
                                lock(&renderer).print_info("Nothing to cancel.");
                            }
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Invalid(msg) => lock(&renderer).print_error(&msg),
                    }
                    continue;
                }

                println!();
                send(&conversation, &renderer, line).await;
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                lock(&renderer).print_error(&format!("Error: {:?}", err));
                break;
            }
        }
    }

    conversation.shutdown();
    Ok(())
}
