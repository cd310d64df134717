use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::api::AppState;
use crate::api::public::chat::MAX_SOURCES_SHOWN;
use crate::chat::{Message, Role};
use crate::core::{AppConfig, db::async_db};
use crate::render::{format_text, to_ansi};

const HELP: &str = "Commands: /register <email> <password>, /login <email> <password>, /logout, /history, /quit";

fn print_message(msg: &Message) {
    let who = match msg.role {
        Role::User => "You",
        Role::Assistant => "Tutor",
    };
    println!("{}: {}", who, to_ansi(&format_text(&msg.text)));
    for (idx, source) in msg.sources.iter().take(MAX_SOURCES_SHOWN).enumerate() {
        let label = source
            .title
            .clone()
            .unwrap_or_else(|| format!("Source {}", idx + 1));
        println!("  [{}] {}", label, source.uri);
    }
}

fn credentials(args: &str) -> Option<(&str, &str)> {
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(email), Some(password), None) => Some((email, password)),
        _ => None,
    }
}

pub async fn run() -> Result<()> {
    let config = AppConfig::default();
    let db = async_db(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.db_path))?;
    let state = AppState::new(db, config);
    let controller = state.controller.clone();

    let mut rl = DefaultEditor::new().context("Failed to start line editor")?;
    println!("Gemini Study Tutor. Ask about any academic topic.");
    println!("{}", HELP);

    loop {
        let prompt = match controller.session().current_user {
            Some(user) => format!("{}>>> ", user.email.unwrap_or_else(|| "User".to_string())),
            None => "guest>>> ".to_string(),
        };
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };
        let _ = rl.add_history_entry(line.as_str());

        let (command, args) = line.trim().split_once(' ').unwrap_or((line.trim(), ""));
        match command {
            "/quit" => break,
            "/logout" => controller.logout().await,
            "/history" => {
                let messages = controller.messages();
                if messages.is_empty() {
                    println!("Ask your Gemini Tutor about academic topics.");
                }
                messages.iter().for_each(print_message);
            }
            "/login" | "/register" => {
                let Some((email, password)) = credentials(args) else {
                    println!("Usage: {} <email> <password>", command);
                    continue;
                };
                let result = if command == "/login" {
                    state.identity.sign_in(email, password).await
                } else {
                    state.identity.sign_up(email, password).await
                };
                match result {
                    Ok(user) => println!(
                        "Logged in as {}",
                        user.email.unwrap_or_else(|| "User".to_string())
                    ),
                    Err(e) if command == "/login" => {
                        tracing::debug!("Sign in rejected: {}", e);
                        println!("Invalid email or password");
                    }
                    Err(e) => {
                        tracing::debug!("Registration rejected: {}", e);
                        println!("Registration failed. Try a different email.");
                    }
                }
            }
            _ if command.starts_with('/') => println!("{}", HELP),
            _ => {
                if controller.session().current_user.is_none() {
                    println!("(Guest Mode, chat history won't be saved)");
                }
                println!("Tutor is thinking...");
                if let Some(reply) = controller.submit(&line).await {
                    print_message(&reply);
                }
                if controller.persistence_failed() {
                    println!("(Some messages could not be saved to your history)");
                }
            }
        }
    }

    controller.teardown();
    Ok(())
}
