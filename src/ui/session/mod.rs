use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use tracing::error;

use super::{
    UiAction, UiHandlers, UiOutcome, error_message, index_summary, render_answer, spinner,
};

const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];
const LANGUAGE_COMMAND: &str = "/language";

const MENU_BUILD: usize = 0;
const MENU_ASK: usize = 1;
const MENU_ITEMS: [&str; 3] = ["Build/Update vector index", "Ask a question", "Quit"];

/// Interactive multilingual chat until the user quits
#[inline]
pub async fn run_chat_session(handlers: &UiHandlers) -> Result<()> {
    let languages = handlers
        .chatbot()
        .map(|chatbot| chatbot.languages().to_vec())
        .context("Chat session needs a chatbot")?;
    let max_chars = handlers
        .chatbot()
        .map_or(0, |chatbot| chatbot.max_input_chars());

    eprintln!("{}", style("🤖 Bedrock Chatbot").bold().cyan());
    eprintln!(
        "Type a message (up to {} characters). {} switches language, {} leaves.",
        max_chars, LANGUAGE_COMMAND, QUIT_COMMANDS[0]
    );
    eprintln!();

    let mut language = select_language(&languages)?;

    loop {
        let text: String = Input::new()
            .with_prompt(format!("You ({})", language))
            .allow_empty(true)
            .interact_text()
            .context("Failed to read chat input")?;

        let command = text.trim();
        if QUIT_COMMANDS.contains(&command) {
            break;
        }
        if command == LANGUAGE_COMMAND {
            language = select_language(&languages)?;
            continue;
        }

        let progress = spinner("Thinking...");
        let result = handlers
            .handle(UiAction::SubmitChat {
                language: language.clone(),
                text,
            })
            .await;
        progress.finish_and_clear();

        match result {
            Ok(UiOutcome::Reply(reply)) => {
                println!("{}", reply.trim_end());
                println!();
            }
            Ok(_) => {}
            Err(e) => {
                error!("Chat request failed: {}", e);
                eprintln!("{}", style(error_message(&e)).red());
            }
        }
    }

    Ok(())
}

fn select_language(languages: &[String]) -> Result<String> {
    let selection = Select::new()
        .with_prompt("Choose a language")
        .items(languages)
        .default(0)
        .interact()
        .context("Failed to read language selection")?;

    languages
        .get(selection)
        .cloned()
        .context("Language selection out of range")
}

/// Interactive menu for building the index and asking questions
#[inline]
pub async fn run_rag_session(handlers: &UiHandlers) -> Result<()> {
    eprintln!("{}", style("📚 Bedrock PDF Q&A").bold().cyan());
    eprintln!();

    loop {
        let choice = Select::new()
            .with_prompt("What would you like to do?")
            .items(&MENU_ITEMS)
            .default(MENU_ASK)
            .interact()
            .context("Failed to read menu selection")?;

        let action = match choice {
            MENU_BUILD => UiAction::BuildIndex,
            MENU_ASK => {
                let question: String = Input::new()
                    .with_prompt("Ask a question from the PDF files")
                    .allow_empty(true)
                    .interact_text()
                    .context("Failed to read question")?;
                UiAction::GetAnswer { question }
            }
            _ => break,
        };

        let progress = spinner(match action {
            UiAction::BuildIndex => "Building vector index...",
            _ => "Processing...",
        });
        let result = handlers.handle(action).await;
        progress.finish_and_clear();

        match result {
            Ok(UiOutcome::IndexBuilt(stats)) => {
                eprintln!("{}", style(format!("✓ {}", index_summary(&stats))).green());
            }
            Ok(UiOutcome::Answer(answer)) => {
                println!("{}", render_answer(&answer));
            }
            Ok(_) => {}
            Err(e) => {
                error!("Action failed: {}", e);
                eprintln!("{}", style(error_message(&e)).red());
            }
        }
        eprintln!();
    }

    Ok(())
}
