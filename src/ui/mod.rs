//! Terminal front end for the chat and retrieval demos.
//!
//! User interaction is modelled as explicit [`UiAction`]s handled by
//! [`UiHandlers`]; the interactive loops in [`session`] only collect input,
//! dispatch an action and render its [`UiOutcome`]. A failed action is shown
//! inline and never ends the session.

pub mod session;

use std::fmt::Write as _;
use std::time::Duration;

use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};

use crate::chat::Chatbot;
use crate::indexer::{DocumentIndexer, IndexingStats};
use crate::invoker::{ThrottleNotice, ThrottleObserver};
use crate::rag::{RagAnswer, RagAnswerer};
use crate::{RagError, Result};

pub use session::{run_chat_session, run_rag_session};

/// Something the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    SubmitChat { language: String, text: String },
    BuildIndex,
    GetAnswer { question: String },
}

/// Result of a handled [`UiAction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiOutcome {
    Reply(String),
    /// Blank chat input, nothing was sent
    NoInput,
    IndexBuilt(IndexingStats),
    Answer(RagAnswer),
}

/// Dispatches actions to whichever flows this session was built with
#[derive(Debug, Default)]
pub struct UiHandlers {
    chatbot: Option<Chatbot>,
    indexer: Option<DocumentIndexer>,
    answerer: Option<RagAnswerer>,
}

impl UiHandlers {
    #[inline]
    pub fn with_chatbot(mut self, chatbot: Chatbot) -> Self {
        self.chatbot = Some(chatbot);
        self
    }

    #[inline]
    pub fn with_indexer(mut self, indexer: DocumentIndexer) -> Self {
        self.indexer = Some(indexer);
        self
    }

    #[inline]
    pub fn with_answerer(mut self, answerer: RagAnswerer) -> Self {
        self.answerer = Some(answerer);
        self
    }

    #[inline]
    pub fn chatbot(&self) -> Option<&Chatbot> {
        self.chatbot.as_ref()
    }

    #[inline]
    pub async fn handle(&self, action: UiAction) -> Result<UiOutcome> {
        match action {
            UiAction::SubmitChat { language, text } => {
                let chatbot = self.chatbot.as_ref().ok_or_else(|| unavailable("Chat"))?;
                Ok(chatbot
                    .respond(&language, &text)?
                    .map_or(UiOutcome::NoInput, UiOutcome::Reply))
            }
            UiAction::BuildIndex => {
                let indexer = self.indexer.as_ref().ok_or_else(|| unavailable("Indexing"))?;
                Ok(UiOutcome::IndexBuilt(indexer.build_index().await?))
            }
            UiAction::GetAnswer { question } => {
                let answerer = self
                    .answerer
                    .as_ref()
                    .ok_or_else(|| unavailable("Question answering"))?;
                Ok(UiOutcome::Answer(answerer.answer(&question).await?))
            }
        }
    }
}

fn unavailable(feature: &str) -> RagError {
    RagError::Config(format!("{} is not available in this session", feature))
}

/// Message shown inline when an action fails
#[inline]
pub fn error_message(err: &RagError) -> String {
    match err {
        RagError::EmptyQuestion => "Please enter a question first!".to_string(),
        RagError::RetriesExhausted { .. } => {
            "Maximum retries exceeded due to Bedrock throttling. Please try again later.".to_string()
        }
        RagError::NoDocumentsFound(dir) => format!(
            "No PDF documents found in {}. Add some PDFs and build the index again.",
            dir.display()
        ),
        RagError::IndexNotFound(_) => {
            "No vector index found. Build/Update the vector index first.".to_string()
        }
        other => format!("Error: {}", other),
    }
}

#[inline]
pub fn index_summary(stats: &IndexingStats) -> String {
    format!(
        "Vector index is ready: {} chunks from {} pages in {} documents",
        stats.chunks, stats.pages, stats.documents
    )
}

/// Render a RAG answer followed by the pages it drew on
#[inline]
pub fn render_answer(answer: &RagAnswer) -> String {
    let mut rendered = answer.answer.trim_end().to_string();
    if !answer.sources.is_empty() {
        rendered.push_str("\n\nSources:");
        for source in &answer.sources {
            let _ = write!(rendered, "\n  - {} (page {})", source.source, source.page + 1);
        }
    }
    rendered
}

/// Spinner shown while a hosted call is in flight, hidden when stderr is not a terminal
#[inline]
pub fn spinner(message: &str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Prints the throttling warning to the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver;

impl ThrottleObserver for ConsoleObserver {
    #[inline]
    fn on_throttle(&self, notice: &ThrottleNotice) {
        let line = format!(
            "⚠ {} (attempt {}/{})",
            notice.message(),
            notice.attempt + 1,
            notice.max_retries
        );
        let _ = Term::stderr().write_line(&style(line).yellow().to_string());
    }
}
