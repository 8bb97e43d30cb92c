// Chat module
// Single-turn multilingual chat against the hosted model


use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ChatConfig;
use crate::invoker::ThrottledInvoker;
use crate::prompt::PromptTemplate;
use crate::provider::ChatModel;
use crate::{RagError, Result};

/// Answers one message at a time in the language the user picked
pub struct Chatbot {
    chat: Arc<dyn ChatModel>,
    invoker: ThrottledInvoker,
    prompt: PromptTemplate,
    languages: Vec<String>,
    max_input_chars: usize,
}

impl std::fmt::Debug for Chatbot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chatbot")
            .field("chat", &self.chat.model_id())
            .field("languages", &self.languages)
            .field("max_input_chars", &self.max_input_chars)
            .finish_non_exhaustive()
    }
}

impl Chatbot {
    #[inline]
    pub fn new(chat: Arc<dyn ChatModel>, invoker: ThrottledInvoker, config: &ChatConfig) -> Self {
        Self {
            chat,
            invoker,
            prompt: PromptTemplate::chat(),
            languages: config.languages.clone(),
            max_input_chars: config.max_input_chars,
        }
    }

    /// Languages offered in the selector
    #[inline]
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    #[inline]
    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    /// Reply to `user_text` in `language`
    ///
    /// Returns `Ok(None)` without calling the model when the input is blank.
    #[inline]
    pub fn respond(&self, language: &str, user_text: &str) -> Result<Option<String>> {
        if user_text.trim().is_empty() {
            debug!("Ignoring empty chat input");
            return Ok(None);
        }

        let length = user_text.chars().count();
        if length > self.max_input_chars {
            return Err(RagError::InputTooLong {
                actual: length,
                limit: self.max_input_chars,
            });
        }

        let messages = self
            .prompt
            .format_messages(&[("language", language), ("user_text", user_text)])?;
        let reply = self.invoker.invoke(self.chat.as_ref(), &messages)?;

        info!("Chat reply in {} ({} chars)", language, reply.len());
        Ok(Some(reply))
    }
}
