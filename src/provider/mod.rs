// Hosted model capabilities
// The flows only see these traits; Bedrock is one implementation behind them

pub mod bedrock;
#[cfg(test)]
pub(crate) mod testing;

use crate::prompt::Message;
use crate::{RagError, Result};

pub use bedrock::{BedrockChat, BedrockClient, BedrockEmbeddings};

/// A hosted chat model that turns a message list into a text reply
pub trait ChatModel: Send + Sync {
    fn model_id(&self) -> &str;

    /// Send the messages and return the reply text.
    ///
    /// Throttling must be reported as [`RagError::ProviderRateLimited`] so the
    /// invoker can tell it apart from failures that should not be retried.
    fn chat(&self, messages: &[Message]) -> Result<String>;
}

/// A hosted embedding model
pub trait EmbeddingModel: Send + Sync {
    fn model_id(&self) -> &str;

    /// One vector per input text, in input order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .pop()
            .ok_or_else(|| RagError::Provider("Embedding model returned no vector".to_string()))
    }
}
