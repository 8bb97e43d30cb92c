use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::chat::Chatbot;
use crate::config::{BEARER_TOKEN_ENV, Config};
use crate::database::VectorIndex;
use crate::documents::find_pdfs;
use crate::indexer::DocumentIndexer;
use crate::invoker::ThrottledInvoker;
use crate::provider::{BedrockChat, BedrockClient, BedrockEmbeddings, ChatModel, EmbeddingModel};
use crate::rag::RagAnswerer;
use crate::ui::{
    ConsoleObserver, UiHandlers, error_message, index_summary, render_answer, run_chat_session,
    run_rag_session, spinner,
};

/// Hosted models and retry policy shared by every command
struct Components {
    config: Config,
    client: BedrockClient,
    invoker: ThrottledInvoker,
}

impl Components {
    fn load() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self> {
        let client = BedrockClient::new(&config).context("Failed to create Bedrock client")?;
        let invoker =
            ThrottledInvoker::from_config(&config.retry).with_observer(Arc::new(ConsoleObserver));
        Ok(Self {
            config,
            client,
            invoker,
        })
    }

    fn chat_model(&self, temperature: f32) -> Arc<dyn ChatModel> {
        Arc::new(BedrockChat::new(
            self.client.clone(),
            self.config.bedrock.chat_model.clone(),
            temperature,
        ))
    }

    fn embedder(&self) -> Arc<dyn EmbeddingModel> {
        Arc::new(BedrockEmbeddings::new(
            self.client.clone(),
            self.config.bedrock.embedding_model.clone(),
        ))
    }

    fn chatbot(&self) -> Chatbot {
        Chatbot::new(
            self.chat_model(self.config.chat.temperature),
            self.invoker.clone(),
            &self.config.chat,
        )
    }

    fn indexer(&self) -> DocumentIndexer {
        DocumentIndexer::new(self.embedder(), self.invoker.clone(), &self.config.rag)
    }

    fn answerer(&self) -> RagAnswerer {
        RagAnswerer::new(
            self.embedder(),
            self.chat_model(self.config.rag.temperature),
            self.invoker.clone(),
            &self.config.rag,
        )
    }
}

/// Interactive chat session
#[inline]
pub async fn run_chat() -> Result<()> {
    let components = Components::load()?;
    let handlers = UiHandlers::default().with_chatbot(components.chatbot());
    run_chat_session(&handlers).await
}

/// Interactive build-and-ask session over the PDF directory
#[inline]
pub async fn run_rag() -> Result<()> {
    let components = Components::load()?;
    let handlers = UiHandlers::default()
        .with_indexer(components.indexer())
        .with_answerer(components.answerer());
    run_rag_session(&handlers).await
}

/// Build the vector index once and report what went in
#[inline]
pub async fn build_index() -> Result<()> {
    let components = Components::load()?;
    let indexer = components.indexer();

    println!(
        "Indexing PDFs from {} into {}",
        indexer.data_dir().display(),
        indexer.index_dir().display()
    );

    match indexer.build_index().await {
        Ok(stats) => {
            println!("✅ {}", index_summary(&stats));
            Ok(())
        }
        Err(e) => {
            println!("❌ {}", error_message(&e));
            Err(e.into())
        }
    }
}

/// Answer one question from the existing index
#[inline]
pub async fn ask(question: &str) -> Result<()> {
    let components = Components::load()?;
    let answerer = components.answerer();

    let progress = spinner("Processing...");
    let result = answerer.answer(question).await;
    progress.finish_and_clear();

    match result {
        Ok(answer) => {
            info!("Answered with {} sources", answer.sources.len());
            println!("{}", render_answer(&answer));
            Ok(())
        }
        Err(e) => {
            println!("❌ {}", error_message(&e));
            Err(e.into())
        }
    }
}

#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 Bedrock RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Bedrock:");
    match config.endpoint_url() {
        Ok(url) => println!("   🌐 Endpoint: {}", url),
        Err(e) => println!("   ❌ Endpoint: Invalid - {}", e),
    }
    println!("   💬 Chat model: {}", config.bedrock.chat_model);
    println!("   🔢 Embedding model: {}", config.bedrock.embedding_model);
    if std::env::var_os(BEARER_TOKEN_ENV).is_some() {
        println!("   ✅ API key: {} is set", BEARER_TOKEN_ENV);
    } else {
        println!("   ⚠️  API key: {} is not set", BEARER_TOKEN_ENV);
    }
    println!(
        "   🔁 Retries: {} (base delay {:.1}s)",
        config.retry.max_retries, config.retry.base_delay_seconds
    );

    println!();
    println!("📄 Documents:");
    match find_pdfs(&config.rag.data_dir) {
        Ok(pdfs) if pdfs.is_empty() => {
            println!("   📭 No PDFs in {}", config.rag.data_dir.display());
        }
        Ok(pdfs) => {
            println!(
                "   ✅ {} PDFs in {}",
                pdfs.len(),
                config.rag.data_dir.display()
            );
        }
        Err(e) => println!("   ❌ {}", e),
    }

    println!();
    println!("🔍 Vector Index:");
    match VectorIndex::open(&config.rag.index_dir).await {
        Ok(index) => match index.count().await {
            Ok(count) => {
                println!("   ✅ {} chunks at {}", count, index.path().display());
                println!("   📐 Dimensions: {}", index.vector_dimension());
            }
            Err(e) => println!("   ⚠️  Opened but unreadable - {}", e),
        },
        Err(e) => println!("   ❌ {}", e),
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'bedrock-rag index' to build the vector index from your PDFs");
    println!("   • Use 'bedrock-rag ask \"<question>\"' to query it");
    println!("   • Use 'bedrock-rag chat' for the multilingual chatbot");

    Ok(())
}
