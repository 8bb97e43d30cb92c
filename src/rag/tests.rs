use super::*;
use crate::database::ChunkRecord;
use crate::documents::DocumentChunk;
use crate::prompt::Role;
use crate::provider::testing::{KeywordEmbedder, RecordingChat, instant_invoker};
use tempfile::TempDir;

const FACTS: [(&str, &str, u32); 4] = [
    ("Paris is the capital of France", "data/europe.pdf", 0),
    ("Berlin is the capital of Germany", "data/europe.pdf", 1),
    ("Madrid is the capital of Spain", "data/spain.pdf", 0),
    ("Rust is a systems programming language", "data/rust.pdf", 4),
];

async fn write_index(path: &Path) {
    let records: Vec<ChunkRecord> = FACTS
        .iter()
        .enumerate()
        .map(|(chunk_index, (content, source, page))| {
            let chunk = DocumentChunk {
                content: (*content).to_string(),
                source: (*source).to_string(),
                page: *page,
                chunk_index,
            };
            ChunkRecord::new(&chunk, KeywordEmbedder::vector(content))
        })
        .collect();
    VectorIndex::create(path, &records)
        .await
        .expect("index builds");
}

fn create_test_answerer(index_dir: &Path, chat: Arc<RecordingChat>) -> RagAnswerer {
    let rag = RagConfig {
        index_dir: index_dir.to_path_buf(),
        ..RagConfig::default()
    };
    RagAnswerer::new(
        Arc::new(KeywordEmbedder::default()),
        chat,
        instant_invoker(),
        &rag,
    )
}

#[tokio::test]
async fn answer_puts_nearest_chunk_first_in_context() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let index_dir = temp_dir.path().join("faiss_index");
    write_index(&index_dir).await;
    let chat = Arc::new(RecordingChat::new("The capital of France is Paris."));
    let answerer = create_test_answerer(&index_dir, Arc::clone(&chat));

    let answer = answerer
        .answer("What is the capital of France?")
        .await
        .expect("answer succeeds");

    assert_eq!(answer.answer, "The capital of France is Paris.");
    assert_eq!(
        answer.sources.first(),
        Some(&SourceRef {
            source: "data/europe.pdf".to_string(),
            page: 0,
        })
    );

    let requests = chat.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert!(
        messages[0]
            .content
            .contains("Context:\nParis is the capital of France\n\n")
    );
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[1].content, "What is the capital of France?");
}

#[tokio::test]
async fn retrieve_returns_top_k() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let index_dir = temp_dir.path().join("faiss_index");
    write_index(&index_dir).await;
    let answerer = create_test_answerer(&index_dir, Arc::new(RecordingChat::new("ok")));

    let results = answerer
        .retrieve("capital of Spain")
        .await
        .expect("retrieval succeeds");

    assert_eq!(results.len(), answerer.top_k());
    assert_eq!(results[0].metadata.content, "Madrid is the capital of Spain");
}

#[tokio::test]
async fn blank_question_is_rejected_before_io() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let chat = Arc::new(RecordingChat::new("unused"));
    // The index does not exist, so reaching it would report IndexNotFound instead
    let answerer = create_test_answerer(&temp_dir.path().join("missing"), Arc::clone(&chat));

    for question in ["", "   ", "\n\t"] {
        let err = answerer.answer(question).await.expect_err("blank question");
        assert!(matches!(err, RagError::EmptyQuestion));
    }
    assert!(chat.requests().is_empty());
}

#[tokio::test]
async fn missing_index_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let index_dir = temp_dir.path().join("faiss_index");
    let chat = Arc::new(RecordingChat::new("unused"));
    let answerer = create_test_answerer(&index_dir, Arc::clone(&chat));

    let err = answerer
        .answer("What is the capital of France?")
        .await
        .expect_err("no index yet");

    assert!(matches!(err, RagError::IndexNotFound(ref p) if p == &index_dir));
    assert!(chat.requests().is_empty());
    assert!(!index_dir.exists());
}

fn search_result(content: &str, source: &str, page: u32, distance: f32) -> SearchResult {
    SearchResult {
        metadata: crate::database::ChunkMetadata {
            content: content.to_string(),
            source: source.to_string(),
            page,
            chunk_index: 0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        },
        distance,
    }
}

#[test]
fn context_joins_chunks_with_blank_line() {
    let results = vec![
        search_result("first", "a.pdf", 0, 0.1),
        search_result("second", "a.pdf", 0, 0.2),
        search_result("third", "b.pdf", 2, 0.3),
    ];

    assert_eq!(build_context(&results), "first\n\nsecond\n\nthird");
    assert_eq!(build_context(&[]), "");
}

#[test]
fn sources_are_deduplicated_in_order() {
    let results = vec![
        search_result("first", "b.pdf", 2, 0.1),
        search_result("second", "a.pdf", 0, 0.2),
        search_result("third", "b.pdf", 2, 0.3),
    ];

    let sources = collect_sources(&results);

    assert_eq!(
        sources,
        vec![
            SourceRef {
                source: "b.pdf".to_string(),
                page: 2,
            },
            SourceRef {
                source: "a.pdf".to_string(),
                page: 0,
            },
        ]
    );
}
