use super::*;
use crate::documents::loader::tests::write_pdf;
use crate::provider::testing::{FailingEmbedder, KeywordEmbedder, instant_invoker};
use tempfile::TempDir;

fn rag_config(root: &Path) -> RagConfig {
    RagConfig {
        data_dir: root.join("data"),
        index_dir: root.join("faiss_index"),
        ..RagConfig::default()
    }
}

fn create_test_indexer(
    root: &Path,
    embedder: Arc<dyn EmbeddingModel>,
) -> DocumentIndexer {
    DocumentIndexer::new(embedder, instant_invoker(), &rag_config(root)).with_progress(false)
}

fn write_capitals(data_dir: &Path) {
    std::fs::create_dir_all(data_dir).expect("create data dir");
    write_pdf(
        &data_dir.join("europe.pdf"),
        &[
            "Paris is the capital of France",
            "Berlin is the capital of Germany",
        ],
    );
    write_pdf(&data_dir.join("spain.pdf"), &["Madrid is the capital of Spain"]);
}

#[tokio::test]
async fn build_index_reports_stats_and_persists() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_capitals(&temp_dir.path().join("data"));
    let embedder = Arc::new(KeywordEmbedder::default());
    let indexer = create_test_indexer(temp_dir.path(), Arc::clone(&embedder) as Arc<dyn EmbeddingModel>);

    let stats = indexer.build_index().await.expect("index builds");

    assert_eq!(
        stats,
        IndexingStats {
            documents: 2,
            pages: 3,
            chunks: 3,
        }
    );
    assert_eq!(embedder.calls(), 3);

    let index = VectorIndex::open(indexer.index_dir())
        .await
        .expect("index exists");
    assert_eq!(index.count().await.expect("count rows"), 3);

    let results = index
        .search(&KeywordEmbedder::vector("capital of Germany"), 1)
        .await
        .expect("search works");
    assert!(results[0].metadata.content.contains("Berlin"));
    assert!(results[0].metadata.source.ends_with("europe.pdf"));
    assert_eq!(results[0].metadata.page, 1);
}

#[tokio::test]
async fn throttled_embeddings_are_retried() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_capitals(&temp_dir.path().join("data"));
    let embedder = Arc::new(KeywordEmbedder::throttling(2));
    let indexer = create_test_indexer(temp_dir.path(), Arc::clone(&embedder) as Arc<dyn EmbeddingModel>);

    let stats = indexer.build_index().await.expect("index builds");

    assert_eq!(stats.chunks, 3);
    assert_eq!(embedder.calls(), 5);
}

#[tokio::test]
async fn empty_data_dir_keeps_previous_index() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let data_dir = temp_dir.path().join("data");
    write_capitals(&data_dir);
    let indexer = create_test_indexer(temp_dir.path(), Arc::new(KeywordEmbedder::default()));
    indexer.build_index().await.expect("first build");

    std::fs::remove_dir_all(&data_dir).expect("clear data dir");
    std::fs::create_dir(&data_dir).expect("recreate data dir");

    let err = indexer.build_index().await.expect_err("nothing to index");
    assert!(matches!(err, RagError::NoDocumentsFound(_)));

    let index = VectorIndex::open(indexer.index_dir())
        .await
        .expect("previous index still opens");
    assert_eq!(index.count().await.expect("count rows"), 3);
}

#[tokio::test]
async fn embedding_failure_writes_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_capitals(&temp_dir.path().join("data"));
    let indexer = create_test_indexer(temp_dir.path(), Arc::new(FailingEmbedder));

    let err = indexer.build_index().await.expect_err("embedding fails");

    assert!(matches!(err, RagError::Provider(_)));
    assert!(!indexer.index_dir().exists());
}

#[tokio::test]
async fn missing_data_dir_has_no_documents() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let indexer = create_test_indexer(temp_dir.path(), Arc::new(KeywordEmbedder::default()));

    let err = indexer.build_index().await.expect_err("no data dir");

    assert!(matches!(err, RagError::NoDocumentsFound(ref p) if p == indexer.data_dir()));
    assert!(!indexer.index_dir().exists());
}

#[test]
fn indexer_uses_configured_chunking() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut rag = rag_config(temp_dir.path());
    rag.chunk_size = 200;
    rag.chunk_overlap = 20;

    let indexer = DocumentIndexer::new(Arc::new(FailingEmbedder), instant_invoker(), &rag);

    assert_eq!(indexer.splitter, SplitterConfig::new(200, 20));
    assert_eq!(indexer.data_dir(), temp_dir.path().join("data"));
}
