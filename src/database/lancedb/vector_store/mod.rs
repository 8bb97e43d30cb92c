
use super::{ChunkMetadata, ChunkRecord};
use crate::{RagError, Result};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TABLE_NAME: &str = "chunks";

/// On-disk vector index over document chunks
///
/// An index directory is only ever replaced as a whole: [`VectorIndex::create`]
/// writes into a staging directory next to the target and swaps it in once the
/// table is complete, so a failed build leaves the previous index readable.
pub struct VectorIndex {
    connection: Connection,
    path: PathBuf,
    vector_dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub metadata: ChunkMetadata,
    /// L2 distance to the query, smaller is closer
    pub distance: f32,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("path", &self.path)
            .field("vector_dimension", &self.vector_dimension)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Build a new index at `path` from `records`, replacing any index already there
    ///
    /// # Arguments
    /// * `path` - Index directory
    /// * `records` - Embedded chunks, all with the same vector dimension
    ///
    /// # Returns
    /// * `Result<Self>` - The freshly written index, opened for search
    #[inline]
    pub async fn create(path: &Path, records: &[ChunkRecord]) -> Result<Self> {
        let first = records.first().ok_or_else(|| {
            RagError::Database("Cannot build an index without any chunks".to_string())
        })?;
        let vector_dim = first.vector.len();
        if vector_dim == 0 {
            return Err(RagError::Database("Embeddings are empty".to_string()));
        }
        if let Some(record) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(RagError::Database(format!(
                "Embedding for chunk {} has {} dimensions, expected {}",
                record.metadata.chunk_index,
                record.vector.len(),
                vector_dim
            )));
        }

        let target = std::path::absolute(path)?;
        let staging = sibling_path(&target, "staging")?;
        if staging.exists() {
            warn!("Removing leftover staging directory {:?}", staging);
            fs::remove_dir_all(&staging)?;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(
            "Writing {} chunks ({} dimensions) to {:?}",
            records.len(),
            vector_dim,
            staging
        );
        if let Err(e) = write_table(&staging, records, vector_dim).await {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!("Failed to remove staging directory {:?}: {}", staging, cleanup);
            }
            return Err(e);
        }

        swap_into_place(&staging, &target)?;
        info!("Vector index written to {:?}", target);

        Self::open(&target).await
    }

    /// Open an existing index
    ///
    /// Never creates anything on disk. Fails with [`RagError::IndexNotFound`]
    /// when the directory or its table is missing.
    #[inline]
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(RagError::IndexNotFound(path.to_path_buf()));
        }

        let connection = connect(path).await?;
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;
        if !table_names.iter().any(|name| name == TABLE_NAME) {
            return Err(RagError::IndexNotFound(path.to_path_buf()));
        }

        let vector_dimension = detect_vector_dimension(&connection).await?;
        debug!(
            "Opened vector index at {:?} with {} dimensions",
            path, vector_dimension
        );

        Ok(Self {
            connection,
            path: path.to_path_buf(),
            vector_dimension,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    /// Return up to `limit` chunks closest to `query_vector`, nearest first
    ///
    /// # Arguments
    /// * `query_vector` - Embedded query, same dimension as the index
    /// * `limit` - Maximum number of results to return
    ///
    /// # Returns
    /// * `Result<Vec<SearchResult>>` - Search results ordered by ascending distance
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        if query_vector.len() != self.vector_dimension {
            return Err(RagError::Database(format!(
                "Query has {} dimensions but the index has {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self.open_table().await?;
        let mut results = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?
        {
            search_results.extend(parse_search_batch(&batch)?);
        }

        search_results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        search_results.truncate(limit);

        debug!("Found {} search results", search_results.len());
        Ok(search_results)
    }

    /// Get the total number of chunks stored
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        let table = self.open_table().await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))
    }
}

async fn connect(path: &Path) -> Result<Connection> {
    let absolute = std::path::absolute(path)?;
    let uri = format!("file://{}", absolute.display());
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {}", e)))
}

/// Create the table in a fresh database directory
async fn write_table(dir: &Path, records: &[ChunkRecord], vector_dim: usize) -> Result<()> {
    let connection = connect(dir).await?;
    let schema = create_schema(vector_dim)?;
    let record_batch = create_record_batch(Arc::clone(&schema), records, vector_dim)?;

    connection
        .create_empty_table(TABLE_NAME, schema)
        .execute()
        .await
        .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?;

    let table = connection
        .open_table(TABLE_NAME)
        .execute()
        .await
        .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))?;

    let batch_schema = record_batch.schema();
    let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), batch_schema);
    table
        .add(reader)
        .execute()
        .await
        .map_err(|e| RagError::Database(format!("Failed to insert embeddings: {}", e)))?;

    Ok(())
}

/// Replace `target` with `staging`, restoring the old directory if the swap fails
fn swap_into_place(staging: &Path, target: &Path) -> Result<()> {
    let previous = sibling_path(target, "previous")?;
    if previous.exists() {
        fs::remove_dir_all(&previous)?;
    }

    let had_previous = target.exists();
    if had_previous {
        fs::rename(target, &previous)?;
    }

    if let Err(e) = fs::rename(staging, target) {
        if had_previous {
            if let Err(restore) = fs::rename(&previous, target) {
                warn!("Failed to restore previous index {:?}: {}", previous, restore);
            }
        }
        return Err(e.into());
    }

    if had_previous {
        if let Err(e) = fs::remove_dir_all(&previous) {
            warn!("Failed to remove previous index {:?}: {}", previous, e);
        }
    }

    Ok(())
}

/// `<dir>/<name>.<suffix>` next to the index directory
fn sibling_path(target: &Path, suffix: &str) -> Result<PathBuf> {
    let name = target.file_name().ok_or_else(|| {
        RagError::Config(format!("Index path {:?} has no directory name", target))
    })?;
    let mut sibling = name.to_os_string();
    sibling.push(".");
    sibling.push(suffix);
    Ok(target.with_file_name(sibling))
}

async fn detect_vector_dimension(connection: &Connection) -> Result<usize> {
    let table = connection
        .open_table(TABLE_NAME)
        .execute()
        .await
        .map_err(|e| RagError::Database(format!("Failed to open existing table: {}", e)))?;

    let schema = table
        .schema()
        .await
        .map_err(|e| RagError::Database(format!("Failed to get table schema: {}", e)))?;

    for field in schema.fields() {
        if field.name() == "vector" {
            if let DataType::FixedSizeList(_, size) = field.data_type() {
                return usize::try_from(*size)
                    .map_err(|e| RagError::Database(format!("Invalid vector size: {}", e)));
            }
        }
    }

    Err(RagError::Database(
        "Could not find vector column or determine dimension".to_string(),
    ))
}

/// Create schema with the specified vector dimension
fn create_schema(vector_dim: usize) -> Result<Arc<Schema>> {
    let list_size = i32::try_from(vector_dim)
        .map_err(|e| RagError::Database(format!("Vector dimension too large: {}", e)))?;

    Ok(Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                list_size,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::UInt32, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("created_at", DataType::Utf8, false),
    ])))
}

/// Create a RecordBatch from chunk records
fn create_record_batch(
    schema: Arc<Schema>,
    records: &[ChunkRecord],
    vector_dim: usize,
) -> Result<RecordBatch> {
    let len = records.len();
    let list_size = i32::try_from(vector_dim)
        .map_err(|e| RagError::Database(format!("Vector dimension too large: {}", e)))?;

    let mut ids = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * vector_dim);
    let mut contents = Vec::with_capacity(len);
    let mut sources = Vec::with_capacity(len);
    let mut pages = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);

    for record in records {
        ids.push(record.id.as_str());
        flat_values.extend_from_slice(&record.vector);
        contents.push(record.metadata.content.as_str());
        sources.push(record.metadata.source.as_str());
        pages.push(record.metadata.page);
        chunk_indices.push(record.metadata.chunk_index);
        created_ats.push(record.metadata.created_at.as_str());
    }

    // Create vector array using FixedSizeListArray
    let values_array = Float32Array::from(flat_values);
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array = FixedSizeListArray::try_new(field, list_size, Arc::new(values_array), None)
        .map_err(|e| RagError::Database(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(sources)),
        Arc::new(UInt32Array::from(pages)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
}

fn typed_column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

/// Parse a single record batch from search results
fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let contents = typed_column::<StringArray>(batch, "content")?;
    let sources = typed_column::<StringArray>(batch, "source")?;
    let pages = typed_column::<UInt32Array>(batch, "page")?;
    let chunk_indices = typed_column::<UInt32Array>(batch, "chunk_index")?;
    let created_ats = typed_column::<StringArray>(batch, "created_at")?;
    let distances = typed_column::<Float32Array>(batch, "_distance")?;

    let results = (0..batch.num_rows())
        .map(|row| SearchResult {
            metadata: ChunkMetadata {
                content: contents.value(row).to_string(),
                source: sources.value(row).to_string(),
                page: pages.value(row),
                chunk_index: chunk_indices.value(row),
                created_at: created_ats.value(row).to_string(),
            },
            distance: if distances.is_null(row) {
                f32::MAX
            } else {
                distances.value(row)
            },
        })
        .collect();

    Ok(results)
}
