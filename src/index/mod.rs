//! LanceDB-backed vector index holding every indexed chunk.


use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, Table};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::{QaError, Result};

/// Name of the table all chunks are stored in
pub const TABLE_NAME: &str = "documents";

/// Identifier of the `index`th chunk of `source`
#[inline]
pub fn record_id(source: &str, index: usize) -> String {
    format!("{}_chunk_{}", source, index)
}

/// A chunk together with its embedding, as persisted in the index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub source: String,
    pub chunk_index: u32,
    pub content: String,
    pub indexed_at: DateTime<Utc>,
}

impl IndexedRecord {
    #[inline]
    pub fn new(source: &str, chunk_index: usize, content: String, vector: Vec<f32>) -> Self {
        Self {
            id: record_id(source, chunk_index),
            vector,
            source: source.to_string(),
            chunk_index: u32::try_from(chunk_index).unwrap_or(u32::MAX),
            content,
            indexed_at: Utc::now(),
        }
    }
}

/// A record returned from a similarity search, closest first
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: IndexedRecord,
    /// L2 distance to the query vector
    pub distance: f32,
}

pub struct VectorIndex {
    connection: Connection,
    vector_dimension: usize,
}

impl VectorIndex {
    /// Open (or create) the `documents` table under the configured data directory
    #[inline]
    pub async fn open(config: &Config) -> Result<Self> {
        let db_path = config.vector_database_path();
        debug!("Opening vector index at {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| {
            QaError::IndexUnavailable(format!(
                "Failed to create vector database directory: {}",
                e
            ))
        })?;

        let uri = db_path.to_string_lossy().to_string();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| unavailable("Failed to connect to LanceDB", e))?;

        let configured = config.cohere.embedding_dimension as usize;
        let mut index = Self {
            connection,
            vector_dimension: configured,
        };

        if index.table_exists().await? {
            let existing = index.detect_vector_dimension().await?;
            if existing != configured {
                warn!(
                    "Existing index uses {} dimensions, configuration says {}",
                    existing, configured
                );
            }
            index.vector_dimension = existing;
        } else {
            index.create_table(configured).await?;
        }

        info!(
            "Vector index ready ({} dimensions)",
            index.vector_dimension
        );
        Ok(index)
    }

    #[inline]
    pub const fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    /// Insert records, overwriting any existing record with the same id
    #[inline]
    pub async fn upsert(&mut self, records: &[IndexedRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No records to upsert");
            return Ok(());
        }

        self.ensure_dimension(records).await?;
        self.merge(records, None).await?;

        info!("Upserted {} records", records.len());
        Ok(())
    }

    /// Up to `k` records closest to `query`, best first. An empty index yields no hits.
    #[inline]
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let table = self.table().await?;
        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| unavailable("Failed to count rows", e))?;
        if rows == 0 {
            debug!("Search on empty index");
            return Ok(Vec::new());
        }

        let mut stream = table
            .vector_search(query)
            .map_err(|e| unavailable("Failed to create vector search", e))?
            .column("vector")
            .limit(k)
            .execute()
            .await
            .map_err(|e| unavailable("Failed to execute search", e))?;

        let mut hits = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| unavailable("Failed to read result stream", e))?
        {
            let distances = batch
                .column_by_name("_distance")
                .and_then(|col| col.as_any().downcast_ref::<Float32Array>().cloned());

            for (row, record) in parse_records(&batch)?.into_iter().enumerate() {
                let distance = distances
                    .as_ref()
                    .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });
                hits.push(SearchHit { record, distance });
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        debug!("Search returned {} hits", hits.len());
        Ok(hits)
    }

    /// Remove every record that came from `source`
    #[inline]
    pub async fn delete_source(&self, source: &str) -> Result<()> {
        debug!("Deleting records for {}", source);

        let table = self.table().await?;
        table
            .delete(&format!("source = {}", quote(source)))
            .await
            .map_err(|e| unavailable("Failed to delete records", e))?;

        Ok(())
    }

    /// Make `records` the only records of `source`, in a single commit
    #[inline]
    pub async fn replace_source(&mut self, source: &str, records: &[IndexedRecord]) -> Result<()> {
        if let Some(record) = records.iter().find(|r| r.source != source) {
            return Err(QaError::IndexUnavailable(format!(
                "Record {} does not belong to {}",
                record.id, source
            )));
        }

        if records.is_empty() {
            return self.delete_source(source).await;
        }

        self.ensure_dimension(records).await?;
        self.merge(records, Some(source)).await?;

        info!("Replaced {} with {} records", source, records.len());
        Ok(())
    }

    #[inline]
    pub async fn count(&self) -> Result<usize> {
        let table = self.table().await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| unavailable("Failed to count rows", e))
    }

    /// Distinct source filenames, sorted
    #[inline]
    pub async fn sources(&self) -> Result<Vec<String>> {
        let table = self.table().await?;
        let mut stream = table
            .query()
            .select(Select::columns(&["source"]))
            .execute()
            .await
            .map_err(|e| unavailable("Failed to query sources", e))?;

        let mut sources = BTreeSet::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| unavailable("Failed to read sources", e))?
        {
            let column = string_column(&batch, "source")?;
            for row in 0..batch.num_rows() {
                sources.insert(column.value(row).to_string());
            }
        }

        Ok(sources.into_iter().collect())
    }

    /// Insert-or-overwrite by id. With `replace`, rows of that source that
    /// are not in `records` are deleted in the same commit.
    async fn merge(&self, records: &[IndexedRecord], replace: Option<&str>) -> Result<()> {
        let table = self.table().await?;
        let batch = self.create_record_batch(records)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        if let Some(source) = replace {
            merge.when_not_matched_by_source_delete(Some(format!("source = {}", quote(source))));
        }

        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| unavailable("Failed to merge records", e))?;
        Ok(())
    }

    async fn table(&self) -> Result<Table> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| unavailable("Failed to open table", e))
    }

    async fn table_exists(&self) -> Result<bool> {
        let names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| unavailable("Failed to list tables", e))?;
        Ok(names.iter().any(|name| name == TABLE_NAME))
    }

    async fn create_table(&self, vector_dimension: usize) -> Result<()> {
        info!(
            "Creating {} table with {} dimensions",
            TABLE_NAME, vector_dimension
        );
        self.connection
            .create_empty_table(TABLE_NAME, create_schema(vector_dimension))
            .execute()
            .await
            .map_err(|e| unavailable("Failed to create table", e))?;
        Ok(())
    }

    async fn detect_vector_dimension(&self) -> Result<usize> {
        let schema = self
            .table()
            .await?
            .schema()
            .await
            .map_err(|e| unavailable("Failed to read table schema", e))?;

        match schema.field_with_name("vector").map(|f| f.data_type().clone()) {
            Ok(DataType::FixedSizeList(_, size)) => usize::try_from(size).map_err(|_| {
                QaError::IndexUnavailable(format!("Invalid vector dimension {}", size))
            }),
            _ => Err(QaError::IndexUnavailable(
                "Could not find vector column or determine dimension".to_string(),
            )),
        }
    }

    /// The table is only rebuilt for a new dimension while it holds no data
    async fn ensure_dimension(&mut self, records: &[IndexedRecord]) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let dimension = first.vector.len();

        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            return Err(QaError::IndexUnavailable(format!(
                "Record {} has {} dimensions, expected {}",
                bad.id,
                bad.vector.len(),
                dimension
            )));
        }

        if dimension == self.vector_dimension {
            return Ok(());
        }

        if self.count().await? > 0 {
            return Err(QaError::IndexUnavailable(format!(
                "Index holds {}-dimensional vectors, got {}",
                self.vector_dimension, dimension
            )));
        }

        info!(
            "Recreating empty {} table for {} dimensions",
            TABLE_NAME, dimension
        );
        self.connection
            .drop_table(TABLE_NAME)
            .await
            .map_err(|e| unavailable("Failed to drop table", e))?;
        self.create_table(dimension).await?;
        self.vector_dimension = dimension;
        Ok(())
    }

    fn create_record_batch(&self, records: &[IndexedRecord]) -> Result<RecordBatch> {
        let dimension = self.vector_dimension;

        let mut flat_values = Vec::with_capacity(records.len() * dimension);
        for record in records {
            flat_values.extend_from_slice(&record.vector);
        }

        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            dimension_i32(dimension)?,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| unavailable("Failed to create vector array", e))?;

        let timestamps: Vec<String> = records.iter().map(|r| r.indexed_at.to_rfc3339()).collect();

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.id))),
            Arc::new(vector_array),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| &r.source),
            )),
            Arc::new(UInt32Array::from_iter_values(
                records.iter().map(|r| r.chunk_index),
            )),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| &r.content),
            )),
            Arc::new(StringArray::from_iter_values(timestamps)),
        ];

        RecordBatch::try_new(create_schema(dimension), arrays)
            .map_err(|e| unavailable("Failed to create record batch", e))
    }
}

fn create_schema(vector_dimension: usize) -> Arc<Schema> {
    let size = i32::try_from(vector_dimension).unwrap_or(i32::MAX);
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                size,
            ),
            false,
        ),
        Field::new("source", DataType::Utf8, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("indexed_at", DataType::Utf8, false),
    ]))
}

fn parse_records(batch: &RecordBatch) -> Result<Vec<IndexedRecord>> {
    let ids = string_column(batch, "id")?;
    let sources = string_column(batch, "source")?;
    let contents = string_column(batch, "content")?;
    let indexed_ats = string_column(batch, "indexed_at")?;
    let chunk_indices = batch
        .column_by_name("chunk_index")
        .and_then(|col| col.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| QaError::IndexUnavailable("Invalid chunk_index column".to_string()))?;
    let vectors = batch
        .column_by_name("vector")
        .and_then(|col| col.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| QaError::IndexUnavailable("Invalid vector column".to_string()))?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let values = vectors.value(row);
        let vector = values
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|v| v.values().to_vec())
            .unwrap_or_default();

        let indexed_at = DateTime::parse_from_rfc3339(indexed_ats.value(row))
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| unavailable("Invalid indexed_at value", e))?;

        records.push(IndexedRecord {
            id: ids.value(row).to_string(),
            vector,
            source: sources.value(row).to_string(),
            chunk_index: chunk_indices.value(row),
            content: contents.value(row).to_string(),
            indexed_at,
        });
    }

    Ok(records)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| QaError::IndexUnavailable(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| QaError::IndexUnavailable(format!("Invalid {} column type", name)))
}

fn dimension_i32(dimension: usize) -> Result<i32> {
    i32::try_from(dimension)
        .map_err(|_| QaError::IndexUnavailable(format!("Vector dimension {} too large", dimension)))
}

/// SQL string literal with embedded quotes doubled
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn unavailable(context: &str, error: impl std::fmt::Display) -> QaError {
    QaError::IndexUnavailable(format!("{}: {}", context, error))
}
