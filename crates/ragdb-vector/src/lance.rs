//! LanceDB-backed [`VectorStore`].
//!
//! One table per collection with columns `id`, `content`, `source`,
//! `metadata` (JSON) and `vector`. Writes go through `merge_insert` keyed
//! on `id`, so re-ingesting a chunk replaces it in place. Searches use
//! cosine distance and report `score = 1 - distance`.
use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use ragdb_core::config::StoreConfig;
use ragdb_core::traits::{ensure_dim, VectorStore};
use ragdb_core::types::{IndexedRecord, Metadata, SearchHit, SOURCE_KEY, UNKNOWN_SOURCE};
use ragdb_core::{Error, Result};

use crate::index::{build_ivfpq_index, compute_ivfpq_params, has_vector_index};
use crate::schema::{
    build_arrow_schema, vector_dim, CONTENT_COLUMN, DISTANCE_COLUMN, ID_COLUMN, METADATA_COLUMN, SOURCE_COLUMN,
};
use crate::sort_hits;
use crate::table::{ensure_table, open_db};

/// Extra rows fetched past `k` on the first attempt. The limit keeps doubling
/// while the fetch ends inside the tie group at the cut.
const TIE_SLACK: usize = 8;

pub struct LanceStore {
    _conn: Connection,
    table: Table,
    collection: String,
    dim: usize,
    index_min_rows: usize,
    // merge_insert is not atomic across concurrent writers
    write_lock: Mutex<()>,
    // serialises index builds
    index_lock: Mutex<()>,
}

fn unavailable(e: impl std::fmt::Display) -> Error {
    Error::StoreUnavailable(e.to_string())
}

impl LanceStore {
    /// Connect to `config.uri` and open (or create) the collection table.
    ///
    /// An existing table whose vector column has a different dimensionality
    /// is a [`Error::DimensionMismatch`]; the caller must not serve from it.
    pub async fn open(config: &StoreConfig, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("vector dimensionality must be positive".to_string()));
        }
        let conn = open_db(&config.uri).await.map_err(unavailable)?;
        let created = ensure_table(&conn, &config.collection, build_arrow_schema(dim))
            .await
            .map_err(unavailable)?;
        let table = conn.open_table(&config.collection).execute().await.map_err(unavailable)?;

        let schema = table.schema().await.map_err(unavailable)?;
        match vector_dim(&schema) {
            Some(actual) if actual == dim => {}
            Some(actual) => return Err(Error::DimensionMismatch { expected: dim, actual }),
            None => {
                return Err(Error::StoreUnavailable(format!(
                    "table '{}' has no fixed-size vector column",
                    config.collection
                )))
            }
        }
        info!(uri = %config.uri, collection = %config.collection, dim, created, "opened lance store");

        Ok(Self {
            _conn: conn,
            table,
            collection: config.collection.clone(),
            dim,
            index_min_rows: config.index_min_rows,
            write_lock: Mutex::new(()),
            index_lock: Mutex::new(()),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn records_to_batch(&self, records: &[IndexedRecord]) -> Result<RecordBatch> {
        let schema = build_arrow_schema(self.dim);
        let mut ids = Vec::with_capacity(records.len());
        let mut contents = Vec::with_capacity(records.len());
        let mut sources = Vec::with_capacity(records.len());
        let mut metadata = Vec::with_capacity(records.len());
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(records.len());
        for r in records {
            ids.push(r.id.clone());
            contents.push(r.content.clone());
            sources.push(r.metadata.get(SOURCE_KEY).cloned().unwrap_or_else(|| UNKNOWN_SOURCE.to_string()));
            metadata.push(serde_json::to_string(&r.metadata).map_err(|e| Error::InvalidInput(e.to_string()))?);
            vectors.push(Some(r.vector.iter().map(|&x| Some(x)).collect()));
        }
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(sources)),
                Arc::new(StringArray::from(metadata)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                    vectors.into_iter(),
                    self.dim as i32,
                )),
            ],
        )
        .map_err(unavailable)
    }
}

impl LanceStore {
    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let mut stream = self
            .table
            .vector_search(query.to_vec())
            .map_err(unavailable)?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(unavailable)?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(unavailable)? {
            batch_to_hits(&batch, &mut hits)?;
        }
        Ok(hits)
    }
}

/// Whether the last fetched hit scores the same as the k-th, i.e. rows
/// with that score may still be missing from the fetch.
fn tie_group_cut(sorted: &[SearchHit], k: usize) -> bool {
    match (sorted.get(k.saturating_sub(1)), sorted.last()) {
        (Some(kth), Some(last)) => last.score >= kth.score,
        _ => false,
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::StoreUnavailable(format!("result column '{name}' missing")))
}

fn batch_to_hits(batch: &RecordBatch, out: &mut Vec<SearchHit>) -> Result<()> {
    let ids = string_column(batch, ID_COLUMN)?;
    let contents = string_column(batch, CONTENT_COLUMN)?;
    let sources = string_column(batch, SOURCE_COLUMN)?;
    let metadata = string_column(batch, METADATA_COLUMN)?;
    let distances = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| Error::StoreUnavailable(format!("result column '{DISTANCE_COLUMN}' missing")))?;

    for i in 0..batch.num_rows() {
        let mut meta: Metadata = if metadata.is_null(i) {
            Metadata::new()
        } else {
            serde_json::from_str(metadata.value(i)).map_err(|e| Error::StoreUnavailable(format!("corrupt metadata: {e}")))?
        };
        meta.entry(SOURCE_KEY.to_string()).or_insert_with(|| sources.value(i).to_string());
        out.push(SearchHit {
            id: ids.value(i).to_string(),
            content: contents.value(i).to_string(),
            metadata: meta,
            score: 1.0 - distances.value(i),
        });
    }
    Ok(())
}

#[async_trait]
impl VectorStore for LanceStore {
    fn dim(&self) -> usize {
        self.dim
    }

    #[instrument(skip_all, fields(collection = %self.collection, records = records.len()))]
    async fn upsert(&self, records: Vec<IndexedRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        for r in &records {
            ensure_dim(self.dim, &r.vector)?;
        }
        // last write wins for duplicate ids within one batch
        let mut deduped: Vec<IndexedRecord> = Vec::with_capacity(records.len());
        let mut seen = std::collections::HashMap::new();
        for r in records {
            if let Some(&pos) = seen.get(&r.id) {
                deduped[pos] = r;
            } else {
                seen.insert(r.id.clone(), deduped.len());
                deduped.push(r);
            }
        }

        let batch = self.records_to_batch(&deduped)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let _guard = self.write_lock.lock().await;
        let mut mi = self.table.merge_insert(&[ID_COLUMN]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        let res = mi.execute(reader).await.map_err(unavailable)?;
        debug!(inserted = res.num_inserted_rows, updated = res.num_updated_rows, "upserted batch");
        Ok(())
    }

    #[instrument(skip_all, fields(collection = %self.collection, k = k))]
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        ensure_dim(self.dim, query)?;
        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }
        let mut limit = k + TIE_SLACK;
        let mut hits = loop {
            let mut hits = self.nearest(query, limit).await?;
            sort_hits(&mut hits);
            if hits.len() < limit || !tie_group_cut(&hits, k) {
                break hits;
            }
            limit = limit.saturating_mul(2);
        };
        hits.truncate(k);
        debug!(hits = hits.len(), "vector search");
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        self.table.count_rows(None).await.map_err(unavailable)
    }

    /// Build an IVF_PQ index once the table is large enough to benefit.
    /// Small tables are searched exhaustively.
    async fn refresh_index(&self) -> Result<bool> {
        let _guard = self.index_lock.lock().await;
        let rows = self.count().await?;
        if rows < self.index_min_rows {
            debug!(rows, min = self.index_min_rows, "below index threshold; flat search");
            return Ok(false);
        }
        if has_vector_index(&self.table).await.map_err(unavailable)? {
            return Ok(false);
        }
        let params = compute_ivfpq_params(rows, self.dim);
        info!(rows, nlist = params.nlist, m = params.m, "building IVF_PQ index");
        let name = format!("{}_vector_ivfpq", self.collection);
        build_ivfpq_index(&self.table, &name, &params).await.map_err(unavailable)?;
        Ok(true)
    }
}
