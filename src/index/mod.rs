//! Document indexer: embedding-backed similarity search over catalogued
//! documents.
//!
//! Documents live in a single SQLite file (one row per document, embedding
//! stored as a little-endian f32 blob) and are ranked by cosine similarity
//! at query time. An indexer instance is bound to one named collection.

mod embedder;

pub use embedder::{EmbeddingCache, OpenAiEmbedder};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::task;

use crate::error::{DocascodeError, Result};
use crate::transform::DocumentFormat;

/// Document metadata for cataloguing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub format: DocumentFormat,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub word_count: Option<usize>,
    #[serde(default = "default_language")]
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_language() -> String {
    "en".to_string()
}

impl DocumentMetadata {
    pub fn new(title: impl Into<String>, format: DocumentFormat) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            format,
            author: None,
            tags: Vec::new(),
            description: None,
            source_path: None,
            word_count: None,
            language: default_language(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored document with content and metadata.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// A search hit with relevance score and snippets.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub document_id: String,
    pub title: String,
    pub snippet: String,
    pub score: f32,
    pub highlights: Vec<String>,
    pub metadata: DocumentMetadata,
}

/// Database connection wrapper for the index file
struct IndexDb {
    path: PathBuf,
}

impl IndexDb {
    fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Execute a closure with a database connection in a blocking task
    async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path).map_err(DocascodeError::Database)?;
            // WAL for better concurrency, NORMAL sync for speed
            conn.execute_batch(
                "PRAGMA journal_mode = WAL; \
                 PRAGMA synchronous = NORMAL; \
                 PRAGMA foreign_keys = ON;",
            )?;
            f(&mut conn)
        })
        .await
        .map_err(|_e| DocascodeError::Database(rusqlite::Error::InvalidParameterCount(0, 0)))?
    }
}

/// Index and search documents using vector embeddings and metadata.
pub struct DocumentIndexer {
    db: IndexDb,
    embedder: Arc<OpenAiEmbedder>,
    collection: String,
}

impl DocumentIndexer {
    /// Open (and initialize if needed) the index at `db_path`, bound to the
    /// given collection.
    pub async fn open(
        db_path: impl AsRef<Path>,
        embedder: Arc<OpenAiEmbedder>,
        collection: impl Into<String>,
    ) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let indexer = Self {
            db: IndexDb::new(db_path),
            embedder,
            collection: collection.into(),
        };
        indexer
            .db
            .with_connection(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS documents (
                        doc_id      TEXT NOT NULL,
                        collection  TEXT NOT NULL DEFAULT 'documents',
                        title       TEXT NOT NULL,
                        format      TEXT NOT NULL,
                        author      TEXT,
                        language    TEXT NOT NULL DEFAULT 'en',
                        tags        TEXT NOT NULL DEFAULT '',
                        description TEXT,
                        source_path TEXT,
                        word_count  INTEGER,
                        created_at  TEXT NOT NULL,
                        updated_at  TEXT NOT NULL,
                        content     TEXT NOT NULL,
                        embedding   BLOB,
                        PRIMARY KEY (doc_id, collection)
                    );
                    CREATE INDEX IF NOT EXISTS idx_documents_collection
                        ON documents(collection);",
                )?;
                Ok(())
            })
            .await?;
        log::info!("Initialized collection: {}", indexer.collection);
        Ok(indexer)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Derive a stable document id from content and key metadata.
    pub fn generate_document_id(content: &str, metadata: &DocumentMetadata) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hasher.update(b":");
        hasher.update(metadata.title.as_bytes());
        hasher.update(b":");
        hasher.update(metadata.created_at.to_rfc3339().as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("doc-{}", &hex[..12])
    }

    /// Embed and store a document. Returns the document id.
    pub async fn add_document(&self, content: &str, metadata: DocumentMetadata) -> Result<String> {
        log::debug!("Generating embedding for document: {}", metadata.title);
        let embedding = self.embedder.embed(content, 3).await?;
        self.insert_with_embedding(content, metadata, embedding).await
    }

    pub(crate) async fn insert_with_embedding(
        &self,
        content: &str,
        metadata: DocumentMetadata,
        embedding: Vec<f32>,
    ) -> Result<String> {
        let doc_id = Self::generate_document_id(content, &metadata);
        let row = DocumentRow::new(&doc_id, &self.collection, content, &metadata, &embedding);
        self.db
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO documents \
                     (doc_id, collection, title, format, author, language, tags, description, \
                      source_path, word_count, created_at, updated_at, content, embedding) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    params![
                        row.doc_id,
                        row.collection,
                        row.title,
                        row.format,
                        row.author,
                        row.language,
                        row.tags,
                        row.description,
                        row.source_path,
                        row.word_count,
                        row.created_at,
                        row.updated_at,
                        row.content,
                        row.embedding,
                    ],
                )?;
                Ok(())
            })
            .await?;
        log::info!("Added document: {} ({})", doc_id, metadata.title);
        Ok(doc_id)
    }

    /// Re-embed and replace an existing document's content and metadata.
    pub async fn update_document(
        &self,
        doc_id: &str,
        content: &str,
        mut metadata: DocumentMetadata,
    ) -> Result<()> {
        metadata.updated_at = Utc::now();
        let embedding = self.embedder.embed(content, 3).await?;
        self.update_with_embedding(doc_id, content, metadata, embedding)
            .await
    }

    pub(crate) async fn update_with_embedding(
        &self,
        doc_id: &str,
        content: &str,
        metadata: DocumentMetadata,
        embedding: Vec<f32>,
    ) -> Result<()> {
        let row = DocumentRow::new(doc_id, &self.collection, content, &metadata, &embedding);
        let doc_id = doc_id.to_string();
        let updated = self
            .db
            .with_connection(move |conn| {
                let changed = conn.execute(
                    "UPDATE documents SET title = ?2, format = ?3, author = ?4, language = ?5, \
                     tags = ?6, description = ?7, source_path = ?8, word_count = ?9, \
                     created_at = ?10, updated_at = ?11, content = ?12, embedding = ?13 \
                     WHERE doc_id = ?1 AND collection = ?14",
                    params![
                        row.doc_id,
                        row.title,
                        row.format,
                        row.author,
                        row.language,
                        row.tags,
                        row.description,
                        row.source_path,
                        row.word_count,
                        row.created_at,
                        row.updated_at,
                        row.content,
                        row.embedding,
                        row.collection,
                    ],
                )?;
                Ok(changed)
            })
            .await?;
        if updated == 0 {
            return Err(DocascodeError::DocumentNotFound(doc_id));
        }
        log::info!("Updated document: {}", doc_id);
        Ok(())
    }

    /// Delete a document. No-op when absent.
    pub async fn delete_document(&self, doc_id: &str) -> Result<()> {
        let doc_id = doc_id.to_string();
        let collection = self.collection.clone();
        let logged = doc_id.clone();
        self.db
            .with_connection(move |conn| {
                conn.execute(
                    "DELETE FROM documents WHERE doc_id = ?1 AND collection = ?2",
                    params![doc_id, collection],
                )?;
                Ok(())
            })
            .await?;
        log::info!("Deleted document: {}", logged);
        Ok(())
    }

    /// Retrieve a document by id.
    pub async fn get_document(&self, doc_id: &str) -> Result<Option<IndexedDocument>> {
        let doc_id = doc_id.to_string();
        let collection = self.collection.clone();
        self.db
            .with_connection(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT doc_id, title, format, author, language, tags, description, \
                         source_path, word_count, created_at, updated_at, content \
                         FROM documents WHERE doc_id = ?1 AND collection = ?2",
                        params![doc_id, collection],
                        map_document_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
    }

    /// Search the collection by semantic similarity.
    pub async fn search(
        &self,
        query: &str,
        filters: &serde_json::Map<String, Value>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let query_vec = self.embedder.embed(query, 3).await?;
        self.search_with_embedding(query, query_vec, filters, limit, min_score)
            .await
    }

    pub(crate) async fn search_with_embedding(
        &self,
        query: &str,
        query_vec: Vec<f32>,
        filters: &serde_json::Map<String, Value>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let collection = self.collection.clone();

        // Exact-match metadata filters supported in SQL; tags filter matches
        // any single tag by substring.
        let mut sql = String::from(
            "SELECT doc_id, title, format, author, language, tags, description, \
             source_path, word_count, created_at, updated_at, content, embedding \
             FROM documents WHERE collection = ?1 AND embedding IS NOT NULL",
        );
        let mut args: Vec<String> = vec![collection];
        for key in ["title", "author", "format", "language"] {
            if let Some(value) = filters.get(key).and_then(Value::as_str) {
                sql.push_str(&format!(" AND {} = ?{}", key, args.len() + 1));
                args.push(value.to_string());
            }
        }
        if let Some(tag) = filters.get("tags").and_then(first_tag) {
            sql.push_str(&format!(" AND tags LIKE ?{}", args.len() + 1));
            args.push(format!("%{}%", tag));
        }

        let candidates: Vec<(IndexedDocument, Vec<f32>)> = self
            .db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), |row| {
                    let doc = map_document_row(row)?;
                    let blob: Vec<u8> = row.get(12)?;
                    Ok((doc, blob_to_embedding(&blob)))
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await?;

        let mut scored: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|(doc, embedding)| {
                let score = cosine_similarity(&query_vec, &embedding);
                if score < min_score {
                    return None;
                }
                let highlights = extract_snippets(&doc.content, query, 200);
                let snippet = highlights
                    .first()
                    .cloned()
                    .unwrap_or_else(|| truncate_chars(&doc.content, 200));
                Some(SearchResult {
                    document_id: doc.id,
                    title: doc.metadata.title.clone(),
                    snippet,
                    score,
                    highlights,
                    metadata: doc.metadata,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        log::info!("Search for '{}' returned {} results", query, scored.len());
        Ok(scored)
    }

    /// Indexer statistics.
    pub async fn statistics(&self) -> Result<Value> {
        let collection = self.collection.clone();
        let count: i64 = self
            .db
            .with_connection(move |conn| {
                let count = conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                    params![collection],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(json!({
            "collection_name": self.collection,
            "total_documents": count,
            "embedding_model": self.embedder.model(),
            "embedding_dimension": self.embedder.dimensions(),
        }))
    }

    /// Remove every document in this collection.
    pub async fn clear(&self) -> Result<()> {
        let collection = self.collection.clone();
        self.db
            .with_connection(move |conn| {
                conn.execute("DELETE FROM documents WHERE collection = ?1", params![collection])?;
                Ok(())
            })
            .await?;
        log::warn!("Cleared collection: {}", self.collection);
        Ok(())
    }
}

/// Flattened row values ready for binding.
struct DocumentRow {
    doc_id: String,
    collection: String,
    title: String,
    format: String,
    author: Option<String>,
    language: String,
    tags: String,
    description: Option<String>,
    source_path: Option<String>,
    word_count: Option<i64>,
    created_at: String,
    updated_at: String,
    content: String,
    embedding: Vec<u8>,
}

impl DocumentRow {
    fn new(
        doc_id: &str,
        collection: &str,
        content: &str,
        metadata: &DocumentMetadata,
        embedding: &[f32],
    ) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            collection: collection.to_string(),
            title: metadata.title.clone(),
            format: metadata.format.as_str().to_string(),
            author: metadata.author.clone(),
            language: metadata.language.clone(),
            tags: metadata.tags.join(","),
            description: metadata.description.clone(),
            source_path: metadata.source_path.clone(),
            word_count: metadata.word_count.map(|w| w as i64),
            created_at: metadata.created_at.to_rfc3339(),
            updated_at: metadata.updated_at.to_rfc3339(),
            content: content.to_string(),
            embedding: embedding_to_blob(embedding),
        }
    }
}

fn map_document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexedDocument> {
    let format_str: String = row.get(2)?;
    let tags: String = row.get::<_, String>(5)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(IndexedDocument {
        id: row.get(0)?,
        content: row.get(11)?,
        metadata: DocumentMetadata {
            title: row.get(1)?,
            format: DocumentFormat::parse(&format_str).unwrap_or(DocumentFormat::Text),
            author: row.get(3)?,
            language: row.get(4)?,
            tags: if tags.is_empty() {
                Vec::new()
            } else {
                tags.split(',').map(str::to_string).collect()
            },
            description: row.get(6)?,
            source_path: row.get(7)?,
            word_count: row.get::<_, Option<i64>>(8)?.map(|w| w as usize),
            created_at: created_at
                .parse()
                .unwrap_or_else(|_| Utc::now()),
            updated_at: updated_at
                .parse()
                .unwrap_or_else(|_| Utc::now()),
        },
    })
}

fn first_tag(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors; zero for mismatched or zero-norm
/// inputs.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Sentences containing any query term, trimmed to `max_length` chars,
/// top three.
fn extract_snippets(content: &str, query: &str, max_length: usize) -> Vec<String> {
    let query_terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let mut snippets = Vec::new();

    for sentence in content.split(". ") {
        let lower = sentence.to_lowercase();
        if query_terms.iter().any(|term| lower.contains(term)) {
            let mut snippet = truncate_chars(sentence, max_length);
            if sentence.chars().count() > max_length {
                snippet.push_str("...");
            }
            snippets.push(snippet);
            if snippets.len() == 3 {
                break;
            }
        }
    }

    snippets
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_indexer() -> (DocumentIndexer, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let embedder = Arc::new(OpenAiEmbedder::new(
            "test-key".to_string(),
            "test-model".to_string(),
            4,
        ));
        let indexer = DocumentIndexer::open(temp_dir.path().join("documents.db"), embedder, "documents")
            .await
            .unwrap();
        (indexer, temp_dir)
    }

    fn metadata(title: &str) -> DocumentMetadata {
        DocumentMetadata::new(title, DocumentFormat::Markdown)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (indexer, _tmp) = test_indexer().await;
        let doc_id = indexer
            .insert_with_embedding("# Hello\n\nWorld.", metadata("Hello"), vec![1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();
        assert!(doc_id.starts_with("doc-"));

        let doc = indexer.get_document(&doc_id).await.unwrap().unwrap();
        assert_eq!(doc.metadata.title, "Hello");
        assert!(doc.content.contains("World"));

        assert!(indexer.get_document("doc-missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_ranking_and_min_score() {
        let (indexer, _tmp) = test_indexer().await;
        indexer
            .insert_with_embedding(
                "Mortgage underwriting procedures.",
                metadata("Close match"),
                vec![1.0, 0.0, 0.0, 0.0],
            )
            .await
            .unwrap();
        indexer
            .insert_with_embedding(
                "Gardening tips.",
                metadata("Far match"),
                vec![0.0, 1.0, 0.0, 0.0],
            )
            .await
            .unwrap();

        let results = indexer
            .search_with_embedding(
                "mortgage",
                vec![1.0, 0.0, 0.0, 0.0],
                &serde_json::Map::new(),
                10,
                0.5,
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Close match");
        assert!(results[0].score > 0.99);
        assert!(results[0].snippet.contains("Mortgage"));
    }

    #[tokio::test]
    async fn test_search_metadata_filters() {
        let (indexer, _tmp) = test_indexer().await;
        let mut by_ada = metadata("Doc A");
        by_ada.author = Some("Ada".to_string());
        by_ada.tags = vec!["compliance".to_string()];
        indexer
            .insert_with_embedding("Alpha content.", by_ada, vec![1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();
        let mut by_bob = metadata("Doc B");
        by_bob.author = Some("Bob".to_string());
        indexer
            .insert_with_embedding("Beta content.", by_bob, vec![1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();

        let mut filters = serde_json::Map::new();
        filters.insert("author".to_string(), json!("Ada"));
        let results = indexer
            .search_with_embedding("content", vec![1.0, 0.0, 0.0, 0.0], &filters, 10, 0.0)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.author.as_deref(), Some("Ada"));

        let mut filters = serde_json::Map::new();
        filters.insert("tags".to_string(), json!(["compliance"]));
        let results = indexer
            .search_with_embedding("content", vec![1.0, 0.0, 0.0, 0.0], &filters, 10, 0.0)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Doc A");
    }

    #[tokio::test]
    async fn test_update_document() {
        let (indexer, _tmp) = test_indexer().await;
        let doc_id = indexer
            .insert_with_embedding("Old content.", metadata("Doc"), vec![1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();
        indexer
            .update_with_embedding(&doc_id, "New content.", metadata("Doc v2"), vec![0.0, 1.0, 0.0, 0.0])
            .await
            .unwrap();
        let doc = indexer.get_document(&doc_id).await.unwrap().unwrap();
        assert_eq!(doc.metadata.title, "Doc v2");
        assert_eq!(doc.content, "New content.");

        let err = indexer
            .update_with_embedding("doc-missing", "x", metadata("x"), vec![1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap_err();
        assert!(matches!(err, DocascodeError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (indexer, _tmp) = test_indexer().await;
        let doc_id = indexer
            .insert_with_embedding("Content.", metadata("Doc"), vec![1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();
        indexer.delete_document(&doc_id).await.unwrap();
        assert!(indexer.get_document(&doc_id).await.unwrap().is_none());
        // Deleting again is a no-op
        indexer.delete_document(&doc_id).await.unwrap();

        indexer
            .insert_with_embedding("One.", metadata("One"), vec![1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();
        indexer.clear().await.unwrap();
        let stats = indexer.statistics().await.unwrap();
        assert_eq!(stats["total_documents"], 0);
    }

    #[tokio::test]
    async fn test_statistics() {
        let (indexer, _tmp) = test_indexer().await;
        indexer
            .insert_with_embedding("One.", metadata("One"), vec![1.0, 0.0, 0.0, 0.0])
            .await
            .unwrap();
        let stats = indexer.statistics().await.unwrap();
        assert_eq!(stats["collection_name"], "documents");
        assert_eq!(stats["total_documents"], 1);
        assert_eq!(stats["embedding_model"], "test-model");
        assert_eq!(stats["embedding_dimension"], 4);
    }

    #[test]
    fn test_embedding_blob_round_trip() {
        let embedding = vec![0.5f32, -1.25, 3.0];
        let blob = embedding_to_blob(&embedding);
        assert_eq!(blob.len(), 12);
        assert_eq!(blob_to_embedding(&blob), embedding);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_extract_snippets() {
        let content = "Mortgage rules apply. Gardening is fun. The mortgage rate changed.";
        let snippets = extract_snippets(content, "mortgage", 200);
        assert_eq!(snippets.len(), 2);
        assert!(snippets[0].contains("Mortgage rules"));
    }

    #[test]
    fn test_generate_document_id_stable() {
        let meta = metadata("Title");
        let a = DocumentIndexer::generate_document_id("content", &meta);
        let b = DocumentIndexer::generate_document_id("content", &meta);
        assert_eq!(a, b);
        let c = DocumentIndexer::generate_document_id("other", &meta);
        assert_ne!(a, c);
    }
}
