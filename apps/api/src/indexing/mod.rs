//! Embedding index maintenance.
//!
//! `EmbeddingIndexer` renders every resume row into a `SourceDocument`, embeds it
//! with the same `Embedder` the retriever queries with, and upserts the result
//! into `resume.document_embeddings`.

pub mod documents;
pub mod handlers;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::embedding::{Embedder, EmbeddingError};
use crate::models::context::RagContext;
use crate::retrieval::store::{ResumeStore, StoreError};

/// One row of text to embed, keyed by `(document_type, document_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub document_type: &'static str,
    pub document_id: Uuid,
    pub content: String,
    pub metadata: Value,
}

impl SourceDocument {
    pub fn new(
        document_type: &'static str,
        document_id: Uuid,
        content: String,
        metadata: Value,
    ) -> Self {
        Self {
            document_type,
            document_id,
            content,
            metadata,
        }
    }
}

/// Write side of the vector index.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Inserts or replaces the row for `(document_type, document_id)`.
    async fn upsert_document(
        &self,
        document: &SourceDocument,
        embedding: &[f32],
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to load resume data: {0}")]
    Store(#[from] StoreError),

    #[error("failed to embed {document_type} {document_id}: {source}")]
    Embedding {
        document_type: &'static str,
        document_id: Uuid,
        source: EmbeddingError,
    },

    #[error("failed to save {document_type} {document_id}: {source}")]
    Save {
        document_type: &'static str,
        document_id: Uuid,
        source: StoreError,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub indexed: usize,
    pub by_type: BTreeMap<&'static str, usize>,
}

pub struct EmbeddingIndexer {
    store: Arc<dyn ResumeStore>,
    index: Arc<dyn DocumentIndex>,
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingIndexer {
    pub fn new(
        store: Arc<dyn ResumeStore>,
        index: Arc<dyn DocumentIndex>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
        }
    }

    /// Reads every table and renders the rows into documents.
    pub async fn collect_documents(&self) -> Result<Vec<SourceDocument>, IndexError> {
        let store = self.store.as_ref();
        let (
            profile,
            experience,
            skills,
            projects,
            threejs,
            education,
            certifications,
            hobbies,
            social_links,
            images,
        ) = tokio::try_join!(
            store.profile(),
            store.experience(),
            store.skills(),
            store.projects(None),
            store.threejs(),
            store.education(),
            store.certifications(),
            store.hobbies(),
            store.social_links(),
            store.images(None),
        )?;

        let data = RagContext {
            profile,
            experience,
            skills,
            projects,
            threejs,
            education,
            certifications,
            hobbies,
            social_links,
            images,
            ..Default::default()
        };
        Ok(documents::build_documents(&data))
    }

    /// Re-embeds every document. Stops at the first failure; rows written
    /// before it stay in place.
    pub async fn initialize(&self) -> Result<IndexReport, IndexError> {
        let documents = self.collect_documents().await?;
        tracing::info!(
            "Indexing {} documents with {}",
            documents.len(),
            self.embedder.name()
        );

        let mut report = IndexReport::default();
        for document in &documents {
            let embedding = self
                .embedder
                .embed(&document.content)
                .await
                .map_err(|source| IndexError::Embedding {
                    document_type: document.document_type,
                    document_id: document.document_id,
                    source,
                })?;

            self.index
                .upsert_document(document, &embedding)
                .await
                .map_err(|source| IndexError::Save {
                    document_type: document.document_type,
                    document_id: document.document_id,
                    source,
                })?;

            tracing::debug!("Indexed {} {}", document.document_type, document.document_id);
            report.indexed += 1;
            *report.by_type.entry(document.document_type).or_default() += 1;
        }

        tracing::info!("Indexed {} documents", report.indexed);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::fixtures;
    use crate::retrieval::testing::{MockEmbedder, MockStore};
    use std::sync::atomic::Ordering;

    fn seeded_store() -> Arc<MockStore> {
        Arc::new(MockStore {
            data: RagContext {
                profile: Some(fixtures::profile("Owner")),
                skills: vec![fixtures::skill("Rust", 5), fixtures::skill("Go", 3)],
                projects: vec![fixtures::project("folio")],
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn indexer(store: &Arc<MockStore>, embedder: Arc<MockEmbedder>) -> EmbeddingIndexer {
        EmbeddingIndexer::new(store.clone(), store.clone(), embedder)
    }

    #[tokio::test]
    async fn test_initialize_upserts_every_document() {
        let store = seeded_store();
        let embedder = Arc::new(MockEmbedder::new(false));

        let report = indexer(&store, embedder.clone()).initialize().await.unwrap();

        // profile + contact (fixture has email/phone) + 2 skills + 1 project
        assert_eq!(report.indexed, 5);
        assert_eq!(report.by_type["skill"], 2);
        assert_eq!(report.by_type["contact"], 1);
        assert!(!report.by_type.contains_key("weaknesses"));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 5);

        let upserts = store.upserts.lock().unwrap();
        assert_eq!(upserts.len(), 5);
        let (project, embedding) = upserts
            .iter()
            .find(|(doc, _)| doc.document_type == "project")
            .unwrap();
        assert_eq!(project.document_id, store.data.projects[0].id);
        assert!(project.content.starts_with("Project: folio"));
        assert_eq!(embedding, &vec![0.1; 8]);
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_before_any_write() {
        let store = seeded_store();
        let err = indexer(&store, Arc::new(MockEmbedder::new(true)))
            .initialize()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IndexError::Embedding {
                document_type: "profile",
                ..
            }
        ));
        assert!(store.upserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let store = Arc::new(MockStore {
            data: RagContext {
                hobbies: vec![fixtures::hobby("Riding")],
                ..Default::default()
            },
            failing: vec!["upsert_document"],
            ..Default::default()
        });
        let err = indexer(&store, Arc::new(MockEmbedder::new(false)))
            .initialize()
            .await
            .unwrap_err();

        assert!(matches!(err, IndexError::Save { document_type: "hobby", .. }));
    }

    #[tokio::test]
    async fn test_read_failure_surfaces_as_store_error() {
        let store = Arc::new(MockStore {
            failing: vec!["skills"],
            ..Default::default()
        });
        let err = indexer(&store, Arc::new(MockEmbedder::new(false)))
            .initialize()
            .await
            .unwrap_err();

        assert!(matches!(err, IndexError::Store(_)));
        assert!(store.upserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_reports_zero() {
        let store = Arc::new(MockStore::default());
        let report = indexer(&store, Arc::new(MockEmbedder::new(false)))
            .initialize()
            .await
            .unwrap();
        assert_eq!(report, IndexReport::default());
    }
}
