//! Access to the `resume` schema.
//!
//! `ResumeStore` is the read seam the retriever talks to; `PgResumeStore` is the
//! production backend and tests swap in an in-memory mock. The only write path
//! is `DocumentIndex::upsert_document` into `resume.document_embeddings`.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::indexing::{DocumentIndex, SourceDocument};
use crate::models::context::{ContextField, RagContext};
use crate::models::resume::{
    AiSetting, Certification, DocumentMatch, Education, Experience, Hobby, ImageArchive,
    Profile, Project, Skill, SocialLink, ThreejsWork,
};

/// Upper bound on one `match_documents` call.
pub const VECTOR_SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("vector search timed out after {0:?}")]
    Timeout(Duration),
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn profile(&self) -> Result<Option<Profile>, StoreError>;
    async fn experience(&self) -> Result<Vec<Experience>, StoreError>;
    async fn skills(&self) -> Result<Vec<Skill>, StoreError>;
    /// Highest-proficiency skills first.
    async fn top_skills(&self, limit: i64) -> Result<Vec<Skill>, StoreError>;
    async fn projects(&self, limit: Option<i64>) -> Result<Vec<Project>, StoreError>;
    async fn threejs(&self) -> Result<Vec<ThreejsWork>, StoreError>;
    async fn education(&self) -> Result<Vec<Education>, StoreError>;
    async fn certifications(&self) -> Result<Vec<Certification>, StoreError>;
    async fn hobbies(&self) -> Result<Vec<Hobby>, StoreError>;
    async fn social_links(&self) -> Result<Vec<SocialLink>, StoreError>;
    /// Non-deleted archive images, optionally restricted to one year.
    async fn images(&self, year: Option<i32>) -> Result<Vec<ImageArchive>, StoreError>;
    async fn ai_settings(&self) -> Result<Vec<AiSetting>, StoreError>;

    async fn match_documents(
        &self,
        embedding: &[f32],
        threshold: f64,
        top_k: i32,
    ) -> Result<Vec<DocumentMatch>, StoreError>;

    /// Loads the rows behind vector matches. Only `field` is set on the result.
    async fn fetch_by_ids(&self, field: ContextField, ids: &[Uuid])
        -> Result<RagContext, StoreError>;
}

/// pgvector text literal: `[0.1,0.2,...]`.
pub fn embedding_literal(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

// ────────────────────────────────────────────────────────────────────────────
// PgResumeStore: Postgres backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgResumeStore {
    db: PgPool,
}

impl PgResumeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_all<T>(&self, sql: &str) -> Result<Vec<T>, StoreError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        Ok(sqlx::query_as::<_, T>(sql).fetch_all(&self.db).await?)
    }

    async fn fetch_ids<T>(&self, sql: &str, ids: &[Uuid]) -> Result<Vec<T>, StoreError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        Ok(sqlx::query_as::<_, T>(sql)
            .bind(ids)
            .fetch_all(&self.db)
            .await?)
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn profile(&self) -> Result<Option<Profile>, StoreError> {
        Ok(
            sqlx::query_as("SELECT * FROM resume.profile ORDER BY id LIMIT 1")
                .fetch_optional(&self.db)
                .await?,
        )
    }

    async fn experience(&self) -> Result<Vec<Experience>, StoreError> {
        self.fetch_all("SELECT * FROM resume.experience ORDER BY order_index DESC NULLS LAST")
            .await
    }

    async fn skills(&self) -> Result<Vec<Skill>, StoreError> {
        self.fetch_all(
            "SELECT * FROM resume.skills \
             ORDER BY proficiency DESC NULLS LAST, order_index DESC NULLS LAST",
        )
        .await
    }

    async fn top_skills(&self, limit: i64) -> Result<Vec<Skill>, StoreError> {
        Ok(sqlx::query_as(
            "SELECT * FROM resume.skills \
             ORDER BY proficiency DESC NULLS LAST, order_index DESC NULLS LAST LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?)
    }

    async fn projects(&self, limit: Option<i64>) -> Result<Vec<Project>, StoreError> {
        // LIMIT NULL means no limit in Postgres.
        Ok(sqlx::query_as(
            "SELECT * FROM resume.projects WHERE COALESCE(deleted, false) = false \
             ORDER BY order_index DESC NULLS LAST LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?)
    }

    async fn threejs(&self) -> Result<Vec<ThreejsWork>, StoreError> {
        self.fetch_all(
            "SELECT * FROM resume.threejs WHERE COALESCE(deleted, false) = false \
             ORDER BY order_index DESC NULLS LAST",
        )
        .await
    }

    async fn education(&self) -> Result<Vec<Education>, StoreError> {
        self.fetch_all("SELECT * FROM resume.education ORDER BY order_index DESC NULLS LAST")
            .await
    }

    async fn certifications(&self) -> Result<Vec<Certification>, StoreError> {
        self.fetch_all(
            "SELECT * FROM resume.certifications WHERE COALESCE(deleted, false) = false \
             ORDER BY order_index ASC NULLS LAST",
        )
        .await
    }

    async fn hobbies(&self) -> Result<Vec<Hobby>, StoreError> {
        self.fetch_all("SELECT * FROM resume.hobbies ORDER BY order_index ASC NULLS LAST")
            .await
    }

    async fn social_links(&self) -> Result<Vec<SocialLink>, StoreError> {
        self.fetch_all("SELECT * FROM resume.social_links ORDER BY order_index DESC NULLS LAST")
            .await
    }

    async fn images(&self, year: Option<i32>) -> Result<Vec<ImageArchive>, StoreError> {
        Ok(sqlx::query_as(
            "SELECT * FROM resume.image_archive \
             WHERE COALESCE(deleted, false) = false AND ($1::int4 IS NULL OR year = $1) \
             ORDER BY year DESC, order_index ASC NULLS LAST",
        )
        .bind(year)
        .fetch_all(&self.db)
        .await?)
    }

    async fn ai_settings(&self) -> Result<Vec<AiSetting>, StoreError> {
        self.fetch_all("SELECT setting_key, setting_value FROM resume.ai_settings")
            .await
    }

    async fn match_documents(
        &self,
        embedding: &[f32],
        threshold: f64,
        top_k: i32,
    ) -> Result<Vec<DocumentMatch>, StoreError> {
        let query = sqlx::query_as::<_, DocumentMatch>(
            "SELECT document_type, document_id::uuid AS document_id, \
                    similarity::float8 AS similarity, metadata \
             FROM resume.match_documents($1::vector, $2, $3)",
        )
        .bind(embedding_literal(embedding))
        .bind(threshold)
        .bind(top_k)
        .fetch_all(&self.db);

        tokio::time::timeout(VECTOR_SEARCH_TIMEOUT, query)
            .await
            .map_err(|_| StoreError::Timeout(VECTOR_SEARCH_TIMEOUT))?
            .map_err(StoreError::from)
    }

    async fn fetch_by_ids(
        &self,
        field: ContextField,
        ids: &[Uuid],
    ) -> Result<RagContext, StoreError> {
        let mut ctx = RagContext::default();
        match field {
            ContextField::Profile => {
                ctx.profile = self
                    .fetch_ids("SELECT * FROM resume.profile WHERE id = ANY($1)", ids)
                    .await?
                    .into_iter()
                    .next();
            }
            ContextField::Experience => {
                ctx.experience = self
                    .fetch_ids("SELECT * FROM resume.experience WHERE id = ANY($1)", ids)
                    .await?;
            }
            ContextField::Skills => {
                ctx.skills = self
                    .fetch_ids("SELECT * FROM resume.skills WHERE id = ANY($1)", ids)
                    .await?;
            }
            ContextField::Projects => {
                ctx.projects = self
                    .fetch_ids(
                        "SELECT * FROM resume.projects \
                         WHERE id = ANY($1) AND COALESCE(deleted, false) = false",
                        ids,
                    )
                    .await?;
            }
            ContextField::Threejs => {
                ctx.threejs = self
                    .fetch_ids(
                        "SELECT * FROM resume.threejs \
                         WHERE id = ANY($1) AND COALESCE(deleted, false) = false",
                        ids,
                    )
                    .await?;
            }
            ContextField::Education => {
                ctx.education = self
                    .fetch_ids("SELECT * FROM resume.education WHERE id = ANY($1)", ids)
                    .await?;
            }
            ContextField::Certifications => {
                ctx.certifications = self
                    .fetch_ids(
                        "SELECT * FROM resume.certifications \
                         WHERE id = ANY($1) AND COALESCE(deleted, false) = false",
                        ids,
                    )
                    .await?;
            }
            ContextField::Hobbies => {
                ctx.hobbies = self
                    .fetch_ids("SELECT * FROM resume.hobbies WHERE id = ANY($1)", ids)
                    .await?;
            }
            ContextField::SocialLinks => {
                ctx.social_links = self
                    .fetch_ids("SELECT * FROM resume.social_links WHERE id = ANY($1)", ids)
                    .await?;
            }
            ContextField::Images => {
                ctx.images = self
                    .fetch_ids(
                        "SELECT * FROM resume.image_archive \
                         WHERE id = ANY($1) AND COALESCE(deleted, false) = false",
                        ids,
                    )
                    .await?;
            }
        }
        Ok(ctx)
    }
}

#[async_trait]
impl DocumentIndex for PgResumeStore {
    async fn upsert_document(
        &self,
        document: &SourceDocument,
        embedding: &[f32],
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO resume.document_embeddings \
                 (document_type, document_id, content, embedding, metadata, updated_at) \
             VALUES ($1, $2, $3, $4::vector, $5, now()) \
             ON CONFLICT (document_type, document_id) DO UPDATE SET \
                 content = EXCLUDED.content, \
                 embedding = EXCLUDED.embedding, \
                 metadata = EXCLUDED.metadata, \
                 updated_at = now()",
        )
        .bind(document.document_type)
        .bind(document.document_id)
        .bind(&document.content)
        .bind(embedding_literal(embedding))
        .bind(&document.metadata)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_literal_format() {
        assert_eq!(embedding_literal(&[0.5, -1.0, 0.25]), "[0.5,-1,0.25]");
        assert_eq!(embedding_literal(&[]), "[]");
    }
}
