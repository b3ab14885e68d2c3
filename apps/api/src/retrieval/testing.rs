//! In-memory doubles for the store, embedder and enricher seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::embedding::{Embedder, EmbeddingError};
use crate::indexing::{DocumentIndex, SourceDocument};
use crate::models::context::{ContextField, ExternalProfiles, RagContext};
use crate::models::resume::{
    AiSetting, Certification, DocumentMatch, Education, Experience, Hobby, ImageArchive, Profile,
    Project, Skill, SocialLink, ThreejsWork,
};
use crate::retrieval::enrichment::{EnrichmentError, ProfileEnricher};
use crate::retrieval::store::{ResumeStore, StoreError};

/// In-memory store. `data` answers stage-1 reads, `vector_rows` answers
/// `fetch_by_ids`, `failing` names reads that error out.
#[derive(Default)]
pub struct MockStore {
    pub data: RagContext,
    pub vector_rows: RagContext,
    pub matches: Vec<DocumentMatch>,
    pub failing: Vec<&'static str>,
    pub calls: Mutex<Vec<String>>,
    /// Every `(document, embedding)` pair written through `DocumentIndex`.
    pub upserts: Mutex<Vec<(SourceDocument, Vec<f32>)>>,
}

impl MockStore {
    fn record(&self, call: &str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.failing.contains(&call) {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn pick<T: Clone>(rows: &[T], ids: &[Uuid], id: impl Fn(&T) -> Uuid) -> Vec<T> {
    rows.iter().filter(|r| ids.contains(&id(r))).cloned().collect()
}

#[async_trait]
impl ResumeStore for MockStore {
    async fn profile(&self) -> Result<Option<Profile>, StoreError> {
        self.record("profile")?;
        Ok(self.data.profile.clone())
    }
    async fn experience(&self) -> Result<Vec<Experience>, StoreError> {
        self.record("experience")?;
        Ok(self.data.experience.clone())
    }
    async fn skills(&self) -> Result<Vec<Skill>, StoreError> {
        self.record("skills")?;
        Ok(self.data.skills.clone())
    }
    async fn top_skills(&self, limit: i64) -> Result<Vec<Skill>, StoreError> {
        self.record("top_skills")?;
        let mut skills = self.data.skills.clone();
        skills.sort_by(|a, b| b.proficiency.cmp(&a.proficiency));
        skills.truncate(limit as usize);
        Ok(skills)
    }
    async fn projects(&self, limit: Option<i64>) -> Result<Vec<Project>, StoreError> {
        self.record("projects")?;
        let mut projects = self.data.projects.clone();
        if let Some(limit) = limit {
            projects.truncate(limit as usize);
        }
        Ok(projects)
    }
    async fn threejs(&self) -> Result<Vec<ThreejsWork>, StoreError> {
        self.record("threejs")?;
        Ok(self.data.threejs.clone())
    }
    async fn education(&self) -> Result<Vec<Education>, StoreError> {
        self.record("education")?;
        Ok(self.data.education.clone())
    }
    async fn certifications(&self) -> Result<Vec<Certification>, StoreError> {
        self.record("certifications")?;
        Ok(self.data.certifications.clone())
    }
    async fn hobbies(&self) -> Result<Vec<Hobby>, StoreError> {
        self.record("hobbies")?;
        Ok(self.data.hobbies.clone())
    }
    async fn social_links(&self) -> Result<Vec<SocialLink>, StoreError> {
        self.record("social_links")?;
        Ok(self.data.social_links.clone())
    }
    async fn images(&self, year: Option<i32>) -> Result<Vec<ImageArchive>, StoreError> {
        self.record("images")?;
        Ok(self
            .data
            .images
            .iter()
            .filter(|i| year.map_or(true, |y| i.year == y))
            .cloned()
            .collect())
    }
    async fn ai_settings(&self) -> Result<Vec<AiSetting>, StoreError> {
        self.record("ai_settings")?;
        Ok(vec![])
    }
    async fn match_documents(
        &self,
        _embedding: &[f32],
        _threshold: f64,
        _top_k: i32,
    ) -> Result<Vec<DocumentMatch>, StoreError> {
        self.record("match_documents")?;
        Ok(self.matches.clone())
    }
    async fn fetch_by_ids(
        &self,
        field: ContextField,
        ids: &[Uuid],
    ) -> Result<RagContext, StoreError> {
        self.record("fetch_by_ids")?;
        let rows = &self.vector_rows;
        let mut ctx = RagContext::default();
        match field {
            ContextField::Profile => {
                ctx.profile = rows.profile.clone().filter(|p| ids.contains(&p.id))
            }
            ContextField::Experience => ctx.experience = pick(&rows.experience, ids, |r| r.id),
            ContextField::Skills => ctx.skills = pick(&rows.skills, ids, |r| r.id),
            ContextField::Projects => ctx.projects = pick(&rows.projects, ids, |r| r.id),
            ContextField::Threejs => ctx.threejs = pick(&rows.threejs, ids, |r| r.id),
            ContextField::Education => ctx.education = pick(&rows.education, ids, |r| r.id),
            ContextField::Certifications => {
                ctx.certifications = pick(&rows.certifications, ids, |r| r.id)
            }
            ContextField::Hobbies => ctx.hobbies = pick(&rows.hobbies, ids, |r| r.id),
            ContextField::SocialLinks => {
                ctx.social_links = pick(&rows.social_links, ids, |r| r.id)
            }
            ContextField::Images => ctx.images = pick(&rows.images, ids, |r| r.id),
        }
        Ok(ctx)
    }
}

pub struct MockEmbedder {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn name(&self) -> &'static str {
        "mock"
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(EmbeddingError::Shape("mock"))
        } else {
            Ok(vec![0.1; 8])
        }
    }
}

#[derive(Default)]
pub struct MockEnricher {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ProfileEnricher for MockEnricher {
    async fn enrich(
        &self,
        _links: &[SocialLink],
    ) -> Result<Option<ExternalProfiles>, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(ExternalProfiles::default()))
    }
}

#[async_trait]
impl DocumentIndex for MockStore {
    async fn upsert_document(
        &self,
        document: &SourceDocument,
        embedding: &[f32],
    ) -> Result<(), StoreError> {
        self.record("upsert_document")?;
        self.upserts
            .lock()
            .unwrap()
            .push((document.clone(), embedding.to_vec()));
        Ok(())
    }
}
