//! Context Retriever: keyword-first, vector-fallback retrieval over the resume store.
//!
//! Stage 1 fetches whole tables for every category the query mentions. Stage 2
//! only runs when stage 1 found no collection data; it embeds the query, runs
//! a similarity search and fills the fields stage 1 left empty. Retrieval never
//! fails: store, embedding and enrichment errors are logged and degrade the
//! context instead.

pub mod enrichment;
pub mod store;
#[cfg(test)]
pub mod testing;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::embedding::Embedder;
use crate::intent::rules::{matches_any, retrieval_categories, Category, GITHUB_HINTS, LINKEDIN_HINTS};
use crate::models::context::{ContextField, RagContext};
use crate::retrieval::enrichment::ProfileEnricher;
use crate::retrieval::store::{ResumeStore, StoreError};

pub const DEFAULT_VECTOR_THRESHOLD: f64 = 0.7;
pub const DEFAULT_VECTOR_TOP_K: i32 = 5;
const COMPREHENSIVE_SKILL_LIMIT: i64 = 10;
const COMPREHENSIVE_PROJECT_LIMIT: i64 = 5;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])([0-9]{4})(?:[^0-9]|$)").unwrap());

/// First standalone four-digit number in the query ("2023년 사진" -> 2023).
pub fn extract_year(query: &str) -> Option<i32> {
    YEAR_RE
        .captures(query)
        .and_then(|c| c[1].parse().ok())
}

/// The context under construction plus the fields stage 1 owns.
#[derive(Debug, Default)]
struct Accumulator {
    context: RagContext,
    keyword_fields: BTreeSet<ContextField>,
}

impl Accumulator {
    fn seal_keyword_stage(&mut self) {
        self.keyword_fields = self.context.populated_fields().into_iter().collect();
    }

    /// Merges vector-sourced rows for one field. Keyword-owned fields are left untouched.
    fn merge_vector_rows(&mut self, field: ContextField, rows: RagContext) {
        if self.keyword_fields.contains(&field) {
            return;
        }
        let ctx = &mut self.context;
        match field {
            ContextField::Profile => {
                if ctx.profile.is_none() {
                    ctx.profile = rows.profile;
                }
            }
            ContextField::Experience => append_unique(&mut ctx.experience, rows.experience, |r| r.id),
            ContextField::Skills => append_unique(&mut ctx.skills, rows.skills, |r| r.id),
            ContextField::Projects => append_unique(&mut ctx.projects, rows.projects, |r| r.id),
            ContextField::Threejs => append_unique(&mut ctx.threejs, rows.threejs, |r| r.id),
            ContextField::Education => append_unique(&mut ctx.education, rows.education, |r| r.id),
            ContextField::Certifications => {
                append_unique(&mut ctx.certifications, rows.certifications, |r| r.id)
            }
            ContextField::Hobbies => append_unique(&mut ctx.hobbies, rows.hobbies, |r| r.id),
            ContextField::SocialLinks => {
                append_unique(&mut ctx.social_links, rows.social_links, |r| r.id)
            }
            ContextField::Images => append_unique(&mut ctx.images, rows.images, |r| r.id),
        }
    }
}

fn append_unique<T>(target: &mut Vec<T>, rows: Vec<T>, id: impl Fn(&T) -> Uuid) {
    let mut seen: HashSet<Uuid> = target.iter().map(&id).collect();
    for row in rows {
        if seen.insert(id(&row)) {
            target.push(row);
        }
    }
}

/// Logs a failed stage-1 read and substitutes an empty value for that field.
fn or_empty<T: Default>(what: &str, result: Result<T, StoreError>) -> T {
    result.unwrap_or_else(|e| {
        warn!("Keyword retrieval of {what} failed: {e}");
        T::default()
    })
}

pub struct ContextRetriever {
    store: Arc<dyn ResumeStore>,
    embedder: Arc<dyn Embedder>,
    enricher: Arc<dyn ProfileEnricher>,
    threshold: f64,
    top_k: i32,
}

impl ContextRetriever {
    pub fn new(
        store: Arc<dyn ResumeStore>,
        embedder: Arc<dyn Embedder>,
        enricher: Arc<dyn ProfileEnricher>,
    ) -> Self {
        Self {
            store,
            embedder,
            enricher,
            threshold: DEFAULT_VECTOR_THRESHOLD,
            top_k: DEFAULT_VECTOR_TOP_K,
        }
    }

    pub fn with_vector_params(mut self, threshold: f64, top_k: i32) -> Self {
        self.threshold = threshold;
        self.top_k = top_k;
        self
    }

    pub async fn retrieve(&self, query: &str) -> RagContext {
        let lowered = query.to_lowercase();
        let categories = retrieval_categories(&lowered);
        debug!("Retrieval categories for query: {categories:?}");

        if categories.contains(&Category::Comprehensive) {
            return self.comprehensive().await;
        }

        let mut acc = Accumulator::default();
        self.keyword_stage(&lowered, &categories, &mut acc).await;
        acc.seal_keyword_stage();

        if !acc.context.has_collections() {
            self.vector_stage(query, &mut acc).await;
        }

        info!(
            "Retrieved context fields: {:?} (keyword: {:?})",
            acc.context.populated_fields(),
            acc.keyword_fields
        );
        acc.context
    }

    /// Overview questions get a fixed bundle and skip both stages.
    async fn comprehensive(&self) -> RagContext {
        let (profile, skills, projects) = tokio::join!(
            self.store.profile(),
            self.store.top_skills(COMPREHENSIVE_SKILL_LIMIT),
            self.store.projects(Some(COMPREHENSIVE_PROJECT_LIMIT)),
        );
        RagContext {
            profile: or_empty("profile", profile),
            skills: or_empty("skills", skills),
            projects: or_empty("projects", projects),
            ..Default::default()
        }
    }

    async fn keyword_stage(&self, query: &str, categories: &[Category], acc: &mut Accumulator) {
        let mut profile_fetched = false;
        let mut social_fetched = false;

        for category in categories {
            let ctx = &mut acc.context;
            match category {
                Category::Greeting | Category::Profile | Category::Weakness => {
                    if !profile_fetched {
                        ctx.profile = or_empty("profile", self.store.profile().await);
                        profile_fetched = true;
                    }
                }
                Category::Experience => {
                    ctx.experience = or_empty("experience", self.store.experience().await)
                }
                Category::Skill => ctx.skills = or_empty("skills", self.store.skills().await),
                Category::Project => {
                    ctx.projects = or_empty("projects", self.store.projects(None).await)
                }
                Category::Threejs => ctx.threejs = or_empty("threejs", self.store.threejs().await),
                Category::Education => {
                    ctx.education = or_empty("education", self.store.education().await)
                }
                Category::Certification => {
                    ctx.certifications =
                        or_empty("certifications", self.store.certifications().await)
                }
                Category::Hobby => ctx.hobbies = or_empty("hobbies", self.store.hobbies().await),
                Category::Social | Category::Contact => {
                    if !social_fetched {
                        ctx.social_links =
                            or_empty("social links", self.store.social_links().await);
                        social_fetched = true;
                        self.enrich(query, ctx).await;
                    }
                }
                Category::Image => {
                    let year = extract_year(query);
                    ctx.image_year = year;
                    ctx.images = or_empty("images", self.store.images(year).await);
                }
                Category::Comprehensive => {}
            }
        }
    }

    async fn enrich(&self, query: &str, ctx: &mut RagContext) {
        let wants_external = matches_any(query, GITHUB_HINTS) || matches_any(query, LINKEDIN_HINTS);
        if !wants_external || ctx.social_links.is_empty() {
            return;
        }
        match self.enricher.enrich(&ctx.social_links).await {
            Ok(profiles) => ctx.external_profiles = profiles,
            Err(e) => warn!("External profile enrichment failed: {e}"),
        }
    }

    async fn vector_stage(&self, query: &str, acc: &mut Accumulator) {
        let embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Vector stage skipped, embedding failed: {e}");
                return;
            }
        };

        let matches = match self
            .store
            .match_documents(&embedding, self.threshold, self.top_k)
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Vector stage skipped, similarity search failed: {e}");
                return;
            }
        };

        let mut wanted: BTreeMap<ContextField, Vec<Uuid>> = BTreeMap::new();
        for m in matches {
            if m.similarity < self.threshold {
                continue;
            }
            let Some(field) = ContextField::from_document_type(&m.document_type) else {
                debug!("Ignoring vector match of unknown type {}", m.document_type);
                continue;
            };
            if acc.keyword_fields.contains(&field) {
                continue;
            }
            let ids = wanted.entry(field).or_default();
            if !ids.contains(&m.document_id) {
                ids.push(m.document_id);
            }
        }

        for (field, ids) in wanted {
            match self.store.fetch_by_ids(field, &ids).await {
                Ok(rows) => acc.merge_vector_rows(field, rows),
                Err(e) => warn!("Fetching vector matches for {field:?} failed: {e}"),
            }
        }
    }
}
