//! Rows of the read-only `resume` schema.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub detailed_bio: Option<String>,
    pub ai_personality_data: Option<Value>,
    pub weaknesses: Option<Vec<String>>,
}

impl Profile {
    pub fn has_weaknesses(&self) -> bool {
        self.weaknesses.as_ref().is_some_and(|w| !w.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Experience {
    pub id: Uuid,
    pub company_name: String,
    pub position: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub location: Option<String>,
    pub company_logo_url: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub category: String,
    pub name: String,
    /// 1 (familiar) to 5 (expert).
    pub proficiency: Option<i32>,
    pub icon_url: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub thumbnail_url: Option<String>,
    pub project_url: Option<String>,
    pub github_url: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub highlights: Option<Vec<String>>,
    pub order_index: Option<i32>,
}

/// A WebGL / three.js piece, shown separately from regular projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ThreejsWork {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Education {
    pub id: Uuid,
    pub school_name: String,
    pub degree: Option<String>,
    pub major: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Certification {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub issuer: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub credential_url: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Hobby {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SocialLink {
    pub id: Uuid,
    pub platform: String,
    pub url: String,
    pub icon_url: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ImageArchive {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub year: i32,
    pub month: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AiSetting {
    pub setting_key: String,
    pub setting_value: String,
}

/// One row of `resume.match_documents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DocumentMatch {
    pub document_type: String,
    pub document_id: Uuid,
    pub similarity: f64,
    pub metadata: Option<Value>,
}
