use serde::{Deserialize, Serialize};

use crate::models::resume::{
    Certification, Education, Experience, Hobby, ImageArchive, Profile, Project, Skill,
    SocialLink, ThreejsWork,
};

/// Grounding bundle retrieved for a single query. Never persisted.
///
/// An empty collection means "not retrieved"; empty fields are left out of the
/// serialized snapshot so the prompt and the metadata frame only carry real data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experience: Vec<Experience>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<Skill>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<Project>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threejs: Vec<ThreejsWork>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub education: Vec<Education>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certifications: Vec<Certification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hobbies: Vec<Hobby>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub social_links: Vec<SocialLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageArchive>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_profiles: Option<ExternalProfiles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_year: Option<i32>,
}

/// Addressable slots of a [`RagContext`] that retrieval stages can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextField {
    Profile,
    Experience,
    Skills,
    Projects,
    Threejs,
    Education,
    Certifications,
    Hobbies,
    SocialLinks,
    Images,
}

impl ContextField {
    pub const ALL: [ContextField; 10] = [
        ContextField::Profile,
        ContextField::Experience,
        ContextField::Skills,
        ContextField::Projects,
        ContextField::Threejs,
        ContextField::Education,
        ContextField::Certifications,
        ContextField::Hobbies,
        ContextField::SocialLinks,
        ContextField::Images,
    ];

    /// Maps a `document_type` from the vector index to its context slot.
    pub fn from_document_type(document_type: &str) -> Option<Self> {
        match document_type {
            "profile" | "weaknesses" | "contact" => Some(ContextField::Profile),
            "experience" => Some(ContextField::Experience),
            "skill" | "skills" => Some(ContextField::Skills),
            "project" | "projects" => Some(ContextField::Projects),
            "threejs" => Some(ContextField::Threejs),
            "education" => Some(ContextField::Education),
            "certification" | "certifications" => Some(ContextField::Certifications),
            "hobby" | "hobbies" => Some(ContextField::Hobbies),
            "social_link" | "social_links" => Some(ContextField::SocialLinks),
            "image" | "image_archive" => Some(ContextField::Images),
            _ => None,
        }
    }
}

impl RagContext {
    pub fn is_populated(&self, field: ContextField) -> bool {
        match field {
            ContextField::Profile => self.profile.is_some(),
            ContextField::Experience => !self.experience.is_empty(),
            ContextField::Skills => !self.skills.is_empty(),
            ContextField::Projects => !self.projects.is_empty(),
            ContextField::Threejs => !self.threejs.is_empty(),
            ContextField::Education => !self.education.is_empty(),
            ContextField::Certifications => !self.certifications.is_empty(),
            ContextField::Hobbies => !self.hobbies.is_empty(),
            ContextField::SocialLinks => !self.social_links.is_empty(),
            ContextField::Images => !self.images.is_empty(),
        }
    }

    pub fn populated_fields(&self) -> Vec<ContextField> {
        ContextField::ALL
            .into_iter()
            .filter(|f| self.is_populated(*f))
            .collect()
    }

    /// True when any collection (everything except the profile singleton) holds rows.
    pub fn has_collections(&self) -> bool {
        ContextField::ALL
            .into_iter()
            .any(|f| f != ContextField::Profile && self.is_populated(f))
    }

    pub fn is_empty(&self) -> bool {
        self.populated_fields().is_empty() && self.external_profiles.is_none()
    }
}

/// Live data pulled from public profile pages linked in `social_links`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalProfiles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<LinkedinNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubSnapshot {
    pub profile: Option<GithubProfile>,
    pub repos: Vec<GithubRepo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pinned_repos: Vec<GithubRepo>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubProfile {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,
    pub public_repos: u32,
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubRepo {
    pub name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// LinkedIn has no public API; the note points the visitor at the profile URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedinNote {
    pub available: bool,
    pub message: String,
}
