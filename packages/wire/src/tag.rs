use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// UI component the client renders next to the streamed answer.
///
/// Closed set: anything the server emits must be one of these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationTag {
    GreetingCard,
    ProfileCard,
    ExperienceList,
    ExperienceTimeline,
    SkillCard,
    SkillRadar,
    ProjectList,
    ProjectCarousel,
    ProjectCard,
    EducationCard,
    CertificationCard,
    WeaknessesCard,
    HobbyCarousel,
    SocialLinks,
    ImageCarousel,
    ImageGrid,
    ImageTimeline,
    ThreejsCarousel,
    ContactForm,
    /// Plain text answer with no structured component.
    #[default]
    ChatResponse,
}

impl PresentationTag {
    pub const ALL: [PresentationTag; 20] = [
        PresentationTag::GreetingCard,
        PresentationTag::ProfileCard,
        PresentationTag::ExperienceList,
        PresentationTag::ExperienceTimeline,
        PresentationTag::SkillCard,
        PresentationTag::SkillRadar,
        PresentationTag::ProjectList,
        PresentationTag::ProjectCarousel,
        PresentationTag::ProjectCard,
        PresentationTag::EducationCard,
        PresentationTag::CertificationCard,
        PresentationTag::WeaknessesCard,
        PresentationTag::HobbyCarousel,
        PresentationTag::SocialLinks,
        PresentationTag::ImageCarousel,
        PresentationTag::ImageGrid,
        PresentationTag::ImageTimeline,
        PresentationTag::ThreejsCarousel,
        PresentationTag::ContactForm,
        PresentationTag::ChatResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationTag::GreetingCard => "greeting-card",
            PresentationTag::ProfileCard => "profile-card",
            PresentationTag::ExperienceList => "experience-list",
            PresentationTag::ExperienceTimeline => "experience-timeline",
            PresentationTag::SkillCard => "skill-card",
            PresentationTag::SkillRadar => "skill-radar",
            PresentationTag::ProjectList => "project-list",
            PresentationTag::ProjectCarousel => "project-carousel",
            PresentationTag::ProjectCard => "project-card",
            PresentationTag::EducationCard => "education-card",
            PresentationTag::CertificationCard => "certification-card",
            PresentationTag::WeaknessesCard => "weaknesses-card",
            PresentationTag::HobbyCarousel => "hobby-carousel",
            PresentationTag::SocialLinks => "social-links",
            PresentationTag::ImageCarousel => "image-carousel",
            PresentationTag::ImageGrid => "image-grid",
            PresentationTag::ImageTimeline => "image-timeline",
            PresentationTag::ThreejsCarousel => "threejs-carousel",
            PresentationTag::ContactForm => "contact-form",
            PresentationTag::ChatResponse => "chat-response",
        }
    }
}

impl fmt::Display for PresentationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag(pub String);

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown presentation tag: {}", self.0)
    }
}

impl std::error::Error for UnknownTag {}

impl FromStr for PresentationTag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresentationTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}
