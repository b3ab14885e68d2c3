//! Intent classifier: maps a query and its retrieved context to a presentation tag.
//!
//! Pure apart from the injected RNG, which picks between two equally valid
//! visual variants (skill radar vs card, experience list vs timeline).

use folio_wire::PresentationTag;
use rand::Rng;

use crate::intent::rules::{detect_category, matches_any, Category, TIMELINE_HINTS};
use crate::models::context::RagContext;

/// Chooses the presentation component for one turn. Total: always returns a tag.
pub fn classify<R: Rng + ?Sized>(query: &str, context: &RagContext, rng: &mut R) -> PresentationTag {
    let query = query.to_lowercase();
    match detect_category(&query) {
        Some(category) => tag_for_category(category, &query, context, rng),
        None => fallback_tag(context, rng),
    }
}

fn tag_for_category<R: Rng + ?Sized>(
    category: Category,
    query: &str,
    context: &RagContext,
    rng: &mut R,
) -> PresentationTag {
    match category {
        Category::Greeting => PresentationTag::GreetingCard,
        Category::Contact => PresentationTag::ContactForm,
        Category::Comprehensive => PresentationTag::ProfileCard,
        Category::Image => PresentationTag::ImageCarousel,
        Category::Skill if context.skills.is_empty() => PresentationTag::SkillRadar,
        Category::Skill => skill_variant(rng),
        Category::Education => {
            data_or_text(!context.education.is_empty(), PresentationTag::EducationCard)
        }
        Category::Certification => {
            data_or_text(!context.certifications.is_empty(), PresentationTag::CertificationCard)
        }
        Category::Experience if context.experience.is_empty() => experience_variant(rng),
        Category::Experience if matches_any(query, TIMELINE_HINTS) => {
            PresentationTag::ExperienceTimeline
        }
        Category::Experience => PresentationTag::ExperienceList,
        Category::Social => {
            data_or_text(!context.social_links.is_empty(), PresentationTag::SocialLinks)
        }
        Category::Project => PresentationTag::ProjectCarousel,
        Category::Threejs => PresentationTag::ThreejsCarousel,
        Category::Weakness => data_or_text(
            context.profile.as_ref().is_some_and(|p| p.has_weaknesses()),
            PresentationTag::WeaknessesCard,
        ),
        Category::Profile => data_or_text(context.profile.is_some(), PresentationTag::ProfileCard),
        Category::Hobby => data_or_text(!context.hobbies.is_empty(), PresentationTag::HobbyCarousel),
    }
}

/// No keyword matched: show the first collection the retriever found.
fn fallback_tag<R: Rng + ?Sized>(context: &RagContext, rng: &mut R) -> PresentationTag {
    if !context.skills.is_empty() {
        skill_variant(rng)
    } else if !context.projects.is_empty() {
        PresentationTag::ProjectCarousel
    } else if !context.threejs.is_empty() {
        PresentationTag::ThreejsCarousel
    } else if !context.experience.is_empty() {
        experience_variant(rng)
    } else if context.profile.is_some() {
        PresentationTag::ProfileCard
    } else if !context.education.is_empty() {
        PresentationTag::EducationCard
    } else if !context.certifications.is_empty() {
        PresentationTag::CertificationCard
    } else if !context.hobbies.is_empty() {
        PresentationTag::HobbyCarousel
    } else if !context.social_links.is_empty() {
        PresentationTag::SocialLinks
    } else if !context.images.is_empty() {
        PresentationTag::ImageCarousel
    } else {
        PresentationTag::ChatResponse
    }
}

fn data_or_text(has_data: bool, tag: PresentationTag) -> PresentationTag {
    if has_data {
        tag
    } else {
        PresentationTag::ChatResponse
    }
}

fn skill_variant<R: Rng + ?Sized>(rng: &mut R) -> PresentationTag {
    if rng.gen_bool(0.5) {
        PresentationTag::SkillRadar
    } else {
        PresentationTag::SkillCard
    }
}

fn experience_variant<R: Rng + ?Sized>(rng: &mut R) -> PresentationTag {
    if rng.gen_bool(0.5) {
        PresentationTag::ExperienceList
    } else {
        PresentationTag::ExperienceTimeline
    }
}
