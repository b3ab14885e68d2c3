//! Text renderings of resume rows for the embedding index.
//!
//! Each row becomes one labelled, line-per-field document. Optional fields are
//! left out when empty; the fields that identify a row are always present.

use std::fmt::Display;

use serde_json::json;

use crate::indexing::SourceDocument;
use crate::models::context::RagContext;
use crate::models::resume::{
    Certification, Education, Experience, Hobby, ImageArchive, Profile, Project, Skill,
    SocialLink, ThreejsWork,
};

fn push_field(lines: &mut Vec<String>, label: &str, value: Option<impl Display>) {
    if let Some(value) = value {
        let value = value.to_string();
        if !value.trim().is_empty() {
            lines.push(format!("{label}: {value}"));
        }
    }
}

fn joined(values: &Option<Vec<String>>) -> Option<String> {
    values
        .as_ref()
        .filter(|v| !v.is_empty())
        .map(|v| v.join(", "))
}

pub fn build_profile_text(profile: &Profile) -> String {
    let mut lines = vec![format!("Name: {}", profile.full_name)];
    push_field(&mut lines, "Title", profile.title.as_deref());
    push_field(&mut lines, "Bio", profile.bio.as_deref());
    push_field(&mut lines, "Detailed bio", profile.detailed_bio.as_deref());
    push_field(&mut lines, "Location", profile.location.as_deref());
    push_field(&mut lines, "Areas to improve", joined(&profile.weaknesses));
    lines.join("\n")
}

pub fn build_experience_text(exp: &Experience) -> String {
    let mut lines = vec![
        format!("Company: {}", exp.company_name),
        format!("Position: {}", exp.position),
    ];
    push_field(&mut lines, "Description", exp.description.as_deref());
    push_field(&mut lines, "Location", exp.location.as_deref());
    let end = exp
        .end_date
        .map_or_else(|| "present".to_string(), |d| d.to_string());
    lines.push(format!("Period: {} ~ {end}", exp.start_date));
    lines.join("\n")
}

/// Skills are short, so one line each.
pub fn build_skill_text(skill: &Skill) -> String {
    let mut parts = vec![
        format!("Skill: {}", skill.name),
        format!("Category: {}", skill.category),
    ];
    push_field(
        &mut parts,
        "Proficiency",
        skill.proficiency.filter(|p| *p > 0).map(|p| format!("{p}/5")),
    );
    parts.join(", ")
}

pub fn build_project_text(project: &Project) -> String {
    let mut lines = vec![format!("Project: {}", project.title)];
    push_field(&mut lines, "Description", project.description.as_deref());
    push_field(&mut lines, "Tech stack", joined(&project.tech_stack));
    push_field(&mut lines, "Highlights", joined(&project.highlights));
    push_field(&mut lines, "Started", project.start_date);
    push_field(&mut lines, "Ended", project.end_date);
    lines.join("\n")
}

pub fn build_threejs_text(work: &ThreejsWork) -> String {
    let mut lines = vec![format!("3D work: {}", work.title)];
    push_field(&mut lines, "Description", work.description.as_deref());
    push_field(&mut lines, "URL", work.url.as_deref());
    lines.join("\n")
}

pub fn build_education_text(edu: &Education) -> String {
    let mut lines = vec![format!("School: {}", edu.school_name)];
    push_field(&mut lines, "Degree", edu.degree.as_deref());
    push_field(&mut lines, "Major", edu.major.as_deref());
    push_field(&mut lines, "Description", edu.description.as_deref());
    push_field(&mut lines, "Started", edu.start_date);
    push_field(&mut lines, "Graduated", edu.end_date);
    lines.join("\n")
}

pub fn build_certification_text(cert: &Certification) -> String {
    let mut lines = vec![format!("Certification: {}", cert.title)];
    push_field(&mut lines, "Issuer", cert.issuer.as_deref());
    push_field(&mut lines, "Description", cert.description.as_deref());
    push_field(&mut lines, "Issued", cert.issue_date);
    push_field(&mut lines, "Expires", cert.expiry_date);
    lines.join("\n")
}

pub fn build_hobby_text(hobby: &Hobby) -> String {
    let mut lines = vec![format!("Hobby: {}", hobby.title)];
    push_field(&mut lines, "Description", hobby.description.as_deref());
    lines.join("\n")
}

pub fn build_social_link_text(link: &SocialLink) -> String {
    format!("Platform: {}\nURL: {}", link.platform, link.url)
}

pub fn build_image_text(image: &ImageArchive) -> String {
    let mut lines = vec![format!("Title: {}", image.title)];
    push_field(&mut lines, "Description", image.description.as_deref());
    lines.push(format!("Year: {}", image.year));
    push_field(&mut lines, "Month", image.month);
    push_field(&mut lines, "Tags", joined(&image.tags));
    push_field(&mut lines, "Category", image.category.as_deref());
    lines.join("\n")
}

/// `None` when the profile lists no weaknesses.
pub fn build_weaknesses_text(profile: &Profile) -> Option<String> {
    let weaknesses = joined(&profile.weaknesses)?;
    let mut lines = vec![format!("Areas to improve: {weaknesses}")];
    push_field(&mut lines, "Details", profile.detailed_bio.as_deref());
    Some(lines.join("\n"))
}

/// `None` when there is no way to reach the owner.
pub fn build_contact_text(profile: &Profile, links: &[SocialLink]) -> Option<String> {
    let mut lines = Vec::new();
    push_field(&mut lines, "Email", profile.email.as_deref());
    push_field(&mut lines, "Phone", profile.phone.as_deref());
    push_field(&mut lines, "Location", profile.location.as_deref());
    let socials: Vec<String> = links
        .iter()
        .map(|l| format!("{}: {}", l.platform, l.url))
        .collect();
    push_field(&mut lines, "Social links", Some(socials.join(", ")));
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Every indexable document in `data`, in a stable order.
pub fn build_documents(data: &RagContext) -> Vec<SourceDocument> {
    let mut docs = Vec::new();

    if let Some(profile) = &data.profile {
        docs.push(SourceDocument::new(
            "profile",
            profile.id,
            build_profile_text(profile),
            json!({ "full_name": profile.full_name, "title": profile.title }),
        ));
        if let Some(text) = build_weaknesses_text(profile) {
            let count = profile.weaknesses.as_ref().map_or(0, Vec::len);
            docs.push(SourceDocument::new(
                "weaknesses",
                profile.id,
                text,
                json!({ "weakness_count": count }),
            ));
        }
        if let Some(text) = build_contact_text(profile, &data.social_links) {
            docs.push(SourceDocument::new(
                "contact",
                profile.id,
                text,
                json!({
                    "has_email": profile.email.is_some(),
                    "has_phone": profile.phone.is_some(),
                    "social_link_count": data.social_links.len(),
                }),
            ));
        }
    }

    docs.extend(data.experience.iter().map(|e| {
        SourceDocument::new(
            "experience",
            e.id,
            build_experience_text(e),
            json!({ "company_name": e.company_name, "position": e.position }),
        )
    }));
    docs.extend(data.skills.iter().map(|s| {
        SourceDocument::new(
            "skill",
            s.id,
            build_skill_text(s),
            json!({ "name": s.name, "category": s.category }),
        )
    }));
    docs.extend(data.projects.iter().map(|p| {
        SourceDocument::new(
            "project",
            p.id,
            build_project_text(p),
            json!({ "title": p.title, "tech_stack": p.tech_stack }),
        )
    }));
    docs.extend(data.threejs.iter().map(|w| {
        SourceDocument::new(
            "threejs",
            w.id,
            build_threejs_text(w),
            json!({ "title": w.title, "url": w.url }),
        )
    }));
    docs.extend(data.education.iter().map(|e| {
        SourceDocument::new(
            "education",
            e.id,
            build_education_text(e),
            json!({ "school_name": e.school_name, "degree": e.degree }),
        )
    }));
    docs.extend(data.certifications.iter().map(|c| {
        SourceDocument::new(
            "certification",
            c.id,
            build_certification_text(c),
            json!({ "title": c.title, "issuer": c.issuer }),
        )
    }));
    docs.extend(data.hobbies.iter().map(|h| {
        SourceDocument::new("hobby", h.id, build_hobby_text(h), json!({ "title": h.title }))
    }));
    docs.extend(data.social_links.iter().map(|l| {
        SourceDocument::new(
            "social_link",
            l.id,
            build_social_link_text(l),
            json!({ "platform": l.platform }),
        )
    }));
    docs.extend(data.images.iter().map(|i| {
        SourceDocument::new(
            "image_archive",
            i.id,
            build_image_text(i),
            json!({ "title": i.title, "year": i.year, "category": i.category }),
        )
    }));

    docs
}
