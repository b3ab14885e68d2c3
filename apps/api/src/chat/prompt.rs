//! Prompt Assembler: persona settings plus retrieved context into one system prompt.

use folio_wire::PresentationTag;

use crate::models::context::RagContext;
use crate::models::resume::AiSetting;

/// Persona knobs stored as key/value rows in `resume.ai_settings`.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaSettings {
    pub owner_name: String,
    pub personality: String,
    pub speaking_style: String,
    pub fallback_message: String,
    pub greeting: String,
    pub language: String,
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            owner_name: "the site owner".to_string(),
            personality: "A friendly, curious software engineer who enjoys building for the web."
                .to_string(),
            speaking_style: "Polite but warm, professional without being stiff.".to_string(),
            fallback_message:
                "Hmm, I can't answer that one yet. Feel free to ask me about something else!"
                    .to_string(),
            greeting: "Hi! Thanks for stopping by my portfolio. Nice to meet you!".to_string(),
            language: "the visitor's language".to_string(),
        }
    }
}

impl PersonaSettings {
    /// Unknown keys are ignored; missing keys keep their defaults.
    pub fn from_rows(rows: &[AiSetting]) -> Self {
        let mut settings = Self::default();
        for row in rows {
            let value = row.setting_value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match row.setting_key.as_str() {
                "owner_name" => &mut settings.owner_name,
                "personality" => &mut settings.personality,
                "speaking_style" => &mut settings.speaking_style,
                "fallback_message" => &mut settings.fallback_message,
                "greeting" => &mut settings.greeting,
                "language" => &mut settings.language,
                _ => continue,
            };
            *slot = value.to_string();
        }
        settings
    }
}

const DIVIDER: &str = "═══════════════════════════════════════";

fn section(title: &str, body: &str) -> String {
    format!("{DIVIDER}\n[{title}]\n{DIVIDER}\n{body}\n")
}

pub fn build_system_prompt(
    settings: &PersonaSettings,
    context: &RagContext,
    component: PresentationTag,
    history_summary: &str,
) -> String {
    let owner = &settings.owner_name;
    let mut prompt = format!(
        "You are \"{owner}\". You are talking directly with a visitor of your portfolio site.\n\n"
    );

    if !history_summary.is_empty() {
        prompt.push_str(history_summary);
        prompt.push_str("\n\n");
    }

    prompt.push_str(&section(
        "Identity",
        &format!(
            "- You are not an AI or an assistant. You are {owner}.\n\
             - Always speak in the first person (I, me, my).\n\
             - Never refer to yourself in the third person."
        ),
    ));

    let mut about = settings.personality.clone();
    if let Some(profile) = &context.profile {
        if let Some(bio) = &profile.detailed_bio {
            about.push_str(&format!("\n\n[Detailed introduction]\n{bio}"));
        }
        if let Some(traits) = &profile.ai_personality_data {
            let traits = serde_json::to_string_pretty(traits).unwrap_or_default();
            about.push_str(&format!("\n\n[Personality data (reference)]\n{traits}"));
        }
    }
    prompt.push_str(&section("Personality and background", &about));
    prompt.push_str(&section("Speaking style", &settings.speaking_style));

    prompt.push_str(&section(
        "Situational guide",
        &format!(
            "- Greeting or first visit: welcome them warmly, in the spirit of \"{greeting}\"\n\
             - Tech stack: explain from experience, favouring the skills with the highest proficiency\n\
             - Projects: share why they were built, what was hard and what was learned; recent ones first\n\
             - Career: growth at each company, what was built and how problems were solved; recent first\n\
             - Contact or collaboration: invite them to reach out and share email, LinkedIn and GitHub links\n\
             - GitHub: when externalProfiles.github is present, cite real repositories, stars and languages\n\
             - LinkedIn: point them at the profile URL\n\
             - Images: mention that the archive is being shown\n\
             - Unknown topics: say so honestly and suggest another topic or direct contact",
            greeting = settings.greeting
        ),
    ));

    prompt.push_str(&section(
        "Answer rules",
        &format!(
            "1. Only use the data provided under [My data].\n\
             2. If asked for something not in the data, answer: \"{fallback}\"\n\
             3. Never guess or make things up.\n\
             4. Keep it natural and conversational; 3-5 sentences unless detail is requested.\n\
             5. Use emoji rarely.\n\
             6. Reply in {language}.",
            fallback = settings.fallback_message,
            language = settings.language
        ),
    ));

    let allowed: Vec<&str> = PresentationTag::ALL.iter().map(|t| t.as_str()).collect();
    prompt.push_str(&section(
        "UI component",
        &format!(
            "Selected component: {component}\n\
             Allowed components: {}\n\
             The component is rendered automatically next to your answer. Do not describe \
             what it already shows and do not claim you can display images yourself.",
            allowed.join(", ")
        ),
    ));

    if !context.is_empty() {
        let snapshot = serde_json::to_string_pretty(context).unwrap_or_default();
        prompt.push_str(&format!(
            "\n[My data - answer strictly from this]\n{snapshot}\n"
        ));
    }

    prompt
}
