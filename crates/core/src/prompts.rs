//! Prompt text for both oracle phases.

use std::{
    collections::HashMap,
    hash::{DefaultHasher, Hash, Hasher},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::{
    error::{DashguardError, Result},
    types::{SectionName, Verdict, VideoSection},
};

pub static SAMPLING_PROMPT: &str = r#"Watch the entire video. Identify the first physical contact (collision) using this definition: first frame where bodies touch. Consider sudden and heavy camera movement as a very clear indication of collision.

Identify who is at fault or the POV vehicle's role:
- "victim": POV vehicle was hit or followed all rules while another caused the crash.
- "offender": POV vehicle caused the crash or broke rules leading to it.
- "witness": POV vehicle was not involved in the crash but witnessed it.

Return ONLY JSON with:
- approx_t_s (seconds from start, to nearest 0.1s)
- window_s as [start, end] (a 2-4 second window that definitely contains first contact)
- fault ("victim", "offender", or "witness")

Example response: {"approx_t_s": 5.2, "window_s": [4.0, 7.0], "fault": "victim"}"#;

static BUILTIN_PROMPTS: &str = include_str!("../prompts/prompts.json");

pub const START_PLACEHOLDER: &str = "{{start}}";
pub const END_PLACEHOLDER: &str = "{{end}}";

/// Perspective used when the set has no entry for the verdict.
pub const DEFAULT_FALLBACK: Verdict = Verdict::Victim;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionPrompts {
    pub ante: String,
    pub event: String,
    pub post: String,
}

impl SectionPrompts {
    pub fn get(&self, section: SectionName) -> &str {
        match section {
            SectionName::Ante => &self.ante,
            SectionName::Event => &self.event,
            SectionName::Post => &self.post,
        }
    }
}

/// Describe-phase templates keyed by verdict, then by section.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    perspectives: HashMap<Verdict, SectionPrompts>,
    fallback: Verdict,
}

impl PromptTemplates {
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_PROMPTS)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json_content = fs::read_to_string(path).await?;
        Self::from_json_str(&json_content)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, SectionPrompts> = serde_json::from_str(json)?;

        let mut perspectives = HashMap::new();
        for (key, prompts) in raw {
            match Verdict::from_label(&key) {
                Some(verdict) => {
                    perspectives.insert(verdict, prompts);
                }
                None => warn!(perspective = %key, "ignoring prompts for unknown perspective"),
            }
        }

        let templates = Self {
            perspectives,
            fallback: DEFAULT_FALLBACK,
        };
        templates.validate()?;
        Ok(templates)
    }

    /// Use `fallback` for verdicts that have no prompts of their own.
    pub fn with_fallback(mut self, fallback: Verdict) -> Result<Self> {
        self.fallback = fallback;
        self.validate()?;
        Ok(self)
    }

    pub fn fallback(&self) -> Verdict {
        self.fallback
    }

    pub fn has_perspective(&self, verdict: Verdict) -> bool {
        self.perspectives.contains_key(&verdict)
    }

    /// Stable hash of every template and the fallback, for cache keys.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.fallback.hash(&mut hasher);
        for verdict in Verdict::ALL {
            let Some(prompts) = self.perspectives.get(&verdict) else {
                continue;
            };
            verdict.hash(&mut hasher);
            for section in SectionName::ALL {
                prompts.get(section).hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    fn validate(&self) -> Result<()> {
        if !self.perspectives.contains_key(&self.fallback) {
            return Err(DashguardError::invalid_config(format!(
                "prompt set has no '{}' perspective to fall back to",
                self.fallback
            )));
        }
        for (verdict, prompts) in &self.perspectives {
            for section in SectionName::ALL {
                let template = prompts.get(section);
                if !template.contains(START_PLACEHOLDER) || !template.contains(END_PLACEHOLDER) {
                    return Err(DashguardError::invalid_config(format!(
                        "{verdict}/{section} prompt must contain {} and {}",
                        START_PLACEHOLDER, END_PLACEHOLDER
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn perspective(&self, verdict: Verdict) -> &SectionPrompts {
        match self.perspectives.get(&verdict) {
            Some(prompts) => prompts,
            None => {
                warn!(%verdict, fallback = %self.fallback, "no prompts for verdict, using fallback");
                &self.perspectives[&self.fallback]
            }
        }
    }

    /// Fill the section's template with its bounds, to one decimal place.
    pub fn render(&self, verdict: Verdict, section: &VideoSection) -> String {
        self.perspective(verdict)
            .get(section.name)
            .replace(START_PLACEHOLDER, &format!("{:.1}", section.start))
            .replace(END_PLACEHOLDER, &format!("{:.1}", section.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VICTIM_ONLY: &str = r#"{
        "victim": {
            "ante": "A {{start}}-{{end}}",
            "event": "E {{start}}-{{end}}",
            "post": "P {{start}}-{{end}}"
        }
    }"#;

    #[test]
    fn builtin_set_covers_every_verdict() {
        let templates = PromptTemplates::builtin().unwrap();
        for verdict in Verdict::ALL {
            assert!(templates.has_perspective(verdict), "{verdict}");
        }
    }

    #[test]
    fn renders_bounds_to_one_decimal() {
        let templates = PromptTemplates::from_json_str(VICTIM_ONLY).unwrap();
        let section = VideoSection {
            name: SectionName::Event,
            start: 0.0,
            end: 9.74,
        };
        assert_eq!(templates.render(Verdict::Victim, &section), "E 0.0-9.7");
    }

    #[test]
    fn missing_perspective_falls_back_to_victim() {
        let templates = PromptTemplates::from_json_str(VICTIM_ONLY).unwrap();
        assert!(!templates.has_perspective(Verdict::Witness));
        let section = VideoSection {
            name: SectionName::Post,
            start: 12.0,
            end: 30.0,
        };
        assert_eq!(templates.render(Verdict::Witness, &section), "P 12.0-30.0");
    }

    #[test]
    fn fingerprint_tracks_template_text() {
        let a = PromptTemplates::from_json_str(VICTIM_ONLY).unwrap();
        let b = PromptTemplates::from_json_str(VICTIM_ONLY).unwrap();
        let edited =
            PromptTemplates::from_json_str(&VICTIM_ONLY.replace("A {{start}}", "B {{start}}"))
                .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), edited.fingerprint());
        assert_ne!(a.fingerprint(), PromptTemplates::builtin().unwrap().fingerprint());
    }

    #[test]
    fn rejects_set_without_fallback_perspective() {
        let json = r#"{"offender": {"ante": "{{start}}{{end}}", "event": "{{start}}{{end}}", "post": "{{start}}{{end}}"}}"#;
        let err = PromptTemplates::from_json_str(json).unwrap_err();
        assert!(err.is_configuration());

        let templates = PromptTemplates::from_json_str(VICTIM_ONLY).unwrap();
        assert!(templates.with_fallback(Verdict::Offender).is_err());
    }

    #[test]
    fn rejects_template_without_placeholders() {
        let json = r#"{"victim": {"ante": "no times", "event": "{{start}}{{end}}", "post": "{{start}}{{end}}"}}"#;
        assert!(PromptTemplates::from_json_str(json).is_err());
    }
}
