//! Second fan-out: one description per timeline section.

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    oracle::{InferenceRequest, Oracle, ResponseMode},
    payload::VideoPayload,
    prompts::PromptTemplates,
    types::{SectionDescription, Timeline, Verdict, VideoSection},
    validator::extract_json_object,
};

/// Parse heading→body pairs out of a description response, keeping the
/// order they were written in.
pub fn parse_description(raw: &str) -> Result<Vec<(String, String)>, String> {
    if raw.trim().is_empty() {
        return Err("empty response".to_string());
    }
    let object =
        extract_json_object(raw).ok_or_else(|| "response contains no JSON object".to_string())?;

    Ok(object
        .into_iter()
        .map(|(heading, body)| {
            let body = match body {
                Value::String(text) => text,
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                other => other.to_string(),
            };
            (heading, body)
        })
        .collect())
}

pub async fn describe_section(
    oracle: &dyn Oracle,
    video: &VideoPayload,
    prompts: &PromptTemplates,
    verdict: Verdict,
    section: VideoSection,
) -> SectionDescription {
    let request = InferenceRequest {
        prompt: prompts.render(verdict, &section),
        video: video.clone(),
        mode: ResponseMode::FreeText,
    };

    let raw = match oracle.infer(request).await {
        Ok(raw) => raw,
        Err(error) => {
            warn!(section = %section.name, error = %error, "describe request failed");
            return SectionDescription::failed(section.name, error.to_string());
        }
    };

    match parse_description(&raw) {
        Ok(content) => {
            debug!(section = %section.name, headings = content.len(), "section described");
            SectionDescription::done(section.name, content)
        }
        Err(detail) => {
            warn!(section = %section.name, reason = %detail, "section description unusable");
            SectionDescription::failed(section.name, detail)
        }
    }
}

/// Describe all three sections concurrently; a failure stays in its section.
pub async fn describe_all(
    oracle: &dyn Oracle,
    video: &VideoPayload,
    prompts: &PromptTemplates,
    timeline: &Timeline,
    verdict: Verdict,
) -> Vec<SectionDescription> {
    let requests = timeline
        .sections()
        .into_iter()
        .map(|section| describe_section(oracle, video, prompts, verdict, section));
    join_all(requests).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headings_and_flattens_lists() {
        let raw = r#"```json
{"Impact": "Front left corner.", "Vehicles": ["white van", "red hatchback"], "Speed": 40}
```"#;
        let content = parse_description(raw).unwrap();
        assert_eq!(
            content,
            vec![
                ("Impact".to_string(), "Front left corner.".to_string()),
                ("Vehicles".to_string(), "white van\nred hatchback".to_string()),
                ("Speed".to_string(), "40".to_string()),
            ]
        );
    }

    #[test]
    fn headings_keep_written_order() {
        let raw = r#"{"Conditions": "Dry.", "Camera vehicle": "Braking.", "Warning signs": "None."}"#;
        let headings: Vec<_> = parse_description(raw)
            .unwrap()
            .into_iter()
            .map(|(heading, _)| heading)
            .collect();
        assert_eq!(headings, ["Conditions", "Camera vehicle", "Warning signs"]);
    }

    #[test]
    fn empty_object_is_an_empty_description() {
        assert!(parse_description("{}").unwrap().is_empty());
    }

    #[test]
    fn prose_or_blank_is_a_failure() {
        assert_eq!(parse_description("  \n").unwrap_err(), "empty response");
        assert!(parse_description("The van pulls out without looking.").is_err());
    }
}
