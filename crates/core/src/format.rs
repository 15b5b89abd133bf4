use crate::types::{Report, SectionStatus};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

pub fn format_report_readable(report: &Report) -> String {
    let result = &report.result;
    let mut output = String::new();

    output.push_str("# Collision report\n\n");
    output.push_str(&format!(
        "**Collision:** {} ({:.2}s) | **Window:** {:.2}s–{:.2}s | **Verdict:** {} ({:.0}% of {} samples)\n\n",
        format_timestamp(result.robust_time),
        result.robust_time,
        result.robust_window.0,
        result.robust_window.1,
        result.verdict,
        result.verdict_share() * 100.0,
        result.samples.len()
    ));
    if !result.window_contains_time() {
        output.push_str("_Note: the consensus window does not contain the consensus time._\n\n");
    }

    output.push_str("## Samples\n\n");
    for (index, sample) in result.samples.iter().enumerate() {
        output.push_str(&format!(
            "{}. t={:.2}s window={:.2}s–{:.2}s {}\n",
            index + 1,
            sample.time,
            sample.window.0,
            sample.window.1,
            sample.verdict
        ));
    }
    output.push('\n');

    output.push_str("## Sections\n\n");
    for section in &report.sections {
        let start = format_timestamp(section.start);
        let end = format_timestamp(section.end);
        output.push_str(&format!("### [{}–{}] {}\n\n", start, end, section.name.label()));

        match report.description(section.name) {
            Some(description) => match description.status {
                SectionStatus::Done if description.content.is_empty() => {
                    output.push_str("Nothing notable described.\n\n");
                }
                SectionStatus::Done => {
                    for (heading, body) in &description.content {
                        output.push_str(&format!("**{}:** {}\n", heading, body));
                    }
                    output.push('\n');
                }
                SectionStatus::Failed => {
                    output.push_str(&format!(
                        "Description failed: {}\n\n",
                        description.error_detail.as_deref().unwrap_or("unknown error")
                    ));
                }
                SectionStatus::Pending => output.push_str("Pending…\n\n"),
            },
            None => output.push_str("Pending…\n\n"),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AggregatedResult, SectionDescription, SectionName, ValidatedEstimate, Verdict,
        VideoSection,
    };

    fn report() -> Report {
        let sample = ValidatedEstimate {
            time: 12.0,
            window: (11.0, 13.0),
            verdict: Verdict::Offender,
        };
        let content = vec![
            ("Impact".to_string(), "Rear bumper contact.".to_string()),
            ("Aftermath".to_string(), "Both vehicles stop.".to_string()),
        ];
        Report {
            result: AggregatedResult {
                samples: vec![sample],
                robust_time: 12.0,
                robust_window: (11.0, 13.0),
                verdict: Verdict::Offender,
            },
            sections: [
                VideoSection {
                    name: SectionName::Ante,
                    start: 0.0,
                    end: 7.0,
                },
                VideoSection {
                    name: SectionName::Event,
                    start: 7.0,
                    end: 17.0,
                },
                VideoSection {
                    name: SectionName::Post,
                    start: 17.0,
                    end: 75.0,
                },
            ],
            descriptions: vec![
                SectionDescription::done(SectionName::Ante, Vec::new()),
                SectionDescription::done(SectionName::Event, content),
                SectionDescription::failed(SectionName::Post, "HTTP 503"),
            ],
        }
    }

    #[test]
    fn timestamps() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(75.9), "01:15");
        assert_eq!(format_timestamp(-1.0), "00:00");
    }

    #[test]
    fn readable_report_shows_every_section_and_failures() {
        let text = format_report_readable(&report());
        assert!(text.contains("**Verdict:** offender (100% of 1 samples)"));
        assert!(text.contains("[00:07–00:17]"));
        let impact = text.find("**Impact:** Rear bumper contact.").unwrap();
        let aftermath = text.find("**Aftermath:** Both vehicles stop.").unwrap();
        assert!(impact < aftermath);
        assert!(text.contains("Description failed: HTTP 503"));
        assert!(text.contains("[00:17–01:15]"));
    }
}
