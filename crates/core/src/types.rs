use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Role of the point-of-view vehicle in the collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Victim,
    Offender,
    Witness,
}

impl Verdict {
    pub const ALL: [Verdict; 3] = [Verdict::Victim, Verdict::Offender, Verdict::Witness];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Victim => "victim",
            Verdict::Offender => "offender",
            Verdict::Witness => "witness",
        }
    }

    /// Exact, case-sensitive match on the wire label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == label)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("unknown verdict '{s}'"))
    }
}

/// One oracle answer that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidatedEstimate {
    pub time: f64,
    pub window: (f64, f64),
    pub verdict: Verdict,
}

/// Consensus over every validated estimate of one run.
///
/// `robust_window` is computed independently of `robust_time`, so the time is
/// not guaranteed to fall inside the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub samples: Vec<ValidatedEstimate>,
    pub robust_time: f64,
    pub robust_window: (f64, f64),
    pub verdict: Verdict,
}

impl AggregatedResult {
    /// Fraction of samples that voted for the chosen verdict.
    pub fn verdict_share(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let votes = self
            .samples
            .iter()
            .filter(|s| s.verdict == self.verdict)
            .count();
        votes as f64 / self.samples.len() as f64
    }

    pub fn window_contains_time(&self) -> bool {
        self.robust_window.0 <= self.robust_time && self.robust_time <= self.robust_window.1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionName {
    Ante,
    Event,
    Post,
}

impl SectionName {
    pub const ALL: [SectionName; 3] = [SectionName::Ante, SectionName::Event, SectionName::Post];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::Ante => "ante",
            SectionName::Event => "event",
            SectionName::Post => "post",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SectionName::Ante => "Ante",
            SectionName::Event => "Event",
            SectionName::Post => "Post",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoSection {
    pub name: SectionName,
    pub start: f64,
    pub end: f64,
}

impl VideoSection {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// The three contiguous sections of a video, in timeline order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub ante: VideoSection,
    pub event: VideoSection,
    pub post: VideoSection,
}

impl Timeline {
    pub fn sections(&self) -> [VideoSection; 3] {
        [self.ante, self.event, self.post]
    }

    pub fn duration(&self) -> f64 {
        self.post.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    Pending,
    Done,
    Failed,
}

impl SectionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SectionStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDescription {
    pub section: SectionName,
    /// Heading → body, in the order the service wrote them.
    pub content: Vec<(String, String)>,
    pub status: SectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl SectionDescription {
    pub fn pending(section: SectionName) -> Self {
        Self {
            section,
            content: Vec::new(),
            status: SectionStatus::Pending,
            error_detail: None,
        }
    }

    pub fn done(section: SectionName, content: Vec<(String, String)>) -> Self {
        Self {
            section,
            content,
            status: SectionStatus::Done,
            error_detail: None,
        }
    }

    pub fn failed(section: SectionName, detail: impl Into<String>) -> Self {
        Self {
            section,
            content: Vec::new(),
            status: SectionStatus::Failed,
            error_detail: Some(detail.into()),
        }
    }

    pub fn heading(&self, heading: &str) -> Option<&str> {
        self.content
            .iter()
            .find(|(h, _)| h == heading)
            .map(|(_, body)| body.as_str())
    }
}

/// Everything presentation needs for one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub result: AggregatedResult,
    pub sections: [VideoSection; 3],
    pub descriptions: Vec<SectionDescription>,
}

impl Report {
    /// True once every section has reached `done` or `failed`.
    pub fn is_final(&self) -> bool {
        self.descriptions.len() == self.sections.len()
            && self.descriptions.iter().all(|d| d.status.is_terminal())
    }

    pub fn description(&self, section: SectionName) -> Option<&SectionDescription> {
        self.descriptions.iter().find(|d| d.section == section)
    }

    pub fn failed_sections(&self) -> usize {
        self.descriptions
            .iter()
            .filter(|d| d.status == SectionStatus::Failed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_labels_are_case_sensitive() {
        assert_eq!(Verdict::from_label("offender"), Some(Verdict::Offender));
        assert_eq!(Verdict::from_label("Offender"), None);
        assert_eq!("witness".parse::<Verdict>(), Ok(Verdict::Witness));
    }

    #[test]
    fn verdict_share_counts_matching_samples() {
        let sample = |verdict| ValidatedEstimate {
            time: 1.0,
            window: (0.0, 2.0),
            verdict,
        };
        let result = AggregatedResult {
            samples: vec![
                sample(Verdict::Victim),
                sample(Verdict::Victim),
                sample(Verdict::Witness),
                sample(Verdict::Victim),
            ],
            robust_time: 1.0,
            robust_window: (0.0, 2.0),
            verdict: Verdict::Victim,
        };
        assert_eq!(result.verdict_share(), 0.75);
        assert!(result.window_contains_time());
    }
}
