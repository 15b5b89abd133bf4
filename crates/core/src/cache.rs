use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
};

use tokio::fs;

use crate::{
    config::AnalysisConfig, consensus::VotePolicy, error::Result, payload::VideoPayload,
    provider::Provider, types::Report,
};

/// Get the cache directory for a given video
pub fn get_cache_dir(video: &VideoPayload) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    video.data_url().hash(&mut hasher);
    let video_hash = hasher.finish();

    get_root_cache_dir().join(format!("{video_hash:016x}"))
}

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("dashguard")
}

/// Everything besides the video that shapes a report.
#[derive(Debug, Clone, Copy)]
pub struct ReportKey<'a> {
    pub provider: Provider,
    pub model: &'a str,
    pub api_url: &'a str,
    pub config: &'a AnalysisConfig,
    pub duration: f64,
    pub prompts_fingerprint: u64,
}

impl ReportKey<'_> {
    fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.model.hash(&mut hasher);
        self.api_url.hash(&mut hasher);
        // Sections are rendered to one decimal, so the key uses the same precision
        format!("{:.1}", self.duration).hash(&mut hasher);
        self.prompts_fingerprint.hash(&mut hasher);
        hasher.finish()
    }
}

/// Get the path for a cached report (provider, sampling, model, endpoint,
/// duration and prompt aware)
pub fn get_report_path(cache_dir: &Path, key: &ReportKey<'_>) -> PathBuf {
    let policy = match key.config.vote_policy {
        VotePolicy::Majority => "majority".to_string(),
        VotePolicy::Supermajority { threshold } => format!("super{:.0}", threshold * 100.0),
    };
    cache_dir.join(format!(
        "report_{}_{}x_{}_{:016x}.json",
        key.provider.slug(),
        key.config.sample_count,
        policy,
        key.digest()
    ))
}

/// Load a report from a cached file
pub async fn load_report(path: &Path) -> Result<Report> {
    let json_content = fs::read_to_string(path).await?;
    let report: Report = serde_json::from_str(&json_content)?;
    Ok(report)
}

/// Save a report to a file, creating its directory if needed
pub async fn save_report(report: &Report, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    let pretty_json = serde_json::to_string_pretty(report)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_CONFIG: AnalysisConfig = AnalysisConfig {
        sample_count: 5,
        vote_policy: VotePolicy::Majority,
    };

    fn key() -> ReportKey<'static> {
        ReportKey {
            provider: Provider::OpenRouter,
            model: "google/gemini-3-flash-preview",
            api_url: "https://openrouter.ai/api/v1/chat/completions",
            config: &DEFAULT_CONFIG,
            duration: 30.0,
            prompts_fingerprint: 7,
        }
    }

    #[test]
    fn report_path_names_provider_and_sampling() {
        let dir = Path::new("/cache/abc");
        let strict = AnalysisConfig {
            sample_count: 7,
            vote_policy: VotePolicy::supermajority(),
        };
        let default = get_report_path(dir, &key());
        let gemini = get_report_path(
            dir,
            &ReportKey {
                provider: Provider::Gemini,
                config: &strict,
                ..key()
            },
        );

        let name = default.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("report_openrouter_5x_majority_"), "{name}");
        let name = gemini.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("report_gemini_7x_super60_"), "{name}");
        assert_eq!(default.parent(), Some(dir));
    }

    #[test]
    fn every_report_input_changes_the_path() {
        let dir = Path::new("/cache/abc");
        let base = get_report_path(dir, &key());

        let variants = [
            ReportKey {
                duration: 20.0,
                ..key()
            },
            ReportKey {
                model: "gemini-2.5-pro",
                ..key()
            },
            ReportKey {
                api_url: "http://localhost:8080/v1/chat/completions",
                ..key()
            },
            ReportKey {
                prompts_fingerprint: 8,
                ..key()
            },
        ];
        for variant in &variants {
            assert_ne!(get_report_path(dir, variant), base, "{variant:?}");
        }
    }

    #[test]
    fn duration_is_keyed_to_one_decimal() {
        let dir = Path::new("/cache/abc");
        let close = ReportKey {
            duration: 30.04,
            ..key()
        };
        assert_eq!(get_report_path(dir, &close), get_report_path(dir, &key()));
    }

    #[test]
    fn same_video_same_directory() {
        let a = VideoPayload::encode(b"frame data", "video/mp4");
        let b = VideoPayload::encode(b"frame data", "video/mp4");
        let c = VideoPayload::encode(b"other data", "video/mp4");
        assert_eq!(get_cache_dir(&a), get_cache_dir(&b));
        assert_ne!(get_cache_dir(&a), get_cache_dir(&c));
    }
}
