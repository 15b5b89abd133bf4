use std::path::Path;

use tokio::process::Command;

use crate::error::{DashguardError, Result};

/// Read the container duration in seconds using ffprobe
pub async fn probe_duration(video_path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(video_path)
        .output()
        .await
        .map_err(|e| DashguardError::DurationProbeFailed {
            video_path: video_path.to_path_buf(),
            reason: format!("could not run ffprobe: {e}"),
        })?;

    if !output.status.success() {
        return Err(DashguardError::DurationProbeFailed {
            video_path: video_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        DashguardError::DurationProbeFailed {
            video_path: video_path.to_path_buf(),
            reason: "ffprobe printed no usable duration".to_string(),
        }
    })
}

fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .find_map(|line| line.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}
