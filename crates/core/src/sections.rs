use crate::{
    error::{DashguardError, Result},
    types::{SectionName, Timeline, VideoSection},
};

/// Seconds kept on each side of the collision for the event section.
pub const EVENT_HALF_WIDTH: f64 = 5.0;

/// Split `[0, duration]` into ante/event/post around `robust_time`.
///
/// A time outside the video is clamped to `[0, duration]` first so the three
/// sections stay contiguous and never run backwards.
pub fn sectionize(robust_time: f64, duration: f64) -> Result<Timeline> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(DashguardError::InvalidDuration { duration });
    }
    let time = if robust_time.is_nan() {
        0.0
    } else {
        robust_time.clamp(0.0, duration)
    };

    let event_start = (time - EVENT_HALF_WIDTH).max(0.0);
    let event_end = (time + EVENT_HALF_WIDTH).min(duration);

    Ok(Timeline {
        ante: VideoSection {
            name: SectionName::Ante,
            start: 0.0,
            end: event_start,
        },
        event: VideoSection {
            name: SectionName::Event,
            start: event_start,
            end: event_end,
        },
        post: VideoSection {
            name: SectionName::Post,
            start: event_end,
            end: duration,
        },
    })
}
