use std::time::Duration;

const ROUND_THRESHOLD: Duration = Duration::from_secs(10);

/// Human duration, e.g. `120ms` or `1s 500ms`.
pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

/// Clock-style offset `HH:MM:SS.fffff`, rounded to the millisecond past
/// ten seconds.
pub fn format_timestamp(offset: Duration) -> String {
    let offset = if offset > ROUND_THRESHOLD {
        round_to_millis(offset)
    } else {
        offset
    };
    let secs = offset.as_secs();
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    let fraction = offset.subsec_nanos() / 10_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{fraction:05}")
}

fn round_to_millis(duration: Duration) -> Duration {
    let millis = (duration.as_nanos() + 500_000) / 1_000_000;
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}
