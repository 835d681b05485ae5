//! Parsing of ffmpeg's `-progress pipe:2` output.
//!
//! ffmpeg first prints its banner (which contains `Duration: HH:MM:SS.ss`
//! for the input) and then emits `key=value` blocks, each terminated by a
//! `progress=continue` or `progress=end` line.

/// Parse an ffmpeg banner line of the form
/// `  Duration: 00:01:23.45, start: 0.000000, bitrate: 1411 kb/s`
/// into seconds.
pub fn parse_duration(line: &str) -> Option<f64> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    let stamp = rest.trim_start().split(',').next()?.trim();
    if stamp == "N/A" {
        return None;
    }

    let mut parts = stamp.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Incremental progress tracker fed one stderr line at a time.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    duration_secs: Option<f64>,
    last_out_time_us: Option<i64>,
}

impl FfmpegProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a line. Returns the completion fraction in `[0, 1]` at the end
    /// of each progress block when the source duration is known.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        let line = line.trim();

        if self.duration_secs.is_none() {
            if let Some(d) = parse_duration(line) {
                self.duration_secs = Some(d);
                return None;
            }
        }

        if let Some(val) = line.strip_prefix("out_time_us=") {
            self.last_out_time_us = val.trim().parse::<i64>().ok();
            return None;
        }

        let status = line.strip_prefix("progress=")?;
        if status == "end" {
            return Some(1.0);
        }

        let dur = self.duration_secs.filter(|d| *d > 0.0)?;
        let out_us = self.last_out_time_us?;
        let elapsed_secs = out_us as f64 / 1_000_000.0;
        Some((elapsed_secs / dur).clamp(0.0, 1.0))
    }
}
