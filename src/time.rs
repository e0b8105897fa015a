use std::fmt;
use std::sync::LazyLock;

use chrono::{Local, Timelike};
use regex::Regex;
use serde::Serialize;

/// `hour:minute[:second]`, one or two hour digits and exactly two minute digits.
static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,2}):([0-9]{2})(?::[0-9]{2})?$").unwrap());

/// Coarse part of the day a dose time falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeLabel {
    Morning,
    Afternoon,
    Evening,
    Night,
    Unrecognized,
}

impl TimeLabel {
    /// Half-open buckets: `[5, 12)`, `[12, 17)`, `[17, 19)`, everything else is night.
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeLabel::Morning,
            12..=16 => TimeLabel::Afternoon,
            17..=18 => TimeLabel::Evening,
            _ => TimeLabel::Night,
        }
    }
}

impl fmt::Display for TimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeLabel::Morning => "Morning",
            TimeLabel::Afternoon => "Afternoon",
            TimeLabel::Evening => "Evening",
            TimeLabel::Night => "Night",
            TimeLabel::Unrecognized => "Unrecognized",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeClassification {
    pub label: TimeLabel,
    /// `H:MM` with the hour's leading zero dropped, or the input unchanged.
    pub normalized: String,
}

/// Classify a `HH:MM` or `HH:MM:SS` string into a daypart and a display form.
///
/// Never fails: anything that does not look like a clock time comes back as
/// `Unrecognized` with the original text, and hours past 23 fall into `Night`.
pub fn classify_time(time_text: &str) -> TimeClassification {
    let Some(caps) = CLOCK_RE.captures(time_text) else {
        return TimeClassification {
            label: TimeLabel::Unrecognized,
            normalized: time_text.to_string(),
        };
    };

    // At most two ASCII digits, always fits.
    let hour: u32 = caps[1].parse().unwrap_or_default();
    let minute = &caps[2];

    TimeClassification {
        label: TimeLabel::for_hour(hour),
        normalized: format!("{}:{}", hour, minute),
    }
}

/// Parse time string in HH:MM format or named time (morning, noon, etc.)
/// Accepts flexible formats:
/// - Named times: "morning", "noon", "evening", etc.
/// - Clock format: "08:00", "8:00", "08:00:00" (seconds are ignored)
/// - Hour only: "8", "08" (defaults to :00)
///
/// Unlike `classify_time`, out-of-range hours and minutes are rejected.
pub fn parse_time(time_str: &str) -> Option<(u32, u32)> {
    let trimmed = time_str.trim();

    let time_lower = trimmed.to_lowercase();
    let named_time = match time_lower.as_str() {
        "morning" | "breakfast" => Some((8, 0)),
        "midmorning" | "mid-morning" => Some((10, 0)),
        "noon" | "midday" | "lunch" => Some((12, 0)),
        "afternoon" => Some((15, 0)),
        "evening" | "dinner" => Some((18, 0)),
        "night" | "bedtime" => Some((21, 0)),
        "midnight" => Some((0, 0)),
        _ => None,
    };

    if let Some(time) = named_time {
        return Some(time);
    }

    if let Some(caps) = CLOCK_RE.captures(trimmed) {
        let hour = caps[1].parse::<u32>().ok()?;
        let minute = caps[2].parse::<u32>().ok()?;

        if hour >= 24 || minute >= 60 {
            return None;
        }

        return Some((hour, minute));
    }

    // "8" means "08:00"
    if trimmed.len() <= 2 && !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let hour = trimmed.parse::<u32>().ok()?;
        if hour >= 24 {
            return None;
        }
        return Some((hour, 0));
    }

    None
}

/// Normalize user input into the `HH:MM:SS` form medications are stored with.
pub fn to_storage_time(time_str: &str) -> Option<String> {
    let (hour, minute) = parse_time(time_str)?;
    Some(format!("{:02}:{:02}:00", hour, minute))
}

/// Check if the current local time is at or past the scheduled time
pub fn is_time_due(scheduled_time: &str) -> bool {
    let now = Local::now();
    is_due_at(scheduled_time, now.hour(), now.minute())
}

fn is_due_at(scheduled_time: &str, current_hour: u32, current_min: u32) -> bool {
    let Some((scheduled_hour, scheduled_min)) = parse_time(scheduled_time) else {
        return false;
    };

    current_hour > scheduled_hour
        || (current_hour == scheduled_hour && current_min >= scheduled_min)
}
