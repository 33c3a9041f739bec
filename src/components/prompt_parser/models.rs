use crate::error::{parse_error, BotResult};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const RRULE_PREFIX: &str = "RRULE:";

const FREQUENCIES: [&str; 7] = [
    "SECONDLY", "MINUTELY", "HOURLY", "DAILY", "WEEKLY", "MONTHLY", "YEARLY",
];

const RULE_PARTS: [&str; 14] = [
    "FREQ", "UNTIL", "COUNT", "INTERVAL", "BYSECOND", "BYMINUTE", "BYHOUR", "BYDAY",
    "BYMONTHDAY", "BYYEARDAY", "BYWEEKNO", "BYMONTH", "BYSETPOS", "WKST",
];

/// Validated scheduling request extracted from a prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDescriptor {
    pub summary: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Zone the model suggested; informational only
    pub timezone: Option<String>,
    /// RFC 5545 RRULE lines, empty for one-off events
    pub recurrence: Vec<String>,
}

/// Shape the completion model is asked to return
#[derive(Debug, Deserialize)]
struct RawDescriptor {
    summary: Option<String>,
    start: Option<String>,
    end: Option<String>,
    timezone: Option<String>,
    #[serde(default)]
    recurrence: Option<RawRecurrence>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRecurrence {
    One(String),
    Many(Vec<String>),
}

impl EventDescriptor {
    /// Decode and validate the JSON object produced by the completion model
    pub fn decode(json: &str) -> BotResult<Self> {
        let raw: RawDescriptor = serde_json::from_str(json)
            .map_err(|e| parse_error(&format!("Completion response is not a valid event object: {}", e)))?;

        let summary = raw
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| parse_error("Completion response is missing 'summary'"))?;

        let start = required_wall_clock(raw.start.as_deref(), "start")?;
        let end = required_wall_clock(raw.end.as_deref(), "end")?;
        if start > end {
            return Err(parse_error(&format!(
                "Event ends ({}) before it starts ({})",
                end, start
            )));
        }

        let recurrence = match raw.recurrence {
            None => Vec::new(),
            Some(RawRecurrence::One(rule)) => normalize_recurrence(vec![rule])?,
            Some(RawRecurrence::Many(rules)) => normalize_recurrence(rules)?,
        };

        let timezone = raw
            .timezone
            .map(|tz| tz.trim().to_string())
            .filter(|tz| !tz.is_empty());

        Ok(Self {
            summary,
            start,
            end,
            timezone,
            recurrence,
        })
    }

    pub fn is_recurring(&self) -> bool {
        !self.recurrence.is_empty()
    }
}

fn required_wall_clock(value: Option<&str>, field: &str) -> BotResult<NaiveDateTime> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| parse_error(&format!("Completion response is missing '{}'", field)))?;

    parse_wall_clock(value).ok_or_else(|| {
        parse_error(&format!(
            "Invalid '{}' value '{}', expected YYYY-MM-DDTHH:MM:SS",
            field, value
        ))
    })
}

/// Parse a local date-time. An explicit offset is dropped and the wall-clock
/// reading kept.
pub fn parse_wall_clock(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = value.parse::<NaiveDateTime>() {
        return Some(dt);
    }

    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Trim, prefix and validate recurrence rules. Blank entries are dropped.
/// Applying it to its own output returns the same list.
pub fn normalize_recurrence(rules: Vec<String>) -> BotResult<Vec<String>> {
    rules
        .into_iter()
        .map(|rule| rule.trim().to_string())
        .filter(|rule| !rule.is_empty())
        .map(|rule| {
            let rule = if rule.to_ascii_uppercase().starts_with(RRULE_PREFIX) {
                format!("{}{}", RRULE_PREFIX, &rule[RRULE_PREFIX.len()..])
            } else {
                format!("{}{}", RRULE_PREFIX, rule)
            };
            validate_rrule(&rule)?;
            Ok(rule)
        })
        .collect()
}

/// Check that `rule` is a well-formed `RRULE:` line
pub fn validate_rrule(rule: &str) -> BotResult<()> {
    let invalid = |reason: &str| parse_error(&format!("Invalid recurrence rule '{}': {}", rule, reason));

    let body = rule
        .strip_prefix(RRULE_PREFIX)
        .ok_or_else(|| invalid("missing RRULE: prefix"))?;
    if body.is_empty() {
        return Err(invalid("empty rule"));
    }

    let mut seen = HashSet::new();
    let mut frequency = None;

    for part in body.split(';') {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| invalid(&format!("'{}' is not NAME=VALUE", part)))?;
        let key = key.to_ascii_uppercase();

        if value.is_empty() {
            return Err(invalid(&format!("{} has no value", key)));
        }
        if !RULE_PARTS.contains(&key.as_str()) {
            return Err(invalid(&format!("unknown rule part {}", key)));
        }
        if !seen.insert(key.clone()) {
            return Err(invalid(&format!("{} appears twice", key)));
        }

        match key.as_str() {
            "FREQ" => frequency = Some(value.to_ascii_uppercase()),
            "COUNT" | "INTERVAL" => {
                if !value.parse::<u32>().is_ok_and(|n| n > 0) {
                    return Err(invalid(&format!("{} must be a positive integer", key)));
                }
            }
            _ => {}
        }
    }

    match frequency {
        Some(freq) if FREQUENCIES.contains(&freq.as_str()) => {}
        Some(freq) => return Err(invalid(&format!("unknown frequency {}", freq))),
        None => return Err(invalid("FREQ is required")),
    }

    if seen.contains("UNTIL") && seen.contains("COUNT") {
        return Err(invalid("UNTIL and COUNT are mutually exclusive"));
    }

    Ok(())
}
