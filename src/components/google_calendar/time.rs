use crate::error::{config_error, BotResult};
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

/// Wall-clock format sent alongside a separate `timeZone` field
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Source of the zone events are created in
pub trait TimezoneSource: Send + Sync {
    fn resolve(&self) -> BotResult<Tz>;
}

/// The host's configured zone, falling back to a configured zone when the
/// host cannot tell
#[derive(Debug, Clone)]
pub struct HostTimezone {
    fallback: Tz,
}

impl HostTimezone {
    pub fn new(fallback: &str) -> BotResult<Self> {
        let fallback = parse_zone(fallback)
            .ok_or_else(|| config_error(&format!("Unknown timezone '{}'", fallback)))?;
        Ok(Self { fallback })
    }
}

impl TimezoneSource for HostTimezone {
    fn resolve(&self) -> BotResult<Tz> {
        match iana_time_zone::get_timezone() {
            Ok(name) => match parse_zone(&name) {
                Some(tz) => {
                    debug!("Resolved host timezone {}", tz);
                    Ok(tz)
                }
                None => {
                    warn!("Host timezone '{}' is not an IANA zone, using {}", name, self.fallback);
                    Ok(self.fallback)
                }
            },
            Err(e) => {
                warn!("Could not determine host timezone ({}), using {}", e, self.fallback);
                Ok(self.fallback)
            }
        }
    }
}

/// Always the same zone
#[derive(Debug, Clone, Copy)]
pub struct FixedTimezone(pub Tz);

impl TimezoneSource for FixedTimezone {
    fn resolve(&self) -> BotResult<Tz> {
        Ok(self.0)
    }
}

pub fn parse_zone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Current wall-clock time in `tz`
pub fn now_in(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

pub fn format_wall_clock(value: &NaiveDateTime) -> String {
    value.format(WALL_CLOCK_FORMAT).to_string()
}
