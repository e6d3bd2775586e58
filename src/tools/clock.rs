//! Current date and time.

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde_json::{json, Value};

use crate::error::{ParleyError, Result};
use crate::tool::{ToolArguments, ToolDescriptor, ToolHandler};

pub const NAME: &str = "get_time";

/// Clock tool. The time source is injectable so output can be pinned.
pub struct ClockTool {
    now: fn() -> DateTime<Utc>,
}

impl Default for ClockTool {
    fn default() -> Self {
        Self { now: Utc::now }
    }
}

impl ClockTool {
    pub fn with_source(now: fn() -> DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(NAME, "Get the current date and time")
            .with_parameter("timezone", "Optional timezone (default: UTC)")
    }
}

impl ToolHandler for ClockTool {
    fn call(&self, arguments: &ToolArguments) -> Result<Value> {
        let zone = arguments
            .get("timezone")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|zone| !zone.is_empty())
            .unwrap_or("UTC");
        let now = (self.now)();

        let (label, local) = match zone.to_ascii_lowercase().as_str() {
            "utc" | "gmt" | "z" => ("UTC".to_string(), now.fixed_offset()),
            "local" => (
                "local".to_string(),
                now.with_timezone(&Local).fixed_offset(),
            ),
            _ => {
                let offset = parse_offset(zone)?;
                (zone.to_string(), now.with_timezone(&offset))
            }
        };

        Ok(json!({
            "datetime": local.to_rfc3339(),
            "date": local.format("%Y-%m-%d").to_string(),
            "time": local.format("%H:%M:%S").to_string(),
            "timezone": label,
        }))
    }
}

/// Parse `+HH:MM`, `-HHMM` or `+HH`.
fn parse_offset(zone: &str) -> Result<FixedOffset> {
    let invalid = || ParleyError::InvalidArgument(format!("unsupported timezone `{zone}`"));

    let (sign, rest) = match zone.as_bytes().first() {
        Some(b'+') => (1, &zone[1..]),
        Some(b'-') => (-1, &zone[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if hours > 14 || minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pinned() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap()
    }

    #[test]
    fn defaults_to_utc() {
        let output = ClockTool::with_source(pinned).call(&ToolArguments::new()).unwrap();
        assert_eq!(output["date"], json!("2024-03-01"));
        assert_eq!(output["time"], json!("23:30:00"));
        assert_eq!(output["timezone"], json!("UTC"));
    }

    #[test]
    fn applies_fixed_offsets() {
        let mut args = ToolArguments::new();
        args.insert("timezone".into(), json!("+05:30"));
        let output = ClockTool::with_source(pinned).call(&args).unwrap();
        assert_eq!(output["date"], json!("2024-03-02"));
        assert_eq!(output["time"], json!("05:00:00"));
        assert_eq!(output["timezone"], json!("+05:30"));
    }

    #[test]
    fn rejects_unknown_zones() {
        let mut args = ToolArguments::new();
        args.insert("timezone".into(), json!("Mars/Olympus"));
        assert!(ClockTool::default().call(&args).is_err());
        assert!(parse_offset("+25:00").is_err());
        assert_eq!(parse_offset("-0800").unwrap().local_minus_utc(), -8 * 3600);
    }
}
