//! Weather lookup tool backed by a fixed mock report.

use chrono::Utc;
use serde_json::{json, Value};

use crate::error::{ParleyError, Result};
use crate::tool::{ToolArguments, ToolDescriptor, ToolHandler};

pub const NAME: &str = "get_weather";

pub struct WeatherTool;

impl WeatherTool {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(NAME, "Get current weather information for a location")
            .with_required_parameter(
                "location",
                "The city and state or country (e.g., 'New York, NY' or 'London, UK')",
            )
    }
}

impl ToolHandler for WeatherTool {
    fn call(&self, arguments: &ToolArguments) -> Result<Value> {
        let location = arguments
            .get("location")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|location| !location.is_empty())
            .ok_or_else(|| {
                ParleyError::InvalidArgument("`location` must be a non-empty string".into())
            })?;

        Ok(json!({
            "location": location,
            "temperature": 72,
            "unit": "F",
            "condition": "Partly Cloudy",
            "humidity": 45,
            "wind_speed": 8,
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_for_requested_location() {
        let mut args = ToolArguments::new();
        args.insert("location".into(), json!(" London, UK "));
        let report = WeatherTool.call(&args).unwrap();
        assert_eq!(report["location"], json!("London, UK"));
        assert_eq!(report["temperature"], json!(72));
    }

    #[test]
    fn rejects_blank_location() {
        let mut args = ToolArguments::new();
        args.insert("location".into(), json!("  "));
        assert!(WeatherTool.call(&args).is_err());
    }
}
