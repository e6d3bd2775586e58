//! Keyword routing from raw user text to a tool call.
//!
//! Matching is deliberately naive: a rule fires when one of its keywords (or
//! the tool's own name) appears as a whole word, and arguments are pulled out
//! with simple patterns. Ambiguous input can pick the wrong tool.

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::tool::{ToolCall, ToolRegistry};
use crate::tools::{calculator, clock, search, weather};

const TRAILING_PUNCTUATION: &[char] = &['.', '!', '?', ',', ';', ':', ' '];

#[derive(Debug, Clone)]
enum Extraction {
    /// Longest run of arithmetic characters containing a digit.
    Expression { key: String, run: Regex },
    /// First capture group of `pattern`.
    Capture { key: String, pattern: Regex },
}

impl Extraction {
    fn apply(&self, text: &str, call: &mut ToolCall) {
        match self {
            Extraction::Expression { key, run } => {
                let longest = run
                    .find_iter(text)
                    .map(|m| m.as_str().trim())
                    .filter(|candidate| candidate.chars().any(|c| c.is_ascii_digit()))
                    .max_by_key(|candidate| candidate.len());
                if let Some(expression) = longest {
                    call.arguments
                        .insert(key.clone(), Value::String(expression.to_string()));
                }
            }
            Extraction::Capture { key, pattern } => {
                let captured = pattern
                    .captures(text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().trim().trim_end_matches(TRAILING_PUNCTUATION))
                    .filter(|value| !value.is_empty());
                if let Some(value) = captured {
                    call.arguments
                        .insert(key.clone(), Value::String(value.to_string()));
                }
            }
        }
    }
}

/// Maps text to one tool.
#[derive(Debug, Clone)]
pub struct RouteRule {
    tool: String,
    triggers: Vec<Regex>,
    extractions: Vec<Extraction>,
}

impl RouteRule {
    /// A rule for `tool` that fires on any of `keywords` or on the tool name.
    pub fn new(tool: impl Into<String>, keywords: &[&str]) -> Result<Self> {
        let tool = tool.into();
        let alternatives = keywords
            .iter()
            .copied()
            .chain(std::iter::once(tool.as_str()))
            .map(|word| {
                word.split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .collect::<Vec<_>>()
            .join("|");
        let trigger = Regex::new(&format!(r"(?i)\b(?:{alternatives})\b"))?;
        Ok(Self {
            tool,
            triggers: vec![trigger],
            extractions: Vec::new(),
        })
    }

    /// Also fire when `pattern` matches.
    pub fn with_trigger(mut self, pattern: &str) -> Result<Self> {
        self.triggers.push(Regex::new(pattern)?);
        Ok(self)
    }

    /// Fill `key` with the first capture group of `pattern`.
    pub fn with_capture(mut self, key: impl Into<String>, pattern: &str) -> Result<Self> {
        self.extractions.push(Extraction::Capture {
            key: key.into(),
            pattern: Regex::new(pattern)?,
        });
        Ok(self)
    }

    /// Fill `key` with the arithmetic expression found in the text.
    pub fn with_expression(mut self, key: impl Into<String>) -> Result<Self> {
        self.extractions.push(Extraction::Expression {
            key: key.into(),
            run: Regex::new(r"[0-9.\s+\-*/%^()]+")?,
        });
        Ok(self)
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn matches(&self, text: &str) -> bool {
        self.triggers.iter().any(|trigger| trigger.is_match(text))
    }

    fn extract(&self, text: &str) -> ToolCall {
        let mut call = ToolCall::new(&self.tool);
        for extraction in &self.extractions {
            extraction.apply(text, &mut call);
        }
        call
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolRouter {
    rules: Vec<RouteRule>,
}

impl ToolRouter {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Rules for the built-in toolkit, checked in order: calculator,
    /// weather, time, search.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new()
            .with_rule(
                RouteRule::new(
                    calculator::NAME,
                    &["calculate", "compute", "evaluate", "calc"],
                )?
                .with_trigger(r"\d\s*(?:\*\*|[-+*/%^])\s*[(\d.]")?
                .with_expression("expression")?,
            )
            .with_rule(
                RouteRule::new(weather::NAME, &["weather", "forecast", "temperature"])?
                    .with_capture("location", r"(?i)\b(?:in|for|at)\s+([^?!]+)")?,
            )
            .with_rule(
                RouteRule::new(clock::NAME, &["time", "date", "clock", "today"])?.with_capture(
                    "timezone",
                    r"(?i)(?:^|\s)(utc|gmt|local|[+-]\d{1,2}(?::?\d{2})?)(?:$|[\s?.!,])",
                )?,
            )
            .with_rule(
                RouteRule::new(search::NAME, &["search", "look up"])?.with_capture(
                    "query",
                    r"(?i)\b(?:web_search|search(?:\s+the\s+web)?(?:\s+for)?|look\s+up)\s+(.+)",
                )?,
            ))
    }

    pub fn with_rule(mut self, rule: RouteRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// First rule that matches `text` and whose tool is registered.
    pub fn route(&self, text: &str, registry: &ToolRegistry) -> Option<ToolCall> {
        let rule = self
            .rules
            .iter()
            .filter(|rule| registry.contains(rule.tool()))
            .find(|rule| rule.matches(text))?;
        let call = rule.extract(text);
        debug!(tool = %call.name, arguments = ?call.arguments, "routed input to tool");
        Some(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin_toolkit;
    use serde_json::json;

    fn route(text: &str) -> Option<ToolCall> {
        let registry = builtin_toolkit().unwrap();
        ToolRouter::builtin().unwrap().route(text, &registry)
    }

    #[test]
    fn extracts_arithmetic_expression() {
        let call = route("Calculate 15 * 24 + 7").unwrap();
        assert_eq!(call.name, "calculator");
        assert_eq!(call.arguments["expression"], json!("15 * 24 + 7"));

        let call = route("what is (2 + 3) * 4?").unwrap();
        assert_eq!(call.name, "calculator");
        assert_eq!(call.arguments["expression"], json!("(2 + 3) * 4"));
    }

    #[test]
    fn calculator_keyword_without_expression_leaves_argument_out() {
        let call = route("calculate my taxes").unwrap();
        assert_eq!(call.name, "calculator");
        assert!(call.arguments.get("expression").is_none());
    }

    #[test]
    fn extracts_weather_location() {
        let call = route("What's the weather like in London, UK?").unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.arguments["location"], json!("London, UK"));

        let call = route("weather please").unwrap();
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn extracts_optional_timezone() {
        let call = route("What time is it?").unwrap();
        assert_eq!(call.name, "get_time");
        assert!(call.arguments.get("timezone").is_none());

        let call = route("what's the time in +05:30?").unwrap();
        assert_eq!(call.arguments["timezone"], json!("+05:30"));
    }

    #[test]
    fn extracts_search_query() {
        let call = route("search for rust borrow checker tips").unwrap();
        assert_eq!(call.name, "web_search");
        assert_eq!(call.arguments["query"], json!("rust borrow checker tips"));
    }

    #[test]
    fn matches_whole_words_only() {
        assert!(route("Tell me a story about sometimes").is_none());
        assert!(route("Hello there").is_none());
    }

    #[test]
    fn tool_name_triggers_its_rule() {
        let call = route("use get_weather at Paris").unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.arguments["location"], json!("Paris"));
    }

    #[test]
    fn skips_rules_for_unregistered_tools() {
        let router = ToolRouter::builtin().unwrap();
        assert!(router.route("Calculate 1 + 1", &ToolRegistry::new()).is_none());
    }
}
