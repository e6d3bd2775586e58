//! Web search tool returning deterministic placeholder results.

use serde_json::{json, Value};

use crate::error::{ParleyError, Result};
use crate::tool::{ToolArguments, ToolDescriptor, ToolHandler};

pub const NAME: &str = "web_search";

const DEFAULT_RESULTS: u64 = 5;
const MAX_RESULTS: u64 = 10;

pub struct SearchTool;

impl SearchTool {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(NAME, "Search the web for information")
            .with_required_parameter("query", "The search query")
            .with_parameter("num_results", "Number of results to return (default: 5)")
    }
}

impl ToolHandler for SearchTool {
    fn call(&self, arguments: &ToolArguments) -> Result<Value> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .ok_or_else(|| {
                ParleyError::InvalidArgument("`query` must be a non-empty string".into())
            })?;
        let requested = match arguments.get("num_results") {
            None | Some(Value::Null) => DEFAULT_RESULTS,
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
                ParleyError::InvalidArgument("`num_results` must be a positive integer".into())
            })?,
            Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| {
                ParleyError::InvalidArgument(format!("`num_results` is not a number: `{s}`"))
            })?,
            Some(_) => {
                return Err(ParleyError::InvalidArgument(
                    "`num_results` must be a positive integer".into(),
                ))
            }
        };

        let results: Vec<Value> = (1..=requested.min(MAX_RESULTS))
            .map(|i| {
                json!({
                    "title": format!("Result {i} for '{query}'"),
                    "url": format!("https://example.com/result{i}"),
                    "snippet": format!("This is a snippet of information related to {query}..."),
                })
            })
            .collect();

        Ok(json!({ "query": query, "results": results }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_result_count() {
        let mut args = ToolArguments::new();
        args.insert("query".into(), json!("rust"));
        let output = SearchTool.call(&args).unwrap();
        assert_eq!(output["results"].as_array().unwrap().len(), 5);

        args.insert("num_results".into(), json!(50));
        let output = SearchTool.call(&args).unwrap();
        assert_eq!(output["results"].as_array().unwrap().len(), 10);

        args.insert("num_results".into(), json!("2"));
        let output = SearchTool.call(&args).unwrap();
        assert_eq!(output["results"][1]["url"], json!("https://example.com/result2"));
    }
}
