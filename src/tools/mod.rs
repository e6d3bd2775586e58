//! Built-in tools the agent can answer with instead of calling the model:
//! - Calculator: arithmetic expressions
//! - Weather: mock weather report
//! - Clock: current date and time
//! - Search: mock web search

pub mod calculator;
pub mod clock;
pub mod search;
pub mod weather;

pub use calculator::CalculatorTool;
pub use clock::ClockTool;
pub use search::SearchTool;
pub use weather::WeatherTool;

use crate::error::Result;
use crate::tool::ToolRegistry;

/// Registry holding every built-in tool.
pub fn builtin_toolkit() -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(WeatherTool::descriptor(), WeatherTool)?;
    registry.register(SearchTool::descriptor(), SearchTool)?;
    registry.register(CalculatorTool::descriptor(), CalculatorTool)?;
    registry.register(ClockTool::descriptor(), ClockTool::default())?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_builtins() {
        let registry = builtin_toolkit().unwrap();
        assert_eq!(
            registry.names(),
            vec!["calculator", "get_time", "get_weather", "web_search"]
        );
    }
}
