//! Line-oriented interactive loop.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::agent::Agent;
use crate::error::Result;
use crate::llm::LanguageModel;

const EXIT_WORDS: &[&str] = &["exit", "quit", "bye"];

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Debug,
    Empty,
    Say(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if trimmed.is_empty() {
            Command::Empty
        } else if EXIT_WORDS.contains(&lowered.as_str()) {
            Command::Exit
        } else if lowered == "debug" {
            Command::Debug
        } else {
            Command::Say(trimmed.to_string())
        }
    }
}

pub async fn write_banner<M, W>(agent: &Agent<M>, output: &mut W) -> Result<()>
where
    M: LanguageModel,
    W: AsyncWrite + Unpin,
{
    let banner = format!(
        "{} initialized!\nDescription: {}\nAvailable tools: {}\nType 'exit' to quit.\n{}\n",
        agent.name(),
        agent.description(),
        agent.tools().names().join(", "),
        "-".repeat(50)
    );
    output.write_all(banner.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

/// Read lines until `exit` or end of input, answering each one.
pub async fn run<M, R, W>(agent: &mut Agent<M>, input: R, output: &mut W) -> Result<()>
where
    M: LanguageModel,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    loop {
        output.write_all(b"You: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            info!("input closed");
            break;
        };

        match Command::parse(&line) {
            Command::Exit => {
                output.write_all(b"Goodbye!\n").await?;
                info!("exit requested");
                break;
            }
            Command::Empty => continue,
            Command::Debug => {
                let report = agent.debug_report();
                output
                    .write_all(format!("\n{report}\n\n").as_bytes())
                    .await?;
            }
            Command::Say(text) => {
                let reply = agent.respond(text).await;
                output
                    .write_all(format!("\nAgent: {reply}\n\n").as_bytes())
                    .await?;
            }
        }
    }
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::router::ToolRouter;
    use crate::tools::builtin_toolkit;
    use crate::StubModel;

    fn agent(responses: Vec<&str>) -> Agent<StubModel> {
        let model = StubModel::new(responses.into_iter().map(String::from).collect());
        Agent::new(AgentConfig::default(), model)
            .unwrap()
            .with_tools(builtin_toolkit().unwrap())
            .with_router(ToolRouter::builtin().unwrap())
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("  EXIT "), Command::Exit);
        assert_eq!(Command::parse("bye"), Command::Exit);
        assert_eq!(Command::parse("debug"), Command::Debug);
        assert_eq!(Command::parse("   "), Command::Empty);
        assert_eq!(Command::parse(" hi there "), Command::Say("hi there".into()));
    }

    #[tokio::test]
    async fn exit_stops_without_touching_memory() {
        let mut agent = agent(vec![]);
        let mut output = Vec::new();

        run(&mut agent, &b"exit\nhello\n"[..], &mut output).await.unwrap();

        assert!(agent.memory().is_empty());
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn answers_lines_until_end_of_input() {
        let mut agent = agent(vec!["Hello there!"]);
        let mut output = Vec::new();

        run(&mut agent, &b"hi\n\nCalculate 15 * 24 + 7\ndebug\n"[..], &mut output)
            .await
            .unwrap();

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Agent: Hello there!"));
        assert!(printed.contains("result: 367"));
        assert!(printed.contains("Memory entries: 4"));
        assert_eq!(agent.memory().len(), 4);
    }

    #[tokio::test]
    async fn banner_lists_tools() {
        let agent = agent(vec![]);
        let mut output = Vec::new();
        write_banner(&agent, &mut output).await.unwrap();
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.starts_with("ToolUsingAssistant initialized!"));
        assert!(printed.contains("calculator, get_time, get_weather, web_search"));
    }
}
