//! Runs a few turns against a scripted model so the tool routing can be
//! tried without an API key.

use parley::{builtin_toolkit, Agent, AgentConfig, StubModel, ToolRouter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> parley::Result<()> {
    let model = StubModel::new(vec![
        "Rust is a systems programming language focused on safety.".into(),
    ]);
    let mut agent = Agent::new(AgentConfig::default(), model)?
        .with_tools(builtin_toolkit()?)
        .with_router(ToolRouter::builtin()?);
    agent.remember("The user is learning Rust.", "cookbook", 7)?;

    for input in [
        "Calculate 15 * 24 + 7",
        "What's the weather in Oslo?",
        "What time is it in +09:00?",
        "Tell me about Rust",
    ] {
        println!("You: {input}");
        println!("Agent: {}\n", agent.respond(input).await);
    }

    println!("{}", agent.debug_report());
    Ok(())
}
