//! `chat` command — process one message from the command line.
//!
//! Builds the same stack the gateway serves and runs a single turn
//! against it. Handy for smoke-testing a deployment without HTTP.

use heatline_config::AppConfig;

pub async fn run(config: AppConfig, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let state = heatline_gateway::build_state(&config)?;

    let turn = state.orchestrator.run("cli", message).await;
    println!("{}", turn.final_answer);

    if !turn.tool_invocations.is_empty() {
        tracing::debug!(
            invocations = turn.tool_invocations.len(),
            "Turn executed tools"
        );
    }

    Ok(())
}
