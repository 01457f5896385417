//! Interactive chat against an OpenAI-compatible endpoint.
//!
//! ```text
//! CAREERFLOW_API_KEY=sk-... RUST_LOG=careerflow_agent=debug \
//!     cargo run -p careerflow-agent --example career_chat
//! ```

use std::io::Write;

use careerflow_agent::prelude::*;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = ModelConfig::from_env()?;
    println!("careerflow chat ({}), empty line to quit\n", config.model_name);
    let orchestrator = Orchestrator::from_config(config)?;

    let session_id = format!("cli-{}", std::process::id());
    let mut history: Vec<Message> = Vec::new();
    let mut workflow_state: Option<WorkflowState> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(query) = lines.next_line().await? else {
            break;
        };
        let query = query.trim().to_string();
        if query.is_empty() {
            break;
        }

        let request = TurnRequest::new(query.clone(), session_id.clone())
            .with_history(history.clone())
            .with_workflow_state(workflow_state.clone());
        let mut chunks = orchestrator.handle_turn(request).await;

        let mut reply = String::new();
        let mut next_state = None;
        while let Some(chunk) = chunks.next().await {
            print!("{}", chunk.content);
            std::io::stdout().flush()?;
            reply.push_str(&chunk.content);
            if chunk.finished {
                next_state = chunk.workflow_state;
            }
        }
        println!("\n");

        if let Some(state) = &next_state {
            println!("[{} · {} · {}]\n", state.workflow_id, state.phase, state.progress);
        }
        history.push(Message::user(query));
        history.push(Message::assistant(reply));
        workflow_state = next_state;
    }

    Ok(())
}
