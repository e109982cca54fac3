//! `orderchat chat`: Run one turn and stream it to the terminal.

use std::io::Write;
use std::sync::Arc;

use orderchat_agent::{Orchestrator, StreamEvent};
use orderchat_config::AppConfig;
use orderchat_core::ui::UiBlock;
use orderchat_gateway::{TurnAction, TurnRequest, discover_tools};
use orderchat_providers::OpenAiCompatModel;
use orderchat_session::connector_for;

pub async fn run(
    message: Option<String>,
    action: Option<String>,
    params: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail early with setup instructions
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No model API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DEEPSEEK_API_KEY=sk-...");
        eprintln!("    ORDERCHAT_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let user_text = turn_request(message, action, params)?.into_user_text()?;

    let model = OpenAiCompatModel::from_config(&config.model)?;
    let connector = connector_for(&config.tool_server)?;
    let tools = discover_tools(connector.clone()).await?;
    let mut agent = Orchestrator::new(Arc::new(model), tools, connector);
    if let Some(max) = config.model.max_tokens {
        agent = agent.with_max_tokens(max);
    }

    let mut events = agent.run_stream(user_text);
    let mut stdout = std::io::stdout();

    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::TextDelta { delta } => {
                print!("{delta}");
                stdout.flush()?;
            }
            StreamEvent::Block { block } => match block {
                UiBlock::UiResource { resource_id, data } => {
                    eprintln!("  [ui_resource {resource_id}]");
                    println!("{}", serde_json::to_string_pretty(&data)?);
                }
                // Already streamed as deltas.
                UiBlock::Text { .. } => println!(),
                UiBlock::Actions { actions } => {
                    for action in actions {
                        eprintln!("  [action] {} -> {}", action.label, action.action);
                    }
                }
            },
            StreamEvent::Error { message } => {
                println!();
                return Err(message.into());
            }
            StreamEvent::Done => break,
        }
    }

    Ok(())
}

fn turn_request(
    message: Option<String>,
    action: Option<String>,
    params: Option<String>,
) -> Result<TurnRequest, Box<dyn std::error::Error>> {
    let action = match action {
        Some(name) => {
            let params = params
                .map(|p| serde_json::from_str(&p))
                .transpose()
                .map_err(|e| format!("--params must be JSON: {e}"))?;
            Some(TurnAction { name, params })
        }
        None => None,
    };
    Ok(TurnRequest { message, action })
}
