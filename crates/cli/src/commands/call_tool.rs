//! `orderchat call-tool`: Call one tool through a tool session.

use orderchat_config::AppConfig;
use orderchat_core::tool::CallToolResult;
use orderchat_session::{ToolSessionClient, connector_for};
use serde_json::Value;

pub async fn run(name: String, args: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let arguments: Value = match args {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| format!("--args must be JSON: {e}"))?,
        None => serde_json::json!({}),
    };

    let client = ToolSessionClient::new(connector_for(&config.tool_server)?);
    let outcome = call(&client, &name, arguments).await;
    client.close().await?;
    let result = outcome?;

    println!("{}", result.text());
    if let Some(structured) = &result.structured_content {
        println!("{}", serde_json::to_string_pretty(structured)?);
    }
    if result.is_error {
        return Err(format!("{name} reported an error").into());
    }

    Ok(())
}

async fn call(
    client: &ToolSessionClient,
    name: &str,
    arguments: Value,
) -> Result<CallToolResult, Box<dyn std::error::Error>> {
    let tools = client.list_tools().await?;
    if !tools.iter().any(|t| t.name == name) {
        eprintln!("  Unknown tool: {name}");
        eprintln!("  Available tools:");
        for tool in &tools {
            eprintln!("    {:<20} {}", tool.name, tool.description);
        }
        return Err(format!("Unknown tool: {name}").into());
    }

    Ok(client.call_tool(name, arguments).await?)
}
