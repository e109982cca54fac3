//! `orderchat tool-server`: Serve the order tools on stdio.

use tracing::info;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!(server = orderchat_tool_server::server::SERVER_NAME, "Tool server listening on stdio");
    orderchat_tool_server::serve_stdio().await?;
    info!("Tool server input closed; exiting");
    Ok(())
}
