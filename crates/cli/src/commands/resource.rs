//! `orderchat resource`: Fetch a UI resource through the resolver.

use orderchat_config::AppConfig;
use orderchat_resolver::{HttpFetcher, UiResourceResolver};
use std::sync::Arc;

pub async fn run(id: String, base: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let resolver = match base {
        Some(base) => UiResourceResolver::new(Arc::new(HttpFetcher::new(base))),
        None => UiResourceResolver::from_config(&config.ui),
    };

    let definition = resolver.fetch(&id).await?;
    println!("{}", serde_json::to_string_pretty(definition.as_ref())?);

    Ok(())
}
