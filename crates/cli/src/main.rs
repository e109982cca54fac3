//! orderchat CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP gateway
//! - `tool-server`: Run the order tool server on stdio
//! - `chat`: Run one turn and stream it to the terminal
//! - `call-tool`: Call a single tool through a tool session
//! - `resource`: Fetch a UI resource definition from a gateway

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "orderchat",
    about = "orderchat: an order assistant that answers with structured UI",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the order tool server on stdin/stdout
    ToolServer,

    /// Run one turn and stream the events
    Chat {
        /// The user's message
        #[arg(short, long, conflicts_with = "action", required_unless_present = "action")]
        message: Option<String>,

        /// Name of a UI action to send instead of a message
        #[arg(long)]
        action: Option<String>,

        /// JSON parameters for the action
        #[arg(long, requires = "action")]
        params: Option<String>,
    },

    /// Call one tool and print its result
    CallTool {
        /// Tool name (e.g. get_orders)
        name: String,

        /// JSON arguments
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Fetch a UI resource definition through a gateway
    Resource {
        /// Resource id (e.g. order_table)
        id: String,

        /// Gateway base URL (defaults to ui.api_base)
        #[arg(long)]
        base: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if matches!(cli.command, Commands::ToolServer) {
        // Stdout carries the protocol.
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::ToolServer => commands::tool_server::run().await?,
        Commands::Chat {
            message,
            action,
            params,
        } => commands::chat::run(message, action, params).await?,
        Commands::CallTool { name, args } => commands::call_tool::run(name, args).await?,
        Commands::Resource { id, base } => commands::resource::run(id, base).await?,
    }

    Ok(())
}
