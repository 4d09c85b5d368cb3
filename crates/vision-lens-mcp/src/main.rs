//! Vision Lens MCP Server: entry point.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use vision_lens_mcp::config::{ConfigOptions, ServerConfig};
use vision_lens_mcp::protocol::ProtocolHandler;
use vision_lens_mcp::tools::analyze_image::{analyze, validate_image_path};
use vision_lens_mcp::tools::{ToolContext, ToolRegistry};
use vision_lens_mcp::transport::StdioTransport;
use vision_lens_mcp::types::{InitializeResult, McpError};

#[derive(Parser)]
#[command(
    name = "vision-lens-mcp",
    about = "MCP server for Vision Lens: ask a vision model what is in a local image",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// Default vision model (overrides VISION_LENS_MODEL).
    #[arg(long, global = true)]
    model: Option<String>,

    /// OpenAI-compatible API root (overrides VISION_LENS_API_BASE).
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Image profile: compact (400px, q60) or high-fidelity (1024px, q85).
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Override the profile's maximum image dimension in pixels.
    #[arg(long, global = true)]
    max_dimension: Option<u32>,

    /// Override the profile's JPEG quality (1-100).
    #[arg(long, global = true)]
    quality: Option<u8>,

    /// Vision API request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

impl From<ConfigArgs> for ConfigOptions {
    fn from(args: ConfigArgs) -> Self {
        Self {
            model: args.model,
            api_base: args.api_base,
            profile: args.profile,
            max_dimension: args.max_dimension,
            quality: args.quality,
            timeout_secs: args.timeout_secs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Analyze one image and print the answer, without starting the server.
    Analyze {
        /// Absolute path to the image.
        image_path: String,

        /// Question about the image.
        #[arg(short, long)]
        question: Option<String>,
    },

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   vision-lens-mcp completions bash > ~/.local/share/bash-completion/completions/vision-lens-mcp
    ///   vision-lens-mcp completions zsh > ~/.zfunc/_vision-lens-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = ConfigOptions::from(cli.config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = ServerConfig::resolve(&options)?;
            tracing::info!("Vision Lens MCP server");
            tracing::debug!("Config: {config:?}");
            if config.api_key().is_none() {
                tracing::warn!(
                    "{} is not set; tools/call will fail until it is",
                    vision_lens_mcp::config::API_KEY_ENV
                );
            }

            let handler = ProtocolHandler::new(ToolContext::new(config)?);
            let transport = StdioTransport::new(handler);

            tokio::select! {
                result = transport.run() => result?,
                _ = shutdown_signal() => {
                    tracing::info!("Interrupted, exiting without draining in-flight calls");
                    std::process::exit(0);
                }
            }
        }

        Commands::Analyze {
            image_path,
            question,
        } => {
            let config = ServerConfig::resolve(&options)?;
            let api_key = config
                .api_key()
                .map(str::to_string)
                .ok_or(McpError::MissingApiKey)?;
            let path = validate_image_path(Some(&image_path))?;
            let ctx = ToolContext::new(config)?;

            // --model is already the context's default model.
            let answer = analyze(&path, question.as_deref(), None, &api_key, &ctx).await?;
            println!("{answer}");
        }

        Commands::Info => {
            let capabilities = InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "vision-lens-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Resolve on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
