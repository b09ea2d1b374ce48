use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wabot")]
#[command(about = "WhatsApp shop bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook gateway. Credentials come from WHATSAPP_* env vars or the config file.
    Gateway {
        /// Config file path (default: WABOT_CONFIG_PATH or ~/.wabot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from PORT, config, or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Check that every required credential is configured.
    Check {
        /// Config file path (default: WABOT_CONFIG_PATH or ~/.wabot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("wabot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Check { config }) => {
            if let Err(e) = run_check(config) {
                log::error!("check failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    lib::gateway::run_gateway(config).await
}

fn run_check(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    let settings = lib::config::resolve_whatsapp(&config);
    println!("config: {}", path.display());
    println!("graph api: {}/{}", settings.api_base_url, settings.api_version);
    println!(
        "app secret: {}",
        if settings.app_secret.is_some() { "set" } else { "not set" }
    );
    if settings.verify_signature && settings.app_secret.is_none() {
        anyhow::bail!(
            "verifySignature is enabled but {} is not set",
            lib::config::ENV_APP_SECRET
        );
    }
    let credentials = settings.credentials()?;
    println!("phone id: {}", credentials.phone_id);
    println!("ok");
    Ok(())
}
