use clap::Parser;
use docket_server::ServerBuilder;
use docket_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};
use docket_server::observability;

#[derive(Parser)]
#[command(name = "docket-server")]
#[command(about = "Docket OAuth 2.1 authorization server")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML). Missing files fall back to defaults.
    #[arg(short, long, env = "DOCKET_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    // Initialize tracing early with the default level
    observability::init_tracing();

    let cli = Cli::parse();

    let cfg = match load_config(Some(&cli.config)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    observability::apply_logging_config(&cfg.logging);

    tracing::info!(
        path = %cli.config,
        issuer = %cfg.auth.issuer,
        storage = ?cfg.storage.backend,
        registration = cfg.auth.dynamic_registration_enabled,
        "Configuration loaded"
    );

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e:#}");
            std::process::exit(2);
        }
    };

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err:#}");
        std::process::exit(1);
    }
}
