use clap::Parser;
use thrive_server::config::loader::{DEFAULT_CONFIG_FILE, load_config};
use thrive_server::{ServerBuilder, shutdown_tracing};

#[derive(Debug, Parser)]
#[command(name = "thrive-server", version, about = "Thrive wellness and productivity API")]
struct Cli {
    /// Path to the TOML configuration file. Without it, `thrive.toml` in the
    /// working directory is used when present.
    #[arg(short, long, env = "THRIVE_CONFIG")]
    config: Option<String>,

    /// Print the effective configuration with secrets masked and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; anything else is worth a warning
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    thrive_server::observability::init_tracing();

    let cli = Cli::parse();
    let cfg = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    if cli.print_config {
        match cfg.to_redacted_toml() {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Cannot render configuration: {e}");
                std::process::exit(2);
            }
        }
        return;
    }

    tracing::info!(
        path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_FILE),
        "Configuration loaded"
    );
    thrive_server::observability::apply_logging_level(&cfg.logging.level);

    if cfg.auth.uses_default_secret() {
        tracing::warn!("auth.jwt_secret is the development default; set THRIVE__AUTH__JWT_SECRET");
    }

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    let result = server.run().await;
    shutdown_tracing();
    if let Err(err) = result {
        eprintln!("Server error: {err}");
        std::process::exit(1);
    }
}
