use hdc_cli::{cli, dispatch, AppConfig, CommandStatus};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

#[tokio::main]
async fn main() {
    let matches = cli::command().get_matches();
    let Some((_, args)) = matches.subcommand() else {
        std::process::exit(CommandStatus::Usage.code());
    };

    init_tracing(args.get_flag("verbose"));
    tracing::debug!(version = hdc_cli::VERSION, "hdc starting");

    let explicit = args.get_one::<PathBuf>("config").map(PathBuf::as_path);
    let config = match AppConfig::load(explicit, |name| std::env::var(name).ok()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(CommandStatus::Failure.code());
        }
    };

    let status = match dispatch(&matches, &config).await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!("command failed: {e:#}");
            CommandStatus::Failure
        }
    };
    std::process::exit(status.code());
}
