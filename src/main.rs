use std::sync::Arc;

use clap::Parser;
use formcoach::config::{config_schema, load_config};
use formcoach::guards::HOME;
use formcoach::startup::run;
use formcoach::utils::logger::init_logging;

#[derive(Parser, Debug)]
#[command(name = "formcoach", version, about = "FormCoach client core")]
struct Args {
    /// Print the configuration JSON schema and exit.
    #[arg(long)]
    schema: bool,

    /// Location to open once the session is known.
    #[arg(default_value = HOME)]
    path: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if args.schema {
        println!("{}", config_schema());
        return;
    }

    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Could not initialise logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config, &args.path).await {
        tracing::error!("FormCoach client stopped: {}", e);
        std::process::exit(1);
    }
}
