mod cli;

use clap::Parser;
use cli::{Cli, Commands, ConfigArgs};
use vidbundle::config::Config;
use vidbundle::{api, observability};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    observability::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let config = load_config(&args.config)?;
            let address = args.address.unwrap_or(config.server.bind_addr);
            api::run(config, address).await?
        }
        Commands::CheckConfig(args) => {
            let config = load_config(&args)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(args: &ConfigArgs) -> Result<Config, AnyError> {
    let config = match &args.config {
        Some(path) => Config::load_with_env(path.clone())?,
        None => Config::load()?,
    };
    Ok(config)
}
