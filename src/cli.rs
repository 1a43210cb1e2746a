use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vidbundle")]
#[command(about = "Bulk video downloader that answers with a ZIP archive", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
    /// Load and validate configuration, then print it as TOML
    CheckConfig(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file (defaults to $VIDBUNDLE_CONFIG or config/vidbundle.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_args() {
        let cli = Cli::try_parse_from([
            "vidbundle",
            "server",
            "--address",
            "127.0.0.1:9000",
            "--config",
            "/etc/vidbundle.toml",
        ])
        .unwrap();

        let Commands::Server(args) = cli.command else {
            panic!("expected server command");
        };
        assert_eq!(args.address, Some("127.0.0.1:9000".parse().unwrap()));
        assert_eq!(args.config.config, Some(PathBuf::from("/etc/vidbundle.toml")));
    }

    #[test]
    fn test_check_config_defaults() {
        let cli = Cli::try_parse_from(["vidbundle", "check-config"]).unwrap();
        assert!(matches!(cli.command, Commands::CheckConfig(ConfigArgs { config: None })));
    }
}
