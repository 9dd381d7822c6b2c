use clap::Parser;
use valhalla_dal::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config = cli::init(&args);

    let result = match args.command {
        Command::Migrate => cli::migrate::run(&config).await,
        Command::User(command) => {
            let repositories = cli::repositories(&config).await?;
            cli::user::run(&repositories, command).await
        }
        Command::Device(command) => {
            let repositories = cli::repositories(&config).await?;
            cli::device::run(&repositories, command).await
        }
    };

    cli::report(result)
}
