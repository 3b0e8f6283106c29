use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shelf", about = "Shelf book-tracking service", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Print the resolved configuration and exit
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => shelf_app::run().await,
        Command::Config => {
            let settings = shelf_kernel::settings::Settings::load()?;
            println!("{settings:#?}");
            Ok(())
        }
    }
}
