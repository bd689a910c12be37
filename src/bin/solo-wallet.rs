#![forbid(unsafe_code)]
use clap::{Parser, Subcommand};
use solochain::wallet::Wallet;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "solo-wallet", about = "Create and inspect solochain wallets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new wallet and write it to a file
    New {
        /// Where to store the wallet JSON
        #[arg(long, default_value = "./data/wallet.json")]
        out: PathBuf,
        /// Optional display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the address of an existing wallet file
    Show {
        #[arg(long, default_value = "./data/wallet.json")]
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::New { out, name } => {
            let wallet = Wallet::generate(name);
            wallet.save(&out)?;
            println!("Address:  {}", wallet.address);
            println!("Saved to: {}", out.display());
        }
        Command::Show { path } => {
            let wallet = Wallet::load(&path)?;
            if let Some(name) = &wallet.name {
                println!("Name:    {}", name);
            }
            println!("Address: {}", wallet.address);
            println!("Created: {}", wallet.created);
        }
    }

    Ok(())
}
