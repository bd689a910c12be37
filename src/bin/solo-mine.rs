#![forbid(unsafe_code)]
use clap::Parser;
use solochain::config::load_config;
use solochain::crypto::Address;
use solochain::node::Node;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "solo-mine", about = "Mine one round of pending transactions")]
struct Cli {
    /// Address credited with the mining reward; defaults to
    /// mining.beneficiary_address from config.toml
    #[arg(long)]
    beneficiary: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = load_config()?;
    let beneficiary = Address::from(
        cli.beneficiary
            .unwrap_or_else(|| config.mining.beneficiary_address.clone()),
    );

    let node = Node::init(config)?;

    let start = Instant::now();
    match node.mine(&beneficiary)? {
        Some(block) => {
            println!("Mined block #{}", block.index);
            println!("  Hash:         {}", block.hash.as_deref().unwrap_or("-"));
            println!("  Nonce:        {}", block.nonce);
            println!("  Transactions: {}", block.transactions.len());
            println!("  Elapsed:      {:.3}s", start.elapsed().as_secs_f64());
            println!("  Chain length: {}", node.chain_len());
        }
        None => {
            println!("No pending transactions to mine.");
        }
    }

    Ok(())
}
