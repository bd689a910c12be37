#![forbid(unsafe_code)]
use clap::Parser;
use solochain::config::load_config;
use solochain::crypto::Address;
use solochain::node::Node;

#[derive(Parser)]
#[command(name = "solo-balance", about = "Query a balance from the local ledger")]
struct Cli {
    /// Address to query
    address: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = load_config()?;
    let node = Node::init(config)?;

    let address = Address::from(cli.address.as_str());
    let status = node.resolve();

    println!("Address:      {}", address);
    println!("Chain length: {} (valid: {})", status.length, status.valid);
    println!("Balance:      {}", node.balance_of(&address));

    Ok(())
}
