use clap::Parser;
use rustknx_client::RoutingClientBuilder;
use rustknx_core::address::{GroupAddress, IndividualAddress};
use rustknx_core::dpt::DptId;
use rustknx_tools::{parse_dpt, parse_group_address, parse_individual_address};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "knx-read")]
struct Args {
    /// Source address stamped on the read request.
    #[arg(long, value_parser = parse_individual_address, default_value = "0.0.0")]
    source: IndividualAddress,
    /// Group address to read.
    #[arg(value_parser = parse_group_address)]
    address: GroupAddress,
    /// Datapoint type of the address (e.g. 9.001).
    #[arg(value_parser = parse_dpt)]
    dpt: DptId,
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let client = RoutingClientBuilder::new(args.source)
        .group_address(args.address, args.dpt)
        .connect()
        .await?;

    match client
        .read_group_address_timeout(args.address, Duration::from_millis(args.timeout_ms))
        .await
    {
        Ok(telegram) => println!("{}: {:?}", args.address, telegram.value),
        Err(e) => {
            eprintln!("read failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
