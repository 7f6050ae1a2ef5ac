use clap::Parser;
use rustknx_client::RoutingClientBuilder;
use rustknx_core::address::{GroupAddress, IndividualAddress};
use rustknx_core::dpt::DptId;
use rustknx_tools::{parse_dpt, parse_group_address, parse_individual_address, parse_value};

#[derive(Parser, Debug)]
#[command(name = "knx-write")]
struct Args {
    /// Source address stamped on the write.
    #[arg(long, value_parser = parse_individual_address, default_value = "0.0.0")]
    source: IndividualAddress,
    /// Group address to write.
    #[arg(value_parser = parse_group_address)]
    address: GroupAddress,
    /// Datapoint type of the address (e.g. 1.001).
    #[arg(value_parser = parse_dpt)]
    dpt: DptId,
    /// Value in its text form ("on", "21.5", ...).
    value: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let value = parse_value(args.dpt, &args.value).map_err(std::io::Error::other)?;

    let client = RoutingClientBuilder::new(args.source)
        .group_address(args.address, args.dpt)
        .connect()
        .await?;

    match client.write_group_address(args.address, value).await {
        Ok(()) => println!("wrote {} to {}", args.value, args.address),
        Err(e) => {
            eprintln!("write failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
