use clap::Parser;
use rustknx_client::RoutingClientBuilder;
use rustknx_core::address::{GroupAddress, IndividualAddress};
use rustknx_core::dpt::DptId;
use rustknx_tools::{parse_individual_address, parse_table_entry};
use std::net::{Ipv4Addr, SocketAddrV4};

#[derive(Parser, Debug)]
#[command(name = "knx-listen")]
struct Args {
    /// Source address stamped on outgoing frames.
    #[arg(long, value_parser = parse_individual_address, default_value = "0.0.0")]
    source: IndividualAddress,
    /// Known group addresses as ADDRESS=DPT (e.g. 1/2/3=1.001). Repeatable.
    #[arg(long = "ga", value_parser = parse_table_entry)]
    group_addresses: Vec<(GroupAddress, DptId)>,
    /// Show telegrams for unconfigured group addresses as raw bits.
    #[arg(long)]
    allow_unknown: bool,
    #[arg(long)]
    local_ip: Option<Ipv4Addr>,
    #[arg(long)]
    multicast: Option<SocketAddrV4>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut builder =
        RoutingClientBuilder::new(args.source).allow_unknown_gpa(args.allow_unknown);
    for (address, dpt) in args.group_addresses {
        builder = builder.group_address(address, dpt);
    }
    if let Some(local_ip) = args.local_ip {
        builder = builder.local_ip(local_ip);
    }
    if let Some(multicast) = args.multicast {
        builder = builder.multicast_group(multicast);
    }

    let client = builder.connect().await?;
    let mut subscription = client.subscribe().await?;

    println!("Listening for group telegrams (Ctrl+C to stop)...");
    while let Some((kind, telegram)) = subscription.recv().await {
        match telegram.value {
            Some(value) => println!(
                "{:?} {} -> {}: {:?}",
                kind, telegram.source, telegram.destination, value
            ),
            None => println!("{:?} {} -> {}", kind, telegram.source, telegram.destination),
        }
    }
    Ok(())
}
