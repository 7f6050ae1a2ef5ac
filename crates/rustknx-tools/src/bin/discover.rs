use clap::Parser;
use rustknx_client::RoutingClientBuilder;
use rustknx_core::address::IndividualAddress;
use rustknx_tools::parse_individual_address;
use std::net::Ipv4Addr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "knx-discover")]
struct Args {
    #[arg(long, value_parser = parse_individual_address, default_value = "0.0.0")]
    source: IndividualAddress,
    /// How long to collect search responses.
    #[arg(long, default_value_t = 3000)]
    window_ms: u64,
    #[arg(long)]
    local_ip: Option<Ipv4Addr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut builder = RoutingClientBuilder::new(args.source);
    if let Some(local_ip) = args.local_ip {
        builder = builder.local_ip(local_ip);
    }
    let client = builder.connect().await?;

    let responses = client
        .discover(Duration::from_millis(args.window_ms))
        .await?;
    if responses.is_empty() {
        println!("no KNXnet/IP devices answered");
        return Ok(());
    }

    for response in responses {
        match response.device_info() {
            Some(info) => println!(
                "{} \"{}\" at {} (medium {:?})",
                info.individual_address, info.name, response.endpoint.address, info.medium
            ),
            None => println!("anonymous device at {}", response.endpoint.address),
        }
    }
    Ok(())
}
