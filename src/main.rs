use std::env;
use std::error::Error;

use log::{info, LevelFilter};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use simple_logger::SimpleLogger;

use lnfee::config::{usage, Command, SimConfig};
use lnfee::experiment::{FeeSweep, SweepReporter};
use lnfee::models::ChannelId;
use lnfee::simulation::{NetworkGenerator, TransactionGenerator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = match SimConfig::from_args(&args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            println!("{}", usage());
            return Ok(());
        }
        Err(err) => {
            eprintln!("{}\n\n{}", err, usage());
            std::process::exit(2);
        }
    };

    let level = if config.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    SimpleLogger::new().with_level(level).init()?;

    println!("lnfee: Fee-aware routing simulation for payment channel networks");
    println!("================================================================");

    // Resolve the seed up front so every run can be replayed
    let seed = config.seed.unwrap_or_else(|| StdRng::from_os_rng().next_u64());

    info!("Simulation parameters:");
    info!("  Network size:        {} nodes (p = {})", config.node_count, config.edge_probability);
    info!("  Transactions:        {}", config.transaction_count);
    info!("  Sweep iterations:    {} (max fee rate {})", config.iterations, config.max_fee_rate);
    info!("  Balance mode:        {:?}", config.mode);
    info!("  Seed:                {}", seed);

    let sweep_config = config.clone();
    let (target, rows) = tokio::task::spawn_blocking(move || -> Result<_, Box<dyn Error + Send + Sync>> {
        let config = sweep_config;

        let mut generator = NetworkGenerator::new(Some(seed));
        let network = generator.random_network(config.node_count, config.edge_probability)?;
        network.log_channels();

        // Sweep the first channel opened
        let target = ChannelId(0);
        let channel = network.channel(target).ok_or("generated network has no channels")?;
        info!("Target channel for fee modification: {}", channel);

        let transactions = TransactionGenerator::new(config.max_amount, config.transaction_count)
            .generate(&mut generator.rng, &network.node_ids());

        let sweep = FeeSweep::linear(target, config.iterations, config.max_fee_rate, config.mode);
        let rows = sweep.run(&network, &transactions)?;
        Ok((target, rows))
    })
    .await?
    .map_err(|err| err as Box<dyn Error>)?;

    let reporter = SweepReporter::new(target, config.mode);

    let report_base = config.output_path.strip_suffix(".csv").unwrap_or(&config.output_path);
    let markdown_path = format!("{}_report.md", report_base);
    let json_path = format!("{}_report.json", report_base);

    tokio::fs::write(&config.output_path, reporter.generate_csv(&rows)).await?;
    tokio::fs::write(&markdown_path, reporter.generate_text_report(&rows)).await?;
    tokio::fs::write(&json_path, reporter.generate_json_report(&rows)).await?;

    println!("\nDone. Results saved to {}, {} and {}", config.output_path, markdown_path, json_path);

    Ok(())
}
