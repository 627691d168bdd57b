//! # Stress
//!
//! Hammers one small queue with several producers and consumers, then
//! checks that nothing was lost, duplicated, or reordered.
//!
//! Run: `cargo run --release --example stress -- [items_per_producer]`

use litepipe::error::{Error, Result};
use litepipe::stress::{StressConfig, StressReport, run_stress};
use tracing_subscriber::EnvFilter;

fn print_report(label: &str, report: &StressReport) {
    println!("\n{}", label);
    println!(" push attempt : {}", report.push_attempts);
    println!(" push success : {}", report.push_successes);
    println!(" pop success  : {}", report.pop_successes);
    println!(" queue size   : {}", report.final_size);
    println!(" elapsed      : {:?}", report.elapsed);
    println!(" throughput   : {:.0} items/s", report.throughput());
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("litepipe=info")),
        )
        .init();

    let mut config = StressConfig::default();
    if let Some(arg) = std::env::args().nth(1) {
        config.items_per_producer = arg
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("not a count: {}", arg)))?;
    }

    println!("=== Stress ===");
    println!(
        "{} producers x {} items, {} consumers, capacity {}",
        config.producers, config.items_per_producer, config.consumers, config.capacity
    );

    print_report("u64 items", &run_stress::<u64>(&config)?);
    print_report("String items", &run_stress::<String>(&config)?);

    println!("\nAll invariants held.");
    Ok(())
}
