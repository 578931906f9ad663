//! Debug script to print every drop pool with its classification

use conquest_sim::config::DatasetConfig;
use conquest_sim::efficiency::stage_expected_yield;
use conquest_sim::stage::{probability_sum, Dataset};
use std::env;

fn main() {
    // Optional drop table path, otherwise the built-in table
    let config = match env::args().nth(1) {
        Some(path) => DatasetConfig::from_file(&path),
        None => DatasetConfig::builtin(),
    };
    let dataset = match config.and_then(|c| Dataset::from_config(&c)) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error loading drop table: {}", e);
            std::process::exit(1);
        }
    };

    for stage in &dataset.stages {
        println!("\n=== {} (stamina {}) ===", stage.id, stage.stamina);
        for pool in &stage.pools {
            let kind = if pool.kind.is_bundle() { "bundle" } else { "weighted" };
            println!(
                "  {:<10} rolls: {}  kind: {:<8}  prob sum: {:.4}  entries: {}",
                pool.category,
                pool.rolls,
                kind,
                probability_sum(pool.entries()),
                pool.entries().len()
            );
        }
        println!("  Expected per clear:");
        for (item, ev) in stage_expected_yield(stage) {
            println!("    {:<15} {:.4}", item, ev);
        }
    }
}
