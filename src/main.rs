mod cli;
mod config;
mod directory;
mod jurisdiction;
mod lifecycle;
mod model;
mod notify;
mod position;
mod storage;

use std::process;

use clap::Parser;

use config::Config;
use storage::Storage;

fn main() {
    let cli = cli::Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let db_path = config
        .database_path
        .clone()
        .or_else(Storage::default_path)
        .unwrap_or_else(|| {
            eprintln!("Could not determine home directory.");
            process::exit(1);
        });

    let storage = match Storage::open(&db_path) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Failed to initialize storage: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(cli, &storage, &config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
