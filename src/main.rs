use anyhow::{Context, Result};
use clap::Parser;
use log::error;
use pcc::{logger, TransferTask};
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(about = "Send a file to a pcc server and print how many bytes are printable")]
struct Opt {
    /// IP or hostname of the server
    address: String,
    /// Port the server listens on
    port: u16,
    /// File to upload
    file: PathBuf,
    /// Timeout for connecting and for each socket operation (in seconds)
    #[arg(short, long)]
    timeout: Option<u64>,
    /// Log every batch
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let opt = Opt::parse();
    logger::init(logger::level(opt.verbose));
    match run(opt) {
        Ok(count) => println!("# of printable characters: {}", count),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(opt: Opt) -> Result<u32> {
    let mut file = File::open(&opt.file)
        .with_context(|| format!("Failed to open {}", opt.file.display()))?;
    let task = TransferTask::new(&opt.address, opt.port, opt.timeout.map(Duration::from_secs))?;
    task.run(&mut file)
}
