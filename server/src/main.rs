mod session;
mod shutdown;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use pcc::{logger, Tally};
use session::Server;
use shutdown::{Interrupt, Shutdown};
use std::io::{self, Write};
use std::net::{self, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(about = "Count printable bytes uploaded by pcc clients, one client at a time")]
struct Opt {
    /// Port to listen on
    port: u16,
    /// Maximum number of pending connections
    #[arg(short, long, default_value = "10")]
    backlog: i32,
    /// Drop a client that stalls for this long (in seconds)
    #[arg(short, long)]
    timeout: Option<u64>,
    /// Log every connection
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let opt = Opt::parse();
    logger::init(logger::level(opt.verbose));
    if let Err(e) = run(opt) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    let shutdown = Arc::new(Shutdown::new());
    let handler = Arc::clone(&shutdown);
    ctrlc::set_handler(move || match handler.interrupt() {
        Interrupt::Deferred => info!("Interrupted, finishing the current client first"),
        Interrupt::Terminate(totals) => report(&totals),
    })
    .context("Failed to install signal handler")?;

    let addr = SocketAddr::new(net::Ipv4Addr::UNSPECIFIED.into(), opt.port);
    let listener =
        session::bind(addr, opt.backlog).with_context(|| format!("Failed to listen on {}", addr))?;
    let server = Server::new(listener, Arc::clone(&shutdown), opt.timeout.map(Duration::from_secs));
    server.run()?;

    let totals = shutdown.statistics();
    report(&totals)
}

/// Print the cumulative statistics and exit successfully.
fn report(totals: &Tally) -> ! {
    let stdout = std::io::stdout();
    if let Err(e) = write_report(&mut stdout.lock(), totals) {
        error!("Failed to print statistics: {}", e);
    }
    std::process::exit(0)
}

fn write_report<W: Write>(out: &mut W, totals: &Tally) -> io::Result<()> {
    write!(out, "{}", totals)?;
    out.flush()
}
