use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;

use erato::Kind;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    start: u64,
    stop: Option<u64>,
    #[arg(short, long, value_name = "K", num_args = 0..=1, default_missing_value = "1")]
    count: Option<u32>,
    #[arg(short, long, value_name = "K", num_args = 0..=1, default_missing_value = "1")]
    print: Option<u32>,
    #[arg(short, long, value_name = "N", allow_hyphen_values = true)]
    nth: Option<i64>,
    #[arg(short, long, value_name = "KIB")]
    size: Option<i32>,
    #[arg(short, long, value_name = "NUM")]
    threads: Option<i32>,
    #[arg(short, long)]
    quiet: bool,
}

fn kind_for(k: u32) -> Result<Kind> {
    match Kind::from_k(k) {
        Some(kind) => Ok(kind),
        None => bail!("K must be 1 (primes) or 2..7 (k-tuplets), got {}", k),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(kib) = cli.size {
        erato::set_sieve_size(kib)?;
    }
    if let Some(threads) = cli.threads {
        if threads <= 0 {
            return Err(erato::Error::InvalidThreadCount(threads).into());
        }
        erato::set_num_threads(threads);
    }

    if let Some(n) = cli.nth {
        let clock = Instant::now();
        let p = erato::nth_prime(n, cli.start)?;
        println!("{}", p);
        if !cli.quiet {
            println!("Seconds: {:.3}", clock.elapsed().as_secs_f64());
        }
        return Ok(());
    }

    let (start, stop) = match cli.stop {
        Some(stop) => (cli.start, stop),
        None => (0, cli.start),
    };

    if let Some(k) = cli.print {
        erato::print(kind_for(k)?, start, stop)?;
        return Ok(());
    }

    let kind = kind_for(cli.count.unwrap_or(1))?;
    let clock = Instant::now();
    let n = erato::count(kind, start, stop)?;
    println!("{}", n);
    if !cli.quiet {
        println!("Seconds: {:.3}", clock.elapsed().as_secs_f64());
    }
    Ok(())
}
