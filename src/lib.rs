use std::sync::Mutex;

use lazy_static::lazy_static;

pub mod cpu;
pub mod erat;
pub mod erat_big;
pub mod erat_medium;
pub mod erat_small;
pub mod error;
pub mod finder;
pub mod generator;
pub mod iterator;
pub mod nth;
pub mod parallel;
pub mod pmath;
pub mod presieve;
pub mod sieve;
pub mod wheel;

pub use error::{Error, Result};
pub use finder::{Counts, Kind};
pub use iterator::Iter;
pub use parallel::ParallelSieve;

use pmath::{floor_pow2, in_between};

struct Config {
    sieve_kib: i32,
    threads: i32,
}

lazy_static! {
    static ref CONFIG: Mutex<Config> = Mutex::new(Config {
        sieve_kib: 0,
        threads: 0,
    });
}

fn config<T>(f: impl FnOnce(&mut Config) -> T) -> T {
    let mut guard = CONFIG.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut guard)
}

pub fn max_stop() -> u64 {
    pmath::MAX_STOP
}

pub fn set_sieve_size(kib: i32) -> Result<()> {
    if !(1..=8192).contains(&kib) {
        return Err(Error::InvalidSieveSize(kib));
    }
    let kib = floor_pow2(in_between(8, kib as u64, 4096)) as i32;
    config(|c| c.sieve_kib = kib);
    Ok(())
}

pub fn get_sieve_size() -> i32 {
    let set = config(|c| c.sieve_kib);
    if set > 0 {
        set
    } else {
        (cpu::CPU_INFO.sieve_bytes() >> 10) as i32
    }
}

pub fn set_num_threads(threads: i32) {
    let max = num_cpus::get() as i32;
    config(|c| c.threads = threads.clamp(1, max));
}

pub fn get_num_threads() -> i32 {
    let set = config(|c| c.threads);
    if set > 0 {
        set
    } else {
        num_cpus::get() as i32
    }
}

pub(crate) fn resolved_sieve_bytes() -> usize {
    (get_sieve_size() as usize) << 10
}

fn sieve(start: u64, stop: u64) -> Result<ParallelSieve> {
    ParallelSieve::new(
        start,
        stop,
        resolved_sieve_bytes(),
        get_num_threads() as usize,
    )
}

pub fn count(kind: Kind, start: u64, stop: u64) -> Result<u64> {
    sieve(start, stop)?.count(kind)
}

pub fn count_primes(start: u64, stop: u64) -> Result<u64> {
    count(Kind::Primes, start, stop)
}

pub fn count_twins(start: u64, stop: u64) -> Result<u64> {
    count(Kind::Twins, start, stop)
}

pub fn count_triplets(start: u64, stop: u64) -> Result<u64> {
    count(Kind::Triplets, start, stop)
}

pub fn count_quadruplets(start: u64, stop: u64) -> Result<u64> {
    count(Kind::Quadruplets, start, stop)
}

pub fn count_quintuplets(start: u64, stop: u64) -> Result<u64> {
    count(Kind::Quintuplets, start, stop)
}

pub fn count_sextuplets(start: u64, stop: u64) -> Result<u64> {
    count(Kind::Sextuplets, start, stop)
}

pub fn count_septuplets(start: u64, stop: u64) -> Result<u64> {
    count(Kind::Septuplets, start, stop)
}

pub fn print(kind: Kind, start: u64, stop: u64) -> Result<()> {
    sieve(start, stop)?.print(kind)
}

pub fn print_primes(start: u64, stop: u64) -> Result<()> {
    print(Kind::Primes, start, stop)
}

pub fn print_twins(start: u64, stop: u64) -> Result<()> {
    print(Kind::Twins, start, stop)
}

pub fn print_triplets(start: u64, stop: u64) -> Result<()> {
    print(Kind::Triplets, start, stop)
}

pub fn print_quadruplets(start: u64, stop: u64) -> Result<()> {
    print(Kind::Quadruplets, start, stop)
}

pub fn print_quintuplets(start: u64, stop: u64) -> Result<()> {
    print(Kind::Quintuplets, start, stop)
}

pub fn print_sextuplets(start: u64, stop: u64) -> Result<()> {
    print(Kind::Sextuplets, start, stop)
}

pub fn print_septuplets(start: u64, stop: u64) -> Result<()> {
    print(Kind::Septuplets, start, stop)
}

pub fn nth_prime(n: i64, start: u64) -> Result<u64> {
    nth::nth_prime(n, start, resolved_sieve_bytes(), get_num_threads() as usize)
}
