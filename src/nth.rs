use crate::error::{Error, Result};
use crate::finder::Kind;
use crate::parallel::ParallelSieve;
use crate::pmath::{nth_prime_distance, nth_prime_distance_under, isqrt, MAX_STOP};
use crate::sieve::{sieve_interval, Job, Mode};

const COLLECT_LIMIT: u64 = 1 << 20;

const WINDOW_SPAN: u64 = 1 << 22;

pub fn nth_prime(n: i64, start: u64, sieve_bytes: usize, threads: usize) -> Result<u64> {
    if start > MAX_STOP {
        return Err(Error::OutOfRange);
    }
    if n >= 0 {
        forward(n.unsigned_abs().max(1), start, sieve_bytes, threads)
    } else {
        backward(n.unsigned_abs(), start, sieve_bytes, threads)
    }
}

fn count(lo: u64, hi: u64, sieve_bytes: usize, threads: usize) -> Result<u64> {
    ParallelSieve::new(lo, hi, sieve_bytes, threads)?.count(Kind::Primes)
}

fn collect(lo: u64, hi: u64, sieve_bytes: usize) -> Result<Vec<u64>> {
    let mut primes = Vec::new();
    sieve_interval(Job {
        start: lo,
        stop: hi,
        sieve_bytes,
        mode: Mode::Visit(&mut |p| primes.push(p)),
        progress: None,
        abort: None,
    })?;
    Ok(primes)
}

fn forward(mut n: u64, start: u64, sieve_bytes: usize, threads: usize) -> Result<u64> {
    let mut low = start; // primes strictly above low remain to be found
    'jump: while n > COLLECT_LIMIT {
        let mut dist = nth_prime_distance_under(n, low).max(WINDOW_SPAN);
        loop {
            let high = low.saturating_add(dist).min(MAX_STOP);
            if high == low {
                return Err(Error::NthPrimeOutOfRange);
            }
            let c = count(low + 1, high, sieve_bytes, threads)?;
            if c < n {
                n -= c;
                low = high;
                break;
            }
            // the under-estimate overshot; tighten
            dist /= 2;
            if dist < WINDOW_SPAN {
                break 'jump; // target is within a few windows, walk it
            }
        }
    }
    loop {
        if low >= MAX_STOP {
            return Err(Error::NthPrimeOutOfRange);
        }
        let high = low.saturating_add(WINDOW_SPAN).min(MAX_STOP);
        let primes = collect(low + 1, high, sieve_bytes)?;
        if primes.len() as u64 >= n {
            return Ok(primes[(n - 1) as usize]);
        }
        n -= primes.len() as u64;
        low = high;
    }
}

fn backward(mut n: u64, start: u64, sieve_bytes: usize, threads: usize) -> Result<u64> {
    debug_assert!(n > 0);
    let mut high = start; // primes strictly below high remain to be found
    loop {
        if high <= 2 {
            return Err(Error::NthPrimeOutOfRange);
        }
        let dist = nth_prime_distance(n, high)
            .saturating_add(20 * isqrt(n))
            .saturating_add(10_000);
        let low = high.saturating_sub(dist);
        let c = count(low, high - 1, sieve_bytes, threads)?;
        if c >= n {
            // the answer is the (c - n)-th prime of [low, high), 0-based
            // ascending; walk up to it
            let mut target = c - n;
            let mut lo = low;
            loop {
                let hi = (high - 1).min(lo.saturating_add(WINDOW_SPAN));
                let primes = collect(lo, hi, sieve_bytes)?;
                if (primes.len() as u64) > target {
                    return Ok(primes[target as usize]);
                }
                target -= primes.len() as u64;
                lo = hi + 1;
            }
        }
        if low == 0 {
            return Err(Error::NthPrimeOutOfRange);
        }
        n -= c;
        high = low;
    }
}
