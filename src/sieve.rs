use std::io::{self, BufWriter, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::erat::Erat;
use crate::error::{Error, Result};
use crate::finder::{visit_primes, Counts, Finder, Kind};
use crate::generator::SievingPrimes;
use crate::pmath::{isqrt, MAX_STOP};

pub enum Mode<'a> {
    Count(Kind),
    Print(Kind),
    Visit(&'a mut dyn FnMut(u64)),
}

impl Mode<'_> {
    fn kind(&self) -> Kind {
        match self {
            Mode::Count(k) | Mode::Print(k) => *k,
            Mode::Visit(_) => Kind::Primes,
        }
    }
}

pub struct Job<'a> {
    pub start: u64,
    pub stop: u64,
    pub sieve_bytes: usize,
    pub mode: Mode<'a>,
    pub progress: Option<&'a AtomicU64>,
    pub abort: Option<&'a AtomicBool>,
}

const SMALL_CASES: [(u64, u64, usize, &str); 8] = [
    (2, 2, 0, "2"),
    (3, 3, 0, "3"),
    (5, 5, 0, "5"),
    (3, 5, 1, "(3, 5)"),
    (5, 7, 1, "(5, 7)"),
    (5, 11, 2, "(5, 7, 11)"),
    (5, 13, 3, "(5, 7, 11, 13)"),
    (5, 17, 4, "(5, 7, 11, 13, 17)"),
];

fn small_cases(start: u64, stop: u64, mode: &mut Mode, counts: &mut Counts) {
    if start > 5 {
        return;
    }
    match mode {
        Mode::Count(kind) => {
            let t = kind.index();
            for &(lo, hi, ty, _) in SMALL_CASES.iter() {
                if ty == t && start <= lo && hi <= stop {
                    counts.0[ty] += 1;
                }
            }
        }
        Mode::Print(kind) => {
            let t = kind.index();
            for &(lo, hi, ty, text) in SMALL_CASES.iter() {
                if ty == t && start <= lo && hi <= stop {
                    println!("{}", text);
                }
            }
        }
        Mode::Visit(f) => {
            for p in [2u64, 3, 5] {
                if start <= p && p <= stop {
                    f(p);
                }
            }
        }
    }
}

pub fn sieve_interval(job: Job) -> Result<Counts> {
    let Job {
        start,
        stop,
        sieve_bytes,
        mut mode,
        progress,
        abort,
    } = job;
    if start > stop || stop > MAX_STOP {
        return Err(Error::OutOfRange);
    }
    let mut counts = Counts::default();
    small_cases(start, stop, &mut mode, &mut counts);
    if stop < 7 {
        return Ok(counts);
    }
    let sieve_start = start.max(7);

    let finder = Finder::new(mode.kind());
    let mut erat = Erat::new(sieve_start, stop, sieve_bytes)?;
    let mut gen = SievingPrimes::new(isqrt(stop));
    let mut pending = gen.next();

    let stdout = io::stdout();
    let mut writer = match mode {
        Mode::Print(_) => Some(BufWriter::new(stdout.lock())),
        _ => None,
    };
    let mut io_failed = false;

    loop {
        if let Some(flag) = abort {
            if flag.load(Ordering::Relaxed) {
                return Err(Error::Aborted);
            }
        }
        // the generator runs ahead just far enough: every prime up to the
        // square root of this segment's highest value must be classified
        // before the segment is sieved
        let limit = isqrt(erat.segment_high());
        while let Some(p) = pending {
            if p > limit {
                break;
            }
            erat.add_sieving_prime(p);
            pending = gen.next();
        }
        let more = erat.next_segment(&mut |low, bytes| {
            match &mut mode {
                Mode::Count(_) => finder.count(bytes, &mut counts),
                Mode::Print(_) => {
                    if let Some(w) = writer.as_mut() {
                        io_failed |= finder.print_to(low, bytes, w).is_err();
                    }
                }
                Mode::Visit(f) => visit_primes(low, bytes, f),
            }
            if let Some(ctr) = progress {
                ctr.fetch_add(30 * bytes.len() as u64, Ordering::Relaxed);
            }
        });
        if !more {
            break;
        }
    }
    if let Some(mut w) = writer {
        io_failed |= w.flush().is_err();
    }
    if io_failed {
        log::warn!("stdout write failed while printing");
    }
    Ok(counts)
}

#[cfg(test)]
mod test {
    use super::*;

    fn count(start: u64, stop: u64, kind: Kind) -> u64 {
        let counts = sieve_interval(Job {
            start,
            stop,
            sieve_bytes: 8 * 1024,
            mode: Mode::Count(kind),
            progress: None,
            abort: None,
        })
        .unwrap();
        counts.get(kind)
    }

    #[test]
    fn known_prime_counts() {
        assert_eq!(count(0, 10, Kind::Primes), 4);
        assert_eq!(count(0, 100, Kind::Primes), 25);
        assert_eq!(count(0, 1_000, Kind::Primes), 168);
        assert_eq!(count(0, 1_000_000, Kind::Primes), 78_498);
    }

    #[test]
    fn interval_counts() {
        assert_eq!(count(3, 7, Kind::Primes), 3);
        assert_eq!(count(8, 10, Kind::Primes), 0);
        assert_eq!(count(97, 97, Kind::Primes), 1);
        assert_eq!(count(98, 100, Kind::Primes), 0);
        assert_eq!(count(0, 100_000, Kind::Primes), 9_592);
    }

    // odd-only bit-vector sieve as an independent reference
    #[test]
    fn matches_bitvector_reference_sieve() {
        use bitvector::BitVector;
        let bound = 500_000u64;
        let maxi = ((bound - 3) >> 1) as usize;
        let mut mem = BitVector::ones(maxi + 1);
        let mut reference = 1u64; // the prime 2
        let mut next = 0usize;
        while next <= maxi {
            if mem.contains(next) {
                let q = ((next as u64) << 1) + 3;
                reference += 1;
                let mut i = next;
                while i <= maxi {
                    mem.remove(i);
                    i += q as usize;
                }
            }
            next += 1;
        }
        assert_eq!(count(0, bound, Kind::Primes), reference);
    }

    #[test]
    fn partition_equivalence() {
        use rand::prelude::*;
        let mut rng = SmallRng::seed_from_u64(42);
        let total = count(0, 300_000, Kind::Primes);
        for _ in 0..8 {
            let cut = rng.gen_range(0..300_000u64);
            let left = count(0, cut, Kind::Primes);
            let right = count(cut + 1, 300_000, Kind::Primes);
            assert_eq!(left + right, total, "cut at {}", cut);
        }
    }

    #[test]
    fn twin_counts() {
        // twins <= 100: (3,5) (5,7) (11,13) (17,19) (29,31) (41,43)
        // (59,61) (71,73)
        assert_eq!(count(0, 100, Kind::Twins), 8);
        assert_eq!(count(0, 1_000_000, Kind::Twins), 8_169);
        // (3,5) needs start <= 3 and stop >= 5
        assert_eq!(count(3, 5, Kind::Twins), 1);
        assert_eq!(count(4, 5, Kind::Twins), 0);
        assert_eq!(count(3, 4, Kind::Twins), 0);
    }

    #[test]
    fn tuplets_match_reference_over_100k() {
        use std::collections::HashSet;
        let primes = crate::generator::primes_upto(200_000);
        let set: HashSet<u64> = primes.iter().copied().collect();
        let stop = 100_000u64;
        let patterns: [&[&[u64]]; 6] = [
            &[&[0, 2]],
            &[&[0, 2, 6], &[0, 4, 6]],
            &[&[0, 2, 6, 8]],
            &[&[0, 2, 6, 8, 12], &[0, 4, 6, 10, 12]],
            &[&[0, 4, 6, 10, 12, 16]],
            &[&[0, 2, 6, 8, 12, 18, 20]],
        ];
        for (ki, pats) in patterns.iter().enumerate() {
            let kind = Kind::from_k(ki as u32 + 2).unwrap();
            let mut expect = 0u64;
            for &p in &primes {
                if p > stop {
                    break;
                }
                for pat in pats.iter() {
                    if pat.iter().all(|&o| p + o <= stop && set.contains(&(p + o))) {
                        expect += 1;
                    }
                }
            }
            assert_eq!(count(0, stop, kind), expect, "kind {:?}", kind);
        }
    }

    #[test]
    fn sieve_size_does_not_change_counts() {
        for bytes in [8 * 1024usize, 32 * 1024, 256 * 1024] {
            let counts = sieve_interval(Job {
                start: 0,
                stop: 2_000_000,
                sieve_bytes: bytes,
                mode: Mode::Count(Kind::Primes),
                progress: None,
                abort: None,
            })
            .unwrap();
            assert_eq!(counts.get(Kind::Primes), 148_933);
        }
    }

    #[test]
    fn visit_collects_all_primes_in_order() {
        let mut seen = Vec::new();
        sieve_interval(Job {
            start: 0,
            stop: 100,
            sieve_bytes: 8 * 1024,
            mode: Mode::Visit(&mut |p| seen.push(p)),
            progress: None,
            abort: None,
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73,
                79, 83, 89, 97
            ]
        );
    }

    #[test]
    fn range_validation() {
        let bad = sieve_interval(Job {
            start: 10,
            stop: 9,
            sieve_bytes: 8 * 1024,
            mode: Mode::Count(Kind::Primes),
            progress: None,
            abort: None,
        });
        assert_eq!(bad.unwrap_err(), Error::OutOfRange);
    }

    #[test]
    fn abort_is_observed() {
        let flag = AtomicBool::new(true);
        let res = sieve_interval(Job {
            start: 0,
            stop: 10_000_000,
            sieve_bytes: 8 * 1024,
            mode: Mode::Count(Kind::Primes),
            progress: None,
            abort: Some(&flag),
        });
        assert_eq!(res.unwrap_err(), Error::Aborted);
    }

    #[test]
    fn progress_reaches_range() {
        let ctr = AtomicU64::new(0);
        sieve_interval(Job {
            start: 0,
            stop: 1_000_000,
            sieve_bytes: 8 * 1024,
            mode: Mode::Count(Kind::Primes),
            progress: Some(&ctr),
            abort: None,
        })
        .unwrap();
        assert!(ctr.load(Ordering::Relaxed) >= 1_000_000 - 30);
    }
}
