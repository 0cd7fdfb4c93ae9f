use crate::pmath::{isqrt, prime_count_upper};
use crate::presieve::PRESIEVE_MAX;

const CHUNK_BITS: u64 = 32 * 1024 * 8;
const CHUNK_WORDS: usize = (CHUNK_BITS / 64) as usize;

fn trial_division_primes(limit: u64) -> Vec<u64> {
    let mut primes = Vec::new();
    if limit >= 3 {
        primes.push(3);
    }
    let mut n = 5u64;
    while n <= limit {
        let s = isqrt(n);
        let mut is_prime = true;
        for &p in &primes {
            if p > s {
                break;
            }
            if n % p == 0 {
                is_prime = false;
                break;
            }
        }
        if is_prime {
            primes.push(n);
        }
        n += 2;
    }
    primes
}

pub struct SievingPrimes {
    limit: u64,
    chunk_start: u64,
    h_limit: u64,
    base: Vec<u64>,
    next_multiple: Vec<u64>,
    words: Vec<u64>,
    batch: Vec<u64>,
    idx: usize,
    finished: bool,
}

impl SievingPrimes {
    pub fn new(limit: u64) -> SievingPrimes {
        let base = trial_division_primes(isqrt(limit));
        let next_multiple = base.iter().map(|&p| (p * p - 1) / 2).collect();
        SievingPrimes {
            limit,
            chunk_start: (PRESIEVE_MAX + 2 - 1) / 2, // half-index of 19
            h_limit: limit.saturating_sub(1) / 2,
            base,
            next_multiple,
            words: vec![0u64; CHUNK_WORDS],
            batch: Vec::new(),
            idx: 0,
            finished: limit <= PRESIEVE_MAX + 1,
        }
    }

    pub fn next(&mut self) -> Option<u64> {
        loop {
            if self.idx < self.batch.len() {
                self.idx += 1;
                return Some(self.batch[self.idx - 1]);
            }
            if self.finished {
                return None;
            }
            self.refill();
        }
    }

    fn refill(&mut self) {
        self.batch.clear();
        self.idx = 0;
        while self.batch.is_empty() {
            if self.chunk_start > self.h_limit {
                self.finished = true;
                return;
            }
            let start = self.chunk_start;
            let end = (start + CHUNK_BITS - 1).min(self.h_limit);
            let bits = (end - start + 1) as usize;
            let n_words = (bits + 63) / 64;
            for w in self.words[..n_words].iter_mut() {
                *w = !0u64;
            }
            for (pi, &p) in self.base.iter().enumerate() {
                let mut j = self.next_multiple[pi];
                if j > end {
                    continue;
                }
                if j < start {
                    let gap = start - j;
                    j += gap.div_ceil(p) * p;
                }
                while j <= end {
                    let local = (j - start) as usize;
                    self.words[local >> 6] &= !(1u64 << (local & 63));
                    j += p;
                }
                self.next_multiple[pi] = j;
            }
            if bits & 63 != 0 {
                self.words[n_words - 1] &= (1u64 << (bits & 63)) - 1;
            }
            for (wi, &word) in self.words[..n_words].iter().enumerate() {
                let mut w = word;
                while w != 0 {
                    let tz = w.trailing_zeros() as u64;
                    let p = 2 * (start + (wi as u64) * 64 + tz) + 1;
                    if p <= self.limit {
                        self.batch.push(p);
                    }
                    w &= w - 1;
                }
            }
            self.chunk_start = end + 1;
        }
    }
}

pub fn primes_upto(limit: u64) -> Vec<u64> {
    let mut out = Vec::with_capacity(prime_count_upper(limit));
    for p in [2u64, 3, 5, 7, 11, 13, 17] {
        if p <= limit {
            out.push(p);
        }
    }
    let mut gen = SievingPrimes::new(limit);
    while let Some(p) = gen.next() {
        out.push(p);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trial_division_agrees_with_known_list() {
        assert_eq!(
            trial_division_primes(50),
            vec![3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47]
        );
        assert_eq!(trial_division_primes(2), Vec::<u64>::new());
        assert_eq!(trial_division_primes(65_536).len(), 6541); // pi(2^16) - 1
    }

    #[test]
    fn streams_primes_above_presieve_limit() {
        let mut gen = SievingPrimes::new(100);
        let mut got = Vec::new();
        while let Some(p) = gen.next() {
            got.push(p);
        }
        assert_eq!(got, vec![19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97]);
        assert_eq!(gen.next(), None);
    }

    #[test]
    fn counts_match_pi() {
        assert_eq!(primes_upto(100).len(), 25);
        assert_eq!(primes_upto(1_000).len(), 168);
        assert_eq!(primes_upto(10_000).len(), 1_229);
        assert_eq!(primes_upto(100_000).len(), 9_592);
        assert_eq!(primes_upto(1_000_000).len(), 78_498);
    }

    #[test]
    fn chunk_boundaries_lose_nothing() {
        // limit chosen to end mid-chunk and to span several chunks
        let limit = 1_234_567usize;
        let mut composite = vec![false; limit + 1];
        let mut reference = Vec::new();
        for n in 2..=limit {
            if !composite[n] {
                reference.push(n as u64);
                let mut m = n * n;
                while m <= limit {
                    composite[m] = true;
                    m += n;
                }
            }
        }
        assert_eq!(primes_upto(limit as u64), reference);
    }

    #[test]
    fn tiny_limits() {
        assert_eq!(primes_upto(1), Vec::<u64>::new());
        assert_eq!(primes_upto(2), vec![2]);
        assert_eq!(primes_upto(18), vec![2, 3, 5, 7, 11, 13, 17]);
        assert_eq!(primes_upto(19), vec![2, 3, 5, 7, 11, 13, 17, 19]);
    }
}
