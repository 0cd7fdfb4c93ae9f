use crate::erat_big::EratBig;
use crate::erat_medium::EratMedium;
use crate::erat_small::EratSmall;
use crate::error::{Error, Result};
use crate::pmath::isqrt;
use crate::presieve::PRESIEVE;
use crate::wheel::BIT_VALUES;

pub struct Erat {
    low: u64,
    stop: u64,
    sieve_start: u64,
    size: usize,
    span: u64,
    buf: Vec<u8>,
    small: EratSmall,
    medium: EratMedium,
    big: EratBig,
    small_limit: u64,
    medium_limit: u64,
    first: bool,
    done: bool,
}

impl Erat {
    pub fn new(sieve_start: u64, stop: u64, size: usize) -> Result<Erat> {
        debug_assert!((7..=stop).contains(&sieve_start));
        debug_assert!(size.is_power_of_two());
        let low = (sieve_start - 7) / 30 * 30;
        let span = 30 * size as u64;
        let segments = (stop - low - 7) / span + 1;
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| Error::AllocationFailure)?;
        buf.resize(size, 0);
        Ok(Erat {
            low,
            stop,
            sieve_start,
            size,
            span,
            buf,
            small: EratSmall::new(),
            medium: EratMedium::new(),
            big: EratBig::new(size, isqrt(stop), segments),
            small_limit: size as u64 * 3 / 4,
            medium_limit: size as u64,
            first: true,
            done: false,
        })
    }

    pub fn segment_high(&self) -> u64 {
        (self.low + self.span + 6).min(self.stop)
    }

    pub fn add_sieving_prime(&mut self, p: u64) {
        if p <= self.small_limit {
            self.small.add(p, self.low);
        } else if p <= self.medium_limit {
            self.medium.add(p, self.low);
        } else {
            self.big.add(p, self.low);
        }
    }

    pub fn next_segment<F: FnMut(u64, &[u8])>(&mut self, f: &mut F) -> bool {
        if self.done {
            return false;
        }
        PRESIEVE.copy_into(&mut self.buf, self.low);
        self.small.cross_off(&mut self.buf);
        self.medium.cross_off(&mut self.buf);
        self.big.cross_off(&mut self.buf);
        if self.low == 0 {
            // the pre-sieve cycle clears its own primes; 7..17 are prime
            self.buf[0] |= 0x0f;
        }
        if self.first {
            // drop integers below the requested start (all in byte 0: the
            // segment base was chosen so start lies within its first 30)
            let mut mask = 0xffu8;
            for (j, &off) in BIT_VALUES.iter().enumerate() {
                if self.low + off < self.sieve_start {
                    mask &= !(1 << j);
                }
            }
            self.buf[0] &= mask;
            self.first = false;
        }
        // drop integers above stop and trim the slice handed out
        let last = ((self.stop - self.low - 7) / 30) as usize;
        let n = if last < self.size {
            let base = self.low + 30 * last as u64;
            let mut mask = 0xffu8;
            for (j, &off) in BIT_VALUES.iter().enumerate() {
                if base + off > self.stop {
                    mask &= !(1 << j);
                }
            }
            self.buf[last] &= mask;
            last + 1
        } else {
            self.size
        };
        f(self.low, &self.buf[..n]);
        self.low += self.span;
        if self.low + 7 > self.stop {
            self.done = true;
        }
        true
    }

    pub fn span(&self) -> u64 {
        self.span
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // drive the full pipeline by hand over a small range with a reference
    // sieving-prime list and compare against trial division
    #[test]
    fn segments_match_trial_division() {
        let stop = 200_000u64;
        let size = 1024usize; // spans 30720, forces several segments
        let mut erat = Erat::new(7, stop, size).unwrap();
        // all sieving primes above the pre-sieve limit
        let mut sieving = Vec::new();
        let mut n = 19u64;
        while n * n <= stop {
            if (2..n).all(|d| d * d > n || n % d != 0) {
                sieving.push(n);
            }
            n += 2;
        }
        for &p in &sieving {
            erat.add_sieving_prime(p);
        }
        let mut primes = Vec::new();
        while erat.next_segment(&mut |low, bytes| {
            for (i, &byte) in bytes.iter().enumerate() {
                for (j, &off) in BIT_VALUES.iter().enumerate() {
                    if byte & (1 << j) != 0 {
                        primes.push(low + 30 * i as u64 + off);
                    }
                }
            }
        }) {}
        let reference: Vec<u64> = (7..=stop)
            .filter(|&x| x % 2 != 0 && (3..x).all(|d| d * d > x || x % d != 0))
            .collect();
        assert_eq!(primes.len(), reference.len());
        assert_eq!(primes, reference);
    }

    #[test]
    fn start_and_stop_masking() {
        // start and stop in the middle of a block: only primes inside
        // [100, 150] may surface: 101 103 107 109 113 127 131 137 139 149
        let mut erat = Erat::new(100, 150, 8).unwrap();
        for &p in &[19u64, 23, 29, 31, 37, 41, 43, 47] {
            erat.add_sieving_prime(p);
        }
        let mut primes = Vec::new();
        while erat.next_segment(&mut |low, bytes| {
            for (i, &byte) in bytes.iter().enumerate() {
                for (j, &off) in BIT_VALUES.iter().enumerate() {
                    if byte & (1 << j) != 0 {
                        primes.push(low + 30 * i as u64 + off);
                    }
                }
            }
        }) {}
        assert_eq!(primes, vec![101, 103, 107, 109, 113, 127, 131, 137, 139, 149]);
    }
}
