use crate::error::Result;
use crate::pmath::{isqrt, MAX_STOP};
use crate::sieve::{sieve_interval, Job, Mode};

const INITIAL_DIST: u64 = 1 << 18;

pub struct Iter {
    primes: Vec<u64>,
    i: usize,
    pos: u64,
    fresh: bool,
    dist: u64,
    stop_hint: u64,
    sieve_bytes: usize,
}

impl Iter {
    pub fn new() -> Iter {
        Iter::from(0, MAX_STOP)
    }

    pub fn from(start: u64, stop_hint: u64) -> Iter {
        Iter {
            primes: Vec::new(),
            i: 0,
            pos: start,
            fresh: true,
            dist: INITIAL_DIST,
            stop_hint,
            sieve_bytes: crate::resolved_sieve_bytes(),
        }
    }

    pub fn skipto(&mut self, start: u64, stop_hint: u64) {
        self.primes.clear();
        self.i = 0;
        self.pos = start;
        self.fresh = true;
        self.dist = INITIAL_DIST;
        self.stop_hint = stop_hint;
    }

    pub fn next_prime(&mut self) -> Option<u64> {
        if self.fresh {
            self.fresh = false;
            if !self.refill_forward(self.pos) {
                return None;
            }
        } else if self.i + 1 < self.primes.len() {
            self.i += 1;
        } else {
            if self.pos >= MAX_STOP || !self.refill_forward(self.pos + 1) {
                return None;
            }
        }
        self.pos = self.primes[self.i];
        Some(self.pos)
    }

    pub fn prev_prime(&mut self) -> Option<u64> {
        if self.fresh {
            self.fresh = false;
            if !self.refill_backward(self.pos) {
                return None;
            }
        } else if self.i > 0 {
            self.i -= 1;
        } else {
            if self.pos <= 2 || !self.refill_backward(self.pos - 1) {
                return None;
            }
        }
        self.pos = self.primes[self.i];
        Some(self.pos)
    }

    fn grow_dist(&mut self, around: u64) {
        let cap = INITIAL_DIST.max(isqrt(around));
        self.dist = (self.dist.saturating_mul(4)).min(cap).max(self.dist);
    }

    fn collect(&mut self, lo: u64, hi: u64) {
        let mut primes = std::mem::take(&mut self.primes);
        primes.clear();
        // windows are bounds-checked by the callers; a failed window leaves
        // the buffer empty and reads as exhaustion
        let res: Result<_> = sieve_interval(Job {
            start: lo,
            stop: hi,
            sieve_bytes: self.sieve_bytes,
            mode: Mode::Visit(&mut |p| primes.push(p)),
            progress: None,
            abort: None,
        });
        if res.is_err() {
            primes.clear();
        }
        self.primes = primes;
    }

    fn refill_forward(&mut self, mut from: u64) -> bool {
        loop {
            if from > MAX_STOP {
                return false;
            }
            let mut hi = from.saturating_add(self.dist - 1).min(MAX_STOP);
            if self.stop_hint >= from && self.stop_hint < hi {
                hi = self.stop_hint;
            }
            self.collect(from, hi);
            self.grow_dist(hi);
            if !self.primes.is_empty() {
                self.i = 0;
                return true;
            }
            from = match hi.checked_add(1) {
                Some(v) => v,
                None => return false,
            };
        }
    }

    fn refill_backward(&mut self, mut upto: u64) -> bool {
        loop {
            if upto < 2 {
                return false;
            }
            let lo = upto.saturating_sub(self.dist - 1);
            self.collect(lo, upto);
            self.grow_dist(upto);
            if !self.primes.is_empty() {
                self.i = self.primes.len() - 1;
                return true;
            }
            if lo == 0 {
                return false;
            }
            upto = lo - 1;
        }
    }
}

impl Default for Iter {
    fn default() -> Iter {
        Iter::new()
    }
}
