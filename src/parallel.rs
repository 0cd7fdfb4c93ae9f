use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::thread;

use crate::error::{Error, Result};
use crate::finder::{Counts, Kind};
use crate::pmath::{isqrt, MAX_STOP};
use crate::sieve::{sieve_interval, Job, Mode};

pub struct ParallelSieve {
    start: u64,
    stop: u64,
    sieve_bytes: usize,
    threads: usize,
    progress: Arc<AtomicU64>,
    abort: Arc<AtomicBool>,
}

impl ParallelSieve {
    pub fn new(start: u64, stop: u64, sieve_bytes: usize, threads: usize) -> Result<ParallelSieve> {
        if start > stop || stop > MAX_STOP {
            return Err(Error::OutOfRange);
        }
        Ok(ParallelSieve {
            start,
            stop,
            sieve_bytes,
            threads: threads.max(1),
            progress: Arc::new(AtomicU64::new(0)),
            abort: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn progress(&self) -> u64 {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn count(&self, kind: Kind) -> Result<u64> {
        self.counts(kind).map(|c| c.get(kind))
    }

    pub fn print(&self, kind: Kind) -> Result<()> {
        sieve_interval(Job {
            start: self.start,
            stop: self.stop,
            sieve_bytes: self.sieve_bytes,
            mode: Mode::Print(kind),
            progress: Some(&*self.progress),
            abort: Some(&*self.abort),
        })
        .map(|_| ())
    }

    pub fn counts(&self, kind: Kind) -> Result<Counts> {
        let range = self.stop - self.start + 1;
        let span = 30 * self.sieve_bytes as u64;
        // a worker that cannot amortize its own sieving-prime generation
        // is not worth spawning
        let per_worker = span.max(isqrt(self.stop));
        let threads = self
            .threads
            .min(((range / per_worker).max(1)) as usize)
            .max(1);
        if threads == 1 {
            return sieve_interval(Job {
                start: self.start,
                stop: self.stop,
                sieve_bytes: self.sieve_bytes,
                mode: Mode::Count(kind),
                progress: Some(&*self.progress),
                abort: Some(&*self.abort),
            });
        }
        // contiguous sub-intervals aligned to segment spans
        let chunk = range.div_ceil(threads as u64).div_ceil(span) * span;
        log::debug!(
            "sieving [{}, {}] with {} threads, {} integers per chunk",
            self.start,
            self.stop,
            threads,
            chunk
        );
        let scope_result = thread::scope(|s| {
            let mut handles = Vec::with_capacity(threads);
            let mut lo = self.start;
            loop {
                let hi = self.stop.min(lo + (chunk - 1));
                let progress: &AtomicU64 = &self.progress;
                let abort: &AtomicBool = &self.abort;
                let sieve_bytes = self.sieve_bytes;
                handles.push(s.spawn(move |_| {
                    sieve_interval(Job {
                        start: lo,
                        stop: hi,
                        sieve_bytes,
                        mode: Mode::Count(kind),
                        progress: Some(progress),
                        abort: Some(abort),
                    })
                }));
                if hi == self.stop {
                    break;
                }
                lo = hi + 1;
            }
            let mut total = Counts::default();
            let mut err: Option<Error> = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(c)) => total.add(&c),
                    Ok(Err(e)) => {
                        // stop the rest, keep the first real error
                        self.abort.store(true, Ordering::Relaxed);
                        let replace = match &err {
                            None => true,
                            Some(Error::Aborted) => e != Error::Aborted,
                            Some(_) => false,
                        };
                        if replace {
                            err = Some(e);
                        }
                    }
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            match err {
                Some(e) => Err(e),
                None => Ok(total),
            }
        });
        match scope_result {
            Ok(r) => r,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
