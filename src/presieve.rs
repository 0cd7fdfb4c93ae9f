use lazy_static::lazy_static;

use crate::wheel;

pub const PRESIEVE_MAX: u64 = 17;

const PRESIEVE_PRIMES: [u64; 4] = [7, 11, 13, 17];

// 7 * 11 * 13 * 17
const CYCLE_BYTES: usize = 17_017;

pub struct PreSieve {
    cycle: Vec<u8>,
}

impl PreSieve {
    fn build() -> PreSieve {
        let mut cycle = vec![0xffu8; CYCLE_BYTES];
        for &p in &PRESIEVE_PRIMES {
            let ip = wheel::residue_index(p);
            // start at q = 1 (the prime itself) so the pattern is purely
            // periodic over the cycle
            let mut b = (p - 7) / 30;
            let mut wi = 0;
            while (b as usize) < CYCLE_BYTES {
                cycle[b as usize] &= wheel::MUL_MASK[ip][wi];
                b += wheel::byte_inc(p, ip, wi);
                wi = (wi + 1) & 7;
            }
        }
        PreSieve { cycle }
    }

    pub fn copy_into(&self, buf: &mut [u8], low: u64) {
        let mut offset = ((low / 30) % CYCLE_BYTES as u64) as usize;
        let mut pos = 0;
        while pos < buf.len() {
            let n = (CYCLE_BYTES - offset).min(buf.len() - pos);
            buf[pos..pos + n].copy_from_slice(&self.cycle[offset..offset + n]);
            pos += n;
            offset = 0;
        }
    }
}

lazy_static! {
    pub static ref PRESIEVE: PreSieve = PreSieve::build();
}
