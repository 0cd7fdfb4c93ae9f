use lazy_static::lazy_static;

use crate::pmath::{floor_pow2, in_between};

pub const DEFAULT_L1_BYTES: u64 = 32 * 1024;

#[derive(Debug, Clone, Default)]
pub struct CpuInfo {
    pub l1_cache_bytes: Option<u64>,
    pub l2_cache_bytes: Option<u64>,
    pub l2_private: bool,
    pub threads_per_core: usize,
}

impl CpuInfo {
    pub fn detect() -> CpuInfo {
        let info = probe().unwrap_or_default();
        log::debug!(
            "cpu: l1={:?} l2={:?} l2_private={} threads_per_core={}",
            info.l1_cache_bytes,
            info.l2_cache_bytes,
            info.l2_private,
            info.threads_per_core
        );
        info
    }

    pub fn sieve_bytes(&self) -> usize {
        let l1 = self.l1_cache_bytes.unwrap_or(DEFAULT_L1_BYTES) >> 10;
        let l2 = self.l2_cache_bytes.unwrap_or(0) >> 10;
        let kib = if self.l2_private && l2 > l1 {
            floor_pow2(in_between(32, l2, 4096))
        } else {
            floor_pow2(in_between(8, l1, 4096))
        };
        (kib << 10) as usize
    }
}

#[cfg(target_os = "linux")]
fn probe() -> Option<CpuInfo> {
    use std::fs;

    fn read(path: &str) -> Option<String> {
        fs::read_to_string(path).ok().map(|s| s.trim().to_string())
    }

    // "32K" / "1024K" / "1M" -> bytes
    fn parse_size(s: &str) -> Option<u64> {
        let (digits, mult) = match s.as_bytes().last()? {
            b'K' => (&s[..s.len() - 1], 1024),
            b'M' => (&s[..s.len() - 1], 1024 * 1024),
            _ => (s, 1),
        };
        digits.parse::<u64>().ok().map(|v| v * mult)
    }

    // "0-3" / "0,4" / "0" -> number of cpus named
    fn cpu_list_len(s: &str) -> Option<usize> {
        let mut total = 0usize;
        for part in s.split(',') {
            match part.split_once('-') {
                Some((a, b)) => {
                    let a: usize = a.trim().parse().ok()?;
                    let b: usize = b.trim().parse().ok()?;
                    total += b.checked_sub(a)? + 1;
                }
                None => {
                    part.trim().parse::<usize>().ok()?;
                    total += 1;
                }
            }
        }
        Some(total)
    }

    let threads_per_core =
        read("/sys/devices/system/cpu/cpu0/topology/thread_siblings_list")
            .and_then(|s| cpu_list_len(&s))
            .unwrap_or(1);

    let mut info = CpuInfo {
        threads_per_core,
        ..CpuInfo::default()
    };

    for index in 0..8 {
        let dir = format!("/sys/devices/system/cpu/cpu0/cache/index{}", index);
        let level = match read(&format!("{}/level", dir)) {
            Some(v) => v,
            None => break,
        };
        let cache_type = match read(&format!("{}/type", dir)) {
            Some(v) => v,
            None => break,
        };
        if cache_type != "Data" && cache_type != "Unified" {
            continue;
        }
        let bytes = read(&format!("{}/size", dir)).and_then(|s| parse_size(&s));
        match level.as_str() {
            "1" => info.l1_cache_bytes = bytes,
            "2" => {
                info.l2_cache_bytes = bytes;
                // private when shared by at most the core's own threads
                info.l2_private = read(&format!("{}/shared_cpu_list", dir))
                    .and_then(|s| cpu_list_len(&s))
                    .map(|n| n <= threads_per_core)
                    .unwrap_or(false);
            }
            _ => {}
        }
    }
    Some(info)
}

#[cfg(not(target_os = "linux"))]
fn probe() -> Option<CpuInfo> {
    None
}

lazy_static! {
    pub static ref CPU_INFO: CpuInfo = CpuInfo::detect();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_sieve_size_is_l1_fallback() {
        let info = CpuInfo::default();
        assert_eq!(info.sieve_bytes(), 32 * 1024);
    }

    #[test]
    fn private_l2_wins_when_larger() {
        let info = CpuInfo {
            l1_cache_bytes: Some(32 * 1024),
            l2_cache_bytes: Some(512 * 1024),
            l2_private: true,
            threads_per_core: 2,
        };
        assert_eq!(info.sieve_bytes(), 512 * 1024);
    }

    #[test]
    fn shared_l2_is_ignored() {
        let info = CpuInfo {
            l1_cache_bytes: Some(64 * 1024),
            l2_cache_bytes: Some(4 * 1024 * 1024),
            l2_private: false,
            threads_per_core: 2,
        };
        assert_eq!(info.sieve_bytes(), 64 * 1024);
    }

    #[test]
    fn odd_sizes_clamp_to_power_of_two() {
        let info = CpuInfo {
            l1_cache_bytes: Some(48 * 1024),
            l2_cache_bytes: Some(12 * 1024 * 1024),
            l2_private: true,
            threads_per_core: 2,
        };
        // 12 MiB clamps to 4096 KiB, already a power of two
        assert_eq!(info.sieve_bytes(), 4096 * 1024);
        let info2 = CpuInfo {
            l1_cache_bytes: Some(48 * 1024),
            ..CpuInfo::default()
        };
        assert_eq!(info2.sieve_bytes(), 32 * 1024); // floor_pow2(48)
    }

    #[test]
    fn detection_never_panics() {
        let info = CpuInfo::detect();
        let bytes = info.sieve_bytes();
        assert!((8 * 1024..=4096 * 1024).contains(&bytes));
        assert!(bytes.is_power_of_two());
    }
}
