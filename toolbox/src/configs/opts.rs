use crate::primitives::consts::{DEFAULT_DENOMINATOR_LIMIT, MAX_CYCLICAL_DEPTH};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;

/// Options governing the case sweeps of a design space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepOpts {
    /// Run sweeps on the calling thread in case-number order.
    pub serial: bool,
    /// Detect cyclical cases during sweeps and consult them for validity.
    pub cyclical: bool,
    /// Apply codominance normalization when materializing cases.
    pub resolve_codominance: bool,
    /// Worker count for parallel sweeps; 0 selects the online CPU count.
    pub workers: usize,
}

impl Default for SweepOpts {
    fn default() -> Self {
        let workers = env::var("DST_NUM_WORKERS")
            .map(|s| s.parse::<usize>().unwrap_or(0))
            .unwrap_or(0);
        if workers != 0 {
            debug!("worker count overridden to {}", workers);
        }
        Self {
            serial: false,
            cyclical: false,
            resolve_codominance: false,
            workers,
        }
    }
}

impl SweepOpts {
    /// Serial options used by deterministic-ordering tests.
    pub fn test_opts() -> Self {
        Self {
            serial: true,
            ..Default::default()
        }
    }

    /// Number of workers a parallel sweep will spawn.
    pub fn effective_workers(&self) -> usize {
        if self.workers != 0 {
            self.workers
        } else {
            num_cpus::get()
        }
    }
}

/// Options governing exact vertex enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationOpts {
    /// Largest denominator used when approximating boundary entries.
    pub denominator_limit: u32,
    /// Depth bound for recursive cyclical-case resolution.
    pub max_cyclical_depth: usize,
}

impl Default for EnumerationOpts {
    fn default() -> Self {
        let denominator_limit = env::var("DST_DENOMINATOR_LIMIT")
            .map(|s| {
                s.parse::<u32>()
                    .unwrap_or(DEFAULT_DENOMINATOR_LIMIT)
            })
            .unwrap_or(DEFAULT_DENOMINATOR_LIMIT);
        Self {
            denominator_limit,
            max_cyclical_depth: MAX_CYCLICAL_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_opts_are_parallel_and_strict() {
        let opts = SweepOpts {
            workers: 0,
            ..Default::default()
        };
        assert!(!opts.serial);
        assert!(!opts.cyclical);
        assert!(opts.effective_workers() >= 1);
    }

    #[test]
    fn enumeration_defaults_record_the_cap() {
        let opts = EnumerationOpts::default();
        assert_eq!(opts.denominator_limit, DEFAULT_DENOMINATOR_LIMIT);
    }
}
