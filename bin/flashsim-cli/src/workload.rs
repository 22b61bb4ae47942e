//! Host requests and synthetic workload generation

use anyhow::{Result, ensure};
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Host operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    Write,
    Trim,
}

/// One host request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub op: Op,
    pub lpn: u64,
    /// Explicit submission time; `None` submits when the previous request ends
    pub start_time: Option<f64>,
}

impl Request {
    pub const fn new(op: Op, lpn: u64) -> Self {
        Self {
            op,
            lpn,
            start_time: None,
        }
    }
}

/// Address distribution of a synthetic workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// Walk the address space in order, wrapping around
    Sequential,
    /// Uniform over the address space
    Random,
    /// 80% of requests go to the first 20% of the address space
    #[value(name = "hotcold")]
    HotCold,
}

/// Workload parameters
#[derive(Debug, Clone)]
pub struct WorkloadSpec {
    pub pattern: Pattern,
    pub pages: u64,
    pub read_ratio: f64,
    pub trim_ratio: f64,
    pub seed: u64,
}

/// Seeded request stream
#[derive(Debug)]
pub struct WorkloadGenerator {
    spec: WorkloadSpec,
    rng: StdRng,
    cursor: u64,
}

const HOT_FRACTION: f64 = 0.2;
const HOT_PROBABILITY: f64 = 0.8;

impl WorkloadGenerator {
    pub fn new(spec: WorkloadSpec) -> Result<Self> {
        ensure!(spec.pages > 0, "workload needs a non-empty address space");
        ensure!(
            (0.0..=1.0).contains(&spec.read_ratio) && (0.0..=1.0).contains(&spec.trim_ratio),
            "read and trim ratios must lie in [0, 1]"
        );
        ensure!(
            spec.read_ratio + spec.trim_ratio <= 1.0,
            "read ratio {} plus trim ratio {} exceeds 1",
            spec.read_ratio,
            spec.trim_ratio
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(spec.seed),
            spec,
            cursor: 0,
        })
    }

    fn next_op(&mut self) -> Op {
        let roll: f64 = self.rng.r#gen();
        if roll < self.spec.read_ratio {
            Op::Read
        } else if roll < self.spec.read_ratio + self.spec.trim_ratio {
            Op::Trim
        } else {
            Op::Write
        }
    }

    fn next_lpn(&mut self) -> u64 {
        let pages = self.spec.pages;
        match self.spec.pattern {
            Pattern::Sequential => {
                let lpn = self.cursor % pages;
                self.cursor += 1;
                lpn
            }
            Pattern::Random => self.rng.gen_range(0..pages),
            Pattern::HotCold => {
                let hot = ((pages as f64 * HOT_FRACTION) as u64).max(1);
                if hot >= pages || self.rng.gen_bool(HOT_PROBABILITY) {
                    self.rng.gen_range(0..hot.min(pages))
                } else {
                    self.rng.gen_range(hot..pages)
                }
            }
        }
    }
}

impl Iterator for WorkloadGenerator {
    type Item = Request;

    fn next(&mut self) -> Option<Request> {
        let op = self.next_op();
        let lpn = self.next_lpn();
        Some(Request::new(op, lpn))
    }
}
