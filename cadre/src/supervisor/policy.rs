//! Burst-up / decay-down scaling policy.
//!
//! A backlogged target jumps straight to the ceiling in a single tick; an idle
//! one gives back one worker per tick until it reaches the floor.

use std::fmt;

/// What a tick decided for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Workers added this tick
    Grow(usize),
    /// One decline requested this tick
    Shrink,
    Hold,
}

impl Adjustment {
    pub fn is_hold(&self) -> bool {
        matches!(self, Adjustment::Hold)
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjustment::Grow(n) => write!(f, "grow +{}", n),
            Adjustment::Shrink => write!(f, "shrink -1"),
            Adjustment::Hold => write!(f, "hold"),
        }
    }
}

/// Decides the adjustment for a target with `workers` effective workers
/// (registered minus pending declines) and `tasks` queued entries.
pub fn plan(workers: usize, tasks: usize, min: usize, max: usize) -> Adjustment {
    if tasks > 0 && workers < max {
        Adjustment::Grow(max - workers)
    } else if tasks == 0 && workers > min {
        Adjustment::Shrink
    } else {
        Adjustment::Hold
    }
}
