// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer health probes used by the status monitor.
//
// The monitor asks the probe about every enabled printer on each tick and
// applies whatever status comes back.  The only probe with behaviour today is
// the demo `RandomStatusProbe`; a connectivity check against real hardware
// would implement the same trait.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tillprint_core::types::{PrinterConfig, PrinterStatus};

/// Reports the current status of a printer.
pub trait HealthProbe: Send {
    /// `None` means "no new information, keep the current status".
    fn probe(&mut self, printer: &PrinterConfig) -> Option<PrinterStatus>;
}

/// Never reports anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProbe;

impl HealthProbe for NoopProbe {
    fn probe(&mut self, _printer: &PrinterConfig) -> Option<PrinterStatus> {
        None
    }
}

/// Demo instrumentation: with probability `p` per printer per tick, picks a
/// uniformly random status.  Not a health check.
pub struct RandomStatusProbe {
    probability: f64,
    rng: StdRng,
}

impl RandomStatusProbe {
    pub fn new(probability: f64) -> Self {
        Self::with_rng(probability, StdRng::from_os_rng())
    }

    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self::with_rng(probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(probability: f64, rng: StdRng) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng,
        }
    }
}

impl HealthProbe for RandomStatusProbe {
    fn probe(&mut self, _printer: &PrinterConfig) -> Option<PrinterStatus> {
        if !self.rng.random_bool(self.probability) {
            return None;
        }
        let index = self.rng.random_range(0..PrinterStatus::ALL.len());
        Some(PrinterStatus::ALL[index])
    }
}
