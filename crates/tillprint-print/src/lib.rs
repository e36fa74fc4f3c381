// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tillprint Print — printer registry, FIFO print job queue, retry scheduler
// and status monitor.  `PrintService` ties them together; `QueueRunner`
// drives its periodic ticks on Tokio tasks.

pub mod clock;
pub mod events;
pub mod health;
pub mod queue;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod service;
pub mod submit;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{ChannelObserver, QueueEvent, QueueObserver};
pub use health::{HealthProbe, NoopProbe, RandomStatusProbe};
pub use queue::{PrintQueue, Resolution};
pub use registry::PrinterRegistry;
pub use retry::RetryPolicy;
pub use runner::{QueueRunner, RunnerStatus};
pub use service::{PrintService, PrintServiceBuilder};
pub use submit::{PrintSubmitter, ScriptedSubmitter, SimulatedSubmitter};
