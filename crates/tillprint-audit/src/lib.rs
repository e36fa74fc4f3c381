// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tillprint-audit — payload fingerprints and the append-only job audit trail.
//
// Every job carries the SHA-256 of its payload so a reprint or a dispute can
// be matched to what was actually sent to the printer.

pub mod audit;
pub mod integrity;

pub use audit::{AuditEntry, AuditLog};
pub use integrity::{hash_bytes, hash_payload};
