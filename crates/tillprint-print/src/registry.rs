// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer registry — the set of configured printers and their
// enablement/default/status flags.
//
// At most one printer is the default at any time.  Jobs that are already
// queued keep their assigned printer id even if that printer is disabled or
// removed; the processor re-selects a printer when it picks the job up.

use chrono::{DateTime, Utc};
use tillprint_core::types::{PrinterConfig, PrinterId, PrinterStatus};
use tracing::{debug, info, warn};

/// In-memory printer registry, ordered by registration.
#[derive(Debug, Default, Clone)]
pub struct PrinterRegistry {
    printers: Vec<PrinterConfig>,
}

impl PrinterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured printers, applying the same
    /// single-default rule as [`add_printer`](Self::add_printer).
    pub fn with_printers(printers: impl IntoIterator<Item = PrinterConfig>) -> Self {
        let mut registry = Self::new();
        for printer in printers {
            registry.add_printer(printer);
        }
        registry
    }

    /// All printers in registration order.
    pub fn list(&self) -> &[PrinterConfig] {
        &self.printers
    }

    pub fn get(&self, id: &PrinterId) -> Option<&PrinterConfig> {
        self.printers.iter().find(|p| &p.id == id)
    }

    fn get_mut(&mut self, id: &PrinterId) -> Option<&mut PrinterConfig> {
        self.printers.iter_mut().find(|p| &p.id == id)
    }

    pub fn default_printer(&self) -> Option<&PrinterConfig> {
        self.printers.iter().find(|p| p.is_default)
    }

    /// Register a printer, replacing any existing entry with the same id.
    ///
    /// A printer flagged as default takes the flag from every other printer.
    /// When no default exists afterwards, the new printer becomes default if
    /// it is enabled.  Returns the replaced entry, if any.
    pub fn add_printer(&mut self, printer: PrinterConfig) -> Option<PrinterConfig> {
        let id = printer.id.clone();
        let make_default = printer.is_default;

        let replaced = match self.get_mut(&id) {
            Some(existing) => Some(std::mem::replace(existing, printer)),
            None => {
                self.printers.push(printer);
                None
            }
        };

        if make_default {
            self.set_default(&id);
        } else if self.default_printer().is_none()
            && let Some(p) = self.get_mut(&id)
            && p.is_enabled
        {
            p.is_default = true;
        }

        info!(printer_id = %id, replaced = replaced.is_some(), "printer registered");
        replaced
    }

    /// Enable or disable a printer.  Jobs already queued are not touched.
    ///
    /// Returns `false` if the printer is unknown.
    pub fn set_enabled(&mut self, id: &PrinterId, enabled: bool) -> bool {
        match self.get_mut(id) {
            Some(p) => {
                p.is_enabled = enabled;
                info!(printer_id = %id, enabled, "printer enablement changed");
                true
            }
            None => {
                debug!(printer_id = %id, "set_enabled on unknown printer ignored");
                false
            }
        }
    }

    /// Make `id` the one and only default printer.  Unknown ids are ignored.
    pub fn set_default(&mut self, id: &PrinterId) -> bool {
        if self.get(id).is_none() {
            debug!(printer_id = %id, "set_default on unknown printer ignored");
            return false;
        }
        for p in &mut self.printers {
            p.is_default = &p.id == id;
        }
        debug!(printer_id = %id, "default printer set");
        true
    }

    /// Apply the result of a test print.
    ///
    /// Success marks the printer online and stamps `last_used`; failure marks
    /// it as errored.  Returns the previous status when it changed.
    pub fn record_test_result(
        &mut self,
        id: &PrinterId,
        success: bool,
        now: DateTime<Utc>,
    ) -> Option<PrinterStatus> {
        let p = self.get_mut(id)?;
        let previous = p.status;
        if success {
            p.status = PrinterStatus::Online;
            p.last_used = Some(now);
        } else {
            warn!(printer_id = %id, "printer test failed");
            p.status = PrinterStatus::Error;
        }
        (previous != p.status).then_some(previous)
    }

    /// Overwrite a printer's status.  Returns the previous status when it changed.
    pub fn set_status(&mut self, id: &PrinterId, status: PrinterStatus) -> Option<PrinterStatus> {
        let p = self.get_mut(id)?;
        let previous = std::mem::replace(&mut p.status, status);
        (previous != status).then_some(previous)
    }

    /// Stamp `last_used` after a successful print.
    pub fn mark_used(&mut self, id: &PrinterId, now: DateTime<Utc>) {
        if let Some(p) = self.get_mut(id) {
            p.last_used = Some(now);
        }
    }

    /// Remove a printer.
    ///
    /// If it was the default, the first remaining enabled printer inherits
    /// the flag; with no enabled printer left there is no default.
    pub fn remove_printer(&mut self, id: &PrinterId) -> Option<PrinterConfig> {
        let index = self.printers.iter().position(|p| &p.id == id)?;
        let removed = self.printers.remove(index);

        if removed.is_default {
            match self.printers.iter_mut().find(|p| p.is_enabled) {
                Some(next) => {
                    next.is_default = true;
                    info!(removed = %id, new_default = %next.id, "default printer reassigned");
                }
                None => info!(removed = %id, "no enabled printer left to become default"),
            }
        }

        Some(removed)
    }

    /// Printer a job should be sent to when the processor picks it up.
    ///
    /// Preference order: the job's previously assigned printer if still
    /// registered and enabled, then the enabled default, then the first
    /// enabled printer.
    pub fn select_for_job(&self, preferred: Option<&PrinterId>) -> Option<PrinterId> {
        preferred
            .and_then(|id| self.get(id))
            .filter(|p| p.is_enabled)
            .or_else(|| self.default_printer().filter(|p| p.is_enabled))
            .or_else(|| self.printers.iter().find(|p| p.is_enabled))
            .map(|p| p.id.clone())
    }
}
