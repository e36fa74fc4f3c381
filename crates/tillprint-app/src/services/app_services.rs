// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — loads configuration, opens the audit database and
// builds the print service the rest of the binary talks to.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tillprint_audit::AuditLog;
use tillprint_core::AppConfig;
use tillprint_core::error::{Result, TillprintError};
use tillprint_core::human_errors::humanize_error;
use tillprint_core::types::{ConnectionType, PaperSize, PrinterConfig, PrinterType};
use tillprint_print::{PrintService, RandomStatusProbe};
use tracing::{error, info, instrument, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";
const AUDIT_FILE: &str = "audit.db";

/// Shared application services.
///
/// Cheap to clone; the print service and the loaded config are shared.
#[derive(Clone)]
pub struct AppServices {
    print: PrintService,
    data_dir: PathBuf,
    config: Arc<AppConfig>,
}

impl AppServices {
    /// Initialise from the platform data directory.  Call once at startup.
    pub fn init() -> Result<Self> {
        Self::init_in(data_dir::data_dir())
    }

    /// Initialise from an explicit data directory.
    ///
    /// A missing config file is created with defaults (and a single demo
    /// printer) so operators have something to edit.  A damaged one is
    /// reported and replaced by defaults for this run only.  An audit
    /// database that cannot be opened is replaced by an in-memory one; the
    /// loaded printers and queue settings are kept either way.
    #[instrument(skip_all, fields(path = %dir.display()))]
    pub fn init_in(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;

        let config = match load_config(&dir) {
            Ok(Some(config)) => config,
            Ok(None) => {
                let config = default_config();
                persist_config(&dir, &config)?;
                info!("wrote default configuration");
                config
            }
            Err(e) => {
                warn!(error = %e, "configuration unreadable, using defaults");
                default_config()
            }
        };

        let audit = if config.audit_enabled {
            match AuditLog::open(dir.join(AUDIT_FILE)) {
                Ok(log) => Some(log),
                Err(e) => {
                    let human = humanize_error(&e);
                    error!(error = %e, suggestion = %human.suggestion, "audit database unavailable, keeping history in memory");
                    Some(AuditLog::open_in_memory()?)
                }
            }
        } else {
            None
        };

        Self::build(dir, config, audit)
    }

    /// Defaults with an in-memory audit log, for when the data directory is unusable.
    pub fn fallback() -> Result<Self> {
        Self::build(data_dir::fallback_dir(), default_config(), Some(AuditLog::open_in_memory()?))
    }

    fn build(dir: PathBuf, config: AppConfig, audit: Option<AuditLog>) -> Result<Self> {
        let mut builder =
            PrintService::builder(config.queue.clone()).printers(config.printers.iter().cloned());

        let flip = config.queue.status_flip_probability;
        if flip > 0.0 {
            builder = builder.probe(RandomStatusProbe::new(flip));
        }
        if let Some(log) = audit {
            builder = builder.audit_log(log);
        }

        let print = builder.build()?;
        info!(
            printers = config.printers.len(),
            audit = config.audit_enabled,
            "app services initialised"
        );

        Ok(Self {
            print,
            data_dir: dir,
            config: Arc::new(config),
        })
    }

    pub fn print(&self) -> &PrintService {
        &self.print
    }

    /// Send a test page to every enabled printer.  Returns how many accepted it.
    pub async fn test_enabled_printers(&self) -> usize {
        let mut online = 0;
        for printer in self.print.list_printers().into_iter().filter(|p| p.is_enabled) {
            match self.print.test_printer(&printer.id).await {
                Ok(true) => online += 1,
                Ok(false) => warn!(printer_id = %printer.id, "printer failed its test page"),
                Err(e) => warn!(printer_id = %printer.id, error = %e, "printer test skipped"),
            }
        }
        online
    }

    // -- Accessors -----------------------------------------------------------

    /// Get a clone of the current config.
    pub fn config(&self) -> AppConfig {
        self.config.as_ref().clone()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn default_config() -> AppConfig {
    let mut counter = PrinterConfig::new(
        "front-counter",
        "Front counter",
        PrinterType::Thermal,
        ConnectionType::Usb,
        PaperSize::Roll80,
    );
    counter.is_default = true;

    AppConfig {
        printers: vec![counter],
        ..AppConfig::default()
    }
}

// -- Config file persistence -------------------------------------------------

/// `Ok(None)` when no config file exists yet.
fn load_config(data_dir: &Path) -> Result<Option<AppConfig>> {
    let path = data_dir.join(CONFIG_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let config: AppConfig = serde_json::from_str(&data)?;
    config
        .queue
        .validate()
        .map_err(|e| TillprintError::Config(format!("{}: {e}", path.display())))?;
    Ok(Some(config))
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
