// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing error messages for till staff.
//
// Every technical error is mapped to a short sentence plus what to do next.
// The severity drives how loudly the till surfaces it.

use crate::error::TillprintError;

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Printer blip; the queue retries on its own.
    Transient,
    /// Staff must do something (enable a printer, pick a default).
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    /// Whether the queue will retry without operator action.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `TillprintError` into something the person behind the till can act on.
pub fn humanize_error(err: &TillprintError) -> HumanError {
    match err {
        TillprintError::SubmissionFailed(detail) => humanize_submission(detail),

        TillprintError::NoPrinterAvailable => HumanError {
            message: "No printer is switched on in the till settings.".into(),
            suggestion: "Enable a printer in Printer Settings, then tap Retry All.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        TillprintError::PrinterNotFound(id) => HumanError {
            message: "That printer is no longer configured.".into(),
            suggestion: format!("Choose another printer. (Printer: {id})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        TillprintError::JobNotFound(_) => HumanError {
            message: "That print job is no longer in the queue.".into(),
            suggestion: "It may have been cleared. Reprint from the sale if you still need it.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        TillprintError::JobInFlight(_) => HumanError {
            message: "That job is printing right now.".into(),
            suggestion: "Wait for it to finish before removing it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TillprintError::Database(_) => HumanError {
            message: "The print history could not be saved.".into(),
            suggestion: "Printing still works. Restart the till app if this keeps happening.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TillprintError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The till app cannot write its settings.".into(),
                    suggestion: "Check the permissions of the data folder.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        TillprintError::Runtime(_) => HumanError {
            message: "The print queue stopped unexpectedly.".into(),
            suggestion: "Restart the till app and reprint anything still waiting.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        TillprintError::Serialization(_) | TillprintError::Config(_) => HumanError {
            message: "The printer settings file is damaged.".into(),
            suggestion: "Fix or delete config.json in the data folder and restart.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

fn humanize_submission(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("offline") {
        HumanError {
            message: "The printer is not reachable.".into(),
            suggestion: "Check the printer is on and connected, then tap Retry All.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The printer did not accept the job.".into(),
            suggestion: format!("The queue retries automatically. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_submission_failure_is_transient() {
        let err = TillprintError::SubmissionFailed("printer did not acknowledge".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn offline_printer_needs_action() {
        let err = TillprintError::SubmissionFailed("printer kitchen is offline".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn no_printer_is_action_required() {
        let human = humanize_error(&TillprintError::NoPrinterAvailable);
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn broken_config_is_permanent() {
        let human = humanize_error(&TillprintError::Config("max_retries must be > 0".into()));
        assert_eq!(human.severity, Severity::Permanent);
    }
}
