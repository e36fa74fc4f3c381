// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tillprint — headless bill printer queue service
//
// Entry point. Initialises logging and backend services, starts the queue
// runner and keeps it going until Ctrl-C.  `tillprint demo` additionally
// queues a few sample documents.

mod services;

use std::time::Duration;

use tillprint_core::error::Result;
use tillprint_core::human_errors::humanize_error;
use tillprint_core::types::{DocumentType, Priority};
use tillprint_print::{PrintService, QueueRunner};

use services::app_services::AppServices;
use services::event_log::EventLog;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Tillprint starting");

    let svc = match AppServices::init() {
        Ok(s) => s,
        Err(e) => {
            let human = humanize_error(&e);
            tracing::error!(error = %e, suggestion = %human.suggestion, "persistent storage failed, using in-memory fallback");
            AppServices::fallback()?
        }
    };

    let event_log = EventLog::spawn(svc.print());

    let config = svc.config();
    let online = svc.test_enabled_printers().await;
    tracing::info!(
        online,
        configured = config.printers.len(),
        retry_mode = ?config.queue.retry_mode,
        data_dir = %svc.data_dir().display(),
        "printer check finished"
    );

    if std::env::args().nth(1).as_deref() == Some("demo") {
        queue_samples(svc.print());
    }

    let mut runner = QueueRunner::new(svc.print().clone());
    runner.start();

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl-C, stopping now");
    }

    let stopped = runner.stop().await;
    let counts = svc.print().counts();

    // Dropping the last service handle closes the event channel.
    drop(runner);
    drop(svc);
    let logged = event_log.finish(Duration::from_secs(2)).await;

    tracing::info!(
        total = counts.total(),
        pending = counts.pending,
        completed = counts.completed,
        failed = counts.failed,
        events = ?logged,
        "Tillprint stopped"
    );
    stopped
}

/// A typical burst from the till: a receipt, its kitchen ticket, an invoice.
fn queue_samples(print: &PrintService) {
    print.enqueue(
        DocumentType::Receipt,
        serde_json::json!({
            "sale_id": "S-1001",
            "items": [{ "name": "Flat white", "qty": 2, "price": 3.40 }],
            "total": 6.80
        }),
        Priority::Normal,
    );
    print.enqueue(
        DocumentType::KitchenOrder,
        serde_json::json!({ "table": 4, "items": ["Toastie", "Soup"] }),
        Priority::High,
    );
    print.enqueue(
        DocumentType::Invoice,
        serde_json::json!({ "invoice": "INV-2026-0042", "customer": "Acme Ltd", "total": 118.00 }),
        Priority::Low,
    );
}
