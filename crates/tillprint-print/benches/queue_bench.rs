// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the print queue state machine, printer selection,
// and the audit trail in the tillprint-print crate.

use chrono::Utc;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tillprint_audit::{AuditLog, hash_payload};
use tillprint_core::types::{
    ConnectionType, DocumentType, JobId, PaperSize, PrinterConfig, PrinterId, PrinterType,
    Priority,
};
use tillprint_print::queue::PrintQueue;
use tillprint_print::registry::PrinterRegistry;
use tillprint_print::retry::RetryPolicy;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A receipt with a realistic number of line items.
fn receipt_payload(lines: usize) -> serde_json::Value {
    let items: Vec<_> = (0..lines)
        .map(|i| serde_json::json!({ "sku": format!("SKU-{i:05}"), "qty": 1, "price": 3.50 }))
        .collect();
    serde_json::json!({ "sale_id": "S-1001", "items": items, "total": 3.50 * lines as f64 })
}

fn registry() -> PrinterRegistry {
    PrinterRegistry::with_printers((0..4).map(|i| {
        PrinterConfig::new(
            format!("till-{i}"),
            format!("Till {i}"),
            PrinterType::Thermal,
            ConnectionType::Network,
            PaperSize::Roll80,
        )
    }))
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Enqueue, print and complete one receipt behind a backlog of finished jobs.
///
/// The queue keeps finished jobs until it is cleared, so lookups scan the
/// backlog.  Backlog sizes cover a quiet shift up to a busy day.
fn bench_print_cycle(c: &mut Criterion) {
    let payload = receipt_payload(12);
    let registry = registry();

    let mut group = c.benchmark_group("print_cycle");
    for backlog in [0usize, 100, 1_000] {
        let mut queue = PrintQueue::new();
        let now = Utc::now();
        for _ in 0..backlog {
            queue.enqueue(DocumentType::Receipt, payload.clone(), Priority::Normal, now);
            if let Some(job) = queue.begin_next(|p| registry.select_for_job(p)) {
                queue.complete(&job.id, now);
            }
        }

        group.bench_function(format!("backlog {backlog}"), |b| {
            b.iter(|| {
                let mut queue = queue.clone();
                queue.enqueue(DocumentType::Receipt, black_box(payload.clone()), Priority::High, now);
                let job = queue
                    .begin_next(|p| registry.select_for_job(p))
                    .expect("pending job");
                black_box(queue.complete(&job.id, now));
            });
        });
    }
    group.finish();
}

/// Retry scheduler pass over a queue where a tenth of the jobs are parked.
fn bench_requeue_due(c: &mut Criterion) {
    let policy = RetryPolicy::default();
    let now = Utc::now();
    let mut queue = PrintQueue::new();
    let registry = registry();
    for i in 0..1_000 {
        queue.enqueue(DocumentType::KitchenOrder, receipt_payload(3), Priority::Normal, now);
        if let Some(job) = queue.begin_next(|p| registry.select_for_job(p)) {
            if i % 10 == 0 {
                queue.fail(&job.id, "offline".into(), now, &policy);
            } else {
                queue.complete(&job.id, now);
            }
        }
    }

    c.bench_function("requeue_due (1000 jobs)", |b| {
        b.iter(|| {
            let mut queue = queue.clone();
            black_box(queue.requeue_due(black_box(now), &policy));
        });
    });
}

/// Payload hashing for small receipts up to long end-of-day reports.
fn bench_payload_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_hash_sha256");
    for lines in [5usize, 50, 500] {
        let payload = receipt_payload(lines);
        group.bench_function(format!("{lines} lines"), |b| {
            b.iter(|| black_box(hash_payload(black_box(&payload))));
        });
    }
    group.finish();
}

/// Steady-state insertion into an in-memory audit log.
fn bench_audit_record(c: &mut Criterion) {
    c.bench_function("audit_record (in-memory SQLite)", |b| {
        let log = AuditLog::open_in_memory().expect("open in-memory audit log");
        let job = JobId::new();
        let printer = PrinterId::new("till-0");

        b.iter(|| {
            log.record(
                black_box("print_completed"),
                Some(&job),
                black_box("abcdef1234567890abcdef1234567890abcdef1234567890abcdef1234567890"),
                true,
                Some(printer.as_str()),
            )
            .expect("record failed");
        });
    });
}

criterion_group!(
    benches,
    bench_print_cycle,
    bench_requeue_due,
    bench_payload_hash,
    bench_audit_record,
);
criterion_main!(benches);
