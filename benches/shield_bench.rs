/*!
 * Benchmarks for the hot paths of a translation run.
 *
 * Measures performance of:
 * - Segment extraction from RST sources
 * - Markup protection
 * - Restoration with and without lost placeholders
 */

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use docshield::document::extract_segments;
use docshield::shield::{MarkupShield, RestoreOptions};

const PARAGRAPHS: [&str; 5] = [
    "Check out items from the :ref:`checkout <checkout-label>` page.",
    "Set the |library| preferences in :doc:`/administration` before you start.",
    "Use **bold** and *emphasis* with ``koha-restart`` as described at https://koha-community.org/manual.",
    "Renew items before they are due.",
    "See the :ref:`item search <item-searching-label>` tool and :ref:`reports-label`.",
];

/// Generate an RST document with a heading and `count` paragraphs
fn generate_document(count: usize) -> String {
    let mut text = String::from("Circulation\n===========\n\n");
    for i in 0..count {
        text.push_str(PARAGRAPHS[i % PARAGRAPHS.len()]);
        text.push_str("\n\n");
    }
    text
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_segments");
    for size in [10, 100, 1000].iter() {
        let document = generate_document(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &document, |b, document| {
            b.iter(|| extract_segments("circulation.rst", black_box(document)))
        });
    }
    group.finish();
}

fn bench_protect(c: &mut Criterion) {
    let shield = MarkupShield::new(RestoreOptions::default());
    let mut group = c.benchmark_group("protect");
    for (index, paragraph) in PARAGRAPHS.iter().enumerate() {
        group.bench_with_input(BenchmarkId::from_parameter(index), paragraph, |b, paragraph| {
            b.iter(|| shield.protect(black_box(paragraph)))
        });
    }
    group.finish();
}

fn bench_restore(c: &mut Criterion) {
    let shield = MarkupShield::new(RestoreOptions::default());
    let (protected, map) = shield.protect(PARAGRAPHS[2]);

    c.bench_function("restore_intact", |b| {
        b.iter(|| shield.restore(black_box(&protected), &map))
    });

    // Every placeholder dropped by the service
    let lost = "Använd fetstil och kursiv enligt beskrivningen.";
    c.bench_function("restore_all_lost", |b| b.iter(|| shield.restore(black_box(lost), &map)));
}

criterion_group!(benches, bench_extraction, bench_protect, bench_restore);
criterion_main!(benches);
