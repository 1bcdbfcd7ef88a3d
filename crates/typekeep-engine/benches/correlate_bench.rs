// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the before/after run correlator.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use typekeep_core::{BBox, CorrelationTolerances, TextRun};
use typekeep_engine::{EditHint, correlate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A page-sized grid of runs, one line every 12pt across `pages` pages.
fn runs(pages: usize, lines: usize, font: &str) -> Vec<TextRun> {
    let mut out = Vec::with_capacity(pages * lines);
    for page in 0..pages {
        for line in 0..lines {
            let y = 760.0 - line as f32 * 12.0;
            out.push(TextRun {
                id: TextRun::derive_id(page, 40.0, y, 9.0, 0),
                page,
                content: format!("Line {line:03} LUIZ EDUARDO ALVES DE ALCANTARA"),
                bbox: BBox::new(40.0, y, 180.0, 9.0),
                font_name: font.to_string(),
                font_resource: "F1".to_string(),
                font_size: 9.0,
                color: "#000000".to_string(),
                rotation: 0.0,
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Every run is a target: the worst case of an all-occurrences edit.
fn bench_correlate_all_targets(c: &mut Criterion) {
    let pre = runs(4, 60, "ArialMT");
    let post: Vec<TextRun> = runs(4, 60, "Helvetica")
        .into_iter()
        .map(|mut r| {
            r.content = r.content.replace("ALCANTARA", "ALCÂNTARA");
            r
        })
        .collect();
    let targets: Vec<String> = pre.iter().map(|r| r.id.clone()).collect();
    let tolerances = CorrelationTolerances::default();

    c.bench_function("correlate (240 targets x 240 runs)", |b| {
        b.iter(|| {
            let comparisons = correlate(
                black_box(&pre),
                black_box(&post),
                &targets,
                EditHint::new("ALCANTARA", "ALCÂNTARA"),
                &tolerances,
            );
            black_box(comparisons);
        });
    });
}

criterion_group!(benches, bench_correlate_all_targets);
criterion_main!(benches);
