// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for text-run extraction in the typekeep-document crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use typekeep_document::PdfDocument;
use typekeep_document::pdf::fixture::{FixtureFont, FixturePage, build_document};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Extract runs from a page of 200 positioned lines, the shape of a dense
/// form or statement.
fn bench_extract_text_runs(c: &mut Criterion) {
    let mut content = String::from("BT /F1 9 Tf 12 TL 40 760 Td\n");
    for line in 0..200 {
        content.push_str(&format!("(Line {line:03} LUIZ EDUARDO ALVES DE ALCANTARA) Tj T*\n"));
    }
    content.push_str("ET");

    let page = FixturePage::new(&content).with_font("F1", FixtureFont::standard("ArialMT"));
    let doc = PdfDocument::from_document(build_document(vec![page]));

    c.bench_function("extract_text_runs (200 lines)", |b| {
        b.iter(|| {
            let runs = doc.extract_text_runs().unwrap();
            black_box(runs);
        });
    });
}

criterion_group!(benches, bench_extract_text_runs);
criterion_main!(benches);
