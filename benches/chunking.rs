use criterion::{Criterion, criterion_group, criterion_main};
use docqa::embeddings::{ChunkingConfig, chunk_document};
use std::hint::black_box;

fn sample_text() -> String {
    (0..400)
        .map(|i| {
            format!(
                "Section {} explains how the quarterly figures were gathered. \
                 Each team reported its numbers separately and the totals were reconciled.\n\n",
                i
            )
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = sample_text();
    let config = ChunkingConfig::default();
    c.bench_function("chunking", |b| {
        b.iter(|| chunk_document("report.txt", black_box(&text), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
