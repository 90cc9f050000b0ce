use criterion::{Criterion, criterion_group, criterion_main};
use koneko_markup::{lex, parse, parse_batch, parse_document};
mod common;

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    group.sample_size(10);

    let content = common::generate_post(100);
    group.bench_function("lex", |b| {
        b.iter(|| {
            let out = lex(std::hint::black_box(&content));
            std::hint::black_box(out.tokens.len());
        });
    });

    let tokens = lex(&content).tokens;
    group.bench_function("parse", |b| {
        b.iter(|| {
            let out = parse(std::hint::black_box(&tokens));
            std::hint::black_box(out.is_ok());
        });
    });

    group.bench_function("document", |b| {
        b.iter(|| {
            let doc = parse_document("bench.md", std::hint::black_box(content.as_str()));
            std::hint::black_box(doc.is_ok());
        });
    });

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    group.sample_size(10);

    let sources: Vec<(String, String)> = (0..32)
        .map(|i| (format!("{i}.md"), common::generate_post(10)))
        .collect();
    group.bench_function("32_posts", |b| {
        b.iter(|| {
            let docs = parse_batch(std::hint::black_box(&sources));
            std::hint::black_box(docs.len());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_stages, bench_batch);
criterion_main!(benches);
