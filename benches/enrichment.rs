use criterion::{black_box, criterion_group, criterion_main, Criterion};

use aopstat::{
    key_event_enrichment, AopMetadata, GeneRecord, GeneUniverse, KeKind, ReferenceSets,
};

fn universe(genes: usize) -> GeneUniverse {
    let records = (0..genes)
        .map(|at| {
            let log2fc = ((at % 13) as f64 - 6.0) / 2.0;
            let pval = ((at % 97) as f64 + 1.0) / 100.0;
            let significant = pval <= 0.05 && log2fc.abs() >= 1.0;
            GeneRecord::new(&format!("GENE{at}"), log2fc, pval, significant)
        })
        .collect();
    GeneUniverse::new(records)
}

fn pathway(sets: usize, set_size: usize, genes: usize) -> (ReferenceSets, AopMetadata) {
    let mut reference = ReferenceSets::new();
    let mut aop = AopMetadata::new("AOP:1");
    for set in 0..sets {
        let ke = format!("KE:{set}");
        let members: Vec<String> = (0..set_size)
            .map(|at| format!("GENE{}", (set * 71 + at * 13) % genes))
            .collect();
        reference.insert(&ke, &members);
        aop.insert(&ke, "Synthetic key event", KeKind::Intermediate);
    }
    (reference, aop)
}

fn enrichment_benchmark(c: &mut Criterion) {
    let universe = universe(10_000);
    let (reference, aop) = pathway(50, 80, 10_000);

    c.bench_function("enrichment 50 sets / 10k genes", |b| {
        b.iter(|| {
            key_event_enrichment(black_box(&universe), black_box(&reference), black_box(&aop))
                .unwrap()
        })
    });
}

criterion_group!(enrichment, enrichment_benchmark);
criterion_main!(enrichment);
