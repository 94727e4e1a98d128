use aes_prng::AesRng;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hmpc_common::field::{batch_inverse, FieldElement};
use hmpc_common::matrix::Matrix;
use rand::SeedableRng;

/// Benchmarks for the 61-bit field hot paths.
fn bench_field(c: &mut Criterion) {
    let mut rng = AesRng::from_entropy();

    c.bench_function("f61_mul", |b| {
        let x = black_box(FieldElement::<u64>::random(&mut rng));
        let y = black_box(FieldElement::<u64>::random(&mut rng));
        b.iter(|| x * y);
    });

    c.bench_function("f61_inverse", |b| {
        let x = black_box(FieldElement::<u64>::random(&mut rng));
        b.iter(|| x.inverse());
    });

    c.bench_function("f61_batch_inverse_1024", |b| {
        let values: Vec<FieldElement<u64>> = (0..1024)
            .map(|_| {
                let v = FieldElement::random(&mut rng);
                if v == FieldElement(0) {
                    FieldElement(1)
                } else {
                    v
                }
            })
            .collect();
        let values = black_box(values);
        b.iter(|| batch_inverse(&values));
    });

    c.bench_function("f61_matmul_64", |b| {
        let x = black_box(Matrix::<u64>::random(64, 64, &mut rng));
        let y = black_box(Matrix::<u64>::random(64, 64, &mut rng));
        b.iter(|| x.matmul(&y));
    });
}

criterion_group! {benches, bench_field}
criterion_main!(benches);
