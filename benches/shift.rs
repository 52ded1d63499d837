use criterion::{black_box, criterion_group, criterion_main, Criterion};

use shift_lib::utils::randn32;
use shift_lib::{BorderMode, Shift};

pub fn table_build(c: &mut Criterion) {
    use shift_lib::AddrTable;

    let shape = black_box([32, 64, 64]);
    c.bench_function("addr table nearest", |b| {
        b.iter(|| AddrTable::build(&shape, &[1, -3, 5], BorderMode::Nearest).unwrap())
    });
    c.bench_function("addr table reflect, large shift", |b| {
        b.iter(|| AddrTable::build(&shape, &[100, -300, 5000], BorderMode::Reflect).unwrap())
    });
}

pub fn passes(c: &mut Criterion) {
    let shape = [32, 64, 64];
    let x = randn32(&shape);

    for (name, shifts) in [("inner axis shifted", vec![1, -3, 5]), ("inner axis fixed", vec![1, -3, 0])] {
        let mut op = Shift::<f32>::with_mode(shifts, BorderMode::Reflect);
        op.prepare_addr_table(&shape).unwrap();

        c.bench_function(&format!("forward, {}", name), |b| {
            b.iter(|| op.forward(black_box(&x.view())).unwrap())
        });
        c.bench_function(&format!("backward, {}", name), |b| {
            b.iter(|| op.backward(black_box(&x.view())).unwrap())
        });
    }
}

criterion_group!(tables, table_build);
criterion_group!(shift_passes, passes);

criterion_main!(tables, shift_passes);
