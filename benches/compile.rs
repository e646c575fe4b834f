use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use viserio_container::*;

fn registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry
        .register_class(ClassMetadata::new("Clock").constructor(vec![], |_, _| {
            Ok(Value::Object(Instance::new("Clock", 0u64)))
        }))
        .register_class(ClassMetadata::new("Worker").constructor(
            vec![
                ParameterDescriptor::typed("clock", "Clock"),
                ParameterDescriptor::new("name").with_default("worker"),
            ],
            |_, args| Ok(Value::Object(Instance::new("Worker", args.len()))),
        ));
    registry
}

fn builder(services: usize) -> ContainerBuilder {
    let mut builder = ContainerBuilder::new(registry());
    builder.bind("clock", "Clock");
    for index in 0..services {
        builder
            .bind(format!("worker.{}", index), "Worker")
            .set_autowired(true)
            .add_argument(reference("clock"));
    }
    builder
}

// ===== Micro Benchmarks =====

fn bench_shared_hit(c: &mut Criterion) {
    let container = builder(1).build().unwrap();
    let _ = container.get("worker.0").unwrap();

    c.bench_function("shared_hit", |b| {
        b.iter(|| {
            let value = container.get(black_box("worker.0")).unwrap();
            black_box(value);
        })
    });
}

fn bench_shared_cold(c: &mut Criterion) {
    let container = builder(1).build().unwrap();

    c.bench_function("shared_cold", |b| {
        b.iter(|| {
            container.reset();
            black_box(container.get("worker.0").unwrap());
        })
    });
}

// ===== Macro Benchmarks =====

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for services in [10, 100, 1000] {
        let builder = builder(services);
        group.bench_with_input(BenchmarkId::from_parameter(services), &builder, |b, builder| {
            b.iter(|| black_box(builder.compile().unwrap()))
        });
    }
    group.finish();
}

fn bench_dump(c: &mut Criterion) {
    let mut group = c.benchmark_group("dump");
    for services in [10, 100, 1000] {
        let builder = builder(services);
        group.bench_with_input(BenchmarkId::from_parameter(services), &builder, |b, builder| {
            b.iter(|| black_box(builder.dump().unwrap()))
        });
    }
    group.finish();
}

criterion_group!(micro_benches, bench_shared_hit, bench_shared_cold);

criterion_group!(macro_benches, bench_compile, bench_dump);

criterion_main!(micro_benches, macro_benches);
