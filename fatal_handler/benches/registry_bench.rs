//! Registry performance benchmarks

use criterion::{Criterion, criterion_group, criterion_main};
use fatal_handler::{FatalErrorRegistry, StaticTextHandler};
use std::hint::black_box;
use std::sync::{Arc, Barrier};
use std::thread;

fn handlers(n: usize) -> Vec<StaticTextHandler> {
    (0..n)
        .map(|i| StaticTextHandler::new(format!("h{i}"), format!("subsystem {i}: ok\n")))
        .collect()
}

/// Benchmark a register/remove pair on a registry that already holds 32 handlers
fn bench_register_remove(c: &mut Criterion) {
    let registry = FatalErrorRegistry::default();
    let resident = handlers(32);
    for handler in &resident {
        unsafe { registry.register(handler) };
    }
    let extra = StaticTextHandler::new("extra", "extra\n");

    c.bench_function("register_remove_32_resident", |b| {
        b.iter(|| {
            unsafe { registry.register(black_box(&extra)) };
            registry.remove(black_box(&extra));
        });
    });

    registry.reset();
}

/// Benchmark the crash path: take the list, run 64 handlers, free the list
fn bench_invoke_all(c: &mut Criterion) {
    let registry = FatalErrorRegistry::default();
    let resident = handlers(64);
    let mut out = std::io::sink();

    c.bench_function("invoke_all_64_handlers", |b| {
        b.iter(|| {
            for handler in &resident {
                unsafe { registry.register(handler) };
            }
            registry.invoke_all(black_box(&mut out));
        });
    });
}

/// Benchmark register/remove under contention from 4 threads
fn bench_contended_mutation(c: &mut Criterion) {
    c.bench_function("contended_register_remove_4_threads", |b| {
        b.iter(|| {
            let registry = Arc::new(FatalErrorRegistry::default());
            let barrier = Arc::new(Barrier::new(4));
            let mut workers = Vec::new();

            for _ in 0..4 {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                workers.push(thread::spawn(move || {
                    let own = handlers(8);
                    barrier.wait();
                    for _ in 0..50 {
                        for handler in &own {
                            unsafe { registry.register(handler) };
                        }
                        for handler in &own {
                            registry.remove(handler);
                        }
                    }
                }));
            }

            for worker in workers {
                worker.join().unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_register_remove,
    bench_invoke_all,
    bench_contended_mutation
);
criterion_main!(benches);
