//! Benchmarks for statement writes and pattern resolution.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};

use quadgraph::config::StoreConfig;
use quadgraph::model::{CompleteStatement, Context, Literal, Slot, Uri, WildcardStatement};
use quadgraph::{EncodingPolicy, RdfStore};

fn uri(s: String) -> Uri {
    Uri::new(s).unwrap()
}

fn statements(count: usize) -> Vec<CompleteStatement> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    (0..count)
        .map(|i| {
            let subject = uri(format!("http://ex.org/node/{}", rng.gen_range(0..count / 4 + 1)));
            let predicate = uri(format!("http://ex.org/pred/{}", rng.gen_range(0..8)));
            let contexts = vec![Context::named(uri(format!("urn:ctx:{}", rng.gen_range(0..4))))];
            if i % 2 == 0 {
                let object = uri(format!("http://ex.org/node/{}", rng.gen_range(0..count)));
                CompleteStatement::new(subject, predicate, object, contexts)
            } else {
                CompleteStatement::new(subject, predicate, Literal::plain(format!("v{i}")), contexts)
            }
        })
        .collect()
}

fn bench_add(c: &mut Criterion) {
    let batch = statements(1_000);
    for policy in EncodingPolicy::ALL {
        c.bench_function(&format!("add_1k_{policy}"), |bench| {
            bench.iter_batched(
                || RdfStore::in_memory(StoreConfig::with_encoding(policy)).unwrap(),
                |store| black_box(store.add_statements(&batch).unwrap()),
                BatchSize::SmallInput,
            )
        });
    }
}

fn bench_subject_lookup(c: &mut Criterion) {
    let batch = statements(1_000);
    for policy in EncodingPolicy::ALL {
        let store = RdfStore::in_memory(StoreConfig::with_encoding(policy)).unwrap();
        store.add_statements(&batch).unwrap();
        let query = WildcardStatement::new(
            Slot::Bound(batch[0].subject().clone()),
            batch[0].predicate().clone(),
            Slot::any(),
            Slot::any(),
        );
        c.bench_function(&format!("subject_predicate_{policy}"), |bench| {
            bench.iter(|| black_box(store.get_statements(&query).unwrap()))
        });
    }
}

fn bench_remove(c: &mut Criterion) {
    let batch = statements(200);
    for policy in EncodingPolicy::ALL {
        c.bench_function(&format!("remove_200_{policy}"), |bench| {
            bench.iter_batched(
                || {
                    let store = RdfStore::in_memory(StoreConfig::with_encoding(policy)).unwrap();
                    store.add_statements(&batch).unwrap();
                    store
                },
                |store| {
                    for st in &batch {
                        black_box(store.remove_statement(st).unwrap());
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, bench_add, bench_subject_lookup, bench_remove);
criterion_main!(benches);
