use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tangle_consensus::TipSelector;
use tangle_ledger::Tangle;
use tangle_types::{AgentId, Timestep, TxId};

/// A randomly grown tangle of `size` transactions.
fn grown_tangle(size: u32) -> Tangle {
    let mut graph = Tangle::new();
    let mut rng = StdRng::seed_from_u64(7);
    let mut ids: Vec<TxId> = vec![graph.genesis()];
    for i in 0..size {
        let a = ids[rng.gen_range(0..ids.len())];
        let b = ids[rng.gen_range(0..ids.len())];
        let id = graph
            .add(AgentId::new(i % 50), Timestep::new(i as u64), vec![a, b])
            .unwrap();
        ids.push(id);
    }
    graph
}

fn bench_mcmc_select(c: &mut Criterion) {
    let mut graph = grown_tangle(2000);
    let mut selector = TipSelector::default();
    let mut rng = StdRng::seed_from_u64(11);

    c.bench_function("mcmc_select_2_of_2000", |b| {
        b.iter(|| selector.select(&mut graph, 2, &mut rng).unwrap())
    });
}

fn bench_walk_back(c: &mut Criterion) {
    let mut graph = grown_tangle(2000);
    let tips = graph.tips().to_vec();
    let mut rng = StdRng::seed_from_u64(13);

    c.bench_function("walk_back_depth_14", |b| {
        b.iter(|| {
            // Fresh selector each iteration so the walk is not a cache hit.
            let mut selector = TipSelector::default();
            let start = tips[rng.gen_range(0..tips.len())];
            selector.walk_back(&mut graph, start, 14)
        })
    });
}

criterion_group!(benches, bench_mcmc_select, bench_walk_back);
criterion_main!(benches);
