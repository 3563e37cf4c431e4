use criterion::{Criterion, criterion_group, criterion_main};
use sparqlkit::prelude::*;
use std::hint::black_box;

/// A BGP chain `?v0 :p0 ?v1 . ?v1 :p1 ?v2 . ...` with renamed variables per
/// `tag`. Constant predicates keep the backtracking search honest while the
/// variable mapping still has to be discovered.
fn chain_query(n: usize, tag: &str) -> Query {
    let mut bgp = Bgp::default();
    for i in 0..n {
        bgp.add((
            format!("?{tag}{i}"),
            format!(":p{i}"),
            format!("?{tag}{}", i + 1),
        ))
        .unwrap();
    }
    let mut query = Query::new();
    query.add(bgp).unwrap();
    query
}

/// Same shape but with one shared predicate, so every triple is a candidate
/// for every other and the search degenerates toward its worst case.
fn uniform_chain_query(n: usize, tag: &str) -> Query {
    let mut bgp = Bgp::default();
    for i in 0..n {
        bgp.add((
            format!("?{tag}{i}"),
            ":p".to_string(),
            format!("?{tag}{}", i + 1),
        ))
        .unwrap();
    }
    let mut query = Query::new();
    query.add(bgp).unwrap();
    query
}

fn bench_isomorphism(c: &mut Criterion) {
    let a = chain_query(24, "a");
    let b = chain_query(24, "b");
    c.bench_function("bgp_chain_24_distinct_predicates", |bench| {
        bench.iter(|| black_box(&a).is_isomorphic(black_box(&b)))
    });

    let a = uniform_chain_query(10, "a");
    let b = uniform_chain_query(10, "b");
    c.bench_function("bgp_chain_10_uniform_predicate", |bench| {
        bench.iter(|| black_box(&a).is_isomorphic(black_box(&b)))
    });
}

criterion_group!(benches, bench_isomorphism);
criterion_main!(benches);
