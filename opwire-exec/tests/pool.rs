use std::sync::Arc;

use opwire_exec::{ConnectionPool, PoolConfig};

#[test]
fn in_flight_accounting_tracks_guards() {
    let pool = Arc::new(ConnectionPool::new(PoolConfig {
        max_in_flight: 4,
        ..Default::default()
    }));

    let g1 = pool.track();
    let g2 = pool.track();
    let stats = pool.stats();
    assert_eq!(stats.in_flight, 2);
    assert_eq!(stats.total_requests, 2);
    assert!((stats.utilization - 0.5).abs() < f64::EPSILON);

    drop(g1);
    drop(g2);
    let stats = pool.stats();
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.peak_in_flight, 2);
}

#[test]
fn prune_keeps_the_pool_usable() {
    let pool = Arc::new(ConnectionPool::new(PoolConfig::default()));
    let before = pool.stats().total_requests;

    pool.prune();

    let _guard = pool.track();
    assert_eq!(pool.stats().total_requests, before + 1);
    // A fresh client is in place after pruning.
    let _client = pool.client();
}
