//! End-to-end scenarios against the simulated cluster.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use canopy_replica::OrderedService;
use canopy_sim::{SimCluster, SimConfig};
use canopy_topology::Topology;
use canopy_types::GroupId;
use canopy_wire::{ClientRequest, Outcome};

fn tree() -> Arc<Topology> {
    let topology = Topology::build([
        (GroupId::new(0), vec![GroupId::new(1), GroupId::new(2)]),
        (GroupId::new(1), vec![GroupId::new(3)]),
    ])
    .unwrap();
    Arc::new(topology)
}

fn request(targets: &[u64]) -> ClientRequest {
    ClientRequest::new(
        targets.iter().copied().map(GroupId::new).collect(),
        Bytes::from_static(b"payload"),
    )
}

#[test]
fn a_two_target_request_reaches_both_children() {
    let cluster = SimCluster::new(tree(), SimConfig::testing());
    let request = request(&[1, 2]);

    let response = cluster.submit_to(GroupId::new(0), &request).unwrap();

    assert_eq!(response.outcome, Outcome::Forwarded);
    let contacted: Vec<u64> = response
        .downstream
        .iter()
        .map(|reply| reply.group.as_u64())
        .collect();
    assert_eq!(contacted, vec![1, 2]);
    assert!(
        response
            .downstream
            .iter()
            .all(|reply| reply.response.outcome == Outcome::Handled)
    );

    for group in [1, 2] {
        let handled = cluster
            .with_service(GroupId::new(group), |service| {
                service.ledger().was_handled(request.id)
            })
            .unwrap();
        assert!(handled, "group {group} should have delivered the request");
    }
    let handled_at_entry = cluster
        .with_service(GroupId::new(0), |service| {
            service.ledger().was_handled(request.id)
        })
        .unwrap();
    assert!(!handled_at_entry);
}

#[test]
fn deep_targets_relay_through_the_tree() {
    let cluster = SimCluster::new(tree(), SimConfig::testing());

    let response = cluster.submit_to(GroupId::new(0), &request(&[3])).unwrap();

    assert_eq!(response.outcome, Outcome::Forwarded);
    let relay = response.from_group(GroupId::new(1)).unwrap();
    assert_eq!(relay.outcome, Outcome::Forwarded);
    let leaf = relay.from_group(GroupId::new(3)).unwrap();
    assert_eq!(leaf.outcome, Outcome::Handled);
}

#[test]
fn sender_redundancy_meets_the_receive_threshold() {
    let config = SimConfig {
        redundancy: 3,
        min_receive_count: 3,
        wait_timeout: Duration::from_secs(2),
        ..SimConfig::testing()
    };
    let cluster = SimCluster::new(tree(), config);

    let response = cluster
        .submit_to(GroupId::new(0), &request(&[1, 3]))
        .unwrap();

    assert!(!response.outcome.is_error());
    let mid = response.from_group(GroupId::new(1)).unwrap();
    assert_eq!(mid.outcome, Outcome::Handled);
    let leaf = mid.from_group(GroupId::new(3)).unwrap();
    assert_eq!(leaf.outcome, Outcome::Handled);
}

#[test]
fn insufficient_redundancy_degrades_to_dispatch_failure() {
    let config = SimConfig {
        redundancy: 1,
        min_receive_count: 2,
        wait_timeout: Duration::from_millis(100),
        ..SimConfig::testing()
    };
    let cluster = SimCluster::new(tree(), config);

    let response = cluster.submit_to(GroupId::new(0), &request(&[1])).unwrap();

    assert_eq!(response.outcome, Outcome::Forwarded);
    assert_eq!(
        response.from_group(GroupId::new(1)).map(|r| r.outcome),
        Some(Outcome::DispatchFailed)
    );
}

#[test]
fn duplicate_submissions_return_the_cached_response() {
    let cluster = SimCluster::new(tree(), SimConfig::testing());
    let request = request(&[1, 2]);

    let first = cluster.submit_to(GroupId::new(0), &request).unwrap();
    let second = cluster.submit_to(GroupId::new(0), &request).unwrap();

    assert_eq!(first, second);
}

#[test]
fn snapshots_transfer_settled_state_between_clusters() {
    let cluster = SimCluster::new(tree(), SimConfig::testing());
    let request = request(&[1]);
    let first = cluster.submit_to(GroupId::new(0), &request).unwrap();

    let snapshot = cluster
        .with_service(GroupId::new(0), |service| service.snapshot())
        .unwrap()
        .unwrap();

    let restored = SimCluster::new(tree(), SimConfig::testing());
    restored
        .with_service(GroupId::new(0), |service| service.install_snapshot(&snapshot))
        .unwrap()
        .unwrap();

    // The restored entry group answers the duplicate from its cache
    // without contacting its children again.
    let replay = restored.submit_to(GroupId::new(0), &request).unwrap();
    assert_eq!(replay, first);
}

#[test]
fn unrelated_requests_settle_independently() {
    let cluster = SimCluster::new(tree(), SimConfig::testing());

    let stray = cluster.submit_to(GroupId::new(0), &request(&[9])).unwrap();
    assert_eq!(stray.outcome, Outcome::NoPath);

    let routed = cluster.submit_to(GroupId::new(0), &request(&[2])).unwrap();
    assert_eq!(routed.outcome, Outcome::Forwarded);
    assert_eq!(
        routed.from_group(GroupId::new(2)).map(|r| r.outcome),
        Some(Outcome::Handled)
    );
}
