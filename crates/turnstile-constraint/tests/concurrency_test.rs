mod helpers;

use std::sync::Arc;

use futures::future::join_all;
use helpers::init_tracing;
use turnstile_constraint::{Constraint, NoJitter};
use turnstile_core::models::{
    blocked_count, used_permits, ConsumerContext, ConsumerId, ConsumerState, ConstraintId,
    ConstraintSpec, ConstraintUnit, Strategy,
};
use turnstile_registry::{ConstraintRegistry, InMemoryRegistry};

const LIMITS: u32 = 4;
const WRITERS: usize = 24;

/// A storm of racing registrations must never overcommit the unit, and a
/// promote/finish drain must eventually run every one of them.
#[tokio::test]
async fn racing_registrations_never_breach_the_limit() {
    init_tracing();
    let registry = InMemoryRegistry::new();
    let constraint = Constraint::create(
        ConstraintId::new("licenses"),
        ConstraintSpec::new(Strategy::Asap, LIMITS),
        &registry,
    )
    .await
    .unwrap()
    .with_jitter(Arc::new(NoJitter));
    let unit = ConstraintUnit::new("unit-1");

    let tasks = (0..WRITERS).map(|i| {
        let constraint = constraint.clone();
        let registry = registry.clone();
        let unit = unit.clone();
        tokio::spawn(async move {
            constraint
                .register_consumer(
                    &unit,
                    ConsumerId::new(format!("writer-{i}")),
                    (i as u32 % 3) + 1,
                    ConsumerContext::default(),
                    &registry,
                )
                .await
                .unwrap()
        })
    });
    let states: Vec<ConsumerState> = join_all(tasks)
        .await
        .into_iter()
        .map(|handle| handle.unwrap())
        .collect();

    // nobody was rejected or lost, and the committed occupancy is legal
    assert_eq!(states.len(), WRITERS);
    assert!(states
        .iter()
        .all(|s| matches!(s, ConsumerState::Active | ConsumerState::Blocked)));
    let consumers = registry.load_consumers(constraint.id(), &unit).await.unwrap();
    assert_eq!(consumers.len(), WRITERS);
    assert!(used_permits(&consumers) <= LIMITS);

    // drain: promote whatever fits, finish whatever runs, checking the
    // invariant at every observable point
    let mut finished = 0;
    while finished < WRITERS {
        let runnable = constraint.runnable_consumers(&unit, &registry).await.unwrap();
        for id in &runnable.consumer_ids {
            assert!(constraint
                .consumer_unblocked(&unit, id, &ConsumerContext::default(), &registry)
                .await
                .unwrap());
        }

        let consumers = registry.load_consumers(constraint.id(), &unit).await.unwrap();
        assert!(used_permits(&consumers) <= LIMITS);

        let active: Vec<ConsumerId> = consumers
            .iter()
            .filter(|c| c.is_active())
            .map(|c| c.id.clone())
            .collect();
        assert!(!active.is_empty(), "drain stalled with {finished} finished");
        for id in &active {
            assert!(constraint.consumer_finished(&unit, id, &registry).await.unwrap());
            finished += 1;
        }
    }

    let consumers = registry.load_consumers(constraint.id(), &unit).await.unwrap();
    assert_eq!(used_permits(&consumers), 0);
    assert_eq!(blocked_count(&consumers), 0);
    assert!(consumers.iter().all(|c| c.state == ConsumerState::Finished));
}

/// Concurrent FIFO registrations still respect the strict line when drained:
/// every promotion round picks consumers in stored submission order.
#[tokio::test]
async fn fifo_drain_promotes_in_submission_order() {
    let registry = InMemoryRegistry::new();
    let constraint = Constraint::create(
        ConstraintId::new("deploys"),
        ConstraintSpec::new(Strategy::Fifo, 2),
        &registry,
    )
    .await
    .unwrap()
    .with_jitter(Arc::new(NoJitter));
    let unit = ConstraintUnit::new("unit-1");

    let tasks = (0..12).map(|i| {
        let constraint = constraint.clone();
        let registry = registry.clone();
        let unit = unit.clone();
        tokio::spawn(async move {
            constraint
                .register_consumer(
                    &unit,
                    ConsumerId::new(format!("job-{i}")),
                    1,
                    ConsumerContext::default(),
                    &registry,
                )
                .await
                .unwrap();
        })
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    let stored_order: Vec<ConsumerId> = registry
        .load_consumers(constraint.id(), &unit)
        .await
        .unwrap()
        .iter()
        .map(|c| c.id.clone())
        .collect();
    assert_eq!(stored_order.len(), 12);

    // finish the initially admitted consumers, then drain in rounds; the
    // concatenation of promotion rounds must replay the stored order
    let mut promoted: Vec<ConsumerId> = Vec::new();
    loop {
        let consumers = registry.load_consumers(constraint.id(), &unit).await.unwrap();
        assert!(used_permits(&consumers) <= 2);
        for consumer in consumers.iter().filter(|c| c.is_active()) {
            constraint
                .consumer_finished(&unit, &consumer.id, &registry)
                .await
                .unwrap();
        }

        let runnable = constraint.runnable_consumers(&unit, &registry).await.unwrap();
        if runnable.is_empty() {
            break;
        }
        for id in &runnable.consumer_ids {
            constraint
                .consumer_unblocked(&unit, id, &ConsumerContext::default(), &registry)
                .await
                .unwrap();
        }
        promoted.extend(runnable.consumer_ids);
    }

    let promoted_in_stored_order: Vec<ConsumerId> = stored_order
        .iter()
        .filter(|id| promoted.contains(id))
        .cloned()
        .collect();
    assert_eq!(promoted, promoted_in_stored_order);
}
