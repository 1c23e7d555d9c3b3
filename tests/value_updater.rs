// CLASSIFICATION: COMMUNITY
// Filename: value_updater.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nodemirror::entity::demo_entities;
use nodemirror::error::Result;
use nodemirror::schedule::Periodic;
use nodemirror::source::{SharedSnapshots, SimulatedValues, SnapshotSource, ValueSource};
use nodemirror::{
    Entity, Leaf, MirrorError, NodeKey, NodeMirror, ReconcileTrigger, RecordingSpace,
    SpaceEvent, Snapshot, ValueUpdater, Variant,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fixed value everywhere except one leaf, which always fails.
struct FlakyValues {
    failing: i64,
}

impl ValueSource for FlakyValues {
    fn sample(&mut self, leaf: &Leaf) -> Result<Variant> {
        if leaf.id == self.failing {
            return Err(MirrorError::TransientUpdate {
                id: leaf.id,
                reason: "sensor offline".into(),
            });
        }
        Ok(Variant::Double(1.0))
    }
}

/// Snapshot source whose generation query always fails.
struct BrokenSnapshots;

impl SnapshotSource for BrokenSnapshots {
    fn generation(&mut self) -> Result<u64> {
        Err(MirrorError::Snapshot("upstream unavailable".into()))
    }

    fn latest(&mut self) -> Result<Snapshot> {
        Err(MirrorError::Snapshot("upstream unavailable".into()))
    }
}

fn setup(
    trigger: ReconcileTrigger,
) -> (NodeMirror, RecordingSpace, SharedSnapshots, ValueUpdater) {
    init_logging();
    let space = RecordingSpace::new();
    let mirror = NodeMirror::new(space.clone());
    mirror.bootstrap(&demo_entities()).expect("bootstrap");
    space.take();
    let snapshots = SharedSnapshots::new(Snapshot::new(1, demo_entities()));
    let updater = ValueUpdater::new(
        mirror.clone(),
        Box::new(snapshots.clone()),
        Box::new(FlakyValues { failing: 113 }),
    )
    .with_trigger(trigger)
    .starting_at(1);
    (mirror, space, snapshots, updater)
}

#[test]
fn failing_leaf_does_not_stop_the_tick() {
    let (mirror, space, _snapshots, mut updater) = setup(ReconcileTrigger::OnAdvance);
    let report = updater.tick().unwrap();
    assert_eq!(report.refresh.updated, 5);
    assert_eq!(report.refresh.failed.len(), 1);
    assert!(report.reconcile.is_none());

    assert_eq!(
        mirror.lookup_leaf(113).unwrap().unwrap().value,
        Variant::Double(0.0)
    );
    assert_eq!(
        mirror.lookup_leaf(114).unwrap().unwrap().value,
        Variant::Double(1.0)
    );
    let changed: Vec<_> = space.take();
    assert_eq!(changed.len(), 5);
    assert!(!changed.contains(&SpaceEvent::Changed(NodeKey::Leaf(113))));
}

#[test]
fn reconciles_only_when_generation_advances() {
    let (mirror, _space, snapshots, mut updater) = setup(ReconcileTrigger::OnAdvance);
    assert!(updater.tick().unwrap().reconcile.is_none());

    let mut entities = demo_entities();
    entities.push(Entity::point(115, "115", "11", "Point 5"));
    assert_eq!(snapshots.publish(entities).unwrap(), 2);

    let report = updater.tick().unwrap();
    assert_eq!(report.generation, Some(2));
    let applied = report.reconcile.expect("reconciled");
    assert_eq!(applied.leaves_created, 1);
    assert_eq!(updater.last_generation(), Some(2));
    // The new leaf is refreshed in the same tick.
    assert_eq!(
        mirror.lookup_leaf(115).unwrap().unwrap().value,
        Variant::Double(1.0)
    );

    assert!(updater.tick().unwrap().reconcile.is_none());
}

#[test]
fn disabled_trigger_never_reconciles() {
    let (mirror, _space, snapshots, mut updater) = setup(ReconcileTrigger::Disabled);
    snapshots.publish(Vec::new()).unwrap();
    let report = updater.tick().unwrap();
    assert!(report.reconcile.is_none());
    assert_eq!(mirror.inspect(|index| index.leaf_count()).unwrap(), 6);
}

#[test]
fn snapshot_failure_still_refreshes_values() {
    init_logging();
    let mirror = NodeMirror::new(RecordingSpace::new());
    mirror.bootstrap(&demo_entities()).unwrap();
    let mut updater = ValueUpdater::new(
        mirror.clone(),
        Box::new(BrokenSnapshots),
        Box::new(FlakyValues { failing: 0 }),
    );
    let report = updater.tick().unwrap();
    assert!(report.generation.is_none());
    assert!(report.reconcile.is_none());
    assert_eq!(report.refresh.updated, 6);
}

#[test]
fn simulated_values_stay_in_range() {
    init_logging();
    let mirror = NodeMirror::new(RecordingSpace::new());
    mirror.bootstrap(&demo_entities()).unwrap();
    let mut values = SimulatedValues::new(7, 10.0, 20.0);
    let report = mirror.refresh(&mut values).unwrap();
    assert_eq!(report.updated, 6);
    mirror
        .inspect(|index| {
            for leaf in index.leaves() {
                let v = leaf.value.as_f64().expect("numeric");
                assert!((10.0..20.0).contains(&v), "{v} out of range");
            }
        })
        .unwrap();
}

#[test]
fn spawned_updater_ticks_until_stopped() {
    let (mirror, _space, _snapshots, updater) = setup(ReconcileTrigger::OnAdvance);
    let handle = updater.spawn(Duration::from_millis(5)).unwrap();
    thread::sleep(Duration::from_millis(50));
    handle.stop();
    assert_eq!(
        mirror.lookup_leaf(111).unwrap().unwrap().value,
        Variant::Double(1.0)
    );
}

#[test]
fn periodic_stops_promptly() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let periodic = Periodic::spawn("test-ticker", Duration::from_secs(3600), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    assert_eq!(periodic.name(), "test-ticker");
    for _ in 0..200 {
        if ticks.load(Ordering::SeqCst) > 0 {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    periodic.stop();
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

#[test]
fn readers_never_see_a_partial_tree() {
    init_logging();
    let mirror = NodeMirror::new(RecordingSpace::new());
    mirror.bootstrap(&demo_entities()).unwrap();

    let mut grown = demo_entities();
    grown.push(Entity::group(13, "13", "1", "Channel 3"));
    grown.push(Entity::device(14, "14", "13", "Device 4"));
    for p in 0..8 {
        let id = 140 + p;
        grown.push(Entity::point(id, &id.to_string(), "14", "Point"));
    }

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let mirror = mirror.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for round in 0..200 {
                let entities = if round % 2 == 0 { grown.clone() } else { demo_entities() };
                mirror.reconcile(&entities).unwrap();
            }
            done.store(true, Ordering::Release);
        })
    };

    let mut checks = 0;
    while !done.load(Ordering::Acquire) || checks == 0 {
        let consistent = mirror
            .inspect(|index| {
                let leaves_attached = index.leaves().all(|leaf| {
                    index
                        .lookup_container(&leaf.parent_path)
                        .is_some_and(|parent| parent.children.contains(&leaf.key()))
                });
                let subtree_whole = match index.lookup_container("14") {
                    Some(device) => device.children.len() == 8,
                    None => (140..148).all(|id| index.lookup_leaf(id).is_none()),
                };
                leaves_attached && subtree_whole
            })
            .unwrap();
        assert!(consistent, "reader saw a partially applied pass");
        checks += 1;
    }
    writer.join().unwrap();
}
