// CLASSIFICATION: COMMUNITY
// Filename: reconcile_tree.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

use std::collections::HashSet;

use nodemirror::entity::demo_entities;
use nodemirror::{
    DataType, Entity, MirrorError, NodeKey, NodeMirror, RecordingSpace, SpaceEvent, ValueRank,
    Variant,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn bootstrapped() -> (NodeMirror, RecordingSpace) {
    init_logging();
    let space = RecordingSpace::new();
    let mirror = NodeMirror::new(space.clone());
    mirror.bootstrap(&demo_entities()).expect("bootstrap");
    (mirror, space)
}

fn without(ids: &[i64]) -> Vec<Entity> {
    demo_entities()
        .into_iter()
        .filter(|e| !ids.contains(&e.id))
        .collect()
}

/// Every registration must name a parent that was registered earlier.
fn assert_parents_first(events: &[SpaceEvent]) {
    let mut live: HashSet<String> = HashSet::new();
    for event in events {
        match event {
            SpaceEvent::RegisterRoot { path } => {
                live.insert(path.clone());
            }
            SpaceEvent::RegisterContainer { path, parent } => {
                assert!(live.contains(parent), "{path} registered before {parent}");
                live.insert(path.clone());
            }
            SpaceEvent::RegisterLeaf { id, parent } => {
                assert!(live.contains(parent), "leaf {id} registered before {parent}");
            }
            _ => {}
        }
    }
}

#[test]
fn bootstrap_builds_demo_namespace() {
    init_logging();
    let space = RecordingSpace::new();
    let mirror = NodeMirror::new(space.clone());
    let report = mirror.bootstrap(&demo_entities()).unwrap();
    assert_eq!((report.roots, report.containers, report.leaves), (1, 2, 6));
    assert!(report.skipped.is_empty());

    let root = mirror.lookup_container("1").unwrap().unwrap();
    assert!(root.is_root());
    assert_eq!(
        root.children.iter().cloned().collect::<Vec<_>>(),
        vec![
            NodeKey::Container("11".into()),
            NodeKey::Container("12".into())
        ]
    );
    let group = mirror.lookup_container("11").unwrap().unwrap();
    assert_eq!(group.children.len(), 4);
    let leaf = mirror.lookup_leaf(121).unwrap().unwrap();
    assert_eq!(leaf.parent_path, "12");
    assert_eq!(leaf.value, Variant::Double(0.0));

    let events = space.events();
    assert_eq!(events[0], SpaceEvent::RegisterRoot { path: "1".into() });
    assert_parents_first(&events);
    let registered = events
        .iter()
        .filter(|e| e.is_structural())
        .count();
    assert_eq!(registered, 9);
}

#[test]
fn bootstrap_twice_is_rejected() {
    let (mirror, _space) = bootstrapped();
    let err = mirror.bootstrap(&demo_entities()).unwrap_err();
    assert!(matches!(err, MirrorError::Structural { .. }));
}

#[test]
fn unchanged_snapshot_emits_nothing() {
    let (mirror, space) = bootstrapped();
    space.take();
    let report = mirror.reconcile(&demo_entities()).unwrap();
    assert!(report.is_noop());
    assert!(space.events().is_empty());
    let again = mirror.reconcile(&demo_entities()).unwrap();
    assert!(again.is_noop());
}

#[test]
fn rename_keeps_leaf_identity_and_value() {
    let (mirror, space) = bootstrapped();
    mirror.write(111, Variant::Double(5.0)).unwrap();
    let before = mirror.lookup_leaf(111).unwrap().unwrap();
    space.take();

    let mut entities = demo_entities();
    entities[3] = entities[3].clone().renamed("Pressure");
    let report = mirror.reconcile(&entities).unwrap();
    assert_eq!(report.renamed, 1);
    assert_eq!(report.edits(), 1);

    let after = mirror.lookup_leaf(111).unwrap().unwrap();
    assert_eq!(after.name, "Pressure");
    assert_eq!(after.value, before.value);
    assert_eq!(after.timestamp, before.timestamp);
    assert_eq!(space.take(), vec![SpaceEvent::Changed(NodeKey::Leaf(111))]);
}

#[test]
fn container_rename_notifies_container_only() {
    let (mirror, space) = bootstrapped();
    space.take();
    let mut entities = demo_entities();
    entities[1] = entities[1].clone().renamed("Line A");
    mirror.reconcile(&entities).unwrap();
    assert_eq!(
        space.take(),
        vec![SpaceEvent::Changed(NodeKey::Container("11".into()))]
    );
    assert_eq!(mirror.lookup_container("11").unwrap().unwrap().name, "Line A");
}

#[test]
fn new_entities_are_added_parent_first() {
    let (mirror, space) = bootstrapped();
    space.take();
    let mut entities = demo_entities();
    entities.push(Entity::point(131, "131", "13", "Point 1"));
    entities.push(Entity::group(13, "13", "1", "Channel 3"));
    entities.push(Entity::point(115, "115", "11", "Point 5"));

    let report = mirror.reconcile(&entities).unwrap();
    assert_eq!(report.containers_created, 1);
    assert_eq!(report.leaves_created, 2);

    let events = space.take();
    assert_parents_first(&events);
    assert!(events.contains(&SpaceEvent::RegisterLeaf {
        id: 115,
        parent: "11".into()
    }));
    assert!(events.contains(&SpaceEvent::RegisterContainer {
        path: "13".into(),
        parent: "1".into()
    }));
}

#[test]
fn removed_leaf_is_unregistered_and_parent_notified() {
    let (mirror, space) = bootstrapped();
    space.take();
    let report = mirror.reconcile(&without(&[114])).unwrap();
    assert_eq!(report.leaves_removed, 1);
    assert_eq!(
        space.take(),
        vec![
            SpaceEvent::Unregister(NodeKey::Leaf(114)),
            SpaceEvent::Changed(NodeKey::Container("11".into())),
        ]
    );
    assert!(mirror.lookup_leaf(114).unwrap().is_none());
    assert!(!mirror
        .lookup_container("11")
        .unwrap()
        .unwrap()
        .children
        .contains(&NodeKey::Leaf(114)));
}

#[test]
fn removed_container_takes_its_leaves_first() {
    let (mirror, space) = bootstrapped();
    space.take();
    // The points below "12" stay declared but lose their parent.
    let report = mirror.reconcile(&without(&[12])).unwrap();
    assert_eq!(report.containers_removed, 1);
    assert_eq!(report.leaves_removed, 2);
    assert_eq!(report.skipped.len(), 2);

    let events = space.take();
    let container_at = events
        .iter()
        .position(|e| *e == SpaceEvent::Unregister(NodeKey::Container("12".into())))
        .expect("container unregistered");
    for id in [121, 122] {
        let leaf_at = events
            .iter()
            .position(|e| *e == SpaceEvent::Unregister(NodeKey::Leaf(id)))
            .expect("leaf unregistered");
        assert!(leaf_at < container_at);
    }
    mirror
        .inspect(|index| {
            assert!(index.leaves().all(|leaf| leaf.parent_path != "12"));
            assert_eq!(index.leaf_count(), 4);
        })
        .unwrap();
}

#[test]
fn removed_root_is_detached_before_unregistering() {
    let (mirror, space) = bootstrapped();
    space.take();
    let report = mirror.reconcile(&[]).unwrap();
    assert_eq!(report.leaves_removed, 6);
    assert_eq!(report.containers_removed, 3);

    let events = space.take();
    let detach = events
        .iter()
        .position(|e| *e == SpaceEvent::DetachRoot { path: "1".into() })
        .expect("root detached");
    let unregister = events
        .iter()
        .position(|e| *e == SpaceEvent::Unregister(NodeKey::Container("1".into())))
        .expect("root unregistered");
    assert!(detach < unregister);
    assert_eq!(unregister, events.len() - 1);
    assert!(mirror.inspect(|index| index.is_empty()).unwrap());
}

#[test]
fn leaf_move_keeps_value() {
    let (mirror, space) = bootstrapped();
    mirror.write(111, Variant::Double(12.5)).unwrap();
    space.take();

    let mut entities = demo_entities();
    entities[3].parent_path = "12".into();
    let report = mirror.reconcile(&entities).unwrap();
    assert_eq!(report.moved, 1);

    let leaf = mirror.lookup_leaf(111).unwrap().unwrap();
    assert_eq!(leaf.parent_path, "12");
    assert_eq!(leaf.value, Variant::Double(12.5));
    let old = mirror.lookup_container("11").unwrap().unwrap();
    let new = mirror.lookup_container("12").unwrap().unwrap();
    assert!(!old.children.contains(&NodeKey::Leaf(111)));
    assert!(new.children.contains(&NodeKey::Leaf(111)));
    assert_eq!(
        space.take(),
        vec![
            SpaceEvent::Changed(NodeKey::Leaf(111)),
            SpaceEvent::Changed(NodeKey::Container("11".into())),
            SpaceEvent::Changed(NodeKey::Container("12".into())),
        ]
    );
}

#[test]
fn container_move_carries_subtree() {
    let (mirror, _space) = bootstrapped();
    let mut entities = demo_entities();
    entities[2].parent_path = "11".into();
    let report = mirror.reconcile(&entities).unwrap();
    assert_eq!(report.moved, 1);
    let device = mirror.lookup_container("12").unwrap().unwrap();
    assert_eq!(device.parent.as_deref(), Some("11"));
    assert_eq!(device.children.len(), 2);
    assert!(mirror
        .inspect(|index| index.is_ancestor("11", "12"))
        .unwrap());
}

#[test]
fn retype_resets_value() {
    let (mirror, _space) = bootstrapped();
    mirror.write(112, Variant::Double(3.0)).unwrap();
    let mut entities = demo_entities();
    entities[4] = entities[4]
        .clone()
        .with_type(DataType::Int32, ValueRank::OneDimension);
    let report = mirror.reconcile(&entities).unwrap();
    assert_eq!(report.retyped, 1);
    let leaf = mirror.lookup_leaf(112).unwrap().unwrap();
    assert_eq!(leaf.data_type, DataType::Int32);
    assert_eq!(leaf.value, Variant::Array(Vec::new()));
}

#[test]
fn invalid_entities_are_skipped_without_blocking_valid_ones() {
    init_logging();
    let space = RecordingSpace::new();
    let mirror = NodeMirror::new(space.clone());
    let mut entities = demo_entities();
    entities.push(Entity::point(900, "900", "nowhere", "Orphan"));
    entities.push(Entity::group(901, "901", "902", "Loop A"));
    entities.push(Entity::group(902, "902", "901", "Loop B"));
    entities.push(Entity::point(903, "903", "111", "Under a leaf"));

    let report = mirror.bootstrap(&entities).unwrap();
    assert_eq!((report.roots, report.containers, report.leaves), (1, 2, 6));
    assert_eq!(report.skipped.len(), 4);
    assert!(report
        .skipped
        .iter()
        .all(|e| matches!(e, MirrorError::Structural { .. })));
    assert!(mirror.lookup_container("901").unwrap().is_none());
    assert!(mirror.lookup_leaf(900).unwrap().is_none());

    // The same snapshot reconciles to nothing new.
    let again = mirror.reconcile(&entities).unwrap();
    assert!(again.is_noop());
    assert_eq!(again.skipped.len(), 4);
}

fn chain() -> Vec<Entity> {
    vec![
        Entity::root(1, "r", "Plant"),
        Entity::group(2, "a", "r", "Area"),
        Entity::group(3, "b", "a", "Bay"),
        Entity::point(4, "p", "b", "Pressure"),
    ]
}

#[test]
fn swapping_parent_and_child_containers_converges() {
    init_logging();
    let space = RecordingSpace::new();
    let mirror = NodeMirror::new(space.clone());
    mirror.bootstrap(&chain()).unwrap();
    mirror.write(4, Variant::Double(8.0)).unwrap();

    // "b" is listed after the container that moves below it.
    let swapped = vec![
        Entity::root(1, "r", "Plant"),
        Entity::group(2, "a", "b", "Area"),
        Entity::group(3, "b", "r", "Bay"),
        Entity::point(4, "p", "b", "Pressure"),
    ];
    let report = mirror.reconcile(&swapped).unwrap();
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    assert_eq!(report.moved, 2);

    let a = mirror.lookup_container("a").unwrap().unwrap();
    let b = mirror.lookup_container("b").unwrap().unwrap();
    assert_eq!(a.parent.as_deref(), Some("b"));
    assert_eq!(b.parent.as_deref(), Some("r"));
    assert!(b.children.contains(&NodeKey::Container("a".into())));
    assert!(b.children.contains(&NodeKey::Leaf(4)));
    assert!(a.children.is_empty());
    assert_eq!(
        mirror.lookup_leaf(4).unwrap().unwrap().value,
        Variant::Double(8.0)
    );

    space.take();
    assert!(mirror.reconcile(&swapped).unwrap().is_noop());
    assert!(space.events().is_empty());
}

#[test]
fn missing_ancestors_are_created_on_demand() {
    let (mirror, space) = bootstrapped();
    space.take();
    // Listed deepest first: the leaf, its container, then that container's
    // parent, none of which are live yet.
    let mut entities = demo_entities();
    entities.push(Entity::point(141, "141", "14", "Point 1"));
    entities.push(Entity::group(14, "14", "13", "Sub channel"));
    entities.push(Entity::group(13, "13", "1", "Channel 3"));

    let report = mirror.reconcile(&entities).unwrap();
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    assert_eq!(report.containers_created, 2);
    assert_eq!(report.leaves_created, 1);

    let events = space.take();
    assert_parents_first(&events);
    let registered: Vec<_> = events.iter().filter(|e| e.is_structural()).collect();
    assert_eq!(
        registered,
        vec![
            &SpaceEvent::RegisterContainer {
                path: "13".into(),
                parent: "1".into()
            },
            &SpaceEvent::RegisterContainer {
                path: "14".into(),
                parent: "13".into()
            },
            &SpaceEvent::RegisterLeaf {
                id: 141,
                parent: "14".into()
            },
        ]
    );

    let again = mirror.reconcile(&entities).unwrap();
    assert!(again.is_noop());
    assert!(space.events().is_empty());
}
