//! Integration tests for hieralloc.

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;

use common::TestAlloc;
use hieralloc::{
    CollectingSink, ErrorKind, HierConfig, HierError, Hierarchy, NodeId, Resize, StrictMode,
};

type Log = Rc<RefCell<Vec<String>>>;

fn tree_with(raw: TestAlloc) -> Hierarchy<TestAlloc> {
    Hierarchy::with_allocator(raw, HierConfig::minimal())
}

fn children<A: hieralloc::RawAlloc>(tree: &Hierarchy<A>, node: NodeId) -> Vec<NodeId> {
    tree.children(node).unwrap().collect()
}

fn record(log: &Log, name: &str) -> impl FnOnce(&mut [u8]) + 'static {
    let log = log.clone();
    let name = name.to_string();
    move |_payload: &mut [u8]| log.borrow_mut().push(name)
}

#[test]
fn test_children_listed_in_allocation_order() {
    let mut tree = tree_with(TestAlloc::new());

    let p = tree.allocate(None, 16).unwrap();
    let a = tree.allocate(Some(p), 16).unwrap();
    let b = tree.allocate(Some(p), 16).unwrap();

    assert_eq!(children(&tree, p), vec![a, b]);
}

#[test]
fn test_free_fires_children_before_parent() {
    let mut tree = tree_with(TestAlloc::new());
    let log: Log = Rc::default();

    let p = tree.allocate(None, 16).unwrap();
    let a = tree.allocate(Some(p), 16).unwrap();
    let b = tree.allocate(Some(p), 16).unwrap();

    tree.add_finalizer(a, record(&log, "f_A")).unwrap();
    tree.add_finalizer(b, record(&log, "f_B")).unwrap();
    tree.add_finalizer(p, record(&log, "f_P")).unwrap();

    tree.free(p).unwrap();

    assert_eq!(*log.borrow(), vec!["f_A", "f_B", "f_P"]);
    assert_eq!(tree.allocator().live_blocks.get(), 0);
}

#[test]
fn test_adopt_moves_between_parents() {
    let mut tree = tree_with(TestAlloc::new());

    let p = tree.allocate(None, 8).unwrap();
    let a = tree.allocate(Some(p), 8).unwrap();
    let b = tree.allocate(Some(p), 8).unwrap();
    let c = tree.allocate(None, 8).unwrap();

    tree.adopt(c, a).unwrap();

    assert_eq!(children(&tree, p), vec![b]);
    assert_eq!(children(&tree, c), vec![a]);

    // Freeing the old parent no longer touches the adopted node
    tree.free(p).unwrap();
    assert!(tree.is_live(a));
    assert_eq!(tree.parent(a).unwrap(), Some(c));
}

#[test]
fn test_relocating_resize_repoints_children() {
    let mut tree = tree_with(TestAlloc::moving());

    let p = tree.allocate(None, 8).unwrap();
    let before = tree.allocate(Some(p), 8).unwrap();
    let a = tree.allocate_bytes(Some(p), b"payload").unwrap();
    let after = tree.allocate(Some(p), 8).unwrap();
    let d = tree.allocate(Some(a), 8).unwrap();

    let resized = tree.resize(a, 4096).unwrap();
    let new_a = match resized {
        Resize::Relocated(id) => id,
        Resize::InPlace(_) => panic!("TestAlloc::moving() must relocate"),
    };

    assert_ne!(new_a, a);
    assert!(!tree.is_live(a));
    assert_eq!(tree.parent(d).unwrap(), Some(new_a));
    assert_eq!(children(&tree, p), vec![before, new_a, after]);
    assert_eq!(children(&tree, new_a), vec![d]);
    assert_eq!(&tree.payload(new_a).unwrap()[..7], b"payload");

    // The stale handle is rejected, the new one works
    assert_eq!(
        tree.resize(a, 8).unwrap_err(),
        HierError::InvalidHandle(a)
    );
    assert_eq!(tree.stats().relocation_count, 1);
}

#[test]
fn test_relocation_keeps_finalizers_and_order() {
    let mut tree = tree_with(TestAlloc::moving());
    let log: Log = Rc::default();

    let p = tree.allocate(None, 0).unwrap();
    let a = tree.allocate(Some(p), 4).unwrap();
    let b = tree.allocate(Some(p), 4).unwrap();
    tree.add_finalizer(a, record(&log, "a")).unwrap();
    tree.add_finalizer(b, record(&log, "b")).unwrap();

    let a = tree.resize(a, 64).unwrap().handle();
    let p = tree.resize(p, 64).unwrap().handle();
    assert_eq!(children(&tree, p), vec![a, b]);
    assert_eq!(tree.parent(a).unwrap(), Some(p));

    tree.free(p).unwrap();
    assert_eq!(*log.borrow(), vec!["a", "b"]);
}

#[test]
fn test_in_place_resize_keeps_handle() {
    let mut tree = tree_with(TestAlloc::in_place());

    let p = tree.allocate_bytes(None, b"abcdefgh").unwrap();
    let c = tree.allocate(Some(p), 8).unwrap();

    assert_eq!(tree.resize(p, 8).unwrap(), Resize::InPlace(p));
    assert_eq!(tree.resize(p, 4).unwrap(), Resize::InPlace(p));
    assert_eq!(tree.resize(p, 64).unwrap(), Resize::InPlace(p));

    assert!(tree.is_live(p));
    assert_eq!(&tree.payload(p).unwrap()[..4], b"abcd");
    assert!(tree.payload(p).unwrap()[4..].iter().all(|&b| b == 0));
    assert_eq!(tree.parent(c).unwrap(), Some(p));
    assert_eq!(tree.stats().relocation_count, 0);

    // Past the block's capacity the allocator refuses instead of moving
    assert!(tree.resize(p, common::IN_PLACE_CAPACITY + 1).is_err());
    assert_eq!(tree.size(p).unwrap(), 64);
}

#[test]
fn test_exhausted_allocator_leaves_tree_unchanged() {
    let sink = Arc::new(CollectingSink::new());
    let mut tree = tree_with(TestAlloc::new());
    tree.set_diagnostic_sink(sink.clone());

    let p = tree.allocate(None, 8).unwrap();
    let a = tree.allocate(Some(p), 8).unwrap();

    tree.allocator().exhausted.set(true);

    let err = tree.allocate(Some(p), 32).unwrap_err();
    assert_eq!(err, HierError::AllocationFailed { requested: 32 });
    assert_eq!(err.kind(), ErrorKind::AllocationFailure);
    assert_eq!(children(&tree, p), vec![a]);
    assert_eq!(tree.len(), 2);
    assert_eq!(sink.codes(), vec!["HA101"]);
}

#[test]
fn test_failed_resize_keeps_original() {
    let mut tree = tree_with(TestAlloc::moving());

    let p = tree.allocate(None, 0).unwrap();
    let a = tree.allocate_str(Some(p), "keep me").unwrap();
    let d = tree.allocate(Some(a), 0).unwrap();

    tree.allocator().exhausted.set(true);
    assert!(tree.resize(a, 1 << 20).is_err());

    assert!(tree.is_live(a));
    assert_eq!(tree.payload(a).unwrap(), b"keep me");
    assert_eq!(tree.parent(d).unwrap(), Some(a));
    assert_eq!(children(&tree, p), vec![a]);
    assert_eq!(tree.stats().failed_allocations, 1);
}

#[test]
fn test_leaf_with_two_finalizers() {
    let mut tree = tree_with(TestAlloc::new());
    let log: Log = Rc::default();

    let leaf = tree.allocate(None, 8).unwrap();
    tree.add_finalizer(leaf, record(&log, "one")).unwrap();
    tree.add_finalizer(leaf, record(&log, "two")).unwrap();

    tree.free(leaf).unwrap();
    assert_eq!(*log.borrow(), vec!["one", "two"]);

    drop(tree);
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn test_finalizers_run_before_any_release() {
    let raw = TestAlloc::new();
    let live_blocks = raw.live_blocks.clone();
    let mut tree = tree_with(raw);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let p = tree.allocate(None, 1).unwrap();
    let a = tree.allocate(Some(p), 1).unwrap();
    let a1 = tree.allocate(Some(a), 1).unwrap();

    for node in [p, a, a1] {
        let live_blocks = live_blocks.clone();
        let seen = seen.clone();
        tree.add_finalizer(node, move |_: &mut [u8]| {
            seen.borrow_mut().push(live_blocks.get());
        })
        .unwrap();
    }

    tree.free(p).unwrap();

    // Every finalizer saw all three blocks still allocated
    assert_eq!(*seen.borrow(), vec![3, 3, 3]);
    assert_eq!(live_blocks.get(), 0);
    assert_eq!(tree.allocator().released.borrow().len(), 3);
}

#[test]
fn test_debug_mode_poisons_released_payloads() {
    let mut tree = Hierarchy::with_allocator(TestAlloc::new(), HierConfig::minimal().with_debug(true));

    let node = tree.allocate_str(None, "secret").unwrap();
    tree.free(node).unwrap();

    let released = tree.allocator().released.borrow();
    assert_eq!(released.len(), 1);
    assert!(released[0].iter().all(|&b| b == hieralloc::debug::FREED_PATTERN));
}

#[test]
fn test_release_order_is_children_first() {
    let mut tree = tree_with(TestAlloc::new());

    let p = tree.allocate_str(None, "p").unwrap();
    let a = tree.allocate_str(Some(p), "a").unwrap();
    tree.allocate_str(Some(a), "a1").unwrap();
    tree.allocate_str(Some(p), "b").unwrap();

    tree.free(p).unwrap();

    let released: Vec<Vec<u8>> = tree.allocator().released.borrow().clone();
    assert_eq!(
        released,
        vec![b"a1".to_vec(), b"a".to_vec(), b"b".to_vec(), b"p".to_vec()]
    );
}

#[test]
fn test_drop_releases_everything() {
    let log: Log = Rc::default();
    let raw_live;
    {
        let mut tree = tree_with(TestAlloc::new());
        let r1 = tree.allocate(None, 8).unwrap();
        let r2 = tree.allocate(None, 8).unwrap();
        tree.allocate(Some(r1), 8).unwrap();
        tree.add_finalizer(r2, record(&log, "r2")).unwrap();
        tree.add_finalizer(r1, record(&log, "r1")).unwrap();

        tree.clear();
        raw_live = tree.allocator().live_blocks.get();
    }
    assert_eq!(raw_live, 0);
    assert_eq!(*log.borrow(), vec!["r1", "r2"]);
}

#[test]
fn test_deferred_frees_from_worker_threads() {
    let mut tree = tree_with(TestAlloc::new());
    let log: Log = Rc::default();

    let nodes: Vec<NodeId> = (0..8).map(|_| tree.allocate(None, 8).unwrap()).collect();
    for &node in &nodes {
        tree.add_finalizer(node, record(&log, "freed")).unwrap();
    }

    let queue = tree.deferred_queue();
    let workers: Vec<_> = nodes
        .chunks(2)
        .map(|chunk| {
            let queue = queue.clone();
            let chunk = chunk.to_vec();
            thread::spawn(move || {
                for node in chunk {
                    queue.push(node);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("Thread panicked");
    }

    assert_eq!(tree.process_deferred_frees(), 8);
    assert!(tree.is_empty());
    assert_eq!(log.borrow().len(), 8);
}

#[test]
fn test_deferred_free_after_relocation() {
    let mut tree = tree_with(TestAlloc::moving());
    let log: Log = Rc::default();

    let root = tree.allocate(None, 8).unwrap();
    let child = tree.allocate(Some(root), 8).unwrap();
    tree.add_finalizer(child, record(&log, "child")).unwrap();
    tree.add_finalizer(root, record(&log, "root")).unwrap();

    let queue = tree.deferred_queue();
    thread::spawn(move || queue.push(root))
        .join()
        .expect("Thread panicked");

    let moved = tree.resize(root, 64).unwrap();
    assert!(moved.relocated());

    assert_eq!(tree.process_deferred_frees(), 1);
    assert!(!tree.is_live(moved.handle()));
    assert!(tree.is_empty());
    assert_eq!(*log.borrow(), vec!["child", "root"]);
}

#[test]
fn test_strict_warnings_unwind_on_allocation_failure() {
    let result = std::panic::catch_unwind(|| {
        let mut tree = Hierarchy::with_config(
            HierConfig::constrained(4).with_strict_mode(StrictMode::PanicOnWarning),
        );
        let _ = tree.allocate(None, 8);
    });
    assert!(result.is_err());

    // Without strict warnings the same failure is an ordinary error
    let mut tree = Hierarchy::with_config(
        HierConfig::constrained(4)
            .with_strict_mode(StrictMode::PanicOnError)
            .with_diagnostics(false),
    );
    let err = tree.allocate(None, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AllocationFailure);
}

#[cfg(feature = "debug")]
#[test]
fn test_leak_report_names_relocated_handle() {
    let mut tree = tree_with(TestAlloc::moving());

    let node = tree.allocate(None, 8).unwrap();
    let moved = tree.resize(node, 128).unwrap().handle();

    let traces = tree.live_traces();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].node, moved);
    assert_eq!(traces[0].size, 128);
    assert!(tree.leak_report().contains(&moved.to_string()));
    assert!(!tree.leak_report().contains(&node.to_string()));
}

#[test]
fn test_strict_mode_panics_on_stale_handle() {
    let result = std::panic::catch_unwind(|| {
        let mut tree = Hierarchy::with_config(
            HierConfig::minimal().with_strict_mode(StrictMode::PanicOnError),
        );
        let node = tree.allocate(None, 8).unwrap();
        tree.free(node).unwrap();
        let _ = tree.free(node);
    });
    assert!(result.is_err());
}

#[test]
fn test_memory_limit_from_config() {
    let mut tree = Hierarchy::with_allocator(TestAlloc::new(), HierConfig::constrained(1024).with_diagnostics(false));

    let root = tree.allocate(None, 1000).unwrap();
    let err = tree.allocate(Some(root), 100).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AllocationFailure);
    assert_eq!(tree.child_count(root).unwrap(), 0);
    assert_eq!(tree.stats().live_bytes, 1000);
}

#[test]
fn test_stats_track_lifecycle() {
    let mut tree = tree_with(TestAlloc::moving());

    let p = tree.allocate(None, 100).unwrap();
    let a = tree.allocate(Some(p), 50).unwrap();
    tree.resize(a, 150).unwrap();
    tree.free(p).unwrap();

    let stats = tree.stats();
    assert_eq!(stats.allocation_count, 2);
    assert_eq!(stats.free_count, 2);
    assert_eq!(stats.live_nodes, 0);
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(stats.peak_bytes, 250);
    assert_eq!(stats.resize_count, 1);
    assert_eq!(stats.relocation_count, 1);
}

#[test]
fn test_ancestors_walk_to_root() {
    let mut tree = tree_with(TestAlloc::new());

    let root = tree.allocate(None, 0).unwrap();
    let mid = tree.allocate(Some(root), 0).unwrap();
    let leaf = tree.allocate(Some(mid), 0).unwrap();

    assert_eq!(tree.ancestors(leaf).unwrap().collect::<Vec<_>>(), vec![mid, root]);
    assert_eq!(tree.ancestors(root).unwrap().count(), 0);
}
