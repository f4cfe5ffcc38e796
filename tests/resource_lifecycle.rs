//! Shared resources leased by nodes across graph rebuilds

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nodle_session::error::BoxError;
use nodle_session::{NodePath, NodeScope, ResourceError, ResourceProvider, ResourceRegistry};

struct GraphicsDevice {
    name: String,
}

#[derive(Default, Clone)]
struct DeviceProvider {
    created: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
}

impl ResourceProvider<GraphicsDevice> for DeviceProvider {
    fn create(&self, key: Option<&str>) -> Result<GraphicsDevice, BoxError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(GraphicsDevice {
            name: key.unwrap_or("default").to_string(),
        })
    }

    fn destroy(&self, _resource: Arc<GraphicsDevice>) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn two_nodes_share_device_until_last_release() {
    let registry = ResourceRegistry::new();
    let provider = DeviceProvider::default();
    registry.register_provider::<GraphicsDevice, _>(provider.clone());

    assert_eq!(registry.ref_count::<GraphicsDevice>(None), 0);

    let mut node_a = registry.acquire::<GraphicsDevice>(None).unwrap();
    assert_eq!(registry.ref_count::<GraphicsDevice>(None), 1);
    let mut node_b = registry.acquire::<GraphicsDevice>(None).unwrap();
    assert_eq!(registry.ref_count::<GraphicsDevice>(None), 2);

    registry.release(&mut node_a).unwrap();
    assert_eq!(registry.ref_count::<GraphicsDevice>(None), 1);
    assert!(node_b.resource().is_some());
    assert_eq!(provider.destroyed.load(Ordering::SeqCst), 0);

    registry.release(&mut node_b).unwrap();
    assert_eq!(registry.ref_count::<GraphicsDevice>(None), 0);
    assert_eq!(provider.created.load(Ordering::SeqCst), 1);
    assert_eq!(provider.destroyed.load(Ordering::SeqCst), 1);

    // A second release reports misuse and does not tear down again
    let err = registry.release(&mut node_b).unwrap_err();
    assert!(matches!(err, ResourceError::DoubleRelease { .. }));
    assert_eq!(provider.destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn graph_rebuild_keeps_device_alive_across_scopes() {
    let registry = ResourceRegistry::new();
    let provider = DeviceProvider::default();
    registry.register_provider::<GraphicsDevice, _>(provider.clone());

    let mut old_node = NodeScope::new(NodePath::new(vec![1, 4]), registry.clone());
    old_node.acquire::<GraphicsDevice>(Some("main-window")).unwrap();

    // The rebuilt node acquires before the old one is torn down
    let mut new_node = NodeScope::new(NodePath::new(vec![1, 4]), registry.clone());
    let device = new_node.acquire::<GraphicsDevice>(Some("main-window")).unwrap();
    assert_eq!(device.name, "main-window");
    drop(old_node);

    assert!(registry.is_alive::<GraphicsDevice>(Some("main-window")));
    assert_eq!(provider.created.load(Ordering::SeqCst), 1);

    new_node.stop();
    assert_eq!(provider.destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_construction_propagates_to_node() {
    let registry = ResourceRegistry::new();
    registry.register_provider::<GraphicsDevice, _>(DeviceProvider::default());
    registry.register_fn::<String, _>(|_| Err("context lost".into()));

    let mut node = NodeScope::new(NodePath::root(9), registry.clone());
    let result = node.acquire_all(|node| {
        node.acquire::<GraphicsDevice>(None)?;
        node.acquire::<String>(None)?;
        Ok(())
    });

    match result {
        Err(ResourceError::Acquisition { source, .. }) => assert_eq!(source.to_string(), "context lost"),
        other => panic!("expected acquisition failure, got {:?}", other),
    }
    assert_eq!(node.held(), 0);
    assert!(registry.live_resources().is_empty());
}
