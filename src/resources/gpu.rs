//! Shared GPU device resource
//!
//! The host application owns the wgpu adapter and device creation (eframe does
//! this for the editor). Nodes never talk to the host directly: they lease a
//! [`RenderDevice`] from the registry, and the device is torn down when the last
//! node holding it goes away.

use std::sync::Arc;

use log::info;

use super::provider::ResourceProvider;
use super::registry::ResourceRegistry;
use super::ResourceHandle;
use crate::error::{BoxError, ResourceError};

/// Device and queue shared by every node that renders
#[derive(Debug, Clone)]
pub struct RenderDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

/// Hands out the host's device to nodes
pub struct RenderDeviceProvider {
    device: wgpu::Device,
    queue: wgpu::Queue,
    /// Destroy the device when the last node releases it. Only set this when the
    /// registry owns the device outright.
    destroy_on_release: bool,
}

impl RenderDeviceProvider {
    /// Share a device the host keeps using itself
    pub fn shared(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            destroy_on_release: false,
        }
    }

    /// Hand the device over to the registry entirely
    pub fn owned(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            destroy_on_release: true,
        }
    }

    /// Register this provider with a registry
    pub fn install(self, registry: &ResourceRegistry) {
        registry.register_provider::<RenderDevice, _>(self);
    }
}

impl ResourceProvider<RenderDevice> for RenderDeviceProvider {
    fn create(&self, key: Option<&str>) -> Result<RenderDevice, BoxError> {
        info!("Leasing render device for {}", key.unwrap_or("session"));
        Ok(RenderDevice {
            device: self.device.clone(),
            queue: self.queue.clone(),
        })
    }

    fn destroy(&self, resource: Arc<RenderDevice>) {
        if self.destroy_on_release {
            info!("Destroying render device after last release");
            resource.device.destroy();
        }
    }
}

/// Lease the render device, optionally for one window
pub fn device_handle(
    registry: &ResourceRegistry,
    window: Option<&str>,
) -> Result<ResourceHandle<RenderDevice>, ResourceError> {
    registry.acquire::<RenderDevice>(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    /// A device on whatever adapter the machine offers; `None` on headless CI
    fn test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())).ok()?;
        block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()
    }

    #[test]
    fn test_window_keys_route_to_separate_leases() {
        let Some((device, queue)) = test_device() else {
            eprintln!("No GPU adapter available, skipping");
            return;
        };
        let registry = ResourceRegistry::new();
        RenderDeviceProvider::shared(device, queue).install(&registry);

        let main = device_handle(&registry, Some("window-1")).unwrap();
        let main_again = device_handle(&registry, Some("window-1")).unwrap();
        let side = device_handle(&registry, Some("window-2")).unwrap();

        assert_eq!(registry.ref_count::<RenderDevice>(Some("window-1")), 2);
        assert_eq!(registry.ref_count::<RenderDevice>(Some("window-2")), 1);
        assert_eq!(registry.ref_count::<RenderDevice>(None), 0);
        assert!(main.resource().is_some() && side.resource().is_some());

        drop(main);
        drop(main_again);
        drop(side);
        assert!(registry.live_resources().is_empty());
    }

    #[test]
    fn test_shared_device_survives_last_release() {
        let Some((device, queue)) = test_device() else {
            eprintln!("No GPU adapter available, skipping");
            return;
        };
        let registry = ResourceRegistry::new();
        RenderDeviceProvider::shared(device.clone(), queue).install(&registry);

        let handle = device_handle(&registry, None).unwrap();
        drop(handle);
        assert!(!registry.is_alive::<RenderDevice>(None));

        // The host keeps using its device after the nodes let go
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("after-release"),
            size: 16,
            usage: wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        assert_eq!(buffer.size(), 16);
    }

    #[test]
    fn test_owned_device_is_leased_until_last_release() {
        let Some((device, queue)) = test_device() else {
            eprintln!("No GPU adapter available, skipping");
            return;
        };
        let registry = ResourceRegistry::new();
        RenderDeviceProvider::owned(device, queue).install(&registry);

        let first = device_handle(&registry, None).unwrap();
        let second = device_handle(&registry, None).unwrap();
        drop(first);
        assert!(registry.is_alive::<RenderDevice>(None));
        drop(second);
        assert!(!registry.is_alive::<RenderDevice>(None));
    }
}
