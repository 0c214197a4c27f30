/// Swapchain-dependent resource registry and the recreation protocol

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use crate::error::Result;
use crate::{engine_debug, engine_err, engine_info};

/// An object whose native state depends on the current swapchain
///
/// Pipelines depend on the render pass, recorders on the framebuffers and the
/// image count. `release` drops only that swapchain-dependent state; the
/// object's declarations and descriptor-backed resources survive it.
pub trait SwapchainResource<H: ?Sized> {
    /// Destroy swapchain-dependent native objects
    fn release(&mut self, host: &H);

    /// Recreate swapchain-dependent native objects against the current swapchain
    fn rebuild(&mut self, host: &H) -> Result<()>;
}

/// Owner of the swapchain bundle
pub trait SwapchainHost {
    /// Block until the device is idle
    fn wait_idle(&self) -> Result<()>;

    /// Destroy framebuffers, depth target, render pass, image views, then the swapchain
    fn teardown_swapchain(&mut self);

    /// Build a new swapchain bundle for a `width` x `height` drawable
    fn build_swapchain(&mut self, width: u32, height: u32) -> Result<()>;
}

type Entry<H> = Weak<Mutex<dyn SwapchainResource<H>>>;

/// Registered pipelines and recorders, in insertion order
///
/// Entries are weak: dropping the last handle to a resource unregisters it
/// implicitly, and dead entries are skipped and pruned. Registering the same
/// object twice is a no-op.
pub struct ResourceRegistry<H: ?Sized> {
    pipelines: Vec<Entry<H>>,
    recorders: Vec<Entry<H>>,
}

impl<H: ?Sized> Default for ResourceRegistry<H> {
    fn default() -> Self {
        Self {
            pipelines: Vec::new(),
            recorders: Vec::new(),
        }
    }
}

impl<H: ?Sized> ResourceRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline; returns false if it was already registered
    pub fn register_pipeline<R>(&mut self, pipeline: &Arc<Mutex<R>>) -> bool
    where
        R: SwapchainResource<H> + 'static,
    {
        Self::insert(&mut self.pipelines, pipeline)
    }

    /// Register a command recorder; returns false if it was already registered
    pub fn register_recorder<R>(&mut self, recorder: &Arc<Mutex<R>>) -> bool
    where
        R: SwapchainResource<H> + 'static,
    {
        Self::insert(&mut self.recorders, recorder)
    }

    /// Remove a pipeline or recorder; unknown objects are ignored
    pub fn unregister<R>(&mut self, resource: &Arc<Mutex<R>>) -> bool
    where
        R: SwapchainResource<H> + 'static,
    {
        let target = Arc::as_ptr(resource) as *const ();
        let before = self.pipelines.len() + self.recorders.len();
        self.pipelines.retain(|e| e.as_ptr() as *const () != target);
        self.recorders.retain(|e| e.as_ptr() as *const () != target);
        before != self.pipelines.len() + self.recorders.len()
    }

    /// Number of live registered pipelines
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.iter().filter(|e| e.strong_count() > 0).count()
    }

    /// Number of live registered recorders
    pub fn recorder_count(&self) -> usize {
        self.recorders.iter().filter(|e| e.strong_count() > 0).count()
    }

    /// Drop entries whose resource no longer exists
    pub fn prune(&mut self) {
        self.pipelines.retain(|e| e.strong_count() > 0);
        self.recorders.retain(|e| e.strong_count() > 0);
    }

    fn insert<R>(entries: &mut Vec<Entry<H>>, resource: &Arc<Mutex<R>>) -> bool
    where
        R: SwapchainResource<H> + 'static,
    {
        entries.retain(|e| e.strong_count() > 0);

        let target = Arc::as_ptr(resource) as *const ();
        if entries.iter().any(|e| e.as_ptr() as *const () == target) {
            return false;
        }

        let shared: Arc<Mutex<dyn SwapchainResource<H>>> = resource.clone();
        entries.push(Arc::downgrade(&shared));
        true
    }

    fn live(entries: &[Entry<H>]) -> Vec<Arc<Mutex<dyn SwapchainResource<H>>>> {
        entries.iter().filter_map(Weak::upgrade).collect()
    }

    fn lock(
        resource: &Arc<Mutex<dyn SwapchainResource<H>>>,
    ) -> Result<MutexGuard<'_, dyn SwapchainResource<H> + 'static>> {
        resource
            .lock()
            .map_err(|_| engine_err!("discovery::registry", "Registered resource lock poisoned"))
    }
}

impl<H: SwapchainHost + ?Sized> ResourceRegistry<H> {
    /// Tear down and rebuild everything downstream of the swapchain
    ///
    /// Order:
    /// 1. wait for device idle
    /// 2. recorders release their command buffers
    /// 3. pipelines release their native pipeline, layout and set layouts
    /// 4. tear down the swapchain bundle
    /// 5. build it again at `width` x `height`
    /// 6. pipelines rebuild against the new render pass
    /// 7. recorders rebuild (reallocate and re-record)
    ///
    /// Each group is walked in registration order.
    pub fn recreate(&self, host: &mut H, width: u32, height: u32) -> Result<()> {
        let pipelines = Self::live(&self.pipelines);
        let recorders = Self::live(&self.recorders);

        engine_debug!(
            "discovery::registry",
            "Recreating swapchain at {}x{} ({} pipelines, {} recorders)",
            width,
            height,
            pipelines.len(),
            recorders.len()
        );

        host.wait_idle()?;

        for recorder in &recorders {
            Self::lock(recorder)?.release(host);
        }
        for pipeline in &pipelines {
            Self::lock(pipeline)?.release(host);
        }

        host.teardown_swapchain();
        host.build_swapchain(width, height)?;

        for pipeline in &pipelines {
            Self::lock(pipeline)?.rebuild(host)?;
        }
        for recorder in &recorders {
            Self::lock(recorder)?.rebuild(host)?;
        }

        engine_info!("discovery::registry", "Swapchain recreated at {}x{}", width, height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
