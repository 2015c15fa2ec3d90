//! Release tracking for builders, segments and indexes.
//!
//! Every resource-owning handle wraps its resource in a [`Tracked`], which
//! registers it with the process-wide [`ResourceTracker`] of its
//! [`ResourceKind`]. A tracked resource leaves the `Live` state exactly once:
//!
//! - [`Tracked::release`] frees it explicitly,
//! - [`Tracked::transfer`] hands it to another owner (a builder finalizing
//!   into a segment) and unregisters it without firing the release callback,
//! - dropping a still-live handle releases it automatically.
//!
//! Explicit release is the deterministic path; `Drop` is the safety net.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegdexError};

/// Kinds of tracked resources; each has its own tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    SegmentBuilder,
    Segment,
    SearchIndex,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::SegmentBuilder => "segment builder",
            ResourceKind::Segment => "segment",
            ResourceKind::SearchIndex => "search index",
        };
        f.write_str(name)
    }
}

/// State of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Live,
    Released,
    Transferred,
}

/// Process-wide registry of the live resources of one kind.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    live: Mutex<HashMap<u64, usize>>,
    next_id: AtomicU64,
    released: AtomicU64,
    transferred: AtomicU64,
}

impl ResourceTracker {
    fn register(&self, bytes: usize) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.live.lock().insert(id, bytes);
        id
    }

    fn resize(&self, id: u64, bytes: usize) {
        if let Some(entry) = self.live.lock().get_mut(&id) {
            *entry = bytes;
        }
    }

    /// Removes `id`; returns false if it was not live.
    fn unregister(&self, id: u64) -> bool {
        self.live.lock().remove(&id).is_some()
    }

    /// Number of live resources.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Sum of the size hints of live resources.
    pub fn live_bytes(&self) -> usize {
        self.live.lock().values().sum()
    }

    /// Resources released so far, explicitly or by drop.
    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Resources handed to another owner so far.
    pub fn transferred_count(&self) -> u64 {
        self.transferred.load(Ordering::SeqCst)
    }

    pub fn is_live(&self, id: u64) -> bool {
        self.live.lock().contains_key(&id)
    }
}

static BUILDER_TRACKER: OnceLock<ResourceTracker> = OnceLock::new();
static SEGMENT_TRACKER: OnceLock<ResourceTracker> = OnceLock::new();
static INDEX_TRACKER: OnceLock<ResourceTracker> = OnceLock::new();

/// The tracker of a resource kind.
pub fn tracker(kind: ResourceKind) -> &'static ResourceTracker {
    let cell = match kind {
        ResourceKind::SegmentBuilder => &BUILDER_TRACKER,
        ResourceKind::Segment => &SEGMENT_TRACKER,
        ResourceKind::SearchIndex => &INDEX_TRACKER,
    };
    cell.get_or_init(ResourceTracker::default)
}

type ReleaseFn<T> = Box<dyn FnOnce(T) + Send + Sync>;

/// A resource registered with its kind's tracker.
pub struct Tracked<T> {
    id: u64,
    kind: ResourceKind,
    state: LifecycleState,
    resource: Option<T>,
    on_release: Option<ReleaseFn<T>>,
}

impl<T> Tracked<T> {
    /// Register `resource` as live, charging `size_hint` bytes.
    pub fn new(kind: ResourceKind, resource: T, size_hint: usize) -> Self {
        let id = tracker(kind).register(size_hint);
        log::trace!("registered {kind} #{id} ({size_hint} bytes)");
        Tracked {
            id,
            kind,
            state: LifecycleState::Live,
            resource: Some(resource),
            on_release: None,
        }
    }

    /// Attach a callback that receives the resource when it is released.
    /// It is not called on transfer.
    pub fn with_release<F>(mut self, on_release: F) -> Self
    where
        F: FnOnce(T) + Send + Sync + 'static,
    {
        self.on_release = Some(Box::new(on_release));
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == LifecycleState::Live
    }

    pub fn get(&self) -> Result<&T> {
        match &self.resource {
            Some(resource) if self.is_live() => Ok(resource),
            _ => Err(self.not_live()),
        }
    }

    pub fn get_mut(&mut self) -> Result<&mut T> {
        if !self.is_live() {
            return Err(self.not_live());
        }
        let err = self.not_live();
        self.resource.as_mut().ok_or(err)
    }

    /// Update the bytes charged to this resource.
    pub fn resize(&self, bytes: usize) {
        if self.is_live() {
            tracker(self.kind).resize(self.id, bytes);
        }
    }

    /// Release the resource now, running the release callback.
    pub fn release(&mut self) -> Result<()> {
        if !self.is_live() {
            return Err(self.not_live());
        }
        self.release_inner();
        Ok(())
    }

    /// Unregister the resource and hand it to the caller.
    pub fn transfer(&mut self) -> Result<T> {
        if !self.is_live() {
            return Err(self.not_live());
        }
        let resource = self.resource.take().ok_or_else(|| self.not_live())?;
        let tracker = tracker(self.kind);
        tracker.unregister(self.id);
        tracker.transferred.fetch_add(1, Ordering::SeqCst);
        self.state = LifecycleState::Transferred;
        self.on_release = None;
        log::trace!("transferred {} #{}", self.kind, self.id);
        Ok(resource)
    }

    fn release_inner(&mut self) {
        let tracker = tracker(self.kind);
        if tracker.unregister(self.id) {
            tracker.released.fetch_add(1, Ordering::SeqCst);
        }
        self.state = LifecycleState::Released;
        if let Some(resource) = self.resource.take() {
            match self.on_release.take() {
                Some(on_release) => on_release(resource),
                None => drop(resource),
            }
        }
    }

    fn not_live(&self) -> SegdexError {
        let action = match self.state {
            LifecycleState::Released => "released",
            LifecycleState::Transferred => "consumed",
            LifecycleState::Live => "unavailable",
        };
        SegdexError::state(format!("{} #{} was already {action}", self.kind, self.id))
    }
}

impl<T> Drop for Tracked<T> {
    fn drop(&mut self) {
        if self.is_live() {
            log::trace!("{} #{} released on drop", self.kind, self.id);
            self.release_inner();
        }
    }
}

impl<T> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce(Vec<u8>) + Send + Sync + 'static) {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook = {
            let calls = Arc::clone(&calls);
            move |_: Vec<u8>| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        };
        (calls, hook)
    }

    #[test]
    fn test_explicit_release_fires_once() {
        let (calls, hook) = counter();
        let mut tracked = Tracked::new(ResourceKind::Segment, vec![1u8, 2, 3], 3).with_release(hook);
        let id = tracked.id();
        assert!(tracker(ResourceKind::Segment).is_live(id));

        tracked.release().unwrap();
        assert_eq!(tracked.state(), LifecycleState::Released);
        assert!(!tracker(ResourceKind::Segment).is_live(id));
        assert!(tracked.release().is_err());
        assert!(tracked.get().is_err());

        drop(tracked);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_live_resource() {
        let (calls, hook) = counter();
        let tracked = Tracked::new(ResourceKind::SearchIndex, Vec::new(), 0).with_release(hook);
        let id = tracked.id();
        drop(tracked);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!tracker(ResourceKind::SearchIndex).is_live(id));
    }

    #[test]
    fn test_transfer_skips_release_callback() {
        let (calls, hook) = counter();
        let mut tracked = Tracked::new(ResourceKind::SegmentBuilder, vec![7u8], 1).with_release(hook);
        let id = tracked.id();

        let resource = tracked.transfer().unwrap();
        assert_eq!(resource, vec![7]);
        assert_eq!(tracked.state(), LifecycleState::Transferred);
        assert!(!tracker(ResourceKind::SegmentBuilder).is_live(id));
        assert!(tracked.transfer().is_err());

        drop(tracked);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tracker_is_per_kind_singleton() {
        let segments = tracker(ResourceKind::Segment);
        assert!(std::ptr::eq(segments, tracker(ResourceKind::Segment)));
        assert!(!std::ptr::eq(segments, tracker(ResourceKind::SearchIndex)));
        assert!(!std::ptr::eq(segments, tracker(ResourceKind::SegmentBuilder)));

        let tracked = Tracked::new(ResourceKind::Segment, vec![1u8], 1);
        assert!(segments.is_live(tracked.id()));
    }

    #[test]
    fn test_resize_and_get_mut() {
        let mut tracked = Tracked::new(ResourceKind::SegmentBuilder, vec![0u8; 4], 4);
        tracked.get_mut().unwrap().push(1);
        tracked.resize(5);
        assert_eq!(tracked.get().unwrap().len(), 5);
    }
}
