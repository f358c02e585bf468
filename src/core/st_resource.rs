use std::{
    rc::Rc,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// A single-threaded, reference-counted resource with interior mutability.
///
/// Used for shared bookkeeping values (allocation analytics, counters) that
/// several systems read and update during a frame. The `Rc` keeps ownership
/// simple in the single-threaded engine; the `RwLock` provides the guard
/// types without requiring `&mut` access through every holder.
///
/// # Examples
/// ```
/// use voxel_desktop::core::StResource;
///
/// let counter = StResource::new(0);
/// *counter.get_mut() += 1;
/// assert_eq!(*counter.get(), 1);
/// ```
///
/// Clones share the same underlying value:
/// ```
/// use voxel_desktop::core::StResource;
///
/// let resource = StResource::new(vec![1, 2, 3]);
/// let clone = resource.clone();
/// clone.get_mut().push(4);
/// assert_eq!(resource.get().len(), 4);
/// ```
pub struct StResource<T> {
    pub resource: Rc<RwLock<T>>,
}

impl<T> StResource<T> {
    /// Creates a new `StResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read guard for the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap()
    }

    /// Returns a write guard for the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap()
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
