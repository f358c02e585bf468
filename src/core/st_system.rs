use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// A single-threaded, shared handle to a boxed system.
///
/// The engine is frame-driven and never touches its systems from more than
/// one thread, so `Rc<RefCell<Box<T>>>` is all the sharing machinery it
/// needs. Clones are cheap and refer to the same underlying system.
///
/// # Examples
/// ```rust
/// use voxel_desktop::core::StSystem;
///
/// let system = StSystem::new(Box::new(42u32));
/// assert_eq!(**system.get(), 42);
///
/// *system.get_mut() = Box::new(100u32);
/// assert_eq!(**system.get(), 100);
/// ```
///
/// # Panics
/// Borrow rules are enforced at runtime: holding a `get()` reference while
/// calling `get_mut()` (or vice versa) panics.
pub struct StSystem<T: ?Sized> {
    pub system: Rc<RefCell<Box<T>>>,
}

impl<T: 'static + ?Sized> StSystem<T> {
    /// Returns an immutable reference to the contained system.
    ///
    /// # Panics
    /// Panics if the value is currently mutably borrowed.
    pub fn get(&self) -> Ref<'_, Box<T>> {
        self.system.borrow()
    }

    /// Returns a mutable reference to the contained system.
    ///
    /// # Panics
    /// Panics if the value is currently borrowed.
    pub fn get_mut(&self) -> RefMut<'_, Box<T>> {
        self.system.borrow_mut()
    }
}

impl<T: ?Sized> StSystem<T> {
    /// Creates a new `StSystem` containing the given boxed system.
    pub fn new(system: Box<T>) -> Self {
        Self {
            system: Rc::new(RefCell::new(system)),
        }
    }
}

impl<T> Clone for StSystem<T> {
    fn clone(&self) -> Self {
        Self {
            system: self.system.clone(),
        }
    }
}
