use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// A single-threaded shared handle to a system such as the GPU device, the queue
/// or the buffer registry.
///
/// Cloning the handle shares the same system. Borrowing follows `RefCell` rules.
///
/// # Examples
///
/// ```ignore
/// let system = StSystem::new(Box::new(42u32));
/// let other = system.clone();
///
/// *other.get_mut() = Box::new(100u32);
/// assert_eq!(**system.get(), 100);
/// ```
///
/// # Panics
/// - Panics if a borrow is held while trying to mutably borrow
/// - Panics if a mutable borrow is held while trying to borrow
pub struct StSystem<T: ?Sized> {
    system: Rc<RefCell<Box<T>>>,
}

impl<T: ?Sized> StSystem<T> {
    pub fn new(system: Box<T>) -> Self {
        Self {
            system: Rc::new(RefCell::new(system)),
        }
    }

    /// Returns an immutable reference to the contained system.
    pub fn get(&self) -> Ref<'_, Box<T>> {
        self.system.borrow()
    }

    /// Returns a mutable reference to the contained system.
    pub fn get_mut(&self) -> RefMut<'_, Box<T>> {
        self.system.borrow_mut()
    }
}

impl<T: ?Sized> Clone for StSystem<T> {
    fn clone(&self) -> Self {
        Self {
            system: self.system.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_system() {
        let system = StSystem::new(Box::new(vec![1u32]));
        let other = system.clone();
        other.get_mut().push(2);
        assert_eq!(**system.get(), vec![1, 2]);
        assert_eq!(Rc::strong_count(&system.system), 2);
    }

    #[test]
    fn unsized_systems() {
        let system: StSystem<dyn Fn(u32) -> u32> = StSystem::new(Box::new(|x: u32| x * 2));
        assert_eq!((**system.get())(21), 42);
    }
}
