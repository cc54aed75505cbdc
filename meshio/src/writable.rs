use std::{
    any::Any,
    fmt::Debug,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;

/// A backend specific location of an object in storage.
///
/// The core never looks inside a position; it only stores it on a `Writable` and copies it between
/// writables. Backends downcast it back to their own type with `as_any`.
///
pub trait FilePosition: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Default)]
struct WritableState {
    written: bool,
    position: Option<Arc<dyn FilePosition>>,
    parent: Weak<Mutex<WritableState>>,
}

/// Handle to the persistence state of a domain object, the target of an `IOTask`.
///
/// Clones share state, so an executor holding a clone can mark the original object written or
/// set its position. The parent link is weak: parents own their children, not the other way
/// round.
///
#[derive(Clone, Debug, Default)]
pub struct Writable {
    state: Arc<Mutex<WritableState>>,
}

impl Writable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the persistent counterpart of this object exists.
    pub fn written(&self) -> bool {
        self.state.lock().written
    }

    pub fn set_written(&self, written: bool) {
        self.state.lock().written = written;
    }

    pub fn position(&self) -> Option<Arc<dyn FilePosition>> {
        self.state.lock().position.clone()
    }

    pub fn set_position(&self, position: Option<Arc<dyn FilePosition>>) {
        self.state.lock().position = position;
    }

    pub fn parent(&self) -> Option<Writable> {
        self.state
            .lock()
            .parent
            .upgrade()
            .map(|state| Writable { state })
    }

    pub fn set_parent(&self, parent: &Writable) {
        self.state.lock().parent = Arc::downgrade(&parent.state);
    }

    /// Whether two handles refer to the same object.
    pub fn ptr_eq(&self, other: &Writable) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Here(&'static str);

    impl FilePosition for Here {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_clones_share_state() {
        let writable = Writable::new();
        let handle = writable.clone();
        assert!(!writable.written());

        handle.set_written(true);
        handle.set_position(Some(Arc::new(Here("/E"))));

        assert!(writable.written());
        let position = writable.position().unwrap();
        assert_eq!(position.as_any().downcast_ref::<Here>(), Some(&Here("/E")));
        assert!(writable.ptr_eq(&handle));
        assert!(!writable.ptr_eq(&Writable::new()));
    }

    #[test]
    fn test_parent() {
        let parent = Writable::new();
        let child = Writable::new();
        assert!(child.parent().is_none());

        child.set_parent(&parent);
        assert!(child.parent().unwrap().ptr_eq(&parent));

        drop(parent);
        assert!(child.parent().is_none());
    }
}
