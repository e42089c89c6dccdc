use crate::Dispose;
use parking_lot::Mutex;
use std::sync::Arc;

/// Owns the disposable objects of one container scope.
///
/// Objects are disposed in the reverse of the order they were added in.
/// Objects removed before that happens are not disposed.
#[derive(Default)]
pub struct LifetimeContainer {
    items: Mutex<Vec<Arc<dyn Dispose>>>,
}

impl LifetimeContainer {
    #[must_use]
    pub fn new() -> Self {
        LifetimeContainer::default()
    }

    pub fn add(&self, item: Arc<dyn Dispose>) {
        self.items.lock().push(item);
    }

    /// Removes an object without disposing it. Returns whether it was
    /// present.
    pub fn remove(&self, item: &Arc<dyn Dispose>) -> bool {
        let mut items = self.items.lock();
        match items.iter().position(|existing| same_object(existing, item)) {
            Some(index) => {
                items.remove(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contains(&self, item: &Arc<dyn Dispose>) -> bool {
        self.items
            .lock()
            .iter()
            .any(|existing| same_object(existing, item))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Disposes every owned object, most recently added first, and empties
    /// this container.
    pub fn dispose(&self) {
        let items = std::mem::take(&mut *self.items.lock());
        for item in items.iter().rev() {
            item.dispose();
        }
    }
}

fn same_object(a: &Arc<dyn Dispose>, b: &Arc<dyn Dispose>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

#[cfg(test)]
mod tests {
    use super::LifetimeContainer;
    use crate::Dispose;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Dispose for Recorder {
        fn dispose(&self) {
            self.log.lock().push(self.name);
        }
    }

    fn recorder(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn Dispose> {
        Arc::new(Recorder {
            name,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn disposes_in_reverse_order() {
        let log = Arc::default();
        let container = LifetimeContainer::new();
        container.add(recorder("a", &log));
        container.add(recorder("b", &log));
        container.add(recorder("c", &log));

        container.dispose();
        assert_eq!(vec!["c", "b", "a"], *log.lock());
        assert!(container.is_empty());
    }

    #[test]
    fn removed_items_are_not_disposed() {
        let log = Arc::default();
        let container = LifetimeContainer::new();
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        container.add(Arc::clone(&a));
        container.add(Arc::clone(&b));

        assert!(container.remove(&a));
        assert!(!container.remove(&a));
        assert!(container.contains(&b));
        assert_eq!(1, container.len());

        container.dispose();
        assert_eq!(vec!["b"], *log.lock());
    }

    #[test]
    fn disposing_twice_does_nothing() {
        let log = Arc::default();
        let container = LifetimeContainer::new();
        container.add(recorder("a", &log));
        container.dispose();
        container.dispose();
        assert_eq!(vec!["a"], *log.lock());
    }
}
