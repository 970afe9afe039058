use std::cell::Cell;
use std::rc::Rc;

/// A registered event listener that can be detached.
pub trait Subscription {
    fn unsubscribe(&mut self);
}

/// Every listener the scene attached, detached together on `stop()`.
#[derive(Default)]
pub struct Subscriptions {
    items: Vec<Box<dyn Subscription>>,
}

impl Subscriptions {
    pub fn add(&mut self, subscription: impl Subscription + 'static) {
        self.items.push(Box::new(subscription));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn unsubscribe_all(&mut self) {
        for mut item in self.items.drain(..) {
            item.unsubscribe();
        }
    }
}

/// Pointer events reach the scene through the window event loop rather than a
/// DOM listener; this gate is what detaching them means.
#[derive(Debug, Clone, Default)]
pub struct PointerGate {
    attached: Rc<Cell<bool>>,
}

impl PointerGate {
    pub fn attach() -> Self {
        Self { attached: Rc::new(Cell::new(true)) }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }
}

impl Subscription for PointerGate {
    fn unsubscribe(&mut self) {
        self.attached.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting(Rc<Cell<u32>>);

    impl Subscription for Counting {
        fn unsubscribe(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn unsubscribes_everything_once() {
        let count = Rc::new(Cell::new(0));
        let mut subs = Subscriptions::default();
        subs.add(Counting(count.clone()));
        subs.add(Counting(count.clone()));
        assert_eq!(subs.len(), 2);

        subs.unsubscribe_all();
        subs.unsubscribe_all();
        assert_eq!(count.get(), 2);
        assert_eq!(subs.len(), 0);
    }

    #[test]
    fn pointer_gate_closes_for_every_clone() {
        let gate = PointerGate::attach();
        let observer = gate.clone();
        let mut subs = Subscriptions::default();
        subs.add(gate);
        assert!(observer.is_attached());
        subs.unsubscribe_all();
        assert!(!observer.is_attached());
        assert!(!PointerGate::default().is_attached());
    }
}
