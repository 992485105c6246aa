use std::marker::PhantomData;

/// Handle returned by [`ChangeNotifier::subscribe`]; pass it back to
/// [`ChangeNotifier::unsubscribe`] to cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

trait Watch<S> {
    fn check(&mut self, state: &S);
}

struct Watcher<S, T, F, L> {
    selector: F,
    listener: L,
    last: T,
    _state: PhantomData<fn(&S)>,
}

impl<S, T, F, L> Watch<S> for Watcher<S, T, F, L>
where
    T: PartialEq,
    F: Fn(&S) -> T,
    L: FnMut(&T),
{
    fn check(&mut self, state: &S) {
        let next = (self.selector)(state);
        if next != self.last {
            (self.listener)(&next);
            self.last = next;
        }
    }
}

/// Selector-based change notification over a state type `S`. A listener
/// fires only when the value its selector extracts differs from the value
/// seen at the previous notification (or at subscription).
pub struct ChangeNotifier<S> {
    next_id: u64,
    watchers: Vec<(Subscription, Box<dyn Watch<S>>)>,
}

impl<S> Default for ChangeNotifier<S> {
    fn default() -> Self {
        Self {
            next_id: 0,
            watchers: Vec::new(),
        }
    }
}

impl<S: 'static> ChangeNotifier<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<T, F, L>(&mut self, state: &S, selector: F, listener: L) -> Subscription
    where
        T: PartialEq + 'static,
        F: Fn(&S) -> T + 'static,
        L: FnMut(&T) + 'static,
    {
        let id = Subscription(self.next_id);
        self.next_id += 1;
        let last = selector(state);
        self.watchers.push((
            id,
            Box::new(Watcher {
                selector,
                listener,
                last,
                _state: PhantomData,
            }),
        ));
        id
    }

    /// Returns false if the subscription was already cancelled.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.watchers.len();
        self.watchers.retain(|(id, _)| *id != subscription);
        self.watchers.len() != before
    }

    /// Runs every live selector against `state`, in subscription order.
    pub fn notify(&mut self, state: &S) {
        for (_, watcher) in &mut self.watchers {
            watcher.check(state);
        }
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}
