//! Single-slot event notification.

use std::fmt;

use crate::types::Event;

type Callback = Box<dyn FnMut(Event, i32)>;

/// Holds at most one owner callback, invoked as `(event, error_code)`.
///
/// The slot should be filled before the poll loop starts; it is invoked
/// synchronously from within `tick()`.
#[derive(Default)]
pub struct EventNotifier {
    callback: Option<Callback>,
}

impl EventNotifier {
    /// Create an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `callback`, replacing any previous one.
    pub fn set<F>(&mut self, callback: F)
    where
        F: FnMut(Event, i32) + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Remove the installed callback.
    pub fn clear(&mut self) {
        self.callback = None;
    }

    /// Check if a callback is installed.
    pub fn is_set(&self) -> bool {
        self.callback.is_some()
    }

    /// Deliver an event. A no-op when the slot is empty.
    pub fn notify(&mut self, event: Event, code: i32) {
        if let Some(callback) = self.callback.as_mut() {
            callback(event, code);
        }
    }
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("is_set", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_notify_empty_slot() {
        let mut notifier = EventNotifier::new();
        assert!(!notifier.is_set());
        notifier.notify(Event::Connected, 0);
    }

    #[test]
    fn test_notify_replaces_callback() {
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));

        let mut notifier = EventNotifier::new();
        let sink = Rc::clone(&first);
        notifier.set(move |event, code| sink.borrow_mut().push((event, code)));
        notifier.notify(Event::Error, -6);

        let sink = Rc::clone(&second);
        notifier.set(move |event, code| sink.borrow_mut().push((event, code)));
        notifier.notify(Event::Connected, 0);

        assert_eq!(*first.borrow(), vec![(Event::Error, -6)]);
        assert_eq!(*second.borrow(), vec![(Event::Connected, 0)]);

        notifier.clear();
        assert!(!notifier.is_set());
    }
}
