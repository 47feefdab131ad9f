//! Typed event channels.
//!
//! An [`EventChannel`] is an explicit callback list: consumers subscribe and
//! unsubscribe with a token, producers publish a payload to every current
//! subscriber. Channels are used for the pipeline's busy/idle broadcast,
//! render-refresh requests, and interaction events such as contour closure.
//!
//! Channels are single-threaded by design; the whole editing session runs on
//! the event-dispatch thread.

/// Token returned by [`EventChannel::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// A list of callbacks invoked in subscription order on every publish.
pub struct EventChannel<T> {
    next_token: u64,
    subscribers: Vec<(Subscription, Box<dyn FnMut(&T)>)>,
}

impl<T> EventChannel<T> {
    /// Creates a new channel with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_token: 0,
            subscribers: Vec::new(),
        }
    }

    /// Registers a callback and returns its subscription token.
    pub fn subscribe(&mut self, callback: impl FnMut(&T) + 'static) -> Subscription {
        let token = Subscription(self.next_token);
        self.next_token += 1;
        self.subscribers.push((token, Box::new(callback)));
        token
    }

    /// Removes a previously registered callback.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, token: Subscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(t, _)| *t != token);
        self.subscribers.len() != before
    }

    /// Publishes a payload to all subscribers, in subscription order.
    pub fn publish(&mut self, payload: &T) {
        for (_, callback) in &mut self.subscribers {
            callback(payload);
        }
    }

    /// Returns the number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns true if no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Removes all subscribers.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribe_and_publish() {
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();

        let mut channel = EventChannel::new();
        channel.subscribe(move |value: &i32| sink.borrow_mut().push(*value));

        channel.publish(&1);
        channel.publish(&2);
        assert_eq!(*received.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();

        let mut channel = EventChannel::new();
        let token = channel.subscribe(move |(): &()| *sink.borrow_mut() += 1);

        channel.publish(&());
        assert!(channel.unsubscribe(token));
        channel.publish(&());

        assert_eq!(*count.borrow(), 1);
        assert!(!channel.unsubscribe(token));
    }

    #[test]
    fn test_publish_order_matches_subscription_order() {
        let order = Rc::new(RefCell::new(Vec::new()));

        let mut channel = EventChannel::new();
        for id in 0..3 {
            let sink = order.clone();
            channel.subscribe(move |(): &()| sink.borrow_mut().push(id));
        }

        channel.publish(&());
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }
}
