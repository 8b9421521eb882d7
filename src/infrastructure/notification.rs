use crate::domain::events::PaidEvent;
use crate::domain::ports::PaymentNotifier;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;

/// How many recently published payment ids the hub remembers by default.
pub const DEFAULT_PUBLISHED_HISTORY: usize = 1024;

struct HubState {
    next_subscription: u64,
    subscribers: HashMap<u64, HashMap<u64, oneshot::Sender<PaidEvent>>>,
    published: HashSet<u64>,
    published_order: VecDeque<u64>,
    history: usize,
}

impl HubState {
    fn new(history: usize) -> Self {
        Self {
            next_subscription: 0,
            subscribers: HashMap::new(),
            published: HashSet::new(),
            published_order: VecDeque::new(),
            history,
        }
    }

    fn remove_subscriber(&mut self, payment_id: u64, id: u64) {
        let now_empty = match self.subscribers.get_mut(&payment_id) {
            Some(subscribers) => {
                subscribers.remove(&id);
                subscribers.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.subscribers.remove(&payment_id);
        }
    }

    /// Records `payment_id` as published, evicting the oldest ids beyond
    /// `history`. Returns `false` if it was already remembered.
    fn remember_published(&mut self, payment_id: u64) -> bool {
        if !self.published.insert(payment_id) {
            return false;
        }
        self.published_order.push_back(payment_id);
        while self.published_order.len() > self.history {
            if let Some(oldest) = self.published_order.pop_front() {
                self.published.remove(&oldest);
            }
        }
        true
    }
}

/// Registration of interest in one payment's "paid" transition.
///
/// Resolves at most once. A subscription taken after the event was
/// published never resolves with an event. Dropping it deregisters it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    payment_id: u64,
    receiver: oneshot::Receiver<PaidEvent>,
    done: bool,
    hub: Weak<Mutex<HubState>>,
}

impl Subscription {
    pub fn payment_id(&self) -> u64 {
        self.payment_id
    }

    /// Waits for the event. `None` means the channel closed without one:
    /// the payment was published shortly before subscribing, or the
    /// subscription was removed.
    pub async fn paid(&mut self) -> Option<PaidEvent> {
        if self.done {
            return None;
        }
        self.done = true;
        (&mut self.receiver).await.ok()
    }

    /// Non-blocking variant of [`Subscription::paid`].
    pub fn try_paid(&mut self) -> Option<PaidEvent> {
        if self.done {
            return None;
        }
        let event = self.receiver.try_recv().ok();
        self.done = event.is_some();
        event
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.hub.upgrade() {
            state.lock().remove_subscriber(self.payment_id, self.id);
        }
    }
}

/// Fans a payment's one-shot "paid" event out to its current subscribers.
///
/// Each subscriber owns a `oneshot` channel, so publishing never waits on a
/// slow or vanished receiver. There is no replay. The last `history`
/// published ids are remembered so that a late subscription on one of them
/// resolves closed at once; older ids simply never fire again, since the
/// store lets a payment be confirmed only once.
pub struct NotificationHub {
    state: Arc<Mutex<HubState>>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::with_history(DEFAULT_PUBLISHED_HISTORY)
    }

    pub fn with_history(history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::new(history))),
        }
    }

    pub fn subscribe(&self, payment_id: u64) -> Subscription {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.state.lock();
        state.next_subscription += 1;
        let id = state.next_subscription;

        if state.published.contains(&payment_id) {
            tracing::debug!(payment_id, "Subscription on already published payment");
            drop(sender);
        } else {
            state
                .subscribers
                .entry(payment_id)
                .or_default()
                .insert(id, sender);
        }

        Subscription {
            id,
            payment_id,
            receiver,
            done: false,
            hub: Arc::downgrade(&self.state),
        }
    }

    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.state
            .lock()
            .remove_subscriber(subscription.payment_id, subscription.id);
    }

    /// Delivers the event to everyone subscribed right now, then closes the id.
    pub fn publish_paid(&self, payment_id: u64) {
        let subscribers = {
            let mut state = self.state.lock();
            if !state.remember_published(payment_id) {
                return;
            }
            state.subscribers.remove(&payment_id).unwrap_or_default()
        };

        let total = subscribers.len();
        let delivered = subscribers
            .into_values()
            .map(|sender| sender.send(PaidEvent { payment_id }))
            .filter(Result::is_ok)
            .count();

        tracing::debug!(payment_id, total, delivered, "Published paid event");
    }

    pub fn subscriber_count(&self, payment_id: u64) -> usize {
        self.state
            .lock()
            .subscribers
            .get(&payment_id)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Number of published ids currently remembered.
    pub fn published_len(&self) -> usize {
        self.state.lock().published.len()
    }
}

impl PaymentNotifier for NotificationHub {
    fn publish_paid(&self, event: PaidEvent) {
        NotificationHub::publish_paid(self, event.payment_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber_once() {
        let hub = NotificationHub::new();
        let mut first = hub.subscribe(1);
        let mut second = hub.subscribe(1);
        assert_eq!(hub.subscriber_count(1), 2);

        hub.publish_paid(1);

        assert_eq!(first.paid().await, Some(PaidEvent { payment_id: 1 }));
        assert_eq!(second.paid().await, Some(PaidEvent { payment_id: 1 }));
        assert_eq!(hub.subscriber_count(1), 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_receives_nothing() {
        let hub = NotificationHub::new();
        hub.publish_paid(1);

        let mut late = hub.subscribe(1);
        assert_eq!(late.paid().await, None);
        assert_eq!(hub.subscriber_count(1), 0);
    }

    #[tokio::test]
    async fn test_publish_is_scoped_to_payment_id() {
        let hub = NotificationHub::new();
        let mut other = hub.subscribe(2);

        hub.publish_paid(1);

        assert_eq!(other.try_paid(), None);
        assert_eq!(hub.subscriber_count(2), 1);
    }

    #[tokio::test]
    async fn test_second_publish_is_ignored() {
        let hub = NotificationHub::new();
        let mut subscriber = hub.subscribe(1);
        hub.publish_paid(1);
        hub.publish_paid(1);

        assert_eq!(subscriber.try_paid(), Some(PaidEvent { payment_id: 1 }));
        assert_eq!(subscriber.try_paid(), None);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let hub = NotificationHub::new();
        let mut subscription = hub.subscribe(1);
        hub.unsubscribe(&subscription);
        assert_eq!(hub.subscriber_count(1), 0);

        hub.publish_paid(1);
        assert_eq!(subscription.paid().await, None);

        // Unsubscribing after publication is a no-op.
        hub.unsubscribe(&subscription);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_does_not_block_publish() {
        let hub = NotificationHub::new();
        let dropped = hub.subscribe(1);
        let mut kept = hub.subscribe(1);
        drop(dropped);

        hub.publish_paid(1);
        assert_eq!(kept.paid().await, Some(PaidEvent { payment_id: 1 }));
    }

    #[tokio::test]
    async fn test_dropped_subscription_deregisters() {
        let hub = NotificationHub::new();
        for _ in 0..1000 {
            drop(hub.subscribe(7));
        }
        assert_eq!(hub.subscriber_count(7), 0);

        let kept = hub.subscribe(7);
        drop(hub.subscribe(7));
        assert_eq!(hub.subscriber_count(7), 1);
        drop(kept);
        assert_eq!(hub.subscriber_count(7), 0);
    }

    #[tokio::test]
    async fn test_subscription_outliving_hub() {
        let hub = NotificationHub::new();
        let mut subscription = hub.subscribe(1);
        drop(hub);

        assert_eq!(subscription.paid().await, None);
        drop(subscription);
    }

    #[tokio::test]
    async fn test_published_history_is_bounded() {
        let hub = NotificationHub::with_history(2);
        for payment_id in 1..=10 {
            hub.publish_paid(payment_id);
        }
        assert_eq!(hub.published_len(), 2);

        // Recent ids stay closed for late subscribers.
        let mut recent = hub.subscribe(10);
        assert_eq!(recent.paid().await, None);
        assert_eq!(hub.subscriber_count(10), 0);

        // Evicted ids fall back to an ordinary registration that never fires.
        let mut evicted = hub.subscribe(1);
        assert_eq!(evicted.try_paid(), None);
        assert_eq!(hub.subscriber_count(1), 1);
        drop(evicted);
        assert_eq!(hub.subscriber_count(1), 0);
    }
}
