//! Notification dispatch from the host node to forecasting subscribers.
//!
//! The host enqueues mempool and block events; a single background worker
//! dispatches each event to every live subscriber in order. Within one
//! subscriber the callbacks are strictly serialized, and the host's
//! enqueue order is preserved: removals caused by a block arrive before
//! that block's event, and multiple connecting blocks arrive in height
//! order.
//!
//! Subscribers are held weakly. Dropping the last strong handle to a
//! subscriber cancels its remaining deliveries without unsubscribing
//! explicitly.

use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::debug;

use ebb_core::types::{BlockEvent, TxAddedEvent, TxRemovedEvent};
use ebb_core::traits::MempoolSink;

enum Notification {
    TransactionAdded(TxAddedEvent),
    TransactionRemoved(TxRemovedEvent),
    BlockConnected(BlockEvent),
    /// Test/shutdown aid: acknowledges once everything before it has been
    /// dispatched.
    Flush(mpsc::SyncSender<()>),
}

/// Fan-out point for mempool and block notifications.
pub struct NotificationHub {
    sender: Option<mpsc::Sender<Notification>>,
    subscribers: Arc<Mutex<Vec<Weak<dyn MempoolSink>>>>,
    worker: Option<JoinHandle<()>>,
}

impl NotificationHub {
    /// Start the hub and its dispatch worker.
    pub fn new() -> Self {
        let subscribers: Arc<Mutex<Vec<Weak<dyn MempoolSink>>>> =
            Arc::new(Mutex::new(Vec::new()));
        let (sender, receiver) = mpsc::channel::<Notification>();

        let worker_subscribers = Arc::clone(&subscribers);
        let worker = std::thread::Builder::new()
            .name("ebb-notify".into())
            .spawn(move || {
                while let Ok(notification) = receiver.recv() {
                    // Snapshot live subscribers, pruning the dropped ones.
                    let sinks: Vec<Arc<dyn MempoolSink>> = {
                        let mut subs = worker_subscribers.lock();
                        subs.retain(|weak| weak.strong_count() > 0);
                        subs.iter().filter_map(Weak::upgrade).collect()
                    };
                    match notification {
                        Notification::TransactionAdded(event) => {
                            for sink in &sinks {
                                sink.transaction_added(&event);
                            }
                        }
                        Notification::TransactionRemoved(event) => {
                            for sink in &sinks {
                                sink.transaction_removed(&event);
                            }
                        }
                        Notification::BlockConnected(event) => {
                            debug!(height = event.height, "dispatching block-connected");
                            for sink in &sinks {
                                sink.block_connected(&event);
                            }
                        }
                        Notification::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            })
            .expect("spawn notification worker");

        Self { sender: Some(sender), subscribers, worker: Some(worker) }
    }

    /// Subscribe a sink. The hub keeps only a weak handle.
    pub fn subscribe(&self, sink: &Arc<dyn MempoolSink>) {
        self.subscribers.lock().push(Arc::downgrade(sink));
    }

    /// Enqueue a transaction-added notification.
    pub fn transaction_added(&self, event: TxAddedEvent) {
        self.send(Notification::TransactionAdded(event));
    }

    /// Enqueue a transaction-removed notification.
    ///
    /// Removals caused by a block must be enqueued before that block's
    /// [`block_connected`](Self::block_connected).
    pub fn transaction_removed(&self, event: TxRemovedEvent) {
        self.send(Notification::TransactionRemoved(event));
    }

    /// Enqueue a block-connected notification.
    pub fn block_connected(&self, event: BlockEvent) {
        self.send(Notification::BlockConnected(event));
    }

    /// Block until every previously enqueued notification has been
    /// dispatched.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        self.send(Notification::Flush(ack_tx));
        let _ = ack_rx.recv();
    }

    fn send(&self, notification: Notification) {
        if let Some(sender) = &self.sender {
            // A send only fails when the worker is gone, i.e. during
            // shutdown; pending notifications are discarded by design.
            let _ = sender.send(notification);
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NotificationHub {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebb_core::types::{RemovalReason, Txid};
    use parking_lot::Mutex as PlMutex;

    /// Records the order in which callbacks arrive.
    #[derive(Default)]
    struct RecordingSink {
        log: PlMutex<Vec<String>>,
    }

    impl MempoolSink for RecordingSink {
        fn transaction_added(&self, event: &TxAddedEvent) {
            self.log.lock().push(format!("add:{}", event.sequence));
        }

        fn transaction_removed(&self, event: &TxRemovedEvent) {
            self.log.lock().push(format!("remove:{}", event.sequence));
        }

        fn block_connected(&self, event: &BlockEvent) {
            self.log.lock().push(format!("block:{}", event.height));
        }
    }

    fn added(sequence: u64) -> TxAddedEvent {
        TxAddedEvent { txid: Txid([1; 32]), fee: 1000, vsize: 100, arrival: 0, sequence }
    }

    fn removed(sequence: u64) -> TxRemovedEvent {
        TxRemovedEvent { txid: Txid([1; 32]), reason: RemovalReason::Conflict, sequence }
    }

    fn block(height: u64) -> BlockEvent {
        BlockEvent { height, ..BlockEvent::default() }
    }

    #[test]
    fn dispatches_in_enqueue_order() {
        let hub = NotificationHub::new();
        let sink = Arc::new(RecordingSink::default());
        let as_sink: Arc<dyn MempoolSink> = sink.clone();
        hub.subscribe(&as_sink);

        // Removals for a block precede the block event, per contract.
        hub.transaction_added(added(1));
        hub.transaction_removed(removed(2));
        hub.transaction_removed(removed(3));
        hub.block_connected(block(100));
        hub.block_connected(block(101));
        hub.flush();

        assert_eq!(
            *sink.log.lock(),
            vec!["add:1", "remove:2", "remove:3", "block:100", "block:101"]
        );
    }

    #[test]
    fn all_subscribers_see_each_event() {
        let hub = NotificationHub::new();
        let first = Arc::new(RecordingSink::default());
        let second = Arc::new(RecordingSink::default());
        let first_sink: Arc<dyn MempoolSink> = first.clone();
        let second_sink: Arc<dyn MempoolSink> = second.clone();
        hub.subscribe(&first_sink);
        hub.subscribe(&second_sink);

        hub.block_connected(block(7));
        hub.flush();

        assert_eq!(*first.log.lock(), vec!["block:7"]);
        assert_eq!(*second.log.lock(), vec!["block:7"]);
    }

    #[test]
    fn dropped_subscribers_stop_receiving() {
        let hub = NotificationHub::new();
        let kept = Arc::new(RecordingSink::default());
        let kept_sink: Arc<dyn MempoolSink> = kept.clone();
        hub.subscribe(&kept_sink);

        {
            let dropped = Arc::new(RecordingSink::default());
            let dropped_sink: Arc<dyn MempoolSink> = dropped;
            hub.subscribe(&dropped_sink);
            hub.block_connected(block(1));
            hub.flush();
            // dropped_sink still alive here; both received block 1.
        }

        hub.block_connected(block(2));
        hub.flush();
        assert_eq!(*kept.log.lock(), vec!["block:1", "block:2"]);
    }

    #[test]
    fn flush_waits_for_prior_events() {
        let hub = NotificationHub::new();
        let sink = Arc::new(RecordingSink::default());
        let as_sink: Arc<dyn MempoolSink> = sink.clone();
        hub.subscribe(&as_sink);

        for height in 0..100 {
            hub.block_connected(block(height));
        }
        hub.flush();
        assert_eq!(sink.log.lock().len(), 100);
    }

    #[test]
    fn drop_joins_the_worker() {
        let hub = NotificationHub::new();
        hub.block_connected(block(1));
        drop(hub); // must not hang or panic
    }
}
