//! Session-scoped state container and event bus.

use std::sync::{Arc, PoisonError, RwLock};

use document_store::Store;
use shared::protocol::Event;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

/// Receives every event produced by the orchestrator and the change feed.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Owns the [`Store`] for one session and fans each event out to
/// subscribers after it has been reduced.
pub struct Dispatcher {
    store: RwLock<Store>,
    events: broadcast::Sender<Event>,
}

impl Dispatcher {
    pub fn new(buffer: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(buffer.max(1));
        Arc::new(Self {
            store: RwLock::new(Store::new()),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn event_stream(&self) -> BroadcastStream<Event> {
        BroadcastStream::new(self.events.subscribe())
    }

    pub fn read<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        f(&store)
    }

    pub fn snapshot(&self) -> Store {
        self.read(Store::clone)
    }

    pub fn reset(&self) {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }
}

impl EventSink for Dispatcher {
    fn emit(&self, event: Event) {
        // Held across the send so subscribers observe the reduction order.
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        store.apply(&event);
        if let Some(tag) = event.tag() {
            debug!(tag = %tag, "dispatched event");
        }
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared::{
        domain::{Document, Interface},
        protocol::Change,
    };

    use super::*;

    #[tokio::test]
    async fn reduces_before_broadcasting() {
        let dispatcher = Dispatcher::new(8);
        let mut rx = dispatcher.subscribe();

        dispatcher.emit(Event::Changed {
            interface: Interface::Otus,
            change: Change::Insert(shared::domain::Document::new("a")),
        });

        let event = rx.recv().await.expect("event");
        assert!(matches!(event, Event::Changed { .. }));
        assert_eq!(dispatcher.read(|store| store.collection(Interface::Otus).len()), 1);

        dispatcher.reset();
        assert!(!dispatcher.snapshot().collection(Interface::Otus).is_fetched());
    }

    #[test]
    fn broadcast_order_matches_reduction_order() {
        let dispatcher = Dispatcher::new(4096);
        let mut rx = dispatcher.subscribe();

        let emitters: Vec<_> = (0..8)
            .map(|thread| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || {
                    for rev in 0..200 {
                        dispatcher.emit(Event::Changed {
                            interface: Interface::Otus,
                            change: Change::Insert(
                                Document::new("shared").with("rev", json!(thread * 1000 + rev)),
                            ),
                        });
                    }
                })
            })
            .collect();
        for emitter in emitters {
            emitter.join().expect("emitter thread");
        }

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if let Event::Changed {
                change: Change::Insert(document),
                ..
            } = event
            {
                last = Some(document);
            }
        }
        let stored = dispatcher.read(|store| store.collection(Interface::Otus).documents.clone());
        assert_eq!(stored, Some(vec![last.expect("broadcast events")]));
    }

    #[test]
    fn emitting_without_subscribers_still_updates_store() {
        let dispatcher = Dispatcher::new(1);
        dispatcher.emit(Event::PendingStarted);
        assert!(dispatcher.read(Store::is_pending));
    }
}
