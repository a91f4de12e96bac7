//! Request orchestration for the curation client: intents go out through a
//! [`Scheduler`], outcomes come back as events reduced into a session
//! [`Store`](document_store::Store).

use std::sync::Arc;

use anyhow::{Context, Result};
use shared::protocol::{Event, Intent, Verb};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::info;

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod orchestrator;
pub mod scheduler;
pub mod transport;
pub mod ws;

pub use config::Settings;
pub use dispatcher::{Dispatcher, EventSink};
pub use orchestrator::{api_call, run_intent, with_pending, RequestError};
pub use scheduler::{Dispatch, DispatchPolicy, Scheduler};
pub use transport::{HttpTransport, RequestParams, Transport, TransportError, TransportResponse};

/// Everything one signed-in session owns. Created by [`ClientSession::start`]
/// and torn down by [`ClientSession::end`].
pub struct ClientSession {
    settings: Settings,
    dispatcher: Arc<Dispatcher>,
    scheduler: Arc<Scheduler>,
    change_feed: Mutex<Option<JoinHandle<()>>>,
}

impl ClientSession {
    pub fn start(settings: Settings) -> Result<Arc<Self>> {
        let transport = HttpTransport::new(&settings.server_url, settings.request_timeout())
            .context("failed to create http transport")?;
        Ok(Self::with_transport(settings, Arc::new(transport)))
    }

    pub fn with_transport(settings: Settings, transport: Arc<dyn Transport>) -> Arc<Self> {
        let dispatcher = Dispatcher::new(settings.event_buffer);
        let scheduler = Scheduler::new(transport, dispatcher.clone(), settings.per_page)
            .with_policy(Verb::Find, settings.find_policy());
        info!(server_url = %settings.server_url, "client session started");
        Arc::new(Self {
            settings,
            dispatcher,
            scheduler: Arc::new(scheduler),
            change_feed: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.dispatcher.subscribe()
    }

    pub fn dispatch(&self, intent: Intent) -> Dispatch {
        self.scheduler.dispatch(intent)
    }

    /// Dispatches `intent` under `policy`, ignoring the configured one.
    pub fn dispatch_with(&self, intent: Intent, policy: DispatchPolicy) -> Dispatch {
        self.scheduler.dispatch_with(intent, policy)
    }

    /// Starts the websocket change feed, replacing any running one.
    pub async fn connect_change_feed(&self) -> Result<()> {
        let handle =
            ws::spawn_change_feed(self.dispatcher.clone(), &self.settings.server_url).await?;
        if let Some(previous) = self.change_feed.lock().await.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Cancels outstanding work and drops all session state.
    pub async fn end(&self) {
        self.scheduler.shutdown();
        if let Some(feed) = self.change_feed.lock().await.take() {
            feed.abort();
        }
        self.dispatcher.reset();
        info!("client session ended");
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
