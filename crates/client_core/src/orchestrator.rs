//! Drives a single request to exactly one outcome event.

use std::future::Future;

use shared::protocol::{ActionKind, Context, Event, Intent};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    api::request_for,
    dispatcher::EventSink,
    transport::{RequestParams, Transport, TransportError},
};

/// Failures that are not turned into a domain event. They propagate to the
/// scheduler instead of being reported as `Failed`.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{kind} failed with status {status} and no error body")]
    UnstructuredStatus { kind: ActionKind, status: u16 },
    #[error("{kind} could not reach the server: {message}")]
    Transport { kind: ActionKind, message: String },
}

/// Sends `params` and emits the outcome for `kind`.
///
/// Emits `Succeeded` on success, `LoggedOut` on HTTP 401 and `Failed` for any
/// other error with a structured body. Errors without a body emit nothing and
/// are returned.
pub async fn api_call<T, S>(
    transport: &T,
    sink: &S,
    kind: ActionKind,
    params: RequestParams,
    context: Context,
) -> Result<(), RequestError>
where
    T: Transport + ?Sized,
    S: EventSink + ?Sized,
{
    match transport.send(params).await {
        Ok(response) => {
            debug!(%kind, status = response.status, "request succeeded");
            sink.emit(Event::Succeeded {
                kind,
                data: response.body,
                context,
            });
            Ok(())
        }
        Err(TransportError::Status { status: 401, .. }) => {
            warn!(%kind, "session expired");
            sink.emit(Event::LoggedOut);
            Ok(())
        }
        Err(TransportError::Status {
            status,
            body: Some(error),
        }) => {
            info!(%kind, status, message = %error.message, "request rejected");
            sink.emit(Event::Failed {
                kind,
                message: error.message.clone(),
                status,
                error,
            });
            Ok(())
        }
        Err(TransportError::Status { status, body: None }) => {
            Err(RequestError::UnstructuredStatus { kind, status })
        }
        Err(TransportError::Connection(message)) => Err(RequestError::Transport { kind, message }),
    }
}

struct PendingGuard<'a, S: EventSink + ?Sized> {
    sink: &'a S,
}

impl<S: EventSink + ?Sized> Drop for PendingGuard<'_, S> {
    fn drop(&mut self) {
        self.sink.emit(Event::PendingFinished);
    }
}

/// Runs `work` between `PendingStarted` and `PendingFinished`.
///
/// The finish signal is emitted from a drop guard, so it also fires when
/// `work` panics or the surrounding task is cancelled.
pub async fn with_pending<S, F>(sink: &S, work: F) -> F::Output
where
    S: EventSink + ?Sized,
    F: Future,
{
    sink.emit(Event::PendingStarted);
    let _guard = PendingGuard { sink };
    work.await
}

/// Emits `Requested` for `intent` and performs it. Mutations are bracketed by
/// the pending signals.
pub async fn run_intent<T, S>(
    transport: &T,
    sink: &S,
    intent: Intent,
    per_page: u32,
) -> Result<(), RequestError>
where
    T: Transport + ?Sized,
    S: EventSink + ?Sized,
{
    let kind = intent.kind();
    let params = request_for(&intent, per_page);
    let context = intent.context();
    sink.emit(Event::Requested { intent });

    if kind.verb.is_mutation() {
        with_pending(sink, api_call(transport, sink, kind, params, context)).await
    } else {
        api_call(transport, sink, kind, params, context).await
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
