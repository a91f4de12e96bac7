use std::collections::HashMap;

use serde_json::Value;
use shared::{
    domain::{Document, DocumentId, Interface},
    error::ApiError,
    protocol::{ActionKind, Change, Context, Event, Page, Verb},
};
use tracing::{debug, warn};

use crate::{insert, remove, replace_page, update, Collection};

static UNSET: Collection = Collection {
    documents: None,
    page: 0,
    page_count: 0,
    per_page: None,
    found_count: None,
    total_count: None,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RequestFailure {
    pub status: u16,
    pub message: String,
    pub error: ApiError,
}

/// Session-scoped state reduced from request outcomes and change
/// notifications. Owned by the dispatcher; nothing else mutates it.
#[derive(Debug, Clone, Default)]
pub struct Store {
    collections: HashMap<Interface, Collection>,
    details: HashMap<Interface, Document>,
    errors: HashMap<ActionKind, RequestFailure>,
    /// Mutation brackets currently open.
    pending: usize,
    logged_out: bool,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, interface: Interface) -> &Collection {
        self.collections.get(&interface).unwrap_or(&UNSET)
    }

    pub fn detail(&self, interface: Interface) -> Option<&Document> {
        self.details.get(&interface)
    }

    pub fn error(&self, kind: ActionKind) -> Option<&RequestFailure> {
        self.errors.get(&kind)
    }

    pub fn is_pending(&self) -> bool {
        self.pending > 0
    }

    pub fn is_logged_out(&self) -> bool {
        self.logged_out
    }

    /// Drops everything held for the session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Requested { intent } => {
                self.errors.remove(&intent.kind());
            }
            Event::Succeeded {
                kind,
                data,
                context,
            } => self.apply_success(*kind, data, context),
            Event::Failed {
                kind,
                message,
                status,
                error,
            } => {
                self.errors.insert(
                    *kind,
                    RequestFailure {
                        status: *status,
                        message: message.clone(),
                        error: error.clone(),
                    },
                );
            }
            Event::LoggedOut => {
                self.collections.clear();
                self.details.clear();
                self.errors.clear();
                self.logged_out = true;
            }
            Event::PendingStarted => self.pending += 1,
            Event::PendingFinished => self.pending = self.pending.saturating_sub(1),
            Event::Changed { interface, change } => self.apply_change(*interface, change),
        }
    }

    fn apply_success(&mut self, kind: ActionKind, data: &Value, context: &Context) {
        let interface = kind.interface;
        match kind.verb {
            Verb::Find => {
                let Some(page) = decode::<Page>(kind, data) else {
                    return;
                };
                let next = replace_page(self.collection(interface), page);
                self.collections.insert(interface, next);
            }
            Verb::Get => {
                let Some(document) = decode::<Document>(kind, data) else {
                    return;
                };
                let next = update(self.collection(interface), document.clone());
                self.collections.insert(interface, next);
                self.details.insert(interface, document);
            }
            Verb::Create => {
                let Some(document) = decode::<Document>(kind, data) else {
                    return;
                };
                let (sort_key, reverse) = interface.sort_order();
                let next = insert(self.collection(interface), document, sort_key, reverse);
                self.collections.insert(interface, next);
            }
            Verb::Edit => {
                let Some(document) = decode::<Document>(kind, data) else {
                    return;
                };
                self.refresh_detail(interface, &document);
                let next = update(self.collection(interface), document);
                self.collections.insert(interface, next);
            }
            Verb::Remove => {
                let Some(id) = context.get("id").and_then(Value::as_str) else {
                    warn!(%kind, "remove outcome without an id in its context");
                    return;
                };
                let id = DocumentId::from(id);
                self.forget_detail(interface, std::slice::from_ref(&id));
                let next = remove(self.collection(interface), &[id]);
                self.collections.insert(interface, next);
            }
        }
    }

    fn apply_change(&mut self, interface: Interface, change: &Change) {
        debug!(%interface, "applying change notification");
        let current = self.collection(interface);
        let next = match change {
            Change::Insert(document) => {
                let (sort_key, reverse) = interface.sort_order();
                insert(current, document.clone(), sort_key, reverse)
            }
            Change::Update(document) => {
                let next = update(current, document.clone());
                self.refresh_detail(interface, document);
                next
            }
            Change::Remove(ids) => {
                let next = remove(current, ids);
                self.forget_detail(interface, ids);
                next
            }
        };
        self.collections.insert(interface, next);
    }

    fn refresh_detail(&mut self, interface: Interface, document: &Document) {
        if let Some(detail) = self.details.get_mut(&interface) {
            if detail.id == document.id {
                *detail = document.clone();
            }
        }
    }

    fn forget_detail(&mut self, interface: Interface, ids: &[DocumentId]) {
        if self
            .details
            .get(&interface)
            .is_some_and(|detail| ids.contains(&detail.id))
        {
            self.details.remove(&interface);
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(kind: ActionKind, data: &Value) -> Option<T> {
    match serde_json::from_value(data.clone()) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(%kind, error = %err, "ignoring undecodable response body");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
