use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{Document, DocumentId, Interface},
    error::ApiError,
};

/// Caller-supplied data merged into an outcome event so consumers can
/// correlate a response with request parameters absent from the body.
pub type Context = Map<String, Value>;

/// One page of a list endpoint as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub documents: Vec<Document>,
    pub page: u32,
    pub page_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl Page {
    pub fn new(documents: Vec<Document>, page: u32, page_count: u32) -> Self {
        Self {
            documents,
            page,
            page_count,
            per_page: None,
            found_count: None,
            total_count: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Find,
    Get,
    Create,
    Edit,
    Remove,
}

impl Verb {
    pub fn is_mutation(self) -> bool {
        matches!(self, Verb::Create | Verb::Edit | Verb::Remove)
    }

    fn tag(self) -> &'static str {
        match self {
            Verb::Find => "FIND",
            Verb::Get => "GET",
            Verb::Create => "CREATE",
            Verb::Edit => "EDIT",
            Verb::Remove => "REMOVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Requested,
    Succeeded,
    Failed,
}

impl Stage {
    fn tag(self) -> &'static str {
        match self {
            Stage::Requested => "REQUESTED",
            Stage::Succeeded => "SUCCEEDED",
            Stage::Failed => "FAILED",
        }
    }
}

/// Base name shared by the REQUESTED/SUCCEEDED/FAILED triple of one request
/// family, e.g. `FIND_OTUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKind {
    pub verb: Verb,
    pub interface: Interface,
}

impl ActionKind {
    pub fn new(verb: Verb, interface: Interface) -> Self {
        Self { verb, interface }
    }

    pub fn tag(&self, stage: Stage) -> String {
        format!("{self}_{}", stage.tag())
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.verb.tag(),
            self.interface.as_str().to_ascii_uppercase()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Intent {
    Find {
        interface: Interface,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        term: Option<String>,
        page: u32,
    },
    Get {
        interface: Interface,
        id: DocumentId,
    },
    Create {
        interface: Interface,
        body: Value,
    },
    Edit {
        interface: Interface,
        id: DocumentId,
        body: Value,
    },
    Remove {
        interface: Interface,
        id: DocumentId,
    },
}

impl Intent {
    pub fn kind(&self) -> ActionKind {
        match self {
            Intent::Find { interface, .. } => ActionKind::new(Verb::Find, *interface),
            Intent::Get { interface, .. } => ActionKind::new(Verb::Get, *interface),
            Intent::Create { interface, .. } => ActionKind::new(Verb::Create, *interface),
            Intent::Edit { interface, .. } => ActionKind::new(Verb::Edit, *interface),
            Intent::Remove { interface, .. } => ActionKind::new(Verb::Remove, *interface),
        }
    }

    /// Pass-through data attached to this intent's outcome event.
    pub fn context(&self) -> Context {
        let mut context = Context::new();
        match self {
            Intent::Find { term, page, .. } => {
                context.insert("page".into(), Value::from(*page));
                if let Some(term) = term {
                    context.insert("term".into(), Value::from(term.clone()));
                }
            }
            Intent::Get { id, .. } | Intent::Edit { id, .. } | Intent::Remove { id, .. } => {
                context.insert("id".into(), Value::from(id.0.clone()));
            }
            Intent::Create { .. } => {}
        }
        context
    }
}

/// Incremental change pushed by the server for one interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "data", rename_all = "snake_case")]
pub enum Change {
    Insert(Document),
    Update(Document),
    #[serde(rename = "delete")]
    Remove(Vec<DocumentId>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Event {
    Requested {
        intent: Intent,
    },
    Succeeded {
        kind: ActionKind,
        data: Value,
        #[serde(default)]
        context: Context,
    },
    Failed {
        kind: ActionKind,
        message: String,
        status: u16,
        error: ApiError,
    },
    /// Session expired; emitted instead of `Failed` on HTTP 401.
    LoggedOut,
    PendingStarted,
    PendingFinished,
    Changed {
        interface: Interface,
        change: Change,
    },
}

impl Event {
    /// Action tag for request-lifecycle events, e.g. `FIND_OTUS_SUCCEEDED`.
    pub fn tag(&self) -> Option<String> {
        match self {
            Event::Requested { intent } => Some(intent.kind().tag(Stage::Requested)),
            Event::Succeeded { kind, .. } => Some(kind.tag(Stage::Succeeded)),
            Event::Failed { kind, .. } => Some(kind.tag(Stage::Failed)),
            _ => None,
        }
    }
}
