//! Paginated document collections and the pure functions that reconcile them
//! with page fetches and server change notifications.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{Document, DocumentId},
    protocol::Page,
};

mod store;

pub use store::{RequestFailure, Store};

/// A client-side cache of one list endpoint.
///
/// `documents` is `None` until the first page arrives; update and remove
/// notifications received before then are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub documents: Option<Vec<Document>>,
    pub page: u32,
    pub page_count: u32,
    pub per_page: Option<u32>,
    pub found_count: Option<u64>,
    pub total_count: Option<u64>,
}

impl Collection {
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Some(documents),
            ..Self::default()
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.documents.is_some()
    }

    pub fn len(&self) -> usize {
        self.documents.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.documents
            .as_ref()
            .and_then(|documents| documents.iter().find(|doc| &doc.id == id))
    }

    pub fn ids(&self) -> Vec<DocumentId> {
        self.documents
            .iter()
            .flatten()
            .map(|doc| doc.id.clone())
            .collect()
    }

    pub fn has_more_pages(&self) -> bool {
        self.page < self.page_count
    }
}

/// Folds a fetched page into `collection`.
///
/// Page 1 replaces every held document. Later pages merge by id: a known id
/// is replaced in place, an unknown id is appended.
pub fn replace_page(collection: &Collection, incoming: Page) -> Collection {
    let existing = if incoming.page == 1 {
        Vec::new()
    } else {
        collection.documents.clone().unwrap_or_default()
    };

    Collection {
        documents: Some(merge_by_id(existing, incoming.documents)),
        page: incoming.page,
        page_count: incoming.page_count,
        per_page: incoming.per_page.or(collection.per_page),
        found_count: incoming.found_count.or(collection.found_count),
        total_count: incoming.total_count.or(collection.total_count),
    }
}

/// Adds `document` (replacing any entry with the same id), then stable-sorts
/// the whole sequence by `sort_key`, descending when `reverse` is set.
pub fn insert(
    collection: &Collection,
    document: Document,
    sort_key: &str,
    reverse: bool,
) -> Collection {
    let existing = collection.documents.clone().unwrap_or_default();
    let mut documents = merge_by_id(existing, vec![document]);
    documents.sort_by(|a, b| a.cmp_by_key(b, sort_key));
    if reverse {
        documents.reverse();
    }

    Collection {
        documents: Some(documents),
        ..collection.clone()
    }
}

/// Replaces the document whose id matches `document.id`. Unknown ids and
/// unfetched collections are left untouched.
pub fn update(collection: &Collection, document: Document) -> Collection {
    let Some(existing) = &collection.documents else {
        return collection.clone();
    };

    let documents = existing
        .iter()
        .map(|doc| {
            if doc.id == document.id {
                document.clone()
            } else {
                doc.clone()
            }
        })
        .collect();

    Collection {
        documents: Some(documents),
        ..collection.clone()
    }
}

/// Drops every document whose id is in `ids`, keeping the order of the rest.
pub fn remove(collection: &Collection, ids: &[DocumentId]) -> Collection {
    let Some(existing) = &collection.documents else {
        return collection.clone();
    };

    let ids: HashSet<&DocumentId> = ids.iter().collect();
    let documents = existing
        .iter()
        .filter(|doc| !ids.contains(&doc.id))
        .cloned()
        .collect();

    Collection {
        documents: Some(documents),
        ..collection.clone()
    }
}

fn merge_by_id(existing: Vec<Document>, incoming: Vec<Document>) -> Vec<Document> {
    let mut positions: HashMap<DocumentId, usize> = HashMap::with_capacity(existing.len());
    let mut merged: Vec<Document> = Vec::with_capacity(existing.len() + incoming.len());

    for doc in existing.into_iter().chain(incoming) {
        match positions.get(&doc.id) {
            Some(&index) => merged[index] = doc,
            None => {
                positions.insert(doc.id.clone(), merged.len());
                merged.push(doc);
            }
        }
    }

    merged
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
