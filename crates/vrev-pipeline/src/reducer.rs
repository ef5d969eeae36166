//! Result collection reducer.
//!
//! Every mutation of the collection is `previous + update -> next`.
//! Updates address items by id (or, for thumbnail backfill, by timestamp)
//! and carry the generation of the collection they were produced for. An
//! update from an older generation is stale and leaves the collection
//! untouched.

use std::fmt;
use vrev_models::{AnalysisRecord, ResultId, ResultItem};

/// Identity of the active collection. Bumped when the video changes and
/// when a batch run replaces the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A targeted change to the collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionUpdate {
    /// Replace everything (new batch run)
    ReplaceAll(Vec<ResultItem>),
    /// Insert at the front (ad-hoc capture)
    Prepend(ResultItem),
    /// Fill thumbnails of items whose timestamp matches exactly
    BackfillThumbnails(Vec<(f64, Vec<u8>)>),
    MarkReady { id: ResultId, record: AnalysisRecord },
    MarkFailed { id: ResultId, message: String },
}

/// An update tagged with the generation it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged {
    pub generation: Generation,
    pub update: CollectionUpdate,
}

impl Tagged {
    pub fn new(generation: Generation, update: CollectionUpdate) -> Self {
        Self { generation, update }
    }
}

/// What a successful reduction changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Reset,
    Added(ResultItem),
    Updated(Vec<ResultItem>),
}

/// Outcome of applying one update.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    Applied { items: Vec<ResultItem>, change: Change },
    /// Generation mismatch; discarded
    Stale,
    /// Nothing addressed by the update exists (e.g. the item was replaced)
    Unmatched,
}

/// Apply `tagged` to `items` if it targets `active`.
pub fn reduce(active: Generation, items: &[ResultItem], tagged: Tagged) -> Reduction {
    if tagged.generation != active {
        return Reduction::Stale;
    }
    apply(items, tagged.update)
}

/// Apply an update without the generation check.
pub fn apply(items: &[ResultItem], update: CollectionUpdate) -> Reduction {
    match update {
        CollectionUpdate::ReplaceAll(next) => Reduction::Applied {
            items: next,
            change: Change::Reset,
        },
        CollectionUpdate::Prepend(item) => {
            let mut next = Vec::with_capacity(items.len() + 1);
            next.push(item.clone());
            next.extend_from_slice(items);
            Reduction::Applied {
                items: next,
                change: Change::Added(item),
            }
        }
        CollectionUpdate::BackfillThumbnails(thumbnails) => {
            let mut changed = Vec::new();
            let next: Vec<ResultItem> = items
                .iter()
                .map(|item| {
                    match thumbnails.iter().find(|(t, _)| *t == item.timestamp) {
                        Some((_, png)) => {
                            let updated = item.with_thumbnail(png.clone());
                            changed.push(updated.clone());
                            updated
                        }
                        None => item.clone(),
                    }
                })
                .collect();
            if changed.is_empty() {
                Reduction::Unmatched
            } else {
                Reduction::Applied {
                    items: next,
                    change: Change::Updated(changed),
                }
            }
        }
        CollectionUpdate::MarkReady { id, record } => {
            update_one(items, &id, |item| item.ready(record))
        }
        CollectionUpdate::MarkFailed { id, message } => {
            update_one(items, &id, |item| item.failed(message))
        }
    }
}

fn update_one(
    items: &[ResultItem],
    id: &ResultId,
    f: impl FnOnce(&ResultItem) -> ResultItem,
) -> Reduction {
    let Some(index) = items.iter().position(|item| &item.id == id) else {
        return Reduction::Unmatched;
    };

    let mut next = items.to_vec();
    let updated = f(&items[index]);
    next[index] = updated.clone();
    Reduction::Applied {
        items: next,
        change: Change::Updated(vec![updated]),
    }
}
