//! Concurrent fan-out of independent reads.
//!
//! An [`Aggregation`] maps labels to zero-argument read operations. `run`
//! dispatches every operation as its own task before awaiting any of them
//! and joins the results by label. The first failure fails the whole
//! aggregation; the sibling tasks are detached, not aborted, and whatever
//! they produce is dropped. Reads are idempotent, so letting them finish
//! is harmless.

use std::collections::HashMap;
use std::future::Future;

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};

use crate::{
    error::{AppError, AppResult},
    models::EntityId,
    repository::{Collection, Document, Filter, FindOptions, SharedStore},
};

type ReadOp<T> = Box<dyn FnOnce() -> BoxFuture<'static, AppResult<T>> + Send>;

/// Labelled set of pending reads
pub struct Aggregation<T> {
    ops: Vec<(&'static str, ReadOp<T>)>,
}

impl<T: Send + 'static> Default for Aggregation<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Aggregation<T> {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn with<F, Fut>(mut self, label: &'static str, op: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        self.ops.push((label, Box::new(move || op().boxed())));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub async fn run(self) -> AppResult<Aggregated<T>> {
        let mut labels: Vec<&'static str> = self.ops.iter().map(|(label, _)| *label).collect();
        labels.sort_unstable();
        if let Some(pair) = labels.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(AppError::Internal(format!("duplicate aggregation label `{}`", pair[0])));
        }

        // Every operation is in flight before the first result is awaited
        let mut pending: FuturesUnordered<_> = self
            .ops
            .into_iter()
            .map(|(label, op)| {
                let handle = tokio::spawn(op());
                async move { (label, handle.await) }
            })
            .collect();

        let mut results = HashMap::with_capacity(pending.len());
        while let Some((label, joined)) = pending.next().await {
            let outcome = joined.map_err(|e| {
                AppError::Internal(format!("aggregated read `{}` did not complete: {}", label, e))
            })?;
            match outcome {
                Ok(value) => {
                    results.insert(label, value);
                }
                Err(err) => {
                    tracing::debug!(label, error = %err, "aggregation short-circuited");
                    return Err(err);
                }
            }
        }

        Ok(Aggregated { results })
    }
}

/// Results of a completed aggregation, addressed by label
#[derive(Debug)]
pub struct Aggregated<T> {
    results: HashMap<&'static str, T>,
}

impl<T> Aggregated<T> {
    pub fn take(&mut self, label: &str) -> AppResult<T> {
        self.results
            .remove(label)
            .ok_or_else(|| AppError::Internal(format!("no aggregated result labelled `{}`", label)))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Result of one store read inside an aggregation
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    One(Option<Document>),
    Many(Vec<Document>),
    Count(u64),
}

impl Fetched {
    pub fn into_one(self) -> AppResult<Option<Document>> {
        match self {
            Fetched::One(doc) => Ok(doc),
            other => Err(mismatch("single document", &other)),
        }
    }

    pub fn into_many(self) -> AppResult<Vec<Document>> {
        match self {
            Fetched::Many(docs) => Ok(docs),
            other => Err(mismatch("document list", &other)),
        }
    }

    pub fn into_count(self) -> AppResult<u64> {
        match self {
            Fetched::Count(n) => Ok(n),
            other => Err(mismatch("count", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &Fetched) -> AppError {
    AppError::Internal(format!("expected {} from aggregation, got {:?}", expected, got))
}

impl Aggregated<Fetched> {
    pub fn one(&mut self, label: &str) -> AppResult<Option<Document>> {
        self.take(label)?.into_one()
    }

    pub fn many(&mut self, label: &str) -> AppResult<Vec<Document>> {
        self.take(label)?.into_many()
    }

    pub fn count(&mut self, label: &str) -> AppResult<u64> {
        self.take(label)?.into_count()
    }
}

/// Fetch one document by id, applying `options` (expansions) to it
pub fn fetch_one(
    store: &SharedStore,
    collection: Collection,
    id: &EntityId,
    options: FindOptions,
) -> impl FnOnce() -> BoxFuture<'static, AppResult<Fetched>> + Send + 'static {
    let store = store.clone();
    let filter = Filter::by_id(id);
    move || {
        async move {
            let mut docs = store.find(collection, &filter, &options).await?;
            Ok(Fetched::One(if docs.is_empty() { None } else { Some(docs.swap_remove(0)) }))
        }
        .boxed()
    }
}

pub fn fetch_many(
    store: &SharedStore,
    collection: Collection,
    filter: Filter,
    options: FindOptions,
) -> impl FnOnce() -> BoxFuture<'static, AppResult<Fetched>> + Send + 'static {
    let store = store.clone();
    move || async move { store.find(collection, &filter, &options).await.map(Fetched::Many) }.boxed()
}

pub fn fetch_count(
    store: &SharedStore,
    collection: Collection,
    filter: Filter,
) -> impl FnOnce() -> BoxFuture<'static, AppResult<Fetched>> + Send + 'static {
    let store = store.clone();
    move || async move { store.count(collection, &filter).await.map(Fetched::Count) }.boxed()
}
