use crate::error::Result;
use crate::recommend::{Recommendation, Recommender};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared, swappable reference to the live recommender. Readers take an `Arc` snapshot, so a
/// rebuild swapped in mid-query is never observed half-built.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<RwLock<Arc<Recommender>>>,
}

impl ModelHandle {
    pub fn new(recommender: Recommender) -> Self { Self { inner: Arc::new(RwLock::new(Arc::new(recommender))) } }

    pub fn current(&self) -> Arc<Recommender> { self.inner.read().clone() }

    /// Install a fully built recommender, returning the one it replaces.
    pub fn swap(&self, recommender: Recommender) -> Arc<Recommender> {
        let next = Arc::new(recommender);
        std::mem::replace(&mut *self.inner.write(), next)
    }

    pub fn recommend(&self, title: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        self.current().recommend(title, top_n)
    }
}
