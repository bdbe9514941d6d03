//! Per-key in-flight table.
//!
//! Concurrent callers asking for the same key share one `OnceCell`: the first
//! one runs the computation, the rest block on the cell and receive its value.
//! A failed computation leaves the cell empty, so a waiting caller retries
//! with its own closure.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

pub struct Inflight<T> {
    cells: DashMap<String, Arc<OnceCell<T>>>,
}

impl<T: Clone> Inflight<T> {
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    pub fn run<E>(&self, key: &str, compute: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let cell = self
            .cells
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        let result = cell.get_or_try_init(compute).cloned();

        // A later caller may already have installed a fresh cell; leave that one alone
        self.cells.remove_if(key, |_, current| Arc::ptr_eq(current, &cell));
        result
    }

    /// Keys with a computation currently running
    pub fn pending(&self) -> usize {
        self.cells.len()
    }
}

impl<T: Clone> Default for Inflight<T> {
    fn default() -> Self {
        Self::new()
    }
}
