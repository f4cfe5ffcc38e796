//! Lazy type filter over heterogeneous node outputs

use std::marker::PhantomData;

use super::adapter::HotSwapAdapter;
use super::value::{HotSwapState, NodeData};

/// Iterator over the items of a slice that adapt to `T`
///
/// Finite and restartable: cloning yields an independent cursor, and
/// [`restart`](Self::restart) rewinds to the first item.
pub struct FilterByType<'a, T> {
    adapter: &'a HotSwapAdapter,
    items: &'a [NodeData],
    position: usize,
    _target: PhantomData<fn() -> T>,
}

impl<'a, T: HotSwapState> FilterByType<'a, T> {
    pub(crate) fn new(adapter: &'a HotSwapAdapter, items: &'a [NodeData]) -> Self {
        Self {
            adapter,
            items,
            position: 0,
            _target: PhantomData,
        }
    }

    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl<T> Clone for FilterByType<'_, T> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter,
            items: self.items,
            position: self.position,
            _target: PhantomData,
        }
    }
}

impl<T: HotSwapState> Iterator for FilterByType<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        while let Some(item) = self.items.get(self.position) {
            self.position += 1;
            if let Some(value) = self.adapter.try_cast::<T>(item) {
                return Some(value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.items.len() - self.position))
    }
}
