//! Per-pass resolution state and the re-entrancy guard.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::proxy::IssuedStandIn;
use crate::registry::KeyMap;

// Injectors currently inside a top-level resolve on this thread
thread_local! {
    static ACTIVE_INJECTORS: RefCell<SmallVec<[usize; 4]>> = RefCell::new(SmallVec::new());
}

/// Marks an injector as resolving on the current thread until dropped.
pub(crate) struct ActiveGuard {
    injector: usize,
}

impl ActiveGuard {
    /// Fails with `ReentrantResolution` when `injector` is already resolving on this thread.
    pub(crate) fn enter(injector: usize, key: &Key) -> DiResult<Self> {
        ACTIVE_INJECTORS.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&injector) {
                return Err(DiError::ReentrantResolution(key.display_name()));
            }
            active.push(injector);
            Ok(Self { injector })
        })
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE_INJECTORS.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|&id| id == self.injector) {
                active.remove(pos);
            }
        });
    }
}

/// Lock set, issued stand-ins and depth for one top-level resolve.
///
/// Everything here is cleared by [`reset`](ResolutionState::reset) once the
/// outermost resolve finishes, whatever its outcome.
pub(crate) struct ResolutionState {
    locked: SmallVec<[Key; 8]>,
    stand_ins: KeyMap<IssuedStandIn>,
    depth: usize,
    max_depth: usize,
}

impl ResolutionState {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            locked: SmallVec::new(),
            stand_ins: KeyMap::default(),
            depth: 0,
            max_depth,
        }
    }

    #[inline]
    pub(crate) fn is_locked(&self, key: &Key) -> bool {
        self.locked.contains(key)
    }

    pub(crate) fn lock(&mut self, key: Key) {
        self.locked.push(key);
    }

    pub(crate) fn unlock(&mut self, key: &Key) {
        if let Some(pos) = self.locked.iter().rposition(|locked| locked == key) {
            self.locked.remove(pos);
        }
    }

    /// Locked types in lock order, closed by `key`.
    pub(crate) fn path_to(&self, key: Key) -> Vec<&'static str> {
        self.locked
            .iter()
            .map(Key::display_name)
            .chain(std::iter::once(key.display_name()))
            .collect()
    }

    /// Enters one level of recursion.
    pub(crate) fn descend(&mut self) -> DiResult<()> {
        if self.depth >= self.max_depth {
            return Err(DiError::DepthExceeded(self.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn issued(&self, key: &Key) -> Option<&IssuedStandIn> {
        self.stand_ins.get(key)
    }

    pub(crate) fn record_stand_in(&mut self, key: Key, stand_in: IssuedStandIn) {
        self.stand_ins.insert(key, stand_in);
    }

    /// Removes the stand-in issued for `key`, if any, so it can be bound.
    pub(crate) fn take_stand_in(&mut self, key: &Key) -> Option<IssuedStandIn> {
        self.stand_ins.remove(key)
    }

    pub(crate) fn is_clear(&self) -> bool {
        self.locked.is_empty() && self.stand_ins.is_empty() && self.depth == 0
    }

    pub(crate) fn reset(&mut self) {
        if !self.is_clear() {
            tracing::trace!(
                locked = self.locked.len(),
                stand_ins = self.stand_ins.len(),
                "clearing resolution state"
            );
        }
        self.locked.clear();
        self.stand_ins.clear();
        self.depth = 0;
    }
}
