//! Circular-update suppression.
//!
//! Each binding context owns one [`UpdateGuard`]. A direction is entered by
//! taking a token; while a token for one direction is live, entering the
//! opposite direction is refused, which breaks DOM ↔ view-model write
//! ping-pong. Dropping the token releases the guard unconditionally — also
//! when the guarded write turned out to be a value-unchanged no-op that the
//! reactive substrate swallowed.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// View-model change being painted into the DOM.
    Outbound,
    /// DOM change being written back into the view-model.
    Inbound,
}

#[derive(Clone)]
pub struct UpdateGuard {
    active: Rc<Cell<Option<Direction>>>,
}

impl UpdateGuard {
    pub fn new() -> Self {
        UpdateGuard {
            active: Rc::new(Cell::new(None)),
        }
    }

    /// Take a token for `direction`.
    ///
    /// Returns `None` when the opposite direction currently holds the
    /// guard. Re-entering the same direction yields a nested token that
    /// does not release the guard when dropped.
    pub fn enter(&self, direction: Direction) -> Option<GuardToken> {
        match self.active.get() {
            None => {
                self.active.set(Some(direction));
                Some(GuardToken {
                    slot: Rc::clone(&self.active),
                    releases: true,
                })
            }
            Some(active) if active == direction => Some(GuardToken {
                slot: Rc::clone(&self.active),
                releases: false,
            }),
            Some(_) => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active.get().is_none()
    }
}

impl Default for UpdateGuard {
    fn default() -> Self {
        UpdateGuard::new()
    }
}

pub struct GuardToken {
    slot: Rc<Cell<Option<Direction>>>,
    releases: bool,
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        if self.releases {
            self.slot.set(None);
        }
    }
}
