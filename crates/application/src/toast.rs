//! Transient notifications.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bookfinder_core::ToastKind;

pub const TOAST_TTL: Duration = Duration::from_secs(5);
const MAX_TOASTS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub expires_at: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct Toasts {
    items: VecDeque<Toast>,
    next_id: u64,
}

impl Toasts {
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) -> u64 {
        self.insert(kind, message.into(), Some(now + TOAST_TTL))
    }

    /// Stays until dismissed.
    pub fn push_sticky(&mut self, kind: ToastKind, message: impl Into<String>) -> u64 {
        self.insert(kind, message.into(), None)
    }

    fn insert(&mut self, kind: ToastKind, message: String, expires_at: Option<Instant>) -> u64 {
        self.next_id += 1;
        log::info!("toast[{}]: {message}", kind.as_str());
        self.items.push_back(Toast {
            id: self.next_id,
            kind,
            message,
            expires_at,
        });
        // Sticky toasts only leave through dismiss_latest.
        while self.items.len() > MAX_TOASTS {
            let Some(oldest) = self.items.iter().position(|t| t.expires_at.is_some()) else {
                break;
            };
            self.items.remove(oldest);
        }
        self.next_id
    }

    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.items.len();
        self.items
            .retain(|toast| toast.expires_at.is_none_or(|at| at > now));
        self.items.len() != before
    }

    pub fn dismiss_latest(&mut self) -> Option<Toast> {
        self.items.pop_back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&Toast> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
