//! Readiness subscriptions per direction.

use crate::transport::poll::Interest;

/// Subscription state of one direction.
///
/// Transitions are idempotent: enabling an enabled notifier or disabling an
/// absent one does nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum NotifierState {
    /// No descriptor yet, or the engine closed.
    #[default]
    Absent,
    Disabled,
    Enabled,
}

impl NotifierState {
    pub(crate) fn enable(&mut self) {
        if *self == Self::Disabled {
            *self = Self::Enabled;
        }
    }

    pub(crate) fn disable(&mut self) {
        if *self == Self::Enabled {
            *self = Self::Disabled;
        }
    }

    pub(crate) fn remove(&mut self) {
        *self = Self::Absent;
    }

    #[inline]
    pub(crate) fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

/// The read, write and exception notifiers of one engine.
#[derive(Debug, Default)]
pub(crate) struct Notifiers {
    pub read: NotifierState,
    pub write: NotifierState,
    pub exception: NotifierState,
}

impl Notifiers {
    /// Create all three notifiers, enabled. Called once a descriptor exists.
    pub(crate) fn create(&mut self) {
        self.read = NotifierState::Enabled;
        self.write = NotifierState::Enabled;
        self.exception = NotifierState::Enabled;
    }

    pub(crate) fn remove_all(&mut self) {
        self.read.remove();
        self.write.remove();
        self.exception.remove();
    }

    /// What the reactor should poll for.
    pub(crate) fn interest(&self) -> Interest {
        Interest {
            read: self.read.is_enabled(),
            write: self.write.is_enabled(),
            exception: self.exception.is_enabled(),
        }
    }
}
