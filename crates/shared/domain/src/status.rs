//! Manager lifecycle and the signal emission policy derived from it.

/// Lifecycle of the manager; only [`ManagerStatus::Running`] is externally reachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ManagerStatus {
    #[default]
    Starting,
    Running,
    Stopping,
}

impl ManagerStatus {
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

/// What a mutation should do with its change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionPolicy {
    /// Emit the notification now.
    Immediate,
    /// Do not emit; the caller publishes an aggregate notification afterwards.
    Deferred,
    /// Do not emit at all; the service is not reachable yet.
    Suppressed,
}

impl EmissionPolicy {
    /// Policy for in-place updates: immediate once running, suppressed before.
    #[must_use]
    pub const fn for_status(status: ManagerStatus) -> Self {
        if status.is_running() { Self::Immediate } else { Self::Suppressed }
    }

    #[must_use]
    pub const fn emits(self) -> bool {
        matches!(self, Self::Immediate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_running_emits() {
        assert!(EmissionPolicy::for_status(ManagerStatus::Running).emits());
        assert_eq!(
            EmissionPolicy::for_status(ManagerStatus::Starting),
            EmissionPolicy::Suppressed
        );
        assert!(!EmissionPolicy::for_status(ManagerStatus::Stopping).emits());
        assert!(!EmissionPolicy::Deferred.emits());
    }
}
