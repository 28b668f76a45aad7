//! Service lifecycle.

/// Operational state of a [`crate::Bank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankState {
    /// Accepting requests.
    Running,
    /// Refusing new requests; in-flight ones finish.
    ShuttingDown,
}

impl BankState {
    pub fn accepts_requests(&self) -> bool {
        matches!(self, BankState::Running)
    }
}
