//! Connection lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransitState {
    Disconnected = 0,
    Connecting = 1,
    Subscribing = 2,
    Handshaking = 3,
    Connected = 4,
    Draining = 5,
}

impl TransitState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TransitState::Disconnected,
            1 => TransitState::Connecting,
            2 => TransitState::Subscribing,
            3 => TransitState::Handshaking,
            4 => TransitState::Connected,
            5 => TransitState::Draining,
            _ => unreachable!("invalid transit state byte"),
        }
    }
}

/// Lock-free holder for the current lifecycle state, readable from any
/// task without contending with the lifecycle controller that drives it.
#[derive(Debug)]
pub struct StateCell {
    inner: AtomicU8,
}

impl StateCell {
    pub fn new(initial: TransitState) -> Self {
        Self {
            inner: AtomicU8::new(initial as u8),
        }
    }

    pub fn get(&self) -> TransitState {
        TransitState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: TransitState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == TransitState::Connected
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(TransitState::Disconnected)
    }
}
