//! # Emitter configuration.
//!
//! ## Sentinel values
//! - `max_listeners = 0` → unlimited (no leak warning)

/// Settings shared by an emitter and every combinator stage derived from it.
#[derive(Clone, Debug)]
pub struct Config {
    /// Listener count per kind above which a possible-leak warning is logged.
    ///
    /// Registration never fails because of this limit.
    pub max_listeners: usize,
}

impl Config {
    /// Returns the listener limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → warn once the `n + 1`-th listener is added for a kind
    #[inline]
    pub fn listener_limit(&self) -> Option<usize> {
        if self.max_listeners == 0 {
            None
        } else {
            Some(self.max_listeners)
        }
    }

    #[inline]
    pub fn unlimited() -> Self {
        Self { max_listeners: 0 }
    }
}

impl Default for Config {
    /// `max_listeners = 10`
    fn default() -> Self {
        Self { max_listeners: 10 }
    }
}
