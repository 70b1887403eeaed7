//! Which key the player is in, as far as we can tell.

use tracing::debug;

use crate::key::{Key, LikelyKey};

#[derive(Debug, Clone, Default)]
pub struct KeyTracker {
    guesses: Vec<LikelyKey>,
    chosen: Option<Key>,
    locked: bool,
}

impl KeyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores fresh guesses and, unless locked, follows the top one.
    ///
    /// An empty guess list leaves the chosen key alone.
    pub fn set_guesses(&mut self, guesses: Vec<LikelyKey>) -> Option<&Key> {
        if !self.locked {
            if let Some(top) = guesses.first() {
                let key = top.key();
                if self.chosen != Some(key) {
                    debug!(key = %key, score = top.score, "key changed");
                }
                self.chosen = Some(key);
            }
        }
        self.guesses = guesses;
        self.chosen.as_ref()
    }

    /// Picks a key by hand and stops following guesses.
    pub fn choose(&mut self, key: Key) {
        self.chosen = Some(key);
        self.locked = true;
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn chosen(&self) -> Option<&Key> {
        self.chosen.as_ref()
    }

    pub fn guesses(&self) -> &[LikelyKey] {
        &self.guesses
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
