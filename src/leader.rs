//! Leadership gating for the publisher.
//!
//! Leader election itself happens elsewhere; the pipeline only asks whether a
//! previously issued token is still valid. Validity can change concurrently
//! with an in-flight publish call, which is an accepted race: the bus layer
//! guarantees at-least-once delivery, not leader-exclusive delivery.

use uuid::Uuid;

/// Opaque capability proving (at issuance time) that the holder was the
/// active leader replica. Never mutated by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaderToken(Uuid);

impl LeaderToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for LeaderToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates leader tokens on behalf of the publisher.
pub trait LeaderController: Send + Sync {
    fn validate_token(&self, token: &LeaderToken) -> bool;
}

/// Controller for single-replica deployments: the sole replica is always the
/// leader, holding one token that never rotates.
pub struct StandaloneLeaderController {
    token: LeaderToken,
}

impl StandaloneLeaderController {
    pub fn new() -> Self {
        Self {
            token: LeaderToken::new(),
        }
    }

    pub fn token(&self) -> LeaderToken {
        self.token
    }
}

impl Default for StandaloneLeaderController {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaderController for StandaloneLeaderController {
    fn validate_token(&self, token: &LeaderToken) -> bool {
        *token == self.token
    }
}
