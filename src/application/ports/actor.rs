// src/application/ports/actor.rs

pub trait ActorResolver: Send + Sync {
    /// `None` for unauthenticated or system actions.
    fn current_acting_user_id(&self) -> Option<String>;
}

/// Actor known up front, e.g. taken from a trusted request header.
#[derive(Debug, Clone, Default)]
pub struct FixedActor(pub Option<String>);

impl ActorResolver for FixedActor {
    fn current_acting_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}
