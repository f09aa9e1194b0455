use std::fmt::Debug;

use crate::Actor;

/// A message an actor with state `S` can handle.
///
/// Handlers run one at a time on the actor's task and must not block.
/// Long-running work should be spawned, reporting back to the actor with
/// another message through the given handle.
pub trait Message<S>: Send + Debug + 'static {
    /// Handles the message with mutable access to the actor's state.
    fn handle(self, state: &mut S, handle: &Actor<S>);
}

/// Object-safe side of [`Message`], what the mailbox stores.
pub(crate) trait Deliver<S>: Send + Debug {
    fn deliver(self: Box<Self>, state: &mut S, handle: &Actor<S>);
}

impl<S, M: Message<S>> Deliver<S> for M {
    #[inline]
    fn deliver(self: Box<Self>, state: &mut S, handle: &Actor<S>) {
        (*self).handle(state, handle)
    }
}
