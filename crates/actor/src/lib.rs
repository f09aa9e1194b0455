//! A minimal actor runtime on top of tokio.
//!
//! An actor owns its state exclusively and mutates it only while handling
//! messages, one message at a time. Async work is spawned as separate
//! tasks that report back with more messages.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod actor;
mod macros;
mod message;

pub use actor::{Actor, ActorDeadError};
pub use message::Message;

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    define_actor! {
        /// Collects lines in arrival order.
        #[wrapper_type(Transcript)]
        #[derive(Default)]
        struct TranscriptState {
            lines: Vec<String>,
        }
    }

    #[derive(Debug)]
    struct Append(&'static str);

    impl Message<TranscriptState> for Append {
        fn handle(
            self,
            state: &mut TranscriptState,
            _handle: &Actor<TranscriptState>,
        ) {
            state.lines.push(self.0.to_owned());
        }
    }

    #[derive(Debug)]
    struct AppendLater(&'static str);

    impl Message<TranscriptState> for AppendLater {
        fn handle(
            self,
            _state: &mut TranscriptState,
            handle: &Actor<TranscriptState>,
        ) {
            // Messages sent from a handler are queued behind the current one.
            handle.send(Append(self.0)).unwrap();
        }
    }

    #[derive(Debug)]
    struct Snapshot(oneshot::Sender<Vec<String>>);

    impl Message<TranscriptState> for Snapshot {
        fn handle(
            self,
            state: &mut TranscriptState,
            _handle: &Actor<TranscriptState>,
        ) {
            self.0.send(state.lines.clone()).unwrap();
        }
    }

    #[tokio::test]
    async fn test_messages_are_handled_in_order() {
        let actor = Transcript::spawn(TranscriptState::default(), None);
        actor.handle().send(Append("hello")).unwrap();
        actor.handle().send(AppendLater("later")).unwrap();
        actor.handle().send(Append("world")).unwrap();

        let (tx, rx) = oneshot::channel();
        actor.handle().send(Snapshot(tx)).unwrap();
        assert_eq!(rx.await.unwrap(), vec!["hello", "world"]);

        let (tx, rx) = oneshot::channel();
        actor.handle().send(Snapshot(tx)).unwrap();
        assert_eq!(rx.await.unwrap(), vec!["hello", "world", "later"]);
    }

    #[derive(Debug)]
    struct Crash;

    impl Message<TranscriptState> for Crash {
        fn handle(
            self,
            _state: &mut TranscriptState,
            _handle: &Actor<TranscriptState>,
        ) {
            panic!("crash requested");
        }
    }

    #[tokio::test]
    async fn test_send_to_dead_actor() {
        let actor =
            Transcript::spawn(TranscriptState::default(), Some("transcript"));
        assert_eq!(actor.handle().label(), Some("transcript"));
        actor.handle().send(Crash).unwrap();

        let mut result = Ok(());
        for _ in 0..100 {
            tokio::task::yield_now().await;
            result = actor.handle().send(Append("late"));
            if result.is_err() {
                break;
            }
        }
        let err = result.unwrap_err();
        assert_eq!(err.label(), Some("transcript"));
        assert_eq!(err.to_string(), "actor `transcript` is no longer running");
    }
}
