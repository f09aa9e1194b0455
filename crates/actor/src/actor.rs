use std::error::Error;
use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::Message;
use crate::message::Deliver;

type Envelope<S> = Box<dyn Deliver<S>>;

/// Returned when sending to an actor whose task has already ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorDeadError {
    label: Option<Arc<str>>,
}

impl ActorDeadError {
    /// Returns the label the actor was spawned with.
    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl fmt::Display for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "actor `{label}` is no longer running"),
            None => f.write_str("the actor is no longer running"),
        }
    }
}

impl Error for ActorDeadError {}

struct Inbox<S> {
    tx: mpsc::UnboundedSender<Envelope<S>>,
    label: Option<Arc<str>>,
}

/// Handle to an actor.
///
/// The actor keeps running as long as at least one handle is alive.
/// Messages still queued when the last handle goes away are dropped
/// unhandled.
pub struct Actor<S> {
    inbox: Arc<Inbox<S>>,
}

impl<S: Send + Sync + 'static> Actor<S> {
    /// Spawns a new actor on the current tokio runtime.
    ///
    /// Prefer the wrapper generated by [`crate::define_actor`] over calling
    /// this directly. `label` shows up in the actor's tracing span and in
    /// [`ActorDeadError`].
    pub fn spawn(state: S, label: Option<&str>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let inbox = Arc::new(Inbox {
            tx,
            label: label.map(Arc::from),
        });
        let span = debug_span!("actor", label = label);
        tokio::spawn(drive(Arc::downgrade(&inbox), state, rx).instrument(span));
        Self { inbox }
    }

    /// Sends a message to the actor.
    ///
    /// Delivery is asynchronous: this never waits for the message to be
    /// handled.
    #[inline]
    pub fn send<M: Message<S> + 'static>(
        &self,
        msg: M,
    ) -> Result<(), ActorDeadError> {
        self.inbox.tx.send(Box::new(msg)).map_err(|_| ActorDeadError {
            label: self.inbox.label.clone(),
        })
    }

    /// Returns the label the actor was spawned with.
    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.inbox.label.as_deref()
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            inbox: Arc::clone(&self.inbox),
        }
    }
}

async fn drive<S: Send + Sync + 'static>(
    inbox: Weak<Inbox<S>>,
    mut state: S,
    mut rx: mpsc::UnboundedReceiver<Envelope<S>>,
) {
    debug!("started");
    while let Some(msg) = rx.recv().await {
        // Handlers get a fresh handle, so the actor can message itself.
        let Some(inbox) = inbox.upgrade() else {
            debug!("no handles left, dropping queued messages");
            break;
        };
        trace!("handling {msg:?}");
        let handle = Actor { inbox };
        trace_span!("handle").in_scope(|| msg.deliver(&mut state, &handle));
    }
    debug!("stopped");
}
