//! Conversation-related types.

use mcp_chat_model::{ModelMessage, Role};

/// An ordered conversation history.
///
/// The history never contains the system instructions, they are attached to
/// every model request by the agent instead.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    items: Vec<Item>,
}

impl Conversation {
    /// Creates an empty conversation.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the items in this conversation, oldest first.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the conversation has no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends an item.
    #[inline]
    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub(crate) fn messages(&self) -> impl Iterator<Item = &ModelMessage> {
        self.items.iter().map(|item| &item.msg)
    }
}

/// An item in the conversation.
#[derive(Clone, Debug)]
pub struct Item {
    msg: ModelMessage,
    transcript: String,
}

impl Item {
    /// Creates an item from a message and its transcript.
    #[inline]
    pub fn new<S: Into<String>>(msg: ModelMessage, transcript: S) -> Self {
        Self {
            msg,
            transcript: transcript.into(),
        }
    }

    /// Creates a user input item.
    #[inline]
    pub fn user<S: Into<String>>(input: S) -> Self {
        let input = input.into();
        Self::new(ModelMessage::User(input.clone()), input)
    }

    /// Returns who authored this item.
    #[inline]
    pub fn role(&self) -> Role {
        self.msg.role()
    }

    /// Returns the transcript of this item.
    ///
    /// The transcript is a string representation of the message item,
    /// which can be exported later. But transcript alone is not enough
    /// to reconstruct the message item.
    #[inline]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Returns the underlying model message.
    #[inline]
    pub fn message(&self) -> &ModelMessage {
        &self.msg
    }
}
