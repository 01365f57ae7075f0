pub mod conversation;
pub mod message;

pub(crate) use conversation::ConversationRecord;
pub(crate) use message::MessageRecord;
