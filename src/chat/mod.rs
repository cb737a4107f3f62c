//! The conversational loop: route, dispatch, record, render.

mod assistant;
mod conversation;
pub mod render;

pub use assistant::{
    Assistant, AssistantReply, HELP_REPLY, HUMAN_HANDOFF_REPLY, SERVICE_UNAVAILABLE_REPLY,
};
pub use conversation::{ChatTurn, Conversation, Role, TurnContent};
