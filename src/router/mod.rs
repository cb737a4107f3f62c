//! Intent routing for incoming user messages.

mod intents;
mod semantic;

pub use intents::{default_intents, Intent, IntentAnchors};
pub use semantic::{RoutingDecision, SemanticRouter};
