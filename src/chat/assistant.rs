use serde::Serialize;

use super::conversation::{ChatTurn, TurnContent};
use crate::core::config::settings::AssistantSettings;
use crate::core::errors::ApiError;
use crate::faq::FaqHandler;
use crate::router::{Intent, RoutingDecision, SemanticRouter};
use crate::sql::{SqlHandler, SqlOutcome, SqlStage};

pub const HUMAN_HANDOFF_REPLY: &str = "I'm connecting you to a live agent. Please stay online.";
pub const HELP_REPLY: &str = "I can help you find products or answer questions about returns and payments. What can I do for you?";
pub const SERVICE_UNAVAILABLE_REPLY: &str =
    "I'm having trouble reaching my assistant services right now. Please try again in a moment.";

/// One assistant answer plus how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    /// `None` when the query could not be routed at all.
    pub decision: Option<RoutingDecision>,
    pub turn: ChatTurn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_stage: Option<SqlStage>,
    /// Error kind when a hosted service failed and a canned reply was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

struct Dispatched {
    content: TurnContent,
    sql_stage: Option<SqlStage>,
}

impl Dispatched {
    fn text(text: impl Into<String>) -> Self {
        Self {
            content: TurnContent::text(text),
            sql_stage: None,
        }
    }
}

pub struct Assistant {
    router: SemanticRouter,
    faq: FaqHandler,
    sql: SqlHandler,
    greeting: String,
}

impl Assistant {
    pub fn new(
        router: SemanticRouter,
        faq: FaqHandler,
        sql: SqlHandler,
        settings: &AssistantSettings,
    ) -> Self {
        Self {
            router,
            faq,
            sql,
            greeting: format!(
                "Hello! I'm your {} assistant. How can I help you shop today?",
                settings.store_name
            ),
        }
    }

    pub fn faq(&self) -> &FaqHandler {
        &self.faq
    }

    pub fn sql(&self) -> &SqlHandler {
        &self.sql
    }

    /// Route a query and produce the assistant's turn. Never fails: hosted
    /// service errors become a polite reply and are logged.
    pub async fn respond(&self, query: &str) -> AssistantReply {
        let decision = match self.router.route(query).await {
            Ok(decision) => decision,
            Err(err) => return Self::service_failure(None, err),
        };

        match self.dispatch(decision.intent, query).await {
            Ok(dispatched) => AssistantReply {
                decision: Some(decision),
                turn: ChatTurn::assistant(dispatched.content),
                sql_stage: dispatched.sql_stage,
                error: None,
            },
            Err(err) => Self::service_failure(Some(decision), err),
        }
    }

    async fn dispatch(&self, intent: Intent, query: &str) -> Result<Dispatched, ApiError> {
        match intent {
            Intent::Faq => Ok(Dispatched::text(self.faq.answer(query).await?)),
            Intent::Sql => {
                let outcome = self.sql.run(query).await?;
                Ok(product_turn(outcome))
            }
            Intent::Chitchat => Ok(Dispatched::text(self.greeting.clone())),
            Intent::Human => Ok(Dispatched::text(HUMAN_HANDOFF_REPLY)),
            Intent::GeneralHelp | Intent::Fallback => Ok(Dispatched::text(HELP_REPLY)),
        }
    }

    fn service_failure(decision: Option<RoutingDecision>, err: ApiError) -> AssistantReply {
        tracing::error!(
            "Assistant could not answer (intent={}): {}",
            decision.map(|d| d.intent.as_str()).unwrap_or("unrouted"),
            err
        );
        AssistantReply {
            decision,
            turn: ChatTurn::assistant(TurnContent::text(SERVICE_UNAVAILABLE_REPLY)),
            sql_stage: None,
            error: Some(err.kind()),
        }
    }
}

fn product_turn(outcome: SqlOutcome) -> Dispatched {
    let sql_stage = Some(outcome.stage());
    let items = outcome.products();
    let summary = outcome.reply();

    let content = if items.is_empty() {
        TurnContent::text(summary)
    } else {
        TurnContent::Products { summary, items }
    };
    Dispatched { content, sql_stage }
}
