use serde::{Deserialize, Serialize};

/// Kind of request a user utterance is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Faq,
    Sql,
    Chitchat,
    Human,
    GeneralHelp,
    /// Routing result when no intent clears the threshold. Never anchored.
    Fallback,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Faq => "faq",
            Intent::Sql => "sql",
            Intent::Chitchat => "chitchat",
            Intent::Human => "human",
            Intent::GeneralHelp => "general_help",
            Intent::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intent together with the example utterances it is matched against.
#[derive(Debug, Clone)]
pub struct IntentAnchors {
    pub intent: Intent,
    pub utterances: Vec<String>,
}

impl IntentAnchors {
    pub fn new(intent: Intent, utterances: &[&str]) -> Self {
        Self {
            intent,
            utterances: utterances.iter().map(|u| u.to_string()).collect(),
        }
    }
}

/// The intent table registered at startup.
pub fn default_intents() -> Vec<IntentAnchors> {
    vec![
        IntentAnchors::new(
            Intent::Faq,
            &[
                "What is your policy on defective products?",
                "How do I return a damaged item?",
                "What is the return policy?",
                "How can I get a refund?",
                "Is there a warranty on this product?",
                "How do I track my order?",
                "Can I change my delivery address?",
                "What is the return policy of the products?",
                "Do I get discount with the HDFC credit card?",
                "How can I track my order?",
                "What payment methods are accepted?",
                "How long does it take to process a refund?",
                "Do you accept cash on delivery?",
                "What are the payment options?",
            ],
        ),
        IntentAnchors::new(
            Intent::Sql,
            &[
                "Pink Puma shoes in price range 5000 to 1000",
                "Show me Nike shoes under 3000.",
                "Search for cotton sarees for women.",
                "I want to buy running shoes.",
                "Are there any discounts on iPhones?",
                "Find formal shoes in size 9.",
                "I want to buy nike shoes that have 50% discount.",
                "Are there any shoes under Rs. 3000?",
                "Do you have formal shoes in size 9?",
                "Are there any Puma shoes on sale?",
                "What is the price of puma running shoes?",
            ],
        ),
        IntentAnchors::new(
            Intent::Chitchat,
            &[
                "Hey, how's it going?",
                "Hello!",
                "Hi, how are you today?",
                "Who are you?",
                "Good morning",
                "What's up?",
            ],
        ),
        IntentAnchors::new(
            Intent::Human,
            &[
                "I want to talk to a human",
                "connect me to an agent",
                "speak to a real person",
                "I need customer support help",
                "this bot isn't helping, give me a person",
            ],
        ),
        IntentAnchors::new(
            Intent::GeneralHelp,
            &[
                "What can you do?",
                "How do I use this bot?",
                "Help me with my shopping",
                "Tell me about Flipkart",
                "Give me some tips",
            ],
        ),
    ]
}
