//! Nearest-anchor intent classification.
//!
//! Every anchor utterance is embedded once when the router is built. A query
//! is embedded, scored against all anchors, the best `top_k` anchors are
//! grouped by intent and aggregated, and the winning intent is accepted only
//! when its score is strictly above the threshold.

use std::cmp::Ordering;

use serde::Serialize;

use super::intents::{Intent, IntentAnchors};
use crate::core::config::settings::RouterSettings;
use crate::core::config::Aggregation;
use crate::core::errors::ApiError;
use crate::llm::LlmService;
use crate::vector_math::cosine_or_zero;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub intent: Intent,
    pub score: f32,
    pub threshold: f32,
}

impl RoutingDecision {
    pub fn is_fallback(&self) -> bool {
        self.intent == Intent::Fallback
    }
}

struct Anchor {
    intent: Intent,
    embedding: Vec<f32>,
}

pub struct SemanticRouter {
    llm: LlmService,
    anchors: Vec<Anchor>,
    /// Registration order, used to break score ties deterministically.
    intent_order: Vec<Intent>,
    threshold: f32,
    top_k: usize,
    aggregation: Aggregation,
}

impl SemanticRouter {
    pub async fn build(
        intents: Vec<IntentAnchors>,
        llm: LlmService,
        settings: &RouterSettings,
    ) -> Result<Self, ApiError> {
        let mut labels = Vec::new();
        let mut utterances = Vec::new();
        let mut intent_order = Vec::new();

        for entry in intents {
            if entry.intent == Intent::Fallback {
                return Err(ApiError::BadRequest(
                    "the fallback intent cannot have anchors".to_string(),
                ));
            }
            if !intent_order.contains(&entry.intent) {
                intent_order.push(entry.intent);
            }
            for utterance in entry.utterances {
                labels.push(entry.intent);
                utterances.push(utterance);
            }
        }

        let embeddings = llm.embed(&utterances).await?;
        let anchors = labels
            .into_iter()
            .zip(embeddings)
            .map(|(intent, embedding)| Anchor { intent, embedding })
            .collect::<Vec<_>>();

        tracing::info!(
            "Router synced {} anchors across {} intents (threshold {})",
            anchors.len(),
            intent_order.len(),
            settings.threshold
        );

        Ok(Self {
            llm,
            anchors,
            intent_order,
            threshold: settings.threshold,
            top_k: settings.top_k.max(1),
            aggregation: settings.aggregation,
        })
    }

    pub async fn route(&self, query: &str) -> Result<RoutingDecision, ApiError> {
        let embedding = self.llm.embed_one(query).await?;
        let decision = self.classify(&embedding);
        tracing::info!(
            "Router: intent={} score={:.3} threshold={}",
            decision.intent,
            decision.score,
            decision.threshold
        );
        Ok(decision)
    }

    /// Pure classification of an already-embedded query.
    pub fn classify(&self, query_embedding: &[f32]) -> RoutingDecision {
        let mut scored: Vec<(Intent, f32)> = self
            .anchors
            .iter()
            .map(|anchor| (anchor.intent, cosine_or_zero(query_embedding, &anchor.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(self.top_k);

        let mut best: Option<(Intent, f32)> = None;
        for intent in &self.intent_order {
            let scores: Vec<f32> = scored
                .iter()
                .filter(|(candidate, _)| candidate == intent)
                .map(|(_, score)| *score)
                .collect();
            if scores.is_empty() {
                continue;
            }
            let aggregate = aggregate(self.aggregation, &scores);
            if best.map_or(true, |(_, current)| aggregate > current) {
                best = Some((*intent, aggregate));
            }
        }

        match best {
            Some((intent, score)) if score > self.threshold => RoutingDecision {
                intent,
                score,
                threshold: self.threshold,
            },
            Some((_, score)) => RoutingDecision {
                intent: Intent::Fallback,
                score,
                threshold: self.threshold,
            },
            None => RoutingDecision {
                intent: Intent::Fallback,
                score: 0.0,
                threshold: self.threshold,
            },
        }
    }
}

fn aggregate(method: Aggregation, scores: &[f32]) -> f32 {
    match method {
        Aggregation::Mean => scores.iter().sum::<f32>() / scores.len() as f32,
        Aggregation::Max => scores.iter().copied().fold(f32::MIN, f32::max),
        Aggregation::Sum => scores.iter().sum(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::router::intents::default_intents;
    use crate::test_support::{fake_llm, hash_embedding, FakeProvider};

    async fn router_with(intents: Vec<IntentAnchors>, settings: RouterSettings) -> SemanticRouter {
        let llm = fake_llm(Arc::new(FakeProvider::new()));
        SemanticRouter::build(intents, llm, &settings).await.unwrap()
    }

    #[tokio::test]
    async fn exact_anchor_routes_to_its_intent() {
        let router = router_with(default_intents(), RouterSettings::default()).await;

        let decision = router.route("What is the return policy?").await.unwrap();
        assert_eq!(decision.intent, Intent::Faq);
        assert!(decision.score > 0.4);

        let decision = router.route("connect me to an agent").await.unwrap();
        assert_eq!(decision.intent, Intent::Human);
    }

    #[tokio::test]
    async fn unrelated_query_falls_back() {
        let router = router_with(default_intents(), RouterSettings::default()).await;

        let decision = router.route("zxqv plorb").await.unwrap();
        assert_eq!(decision.intent, Intent::Fallback);
        assert!(decision.score <= 0.4);
        assert!((decision.threshold - 0.4).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn score_equal_to_threshold_is_not_enough() {
        let settings = RouterSettings {
            threshold: 0.5,
            top_k: 1,
            aggregation: Aggregation::Max,
        };
        let router = router_with(
            vec![IntentAnchors::new(Intent::Chitchat, &["hello there"])],
            settings,
        )
        .await;

        // One of two words shared: cosine exactly 0.5.
        let decision = router.classify(&hash_embedding("hello friend"));
        assert!((decision.score - 0.5).abs() < 1e-5);
        assert!(decision.is_fallback());
    }

    #[tokio::test]
    async fn aggregation_is_limited_to_top_k_anchors() {
        let intents = vec![
            IntentAnchors::new(Intent::Sql, &["nike shoes", "red shirt", "blue jeans"]),
            IntentAnchors::new(Intent::Faq, &["nike shoes refund"]),
        ];
        let query = hash_embedding("nike shoes");

        let mean = router_with(
            intents.clone(),
            RouterSettings {
                threshold: 0.4,
                top_k: 5,
                aggregation: Aggregation::Mean,
            },
        )
        .await;
        // Mean over every sql anchor is diluted by the unrelated ones.
        assert_eq!(mean.classify(&query).intent, Intent::Faq);

        let narrow = router_with(
            intents,
            RouterSettings {
                threshold: 0.4,
                top_k: 1,
                aggregation: Aggregation::Mean,
            },
        )
        .await;
        assert_eq!(narrow.classify(&query).intent, Intent::Sql);
    }

    #[tokio::test]
    async fn fallback_anchors_are_rejected() {
        let llm = fake_llm(Arc::new(FakeProvider::new()));
        let result = SemanticRouter::build(
            vec![IntentAnchors::new(Intent::Fallback, &["anything"])],
            llm,
            &RouterSettings::default(),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn aggregate_modes() {
        assert!((aggregate(Aggregation::Mean, &[0.2, 0.6]) - 0.4).abs() < 1e-6);
        assert!((aggregate(Aggregation::Max, &[0.2, 0.6]) - 0.6).abs() < 1e-6);
        assert!((aggregate(Aggregation::Sum, &[0.2, 0.6]) - 0.8).abs() < 1e-6);
    }
}
