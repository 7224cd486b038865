// Synthesis client: prompt, model call, and tolerant parsing into a fixed
// result schema. Callers always get a structurally valid result.

pub mod prompt;
pub mod schema;

use std::sync::Arc;
use tracing::{error, info, warn};

use gridpulse_core::config::LlmConfig;
use gridpulse_llm::{GenerationRequest, GenerativeModel, JsonExtractor};

use crate::context::PlayerContext;
use crate::enhancement::EnhancedPlayer;

pub use schema::{ComparisonResult, Conviction, Recommendation, RiskLevel, SynthesisResult, Winner};

pub struct SynthesisClient {
    model: Arc<dyn GenerativeModel>,
    extractor: JsonExtractor,
    config: LlmConfig,
}

impl SynthesisClient {
    pub fn new(model: Arc<dyn GenerativeModel>, config: LlmConfig) -> Self {
        Self {
            model,
            extractor: JsonExtractor::default(),
            config,
        }
    }

    /// Replace the default extraction pipeline.
    pub fn with_extractor(mut self, extractor: JsonExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Start/sit recommendation for one player.
    pub async fn synthesize(
        &self,
        player: &EnhancedPlayer,
        context: &PlayerContext,
        season: u32,
    ) -> SynthesisResult {
        let name = &player.player.name;
        let prompt = prompt::build_synthesis_prompt(player, context, season);
        info!(player = %name, "requesting synthesis");

        let text = match self.generate(prompt).await {
            Ok(text) => text,
            Err(cause) => {
                error!(player = %name, "synthesis model call failed: {cause}");
                return SynthesisResult::model_failure(&cause);
            }
        };

        match self.extractor.extract(&text) {
            Some(extraction) => {
                let result = SynthesisResult::from_value(&extraction.value);
                info!(
                    player = %name,
                    strategy = extraction.strategy,
                    recommendation = ?result.recommendation,
                    "synthesis complete"
                );
                result
            }
            None => {
                warn!(player = %name, response = %text, "synthesis response was not parseable");
                SynthesisResult::parse_failure()
            }
        }
    }

    /// Head-to-head comparison of two players.
    pub async fn compare(
        &self,
        player_a: &EnhancedPlayer,
        context_a: &PlayerContext,
        player_b: &EnhancedPlayer,
        context_b: &PlayerContext,
        season: u32,
    ) -> ComparisonResult {
        let prompt =
            prompt::build_comparison_prompt(player_a, context_a, player_b, context_b, season);
        info!(
            player_a = %player_a.player.name,
            player_b = %player_b.player.name,
            "requesting comparison"
        );

        let text = match self.generate(prompt).await {
            Ok(text) => text,
            Err(cause) => {
                error!("comparison model call failed: {cause}");
                return ComparisonResult::model_failure(&cause);
            }
        };

        match self.extractor.extract(&text) {
            Some(extraction) => {
                let result = ComparisonResult::from_value(&extraction.value);
                info!(
                    strategy = extraction.strategy,
                    winner = ?result.winner,
                    "comparison complete"
                );
                result
            }
            None => {
                warn!(response = %text, "comparison response was not parseable");
                ComparisonResult::parse_failure()
            }
        }
    }

    async fn generate(&self, prompt: String) -> Result<String, String> {
        let request = GenerationRequest::from_config(prompt, &self.config);
        self.model.generate(&request).await.map_err(|e| e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
