//! Model pricing registry.
//!
//! Costs are in nanodollars (1e-9 USD) per token. Used to compute the
//! `cost_nanodollars` field on responses when the provider does not report
//! cost itself. Verify periodically against OpenRouter model pages.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Pricing information for a model.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    /// Cost per input token in nanodollars.
    pub input_nanos_per_token: i64,
    /// Cost per output token in nanodollars.
    pub output_nanos_per_token: i64,
}

impl ModelPricing {
    const fn new(input: i64, output: i64) -> Self {
        Self {
            input_nanos_per_token: input,
            output_nanos_per_token: output,
        }
    }

    /// Calculate cost for a request.
    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> i64 {
        (input_tokens as i64) * self.input_nanos_per_token
            + (output_tokens as i64) * self.output_nanos_per_token
    }
}

// Claude 3.5 Haiku: $0.80/1M input, $4.00/1M output
const CLAUDE_35_HAIKU: ModelPricing = ModelPricing::new(800, 4_000);
// Claude Sonnet 4.5: $3.00/1M input, $15.00/1M output
const CLAUDE_SONNET_45: ModelPricing = ModelPricing::new(3_000, 15_000);
// GPT-4o-mini: $0.15/1M input, $0.60/1M output
const GPT_4O_MINI: ModelPricing = ModelPricing::new(150, 600);
// GPT-5-mini: $0.25/1M input, $2.00/1M output
const GPT_5_MINI: ModelPricing = ModelPricing::new(250, 2_000);
// Gemini 2.5 Flash: $0.30/1M input, $2.50/1M output
const GEMINI_25_FLASH: ModelPricing = ModelPricing::new(300, 2_500);

/// Conservative default for unknown models; overestimation is acceptable.
const UNKNOWN_MODEL: ModelPricing = ModelPricing::new(3_000, 15_000);

static PRICING_MAP: OnceLock<HashMap<&'static str, ModelPricing>> = OnceLock::new();

fn init_pricing() -> HashMap<&'static str, ModelPricing> {
    let mut map = HashMap::new();
    map.insert("anthropic/claude-3-5-haiku", CLAUDE_35_HAIKU);
    map.insert("anthropic/claude-sonnet-4.5", CLAUDE_SONNET_45);
    map.insert("openai/gpt-4o-mini", GPT_4O_MINI);
    map.insert("openai/gpt-5-mini", GPT_5_MINI);
    map.insert("google/gemini-2.5-flash", GEMINI_25_FLASH);
    map
}

/// Look up pricing for a model, falling back to a conservative default.
pub fn pricing_for(model_id: &str) -> ModelPricing {
    let map = PRICING_MAP.get_or_init(init_pricing);
    map.get(model_id).copied().unwrap_or(UNKNOWN_MODEL)
}

/// Cost of a chat completion in nanodollars.
pub fn chat_cost(model_id: &str, input_tokens: u32, output_tokens: u32) -> i64 {
    pricing_for(model_id).calculate_cost(input_tokens, output_tokens)
}
