//! Subscription plans and the savings they yield over pay-as-you-go.

use serde::{Deserialize, Serialize};

/// Configured subscription plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "cost")]
pub enum Plan {
    #[default]
    None,
    AnthropicMax,
    AnthropicPro,
    ChatgptPlus,
    ChatgptPro,
    Custom(f64),
}

impl Plan {
    /// Resolve a plan from its config name and the optional custom cost.
    ///
    /// Returns None for unrecognized names.
    #[must_use]
    pub fn from_config(kind: &str, custom_cost: Option<f64>) -> Option<Self> {
        match kind.trim().to_lowercase().as_str() {
            "" | "none" => Some(Self::None),
            "anthropic-max" => Some(Self::AnthropicMax),
            "anthropic-pro" => Some(Self::AnthropicPro),
            "chatgpt-plus" => Some(Self::ChatgptPlus),
            "chatgpt-pro" => Some(Self::ChatgptPro),
            "custom" => Some(Self::Custom(custom_cost.unwrap_or(0.0).max(0.0))),
            _ => None,
        }
    }

    /// Monthly cost in USD.
    #[must_use]
    pub const fn monthly_cost(self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::AnthropicMax | Self::ChatgptPro => 200.0,
            Self::AnthropicPro | Self::ChatgptPlus => 20.0,
            Self::Custom(cost) => cost,
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "No plan",
            Self::AnthropicMax => "Anthropic Max",
            Self::AnthropicPro => "Anthropic Pro",
            Self::ChatgptPlus => "ChatGPT Plus",
            Self::ChatgptPro => "ChatGPT Pro",
            Self::Custom(_) => "Custom",
        }
    }
}

/// Flat-rate plan cost against what the month's usage would have cost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanSavings {
    pub plan_cost: f64,
    pub theoretical_cost: f64,
}

impl PlanSavings {
    #[must_use]
    pub const fn new(plan_cost: f64, theoretical_cost: f64) -> Self {
        Self {
            plan_cost,
            theoretical_cost,
        }
    }

    #[must_use]
    pub fn savings(&self) -> f64 {
        (self.theoretical_cost - self.plan_cost).max(0.0)
    }

    /// How many times over the plan pays for itself; 0 for a free plan.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        if self.plan_cost > 0.0 {
            self.theoretical_cost / self.plan_cost
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn is_worth_it(&self) -> bool {
        self.theoretical_cost > self.plan_cost
    }
}
