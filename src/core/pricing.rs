//! Model pricing and cost calculation.
//!
//! Rates are keyed by model family rather than exact model id: vendors ship
//! dated snapshots (`claude-sonnet-4-20250514`, `gpt-4o-2024-11-20`) faster than
//! any table can list them, and all snapshots of a family share a price.

/// How a family pattern is matched against a lowercased model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchRule {
    Contains,
    Prefix,
}

/// Per-million token pricing for a model family.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPricing {
    /// Family pattern (e.g., "sonnet", "gpt-4o").
    pub family: String,
    /// Cost per million input tokens (USD).
    pub input_per_million: f64,
    /// Cost per million output tokens (USD).
    pub output_per_million: f64,
}

impl ModelPricing {
    fn new(family: &str, input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            family: family.to_string(),
            input_per_million,
            output_per_million,
        }
    }

    /// Calculate cost in USD for the given token counts.
    #[must_use]
    pub fn calculate_cost(&self, input: i64, output: i64) -> f64 {
        let input_cost = (input as f64 / 1_000_000.0) * self.input_per_million;
        let output_cost = (output as f64 / 1_000_000.0) * self.output_per_million;
        input_cost + output_cost
    }
}

#[derive(Debug, Clone)]
struct FamilyEntry {
    rule: MatchRule,
    pricing: ModelPricing,
}

/// Ordered family price table. First match wins.
#[derive(Debug, Clone)]
pub struct PricingTable {
    families: Vec<FamilyEntry>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::current()
    }
}

impl PricingTable {
    /// Create the table with current list prices.
    ///
    /// Order matters: `gpt-4o-mini` must be tried before `gpt-4o`, and both
    /// before `gpt-4`.
    #[must_use]
    pub fn current() -> Self {
        let mut families = Vec::new();

        // Anthropic
        Self::add_family(&mut families, MatchRule::Contains, "opus", 15.0, 75.0);
        Self::add_family(&mut families, MatchRule::Contains, "sonnet", 3.0, 15.0);
        Self::add_family(&mut families, MatchRule::Contains, "haiku", 0.80, 4.0);

        // OpenAI
        Self::add_family(&mut families, MatchRule::Contains, "gpt-4o-mini", 0.15, 0.60);
        Self::add_family(&mut families, MatchRule::Contains, "gpt-4o", 2.50, 10.0);
        Self::add_family(&mut families, MatchRule::Contains, "gpt-4", 30.0, 60.0);
        Self::add_family(&mut families, MatchRule::Contains, "gpt-3.5", 0.50, 1.50);

        // Reasoning models
        Self::add_family(&mut families, MatchRule::Prefix, "o1", 15.0, 60.0);
        Self::add_family(&mut families, MatchRule::Prefix, "o3", 15.0, 60.0);

        Self { families }
    }

    fn add_family(
        families: &mut Vec<FamilyEntry>,
        rule: MatchRule,
        family: &str,
        input: f64,
        output: f64,
    ) {
        families.push(FamilyEntry {
            rule,
            pricing: ModelPricing::new(family, input, output),
        });
    }

    /// Look up pricing for a model by name (case-insensitive).
    ///
    /// Returns None if no family matches.
    #[must_use]
    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        let model = model.to_lowercase();
        self.families
            .iter()
            .find(|entry| match entry.rule {
                MatchRule::Contains => model.contains(&entry.pricing.family),
                MatchRule::Prefix => model.starts_with(&entry.pricing.family),
            })
            .map(|entry| &entry.pricing)
    }

    /// Get pricing for a model, falling back to a sonnet-class estimate.
    ///
    /// The flag is `true` when the family was known.
    #[must_use]
    pub fn get_or_estimate(&self, model: &str) -> (ModelPricing, bool) {
        self.get(model).map_or_else(
            || (ModelPricing::new(model, 3.0, 15.0), false),
            |pricing| (pricing.clone(), true),
        )
    }

    /// Cost of a call plus whether the price was an estimate.
    #[must_use]
    pub fn cost_for(&self, model: &str, input: i64, output: i64) -> (f64, bool) {
        let (pricing, known) = self.get_or_estimate(model);
        (pricing.calculate_cost(input, output), !known)
    }

    /// Family patterns in match order.
    #[must_use]
    pub fn known_families(&self) -> Vec<&str> {
        self.families
            .iter()
            .map(|entry| entry.pricing.family.as_str())
            .collect()
    }
}
