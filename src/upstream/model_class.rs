//! Model classification and token-limit normalization
//!
//! Model families differ in which parameters they accept: reasoning models
//! take `max_completion_tokens` and reject `temperature`, standard models take
//! `max_tokens` and `temperature`. The family is decided once, here, from an
//! ordered rule table.

/// Parameter class of an upstream model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelClass {
    /// `gpt-5*`
    Gpt5,
    /// `o3*` / `o4*`
    OSeries,
    /// Other reasoning models (`o1*`, names containing `reasoning`)
    OtherReasoning,
    /// Everything else
    Standard,
}

/// Inclusive token-limit range for a model class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBounds {
    pub min: u32,
    pub max: u32,
}

impl TokenBounds {
    fn clamp(self, requested: u32) -> u32 {
        requested.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy)]
enum Matcher {
    Prefix(&'static str),
    Contains(&'static str),
}

impl Matcher {
    fn matches(self, name: &str) -> bool {
        match self {
            Matcher::Prefix(p) => name.starts_with(p),
            Matcher::Contains(s) => name.contains(s),
        }
    }
}

/// First matching rule wins; unmatched names are `Standard`.
const CLASS_RULES: &[(Matcher, ModelClass)] = &[
    (Matcher::Prefix("gpt-5"), ModelClass::Gpt5),
    (Matcher::Prefix("o3"), ModelClass::OSeries),
    (Matcher::Prefix("o4"), ModelClass::OSeries),
    (Matcher::Prefix("o1"), ModelClass::OtherReasoning),
    (Matcher::Contains("reasoning"), ModelClass::OtherReasoning),
];

/// Standard-class families with a tighter ceiling than the class maximum
const STANDARD_FAMILY_CAPS: &[(&str, u32)] = &[("gpt-3.5", 4096)];

impl ModelClass {
    /// Token-limit bounds for this class
    pub fn bounds(self) -> TokenBounds {
        match self {
            ModelClass::Gpt5 => TokenBounds {
                min: 1000,
                max: 128_000,
            },
            ModelClass::OSeries => TokenBounds {
                min: 1000,
                max: 100_000,
            },
            ModelClass::OtherReasoning => TokenBounds {
                min: 1000,
                max: 32_768,
            },
            ModelClass::Standard => TokenBounds { min: 1, max: 16_384 },
        }
    }

    /// Reasoning classes use `max_completion_tokens` and omit `temperature`
    pub fn is_reasoning(self) -> bool {
        !matches!(self, ModelClass::Standard)
    }

    /// Name of the JSON field carrying the token limit
    pub fn limit_field(self) -> &'static str {
        if self.is_reasoning() {
            "max_completion_tokens"
        } else {
            "max_tokens"
        }
    }
}

/// Normalized form used for matching: lowercase, vendor prefix removed
/// (`openai/gpt-5-mini` → `gpt-5-mini`)
fn normalized_name(model: &str) -> String {
    let lower = model.trim().to_ascii_lowercase();
    match lower.rsplit_once('/') {
        Some((_, name)) => name.to_string(),
        None => lower,
    }
}

/// Classify a model name into its parameter class
pub fn classify_model(model: &str) -> ModelClass {
    let name = normalized_name(model);
    CLASS_RULES
        .iter()
        .find(|(matcher, _)| matcher.matches(&name))
        .map(|(_, class)| *class)
        .unwrap_or(ModelClass::Standard)
}

/// Effective bounds for a specific model, including family caps
pub fn bounds_for_model(model: &str) -> TokenBounds {
    let class = classify_model(model);
    let mut bounds = class.bounds();
    if class == ModelClass::Standard {
        let name = normalized_name(model);
        if let Some((_, cap)) = STANDARD_FAMILY_CAPS
            .iter()
            .find(|(family, _)| name.starts_with(family))
        {
            bounds.max = bounds.max.min(*cap);
        }
    }
    bounds
}

/// Clamp a requested token limit into the model's bounds
pub fn normalize_token_limit(model: &str, requested: u32) -> u32 {
    bounds_for_model(model).clamp(requested)
}
