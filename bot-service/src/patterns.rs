use bot_core::{ConfigError, PatternConfig};
use regex::{Regex, RegexBuilder};

/// Topical signals: raw fish, "sushi-grade", parasites.
pub const TRIGGER_PATTERNS: &[&str] = &[
    r"(sushi|sashimi)[-\s]*(grade|cut)",
    r"\W(fish|sushi|sashimi|ceviche|poke|salmon|tuna)\s.+raw\s+consumption",
    r"costco.*salmon.*\s(sushi|sashimi|poke)",
    r"(sushi|sashimi|poke)\s.*costco.*salmon",
    r"\W(sushi|sashimi|salmon|tuna|fish)\s.*parasites",
    r"parasites.*\s(sushi|sashimi)",
    r"(frozen|freez).*\s(kill|remove|destroy|weaken)\s+parasites",
    r"(anisakis|anisakiasis)",
];

/// Aquarium keepers talk about fish too.
pub const SUPPRESSION_PATTERNS: &[&str] = &[
    r"betta",
    r"aquarium",
    r"\btank\b",
    r"\breef\b",
    r"reeftank",
];

/// Compiled trigger and suppression sets. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    triggers: Vec<Regex>,
    suppressions: Vec<Regex>,
}

impl PatternLibrary {
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_patterns(TRIGGER_PATTERNS, SUPPRESSION_PATTERNS)
    }

    pub fn from_patterns<T, S>(triggers: &[T], suppressions: &[S]) -> Result<Self, ConfigError>
    where
        T: AsRef<str>,
        S: AsRef<str>,
    {
        Ok(Self {
            triggers: compile(triggers)?,
            suppressions: compile(suppressions)?,
        })
    }

    /// Built-in sets, each replaced by its configured list when non-empty.
    pub fn from_config(config: &PatternConfig) -> Result<Self, ConfigError> {
        let triggers = if config.triggers.is_empty() {
            compile(TRIGGER_PATTERNS)?
        } else {
            compile(config.triggers.as_slice())?
        };
        let suppressions = if config.suppressions.is_empty() {
            compile(SUPPRESSION_PATTERNS)?
        } else {
            compile(config.suppressions.as_slice())?
        };

        Ok(Self {
            triggers,
            suppressions,
        })
    }

    pub fn matches_trigger(&self, text: &str) -> bool {
        self.triggers.iter().any(|pattern| pattern.is_match(text))
    }

    pub fn matches_suppression(&self, context_text: &str) -> bool {
        self.suppressions.iter().any(|pattern| pattern.is_match(context_text))
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    pub fn suppression_count(&self) -> usize {
        self.suppressions.len()
    }
}

fn compile<P: AsRef<str>>(patterns: &[P]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern.as_ref())
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.as_ref().to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> PatternLibrary {
        PatternLibrary::builtin().unwrap()
    }

    #[test]
    fn test_builtin_sets_compile() {
        let library = library();
        assert_eq!(library.trigger_count(), 8);
        assert_eq!(library.suppression_count(), 5);
    }

    #[test]
    fn test_trigger_phrases() {
        let library = library();
        for text in [
            "Where can I buy sushi-grade tuna?",
            "is this SASHIMI GRADE?",
            "the sashimi cut was great",
            "Is this fish safe for raw consumption?",
            "I used costco salmon for sushi last night",
            "making poke from costco farmed salmon",
            "do you worry about tuna and parasites?",
            "parasites in homemade sushi",
            "it was frozen first to kill parasites",
            "Anisakis is nasty",
        ] {
            assert!(library.matches_trigger(text), "should trigger: {text}");
        }
    }

    #[test]
    fn test_ordinary_text_does_not_trigger() {
        let library = library();
        for text in [
            "I love sushi",
            "grilled salmon with lemon",
            "parasites are gross",
            "sushi",
        ] {
            assert!(!library.matches_trigger(text), "should not trigger: {text}");
        }
    }

    #[test]
    fn test_suppression_phrases() {
        let library = library();
        assert!(library.matches_suppression("Aquariums : my betta looks sushi-grade"));
        assert!(library.matches_suppression("cooking : fish from my reef"));
        assert!(library.matches_suppression("new 20 gallon TANK setup"));
        assert!(!library.matches_suppression("sushi : tanker ships carry tuna"));
        assert!(!library.matches_suppression("Cooking : sushi-grade salmon at costco"));
    }

    #[test]
    fn test_custom_patterns() {
        let library = PatternLibrary::from_patterns(&["unagi"], &["koi"]).unwrap();
        assert!(library.matches_trigger("fresh UNAGI tonight"));
        assert!(!library.matches_trigger("sushi-grade"));
        assert!(library.matches_suppression("my koi pond"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = PatternLibrary::from_patterns(&["(unclosed"], &[] as &[&str]);
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn test_config_overrides_only_non_empty_lists() {
        let config = PatternConfig {
            triggers: vec![],
            suppressions: vec!["koi".to_string()],
        };
        let library = PatternLibrary::from_config(&config).unwrap();

        assert_eq!(library.trigger_count(), 8);
        assert!(library.matches_suppression("koi"));
        assert!(!library.matches_suppression("aquarium"));
    }
}
