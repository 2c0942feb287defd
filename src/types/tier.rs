//! Size tier classification

use serde::{Deserialize, Serialize};

/// Size bucket assigned to an input text by character length.
///
/// Only [`SizeTier::Small`] texts are eligible for the in-process memory tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    Small,
    Medium,
    Large,
    XLarge,
}

impl SizeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeTier::Small => "small",
            SizeTier::Medium => "medium",
            SizeTier::Large => "large",
            SizeTier::XLarge => "xlarge",
        }
    }
}

impl std::fmt::Display for SizeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three ascending character-length thresholds separating the size tiers.
///
/// A length exactly equal to a threshold belongs to the next tier up:
/// with the defaults, 499 is small and 500 is medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeTierThresholds {
    /// Lengths below this are [`SizeTier::Small`]. Default: 500.
    pub small: usize,
    /// Lengths below this are [`SizeTier::Medium`]. Default: 5,000.
    pub medium: usize,
    /// Lengths below this are [`SizeTier::Large`]; the rest are xlarge. Default: 50,000.
    pub large: usize,
}

impl Default for SizeTierThresholds {
    fn default() -> Self {
        Self {
            small: 500,
            medium: 5_000,
            large: 50_000,
        }
    }
}

impl SizeTierThresholds {
    pub fn new(small: usize, medium: usize, large: usize) -> Self {
        Self {
            small,
            medium,
            large,
        }
    }

    /// Classify a text length (in characters).
    pub fn classify(&self, length: usize) -> SizeTier {
        if length < self.small {
            SizeTier::Small
        } else if length < self.medium {
            SizeTier::Medium
        } else if length < self.large {
            SizeTier::Large
        } else {
            SizeTier::XLarge
        }
    }

    /// Whether the thresholds are strictly ascending.
    pub fn is_ascending(&self) -> bool {
        self.small < self.medium && self.medium < self.large
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_belong_to_upper_tier() {
        let t = SizeTierThresholds::default();
        assert_eq!(t.classify(0), SizeTier::Small);
        assert_eq!(t.classify(499), SizeTier::Small);
        assert_eq!(t.classify(500), SizeTier::Medium);
        assert_eq!(t.classify(4_999), SizeTier::Medium);
        assert_eq!(t.classify(5_000), SizeTier::Large);
        assert_eq!(t.classify(49_999), SizeTier::Large);
        assert_eq!(t.classify(50_000), SizeTier::XLarge);
    }

    #[test]
    fn custom_thresholds() {
        let t = SizeTierThresholds::new(10, 20, 30);
        assert_eq!(t.classify(9), SizeTier::Small);
        assert_eq!(t.classify(10), SizeTier::Medium);
        assert_eq!(t.classify(30), SizeTier::XLarge);
    }

    #[test]
    fn ascending_check() {
        assert!(SizeTierThresholds::default().is_ascending());
        assert!(!SizeTierThresholds::new(10, 10, 30).is_ascending());
    }
}
