#![forbid(unsafe_code)]

/// Contract revision stamp carried by every envelope and record; v1 today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion(pub u32);

/// Monotonic clock reading in nanoseconds, supplied by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonotonicTimeNs(pub u64);

/// Stable numeric name for one decision path. Each engine keeps its own
/// registry in a `reason_codes` module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReasonCodeId(pub u32);

/// The closed emotion vocabulary shared by every namespace. Unrecognized
/// labels never fail parsing; they map to `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EmotionTag {
    Sad,
    Angry,
    Fear,
    Anxious,
    Neutral,
}

impl EmotionTag {
    pub const ALL: [EmotionTag; 5] = [
        EmotionTag::Sad,
        EmotionTag::Angry,
        EmotionTag::Fear,
        EmotionTag::Anxious,
        EmotionTag::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EmotionTag::Sad => "sad",
            EmotionTag::Angry => "angry",
            EmotionTag::Fear => "fear",
            EmotionTag::Anxious => "anxious",
            EmotionTag::Neutral => "neutral",
        }
    }

    /// Strict label lookup, used for content-pack keys where an unknown tag
    /// means "skip this entry".
    pub fn from_label(label: &str) -> Option<EmotionTag> {
        match label.trim().to_ascii_lowercase().as_str() {
            "sad" | "sadness" => Some(EmotionTag::Sad),
            "angry" | "anger" => Some(EmotionTag::Angry),
            "fear" | "afraid" | "scared" => Some(EmotionTag::Fear),
            "anxious" | "anxiety" => Some(EmotionTag::Anxious),
            "neutral" => Some(EmotionTag::Neutral),
            _ => None,
        }
    }

    /// Runtime-input parse. Callers hand over whatever tag an upstream
    /// classifier produced; anything unrecognized degrades to `Neutral`.
    pub fn parse_or_neutral(label: &str) -> EmotionTag {
        EmotionTag::from_label(label).unwrap_or(EmotionTag::Neutral)
    }
}

/// Single error currency for every contract in the workspace. Validators
/// report the first violation they find and stop.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractViolation {
    /// A field broke a structural rule. `reason` is a stable literal, safe
    /// to assert on in tests and to log verbatim.
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    /// A numeric field landed outside its closed budget.
    InvalidRange {
        field: &'static str,
        got: f64,
        min: f64,
        max: f64,
    },
}

/// Structural self-check. A type validates only its own invariants;
/// cross-record rules live with the owning engine or store.
pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_tag_parse_defaults_to_neutral() {
        assert_eq!(EmotionTag::parse_or_neutral("sad"), EmotionTag::Sad);
        assert_eq!(EmotionTag::parse_or_neutral("ANXIETY"), EmotionTag::Anxious);
        assert_eq!(EmotionTag::parse_or_neutral("joyful"), EmotionTag::Neutral);
        assert_eq!(EmotionTag::parse_or_neutral(""), EmotionTag::Neutral);
    }

    #[test]
    fn emotion_tag_strict_lookup_rejects_unknown() {
        assert_eq!(EmotionTag::from_label("fear"), Some(EmotionTag::Fear));
        assert_eq!(EmotionTag::from_label("joyful"), None);
    }
}
