//! Model capacity selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Capacity variant of the ConvNeXt family.
///
/// Parsed case-insensitively from a tag such as `"tiny"` or `"Base"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    /// ConvNeXt-T.
    #[default]
    Tiny,
    /// ConvNeXt-S.
    Small,
    /// ConvNeXt-B.
    Base,
    /// ConvNeXt-L.
    Large,
}

impl ModelSize {
    /// All supported sizes, smallest first.
    pub const ALL: [ModelSize; 4] = [
        ModelSize::Tiny,
        ModelSize::Small,
        ModelSize::Base,
        ModelSize::Large,
    ];

    /// Lowercase tag, as accepted on the command line.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Small => "small",
            ModelSize::Base => "base",
            ModelSize::Large => "large",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelSize::Tiny => "Tiny",
            ModelSize::Small => "Small",
            ModelSize::Base => "Base",
            ModelSize::Large => "Large",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelSize {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "small" => Ok(ModelSize::Small),
            "base" => Ok(ModelSize::Base),
            "large" => Ok(ModelSize::Large),
            _ => Err(CoreError::UnsupportedModelSize(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("tiny".parse::<ModelSize>().unwrap(), ModelSize::Tiny);
        assert_eq!("Small".parse::<ModelSize>().unwrap(), ModelSize::Small);
        assert_eq!("BASE".parse::<ModelSize>().unwrap(), ModelSize::Base);
        assert_eq!(" large ".parse::<ModelSize>().unwrap(), ModelSize::Large);
    }

    #[test]
    fn test_parse_unsupported() {
        let err = "huge".parse::<ModelSize>().unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedModelSize(ref s) if s == "huge"));
    }

    #[test]
    fn test_display_capitalised() {
        let names: Vec<String> = ModelSize::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["Tiny", "Small", "Base", "Large"]);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ModelSize::Base).unwrap();
        assert_eq!(json, "\"base\"");
        let back: ModelSize = serde_json::from_str("\"large\"").unwrap();
        assert_eq!(back, ModelSize::Large);
    }
}
