use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// One of the five fixed classes of source assets.
///
/// Each class owns exactly one path spec, one stage, and one watch binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Markup,
    Styles,
    Scripts,
    Images,
    Fonts,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Markup,
        AssetClass::Styles,
        AssetClass::Scripts,
        AssetClass::Images,
        AssetClass::Fonts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Markup => "markup",
            AssetClass::Styles => "styles",
            AssetClass::Scripts => "scripts",
            AssetClass::Images => "images",
            AssetClass::Fonts => "fonts",
        }
    }

    /// Stable position of this class inside [`AssetClass::ALL`].
    pub fn index(self) -> usize {
        match self {
            AssetClass::Markup => 0,
            AssetClass::Styles => 1,
            AssetClass::Scripts => 2,
            AssetClass::Images => 3,
            AssetClass::Fonts => 4,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markup" | "html" => Ok(AssetClass::Markup),
            "styles" => Ok(AssetClass::Styles),
            "scripts" => Ok(AssetClass::Scripts),
            "images" => Ok(AssetClass::Images),
            "fonts" => Ok(AssetClass::Fonts),
            other => Err(format!(
                "invalid asset class: {other} (expected markup, styles, scripts, images or fonts)"
            )),
        }
    }
}

/// Whether the pipeline is assembled for a one-shot production build or for
/// a development session.
///
/// The mode is decided once from the CLI and passed into pipeline assembly;
/// stages never look it up on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Production,
    Development,
}

impl BuildMode {
    pub fn is_development(self) -> bool {
        matches!(self, BuildMode::Development)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Production => f.write_str("production"),
            BuildMode::Development => f.write_str("development"),
        }
    }
}
