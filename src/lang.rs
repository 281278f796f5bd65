use serde::{Deserialize, Serialize};

/// Languages a lookup can be requested in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    #[default]
    Ja,
}

impl Lang {
    pub const SUPPORTED: [Lang; 2] = [Lang::En, Lang::Ja];

    pub fn parse(tag: &str) -> Option<Lang> {
        Self::SUPPORTED.into_iter().find(|lang| lang.as_str() == tag)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ja => "ja",
        }
    }

    /// Value sent as `Accept-Language` when fetching in this language.
    pub fn accept_language(&self) -> &'static str {
        match self {
            Lang::Ja => "ja-JP,ja;q=0.9",
            Lang::En => "en-US,en;q=0.9",
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the requested language if supported, `default` otherwise.
pub fn select(requested: Option<&str>, default: Lang) -> Lang {
    requested.and_then(Lang::parse).unwrap_or(default)
}
