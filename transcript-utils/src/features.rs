//! Universal Dependencies morphological features

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::str::FromStr;

/// The feature string of a single word, e.g. `Tense=Pres|VerbForm=Part`
///
/// UD writes features as `Name=Value` pairs joined by `|`, with `_` standing
/// for "no features". Names are kept in sorted order so the string form is
/// canonical. Pairs without `=` are dropped.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Option<String>", into = "String")]
pub struct Features(BTreeMap<String, String>);

/// VerbForm is an inflectional feature of verbs. Participles are the form
/// that marks both the progressive (`Tense=Pres`) and the passive/perfect
/// (`Tense=Past`) in English.
pub const VERB_FORM: &str = "VerbForm";
pub const PARTICIPLE: &str = "Part";

impl Features {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_participle(&self) -> bool {
        self.get(VERB_FORM) == Some(PARTICIPLE)
    }

    /// Copy of these features with the verb form forced to participle
    pub fn with_participle(&self) -> Self {
        let mut features = self.clone();
        features.insert(VERB_FORM, PARTICIPLE);
        features
    }
}

impl FromStr for Features {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "_" {
            return Ok(Features::default());
        }
        let map = s
            .split('|')
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .filter(|(name, _)| !name.is_empty())
            .collect();
        Ok(Features(map))
    }
}

impl std::fmt::Display for Features {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "_");
        }
        let joined = self
            .0
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("|");
        write!(f, "{joined}")
    }
}

impl TryFrom<Option<String>> for Features {
    type Error = Infallible;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        value.as_deref().unwrap_or_default().parse()
    }
}

impl From<Features> for String {
    fn from(features: Features) -> Self {
        features.to_string()
    }
}
