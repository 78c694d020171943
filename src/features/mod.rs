//! URL feature extraction: raw string → fixed, named, versioned feature vector.

mod layout;
mod lexical;
mod lexicon;
mod pipeline;
pub mod url_parts;

pub use layout::{layout_fingerprint, Feature, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use lexical::{shannon_entropy, CharStats};
pub use lexicon::Lexicon;
pub use pipeline::FeatureExtractor;
pub use url_parts::UrlParts;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::ops::Index;

/// Fixed-width feature vector in [`FEATURE_LAYOUT`] order. Booleans are 0.0/1.0.
/// Serializes as an ordered `name → value` map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl Default for FeatureVector {
    /// All-default vector: every flag false, every count 0.
    fn default() -> Self {
        Self {
            values: [0.0; FEATURE_COUNT],
        }
    }
}

impl FeatureVector {
    pub(crate) fn set(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] = value;
    }

    pub(crate) fn set_flag(&mut self, feature: Feature, on: bool) {
        self.set(feature, if on { 1.0 } else { 0.0 });
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn flag(&self, feature: Feature) -> bool {
        self.get(feature) > 0.5
    }

    pub fn by_name(&self, name: &str) -> Option<f64> {
        Feature::from_name(name).map(|f| self.get(f))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        Feature::ALL.iter().map(move |f| (f.name(), self.get(*f)))
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Build from a name → value map; every layout name must be present.
    pub fn from_named(map: &HashMap<String, f64>) -> Option<Self> {
        let mut fv = FeatureVector::default();
        for f in Feature::ALL {
            fv.set(*f, *map.get(f.name())?);
        }
        Some(fv)
    }
}

impl Index<Feature> for FeatureVector {
    type Output = f64;

    fn index(&self, feature: Feature) -> &f64 {
        &self.values[feature.index()]
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for FeatureVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = HashMap::<String, f64>::deserialize(deserializer)?;
        FeatureVector::from_named(&map)
            .ok_or_else(|| D::Error::custom("feature map is missing layout names"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_preserves_layout_order() {
        let mut fv = FeatureVector::default();
        fv.set(Feature::UrlLength, 12.0);
        fv.set_flag(Feature::HasIp, true);
        let json = serde_json::to_string(&fv).unwrap();
        assert!(json.starts_with(r#"{"url_length":12.0,"special_char_count":0.0"#));
        let back: FeatureVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fv);
        assert!(back.flag(Feature::HasIp));
        assert_eq!(back.by_name("url_length"), Some(12.0));
        assert_eq!(back.by_name("no_such_feature"), None);
    }

    #[test]
    fn incomplete_map_is_rejected() {
        let err = serde_json::from_str::<FeatureVector>(r#"{"url_length": 3.0}"#);
        assert!(err.is_err());
    }
}
