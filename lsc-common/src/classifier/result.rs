//! Class labels and classification results

use serde::{Deserialize, Serialize};

/// Lung sound class, in model output index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LungSoundClass {
    Normal,
    Wheezing,
}

impl LungSoundClass {
    /// All classes, indexed as the model's output columns
    pub const ALL: [LungSoundClass; 2] = [LungSoundClass::Normal, LungSoundClass::Wheezing];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            LungSoundClass::Normal => 0,
            LungSoundClass::Wheezing => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LungSoundClass::Normal => "normal",
            LungSoundClass::Wheezing => "wheezing",
        }
    }
}

impl std::fmt::Display for LungSoundClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Argmax class
    pub label: LungSoundClass,
    /// Softmax probability of `label`
    pub confidence: f32,
    /// Softmax probabilities for every class, indexed like [`LungSoundClass::ALL`]
    pub probabilities: [f32; 2],
}

impl Classification {
    /// Pick the argmax of a probability vector. Ties go to the lower index.
    pub fn from_probabilities(probabilities: [f32; 2]) -> Self {
        let index = if probabilities[1] > probabilities[0] { 1 } else { 0 };
        Self {
            label: LungSoundClass::ALL[index],
            confidence: probabilities[index],
            probabilities,
        }
    }

    /// Wire form with confidence rounded to 4 decimal places
    pub fn report(&self) -> ClassificationReport {
        ClassificationReport {
            label: self.label,
            confidence: round_confidence(self.confidence),
        }
    }
}

/// `{"class": ..., "confidence": ...}` as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    #[serde(rename = "class")]
    pub label: LungSoundClass,
    pub confidence: f64,
}

pub fn round_confidence(confidence: f32) -> f64 {
    (confidence as f64 * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_mapping() {
        for class in LungSoundClass::ALL {
            assert_eq!(LungSoundClass::from_index(class.index()), Some(class));
        }
        assert_eq!(LungSoundClass::from_index(2), None);
        assert_eq!(LungSoundClass::Wheezing.to_string(), "wheezing");
    }

    #[test]
    fn test_argmax() {
        let result = Classification::from_probabilities([0.2, 0.8]);
        assert_eq!(result.label, LungSoundClass::Wheezing);
        assert_eq!(result.confidence, 0.8);

        let tie = Classification::from_probabilities([0.5, 0.5]);
        assert_eq!(tie.label, LungSoundClass::Normal);
    }

    #[test]
    fn test_report_json() {
        let report = Classification::from_probabilities([0.876_543_2, 0.123_456_8]).report();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["class"], "normal");
        assert_eq!(json["confidence"], 0.8765);
    }
}
