use serde::{Deserialize, Serialize};

/// Tone analysis for one submitted text, as returned by the `2016-02-11`
/// version of the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneAnalysis {
    pub document_tone: DocumentTone,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sentences_tone: Vec<SentenceTone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocumentTone {
    #[serde(default)]
    pub tone_categories: Vec<ToneCategory>,
}

impl DocumentTone {
    pub fn category(&self, category_id: &str) -> Option<&ToneCategory> {
        self.tone_categories
            .iter()
            .find(|category| category.category_id == category_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneCategory {
    pub category_id: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub tones: Vec<Tone>,
}

impl ToneCategory {
    /// Highest scoring tone; ties go to the earlier entry.
    pub fn dominant_tone(&self) -> Option<&Tone> {
        self.tones.iter().fold(None, |best: Option<&Tone>, tone| match best {
            Some(current) if current.score >= tone.score => Some(current),
            _ => Some(tone),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub tone_id: String,
    #[serde(default)]
    pub tone_name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceTone {
    pub sentence_id: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub input_from: usize,
    #[serde(default)]
    pub input_to: usize,
    #[serde(default)]
    pub tone_categories: Vec<ToneCategory>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(tone_id: &str, score: f64) -> Tone {
        Tone {
            tone_id: tone_id.to_owned(),
            tone_name: tone_id.to_owned(),
            score,
        }
    }

    #[test]
    fn dominant_tone_picks_highest_score_and_keeps_first_on_tie() {
        let category = ToneCategory {
            category_id: "emotion_tone".to_owned(),
            category_name: "Emotion Tone".to_owned(),
            tones: vec![tone("anger", 0.1), tone("joy", 0.7), tone("fear", 0.7)],
        };

        assert_eq!(
            category.dominant_tone().map(|tone| tone.tone_id.as_str()),
            Some("joy")
        );

        let empty = ToneCategory {
            tones: Vec::new(),
            ..category
        };
        assert!(empty.dominant_tone().is_none());
    }

    #[test]
    fn document_tone_looks_up_category_by_id() {
        let document = DocumentTone {
            tone_categories: vec![ToneCategory {
                category_id: "social_tone".to_owned(),
                category_name: "Social Tone".to_owned(),
                tones: vec![tone("agreeableness_big5", 0.4)],
            }],
        };

        assert!(document.category("social_tone").is_some());
        assert!(document.category("writing_tone").is_none());
    }
}
