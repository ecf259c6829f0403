// Text-to-speech collaborator interface
// Used to let the learner hear the current target; nothing is read back

use serde::{Deserialize, Serialize};

/// Voice options for one utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechOptions {
    pub language_tag: String,
    /// 1.0 is normal speed
    pub rate: f32,
    /// 1.0 is normal pitch
    pub pitch: f32,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            language_tag: "te-IN".to_string(),
            rate: 0.8,
            pitch: 1.0,
        }
    }
}

/// Fire-and-forget speech synthesizer
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str, options: &SpeechOptions);
}
