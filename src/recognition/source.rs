// Speech recognition source interface
// The recognizer itself lives outside the engine; only its contract is modeled here

use serde::{Deserialize, Serialize};

/// Error code the recognizer reports when a turn is cancelled on purpose
pub const ABORTED_CODE: &str = "aborted";

/// Configuration handed to the recognizer on every start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizerConfig {
    pub continuous: bool,
    pub interim_results: bool,
    /// BCP 47 tag, e.g. "te-IN"
    pub language_tag: String,
    pub max_alternatives: u32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            language_tag: "te-IN".to_string(),
            max_alternatives: 1,
        }
    }
}

/// One entry of a recognizer result list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultFragment {
    pub transcript: String,
    pub is_final: bool,
}

impl ResultFragment {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn final_(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

/// Raw event emitted by the recognizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecognizerEvent {
    /// The recognizer began a turn
    Started,
    /// New or updated results; entries before `result_index` were already delivered
    Result {
        #[serde(default, rename = "resultIndex")]
        result_index: usize,
        results: Vec<ResultFragment>,
    },
    Error {
        code: String,
    },
    /// The recognizer turn ended, whether requested or not
    Ended,
}

/// Classified recognizer error code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum RecognizerErrorCode {
    /// Turn cancelled deliberately, never shown to the user
    Aborted,
    NoSpeech,
    AudioCapture,
    Network,
    NotAllowed,
    ServiceNotAllowed,
    LanguageNotSupported,
    Other(String),
}

impl RecognizerErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            ABORTED_CODE => Self::Aborted,
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "language-not-supported" => Self::LanguageNotSupported,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_benign(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Human-readable description
    pub fn describe(&self) -> String {
        match self {
            Self::Aborted => "Recognition was aborted".to_string(),
            Self::NoSpeech => "No speech was detected".to_string(),
            Self::AudioCapture => "Microphone could not be captured".to_string(),
            Self::Network => "Network error during recognition".to_string(),
            Self::NotAllowed => "Microphone permission was denied".to_string(),
            Self::ServiceNotAllowed => "Speech service is not allowed".to_string(),
            Self::LanguageNotSupported => "Language is not supported by the recognizer".to_string(),
            Self::Other(code) => format!("Recognizer error: {}", code),
        }
    }
}

/// Failure to start the recognizer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognizerError {
    /// The source refused to start (e.g. already running, no device)
    #[error("Recognizer failed to start: {0}")]
    StartFailed(String),
}

/// Continuous speech recognition source
///
/// Results and lifecycle notifications come back as [`RecognizerEvent`]s fed
/// to the session by the host.
pub trait SpeechRecognizer: Send {
    fn start(&mut self, config: &RecognizerConfig) -> Result<(), RecognizerError>;

    fn stop(&mut self);
}

/// Recognizer that accepts every call and does nothing
///
/// Used by hosts that drive the engine from scripted events.
#[derive(Debug, Default)]
pub struct NullRecognizer;

impl SpeechRecognizer for NullRecognizer {
    fn start(&mut self, _config: &RecognizerConfig) -> Result<(), RecognizerError> {
        Ok(())
    }

    fn stop(&mut self) {}
}
