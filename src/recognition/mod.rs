// Recognition module - recognizer contract and the session supervisor around it

pub mod source;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod mock;

pub use source::{
    NullRecognizer, RecognizerConfig, RecognizerError, RecognizerErrorCode, RecognizerEvent,
    ResultFragment, SpeechRecognizer,
};
pub use supervisor::{RecognitionSupervisor, SupervisorConfig, SupervisorError, Transcript};
