//! Message types sent from the analysis side to the host

/// Recognized text that cleared the confidence gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayUpdate {
    /// Recognized UTF-8 text
    pub text: String,
    /// Mean recognizer confidence, 0-100
    pub confidence: i32,
}

/// Progress of the one-shot recognizer setup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SetupStatus {
    /// Setup has not finished yet
    #[default]
    Pending,
    /// Language data installed and recognizer initialized
    Ready,
    /// Every attempt failed; frames keep being skipped
    Failed(String),
}

impl SetupStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SetupStatus::Ready)
    }
}
