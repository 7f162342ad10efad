use crate::notification::domain::sink_error::SinkError;
use crate::notification::domain::speaker::Speaker;

/// Speaker that writes voice lines to the log instead of an audio device.
///
/// Stands in for a text-to-speech engine on headless hosts.
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn speak(&self, text: &str) -> Result<(), SinkError> {
        log::info!("[voice] {text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speak_never_fails() {
        assert!(LogSpeaker.speak("Smart door system activated").is_ok());
    }
}
