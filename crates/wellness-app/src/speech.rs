// Text-to-speech capability.
//
// The chat controller only sees `SpeechSynthesizer`. `CommandSpeech` drives a
// platform speech program (espeak-ng by default) as a child process;
// `NullSpeech` stands in when speech is disabled.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use wellness_core::config::SpeechConfig;
use wellness_core::models::Language;

/// espeak-ng's default speaking rate in words per minute; `rate` scales it.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub language: Language,
    pub rate: f32,
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech is disabled")]
    Disabled,

    #[error("nothing to read aloud")]
    Empty,

    #[error("failed to start speech command `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

pub trait SpeechSynthesizer: Send + Sync {
    /// Begin speaking. Callers stop any current utterance first.
    fn start(&self, utterance: Utterance) -> Result<(), SpeechError>;

    /// Stop the current utterance, if any. Idempotent.
    fn stop(&self);

    fn is_active(&self) -> bool;
}

// ---------------------------------------------------------------------------
// CommandSpeech
// ---------------------------------------------------------------------------

pub struct CommandSpeech {
    command: String,
    child: Mutex<Option<Child>>,
}

impl CommandSpeech {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            child: Mutex::new(None),
        }
    }

    fn child(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Voice name understood by espeak-ng for each language.
pub fn voice_for(language: Language) -> &'static str {
    match language {
        Language::English => "en-us",
        Language::Tamil => "ta",
        Language::Hindi => "hi",
    }
}

/// Command-line arguments for one utterance.
pub fn command_args(utterance: &Utterance) -> Vec<String> {
    let wpm = (BASE_WORDS_PER_MINUTE * utterance.rate).round().max(1.0) as u32;
    vec![
        "-v".to_string(),
        voice_for(utterance.language).to_string(),
        "-s".to_string(),
        wpm.to_string(),
        "--".to_string(),
        utterance.text.clone(),
    ]
}

impl SpeechSynthesizer for CommandSpeech {
    fn start(&self, utterance: Utterance) -> Result<(), SpeechError> {
        if utterance.text.trim().is_empty() {
            return Err(SpeechError::Empty);
        }

        let mut guard = self.child();
        if let Some(mut previous) = guard.take() {
            let _ = previous.start_kill();
        }

        let child = Command::new(&self.command)
            .args(command_args(&utterance))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        debug!(
            "Speaking {} chars in {}",
            utterance.text.len(),
            utterance.language.tag()
        );
        *guard = Some(child);
        Ok(())
    }

    fn stop(&self) {
        if let Some(mut child) = self.child().take() {
            if let Err(e) = child.start_kill() {
                warn!("Failed to stop speech process: {}", e);
            }
        }
    }

    fn is_active(&self) -> bool {
        let mut guard = self.child();
        let finished = match guard.as_mut() {
            None => return false,
            Some(child) => !matches!(child.try_wait(), Ok(None)),
        };
        if finished {
            *guard = None;
        }
        !finished
    }
}

// ---------------------------------------------------------------------------
// NullSpeech
// ---------------------------------------------------------------------------

/// Speech turned off in config.
pub struct NullSpeech;

impl SpeechSynthesizer for NullSpeech {
    fn start(&self, _utterance: Utterance) -> Result<(), SpeechError> {
        Err(SpeechError::Disabled)
    }

    fn stop(&self) {}

    fn is_active(&self) -> bool {
        false
    }
}

/// Build the speech engine described by the config.
pub fn from_config(config: &SpeechConfig) -> Arc<dyn SpeechSynthesizer> {
    if config.enabled {
        info!("Speech enabled via `{}`", config.command);
        Arc::new(CommandSpeech::new(config.command.clone()))
    } else {
        info!("Speech disabled");
        Arc::new(NullSpeech)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(text: &str) -> Utterance {
        Utterance {
            text: text.to_string(),
            language: Language::Tamil,
            rate: 0.8,
        }
    }

    #[test]
    fn command_args_scale_rate_and_pick_voice() {
        let args = command_args(&utterance("vanakkam"));
        assert_eq!(args, vec!["-v", "ta", "-s", "140", "--", "vanakkam"]);
    }

    #[test]
    fn text_starting_with_dash_stays_positional() {
        let args = command_args(&utterance("-v is not a flag here"));
        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args.last().unwrap(), "-v is not a flag here");
    }

    #[test]
    fn null_speech_reports_disabled() {
        let speech = NullSpeech;
        assert!(matches!(
            speech.start(utterance("hi")),
            Err(SpeechError::Disabled)
        ));
        assert!(!speech.is_active());
        speech.stop();
    }

    #[test]
    fn from_config_respects_enabled_flag() {
        let mut config = SpeechConfig::default();
        config.enabled = false;
        let speech = from_config(&config);
        assert!(speech.start(utterance("x")).is_err());
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_spawning() {
        let speech = CommandSpeech::new("definitely-not-a-real-binary");
        assert!(matches!(speech.start(utterance("   ")), Err(SpeechError::Empty)));
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let speech = CommandSpeech::new("definitely-not-a-real-binary-5f1c");
        let err = speech.start(utterance("hello")).unwrap_err();
        assert!(matches!(err, SpeechError::Spawn { .. }));
        assert!(!speech.is_active());
    }

    #[cfg(unix)]
    fn sleeping_script(dir: &std::path::Path) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-tts");
        std::fs::write(&path, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_kills_running_process() {
        let dir = tempfile::tempdir().unwrap();
        let script = sleeping_script(dir.path());
        let speech = CommandSpeech::new(script.to_string_lossy());

        speech.start(utterance("hello")).unwrap();
        assert!(speech.is_active());

        speech.stop();
        assert!(!speech.is_active());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn start_replaces_previous_utterance() {
        let dir = tempfile::tempdir().unwrap();
        let script = sleeping_script(dir.path());
        let speech = CommandSpeech::new(script.to_string_lossy());

        speech.start(utterance("first")).unwrap();
        speech.start(utterance("second")).unwrap();
        assert!(speech.is_active());
        speech.stop();
    }
}
