//! Spoken announcements. No speech engine ships with the crate: the default
//! announcer writes what it would say to the log.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::error::{LimberError, Result};
use crate::settings::AccessibilitySettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl From<&AccessibilitySettings> for VoiceSettings {
    fn from(a: &AccessibilitySettings) -> Self {
        Self {
            rate: a.speech_rate,
            pitch: a.speech_pitch,
            volume: a.speech_volume,
        }
    }
}

impl VoiceSettings {
    /// Reject parameters no speech engine accepts.
    pub fn check(&self) -> Result<()> {
        let ranges = [
            ("rate", self.rate, 0.1, 10.0),
            ("pitch", self.pitch, 0.0, 2.0),
            ("volume", self.volume, 0.0, 1.0),
        ];
        for (name, value, min, max) in ranges {
            if !(min..=max).contains(&value) {
                return Err(LimberError::Speech(format!(
                    "{name} {value} outside {min}..={max}"
                )));
            }
        }
        Ok(())
    }
}

pub trait Announcer {
    fn speak(&mut self, text: &str, voice: &VoiceSettings) -> Result<()>;
}

/// Sends announcements to the tracing log.
#[derive(Debug, Default)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn speak(&mut self, text: &str, voice: &VoiceSettings) -> Result<()> {
        voice.check()?;
        info!(
            target: "limber::speech",
            rate = voice.rate,
            pitch = voice.pitch,
            volume = voice.volume,
            "{text}"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SilentAnnouncer;

impl Announcer for SilentAnnouncer {
    fn speak(&mut self, _text: &str, _voice: &VoiceSettings) -> Result<()> {
        Ok(())
    }
}

/// Keeps every announcement. Clones share one record, so a caller can hand
/// one to the coach and read what was said from another.
#[derive(Debug, Default, Clone)]
pub struct RecordingAnnouncer {
    spoken: Rc<RefCell<Vec<String>>>,
}

impl RecordingAnnouncer {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.borrow().clone()
    }
}

impl Announcer for RecordingAnnouncer {
    fn speak(&mut self, text: &str, voice: &VoiceSettings) -> Result<()> {
        voice.check()?;
        self.spoken.borrow_mut().push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn voice_follows_accessibility_settings() {
        let a = AccessibilitySettings {
            speech_rate: 0.8,
            speech_pitch: 1.2,
            speech_volume: 0.5,
            ..Default::default()
        };
        let voice = VoiceSettings::from(&a);
        assert_eq!(voice.rate, 0.8);
        assert_eq!(voice.pitch, 1.2);
        assert_eq!(voice.volume, 0.5);
    }

    #[test]
    fn recording_announcer_clones_share_order() {
        let announcer = RecordingAnnouncer::default();
        let mut handle = announcer.clone();
        let voice = VoiceSettings::default();
        handle.speak("one", &voice).unwrap();
        handle.speak("two", &voice).unwrap();
        assert_eq!(announcer.spoken(), vec!["one", "two"]);
        assert!(LogAnnouncer.speak("three", &voice).is_ok());
    }

    #[test]
    fn out_of_range_voice_is_a_speech_error() {
        let voice = VoiceSettings {
            volume: 1.5,
            ..VoiceSettings::default()
        };
        assert_matches!(
            LogAnnouncer.speak("hello", &voice),
            Err(LimberError::Speech(msg)) if msg.starts_with("volume")
        );
        let mut recorder = RecordingAnnouncer::default();
        assert!(recorder.speak("hello", &voice).is_err());
        assert!(recorder.spoken().is_empty());
    }
}
