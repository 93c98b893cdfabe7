use crate::settings::Settings;
use crate::speech::VoiceSettings;

/// What a coaching session needs to know about its user. Built by the caller
/// from stored settings and command line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub user_name: String,
    pub announce: bool,
    pub voice: VoiceSettings,
    pub reduced_motion: bool,
    /// Plain chat lines may be control phrases while a routine runs.
    pub voice_commands: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            user_name: settings.user_name.clone(),
            announce: settings.accessibility.text_to_speech,
            voice: VoiceSettings::from(&settings.accessibility),
            reduced_motion: settings.accessibility.reduced_motion,
            voice_commands: settings.accessibility.voice_commands,
        }
    }
}
