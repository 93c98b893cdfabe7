use ratatui::Frame;

use crate::{
    ui::{progress::render_progress, settings_view::render_settings},
    App, AppState,
};

/// A UI Screen boundary: responsible for rendering
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Chat screen with the exercise panel, rendered by the App widget
pub struct ChatScreen;

impl Screen for ChatScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

pub struct ProgressScreen;

impl Screen for ProgressScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_progress(app, f);
    }
}

pub struct SettingsScreen;

impl Screen for SettingsScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_settings(app, f);
    }
}

pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Chat => Box::new(ChatScreen),
        AppState::Progress => Box::new(ProgressScreen),
        AppState::Settings => Box::new(SettingsScreen),
    }
}
