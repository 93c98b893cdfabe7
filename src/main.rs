mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use limber::{
    app_dirs::AppDirs,
    assistant::ScriptedAssistant,
    catalog::{self, BodyRegion},
    celebration::Confetti,
    clock::SystemClock,
    coach::{Coach, CommandOutcome},
    commands::Command,
    history::HistoryDb,
    ledger::{level, Leaderboard},
    logging,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    session::SessionConfig,
    settings::{FileSettingsStore, Settings, SettingsStore},
    speech::{Announcer, LogAnnouncer, SilentAnnouncer},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
};

use crate::ui::screen::current_screen;

const CONFETTI_PIECES: usize = 30;

/// guided chair exercises in the terminal, with timed steps and a leaderboard
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "Describe where it hurts and limber answers with a short chair-based routine, walks you through it one timed step at a time, and keeps score on a community leaderboard."
)]
pub struct Cli {
    /// name to record progress under (defaults to the stored setting)
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// start straight away with this message, e.g. "my lower back is stiff"
    #[clap(short = 'm', long)]
    message: Option<String>,

    /// do not read or write the exercise history database
    #[clap(long)]
    no_db: bool,

    /// turn off spoken announcements
    #[clap(short = 'q', long)]
    quiet: bool,

    /// print the leaderboard and exit
    #[clap(long)]
    leaderboard: bool,

    /// print your exercise history and exit
    #[clap(long)]
    history: bool,

    /// write your exercise history as CSV and exit
    #[clap(long, value_name = "PATH")]
    export_csv: Option<PathBuf>,

    /// change a stored setting and exit; repeatable, e.g. --set accessibility.speechRate=1.2
    #[clap(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// settings file to use instead of the default location
    #[clap(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// history database to use instead of the default location
    #[clap(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

impl Cli {
    fn settings_store(&self) -> FileSettingsStore {
        match &self.settings {
            Some(path) => FileSettingsStore::with_path(path),
            None => FileSettingsStore::new(),
        }
    }

    fn open_db(&self) -> limber::Result<HistoryDb> {
        match &self.db {
            Some(path) => HistoryDb::open(path),
            None => HistoryDb::open_default(),
        }
    }

    /// Stored settings with command line overrides applied.
    fn session_config(&self, settings: &Settings) -> SessionConfig {
        let mut config = SessionConfig::from_settings(settings);
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            config.user_name = name.to_string();
        }
        if self.quiet {
            config.announce = false;
        }
        config
    }

    fn is_one_shot(&self) -> bool {
        self.leaderboard || self.history || self.export_csv.is_some() || !self.set.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Chat,
    Progress,
    Settings,
}

#[derive(Debug)]
pub struct App {
    pub coach: Coach<SystemClock>,
    pub state: AppState,
    pub settings: Settings,
    /// Chat line being typed.
    pub input: String,
    /// Last rejection or error, shown under the input line.
    pub status: Option<String>,
    pub confetti: Confetti,
    confetti_fired: bool,
    /// Region guide used for the exercise panel's tips.
    pub regions: Vec<BodyRegion>,
    pub should_quit: bool,
}

impl App {
    pub fn new(coach: Coach<SystemClock>, settings: Settings) -> Self {
        let regions = catalog::body_regions().unwrap_or_else(|e| {
            tracing::warn!("body region guide unavailable: {e}");
            Vec::new()
        });
        Self {
            coach,
            state: AppState::Chat,
            settings,
            input: String::new(),
            status: None,
            confetti: Confetti::default(),
            confetti_fired: false,
            regions,
            should_quit: false,
        }
    }

    /// Submit a chat line: either a `/command` or a message for the assistant.
    /// While a routine runs, plain control phrases ("next step", "done") also
    /// count as commands if voice commands are on.
    pub fn submit(&mut self, line: &str) {
        self.status = None;
        let spoken = self.coach.config().voice_commands && self.coach.is_exercising();
        let command = Command::parse_chat(line).or_else(|| spoken.then(|| Command::parse(line)).flatten());
        if let Some(command) = command {
            self.run_command(command);
            return;
        }
        if let Err(e) = self.coach.send_message(line) {
            self.status = Some(e.to_string());
        }
    }

    pub fn run_command(&mut self, command: Command) {
        match self.coach.run_command(command) {
            Ok(CommandOutcome::Handled) => {}
            Ok(CommandOutcome::ShowLeaderboard) => self.state = AppState::Progress,
            Ok(CommandOutcome::ShowSettings) => self.state = AppState::Settings,
            Ok(CommandOutcome::Quit) => self.should_quit = true,
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            self.should_quit = true;
            return;
        }

        match self.state {
            AppState::Chat => self.on_chat_key(key),
            AppState::Progress | AppState::Settings => match key.code {
                KeyCode::Tab | KeyCode::Backspace | KeyCode::Char('b') => {
                    self.state = AppState::Chat
                }
                _ => {}
            },
        }
    }

    fn on_chat_key(&mut self, key: KeyEvent) {
        // single-key controls work while a routine runs and nothing is typed
        if self.coach.is_exercising() && self.input.is_empty() {
            let command = match key.code {
                KeyCode::Char('s') => Some(Command::Skip),
                KeyCode::Char('c') => Some(Command::Complete),
                KeyCode::Char('m') if self.coach.panel_visible() => Some(Command::Minimize),
                KeyCode::Char('m') => Some(Command::Restore),
                _ => None,
            };
            if let Some(command) = command {
                self.status = None;
                self.run_command(command);
                return;
            }
        }

        match key.code {
            KeyCode::Tab => self.state = AppState::Progress,
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.input);
                if !line.trim().is_empty() {
                    self.submit(&line);
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    /// Advance timers and animation; called on every runtime tick.
    pub fn on_tick(&mut self, width: u16, height: u16) {
        self.coach.poll();

        if self.coach.celebration().is_some() {
            if !self.confetti_fired && !self.coach.config().reduced_motion {
                self.confetti
                    .burst(width, height, CONFETTI_PIECES, &mut rand::thread_rng());
            }
            self.confetti_fired = true;
            self.confetti.update(limber::runtime::TICK_RATE.as_secs_f64());
        } else if self.confetti_fired {
            self.confetti.clear();
            self.confetti_fired = false;
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.is_one_shot() {
        logging::init_stderr();
        return run_one_shot(&cli);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(path) = AppDirs::log_path() {
        logging::init_file(&path);
    }
    tracing::info!("starting limber v{}", env!("CARGO_PKG_VERSION"));

    let settings = cli.settings_store().load();
    let config = cli.session_config(&settings);
    let announcer: Box<dyn Announcer> = if config.announce {
        Box::new(LogAnnouncer)
    } else {
        Box::new(SilentAnnouncer)
    };
    let mut coach = Coach::new(
        config,
        SystemClock::new(),
        Box::new(ScriptedAssistant::new()?),
        announcer,
    );
    if !cli.no_db {
        if let Err(e) = cli.open_db().and_then(|db| coach.attach_history(db)) {
            tracing::warn!("running without history: {e}");
        }
    }

    let mut app = App::new(coach, settings);
    if let Some(message) = &cli.message {
        app.submit(message);
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);
    app.coach.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());

    terminal.draw(|f| ui(app, f))?;
    while !app.should_quit {
        for event in runner.step_batch() {
            match event {
                AppEvent::Tick => {
                    let size = terminal.size().unwrap_or_default();
                    app.on_tick(size.width, size.height);
                }
                AppEvent::Resize => {}
                AppEvent::Key(key) => app.on_key(key),
            }
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn run_one_shot(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let store = cli.settings_store();
    let mut settings = store.load();

    if !cli.set.is_empty() {
        for assignment in &cli.set {
            settings.apply(assignment)?;
        }
        store.save(&settings)?;
        for (key, value) in settings.entries()? {
            println!("{key} = {value}");
        }
    }

    let config = cli.session_config(&settings);
    let db = if cli.no_db { None } else { Some(cli.open_db()?) };

    if cli.leaderboard {
        let mut board = Leaderboard::community();
        if let Some(db) = &db {
            board.overlay(db.load_leaderboard()?);
        }
        println!("{:<4} {:<20} {:>7} {:>9} {:>5}", "#", "name", "points", "exercises", "level");
        for (i, entry) in board.entries().iter().enumerate() {
            let marker = if entry.user_name == config.user_name { "*" } else { "" };
            println!(
                "{:<4} {:<20} {:>7} {:>9} {:>5}",
                format!("{}{}", i + 1, marker),
                entry.user_name,
                entry.total_points,
                entry.completed_exercise_count,
                entry.level()
            );
        }
    }

    if cli.history {
        let history = match &db {
            Some(db) => db.load_history(&config.user_name)?,
            None => Vec::new(),
        };
        let points: u32 = history.iter().map(|r| r.points_awarded).sum();
        println!(
            "{}: {} exercises, {} points, level {}",
            config.user_name,
            history.len(),
            points,
            level(points)
        );
        for record in &history {
            println!(
                "{}  {:<24} {:>2} steps  +{}",
                record.completed_at.format("%Y-%m-%d %H:%M"),
                record.pain_location.display_name(),
                record.step_count,
                record.points_awarded
            );
        }
    }

    if let Some(path) = &cli.export_csv {
        let Some(db) = &db else {
            return Err("--export-csv needs the history database (drop --no-db)".into());
        };
        let rows = db.export_csv(&config.user_name, File::create(path)?)?;
        println!("exported {rows} exercises to {}", path.display());
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    current_screen(&app.state).render(app, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use limber::{assistant::Assistant, pain::PainLocation, sequencer::SequencerState};
    use ratatui::{backend::TestBackend, Terminal};

    struct Canned;

    impl Assistant for Canned {
        fn respond(&mut self, _message: &str, _location: PainLocation) -> limber::Result<String> {
            Ok("1. Lift your heel for 30 seconds\n2. Point your toes for 30 seconds".into())
        }
    }

    pub(crate) fn test_app() -> App {
        app()
    }

    fn app() -> App {
        let coach = Coach::new(
            SessionConfig::default(),
            SystemClock::new(),
            Box::new(Canned),
            Box::new(SilentAnnouncer),
        );
        App::new(coach, Settings::default())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_line(app: &mut App, line: &str) {
        for c in line.chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
        app.on_key(key(KeyCode::Enter));
    }

    fn rendered(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(app, f)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["limber"]);
        assert_eq!(cli.name, None);
        assert_eq!(cli.message, None);
        assert!(!cli.no_db);
        assert!(!cli.quiet);
        assert!(cli.set.is_empty());
        assert!(!cli.is_one_shot());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "limber",
            "-n",
            "Ada",
            "-q",
            "--set",
            "userName=Bea",
            "--set",
            "accessibility.highContrast=true",
            "--leaderboard",
        ]);
        assert_eq!(cli.name.as_deref(), Some("Ada"));
        assert!(cli.quiet);
        assert_eq!(cli.set.len(), 2);
        assert!(cli.is_one_shot());
    }

    #[test]
    fn test_session_config_overrides() {
        let cli = Cli::parse_from(["limber", "--name", "  Ada  ", "--quiet"]);
        let config = cli.session_config(&Settings::default());
        assert_eq!(config.user_name, "Ada");
        assert!(!config.announce);

        let cli = Cli::parse_from(["limber", "--name", "   "]);
        assert_eq!(cli.session_config(&Settings::default()).user_name, "You");
    }

    #[test]
    fn test_typed_message_starts_routine() {
        let mut app = app();
        type_line(&mut app, "my ankle is sore");
        assert!(app.input.is_empty());
        assert!(app.coach.is_exercising());
        assert_eq!(app.status, None);
    }

    #[test]
    fn test_single_key_controls_while_exercising() {
        let mut app = app();
        type_line(&mut app, "ankle");

        app.on_key(key(KeyCode::Char('m')));
        assert!(!app.coach.panel_visible());
        app.on_key(key(KeyCode::Char('m')));
        assert!(app.coach.panel_visible());

        app.on_key(key(KeyCode::Char('s')));
        // resting between steps
        app.on_key(key(KeyCode::Char('c')));
        assert_eq!(app.status.as_deref(), Some("resting between steps"));
    }

    #[test]
    fn test_second_message_is_rejected_with_status() {
        let mut app = app();
        type_line(&mut app, "ankle");
        // typed text goes to the input once it is non-empty
        type_line(&mut app, "hip");
        assert_eq!(
            app.status.as_deref(),
            Some("an exercise sequence is already in progress")
        );
    }

    #[test]
    fn test_plain_phrases_control_running_routine() {
        let mut app = app();
        // idle: a phrase is just a message
        type_line(&mut app, "done sitting, my ankle hurts");
        assert!(app.coach.is_exercising());

        type_line(&mut app, "next step");
        assert_eq!(app.status, None);
        assert!(matches!(
            app.coach.sequencer().state(),
            SequencerState::Resting { .. }
        ));
    }

    #[test]
    fn test_plain_phrases_need_voice_commands() {
        let config = SessionConfig {
            voice_commands: false,
            ..SessionConfig::default()
        };
        let coach = Coach::new(
            config,
            SystemClock::new(),
            Box::new(Canned),
            Box::new(SilentAnnouncer),
        );
        let mut app = App::new(coach, Settings::default());
        type_line(&mut app, "ankle");

        type_line(&mut app, "next step");
        assert_eq!(
            app.status.as_deref(),
            Some("an exercise sequence is already in progress")
        );
        type_line(&mut app, "/next step");
        assert_eq!(app.status, None);
    }

    #[test]
    fn test_slash_commands() {
        let mut app = app();
        type_line(&mut app, "/leaderboard");
        assert_eq!(app.state, AppState::Progress);
        app.on_key(key(KeyCode::Char('b')));
        assert_eq!(app.state, AppState::Chat);

        type_line(&mut app, "/skip");
        assert_eq!(app.status.as_deref(), Some("no exercise step is currently running"));

        type_line(&mut app, "/open settings");
        assert_eq!(app.state, AppState::Settings);
        app.on_key(key(KeyCode::Tab));

        type_line(&mut app, "/quit");
        assert!(app.should_quit);
    }

    #[test]
    fn test_tab_and_escape() {
        let mut app = app();
        app.on_key(key(KeyCode::Tab));
        assert_eq!(app.state, AppState::Progress);
        app.on_key(key(KeyCode::Tab));
        assert_eq!(app.state, AppState::Chat);

        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_render_chat_and_panel() {
        let mut app = app();
        let content = rendered(&mut app);
        assert!(content.contains("limber"));

        type_line(&mut app, "my ankle is sore");
        let content = rendered(&mut app);
        assert!(content.contains("Lift your heel"));
        assert!(content.contains("Step 1 of 2"));
        assert!(content.contains("0:30"));
    }

    #[test]
    fn test_render_progress_and_settings() {
        let mut app = app();
        app.state = AppState::Progress;
        let content = rendered(&mut app);
        assert!(content.contains("Alex Chen"));
        assert!(content.contains("Level 1"));

        app.state = AppState::Settings;
        let content = rendered(&mut app);
        assert!(content.contains("accessibility.speechRate"));
    }

    #[test]
    fn test_render_small_terminal() {
        let mut app = app();
        type_line(&mut app, "ankle");
        let mut terminal = Terminal::new(TestBackend::new(20, 6)).unwrap();
        terminal.draw(|f| ui(&mut app, f)).unwrap();
    }
}
