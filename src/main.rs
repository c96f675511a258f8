mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    ops::ControlFlow,
    path::PathBuf,
};
use tazza::{
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{Config, ConfigStore, FileConfigStore},
    content::Catalog,
    identity::{FileIdentityStore, Identity, IdentityProvider, UserId},
    logging,
    practice::{Practice, SaveStatus},
    report,
    results::{ResultsSink, SqliteResultsStore},
    runtime::{FixedTicker, PracticeEvent, Runner, TerminalEventSource},
    session::Snapshot,
};
use tracing::info;

/// typing practice with live feedback, accuracy and typo tracking
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Practice typing fixed texts in the terminal. Every keystroke is checked against the text, and finished sessions report speed, accuracy and the exact typos made. Log in to keep a history and see which keys trip you up most."
)]
pub struct Cli {
    /// config file to use instead of the default location
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// list the available practice texts
    List,
    /// practice a text (a random one when no id is given)
    Practice { id: Option<String> },
    /// remember who is practicing so results are saved
    Login { user: String },
    /// forget the current user
    Logout,
    /// show who is logged in
    Whoami,
    /// show average speed, accuracy and the most frequent typos
    Stats,
    /// show recent practice sessions
    History {
        /// number of sessions to show
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// write the full history as CSV to this file
        #[clap(long)]
        csv: Option<PathBuf>,
    },
    /// send a note about the app or suggest a practice text
    Feedback { message: String },
}

#[derive(Debug)]
pub struct App {
    pub practice: Practice,
    pub input: String,
    pub snapshot: Snapshot,
    pub save_status: Option<SaveStatus>,
}

impl App {
    pub fn new(practice: Practice) -> Self {
        let snapshot = practice.snapshot();
        Self {
            practice,
            input: String::new(),
            snapshot,
            save_status: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.practice.session().has_finished()
    }

    pub fn type_char(&mut self, c: char, identity: &dyn IdentityProvider, sink: &mut dyn ResultsSink) {
        if self.is_finished() {
            return;
        }
        self.input.push(c);
        self.submit(identity, sink);
    }

    pub fn backspace(&mut self, identity: &dyn IdentityProvider, sink: &mut dyn ResultsSink) {
        if self.is_finished() || self.input.pop().is_none() {
            return;
        }
        self.submit(identity, sink);
    }

    fn submit(&mut self, identity: &dyn IdentityProvider, sink: &mut dyn ResultsSink) {
        let update = self.practice.submit_input(&self.input, identity, sink);
        self.snapshot = update.snapshot;
        self.save_status = update.save_status;
    }

    /// Re-reads the elapsed time without touching the session
    pub fn refresh(&mut self) {
        self.snapshot = self.practice.snapshot();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ExitType {
    Restart,
    New,
    Quit,
}

#[derive(Debug, PartialEq)]
enum Action {
    Redraw,
    Ignore,
    Exit(ExitType),
}

fn handle_event(
    app: &mut App,
    event: PracticeEvent,
    identity: &dyn IdentityProvider,
    sink: &mut dyn ResultsSink,
) -> Action {
    match event {
        PracticeEvent::Tick => {
            if app.practice.session().has_started() && !app.is_finished() {
                app.refresh();
                Action::Redraw
            } else {
                Action::Ignore
            }
        }
        PracticeEvent::Resize => Action::Redraw,
        PracticeEvent::Key(key) => {
            if key.code == KeyCode::Esc
                || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
            {
                return Action::Exit(ExitType::Quit);
            }

            if app.is_finished() {
                return match key.code {
                    KeyCode::Char('r') => Action::Exit(ExitType::Restart),
                    KeyCode::Char('n') => Action::Exit(ExitType::New),
                    _ => Action::Ignore,
                };
            }

            if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                return Action::Ignore;
            }

            let typed = match key.code {
                KeyCode::Backspace => {
                    app.backspace(identity, sink);
                    return Action::Redraw;
                }
                KeyCode::Char(c) => c,
                KeyCode::Enter => '\n',
                KeyCode::Tab => '\t',
                _ => return Action::Ignore,
            };
            app.type_char(typed, identity, sink);
            Action::Redraw
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = cli
        .config
        .as_ref()
        .map(FileConfigStore::with_path)
        .unwrap_or_else(FileConfigStore::new);
    let config = config_store.load();

    // logging is best effort; a read-only state dir must not block practice
    if let Some(log_path) = AppDirs::log_path() {
        let _ = logging::init(&log_path, &config.log_filter);
    }

    let catalog = load_catalog(&config)?;
    let identity = FileIdentityStore::new();

    match cli.command.clone().unwrap_or(Command::Practice { id: None }) {
        Command::List => println!("{}", report::catalog_table(&catalog.list())),
        Command::Login { user } => {
            let user_id = identity.login(&user)?;
            println!("logged in as {user_id}");
        }
        Command::Logout => {
            identity.logout()?;
            println!("logged out");
        }
        Command::Whoami => match identity.current_user() {
            Identity::User(user_id) => println!("{user_id}"),
            Identity::Anonymous => println!("not logged in, results will not be saved"),
        },
        Command::Stats => {
            let user_id = require_user(&identity)?;
            let store = SqliteResultsStore::open(config.database_path())?;
            let summary = store.user_summary(&user_id)?;
            println!("{}", report::summary_text(&user_id, &summary));
        }
        Command::History { limit, csv } => {
            let user_id = require_user(&identity)?;
            let store = SqliteResultsStore::open(config.database_path())?;
            match csv {
                Some(path) => {
                    let rows = store.export_csv(&user_id, File::create(&path)?)?;
                    println!("wrote {rows} sessions to {}", path.display());
                }
                None => {
                    let sessions = store.recent_sessions(&user_id, limit)?;
                    println!("{}", report::history_table(&sessions));
                }
            }
        }
        Command::Feedback { message } => {
            let user_id = require_user(&identity)?;
            let mut store = SqliteResultsStore::open(config.database_path())?;
            store.submit_feedback(&user_id, &message)?;
            println!("thanks, your feedback was saved");
        }
        Command::Practice { id } => run_practice(&config, &catalog, &identity, id)?,
    }

    Ok(())
}

fn load_catalog(config: &Config) -> Result<Catalog, Box<dyn Error>> {
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::embedded()?,
    };
    Ok(catalog)
}

fn require_user(identity: &dyn IdentityProvider) -> Result<UserId, Box<dyn Error>> {
    match identity.current_user() {
        Identity::User(user_id) => Ok(user_id),
        Identity::Anonymous => Err("not logged in; run `tazza login <user>` first".into()),
    }
}

fn run_practice(
    config: &Config,
    catalog: &Catalog,
    identity: &dyn IdentityProvider,
    id: Option<String>,
) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let content_id = match id {
        Some(id) => id,
        None => catalog.random()?.id.clone(),
    };
    let practice = Practice::begin(catalog, &content_id)?;
    let mut store = SqliteResultsStore::open(config.database_path())?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(practice);
    let result = start_tui(
        &mut terminal,
        &mut app,
        catalog,
        identity,
        &mut store,
        config.tick_rate_ms,
    );

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    catalog: &Catalog,
    identity: &dyn IdentityProvider,
    store: &mut dyn ResultsSink,
    tick_rate_ms: u64,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(TerminalEventSource::new(), FixedTicker::from_millis(tick_rate_ms));

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        let exit = runner.run(None, |event| match handle_event(app, event, identity, store) {
            Action::Exit(exit_type) => ControlFlow::Break(Ok(exit_type)),
            Action::Ignore => ControlFlow::Continue(()),
            Action::Redraw => match terminal.draw(|f| ui::draw(app, f)) {
                Ok(_) => ControlFlow::Continue(()),
                Err(e) => ControlFlow::Break(Err(e)),
            },
        });

        match exit.unwrap_or(Ok(ExitType::Quit))? {
            ExitType::Restart => {
                let content = app.practice.content().clone();
                info!(id = %content.id, "restarting practice");
                *app = App::new(Practice::from_content(content, SystemClock));
            }
            ExitType::New => {
                let content = catalog.random()?.clone();
                *app = App::new(Practice::from_content(content, SystemClock));
            }
            ExitType::Quit => break,
        }
    }

    Ok(())
}
