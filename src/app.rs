use crate::cache::PersistentStore;
use crate::event::{Event, EventHandler};
use crate::fetch::{CatalogState, FetchOutcome, Orchestrator};
use crate::pokeapi::client::PokeApiClient;
use crate::ui;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::future::Future;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Orchestrator wired to the live service and whichever durable store is configured.
pub type Dex = Orchestrator<PokeApiClient, Box<dyn PersistentStore>>;

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Search,
}

/// What woke the main loop
enum Wake {
  Input(Option<Event>),
  StateChanged(bool),
}

/// Main application state
pub struct App {
  dex: Dex,

  /// Published catalog state
  state: watch::Receiver<CatalogState>,

  /// Current input mode
  mode: Mode,

  /// Search input (after pressing /)
  search_input: String,

  /// Highlighted row in the list
  cursor: usize,

  /// One-shot notice shown in the status bar
  notice: Option<String>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(dex: Dex) -> Self {
    let state = dex.subscribe();
    Self {
      dex,
      state,
      mode: Mode::Normal,
      search_input: String::new(),
      cursor: 0,
      notice: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self, initial_page: u32) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    // Initial data load
    let page = initial_page.max(1);
    self.spawn(move |dex| async move { dex.fetch_page(page).await });

    let result = self.main_loop(&mut terminal, &mut events).await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      let state = self.state.borrow_and_update().clone();
      self.cursor = self.cursor.min(state.items.len().saturating_sub(1));

      // Draw UI
      terminal.draw(|frame| ui::draw(frame, self, &state))?;

      let wake = tokio::select! {
        event = events.next() => Wake::Input(event),
        changed = self.state.changed() => Wake::StateChanged(changed.is_ok()),
      };

      match wake {
        Wake::Input(Some(event)) => self.handle_event(event, &state),
        Wake::Input(None) | Wake::StateChanged(false) => break,
        Wake::StateChanged(true) => {}
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event, state: &CatalogState) {
    match event {
      Event::Key(key) => match self.mode {
        Mode::Normal => self.handle_normal_mode_key(key, state),
        Mode::Search => self.handle_search_mode_key(key),
      },
      Event::Resize | Event::Tick => {} // Redraw happens at the top of the loop
    }
  }

  fn handle_normal_mode_key(&mut self, key: KeyEvent, state: &CatalogState) {
    self.notice = None;

    match key.code {
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }
      KeyCode::Char('q') | KeyCode::Esc => {
        if state.selected.is_some() {
          self.dex.clear_selection();
        } else if key.code == KeyCode::Char('q') {
          self.should_quit = true;
        }
      }

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, state.items.len()),
      KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, state.items.len()),
      KeyCode::Enter => {
        if let Some(item) = state.items.get(self.cursor).cloned() {
          self.spawn(move |dex| async move { dex.select_detail(&item).await });
        }
      }

      // Paging
      KeyCode::Right | KeyCode::Char('n') => {
        let page = state.pagination.current_page.saturating_add(1);
        self.cursor = 0;
        self.spawn(move |dex| async move { dex.fetch_page(page).await });
      }
      KeyCode::Left | KeyCode::Char('p') => {
        let page = state.pagination.current_page.saturating_sub(1);
        self.cursor = 0;
        self.spawn(move |dex| async move { dex.fetch_page(page).await });
      }

      KeyCode::Char('r') => self.spawn(|dex| async move { dex.retry().await }),
      KeyCode::Char('C') => {
        let evicted = self.dex.clear_cache();
        self.notice = Some(format!(
          "Cache cleared ({} entries)",
          evicted.memory.max(evicted.durable)
        ));
      }

      // Mode switches
      KeyCode::Char('/') => {
        self.mode = Mode::Search;
      }

      _ => {}
    }
  }

  fn handle_search_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.search_input.clear();
        self.dex.search("");
      }
      KeyCode::Enter => {
        self.mode = Mode::Normal;
      }
      KeyCode::Backspace => {
        self.search_input.pop();
        self.cursor = 0;
        self.dex.search(&self.search_input);
      }
      KeyCode::Char(c) => {
        self.search_input.push(c);
        self.cursor = 0;
        self.dex.search(&self.search_input);
      }
      _ => {}
    }
  }

  fn move_cursor(&mut self, delta: i32, len: usize) {
    if len > 0 {
      self.cursor = (self.cursor as i32 + delta).rem_euclid(len as i32) as usize;
    }
  }

  /// Run an orchestrator operation in the background; its effect arrives as a state change.
  fn spawn<F, Fut>(&self, op: F)
  where
    F: FnOnce(Dex) -> Fut,
    Fut: Future<Output = FetchOutcome> + Send + 'static,
  {
    let fut = op(self.dex.clone());
    tokio::spawn(async move {
      let outcome = fut.await;
      debug!(?outcome, "operation settled");
    });
  }

  // Accessors for UI rendering
  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn search_input(&self) -> &str {
    &self.search_input
  }

  pub fn cursor(&self) -> usize {
    self.cursor
  }

  pub fn notice(&self) -> Option<&str> {
    self.notice.as_deref()
  }
}
