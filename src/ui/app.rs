use super::{AppEvent, EventHandler, TerminalManager};
use crate::audio::{AudioPlayer, PlayerEvent};
use crate::catalog::{format_duration, Catalog, CatalogClient};
use crate::config::Config;
use crate::player::PlayerStore;
use anyhow::Result;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct App {
    config: Config,
    terminal: TerminalManager,
    event_handler: EventHandler,
    client: CatalogClient,
    audio: AudioPlayer,
    audio_events: mpsc::UnboundedReceiver<PlayerEvent>,

    // State
    pub store: PlayerStore,
    pub catalog: Catalog,
    pub list_state: ListState,
    pub progress: u32,
    pub should_quit: bool,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let terminal = TerminalManager::new()?;
        let event_handler = EventHandler::new();

        // Load the catalog up front; a failing backend is fatal here,
        // there is no cached or fallback content to show instead.
        let client = CatalogClient::new(config.api.base_url.clone(), config.api.episode_limit);
        let catalog = client.fetch_catalog().await?;

        let (audio_sender, audio_events) = mpsc::unbounded_channel();
        let mut audio = AudioPlayer::new(config.ui.volume)?;
        audio.set_event_sender(audio_sender);

        let mut list_state = ListState::default();
        if !catalog.is_empty() {
            list_state.select(Some(0));
        }

        Ok(Self {
            config,
            terminal,
            event_handler,
            client,
            audio,
            audio_events,
            store: PlayerStore::new(),
            catalog,
            list_state,
            progress: 0,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let sender = self.event_handler.sender();
        let tick_rate = Duration::from_millis(self.config.ui.tick_rate_ms);
        tokio::spawn(async move {
            let _ = EventHandler::forward_terminal_events(sender, tick_rate).await;
        });

        while !self.should_quit {
            let volume = self.audio.volume();
            let Self {
                terminal,
                catalog,
                store,
                list_state,
                progress,
                ..
            } = self;

            terminal.draw(|f| {
                Self::render_ui(f, catalog, store, list_state, *progress, volume);
            })?;

            let event = self.event_handler.next_event().await;
            if let Some(event) = event {
                self.handle_event(event).await?;
            }
        }

        Ok(())
    }

    async fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Quit => {
                self.should_quit = true;
            }
            AppEvent::Tick => {
                self.on_tick().await?;
            }
            AppEvent::TogglePlayPause => {
                // Transport is dead while nothing is loaded
                if self.store.current_episode().is_some() {
                    self.store.toggle_play();
                    if self.store.is_playing() {
                        self.audio.resume();
                    } else {
                        self.audio.pause();
                    }
                }
            }
            AppEvent::NextEpisode => {
                if self.store.current_episode().is_some() && self.store.has_next() {
                    self.store.play_next();
                    self.start_current().await?;
                }
            }
            AppEvent::PreviousEpisode => {
                if self.store.has_previous() {
                    self.store.play_previous();
                    self.start_current().await?;
                }
            }
            AppEvent::SeekForward => {
                self.seek_relative(self.config.ui.seek_step_seconds as i64);
            }
            AppEvent::SeekBack => {
                self.seek_relative(-(self.config.ui.seek_step_seconds as i64));
            }
            AppEvent::ToggleShuffle => {
                // Shuffling a single-episode queue is meaningless
                if self.store.current_episode().is_some() && self.store.playlist_len() > 1 {
                    self.store.toggle_shuffle();
                }
            }
            AppEvent::ToggleLoop => {
                if self.store.current_episode().is_some() {
                    self.store.toggle_loop();
                }
            }
            AppEvent::Up => {
                self.move_selection(-1);
            }
            AppEvent::Down => {
                self.move_selection(1);
            }
            AppEvent::Enter => {
                if let Some(selected) = self.list_state.selected() {
                    let playlist = self.catalog.playlist();
                    if selected < playlist.len() {
                        self.store.play_list(playlist, selected);
                        self.start_current().await?;
                    }
                }
            }
            AppEvent::VolumeUp => {
                self.audio.set_volume(self.audio.volume() + 0.1);
            }
            AppEvent::VolumeDown => {
                self.audio.set_volume(self.audio.volume() - 0.1);
            }
            AppEvent::RefreshCatalog => {
                self.refresh_catalog().await;
            }
            AppEvent::Render => {}
        }

        Ok(())
    }

    /// Periodic housekeeping: apply playback notifications to the store and
    /// mirror the sink position into the displayed progress.
    async fn on_tick(&mut self) -> Result<()> {
        self.audio.poll_finished();

        while let Ok(event) = self.audio_events.try_recv() {
            match event {
                PlayerEvent::EpisodeStarted(_) | PlayerEvent::EpisodeResumed => {
                    self.store.set_playing_state(true);
                }
                PlayerEvent::EpisodePaused | PlayerEvent::EpisodeStopped => {
                    self.store.set_playing_state(false);
                }
                PlayerEvent::EpisodeFinished(_) => {
                    self.handle_episode_ended().await?;
                }
                PlayerEvent::Error(message) => {
                    warn!("Playback error: {}", message);
                }
            }
        }

        if self.store.is_playing() {
            self.progress = self.audio.position().as_secs() as u32;
        }

        Ok(())
    }

    /// The ended handler: loop restarts the same episode, otherwise advance
    /// when there is somewhere to go, otherwise the player goes idle.
    /// Playback failures here log and continue like everywhere else.
    async fn handle_episode_ended(&mut self) -> Result<()> {
        match apply_ended(&mut self.store) {
            EndedAction::Replay => {
                if let Err(e) = self.audio.replay() {
                    warn!("Failed to restart playback: {:#}", e);
                }
                self.progress = 0;
            }
            EndedAction::StartNext => {
                self.start_current().await?;
            }
            EndedAction::Stop => {
                self.audio.stop();
                self.progress = 0;
            }
        }
        Ok(())
    }

    /// Download and start the store's current episode. Media failures are
    /// reported, not fatal; the playback layer owns its own error surface.
    async fn start_current(&mut self) -> Result<()> {
        let Some(episode) = self.store.current_episode().cloned() else {
            self.audio.stop();
            return Ok(());
        };

        info!("Starting episode '{}'", episode.title);
        self.progress = 0;

        match self.client.fetch_media(&episode.url).await {
            Ok(data) => {
                if let Err(e) = self.audio.play_episode(episode, data) {
                    warn!("Failed to start playback: {:#}", e);
                }
            }
            Err(e) => {
                warn!("Failed to download media for '{}': {}", episode.title, e);
            }
        }

        Ok(())
    }

    fn seek_relative(&mut self, delta: i64) {
        let Some(duration) = self.store.current_episode().map(|e| e.duration) else {
            return;
        };

        let target = seek_target(self.progress, delta, duration);
        if let Err(e) = self.audio.seek(Duration::from_secs(target as u64)) {
            warn!("Seek failed: {:#}", e);
        }
        // Update the display right away instead of waiting for the next tick
        self.progress = target;
    }

    fn move_selection(&mut self, delta: i32) {
        if self.catalog.is_empty() {
            return;
        }

        let current = self.list_state.selected().unwrap_or(0);
        let new_index = if delta < 0 {
            current.saturating_sub((-delta) as usize)
        } else {
            (current + delta as usize).min(self.catalog.len() - 1)
        };

        self.list_state.select(Some(new_index));
    }

    async fn refresh_catalog(&mut self) {
        match self.client.fetch_catalog().await {
            Ok(catalog) => {
                info!("Catalog refreshed: {} episodes", catalog.len());
                self.catalog = catalog;
                match self.list_state.selected() {
                    Some(selected) if selected >= self.catalog.len() => {
                        self.list_state
                            .select(self.catalog.len().checked_sub(1));
                    }
                    None if !self.catalog.is_empty() => {
                        self.list_state.select(Some(0));
                    }
                    _ => {}
                }
            }
            Err(e) => {
                // Startup fetch failures are fatal, but a refresh keeps the
                // catalog we already have.
                warn!("Catalog refresh failed: {}", e);
            }
        }
    }

    fn render_ui(
        f: &mut Frame,
        catalog: &Catalog,
        store: &PlayerStore,
        list_state: &mut ListState,
        progress: u32,
        volume: f32,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Catalog + details
                Constraint::Length(6), // Player bar
            ])
            .split(f.area());

        Self::render_header(f, chunks[0]);
        Self::render_catalog(f, chunks[1], catalog, store, list_state);
        Self::render_player(f, chunks[2], store, progress, volume);
    }

    fn render_header(f: &mut Frame, area: Rect) {
        let title = Paragraph::new("♪ podtune - Terminal Podcast Player")
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));

        f.render_widget(title, area);
    }

    fn render_catalog(
        f: &mut Frame,
        area: Rect,
        catalog: &Catalog,
        store: &PlayerStore,
        list_state: &mut ListState,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(62), // Episode list
                Constraint::Percentage(38), // Selected episode details
            ])
            .split(area);

        let playing_id = store.current_episode().map(|episode| episode.id.as_str());
        let latest = catalog.latest_episodes.len();

        let items: Vec<ListItem> = catalog
            .iter()
            .enumerate()
            .map(|(i, episode)| {
                let is_playing = playing_id == Some(episode.id.as_str());
                let marker = if is_playing {
                    "♪ "
                } else if i < latest {
                    "★ " // latest releases section
                } else {
                    "  "
                };

                let content = format!(
                    "{}{} - {} ({} · {})",
                    marker,
                    episode.title,
                    episode.members,
                    episode.published_at,
                    episode.duration_as_string
                );

                let style = if is_playing {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if i < latest {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                };

                ListItem::new(content).style(style)
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Episodes"))
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("► ");

        f.render_stateful_widget(list, chunks[0], list_state);

        Self::render_details(f, chunks[1], catalog, list_state.selected());
    }

    fn render_details(f: &mut Frame, area: Rect, catalog: &Catalog, selected: Option<usize>) {
        let details: Vec<Line> = match selected.and_then(|i| catalog.get(i)) {
            Some(episode) => vec![
                Line::from(Span::styled(
                    episode.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(episode.members.clone()),
                Line::from(format!(
                    "{} · {}",
                    episode.published_at, episode.duration_as_string
                )),
                Line::from(""),
                Line::from(episode.description.clone()),
            ],
            None => vec![Line::from("No episode selected")],
        };

        let paragraph = Paragraph::new(details)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Details"));

        f.render_widget(paragraph, area);
    }

    fn render_player(f: &mut Frame, area: Rect, store: &PlayerStore, progress: u32, volume: f32) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(3)])
            .split(area);

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(60), // Now playing
                Constraint::Percentage(20), // Modes
                Constraint::Percentage(20), // Volume
            ])
            .split(rows[0]);

        let now_playing = match store.current_episode() {
            Some(episode) => format!("♪ {} - {}", episode.title, episode.members),
            None => "Select an episode to listen".to_string(),
        };
        let info_widget = Paragraph::new(now_playing)
            .block(Block::default().borders(Borders::ALL).title("Now Playing"));
        f.render_widget(info_widget, top[0]);

        let active = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
        let inactive = Style::default().fg(Color::DarkGray);
        let state_icon = if store.current_episode().is_none() {
            Span::styled("— idle", inactive)
        } else if store.is_playing() {
            Span::raw("▶ playing")
        } else {
            Span::raw("⏸ paused")
        };
        let modes = Line::from(vec![
            state_icon,
            Span::raw("  "),
            Span::styled("SHUF", if store.is_shuffling() { active } else { inactive }),
            Span::raw(" "),
            Span::styled("LOOP", if store.is_looping() { active } else { inactive }),
        ]);
        let modes_widget = Paragraph::new(modes)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Modes"));
        f.render_widget(modes_widget, top[1]);

        let volume_widget = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Volume"))
            .gauge_style(Style::default().fg(Color::Green))
            .ratio(volume.clamp(0.0, 1.0) as f64);
        f.render_widget(volume_widget, top[2]);

        let (ratio, label) = match store.current_episode() {
            Some(episode) if episode.duration > 0 => {
                let bounded = progress.min(episode.duration);
                (
                    bounded as f64 / episode.duration as f64,
                    format!(
                        "{} / {}",
                        format_duration(bounded),
                        episode.duration_as_string
                    ),
                )
            }
            Some(_) => (0.0, format!("{} / 0:00", format_duration(progress))),
            None => (0.0, "0:00 / 0:00".to_string()),
        };

        let progress_widget = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(Color::Magenta))
            .ratio(ratio.clamp(0.0, 1.0))
            .label(label);
        f.render_widget(progress_widget, rows[1]);
    }
}

/// What the audio side must do after playback runs off the end. The store
/// transition itself happens in `apply_ended`; the caller only issues the
/// matching playback command.
#[derive(Debug, Clone, Copy, PartialEq)]
enum EndedAction {
    /// Loop mode: restart the same episode from the top.
    Replay,
    /// The cursor advanced; start the new current episode.
    StartNext,
    /// Nothing left to play; the player goes idle.
    Stop,
}

/// The ended transition: loop replays, `has_next` advances the cursor,
/// otherwise the store clears.
fn apply_ended(store: &mut PlayerStore) -> EndedAction {
    if store.is_looping() {
        EndedAction::Replay
    } else if store.has_next() {
        store.play_next();
        EndedAction::StartNext
    } else {
        store.clear();
        EndedAction::Stop
    }
}

/// Clamp a relative seek to the bounds of the current episode.
fn seek_target(progress: u32, delta: i64, duration: u32) -> u32 {
    (progress as i64 + delta).clamp(0, duration as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Episode;

    fn episode(id: &str) -> Episode {
        Episode {
            id: id.to_string(),
            title: format!("Episode {}", id),
            members: "Hosts".to_string(),
            thumbnail: String::new(),
            description: String::new(),
            duration: 120,
            duration_as_string: "2:00".to_string(),
            url: format!("http://media.test/{}.mp3", id),
            published_at: "8 Jan 21".to_string(),
        }
    }

    fn store_at(index: usize) -> PlayerStore {
        let mut store = PlayerStore::new();
        store.play_list(vec![episode("a"), episode("b"), episode("c")], index);
        store
    }

    #[test]
    fn test_seek_lands_on_requested_position() {
        // Seeking to 45s of a 120s episode shows 45 right away; the value
        // comes straight from the clamp, not from a playback callback.
        assert_eq!(seek_target(0, 45, 120), 45);
    }

    #[test]
    fn test_seek_clamps_to_episode_bounds() {
        assert_eq!(seek_target(100, 45, 120), 120);
        assert_eq!(seek_target(5, -10, 120), 0);
        assert_eq!(seek_target(0, 0, 0), 0);
    }

    #[test]
    fn test_ended_with_next_advances() {
        let mut store = store_at(0);
        assert_eq!(apply_ended(&mut store), EndedAction::StartNext);
        assert_eq!(store.current_episode().unwrap().id, "b");
        assert!(store.is_playing());
    }

    #[test]
    fn test_ended_without_next_clears() {
        let mut store = store_at(2);
        assert_eq!(apply_ended(&mut store), EndedAction::Stop);
        assert!(store.current_episode().is_none());
        assert_eq!(store.playlist_len(), 0);
        assert!(!store.has_next());
        assert!(!store.has_previous());
    }

    #[test]
    fn test_ended_while_looping_replays_in_place() {
        let mut store = store_at(1);
        store.toggle_loop();
        assert_eq!(apply_ended(&mut store), EndedAction::Replay);
        assert_eq!(store.current_episode().unwrap().id, "b");
    }

    #[test]
    fn test_ended_while_shuffling_keeps_playing() {
        // At the tail of the playlist shuffle still has somewhere to go.
        let mut store = store_at(2);
        store.toggle_shuffle();
        assert_eq!(apply_ended(&mut store), EndedAction::StartNext);
        assert!(store.current_episode().is_some());
        assert!(store.current_index() < store.playlist_len());
    }
}
