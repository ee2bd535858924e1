use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    // UI events
    Quit,
    Tick,
    Render,

    // Transport events
    TogglePlayPause,
    NextEpisode,
    PreviousEpisode,
    SeekForward,
    SeekBack,

    // Mode toggles
    ToggleShuffle,
    ToggleLoop,

    // Navigation events
    Up,
    Down,
    Enter,

    // Volume events
    VolumeUp,
    VolumeDown,

    // Catalog events
    RefreshCatalog,
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.event_sender.clone()
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    /// Pump terminal input into the app channel, interleaved with periodic
    /// ticks that drive progress updates and finished-playback checks.
    /// Runs on its own task for the lifetime of the app.
    pub async fn forward_terminal_events(
        sender: mpsc::UnboundedSender<AppEvent>,
        tick_rate: Duration,
    ) -> Result<()> {
        loop {
            if event::poll(Duration::from_millis(50))? {
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind == KeyEventKind::Press {
                            if let Some(app_event) = key_to_app_event(key) {
                                let _ = sender.send(app_event);
                            }
                        }
                    }
                    Event::Resize(_, _) => {
                        let _ = sender.send(AppEvent::Render);
                    }
                    _ => {}
                }
            }

            let _ = sender.send(AppEvent::Tick);
            tokio::time::sleep(tick_rate).await;
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn key_to_app_event(key: KeyEvent) -> Option<AppEvent> {
    match key.code {
        // Quit
        KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Quit),

        // Transport
        KeyCode::Char(' ') => Some(AppEvent::TogglePlayPause),
        KeyCode::Char('n') => Some(AppEvent::NextEpisode),
        KeyCode::Char('p') => Some(AppEvent::PreviousEpisode),
        KeyCode::Right => Some(AppEvent::SeekForward),
        KeyCode::Left => Some(AppEvent::SeekBack),

        // Modes
        KeyCode::Char('z') => Some(AppEvent::ToggleShuffle),
        KeyCode::Char('r') => Some(AppEvent::ToggleLoop),

        // Navigation
        KeyCode::Up => Some(AppEvent::Up),
        KeyCode::Down => Some(AppEvent::Down),
        KeyCode::Enter => Some(AppEvent::Enter),

        // Volume
        KeyCode::Char('+') | KeyCode::Char('=') => Some(AppEvent::VolumeUp),
        KeyCode::Char('-') => Some(AppEvent::VolumeDown),

        // Catalog
        KeyCode::F(5) => Some(AppEvent::RefreshCatalog),

        _ => None,
    }
}
