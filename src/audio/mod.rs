// Audio playback - wraps a rodio sink as the "native element" behind the
// player bar. Commands come in from the UI event loop; notifications go
// back out over the event channel so the store can be synced from what the
// sink actually did, instead of the two sides fighting each other.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::catalog::Episode;

#[derive(Debug, Clone, PartialEq)]
enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// Notifications from the playback layer. The UI applies these to the
/// store via `set_playing_state` and friends; they are records of what
/// happened, never commands.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    EpisodeStarted(Episode),
    EpisodePaused,
    EpisodeResumed,
    EpisodeStopped,
    EpisodeFinished(Episode),
    Error(String),
}

pub struct AudioPlayer {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Mutex<Option<Sink>>,
    // Episode and raw media bytes currently loaded; kept around so loop
    // mode can restart the same episode without another download. The
    // bytes sit behind an Arc so decoding never copies the whole file.
    current: Mutex<Option<(Episode, Arc<[u8]>)>>,
    state: Mutex<PlaybackState>,
    volume: Mutex<f32>,
    event_sender: Option<mpsc::UnboundedSender<PlayerEvent>>,
}

impl AudioPlayer {
    pub fn new(volume: f32) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()?;

        Ok(Self {
            _stream: stream,
            stream_handle,
            sink: Mutex::new(None),
            current: Mutex::new(None),
            state: Mutex::new(PlaybackState::Stopped),
            volume: Mutex::new(volume.clamp(0.0, 1.0)),
            event_sender: None,
        })
    }

    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<PlayerEvent>) {
        self.event_sender = Some(sender);
    }

    /// Load an episode's media and start playing it from the top, replacing
    /// whatever was on the sink before.
    pub fn play_episode(&self, episode: Episode, data: Vec<u8>) -> Result<()> {
        self.play_from(episode, data.into())
    }

    fn play_from(&self, episode: Episode, data: Arc<[u8]>) -> Result<()> {
        // Drop the old sink quietly; the Started event below carries the
        // state change, a Stopped notification here would be noise.
        if let Some(old) = self.sink.lock().unwrap().take() {
            old.stop();
        }

        let sink = Sink::try_new(&self.stream_handle)?;
        sink.set_volume(*self.volume.lock().unwrap());

        let source = match Decoder::new(Cursor::new(Arc::clone(&data))) {
            Ok(source) => source,
            Err(e) => {
                self.emit(PlayerEvent::Error(format!(
                    "Unsupported or corrupted media: {}",
                    e
                )));
                return Err(anyhow::anyhow!(
                    "Failed to decode media for '{}': {}",
                    episode.title,
                    e
                ));
            }
        };
        sink.append(source);

        *self.sink.lock().unwrap() = Some(sink);
        *self.current.lock().unwrap() = Some((episode.clone(), data));
        *self.state.lock().unwrap() = PlaybackState::Playing;

        info!("Playback started for '{}'", episode.title);
        self.emit(PlayerEvent::EpisodeStarted(episode));
        Ok(())
    }

    /// Restart the currently loaded episode from the top. Used by loop mode
    /// when playback runs off the end.
    pub fn replay(&self) -> Result<()> {
        let current = self.current.lock().unwrap().clone();
        match current {
            Some((episode, data)) => {
                debug!("Looping '{}'", episode.title);
                self.play_from(episode, data)
            }
            None => Ok(()),
        }
    }

    pub fn pause(&self) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.pause();
            *self.state.lock().unwrap() = PlaybackState::Paused;
            self.emit(PlayerEvent::EpisodePaused);
        }
    }

    pub fn resume(&self) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.play();
            *self.state.lock().unwrap() = PlaybackState::Playing;
            self.emit(PlayerEvent::EpisodeResumed);
        }
    }

    pub fn stop(&self) {
        if let Some(sink) = self.sink.lock().unwrap().take() {
            sink.stop();
        }
        *self.current.lock().unwrap() = None;
        *self.state.lock().unwrap() = PlaybackState::Stopped;
        self.emit(PlayerEvent::EpisodeStopped);
    }

    /// Jump to an absolute position in the current episode.
    pub fn seek(&self, position: Duration) -> Result<()> {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.try_seek(position)
                .map_err(|e| anyhow::anyhow!("Seek failed: {}", e))?;
        }
        Ok(())
    }

    /// Current playback position, the source of the displayed progress.
    pub fn position(&self) -> Duration {
        self.sink
            .lock()
            .unwrap()
            .as_ref()
            .map(|sink| sink.get_pos())
            .unwrap_or_default()
    }

    pub fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        *self.volume.lock().unwrap() = clamped;
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.set_volume(clamped);
        }
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock().unwrap()
    }

    /// Check whether a playing sink has drained, and if so emit the
    /// Finished notification exactly once. Called on every UI tick; this
    /// is the "ended" event of the playback layer.
    pub fn poll_finished(&self) {
        let finished = {
            let mut state = self.state.lock().unwrap();
            let drained = self
                .sink
                .lock()
                .unwrap()
                .as_ref()
                .map(|sink| sink.empty())
                .unwrap_or(false);

            if *state == PlaybackState::Playing && drained {
                *state = PlaybackState::Stopped;
                true
            } else {
                false
            }
        };

        if finished {
            // `current` stays loaded so loop mode can replay without a refetch.
            let episode = self
                .current
                .lock()
                .unwrap()
                .as_ref()
                .map(|(episode, _)| episode.clone());
            if let Some(episode) = episode {
                info!("Playback finished for '{}'", episode.title);
                self.emit(PlayerEvent::EpisodeFinished(episode));
            }
        }
    }

    fn emit(&self, event: PlayerEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }
}
