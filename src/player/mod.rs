// Player state store - the single source of truth for what is playing.
// Every UI branch reads and mutates this one store by handle; the audio
// layer never touches it directly, it only reports back through events.

use rand::Rng;
use tracing::info;

use crate::catalog::Episode;

/// Shared player state for one application session: the active playlist,
/// the cursor into it, and the three mode flags. All operations are total;
/// derived reads are computed on demand, never cached.
#[derive(Debug, Clone, Default)]
pub struct PlayerStore {
    playlist: Vec<Episode>,
    current_index: usize,
    is_playing: bool,
    is_looping: bool,
    is_shuffling: bool,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the playlist with a single episode and start playing it.
    pub fn play(&mut self, episode: Episode) {
        info!("Playing single episode '{}'", episode.title);
        self.playlist = vec![episode];
        self.current_index = 0;
        self.is_playing = true;
    }

    /// Adopt a playlist and start playing at `index`. The caller is
    /// responsible for handing in an index within bounds.
    pub fn play_list(&mut self, list: Vec<Episode>, index: usize) {
        info!("Playing list of {} episodes from index {}", list.len(), index);
        self.playlist = list;
        self.current_index = index;
        self.is_playing = true;
    }

    /// Advance the cursor: a uniform random pick when shuffling, otherwise
    /// one step forward. No-op at the end of the playlist (or when empty).
    pub fn play_next(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        if self.is_shuffling {
            self.current_index = rand::thread_rng().gen_range(0..self.playlist.len());
        } else if self.has_next() {
            self.current_index += 1;
        }
    }

    /// Step the cursor back by one; no-op at the head of the playlist.
    pub fn play_previous(&mut self) {
        if self.has_previous() {
            self.current_index -= 1;
        }
    }

    pub fn toggle_play(&mut self) {
        self.is_playing = !self.is_playing;
    }

    pub fn toggle_loop(&mut self) {
        self.is_looping = !self.is_looping;
    }

    pub fn toggle_shuffle(&mut self) {
        self.is_shuffling = !self.is_shuffling;
    }

    /// Sync the playing flag from playback-layer notifications. This is the
    /// feedback half of the play/pause bridge: it records state but issues
    /// no commands, so it cannot re-trigger the audio side.
    pub fn set_playing_state(&mut self, playing: bool) {
        self.is_playing = playing;
    }

    /// Drop the playlist and reset the cursor. The mode flags survive a
    /// clear; only the queue and cursor reset.
    pub fn clear(&mut self) {
        info!("Clearing player state");
        self.playlist.clear();
        self.current_index = 0;
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.playlist.get(self.current_index)
    }

    pub fn has_previous(&self) -> bool {
        self.current_index > 0
    }

    /// Whether advancing makes sense: shuffle always has somewhere to go
    /// (the pick may even land on the current episode), sequential advance
    /// needs a following entry. An empty playlist has nothing to offer
    /// either way.
    pub fn has_next(&self) -> bool {
        self.current_episode().is_some()
            && (self.is_shuffling || self.current_index + 1 < self.playlist.len())
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn playlist_len(&self) -> usize {
        self.playlist.len()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn is_shuffling(&self) -> bool {
        self.is_shuffling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn three_episode_store(index: usize) -> PlayerStore {
        let mut store = PlayerStore::new();
        store.play_list(vec![episode("a"), episode("b"), episode("c")], index);
        store
    }

    #[test]
    fn test_play_replaces_playlist_with_singleton() {
        let mut store = three_episode_store(2);
        store.play(episode("solo"));

        assert_eq!(store.playlist_len(), 1);
        assert_eq!(store.current_index(), 0);
        assert_eq!(store.current_episode().unwrap().id, "solo");
        assert!(store.is_playing());
    }

    #[test]
    fn test_play_list_sets_cursor_and_current_episode() {
        let store = three_episode_store(1);
        assert_eq!(store.current_index(), 1);
        assert_eq!(store.current_episode().unwrap().id, "b");
        assert!(store.is_playing());
    }

    #[test]
    fn test_has_previous_tracks_cursor() {
        assert!(!three_episode_store(0).has_previous());
        assert!(three_episode_store(1).has_previous());
        assert!(three_episode_store(2).has_previous());
    }

    #[test]
    fn test_has_next_sequential() {
        assert!(three_episode_store(0).has_next());
        assert!(three_episode_store(1).has_next());
        assert!(!three_episode_store(2).has_next());
    }

    #[test]
    fn test_has_next_always_true_while_shuffling() {
        let mut store = three_episode_store(2);
        assert!(!store.has_next());
        store.toggle_shuffle();
        assert!(store.has_next());
    }

    #[test]
    fn test_play_next_advances_by_one() {
        let mut store = three_episode_store(0);
        store.play_next();
        assert_eq!(store.current_index(), 1);
        store.play_next();
        assert_eq!(store.current_index(), 2);
    }

    #[test]
    fn test_play_next_is_noop_at_end() {
        let mut store = three_episode_store(2);
        store.play_next();
        assert_eq!(store.current_index(), 2);
    }

    #[test]
    fn test_play_next_shuffle_stays_in_range() {
        let mut store = three_episode_store(2);
        store.toggle_shuffle();
        for _ in 0..32 {
            store.play_next();
            assert!(store.current_index() < store.playlist_len());
            assert!(store.current_episode().is_some());
        }
    }

    #[test]
    fn test_play_previous_steps_back_by_one() {
        let mut store = three_episode_store(2);
        store.play_previous();
        assert_eq!(store.current_index(), 1);
        store.play_previous();
        assert_eq!(store.current_index(), 0);
    }

    #[test]
    fn test_play_previous_is_noop_at_head() {
        let mut store = three_episode_store(0);
        store.play_previous();
        assert_eq!(store.current_index(), 0);
    }

    #[test]
    fn test_toggles_are_involutions() {
        let mut store = three_episode_store(0);
        let playing = store.is_playing();
        store.toggle_play();
        store.toggle_play();
        assert_eq!(store.is_playing(), playing);

        store.toggle_loop();
        store.toggle_loop();
        assert!(!store.is_looping());

        store.toggle_shuffle();
        store.toggle_shuffle();
        assert!(!store.is_shuffling());
    }

    #[test]
    fn test_set_playing_state_overwrites_flag() {
        let mut store = three_episode_store(0);
        store.set_playing_state(false);
        assert!(!store.is_playing());
        store.set_playing_state(true);
        assert!(store.is_playing());
    }

    #[test]
    fn test_clear_empties_queue_and_derived_reads() {
        let mut store = three_episode_store(1);
        store.clear();

        assert!(store.current_episode().is_none());
        assert!(!store.has_next());
        assert!(!store.has_previous());
        assert_eq!(store.current_index(), 0);
        assert_eq!(store.playlist_len(), 0);
    }

    #[test]
    fn test_clear_leaves_mode_flags_alone() {
        let mut store = three_episode_store(0);
        store.toggle_loop();
        store.toggle_shuffle();
        store.clear();

        // Observed behavior from the start: a clear only drops the queue.
        assert!(store.is_looping());
        assert!(store.is_shuffling());
        assert!(store.is_playing());
    }

    #[test]
    fn test_has_next_false_on_cleared_store_even_while_shuffling() {
        let mut store = three_episode_store(0);
        store.toggle_shuffle();
        store.clear();
        assert!(!store.has_next());

        // And advancing an empty playlist goes nowhere.
        store.play_next();
        assert_eq!(store.current_index(), 0);
        assert!(store.current_episode().is_none());
    }

    #[test]
    fn test_last_episode_ends_without_next() {
        // Playlist [a, b, c] at c, no shuffle: the view's ended handler sees
        // has_next == false and clears the store.
        let mut store = three_episode_store(2);
        assert!(!store.has_next());

        store.clear();
        assert_eq!(store.playlist_len(), 0);
        assert!(store.current_episode().is_none());
    }
}
