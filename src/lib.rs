// podtune library - core modules for the terminal podcast player
// Catalog, store, and playback are deliberately separate so each side
// can be exercised on its own

pub mod audio;   // rodio playback bridge and its notification events
pub mod catalog; // episode fetching and normalization
pub mod config;  // settings and preferences
pub mod player;  // the shared player state store
pub mod ui;      // terminal interface

// Export the stuff other modules actually use
pub use audio::{AudioPlayer, PlayerEvent};
pub use catalog::{Catalog, CatalogClient, Episode};
pub use config::Config;
pub use player::PlayerStore;
