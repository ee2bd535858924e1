// Episode catalog - fetches the show's episode list from the backend API
// and normalizes it for display (dates, duration strings, latest/all split)

mod client;

pub use client::{normalize, CatalogClient, RawEpisode, RawFile};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("episodes request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unrecognized publish date '{0}'")]
    Date(String),
}

/// A single episode as shown in the catalog and loaded into the player.
/// Immutable once normalized from the API payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub members: String,
    pub thumbnail: String,
    pub description: String,
    /// Duration in whole seconds, straight from the API.
    pub duration: u32,
    /// Duration rendered as m:ss or h:mm:ss.
    pub duration_as_string: String,
    /// Media URL handed to the playback layer.
    pub url: String,
    /// Publish date rendered for display, e.g. "8 Jan 21".
    pub published_at: String,
}

/// The catalog as rendered on the home screen: the two most recent
/// episodes get their own section, the rest go into the main table.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub latest_episodes: Vec<Episode>,
    pub all_episodes: Vec<Episode>,
}

impl Catalog {
    /// Split an already-sorted-descending episode list into latest (first 2)
    /// and the remainder.
    pub fn from_episodes(mut episodes: Vec<Episode>) -> Self {
        let split = episodes.len().min(2);
        let all_episodes = episodes.split_off(split);
        Self {
            latest_episodes: episodes,
            all_episodes,
        }
    }

    pub fn len(&self) -> usize {
        self.latest_episodes.len() + self.all_episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest_episodes.is_empty() && self.all_episodes.is_empty()
    }

    /// Look up an episode by its position in the combined display order.
    pub fn get(&self, index: usize) -> Option<&Episode> {
        if index < self.latest_episodes.len() {
            self.latest_episodes.get(index)
        } else {
            self.all_episodes.get(index - self.latest_episodes.len())
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Episode> {
        self.latest_episodes.iter().chain(self.all_episodes.iter())
    }

    /// The full display order as an owned list, ready to hand to
    /// `PlayerStore::play_list` together with the selected index.
    pub fn playlist(&self) -> Vec<Episode> {
        self.iter().cloned().collect()
    }
}

/// Render a duration in seconds as m:ss, or h:mm:ss once it crosses an hour.
pub fn format_duration(duration: u32) -> String {
    let hours = duration / 3600;
    let minutes = (duration % 3600) / 60;
    let seconds = duration % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Render an API publish date for display. The backend is loose about the
/// exact shape, so accept RFC 3339 as well as the bare datetime/date forms.
pub fn format_publish_date(raw: &str) -> Result<String, CatalogError> {
    let date = if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        parsed.date_naive()
    } else if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        parsed.date()
    } else if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        parsed
    } else {
        return Err(CatalogError::Date(raw.to_string()));
    };

    Ok(date.format("%-d %b %y").to_string())
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
            duration: 60,
            duration_as_string: "1:00".to_string(),
            url: format!("http://media.test/{}.mp3", id),
            published_at: "8 Jan 21".to_string(),
        }
    }

    #[test]
    fn test_duration_formatting_boundaries() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(60), "1:00");
        assert_eq!(format_duration(3599), "59:59");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(5400), "1:30:00");
    }

    #[test]
    fn test_publish_date_formats() {
        assert_eq!(format_publish_date("2021-01-08 12:00:00").unwrap(), "8 Jan 21");
        assert_eq!(
            format_publish_date("2021-03-20T10:30:00.000Z").unwrap(),
            "20 Mar 21"
        );
        assert_eq!(format_publish_date("2021-11-02").unwrap(), "2 Nov 21");
        assert!(format_publish_date("not a date").is_err());
    }

    #[test]
    fn test_catalog_split() {
        let catalog = Catalog::from_episodes(vec![episode("a"), episode("b"), episode("c")]);
        assert_eq!(catalog.latest_episodes.len(), 2);
        assert_eq!(catalog.all_episodes.len(), 1);
        assert_eq!(catalog.latest_episodes[0].id, "a");
        assert_eq!(catalog.all_episodes[0].id, "c");
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_catalog_split_short_lists() {
        let one = Catalog::from_episodes(vec![episode("a")]);
        assert_eq!(one.latest_episodes.len(), 1);
        assert!(one.all_episodes.is_empty());

        let two = Catalog::from_episodes(vec![episode("a"), episode("b")]);
        assert_eq!(two.latest_episodes.len(), 2);
        assert!(two.all_episodes.is_empty());

        let none = Catalog::from_episodes(Vec::new());
        assert!(none.is_empty());
    }

    #[test]
    fn test_catalog_indexing_matches_display_order() {
        let catalog = Catalog::from_episodes(vec![episode("a"), episode("b"), episode("c")]);
        assert_eq!(catalog.get(0).unwrap().id, "a");
        assert_eq!(catalog.get(2).unwrap().id, "c");
        assert!(catalog.get(3).is_none());

        let playlist = catalog.playlist();
        let ids: Vec<&str> = playlist.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
