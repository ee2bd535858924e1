use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{format_duration, format_publish_date, Catalog, CatalogError, Episode};

/// Episode record as the backend serves it, before normalization.
#[derive(Debug, Deserialize)]
pub struct RawEpisode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub members: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub description: String,
    pub published_at: String,
    pub file: RawFile,
}

#[derive(Debug, Deserialize)]
pub struct RawFile {
    pub url: String,
    pub duration: u32,
}

/// Turn a raw API record into the display-ready episode model.
pub fn normalize(raw: RawEpisode) -> Result<Episode, CatalogError> {
    Ok(Episode {
        id: raw.id,
        title: raw.title,
        members: raw.members,
        thumbnail: raw.thumbnail,
        description: raw.description,
        published_at: format_publish_date(&raw.published_at)?,
        duration: raw.file.duration,
        duration_as_string: format_duration(raw.file.duration),
        url: raw.file.url,
    })
}

/// HTTP client for the episodes backend. Fetches the catalog listing at
/// startup and episode media on demand; a listing failure at startup is
/// fatal by design, there is no retry or fallback content.
pub struct CatalogClient {
    http: Client,
    base_url: String,
    episode_limit: u32,
}

impl CatalogClient {
    pub fn new(base_url: String, episode_limit: u32) -> Self {
        Self {
            http: Client::new(),
            base_url,
            episode_limit,
        }
    }

    /// Fetch the newest episodes, sorted by publish date descending, and
    /// split them into the latest/all sections.
    pub async fn fetch_catalog(&self) -> Result<Catalog, CatalogError> {
        let url = format!("{}/episodes", self.base_url.trim_end_matches('/'));
        info!("Fetching episode catalog from {}", url);

        let limit = self.episode_limit.to_string();
        let raw: Vec<RawEpisode> = self
            .http
            .get(&url)
            .query(&[
                ("_limit", limit.as_str()),
                ("_sort", "published_at"),
                ("_order", "desc"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let episodes = raw
            .into_iter()
            .map(normalize)
            .collect::<Result<Vec<_>, _>>()?;
        info!("Loaded {} episodes from the catalog", episodes.len());

        Ok(Catalog::from_episodes(episodes))
    }

    /// Download an episode's media file in full. Decoding is left to the
    /// playback layer.
    pub async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        debug!("Downloading media from {}", url);
        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    [
        {
            "id": "a-importancia-da-contribuicao",
            "title": "Faladev #30",
            "members": "Diego and Tiago",
            "thumbnail": "https://cdn.test/thumb.jpg",
            "description": "Open source panel",
            "published_at": "2021-01-08 12:00:00",
            "file": {
                "url": "https://cdn.test/audio.m4a",
                "duration": 3981
            }
        }
    ]
    "#;

    #[test]
    fn test_normalize_sample_payload() {
        let raw: Vec<RawEpisode> = serde_json::from_str(SAMPLE).unwrap();
        let episode = normalize(raw.into_iter().next().unwrap()).unwrap();

        assert_eq!(episode.id, "a-importancia-da-contribuicao");
        assert_eq!(episode.title, "Faladev #30");
        assert_eq!(episode.members, "Diego and Tiago");
        assert_eq!(episode.duration, 3981);
        assert_eq!(episode.duration_as_string, "1:06:21");
        assert_eq!(episode.url, "https://cdn.test/audio.m4a");
        assert_eq!(episode.published_at, "8 Jan 21");
    }

    #[test]
    fn test_normalize_rejects_bad_date() {
        let mut raw: Vec<RawEpisode> = serde_json::from_str(SAMPLE).unwrap();
        let mut record = raw.pop().unwrap();
        record.published_at = "soonish".to_string();
        assert!(normalize(record).is_err());
    }

    #[test]
    fn test_optional_fields_default_empty() {
        let json = r#"
        {
            "id": "bare",
            "title": "Bare minimum",
            "published_at": "2021-02-01 09:00:00",
            "file": { "url": "https://cdn.test/bare.mp3", "duration": 65 }
        }
        "#;
        let raw: RawEpisode = serde_json::from_str(json).unwrap();
        let episode = normalize(raw).unwrap();
        assert_eq!(episode.members, "");
        assert_eq!(episode.thumbnail, "");
        assert_eq!(episode.duration_as_string, "1:05");
    }
}
