//! Study videos: listing a user's generated videos and requesting new ones.
//!
//! Generation happens elsewhere; this only decides how each URL is played.

use serde_json::{Value, json};

use crate::domain::Bahasa;
use crate::endpoints;
use crate::error::{PortalError, Result};
use crate::gateway::Gateway;

const VIDEO_EXTENSIONS: [&str; 9] = [".mp4", ".webm", ".ogg", ".mov", ".mkv", ".avi", ".wmv", ".flv", ".m4v"];

const YOUTUBE_MARKERS: [&str; 4] = ["youtu.be/", "youtube.com/embed/", "youtube.com/v/", "youtube.com/watch?v="];

const YOUTUBE_ID_LEN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoKind {
  /// Embedded YouTube player
  YouTube,
  /// File the client can play natively
  Native,
  /// Anything else, shown in a frame
  Iframe,
  /// No URL at all
  Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudyVideo {
  pub kind: VideoKind,
  pub src: String,
  pub prompt: Option<String>,
}

/// Resolve a stored video URL to something playable.
///
/// Relative URLs are joined onto `media_base` with exactly one slash.
pub fn classify_video_url(url: &str, media_base: &str) -> (VideoKind, String) {
  let url = url.trim();
  if url.is_empty() {
    return (VideoKind::Unknown, String::new());
  }

  let lower = url.to_ascii_lowercase();
  let full = if lower.starts_with("http://") || lower.starts_with("https://") {
    url.to_string()
  } else {
    format!("{}/{}", media_base.trim_end_matches('/'), url.trim_start_matches('/'))
  };

  if let Some(id) = youtube_id(&full) {
    return (VideoKind::YouTube, format!("https://www.youtube.com/embed/{}", id));
  }

  let lower_full = full.to_ascii_lowercase();
  if VIDEO_EXTENSIONS.iter().any(|ext| lower_full.ends_with(ext)) {
    return (VideoKind::Native, full);
  }
  (VideoKind::Iframe, full)
}

fn youtube_id(url: &str) -> Option<&str> {
  YOUTUBE_MARKERS.iter().find_map(|marker| {
    let start = url.find(marker)? + marker.len();
    let rest = &url[start..];
    let len = rest
      .chars()
      .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
      .count();
    (len >= YOUTUBE_ID_LEN).then(|| &rest[..YOUTUBE_ID_LEN])
  })
}

fn parse_videos(body: &Value, media_base: &str) -> Vec<StudyVideo> {
  let Some(list) = body.as_array() else {
    return Vec::new();
  };
  list
    .iter()
    .map(|item| {
      let url = item.get("video_url").and_then(Value::as_str).unwrap_or_default();
      let (kind, src) = classify_video_url(url, media_base);
      StudyVideo {
        kind,
        src,
        prompt: item
          .get("prompt")
          .and_then(Value::as_str)
          .filter(|p| !p.trim().is_empty())
          .map(str::to_string),
      }
    })
    .collect()
}

/// A user's study videos.
#[derive(Debug, Clone)]
pub struct VideoLibrary {
  media_base: String,
  videos: Vec<StudyVideo>,
}

impl VideoLibrary {
  pub fn new(media_base: &str) -> Self {
    Self {
      media_base: media_base.trim_end_matches('/').to_string(),
      videos: Vec::new(),
    }
  }

  pub fn videos(&self) -> &[StudyVideo] {
    &self.videos
  }

  pub async fn list<G: Gateway>(&mut self, gateway: &G, user_id: &str) -> Result<&[StudyVideo]> {
    let body = gateway.get(&endpoints::user_videos(user_id)).await?;
    self.videos = parse_videos(&body, &self.media_base);
    tracing::debug!(user_id, count = self.videos.len(), "Loaded study videos");
    Ok(&self.videos)
  }

  /// Ask for a new video, then refresh the list. A failed refresh keeps
  /// the previous list.
  pub async fn request_video<G: Gateway>(
    &mut self,
    gateway: &G,
    prompt: &str,
    user_id: &str,
    bahasa: Bahasa,
  ) -> Result<&[StudyVideo]> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
      return Err(PortalError::validation("Please enter a prompt"));
    }
    gateway
      .post(endpoints::VIDEO_CREATE, json!({"prompt": prompt, "user_id": user_id, "bahasa": bahasa.video_code()}))
      .await?;
    tracing::info!(user_id, "Study video requested");

    if let Err(e) = self.list(gateway, user_id).await {
      tracing::warn!("Video requested but refreshing the list failed: {}", e);
    }
    Ok(&self.videos)
  }
}
