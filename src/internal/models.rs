use jiff::Timestamp;
use serde::Deserialize;
use strum_macros::Display;

/// Kind of media a feed item carries.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

/// The backend emits tags either as bare slug strings or as full records.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Tag {
    Slug(String),
    Record { id: String, name: String, slug: String },
}

impl Tag {
    pub fn label(&self) -> &str {
        match self {
            Tag::Slug(s) => s,
            Tag::Record { name, .. } => name,
        }
    }
}

/// One item in the media feed, as returned by `GET /media`.
///
/// `has_watched` is relative to the requesting viewer and only ever moves
/// false -> true on the client; `reward` is in minor currency units.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MediaItem {
    pub id: String,
    #[serde(rename = "media_type")]
    pub kind: MediaKind,
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reward: u64,
    pub uploader_id: String,
    pub uploader_username: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub view_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub has_watched: bool,
    #[serde(default)]
    pub quiz_number: Option<u32>,
}

/// Pagination metadata accompanying every feed page.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

/// One server page of the feed. Ordering within the page is server-defined.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FeedPage {
    pub data: Vec<MediaItem>,
    pub meta: PageMeta,
}

/// A quiz question with four options; `answer` is the letter "A".."D".
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
}

impl QuizQuestion {
    pub fn options(&self) -> [&str; 4] {
        [
            &self.option_a,
            &self.option_b,
            &self.option_c,
            &self.option_d,
        ]
    }

    /// Map the stored answer letter to an option index (A=0 .. D=3).
    /// Unknown letters fall back to 0, matching the backend's own default.
    pub fn correct_index(&self) -> usize {
        match self.answer.trim() {
            "A" | "a" => 0,
            "B" | "b" => 1,
            "C" | "c" => 2,
            "D" | "d" => 3,
            _ => 0,
        }
    }
}

/// A quiz challenge attached to a watched media item.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct QuizChallenge {
    pub media_id: String,
    #[serde(default)]
    pub reward: u64,
    pub question: QuizQuestion,
}

/// Response to a watch-record call; a quiz may ride along.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WatchOutcome {
    pub trigger_quiz: bool,
    #[serde(default)]
    pub quiz_data: Option<QuizChallenge>,
}

/// Resolution of one quiz round, carried into the result view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    pub is_correct: bool,
    pub selected: Option<usize>,
    pub correct_index: usize,
    pub time_expired: bool,
}
