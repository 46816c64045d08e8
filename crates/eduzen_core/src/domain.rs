//! crates/eduzen_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The image kinds accepted for note uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Png,
    Jpeg,
    WebP,
    Gif,
}

impl MediaKind {
    /// Maps a MIME type string to an accepted image kind.
    /// Returns `None` for anything that is not one of the supported images.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }
}

/// A user-supplied image that has been written to blob storage.
/// Immutable once the durable reference has been obtained.
#[derive(Debug, Clone)]
pub struct UploadedMedia {
    pub durable_url: String,
    pub original_name: String,
    pub kind: MediaKind,
}

/// The outcome of running OCR over an uploaded image.
/// Empty text is a valid terminal result, not an error.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub media_url: String,
    pub text: String,
}

impl ExtractionResult {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A natural-language summary of extracted note text.
#[derive(Debug, Clone)]
pub struct SummaryResult {
    pub source_chars: usize,
    pub summary_text: String,
}

/// A single multiple-choice question produced by the quiz generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl QuizQuestion {
    pub const OPTION_COUNT: usize = 4;

    /// A question is well formed when it carries exactly four options and the
    /// correct-answer index points at one of them. Generated quiz data is
    /// untrusted input, so this is re-checked after every parse.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == Self::OPTION_COUNT && self.correct_index < self.options.len()
    }
}

/// Validates an externally generated quiz: at least one question, and every
/// question individually well formed.
pub fn quiz_is_well_formed(questions: &[QuizQuestion]) -> bool {
    !questions.is_empty() && questions.iter().all(QuizQuestion::is_well_formed)
}

/// The aggregate record of one completed study-companion run.
/// Append-only: once submitted to the document store it is never mutated.
#[derive(Debug, Clone)]
pub struct StudySession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub media_url: String,
    pub extracted_text: String,
    pub summary_text: String,
    pub quiz: Vec<QuizQuestion>,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

/// One entry in the well-being chat transcript. The transcript is an ordered,
/// append-only list held in memory for the lifetime of the chat connection.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_error: bool,
}

impl ChatMessage {
    pub fn from_user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    pub fn from_assistant(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    /// An assistant message that marks a failed turn. Failed turns stay
    /// visible in the transcript rather than being dropped silently.
    pub fn assistant_error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::from_assistant(text)
        }
    }
}

/// The advisory valence score for a chat message. Transient: it only ever
/// triggers a breathing-exercise suggestion and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentScore {
    /// Ranges from -1.0 (negative) to 1.0 (positive).
    pub score: f32,
    /// Overall strength of emotion, >= 0.
    pub magnitude: f32,
}

impl SentimentScore {
    /// The neutral default used when scoring is unavailable.
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            magnitude: 0.0,
        }
    }

    /// Whether the message suggests the user is stressed. Both comparisons
    /// are strict: a score of exactly -0.3 or a magnitude of exactly 0.8
    /// does not count.
    pub fn is_stressed(&self) -> bool {
        self.score < -0.3 || self.magnitude > 0.8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_accepts_images_only() {
        assert_eq!(MediaKind::from_mime("image/png"), Some(MediaKind::Png));
        assert_eq!(MediaKind::from_mime("IMAGE/JPEG"), Some(MediaKind::Jpeg));
        assert_eq!(MediaKind::from_mime("application/pdf"), None);
        assert_eq!(MediaKind::from_mime("text/plain"), None);
    }

    #[test]
    fn quiz_question_shape_is_enforced() {
        let good = QuizQuestion {
            prompt: "What does photosynthesis produce?".into(),
            options: vec!["Energy".into(), "Salt".into(), "Iron".into(), "Sound".into()],
            correct_index: 0,
        };
        assert!(good.is_well_formed());

        let mut out_of_range = good.clone();
        out_of_range.correct_index = 4;
        assert!(!out_of_range.is_well_formed());

        let mut too_few = good.clone();
        too_few.options.pop();
        assert!(!too_few.is_well_formed());

        assert!(quiz_is_well_formed(&[good.clone()]));
        assert!(!quiz_is_well_formed(&[]));
        assert!(!quiz_is_well_formed(&[good, out_of_range]));
    }

    #[test]
    fn stressed_when_score_is_clearly_negative() {
        let s = SentimentScore {
            score: -0.5,
            magnitude: 0.2,
        };
        assert!(s.is_stressed());
    }

    #[test]
    fn not_stressed_for_mild_positive() {
        let s = SentimentScore {
            score: 0.1,
            magnitude: 0.1,
        };
        assert!(!s.is_stressed());
    }

    #[test]
    fn score_boundary_is_exclusive() {
        let s = SentimentScore {
            score: -0.3,
            magnitude: 0.0,
        };
        assert!(!s.is_stressed());
    }

    #[test]
    fn magnitude_boundary_is_exclusive() {
        let s = SentimentScore {
            score: 0.0,
            magnitude: 0.8,
        };
        assert!(!s.is_stressed());
    }

    #[test]
    fn high_magnitude_alone_counts_as_stressed() {
        let s = SentimentScore {
            score: 0.2,
            magnitude: 0.9,
        };
        assert!(s.is_stressed());
    }

    #[test]
    fn empty_extraction_is_a_valid_result() {
        let r = ExtractionResult {
            media_url: "https://storage.example/notes/1_a.png".into(),
            text: "  \n".into(),
        };
        assert!(!r.has_text());
    }
}
