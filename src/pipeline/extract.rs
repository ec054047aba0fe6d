//! Reply extraction: find the JSON object in an LLM reply and decode it.
//!
//! Models are told to answer with a bare JSON object but routinely wrap it in
//! prose or a fenced code block anyway. [`JsonStrictness::Lenient`] tolerates
//! that by taking the greedy span from the first `{` to the last `}`;
//! [`JsonStrictness::Strict`] accepts only a reply that is the object itself.

use crate::config::JsonStrictness;
use crate::error::SkipReason;
use crate::output::Flashcard;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// The shape the prompt asks for. Missing keys decode to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StudyReply {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub flashcards: Option<Vec<Flashcard>>,
    #[serde(default)]
    pub search_query: Option<String>,
}

static RE_OUTER_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Locate the candidate JSON span in `reply`.
pub fn locate_object(reply: &str, strictness: JsonStrictness) -> Option<&str> {
    match strictness {
        JsonStrictness::Lenient => RE_OUTER_OBJECT.find(reply).map(|m| m.as_str()),
        JsonStrictness::Strict => {
            let trimmed = reply.trim();
            (trimmed.starts_with('{') && trimmed.ends_with('}')).then_some(trimmed)
        }
    }
}

/// Locate and decode the study reply.
pub fn parse_reply(reply: &str, strictness: JsonStrictness) -> Result<StudyReply, SkipReason> {
    let span = locate_object(reply, strictness).ok_or(SkipReason::NoJsonObject)?;
    serde_json::from_str(span).map_err(|e| SkipReason::InvalidJson {
        detail: format!("{e} from string: {span}"),
    })
}
