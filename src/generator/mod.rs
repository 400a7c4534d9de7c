pub mod distractor;
pub mod draft;
pub mod sentences;

use thiserror::Error;

use crate::question::Question;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("extracted text is empty")]
    EmptyText,
    #[error("extracted text is too short to draft from ({len} chars, need {min})")]
    TextTooShort { len: usize, min: usize },
    #[error("no sentence in the text is long enough to draft a question")]
    NoCandidates,
}

pub trait QuestionDrafter {
    fn draft_all(&mut self, raw_text: &str, default_topic: &str)
    -> Result<Vec<Question>, DraftError>;
}

/// Gate applied to upstream extraction output before any drafting happens.
pub fn ensure_draftable(text: &str, min_chars: usize) -> Result<(), DraftError> {
    let len = sentences::normalize_whitespace(text).chars().count();
    if len == 0 {
        return Err(DraftError::EmptyText);
    }
    if len < min_chars {
        return Err(DraftError::TextTooShort { len, min: min_chars });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_draftable() {
        assert_eq!(ensure_draftable(" \n\t ", 40), Err(DraftError::EmptyText));
        assert_eq!(
            ensure_draftable("just a few words", 40),
            Err(DraftError::TextTooShort { len: 16, min: 40 })
        );
        assert!(ensure_draftable(&"word ".repeat(20), 40).is_ok());
    }
}
