use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::engine::difficulty::Difficulty;
use crate::generator::distractor;
use crate::generator::sentences::{self, MAX_CANDIDATES};
use crate::generator::{DraftError, QuestionDrafter};
use crate::question::{self, OPTION_COUNT, Question};

pub const BLANK: &str = "_____";
const EDGE_WORDS: usize = 5;

/// Index of the word to blank out: the midpoint, kept at least
/// `EDGE_WORDS` away from both ends when the sentence is long enough.
pub fn blank_index(word_count: usize) -> usize {
    if word_count == 0 {
        return 0;
    }
    let mid = word_count / 2;
    if word_count >= EDGE_WORDS * 2 {
        mid.clamp(EDGE_WORDS, word_count - EDGE_WORDS)
    } else {
        mid.min(word_count - 1)
    }
}

/// Strip everything but alphanumerics and `%`.
pub fn clean_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '%')
        .collect()
}

/// The blanked token and its cleaned answer. Falls back to the nearest
/// token with something left after cleaning.
fn pick_blank(words: &[&str]) -> Option<(usize, String)> {
    let start = blank_index(words.len());
    let mut order = vec![start];
    for offset in 1..words.len() {
        if start + offset < words.len() {
            order.push(start + offset);
        }
        if offset <= start {
            order.push(start - offset);
        }
    }
    order.into_iter().find_map(|i| {
        let answer = clean_token(words[i]);
        (!answer.is_empty()).then_some((i, answer))
    })
}

/// Drafts fill-in-the-blank MCQs from raw text.
pub struct DraftEngine {
    rng: SmallRng,
    limit: usize,
}

impl DraftEngine {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            rng,
            limit: MAX_CANDIDATES,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(MAX_CANDIDATES);
        self
    }

    /// Lazy, single-pass sequence of drafts for `raw_text`.
    pub fn draft(&mut self, raw_text: &str, default_topic: &str) -> Drafts<'_> {
        let sentences = sentences::candidate_sentences(raw_text, self.limit);
        log::debug!("drafting from {} candidate sentences", sentences.len());
        Drafts {
            sentences: sentences.into_iter(),
            topic: default_topic.to_string(),
            rng: &mut self.rng,
            position: 0,
        }
    }
}

impl QuestionDrafter for DraftEngine {
    fn draft_all(
        &mut self,
        raw_text: &str,
        default_topic: &str,
    ) -> Result<Vec<Question>, DraftError> {
        let drafts: Vec<Question> = self.draft(raw_text, default_topic).collect();
        if drafts.is_empty() {
            return Err(DraftError::NoCandidates);
        }
        Ok(drafts)
    }
}

pub struct Drafts<'a> {
    sentences: std::vec::IntoIter<String>,
    topic: String,
    rng: &'a mut SmallRng,
    position: usize,
}

impl Drafts<'_> {
    fn draft_sentence(&mut self, sentence: &str) -> Option<Question> {
        let words: Vec<&str> = sentence.split(' ').filter(|w| !w.is_empty()).collect();
        let (index, answer) = pick_blank(&words)?;
        let token = words[index];

        // Only the first textual occurrence is blanked, even if it sits
        // inside an earlier word.
        let prompt = sentence.replacen(token, BLANK, 1);

        let mut options = distractor::distractors(&answer, OPTION_COUNT - 1, &mut *self.rng);
        options.push(answer.clone());
        options.shuffle(&mut *self.rng);
        let answer_index = options.iter().position(|o| *o == answer)?;

        let difficulty = Difficulty::cycle(self.position);
        let id = question::new_id(&mut *self.rng);
        Some(
            Question::new(id, prompt, options, answer_index, &self.topic, difficulty)
                .with_explanation(format!("The missing keyword is \"{answer}\".")),
        )
    }
}

impl Iterator for Drafts<'_> {
    type Item = Question;

    fn next(&mut self) -> Option<Question> {
        while let Some(sentence) = self.sentences.next() {
            if let Some(question) = self.draft_sentence(&sentence) {
                self.position += 1;
                return Some(question);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.sentences.len()))
    }
}
