use rand::Rng;
use rand::seq::SliceRandom;

use crate::engine::difficulty::Difficulty;
use crate::engine::filter::TopicFilter;
use crate::question::Question;

pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Filter the bank by topic and difficulty, shuffle, and keep at most
/// `sample_size`. An empty result is a valid outcome, not an error.
pub fn build_session<R: Rng + ?Sized>(
    bank: &[Question],
    filter: &TopicFilter,
    difficulty: Difficulty,
    sample_size: usize,
    rng: &mut R,
) -> Vec<Question> {
    let mut pool: Vec<Question> = bank
        .iter()
        .filter(|q| filter.matches(q, difficulty))
        .cloned()
        .collect();
    pool.shuffle(rng);
    pool.truncate(sample_size);

    log::debug!(
        "built session: topic={} difficulty={} size={}",
        filter.label(),
        difficulty,
        pool.len()
    );
    pool
}
