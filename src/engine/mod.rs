pub mod difficulty;
pub mod filter;
pub mod scoring;
pub mod stats;
pub mod streak;

pub use difficulty::{Difficulty, DifficultyAdapter, Shift};
