use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use quizdeck::engine::difficulty::Difficulty;
use quizdeck::engine::filter::TopicFilter;
use quizdeck::generator::QuestionDrafter;
use quizdeck::generator::draft::DraftEngine;
use quizdeck::question::Question;
use quizdeck::session::selector::build_session;

const PARAGRAPH: &str = "Photosynthesis converts light energy into chemical energy stored in glucose. \
    Mitochondria release that energy through cellular respiration in nearly every eukaryotic cell. \
    The nucleus holds chromosomes that carry the genetic instructions for building proteins. \
    Ribosomes translate messenger RNA into chains of amino acids inside the cytoplasm. ";

fn make_bank(count: usize) -> Vec<Question> {
    let topics = ["Biology", "Chemistry", "History", "Physics"];
    (0..count)
        .map(|i| {
            Question::new(
                format!("q{i}"),
                format!("prompt {i}"),
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                i % 4,
                topics[i % topics.len()],
                Difficulty::cycle(i),
            )
        })
        .collect()
}

fn bench_draft(c: &mut Criterion) {
    let text = PARAGRAPH.repeat(10);

    c.bench_function("draft_all (40 sentences)", |b| {
        b.iter(|| {
            let mut engine = DraftEngine::seeded(7);
            engine.draft_all(black_box(&text), "Biology")
        })
    });
}

fn bench_selection(c: &mut Criterion) {
    let bank = make_bank(5000);
    let filter = TopicFilter::from_label("Biology");
    let mut rng = SmallRng::seed_from_u64(11);

    c.bench_function("build_session (5000 bank)", |b| {
        b.iter(|| build_session(black_box(&bank), &filter, Difficulty::Normal, 10, &mut rng))
    });
}

criterion_group!(benches, bench_draft, bench_selection);
criterion_main!(benches);
