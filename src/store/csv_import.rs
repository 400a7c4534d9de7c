use rand::Rng;
use thiserror::Error;

use crate::engine::difficulty::Difficulty;
use crate::question::{self, DEFAULT_TOPIC, Question, clamp_answer_index};

/// question, optionA..D, answerIndex, explanation are required.
pub const MIN_FIELDS: usize = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("expected at least {MIN_FIELDS} fields, found {0}")]
    TooFewFields(usize),
    #[error("question text is empty")]
    EmptyPrompt,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub questions: Vec<Question>,
    /// (1-based line number, reason)
    pub skipped: Vec<(usize, RowError)>,
}

/// Split one line on commas, honouring double-quoted fields and `""` escapes.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

fn is_header(fields: &[String]) -> bool {
    fields
        .first()
        .is_some_and(|f| f.eq_ignore_ascii_case("question"))
}

pub fn parse_row<R: Rng + ?Sized>(fields: &[String], rng: &mut R) -> Result<Question, RowError> {
    if fields.len() < MIN_FIELDS {
        return Err(RowError::TooFewFields(fields.len()));
    }
    let prompt = fields[0].clone();
    if prompt.is_empty() {
        return Err(RowError::EmptyPrompt);
    }
    let options = fields[1..5].to_vec();
    let answer_index = clamp_answer_index(fields[5].parse::<i64>().unwrap_or(0));
    let topic = fields
        .get(7)
        .filter(|t| !t.is_empty())
        .map(String::as_str)
        .unwrap_or(DEFAULT_TOPIC);
    let difficulty = fields
        .get(8)
        .map(|d| Difficulty::parse_lenient(d))
        .unwrap_or_default();

    Ok(Question::new(
        question::new_id(rng),
        prompt,
        options,
        answer_index,
        topic,
        difficulty,
    )
    .with_explanation(fields[6].clone()))
}

/// Parse bulk-import text. Malformed rows are skipped, never fatal.
pub fn parse_csv<R: Rng + ?Sized>(text: &str, rng: &mut R) -> ImportReport {
    let mut report = ImportReport::default();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(line);
        if i == 0 && is_header(&fields) {
            continue;
        }
        match parse_row(&fields, rng) {
            Ok(q) => report.questions.push(q),
            Err(e) => {
                log::warn!("csv line {}: skipped, {e}", i + 1);
                report.skipped.push((i + 1, e));
            }
        }
    }
    log::info!(
        "csv import: {} questions, {} rows skipped",
        report.questions.len(),
        report.skipped.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn test_split_fields_handles_quotes() {
        let fields = split_fields(r#"What is 1,000 + 1?,"1,001",999,"say ""hi""",0, 0 ,x"#);
        assert_eq!(
            fields,
            vec!["What is 1", "000 + 1?", "1,001", "999", "say \"hi\"", "0", "0", "x"]
        );
    }

    #[test]
    fn test_parse_full_and_minimal_rows() {
        let text = "question,a,b,c,d,answer,explanation,topic,difficulty\n\
            Capital of France?,Paris,Rome,Berlin,Madrid,0,It is Paris,Geography,hard\n\
            2+2?,3,4,5,6,1,basic math\n";
        let mut rng = SmallRng::seed_from_u64(1);
        let report = parse_csv(text, &mut rng);
        assert!(report.skipped.is_empty());
        assert_eq!(report.questions.len(), 2);

        let first = &report.questions[0];
        assert_eq!(first.correct_option(), "Paris");
        assert_eq!(first.topic, "Geography");
        assert_eq!(first.difficulty, Difficulty::Hard);
        assert_eq!(first.explanation.as_deref(), Some("It is Paris"));

        let second = &report.questions[1];
        assert_eq!(second.topic, "General");
        assert_eq!(second.difficulty, Difficulty::Easy);
        assert_eq!(second.correct_option(), "4");
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let text = "Only,three,fields\nQ?,a,b,c,d,2,why\n";
        let mut rng = SmallRng::seed_from_u64(2);
        let report = parse_csv(text, &mut rng);
        assert_eq!(report.questions.len(), 1);
        assert_eq!(report.skipped, vec![(1, RowError::TooFewFields(3))]);
    }

    #[test]
    fn test_answer_index_is_clamped() {
        let text = "Q1?,a,b,c,d,9,e\nQ2?,a,b,c,d,-4,e\nQ3?,a,b,c,d,abc,e\n";
        let mut rng = SmallRng::seed_from_u64(3);
        let report = parse_csv(text, &mut rng);
        let indexes: Vec<usize> = report.questions.iter().map(|q| q.answer_index).collect();
        assert_eq!(indexes, vec![3, 0, 0]);
    }

    #[test]
    fn test_empty_prompt_is_skipped() {
        let mut rng = SmallRng::seed_from_u64(4);
        let report = parse_csv(",a,b,c,d,0,e\n", &mut rng);
        assert!(report.questions.is_empty());
        assert_eq!(report.skipped, vec![(1, RowError::EmptyPrompt)]);
    }
}
