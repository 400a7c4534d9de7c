use rand::Rng;

pub const MIN_DISTRACTOR_CHARS: usize = 3;
const MAX_EXTRA_CHARS: usize = 3;
const MAX_ATTEMPTS: usize = 24;
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

fn random_letters<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

fn change_case<R: Rng + ?Sized>(answer: &str, rng: &mut R) -> String {
    match rng.gen_range(0..3) {
        0 => answer.to_uppercase(),
        1 => answer.to_lowercase(),
        _ => {
            let mut chars = answer.chars();
            match chars.next() {
                Some(first) if first.is_uppercase() => {
                    first.to_lowercase().chain(chars).collect()
                }
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

fn with_suffix<R: Rng + ?Sized>(answer: &str, rng: &mut R) -> String {
    let len = rng.gen_range(2..=3);
    format!("{answer}{}", random_letters(rng, len))
}

/// Keep a leading slice of the answer and fill the rest with noise.
fn reshape<R: Rng + ?Sized>(answer: &str, rng: &mut R) -> String {
    let answer_len = answer.chars().count();
    let keep = answer_len / 2;
    let target = answer_len.max(MIN_DISTRACTOR_CHARS);
    let prefix: String = answer.chars().take(keep).collect();
    let fill = target.saturating_sub(keep).max(1);
    format!("{prefix}{}", random_letters(rng, fill))
}

/// Truncate to a little past the answer length, pad up to the minimum.
fn fit_length<R: Rng + ?Sized>(candidate: String, answer_len: usize, rng: &mut R) -> String {
    let max_len = (answer_len + MAX_EXTRA_CHARS).max(MIN_DISTRACTOR_CHARS);
    let mut fitted: String = candidate.chars().take(max_len).collect();
    let len = fitted.chars().count();
    if len < MIN_DISTRACTOR_CHARS {
        fitted.push_str(&random_letters(rng, MIN_DISTRACTOR_CHARS - len));
    }
    fitted
}

/// One perturbed variant of `answer`. May coincide with the answer.
pub fn perturb<R: Rng + ?Sized>(answer: &str, rng: &mut R) -> String {
    let candidate = match rng.gen_range(0..3) {
        0 => change_case(answer, rng),
        1 => with_suffix(answer, rng),
        _ => reshape(answer, rng),
    };
    fit_length(candidate, answer.chars().count(), rng)
}

fn fallback_suffix(mut n: usize) -> String {
    let mut suffix = Vec::new();
    loop {
        suffix.push(LETTERS[n % LETTERS.len()]);
        n /= LETTERS.len();
        if n == 0 {
            break;
        }
        n -= 1;
    }
    suffix.reverse();
    String::from_utf8(suffix).unwrap_or_default()
}

/// `count` distractors, each different from the answer and from each other.
/// Random perturbation is retried a bounded number of times; after that a
/// deterministic suffix guarantees uniqueness.
pub fn distractors<R: Rng + ?Sized>(answer: &str, count: usize, rng: &mut R) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(count);
    let mut attempts = 0;
    while out.len() < count && attempts < MAX_ATTEMPTS {
        attempts += 1;
        let candidate = perturb(answer, rng);
        if candidate != answer && !out.contains(&candidate) {
            out.push(candidate);
        }
    }

    let mut n = 0;
    while out.len() < count {
        let candidate = format!("{answer}x{}", fallback_suffix(n));
        n += 1;
        if candidate != answer && !out.contains(&candidate) {
            log::debug!("distractor retry budget spent for {answer:?}, using {candidate:?}");
            out.push(candidate);
        }
    }
    out
}
