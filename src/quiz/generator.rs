use crate::types::QuestionPair;
use rand::Rng;

/// Smallest operand served; 0, 1 and 2 make trivial sums.
pub const OPERAND_MIN: i64 = 3;
pub const OPERAND_MAX: i64 = 9;

/// Question count used when none (or a non-positive one) is given.
pub const DEFAULT_QUESTION_COUNT: i64 = 525;

/// Generates `count` independent pairs with operands uniform over
/// `[OPERAND_MIN, OPERAND_MAX]`. A non-positive count means the default.
pub fn generate_pairs(count: i64) -> Vec<QuestionPair> {
    generate_pairs_with(&mut rand::rng(), count)
}

/// [`generate_pairs`] with a caller-supplied RNG.
pub fn generate_pairs_with<R: Rng>(rng: &mut R, count: i64) -> Vec<QuestionPair> {
    let count = if count > 0 { count } else { DEFAULT_QUESTION_COUNT };

    (0..count)
        .map(|_| QuestionPair {
            a: rng.random_range(OPERAND_MIN..=OPERAND_MAX),
            b: rng.random_range(OPERAND_MIN..=OPERAND_MAX),
        })
        .collect()
}

/// Whether a pair could have come from the generator.
pub fn is_valid_pair(pair: &QuestionPair) -> bool {
    (OPERAND_MIN..=OPERAND_MAX).contains(&pair.a) && (OPERAND_MIN..=OPERAND_MAX).contains(&pair.b)
}
