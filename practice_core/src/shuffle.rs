//! Random exercise selection.
//!
//! Every session draws its own selection; nothing here is seeded. Callers pass
//! the random source so tests can use a fixed seed.

use crate::ExerciseRecord;
use rand::seq::SliceRandom;
use rand::Rng;

/// Draw `count` distinct exercises uniformly at random without replacement
///
/// Shuffles a full copy of `catalogue` (Fisher-Yates) and keeps the first
/// `count` records. Asking for more than the catalogue holds returns the whole
/// catalogue in shuffled order.
pub fn select<R>(catalogue: &[ExerciseRecord], count: usize, rng: &mut R) -> Vec<ExerciseRecord>
where
    R: Rng + ?Sized,
{
    if count > catalogue.len() {
        tracing::warn!(
            "Requested {} exercises but catalog only has {}, clamping",
            count,
            catalogue.len()
        );
    }

    let mut shuffled = catalogue.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(count);
    shuffled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_default_catalog;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_select_returns_requested_count_of_distinct_records() {
        let catalog = build_default_catalog();
        let mut rng = StdRng::seed_from_u64(7);

        for count in [0, 1, 10, 22] {
            let picked = select(&catalog.exercises, count, &mut rng);
            assert_eq!(picked.len(), count);

            let names: HashSet<_> = picked.iter().map(|e| e.name.as_str()).collect();
            assert_eq!(names.len(), count, "selection contains duplicates");
            for exercise in &picked {
                assert!(catalog.exercises.contains(exercise));
            }
        }
    }

    #[test]
    fn test_select_clamps_to_catalog_length() {
        let catalog = build_default_catalog();
        let mut rng = StdRng::seed_from_u64(1);

        let picked = select(&catalog.exercises, 100, &mut rng);
        assert_eq!(picked.len(), catalog.len());
    }

    #[test]
    fn test_select_is_deterministic_for_a_seed() {
        let catalog = build_default_catalog();

        let first = select(&catalog.exercises, 10, &mut StdRng::seed_from_u64(42));
        let second = select(&catalog.exercises, 10, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_select_reshuffles_between_draws() {
        let catalog = build_default_catalog();
        let mut rng = StdRng::seed_from_u64(3);

        // 22! orderings; eight identical draws in a row would mean no shuffling
        let draws: HashSet<Vec<String>> = (0..8)
            .map(|_| {
                select(&catalog.exercises, 10, &mut rng)
                    .into_iter()
                    .map(|e| e.name)
                    .collect()
            })
            .collect();
        assert!(draws.len() > 1);
    }

    #[test]
    fn test_select_from_empty_catalogue() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(select(&[], 5, &mut rng).is_empty());
    }
}
