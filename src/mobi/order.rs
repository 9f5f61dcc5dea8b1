//! Reconcile `<img>` reference numbers with the image records of a PDB file.
//!
//! MOBI writers disagree on what the number in `recindex`/`kindle:embed` means: an
//! absolute record index, a 0-based offset from the first image record, or a 1-based
//! one. Each interpretation is scored by how many references land on a record that
//! actually holds an image, and the best one is used for the whole book.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::raster::is_image_data;

/// How a reference number maps to a record index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStrategy {
    /// `index = r`
    Absolute,
    /// `index = first_image + r`
    RelativeZero,
    /// `index = first_image + r - 1`
    RelativeOne,
}

impl IndexStrategy {
    pub fn map(self, reference: u32, first_image: usize) -> Option<usize> {
        let reference = reference as usize;
        match self {
            IndexStrategy::Absolute => Some(reference),
            IndexStrategy::RelativeZero => first_image.checked_add(reference),
            IndexStrategy::RelativeOne => first_image
                .checked_add(reference)
                .and_then(|index| index.checked_sub(1)),
        }
    }
}

/// Number of references each strategy lands on an image record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StrategyScores {
    pub absolute: usize,
    pub relative_zero: usize,
    pub relative_one: usize,
}

/// Ordered image records plus how the order was decided.
#[derive(Debug, Clone)]
pub struct OrderResolution<'a> {
    pub images: Vec<(usize, &'a [u8])>,
    /// `None` when there were no references to interpret.
    pub strategy: Option<IndexStrategy>,
    pub scores: StrategyScores,
}

/// Records whose leading bytes carry an image signature.
pub fn detect_image_records<'a>(records: &[&'a [u8]]) -> BTreeMap<usize, &'a [u8]> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| is_image_data(record))
        .map(|(index, record)| (index, *record))
        .collect()
}

fn score<V>(
    strategy: IndexStrategy,
    references: &[u32],
    detected: &BTreeMap<usize, V>,
    first_image: usize,
) -> usize {
    references
        .iter()
        .filter_map(|&r| strategy.map(r, first_image))
        .filter(|index| detected.contains_key(index))
        .count()
}

/// Pick the interpretation with the most hits.
///
/// Between the two relative strategies a tie goes to relative-zero if some reference is
/// 0, else to relative-one. Absolute wins unless the best relative strategy strictly
/// beats it.
pub fn choose_strategy<V>(
    references: &[u32],
    detected: &BTreeMap<usize, V>,
    first_image: usize,
) -> (IndexStrategy, StrategyScores) {
    let scores = StrategyScores {
        absolute: score(IndexStrategy::Absolute, references, detected, first_image),
        relative_zero: score(IndexStrategy::RelativeZero, references, detected, first_image),
        relative_one: score(IndexStrategy::RelativeOne, references, detected, first_image),
    };

    let (relative, relative_score) = match scores.relative_zero.cmp(&scores.relative_one) {
        std::cmp::Ordering::Greater => (IndexStrategy::RelativeZero, scores.relative_zero),
        std::cmp::Ordering::Less => (IndexStrategy::RelativeOne, scores.relative_one),
        std::cmp::Ordering::Equal if references.contains(&0) => {
            (IndexStrategy::RelativeZero, scores.relative_zero)
        }
        std::cmp::Ordering::Equal => (IndexStrategy::RelativeOne, scores.relative_one),
    };

    if relative_score > scores.absolute {
        (relative, scores)
    } else {
        (IndexStrategy::Absolute, scores)
    }
}

/// Order the image records of a book.
///
/// References are mapped through the winning strategy in document order, skipping
/// misses and repeats. Image records never referenced follow in ascending index order,
/// except those below `first_image`, which are usually fonts or other resources that
/// happen to sniff as images.
pub fn resolve_order<'a>(
    records: &[&'a [u8]],
    references: &[u32],
    first_image: usize,
) -> OrderResolution<'a> {
    let detected = detect_image_records(records);

    let (strategy, scores) = if references.is_empty() {
        (None, StrategyScores::default())
    } else {
        let (strategy, scores) = choose_strategy(references, &detected, first_image);
        (Some(strategy), scores)
    };

    let mut emitted = HashSet::new();
    let mut images = Vec::with_capacity(detected.len());

    if let Some(strategy) = strategy {
        for &reference in references {
            let Some(index) = strategy.map(reference, first_image) else {
                continue;
            };
            if let Some(&data) = detected.get(&index)
                && emitted.insert(index)
            {
                images.push((index, data));
            }
        }
    }

    for (&index, &data) in detected.range(first_image..) {
        if emitted.insert(index) {
            images.push((index, data));
        }
    }

    OrderResolution {
        images,
        strategy,
        scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    /// `count` records where the given indices hold images.
    fn records(count: usize, images: &[usize]) -> Vec<&'static [u8]> {
        (0..count)
            .map(|i| if images.contains(&i) { JPEG } else { b"text record".as_slice() })
            .collect()
    }

    fn indices(resolution: &OrderResolution<'_>) -> Vec<usize> {
        resolution.images.iter().map(|(index, _)| *index).collect()
    }

    #[test]
    fn test_relative_zero_wins_with_zero_reference() {
        let recs = records(13, &[10, 11, 12]);
        let resolution = resolve_order(&recs, &[0, 1, 2], 10);
        assert_eq!(resolution.strategy, Some(IndexStrategy::RelativeZero));
        assert_eq!(indices(&resolution), vec![10, 11, 12]);
        assert_eq!(
            resolution.scores,
            StrategyScores {
                absolute: 0,
                relative_zero: 3,
                relative_one: 2,
            }
        );
    }

    #[test]
    fn test_relative_one_follows_document_order() {
        let recs = records(14, &[10, 11, 12, 13]);
        let resolution = resolve_order(&recs, &[3, 1, 4, 2], 10);
        assert_eq!(resolution.strategy, Some(IndexStrategy::RelativeOne));
        assert_eq!(indices(&resolution), vec![12, 10, 13, 11]);
    }

    #[test]
    fn test_relative_tie_without_zero_prefers_relative_one() {
        // Both relative strategies hit twice; no reference is 0
        let recs = records(13, &[10, 11, 12]);
        let (strategy, scores) = choose_strategy(&[1, 2], &detect_image_records(&recs), 10);
        assert_eq!(scores.relative_zero, 2);
        assert_eq!(scores.relative_one, 2);
        assert_eq!(strategy, IndexStrategy::RelativeOne);
    }

    #[test]
    fn test_absolute_when_relative_does_not_beat_it() {
        let recs = records(8, &[5, 6, 7]);
        let resolution = resolve_order(&recs, &[7, 5, 6], 5);
        assert_eq!(resolution.strategy, Some(IndexStrategy::Absolute));
        assert_eq!(indices(&resolution), vec![7, 5, 6]);
    }

    #[test]
    fn test_unreferenced_images_appended_ascending() {
        let recs = records(16, &[3, 10, 11, 12, 13, 14, 15]);
        let resolution = resolve_order(&recs, &[5, 1], 10);
        // relative-one maps 5 -> 14, 1 -> 10; record 3 sits below the first image
        assert_eq!(indices(&resolution), vec![14, 10, 11, 12, 13, 15]);
    }

    #[test]
    fn test_misses_and_repeats_are_skipped() {
        let recs = records(13, &[10, 11, 12]);
        let resolution = resolve_order(&recs, &[0, 40, 2, 2, 1], 10);
        assert_eq!(indices(&resolution), vec![10, 12, 11]);
    }

    #[test]
    fn test_no_references_is_ascending_from_first_image() {
        let recs = records(13, &[2, 10, 11, 12]);
        let resolution = resolve_order(&recs, &[], 10);
        assert_eq!(resolution.strategy, None);
        assert_eq!(indices(&resolution), vec![10, 11, 12]);
    }

    #[test]
    fn test_relative_one_never_underflows() {
        assert_eq!(IndexStrategy::RelativeOne.map(0, 0), None);
        assert_eq!(IndexStrategy::RelativeOne.map(0, 4), Some(3));
        assert_eq!(IndexStrategy::RelativeZero.map(0, 4), Some(4));
        assert_eq!(IndexStrategy::Absolute.map(9, 4), Some(9));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let recs = records(20, &[8, 9, 10, 11, 12, 15, 19]);
        let references = [4, 2, 7, 1, 3];
        let first = resolve_order(&recs, &references, 8);
        let second = resolve_order(&recs, &references, 8);
        assert_eq!(indices(&first), indices(&second));
        assert_eq!(first.strategy, second.strategy);
    }

    proptest! {
        #[test]
        fn prop_every_image_at_or_after_first_emitted_once(
            image_slots in prop::collection::btree_set(0usize..40, 0..20),
            references in prop::collection::vec(0u32..50, 0..30),
            first_image in 0usize..40,
        ) {
            let images: Vec<usize> = image_slots.into_iter().collect();
            let recs = records(40, &images);
            let resolution = resolve_order(&recs, &references, first_image);
            let emitted = indices(&resolution);

            let unique: HashSet<usize> = emitted.iter().copied().collect();
            prop_assert_eq!(unique.len(), emitted.len());
            for index in images.iter().filter(|&&i| i >= first_image) {
                prop_assert!(unique.contains(index));
            }
            for index in &emitted {
                prop_assert!(images.contains(index));
            }

            let again = resolve_order(&recs, &references, first_image);
            prop_assert_eq!(indices(&again), emitted);
            prop_assert_eq!(again.strategy, resolution.strategy);
        }
    }
}
