//! Pure interval arithmetic over coverage ranges. The single source of truth
//! for "what is missing" — no I/O lives here.

use crate::models::BlockRange;

/// Compute the ordered, maximal sub-intervals of `[lo, hi]` that are not
/// contained in the union of `ranges`.
///
/// Input ranges may be unsorted, overlapping, or extend outside `[lo, hi]`.
/// An empty input yields `[[lo, hi]]`; full coverage yields `[]`.
pub fn find_gaps(ranges: &[BlockRange], lo: u64, hi: u64) -> Vec<BlockRange> {
    if lo > hi {
        return Vec::new();
    }

    let mut sorted: Vec<BlockRange> = ranges.to_vec();
    sorted.sort_by_key(|r| r.from_block);

    let mut gaps = Vec::new();
    let mut cursor = lo;

    for range in sorted {
        if range.to_block < cursor {
            continue;
        }
        if range.from_block > cursor {
            // from_block > cursor >= 0, so the subtraction cannot underflow.
            gaps.push(BlockRange::new(cursor, (range.from_block - 1).min(hi)));
        }
        if range.to_block >= hi {
            // Covered through the end of the request; to_block + 1 below
            // could overflow at u64::MAX, so stop here instead.
            return gaps;
        }
        cursor = range.to_block + 1;
    }

    if cursor <= hi {
        gaps.push(BlockRange::new(cursor, hi));
    }

    gaps
}

/// Normalize a range set: sorted, with overlapping and touching ranges merged.
/// The output union always equals the input union, so this is safe to use for
/// compaction.
pub fn merge_coverage(ranges: &[BlockRange]) -> Vec<BlockRange> {
    if ranges.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<BlockRange> = ranges.to_vec();
    sorted.sort_by_key(|r| (r.from_block, r.to_block));

    let mut merged: Vec<BlockRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            // Touching counts as mergeable: [a, b] and [b + 1, c] are one run.
            Some(last) if range.from_block <= last.to_block.saturating_add(1) => {
                last.to_block = last.to_block.max(range.to_block);
            }
            _ => merged.push(range),
        }
    }

    merged
}

/// Total number of blocks in a normalized range set.
pub fn covered_block_count(ranges: &[BlockRange]) -> u64 {
    merge_coverage(ranges).iter().map(|r| r.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn r(from: u64, to: u64) -> BlockRange {
        BlockRange::new(from, to)
    }

    #[test]
    fn empty_input_is_one_gap() {
        assert_eq!(find_gaps(&[], 100, 200), vec![r(100, 200)]);
    }

    #[test]
    fn full_coverage_is_no_gap() {
        assert_eq!(find_gaps(&[r(100, 200)], 100, 200), Vec::<BlockRange>::new());
        assert_eq!(find_gaps(&[r(0, 500)], 100, 200), Vec::<BlockRange>::new());
    }

    #[test]
    fn hole_in_the_middle() {
        // [100,120] and [131,150] leave exactly [121,130] uncovered.
        let gaps = find_gaps(&[r(100, 120), r(131, 150)], 100, 150);
        assert_eq!(gaps, vec![r(121, 130)]);
    }

    #[test]
    fn leading_and_trailing_gaps() {
        let gaps = find_gaps(&[r(110, 120)], 100, 150);
        assert_eq!(gaps, vec![r(100, 109), r(121, 150)]);
    }

    #[test]
    fn unsorted_overlapping_input() {
        let gaps = find_gaps(&[r(140, 160), r(90, 105), r(100, 110)], 100, 150);
        assert_eq!(gaps, vec![r(111, 139)]);
    }

    #[test]
    fn ranges_outside_request_are_ignored() {
        let gaps = find_gaps(&[r(0, 50), r(300, 400)], 100, 200);
        assert_eq!(gaps, vec![r(100, 200)]);
    }

    #[test]
    fn single_block_request() {
        assert_eq!(find_gaps(&[], 42, 42), vec![r(42, 42)]);
        assert_eq!(find_gaps(&[r(42, 42)], 42, 42), Vec::<BlockRange>::new());
        assert_eq!(find_gaps(&[r(0, 41)], 42, 42), vec![r(42, 42)]);
    }

    #[test]
    fn inverted_request_is_empty() {
        assert_eq!(find_gaps(&[], 10, 5), Vec::<BlockRange>::new());
    }

    #[test]
    fn extreme_bounds() {
        let gaps = find_gaps(&[r(0, u64::MAX - 1)], 0, u64::MAX);
        assert_eq!(gaps, vec![r(u64::MAX, u64::MAX)]);
        assert_eq!(
            find_gaps(&[r(0, u64::MAX)], 0, u64::MAX),
            Vec::<BlockRange>::new()
        );
    }

    #[test]
    fn merge_touching_and_overlapping() {
        let merged = merge_coverage(&[r(10, 20), r(21, 30), r(25, 40), r(50, 60)]);
        assert_eq!(merged, vec![r(10, 40), r(50, 60)]);
    }

    #[test]
    fn merge_is_idempotent() {
        let once = merge_coverage(&[r(5, 9), r(0, 4), r(20, 25)]);
        let twice = merge_coverage(&once);
        assert_eq!(once, twice);
        assert_eq!(once, vec![r(0, 9), r(20, 25)]);
    }

    #[test]
    fn counts_blocks_without_double_counting() {
        assert_eq!(covered_block_count(&[r(0, 9), r(5, 14)]), 15);
        assert_eq!(covered_block_count(&[]), 0);
    }

    // Membership oracle over small universes for the property tests.
    fn covered(ranges: &[BlockRange], block: u64) -> bool {
        ranges.iter().any(|r| r.contains(block))
    }

    proptest! {
        #[test]
        fn gaps_union_coverage_restores_request(
            ranges in proptest::collection::vec((0u64..300, 0u64..300), 0..8),
            lo in 0u64..200,
            span in 0u64..100,
        ) {
            let ranges: Vec<BlockRange> = ranges
                .into_iter()
                .map(|(a, b)| r(a.min(b), a.max(b)))
                .collect();
            let hi = lo + span;
            let gaps = find_gaps(&ranges, lo, hi);

            // Completeness: every block in [lo, hi] is in a gap xor covered.
            for block in lo..=hi {
                let in_gap = covered(&gaps, block);
                let in_cov = covered(&ranges, block);
                prop_assert!(in_gap ^ in_cov,
                    "block {} gap={} covered={}", block, in_gap, in_cov);
            }

            // Ordered, disjoint, non-touching: each gap is maximal.
            for pair in gaps.windows(2) {
                prop_assert!(pair[0].to_block + 1 < pair[1].from_block);
            }

            // Minimality at the edges: the block just outside each gap is
            // covered (or outside the request).
            for gap in &gaps {
                prop_assert!(gap.from_block >= lo && gap.to_block <= hi);
                if gap.from_block > lo {
                    prop_assert!(covered(&ranges, gap.from_block - 1));
                }
                if gap.to_block < hi {
                    prop_assert!(covered(&ranges, gap.to_block + 1));
                }
            }
        }

        #[test]
        fn merge_preserves_union(
            ranges in proptest::collection::vec((0u64..100, 0u64..100), 0..8),
        ) {
            let ranges: Vec<BlockRange> = ranges
                .into_iter()
                .map(|(a, b)| r(a.min(b), a.max(b)))
                .collect();
            let merged = merge_coverage(&ranges);

            for block in 0u64..110 {
                prop_assert_eq!(covered(&ranges, block), covered(&merged, block));
            }
            for pair in merged.windows(2) {
                prop_assert!(pair[0].to_block + 1 < pair[1].from_block);
            }
        }
    }
}
