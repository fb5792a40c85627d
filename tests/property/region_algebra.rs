//! Laws of the region list algebra.

use proptest::prelude::*;

use blame_rs::{Region, RegionList};

/// Random sorted, non-overlapping region list over a bounded line space.
///
/// Walks the result axis left to right with random gaps, assigning random
/// source offsets, so every generated list satisfies the structural
/// invariants by construction.
fn region_list(max_regions: usize) -> impl Strategy<Value = RegionList> {
    proptest::collection::vec((0usize..4, 1usize..5, 0usize..64), 0..max_regions).prop_map(
        |triples| {
            let mut list = RegionList::new();
            let mut cursor = 0usize;
            for (gap, len, source) in triples {
                cursor += gap;
                list.push(Region::new(cursor, source, len));
                cursor += len;
            }
            list
        },
    )
}

/// Two lists claiming disjoint result ranges: the second only uses result
/// slots the first left free.
fn disjoint_pair() -> impl Strategy<Value = (RegionList, RegionList)> {
    proptest::collection::vec((0usize..3, 1usize..4, 0usize..64, any::<bool>()), 0..12).prop_map(
        |triples| {
            let mut left = RegionList::new();
            let mut right = RegionList::new();
            let mut cursor = 0usize;
            for (gap, len, source, goes_left) in triples {
                cursor += gap;
                let region = Region::new(cursor, source, len);
                if goes_left {
                    left.push(region);
                } else {
                    right.push(region);
                }
                cursor += len;
            }
            (left, right)
        },
    )
}

fn assert_sorted_non_overlapping(list: &RegionList) {
    let regions: Vec<&Region> = list.iter().collect();
    for pair in regions.windows(2) {
        assert!(
            pair[0].result_start + pair[0].length <= pair[1].result_start,
            "overlap or disorder: {pair:?}"
        );
    }
}

fn assert_coalesced(list: &RegionList) {
    let regions: Vec<&Region> = list.iter().collect();
    for pair in regions.windows(2) {
        let contiguous = pair[0].result_start + pair[0].length == pair[1].result_start
            && pair[0].source_start + pair[0].length == pair[1].source_start;
        assert!(!contiguous, "uncoalesced neighbors: {pair:?}");
    }
}

proptest! {
    #[test]
    fn push_preserves_sortedness_and_coalescing(list in region_list(12)) {
        assert_sorted_non_overlapping(&list);
        assert_coalesced(&list);
    }

    #[test]
    fn merge_preserves_total_lines_and_invariants((a, b) in disjoint_pair()) {
        let total = a.total_lines() + b.total_lines();
        let mut merged = a;
        merged.merge(b);
        prop_assert_eq!(merged.total_lines(), total);
        assert_sorted_non_overlapping(&merged);
        assert_coalesced(&merged);
    }

    #[test]
    fn merge_is_commutative((a, b) in disjoint_pair()) {
        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn merge_is_associative(
        (a, rest) in disjoint_pair().prop_flat_map(|(a, b)| {
            // Split b's regions alternately into two further disjoint lists.
            let parts = b.iter().cloned().collect::<Vec<_>>();
            Just((a, parts))
        })
    ) {
        let mut b = RegionList::new();
        let mut c = RegionList::new();
        for (i, region) in rest.into_iter().enumerate() {
            if i % 2 == 0 { b.push(region) } else { c.push(region) }
        }

        let mut left = a.clone();
        left.merge(b.clone());
        left.merge(c.clone());

        let mut right_inner = b;
        right_inner.merge(c);
        let mut right = a;
        right.merge(right_inner);

        prop_assert_eq!(left, right);
    }

    #[test]
    fn split_first_then_slide_partitions(
        result_start in 0usize..1000,
        source_start in 0usize..1000,
        length in 2usize..100,
        cut in 1usize..99,
    ) {
        prop_assume!(cut < length);
        let original = Region::new(result_start, source_start, length);
        let mut rest = original;
        let head = rest.split_first(rest.source_start, cut);
        rest.slide_and_shrink(cut);

        // The two halves tile the original in both coordinate spaces.
        prop_assert_eq!(head.result_start, original.result_start);
        prop_assert_eq!(head.source_start, original.source_start);
        prop_assert_eq!(head.result_start + head.length, rest.result_start);
        prop_assert_eq!(head.source_start + head.length, rest.source_start);
        prop_assert_eq!(head.length + rest.length, original.length);
        prop_assert_eq!(
            rest.result_start + rest.length,
            original.result_start + original.length
        );
    }
}
