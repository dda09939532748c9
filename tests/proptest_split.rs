use std::collections::BTreeSet;

use rddprep::materialize::{shuffle, split_dataset};
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn split_is_disjoint_and_complete(
        names in proptest_helpers::arb_image_names(200),
        ratio in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let mut shuffled = names.clone();
        shuffle(&mut shuffled, Some(seed));
        let split = split_dataset(shuffled, ratio).expect("split");

        let train: BTreeSet<&String> = split.train.iter().collect();
        let val: BTreeSet<&String> = split.val.iter().collect();
        prop_assert!(train.is_disjoint(&val));

        let union: BTreeSet<&String> = train.union(&val).copied().collect();
        let expected: BTreeSet<&String> = names.iter().collect();
        prop_assert_eq!(union, expected);
    }

    #[test]
    fn split_sizes_use_floor(names in proptest_helpers::arb_image_names(200), ratio in 0.0f64..=1.0) {
        let total = names.len();
        let split = split_dataset(names, ratio).expect("split");

        prop_assert_eq!(split.train.len(), (total as f64 * ratio).floor() as usize);
        prop_assert_eq!(split.train.len() + split.val.len(), total);
    }

    #[test]
    fn seeded_shuffle_is_a_reproducible_permutation(
        names in proptest_helpers::arb_image_names(100),
        seed in any::<u64>(),
    ) {
        let mut first = names.clone();
        let mut second = names.clone();
        shuffle(&mut first, Some(seed));
        shuffle(&mut second, Some(seed));
        prop_assert_eq!(&first, &second);

        let mut sorted = first;
        sorted.sort();
        let mut original = names;
        original.sort();
        prop_assert_eq!(sorted, original);
    }
}
