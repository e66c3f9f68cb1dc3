use std::collections::HashSet;

use gogrep::Matcher;
use proptest::prelude::*;

/// Small well-formed expression sources.
fn expr_src() -> impl Strategy<Value = String> {
    let leaf = prop_oneof!["[a-e]", "[1-9][0-9]{0,2}"];
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} + {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} * ({b})")),
            prop::collection::vec(inner, 0..3).prop_map(|args| format!("f({})", args.join(", "))),
        ]
    })
}

fn spans(m: &Matcher, ms: &[gogrep::Match]) -> Vec<(u32, u32)> {
    ms.iter()
        .map(|mt| {
            let sp = mt.node.span(&m.arena);
            (sp.start, sp.end)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn matching_is_idempotent(src in expr_src()) {
        let mut m = Matcher::new();
        let pipe = m.compile(&[("x", "$_")]).unwrap();
        let root = m.parse_pattern(&src).unwrap();
        let first = m.run(&pipe, root).unwrap();
        let second = m.run(&pipe, root).unwrap();
        prop_assert_eq!(spans(&m, &first), spans(&m, &second));
    }

    #[test]
    fn range_output_is_deduplicated(src in expr_src()) {
        let mut m = Matcher::new();
        let pipe = m.compile(&[("x", "$_")]).unwrap();
        let root = m.parse_pattern(&src).unwrap();
        let found = m.run(&pipe, root).unwrap();
        let all = spans(&m, &found);
        let unique: HashSet<_> = all.iter().copied().collect();
        prop_assert_eq!(unique.len(), all.len(), "duplicate span in {:?}", all);
    }

    #[test]
    fn every_identifier_is_matched(src in expr_src()) {
        let mut m = Matcher::new();
        let pipe = m.compile(&[("x", "$_")]).unwrap();
        let root = m.parse_pattern(&src).unwrap();
        let found = m.run(&pipe, root).unwrap();
        // The whole root always matches the discard wildcard.
        prop_assert!(!found.is_empty());
        let all: HashSet<_> = spans(&m, &found).into_iter().collect();
        let root_span = root.span(&m.arena);
        prop_assert!(all.contains(&(root_span.start, root_span.end)));
    }
}
