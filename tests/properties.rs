use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use regex_tdfa::{Config, Regex};

const PATTERNS: &[&str] = &[
    "((a|b)*c|a+)(b?)",
    "(a|ab)(c|bcd)(d*)",
    "((a+)(b|c|d))+",
    "(a*?)(b|ab)*c?",
    "([ab]{1,3})+?c",
];

proptest! {
    #[test]
    fn interpret_is_deterministic(index in 0..PATTERNS.len(), text in "[abcd]{0,16}") {
        let re = Regex::new(PATTERNS[index]).unwrap();
        let first = re.interpret(&text);
        prop_assert_eq!(re.interpret(&text), first.clone());

        // A fresh pattern with an empty cache agrees with the warmed-up one.
        let fresh = Regex::new(PATTERNS[index]).unwrap();
        prop_assert_eq!(fresh.interpret(&text), first);
    }

    #[test]
    fn frozen_and_growing_tables_agree(index in 0..PATTERNS.len(), texts in prop::collection::vec("[abcd]{0,12}", 1..8)) {
        let eager = Regex::with_config(PATTERNS[index], Config::new().freeze_after(1)).unwrap();
        let never = Regex::with_config(PATTERNS[index], Config::new().freeze_after(0)).unwrap();
        for _ in 0..2 {
            for text in &texts {
                prop_assert_eq!(eager.interpret(text), never.interpret(text));
            }
        }
    }

    #[test]
    fn greedy_and_lazy_tie_break(n in 1usize..64) {
        let text = "a".repeat(n);
        prop_assert_eq!(Regex::new("a*a").unwrap().interpret(&text).end(), Some(n));
        prop_assert_eq!(Regex::new("a*?a").unwrap().interpret(&text).end(), Some(1));
    }

    #[test]
    fn spans_nest_inside_the_match(text in "[abcd]{0,16}") {
        let re = Regex::new("((a+)(b|c|d))+").unwrap();
        let m = re.interpret(&text);
        if let Some(whole) = m.group(0) {
            for g in 1..=re.group_count() {
                for span in m.spans(g) {
                    prop_assert!(whole.start <= span.start && span.end <= whole.end);
                    prop_assert!(span.start <= span.end);
                }
            }
        }
    }
}

#[test]
fn concurrent_first_discovery() {
    let re = Arc::new(Regex::new("(((a+)b)+c)+").unwrap());
    let texts = ["aaabcaaabcaabc", "abcabc", "aabbc", "abcaabbc", "aaaaaaaabc"];
    let expected: Vec<_> = texts
        .iter()
        .map(|text| Regex::new("(((a+)b)+c)+").unwrap().interpret(text))
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let re = Arc::clone(&re);
            thread::spawn(move || {
                (0..50)
                    .map(|round| {
                        let index = (worker + round) % texts.len();
                        (index, re.interpret(texts[index]))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for (index, result) in handle.join().unwrap() {
            assert_eq!(result, expected[index]);
        }
    }
}
