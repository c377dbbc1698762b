use regex_tdfa::{Config, Error, MatchResult, ParseError, Regex};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

/// (group, start, end) for every node of the span tree, in pre-order.
fn flatten(result: &MatchResult) -> Vec<(usize, usize, usize)> {
    let mut out = Vec::new();
    let mut pending = vec![result.tree().expect("expected a match")];
    while let Some(capture) = pending.pop() {
        out.push((capture.group(), capture.start(), capture.end()));
        pending.extend(capture.children().iter().rev());
    }
    out
}

#[test]
fn greedy_star_takes_every_repetition() {
    let re = compile("a*a");
    for n in 1..=10 {
        let m = re.interpret(&"a".repeat(n));
        assert_eq!((m.start(), m.end()), (Some(0), Some(n)), "n = {n}");
    }
}

#[test]
fn lazy_star_takes_one() {
    let re = compile("a*?a");
    for n in 1..=10 {
        let m = re.interpret(&"a".repeat(n));
        assert_eq!((m.start(), m.end()), (Some(0), Some(1)), "n = {n}");
    }
}

#[test]
fn nested_repeated_groups() {
    let re = compile("(((a+)b)+c)+");
    let m = re.interpret("aaabcaaabcaabc");
    assert!(m.is_match());
    assert_eq!(m.group(0), Some(0..14));
    assert_eq!(m.group(1), Some(10..14));
    assert_eq!(m.group(2), Some(10..13));
    assert_eq!(m.group(3), Some(10..12));
    assert_eq!(m.group_start(3), Some(10));
    assert_eq!(m.group_end(3), Some(12));

    assert_eq!(m.spans(1), &[0..5, 5..10, 10..14]);
    assert_eq!(m.spans(2), &[0..4, 5..9, 10..13]);
    assert_eq!(m.spans(3), &[0..3, 5..8, 10..12]);

    assert_eq!(
        flatten(&m),
        vec![
            (0, 0, 14),
            (1, 0, 5),
            (2, 0, 4),
            (3, 0, 3),
            (1, 5, 10),
            (2, 5, 9),
            (3, 5, 8),
            (1, 10, 14),
            (2, 10, 13),
            (3, 10, 12),
        ]
    );
}

#[test]
fn nested_repeated_groups_without_a_match() {
    let re = compile("(((a+)b)+c)+");
    for text in ["aabbccaaaa", "aabbc", "", "c"] {
        let m = re.interpret(text);
        assert_eq!(m, MatchResult::NoMatch, "text = {text:?}");
        assert_eq!(m.start(), None);
        assert_eq!(m.group_end(1), None);
    }
}

#[test]
fn alternation_inside_repetition_is_repeatable() {
    let re = compile("((a+)(b|c|d))+");
    let first = re.interpret("abac");
    assert_eq!(first.group(0), Some(0..4));
    assert_eq!(first.spans(1), &[0..2, 2..4]);
    assert_eq!(first.spans(2), &[0..1, 2..3]);
    assert_eq!(first.spans(3), &[1..2, 3..4]);
    assert_eq!(
        flatten(&first),
        vec![
            (0, 0, 4),
            (1, 0, 2),
            (2, 0, 1),
            (3, 1, 2),
            (1, 2, 4),
            (2, 2, 3),
            (3, 3, 4),
        ]
    );
    for _ in 0..5 {
        assert_eq!(re.interpret("abac"), first);
    }
}

#[test]
fn leftmost_first_alternation() {
    let re = compile("(a|ab)(c|bcd)(d*)");
    let m = re.interpret("abcd");
    assert_eq!(m.group(0), Some(0..4));
    assert_eq!(m.group(1), Some(0..1));
    assert_eq!(m.group(2), Some(1..4));
    assert_eq!(m.group(3), Some(4..4));
}

#[test]
fn lazy_group_before_greedy_group() {
    let m = compile("(a+?)(a*)").interpret("aaa");
    assert_eq!(m.group(1), Some(0..1));
    assert_eq!(m.group(2), Some(1..3));
}

#[test]
fn groups_that_do_not_participate() {
    let re = compile("(a)|(b)");
    let m = re.interpret("b");
    assert_eq!(m.group(1), None);
    assert_eq!(m.group_start(1), None);
    assert_eq!(m.group(2), Some(0..1));
    assert!(m.spans(1).is_empty());
    assert_eq!(m.group(7), None);
}

#[test]
fn match_is_a_prefix_of_the_text() {
    let re = compile("ab+");
    assert_eq!(re.interpret("abbbxyz").end(), Some(4));
    assert!(!re.is_match("xab"));
}

#[test]
fn counted_repetition() {
    let m = compile("(ab){2}").interpret("ababab");
    assert_eq!(m.group(0), Some(0..4));
    assert_eq!(m.spans(1), &[0..2, 2..4]);

    assert_eq!(compile("a{2,3}").interpret("aaaa").end(), Some(3));
    assert_eq!(compile("a{2,3}?").interpret("aaaa").end(), Some(2));
    assert_eq!(compile("a{2,}").interpret("aaaaa").end(), Some(5));
    assert!(!compile("a{2}").is_match("a"));
}

#[test]
fn classes_and_shorthands() {
    assert_eq!(compile("[a-c]+\\d").interpret("abc1x").end(), Some(4));
    assert_eq!(compile("\\w+\\s").interpret("foo_9 bar").end(), Some(6));
    assert!(compile("[^a]").is_match("é"));
    assert!(!compile("[^a]").is_match("a"));
    assert_eq!(compile("(?:x|y)+z").interpret("xyxz").end(), Some(4));
}

#[test]
fn positions_count_characters() {
    let m = compile("(.)+").interpret("héllo");
    assert_eq!(m.end(), Some(5));
    assert_eq!(m.group(1), Some(4..5));
    assert_eq!(m.spans(1).len(), 5);
}

#[test]
fn empty_matches() {
    let empty = compile("");
    assert_eq!(empty.interpret("abc").group(0), Some(0..0));
    assert_eq!(empty.group_count(), 0);

    let star = compile("(a)*");
    let m = star.interpret("");
    assert_eq!(m.group(0), Some(0..0));
    assert_eq!(m.group(1), None);
}

#[test]
fn histories_expose_every_tag() {
    let m = compile("(a)+").interpret("aa");
    let histories = m.histories().unwrap();
    assert_eq!(histories.len(), 4);
    assert_eq!(histories[0], vec![0]);
    assert_eq!(histories[1], vec![2]);
    assert_eq!(histories[2], vec![0, 1]);
    assert_eq!(histories[3], vec![1, 2]);
}

#[test]
fn tree_display() {
    let m = compile("(a(b)*)+").interpret("abba");
    let tree = m.tree().unwrap().to_string();
    assert_eq!(tree, "0: [0, 4)\n  1: [0, 3)\n    2: [1, 2)\n    2: [2, 3)\n  1: [3, 4)\n");
}

#[test]
fn parse_errors() {
    let err = Regex::new("(ab").unwrap_err();
    let Error::Parse(parse) = &err;
    assert_eq!(parse.fragment(), "(ab");
    assert_eq!(parse.offset(), 0);
    assert!(err.to_string().contains("unclosed group"));

    assert!(matches!(
        Regex::new("[z-a]"),
        Err(Error::Parse(ParseError::DescendingRange { .. }))
    ));
    assert!(matches!(
        Regex::with_config("a{20}", Config::new().max_repetition(10)),
        Err(Error::Parse(ParseError::RepetitionTooLarge { limit: 10, .. }))
    ));
    assert!(matches!(
        Regex::with_config("((a))", Config::new().max_nesting(1)),
        Err(Error::Parse(ParseError::NestingTooDeep { limit: 1, .. }))
    ));
}
