/// AST types for the regex engine.
use std::fmt;

/// Smallest symbol in the input domain.
pub const MIN_SYMBOL: u32 = 0;
/// Largest symbol in the input domain (`char::MAX`).
pub const MAX_SYMBOL: u32 = char::MAX as u32;

/// An inclusive range of Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharRange {
    pub start: u32,
    pub end: u32,
}

impl CharRange {
    pub const FULL: CharRange = CharRange {
        start: MIN_SYMBOL,
        end: MAX_SYMBOL,
    };

    pub fn new(start: u32, end: u32) -> Self {
        assert!(start <= end, "descending range {start:#x}-{end:#x}");
        Self { start, end }
    }

    pub fn single(ch: char) -> Self {
        Self::new(ch as u32, ch as u32)
    }

    pub fn chars(start: char, end: char) -> Self {
        Self::new(start as u32, end as u32)
    }

    pub fn contains(&self, symbol: u32) -> bool {
        self.start <= symbol && symbol <= self.end
    }
}

impl fmt::Display for CharRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |f: &mut fmt::Formatter<'_>, v: u32| match char::from_u32(v) {
            Some(c) if !c.is_control() => write!(f, "{c:?}"),
            _ => write!(f, "{v:#x}"),
        };
        f.write_str("[")?;
        show(f, self.start)?;
        f.write_str(",")?;
        show(f, self.end)?;
        f.write_str("]")
    }
}

/// A single node in the regex AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    /// Matches the empty string.
    Empty,
    /// Matches one character from a single range. A plain literal `a` is the
    /// range `[a,a]`.
    Literal(CharRange),
    /// Matches one character from any of the (sorted, disjoint) ranges.
    Class(Vec<CharRange>),
    /// Matches any character.
    Any,
    /// `left` followed by `right`.
    Concat(Box<SyntaxNode>, Box<SyntaxNode>),
    /// `left|right`, preferring `left`.
    Alternation(Box<SyntaxNode>, Box<SyntaxNode>),
    /// `node{min,max}`; `max == None` is unbounded.
    Repetition {
        node: Box<SyntaxNode>,
        min: u32,
        max: Option<u32>,
        lazy: bool,
    },
    /// Capturing group `(...)` with a 1-based group index. Index 0 is reserved
    /// for the implicit group around the whole pattern.
    Group { index: usize, node: Box<SyntaxNode> },
}

impl SyntaxNode {
    /// Fold a sequence into right-nested concatenations.
    pub fn concat(nodes: Vec<SyntaxNode>) -> SyntaxNode {
        nodes
            .into_iter()
            .rev()
            .reduce(|right, left| SyntaxNode::Concat(Box::new(left), Box::new(right)))
            .unwrap_or(SyntaxNode::Empty)
    }

    /// Fold branches into right-nested alternations, keeping textual priority.
    pub fn alternation(branches: Vec<SyntaxNode>) -> SyntaxNode {
        branches
            .into_iter()
            .rev()
            .reduce(|right, left| SyntaxNode::Alternation(Box::new(left), Box::new(right)))
            .unwrap_or(SyntaxNode::Empty)
    }
}

// Concatenations and alternations nest one level per operand, so long
// patterns are torn down with an explicit stack.
impl Drop for SyntaxNode {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        take_children(self, &mut pending);
        while let Some(mut node) = pending.pop() {
            take_children(&mut node, &mut pending);
        }
    }
}

fn take_children(node: &mut SyntaxNode, pending: &mut Vec<SyntaxNode>) {
    let mut take = |child: &mut Box<SyntaxNode>| {
        if !matches!(**child, SyntaxNode::Empty) {
            pending.push(std::mem::replace(&mut **child, SyntaxNode::Empty));
        }
    };
    match node {
        SyntaxNode::Concat(left, right) | SyntaxNode::Alternation(left, right) => {
            take(left);
            take(right);
        }
        SyntaxNode::Repetition { node, .. } | SyntaxNode::Group { node, .. } => take(node),
        SyntaxNode::Empty | SyntaxNode::Literal(_) | SyntaxNode::Class(_) | SyntaxNode::Any => {}
    }
}

/// Shorthand character class kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShorthandKind {
    /// `\d`: digits.
    Digit,
    /// `\D`: non-digits.
    NonDigit,
    /// `\w`: word characters.
    Word,
    /// `\W`: non-word characters.
    NonWord,
    /// `\s`: whitespace.
    Space,
    /// `\S`: non-whitespace.
    NonSpace,
}

impl ShorthandKind {
    pub fn from_escape(ch: char) -> Option<Self> {
        Some(match ch {
            'd' => ShorthandKind::Digit,
            'D' => ShorthandKind::NonDigit,
            'w' => ShorthandKind::Word,
            'W' => ShorthandKind::NonWord,
            's' => ShorthandKind::Space,
            'S' => ShorthandKind::NonSpace,
            _ => return None,
        })
    }

    /// The ASCII ranges this shorthand denotes, sorted and disjoint.
    pub fn ranges(self) -> Vec<CharRange> {
        let digit = || vec![CharRange::chars('0', '9')];
        let word = || {
            vec![
                CharRange::chars('0', '9'),
                CharRange::chars('A', 'Z'),
                CharRange::single('_'),
                CharRange::chars('a', 'z'),
            ]
        };
        // \t \n \x0b \x0c \r and space
        let space = || vec![CharRange::chars('\t', '\r'), CharRange::single(' ')];
        match self {
            ShorthandKind::Digit => digit(),
            ShorthandKind::NonDigit => negate(&digit()),
            ShorthandKind::Word => word(),
            ShorthandKind::NonWord => negate(&word()),
            ShorthandKind::Space => space(),
            ShorthandKind::NonSpace => negate(&space()),
        }
    }
}

/// Sort ranges and merge the ones that overlap or touch.
pub fn normalize(mut ranges: Vec<CharRange>) -> Vec<CharRange> {
    ranges.sort();
    let mut out: Vec<CharRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match out.last_mut() {
            Some(last) if range.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(range.end);
            }
            _ => out.push(range),
        }
    }
    out
}

/// Complement of a normalized range set within the full symbol domain.
pub fn negate(ranges: &[CharRange]) -> Vec<CharRange> {
    let mut out = Vec::with_capacity(ranges.len() + 1);
    let mut next = MIN_SYMBOL;
    for range in ranges {
        if range.start > next {
            out.push(CharRange::new(next, range.start - 1));
        }
        if range.end == MAX_SYMBOL {
            return out;
        }
        next = range.end + 1;
    }
    out.push(CharRange::new(next, MAX_SYMBOL));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_merges_touching_ranges() {
        let merged = normalize(vec![
            CharRange::chars('d', 'f'),
            CharRange::chars('a', 'c'),
            CharRange::chars('x', 'z'),
            CharRange::chars('e', 'g'),
        ]);
        assert_eq!(merged, vec![CharRange::chars('a', 'g'), CharRange::chars('x', 'z')]);
    }

    #[test]
    fn negate_covers_the_gaps() {
        let negated = negate(&[CharRange::chars('b', 'd')]);
        assert_eq!(
            negated,
            vec![CharRange::new(MIN_SYMBOL, 'a' as u32), CharRange::new('e' as u32, MAX_SYMBOL)]
        );
        assert!(negate(&[CharRange::FULL]).is_empty());
        assert_eq!(negate(&[]), vec![CharRange::FULL]);
    }

    #[test]
    fn concat_folds_right() {
        let node = SyntaxNode::concat(vec![
            SyntaxNode::Literal(CharRange::single('a')),
            SyntaxNode::Literal(CharRange::single('b')),
            SyntaxNode::Literal(CharRange::single('c')),
        ]);
        let SyntaxNode::Concat(left, right) = &node else {
            panic!("expected concatenation");
        };
        assert_eq!(**left, SyntaxNode::Literal(CharRange::single('a')));
        assert!(matches!(**right, SyntaxNode::Concat(_, _)));
        assert_eq!(SyntaxNode::concat(vec![]), SyntaxNode::Empty);
    }
}
