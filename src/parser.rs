/// Regex parser: converts a pattern string into an AST.
use crate::ast::*;
use crate::config::Config;
use crate::error::ParseError;

/// Output of a successful parse.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub node: SyntaxNode,
    /// Number of capturing groups, not counting the implicit group 0.
    pub group_count: usize,
    /// `parents[g]` is the innermost group enclosing group `g` (0 for top
    /// level groups and for group 0 itself).
    pub parents: Vec<usize>,
}

pub struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
    open_groups: Vec<usize>,
    parents: Vec<usize>,
    max_nesting: usize,
    max_repetition: u32,
}

impl Parser {
    pub fn new(pattern: &str, config: &Config) -> Self {
        Parser {
            chars: pattern.chars().collect(),
            pos: 0,
            depth: 0,
            open_groups: Vec::new(),
            parents: vec![0],
            max_nesting: config.max_nesting,
            max_repetition: config.max_repetition,
        }
    }

    /// Parse the full pattern.
    pub fn parse(mut self) -> Result<Parsed, ParseError> {
        let node = self.parse_alternation()?;
        if self.pos < self.chars.len() {
            // parse_alternation only stops early on a ')' with no open group.
            return Err(ParseError::UnmatchedParen {
                fragment: self.fragment(self.pos, self.pos + 1),
                offset: self.pos,
            });
        }
        Ok(Parsed {
            node,
            group_count: self.parents.len() - 1,
            parents: self.parents,
        })
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn fragment(&self, start: usize, end: usize) -> String {
        self.chars[start..end.min(self.chars.len())].iter().collect()
    }

    /// Parse alternation: `a|b|c`
    fn parse_alternation(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut branches = vec![self.parse_concat()?];
        while self.peek() == Some('|') {
            self.advance();
            branches.push(self.parse_concat()?);
        }
        Ok(SyntaxNode::alternation(branches))
    }

    /// Parse concatenation: `abc`
    fn parse_concat(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut nodes = Vec::new();
        while let Some(ch) = self.peek() {
            if ch == ')' || ch == '|' {
                break;
            }
            nodes.push(self.parse_quantified()?);
        }
        Ok(SyntaxNode::concat(nodes))
    }

    /// Parse an atom possibly followed by a quantifier.
    fn parse_quantified(&mut self) -> Result<SyntaxNode, ParseError> {
        let node = self.parse_atom()?;
        let (min, max) = match self.peek() {
            Some('*') => {
                self.advance();
                (0, None)
            }
            Some('+') => {
                self.advance();
                (1, None)
            }
            Some('?') => {
                self.advance();
                (0, Some(1))
            }
            Some('{') => match self.parse_counter()? {
                Some(bounds) => bounds,
                None => return Ok(node),
            },
            _ => return Ok(node),
        };
        let lazy = if self.peek() == Some('?') {
            self.advance();
            true
        } else {
            false
        };
        Ok(SyntaxNode::Repetition {
            node: Box::new(node),
            min,
            max,
            lazy,
        })
    }

    /// Parse `{n}`, `{n,}`, `{n,m}`. A brace that does not form a counter is
    /// left in place to be read as a literal.
    fn parse_counter(&mut self) -> Result<Option<(u32, Option<u32>)>, ParseError> {
        let start = self.pos;
        self.advance(); // consume '{'

        let Some(min) = self.parse_number() else {
            self.pos = start;
            return Ok(None);
        };
        let max = if self.peek() == Some(',') {
            self.advance();
            if self.peek() == Some('}') {
                None
            } else {
                match self.parse_number() {
                    Some(max) => Some(max),
                    None => {
                        self.pos = start;
                        return Ok(None);
                    }
                }
            }
        } else {
            Some(min)
        };
        if self.peek() != Some('}') {
            self.pos = start;
            return Ok(None);
        }
        self.advance();

        let limit = self.max_repetition;
        if min > limit || max.is_some_and(|max| max > limit) {
            return Err(ParseError::RepetitionTooLarge {
                fragment: self.fragment(start, self.pos),
                offset: start,
                limit,
            });
        }
        if max.is_some_and(|max| max < min) {
            return Err(ParseError::InvalidRepetition {
                fragment: self.fragment(start, self.pos),
                offset: start,
            });
        }
        Ok(Some((min, max)))
    }

    /// Parse a decimal count. Values too large for `u32` saturate so that
    /// the limit check reports them.
    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(digit) = self.peek().and_then(|ch| ch.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(digit);
            self.advance();
        }
        (self.pos > start).then_some(value)
    }

    /// Parse a single atom (literal, class, group, etc.)
    fn parse_atom(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.pos;
        match self.peek() {
            None => Ok(SyntaxNode::Empty),
            Some('(') => self.parse_group(),
            Some('[') => self.parse_char_class(),
            Some('.') => {
                self.advance();
                Ok(SyntaxNode::Any)
            }
            Some('\\') => self.parse_escape(),
            Some('*' | '+' | '?') => Err(ParseError::NothingToRepeat {
                fragment: self.fragment(start, start + 1),
                offset: start,
            }),
            Some(ch) => {
                self.advance();
                Ok(SyntaxNode::Literal(CharRange::single(ch)))
            }
        }
    }

    /// Parse an escape sequence.
    fn parse_escape(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.pos;
        self.advance(); // consume '\\'
        match self.advance() {
            None => Err(ParseError::DanglingEscape {
                fragment: self.fragment(start, self.pos),
                offset: start,
            }),
            Some(ch) => match ShorthandKind::from_escape(ch) {
                Some(kind) => Ok(SyntaxNode::Class(kind.ranges())),
                None => Ok(SyntaxNode::Literal(CharRange::single(control_escape(ch)))),
            },
        }
    }

    /// Parse a group: `(...)` or `(?:...)`.
    fn parse_group(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.pos;
        self.advance(); // consume '('

        self.depth += 1;
        if self.depth > self.max_nesting {
            return Err(ParseError::NestingTooDeep {
                fragment: self.fragment(start, self.pos),
                offset: start,
                limit: self.max_nesting,
            });
        }

        let capture = if self.peek() == Some('?') {
            if self.peek_at(1) != Some(':') {
                return Err(ParseError::UnsupportedGroup {
                    fragment: self.fragment(start, self.pos + 2),
                    offset: start,
                });
            }
            self.pos += 2;
            None
        } else {
            let index = self.parents.len();
            self.parents.push(self.open_groups.last().copied().unwrap_or(0));
            self.open_groups.push(index);
            Some(index)
        };

        let node = self.parse_alternation()?;
        if self.advance() != Some(')') {
            return Err(ParseError::UnclosedGroup {
                fragment: self.fragment(start, self.pos),
                offset: start,
            });
        }
        self.depth -= 1;

        Ok(match capture {
            Some(index) => {
                self.open_groups.pop();
                SyntaxNode::Group {
                    index,
                    node: Box::new(node),
                }
            }
            None => node,
        })
    }

    /// Parse a character class: `[abc]`, `[a-z]`, `[^abc]`.
    fn parse_char_class(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.pos;
        self.advance(); // consume '['
        let negated = if self.peek() == Some('^') {
            self.advance();
            true
        } else {
            false
        };

        let unterminated = |parser: &Self| ParseError::UnterminatedClass {
            fragment: parser.fragment(start, parser.pos),
            offset: start,
        };

        let mut ranges = Vec::new();
        // Allow ']' as first character in class
        if self.peek() == Some(']') {
            self.advance();
            ranges.push(CharRange::single(']'));
        }

        loop {
            let item_start = self.pos;
            let lo = match self.advance() {
                None => return Err(unterminated(self)),
                Some(']') => break,
                Some('\\') => match self.advance() {
                    None => return Err(unterminated(self)),
                    Some(ch) => match ShorthandKind::from_escape(ch) {
                        Some(kind) => {
                            ranges.extend(kind.ranges());
                            continue;
                        }
                        None => control_escape(ch),
                    },
                },
                Some(ch) => ch,
            };

            // Check for range like a-z; a trailing '-' is literal.
            if self.peek() == Some('-') && self.peek_at(1).is_some_and(|ch| ch != ']') {
                self.advance(); // consume '-'
                let hi = match self.advance() {
                    Some('\\') => self.advance().map(control_escape),
                    other => other,
                };
                let Some(hi) = hi else {
                    return Err(unterminated(self));
                };
                if hi < lo {
                    return Err(ParseError::DescendingRange {
                        fragment: self.fragment(item_start, self.pos),
                        offset: item_start,
                    });
                }
                ranges.push(CharRange::chars(lo, hi));
            } else {
                ranges.push(CharRange::single(lo));
            }
        }

        let ranges = normalize(ranges);
        Ok(SyntaxNode::Class(if negated { negate(&ranges) } else { ranges }))
    }
}

/// Map the character following a backslash to the literal it denotes.
fn control_escape(ch: char) -> char {
    match ch {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        other => other,
    }
}
