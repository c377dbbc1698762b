/// Compiler: converts the AST into a tagged NFA.
///
/// States live in an arena and refer to each other by index. Loops are built
/// in two steps: the loop head is allocated as a placeholder, the body is
/// emitted against it, and the head is linked once the body's entry is known.
use std::fmt;

use smallvec::SmallVec;

use crate::ast::{CharRange, SyntaxNode};
use crate::parser::Parsed;

/// Index of a TNFA state.
pub type StateId = u32;

const UNLINKED: StateId = StateId::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
    Open,
    Close,
}

/// A group boundary event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub group: usize,
    pub kind: TagKind,
}

impl Tag {
    pub fn open(group: usize) -> Self {
        Tag {
            group,
            kind: TagKind::Open,
        }
    }

    pub fn close(group: usize) -> Self {
        Tag {
            group,
            kind: TagKind::Close,
        }
    }

    /// Dense index of this tag: `2g` for the open tag, `2g + 1` for close.
    pub fn index(self) -> usize {
        self.group * 2 + (self.kind == TagKind::Close) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub target: StateId,
    pub priority: Priority,
    pub tag: Option<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Consume one character from any of `ranges` and move to `next`.
    Range {
        ranges: SmallVec<[CharRange; 2]>,
        next: StateId,
    },
    /// Epsilon split; `high` is explored before `low`.
    Split { high: Edge, low: Option<Edge> },
    Final,
}

/// Tagged NFA for one pattern.
#[derive(Debug, Clone)]
pub struct Tnfa {
    pub states: Vec<State>,
    pub start: StateId,
    pub final_state: StateId,
    pub group_count: usize,
    /// Innermost enclosing group of every group, indexed by group.
    pub parents: Vec<usize>,
}

impl Tnfa {
    /// Number of tags, including the two of the implicit group 0.
    pub fn tag_count(&self) -> usize {
        (self.group_count + 1) * 2
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id as usize]
    }

    /// Every range labelling a transition.
    pub fn ranges(&self) -> impl Iterator<Item = CharRange> + '_ {
        self.states.iter().flat_map(|state| match state {
            State::Range { ranges, .. } => ranges.as_slice(),
            _ => &[][..],
        })
        .copied()
    }

    /// Number of states that can appear in a DFA state: range states and the
    /// final state.
    pub fn kernel_count(&self) -> usize {
        self.states
            .iter()
            .filter(|state| !matches!(state, State::Split { .. }))
            .count()
    }
}

impl fmt::Display for Tnfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edge = |f: &mut fmt::Formatter<'_>, e: &Edge| match e.tag {
            Some(tag) => write!(f, "{:?}{}->{}", tag.kind, tag.group, e.target),
            None => write!(f, "->{}", e.target),
        };
        for (id, state) in self.states.iter().enumerate() {
            let marker = if id as StateId == self.start { "*" } else { " " };
            write!(f, "{marker}{id:4}: ")?;
            match state {
                State::Range { ranges, next } => {
                    for range in ranges {
                        write!(f, "{range}")?;
                    }
                    writeln!(f, " -> {next}")?;
                }
                State::Split { high, low } => {
                    f.write_str("split ")?;
                    edge(f, high)?;
                    if let Some(low) = low {
                        f.write_str(" | ")?;
                        edge(f, low)?;
                    }
                    writeln!(f)?;
                }
                State::Final => writeln!(f, "final")?,
            }
        }
        Ok(())
    }
}

/// Compile a parsed pattern into a TNFA. The whole pattern is wrapped in
/// group 0.
pub fn compile(parsed: &Parsed) -> Tnfa {
    let mut builder = Builder { states: Vec::new() };
    let final_state = builder.push(State::Final);
    let start = builder.emit_group(0, &parsed.node, final_state);

    // Every placeholder must have been linked.
    for state in &builder.states {
        if let State::Split { high, low } = state {
            assert!(
                high.target != UNLINKED && low.is_none_or(|low| low.target != UNLINKED),
                "unlinked split state in TNFA"
            );
        }
    }

    Tnfa {
        states: builder.states,
        start,
        final_state,
        group_count: parsed.group_count,
        parents: parsed.parents.clone(),
    }
}

struct Builder {
    states: Vec<State>,
}

impl Builder {
    fn push(&mut self, state: State) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push(state);
        id
    }

    fn placeholder(&mut self) -> StateId {
        self.push(State::Split {
            high: epsilon(UNLINKED, Priority::High),
            low: None,
        })
    }

    /// Link a placeholder as a two-way split preferring `preferred` unless
    /// `lazy`.
    fn link(&mut self, id: StateId, preferred: StateId, other: StateId, lazy: bool) {
        self.states[id as usize] = split(preferred, other, lazy);
    }

    /// Emit `node` so that it continues at `next`; returns its entry state.
    fn emit(&mut self, node: &SyntaxNode, next: StateId) -> StateId {
        match node {
            SyntaxNode::Empty => next,
            SyntaxNode::Literal(range) => self.push(State::Range {
                ranges: SmallVec::from_slice(&[*range]),
                next,
            }),
            SyntaxNode::Class(ranges) => self.push(State::Range {
                ranges: SmallVec::from_slice(ranges),
                next,
            }),
            SyntaxNode::Any => self.push(State::Range {
                ranges: SmallVec::from_slice(&[CharRange::FULL]),
                next,
            }),
            SyntaxNode::Concat(..) => {
                // Long literal runs nest deeply to the right.
                let mut parts = Vec::new();
                let mut node = node;
                while let SyntaxNode::Concat(left, right) = node {
                    parts.push(left.as_ref());
                    node = right.as_ref();
                }
                let mut entry = self.emit(node, next);
                for part in parts.into_iter().rev() {
                    entry = self.emit(part, entry);
                }
                entry
            }
            SyntaxNode::Alternation(..) => {
                let mut branches = Vec::new();
                let mut node = node;
                while let SyntaxNode::Alternation(left, right) = node {
                    branches.push(left.as_ref());
                    node = right.as_ref();
                }
                let mut entry = self.emit(node, next);
                for branch in branches.into_iter().rev() {
                    let branch = self.emit(branch, next);
                    entry = self.push(split(branch, entry, false));
                }
                entry
            }
            SyntaxNode::Group { index, node } => self.emit_group(*index, node, next),
            SyntaxNode::Repetition {
                node,
                min,
                max,
                lazy,
            } => self.emit_repetition(node, *min, *max, *lazy, next),
        }
    }

    fn emit_group(&mut self, index: usize, node: &SyntaxNode, next: StateId) -> StateId {
        let close = self.push(State::Split {
            high: tagged(next, Tag::close(index)),
            low: None,
        });
        let body = self.emit(node, close);
        self.push(State::Split {
            high: tagged(body, Tag::open(index)),
            low: None,
        })
    }

    fn emit_repetition(
        &mut self,
        node: &SyntaxNode,
        min: u32,
        max: Option<u32>,
        lazy: bool,
        next: StateId,
    ) -> StateId {
        let (mut entry, mandatory) = match max {
            // node{min,}: min - 1 copies followed by node+, or node* when
            // min is zero.
            None if min == 0 => (self.emit_star(node, lazy, next), 0),
            None => (self.emit_plus(node, lazy, next), min - 1),
            // node{min,max}: min copies followed by max - min nested
            // optionals, node(node(node)?)?
            Some(max) => {
                let mut entry = next;
                for _ in min..max {
                    let body = self.emit(node, entry);
                    entry = self.push(split(body, next, lazy));
                }
                (entry, min)
            }
        };
        for _ in 0..mandatory {
            entry = self.emit(node, entry);
        }
        entry
    }

    // L1: split L2, next (greedy: prefer L2)
    // L2: <node> -> L1
    fn emit_star(&mut self, node: &SyntaxNode, lazy: bool, next: StateId) -> StateId {
        let head = self.placeholder();
        let body = self.emit(node, head);
        self.link(head, body, next, lazy);
        head
    }

    // L1: <node> -> L2
    // L2: split L1, next (greedy: prefer L1)
    fn emit_plus(&mut self, node: &SyntaxNode, lazy: bool, next: StateId) -> StateId {
        let tail = self.placeholder();
        let body = self.emit(node, tail);
        self.link(tail, body, next, lazy);
        body
    }
}

fn epsilon(target: StateId, priority: Priority) -> Edge {
    Edge {
        target,
        priority,
        tag: None,
    }
}

fn tagged(target: StateId, tag: Tag) -> Edge {
    Edge {
        target,
        priority: Priority::High,
        tag: Some(tag),
    }
}

fn split(preferred: StateId, other: StateId, lazy: bool) -> State {
    let (high, low) = if lazy {
        (other, preferred)
    } else {
        (preferred, other)
    };
    State::Split {
        high: epsilon(high, Priority::High),
        low: Some(epsilon(low, Priority::Low)),
    }
}
