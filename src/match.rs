/// Match results: group spans recovered from the output registers.
use std::fmt;
use std::ops::Range;

use crate::determinize::RegisterLayout;
use crate::registers::Registers;

/// One iteration of a capturing group, with the iterations of the groups
/// nested inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    group: usize,
    span: Range<usize>,
    children: Vec<Capture>,
}

impl Capture {
    pub fn group(&self) -> usize {
        self.group
    }

    pub fn start(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end
    }

    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Nested iterations in input order.
    pub fn children(&self) -> &[Capture] {
        &self.children
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{}: [{}, {})",
            "",
            self.group,
            self.span.start,
            self.span.end,
            indent = depth * 2
        )?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// A successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Every iteration of every group, oldest first.
    spans: Vec<Vec<Range<usize>>>,
    /// Positions recorded by every tag, oldest first.
    histories: Vec<Vec<usize>>,
    tree: Capture,
}

/// Outcome of matching a pattern against a text. Failing to match is an
/// ordinary result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    NoMatch,
    Match(Match),
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Match(_))
    }

    /// Start of the whole match in characters.
    pub fn start(&self) -> Option<usize> {
        self.group_start(0)
    }

    /// End of the whole match in characters, exclusive.
    pub fn end(&self) -> Option<usize> {
        self.group_end(0)
    }

    /// Start of the last iteration of group `g`, or `None` if the group did
    /// not take part in the match. Group 0 is the whole match.
    pub fn group_start(&self, g: usize) -> Option<usize> {
        self.group(g).map(|span| span.start)
    }

    pub fn group_end(&self, g: usize) -> Option<usize> {
        self.group(g).map(|span| span.end)
    }

    pub fn group(&self, g: usize) -> Option<Range<usize>> {
        self.spans(g).last().cloned()
    }

    /// Every iteration of group `g`, oldest first.
    pub fn spans(&self, g: usize) -> &[Range<usize>] {
        match self {
            MatchResult::Match(m) => m.spans.get(g).map_or(&[][..], Vec::as_slice),
            MatchResult::NoMatch => &[],
        }
    }

    /// Raw tag histories: entry `2g` holds the start positions of group `g`
    /// and entry `2g + 1` its end positions.
    pub fn histories(&self) -> Option<&[Vec<usize>]> {
        match self {
            MatchResult::Match(m) => Some(&m.histories),
            MatchResult::NoMatch => None,
        }
    }

    /// Group iterations nested by containment, rooted at group 0.
    pub fn tree(&self) -> Option<&Capture> {
        match self {
            MatchResult::Match(m) => Some(&m.tree),
            MatchResult::NoMatch => None,
        }
    }
}

/// Read the output bank of `registers` into a result. `parents` maps every
/// group to its innermost enclosing group.
pub(crate) fn build(registers: &Registers, layout: &RegisterLayout, parents: &[usize]) -> MatchResult {
    let histories: Vec<Vec<usize>> = (0..layout.tags())
        .map(|tag| {
            let mut positions: Vec<usize> = registers.get(layout.output(tag)).positions().collect();
            positions.reverse();
            positions
        })
        .collect();

    let spans: Vec<Vec<Range<usize>>> = histories
        .chunks(2)
        .map(|pair| {
            assert_eq!(
                pair[0].len(),
                pair[1].len(),
                "unbalanced group boundaries {:?}",
                pair
            );
            pair[0].iter().zip(&pair[1]).map(|(&start, &end)| start..end).collect()
        })
        .collect();

    let Some(whole) = spans[0].last().cloned() else {
        return MatchResult::NoMatch;
    };
    let tree = nest(&spans, parents, whole);
    MatchResult::Match(Match {
        spans,
        histories,
        tree,
    })
}

struct Node {
    group: usize,
    span: Range<usize>,
    children: Vec<usize>,
}

/// Attach every iteration to the latest iteration of its enclosing group
/// that contains it. Groups are numbered in pre-order, so a parent's
/// iterations are placed before its children's.
fn nest(spans: &[Vec<Range<usize>>], parents: &[usize], whole: Range<usize>) -> Capture {
    let mut nodes = vec![Node {
        group: 0,
        span: whole,
        children: Vec::new(),
    }];
    let mut placed: Vec<Vec<usize>> = vec![Vec::new(); spans.len()];
    placed[0].push(0);

    for (group, iterations) in spans.iter().enumerate().skip(1) {
        let parent = parents[group];
        for span in iterations {
            let host = placed[parent]
                .iter()
                .rev()
                .copied()
                .find(|&n| nodes[n].span.start <= span.start && span.end <= nodes[n].span.end)
                .unwrap_or(0);
            let id = nodes.len();
            nodes.push(Node {
                group,
                span: span.clone(),
                children: Vec::new(),
            });
            nodes[host].children.push(id);
            placed[group].push(id);
        }
    }

    assemble(&nodes, 0)
}

fn assemble(nodes: &[Node], id: usize) -> Capture {
    let node = &nodes[id];
    let mut children: Vec<Capture> = node.children.iter().map(|&c| assemble(nodes, c)).collect();
    children.sort_by_key(|c| (c.span.start, c.group));
    Capture {
        group: node.group,
        span: node.span.clone(),
        children,
    }
}
