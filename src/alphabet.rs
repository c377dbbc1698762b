/// Partition of the input domain into the DFA's effective alphabet.
use std::collections::BTreeMap;

use crate::ast::CharRange;

/// Index of a partition element.
pub type ClassId = u32;

/// Disjoint, sorted ranges such that every range of the automaton is a union
/// of elements. Characters outside every element have no transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    elements: Vec<CharRange>,
}

impl Alphabet {
    /// Split the domain at every range boundary, keeping the pieces covered by
    /// at least one range.
    pub fn partition<I: IntoIterator<Item = CharRange>>(ranges: I) -> Self {
        // Coverage delta at each boundary; ends are stored exclusive.
        let mut boundaries: BTreeMap<u64, i64> = BTreeMap::new();
        for range in ranges {
            *boundaries.entry(range.start as u64).or_default() += 1;
            *boundaries.entry(range.end as u64 + 1).or_default() -= 1;
        }

        let mut elements = Vec::new();
        let mut depth = 0;
        let mut previous = None;
        for (&boundary, &delta) in &boundaries {
            if let Some(start) = previous {
                if depth > 0 {
                    elements.push(CharRange::new(start as u32, (boundary - 1) as u32));
                }
            }
            depth += delta;
            previous = Some(boundary);
        }
        Alphabet { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn element(&self, id: ClassId) -> CharRange {
        self.elements[id as usize]
    }

    /// The element containing `ch`, if any.
    pub fn classify(&self, ch: char) -> Option<ClassId> {
        let symbol = ch as u32;
        let index = self.elements.partition_point(|e| e.end < symbol);
        match self.elements.get(index) {
            Some(element) if element.contains(symbol) => Some(index as ClassId),
            _ => None,
        }
    }
}
