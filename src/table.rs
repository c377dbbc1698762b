/// Transition cache keyed by DFA state and input symbol.
///
/// New transitions land in a hash map. Freezing merges them into a sorted
/// slice searched by bisection; afterwards the map stays empty unless the
/// automaton keeps growing.
use rustc_hash::FxHashMap;

use crate::determinize::{DfaStateId, Symbol, Transition};

type Key = (DfaStateId, Symbol);

#[derive(Debug, Default)]
pub struct TransitionTable {
    frozen: Box<[(Key, Transition)]>,
    recent: FxHashMap<Key, Transition>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, state: DfaStateId, symbol: Symbol) -> Option<&Transition> {
        let key = (state, symbol);
        if let Ok(index) = self.frozen.binary_search_by(|(k, _)| k.cmp(&key)) {
            return Some(&self.frozen[index].1);
        }
        self.recent.get(&key)
    }

    pub fn insert(&mut self, state: DfaStateId, symbol: Symbol, transition: Transition) {
        self.recent.insert((state, symbol), transition);
    }

    /// Merge the recent transitions into the sorted slice.
    pub fn freeze(&mut self) {
        if self.recent.is_empty() {
            return;
        }
        let mut entries: Vec<(Key, Transition)> = std::mem::take(&mut self.frozen).into_vec();
        entries.extend(self.recent.drain());
        entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        entries.dedup_by(|(a, _), (b, _)| a == b);
        self.frozen = entries.into_boxed_slice();
    }

    /// Whether every known transition lives in the sorted slice.
    pub fn is_frozen(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frozen.len() + self.recent.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::determinize::{Acceptance, Target};
    use crate::registers::Instruction;

    fn to(id: DfaStateId) -> Transition {
        Transition {
            target: Target::State {
                id,
                acceptance: Acceptance::Reject,
            },
            instructions: Arc::new([Instruction::Set { dst: id }]),
        }
    }

    #[test]
    fn lookup_before_and_after_freezing() {
        let mut table = TransitionTable::new();
        table.insert(0, Symbol::Class(1), to(1));
        table.insert(1, Symbol::End, to(1));
        table.insert(0, Symbol::Class(0), to(2));
        assert!(!table.is_frozen());
        assert_eq!(table.lookup(0, Symbol::Class(1)), Some(&to(1)));

        table.freeze();
        assert!(table.is_frozen());
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup(0, Symbol::Class(0)), Some(&to(2)));
        assert_eq!(table.lookup(0, Symbol::Class(1)), Some(&to(1)));
        assert_eq!(table.lookup(1, Symbol::End), Some(&to(1)));
        assert_eq!(table.lookup(1, Symbol::Class(0)), None);
    }

    #[test]
    fn growth_after_freezing_is_visible() {
        let mut table = TransitionTable::new();
        table.insert(0, Symbol::Class(0), to(1));
        table.freeze();
        table.insert(1, Symbol::Class(0), to(0));
        assert!(!table.is_frozen());
        assert_eq!(table.lookup(1, Symbol::Class(0)), Some(&to(0)));

        table.freeze();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(0, Symbol::Class(0)), Some(&to(1)));
    }

    #[test]
    fn freezing_an_empty_table() {
        let mut table = TransitionTable::new();
        table.freeze();
        assert_eq!(table.len(), 0);
        assert_eq!(table.lookup(0, Symbol::End), None);
    }
}
