/// Interpreter: drives input through the lazily expanded DFA.
///
/// Every step looks the transition up in the shared cache and only takes the
/// write lock to expand a pair nobody has seen yet. Register updates produce a
/// new persistent register file per step; nothing shared is mutated.
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use crate::alphabet::Alphabet;
use crate::compiler::Tnfa;
use crate::determinize::{Acceptance, DfaStateId, Determinizer, RegisterLayout, Symbol, Target, Transition};
use crate::history::HistoryIds;
use crate::registers::Registers;
use crate::table::TransitionTable;

/// The immutable part of a compiled pattern.
#[derive(Debug)]
pub struct Program {
    pub tnfa: Tnfa,
    pub alphabet: Alphabet,
    pub layout: RegisterLayout,
}

impl Program {
    pub fn new(tnfa: Tnfa) -> Self {
        let alphabet = Alphabet::partition(tnfa.ranges());
        let layout = RegisterLayout::new(&tnfa);
        debug!(
            states = tnfa.states.len(),
            classes = alphabet.len(),
            registers = layout.slots(),
            "built program"
        );
        trace!("tagged NFA:\n{tnfa}");
        Program {
            tnfa,
            alphabet,
            layout,
        }
    }
}

/// Lazily built part of a compiled pattern: DFA states and the transitions
/// discovered so far.
pub struct Cache {
    determinizer: Determinizer,
    table: TransitionTable,
    start: Option<Transition>,
}

impl Cache {
    pub fn new(program: &Program) -> Self {
        Cache {
            determinizer: Determinizer::new(program.layout),
            table: TransitionTable::new(),
            start: None,
        }
    }

    pub fn state_count(&self) -> usize {
        self.determinizer.len()
    }

    pub fn is_frozen(&self) -> bool {
        self.table.is_frozen()
    }

    pub fn freeze(&mut self) {
        self.table.freeze();
        debug!(transitions = self.table.len(), "froze transition table");
    }
}

pub(crate) fn read(cache: &RwLock<Cache>) -> RwLockReadGuard<'_, Cache> {
    cache.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write(cache: &RwLock<Cache>) -> RwLockWriteGuard<'_, Cache> {
    cache.write().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of one run.
pub struct Run {
    /// Registers of the winning thread, flushed to the output bank.
    pub accepted: Option<Registers>,
    /// Number of transitions this run had to build.
    pub expansions: usize,
}

pub struct Matcher<'a> {
    program: &'a Program,
    cache: &'a RwLock<Cache>,
    ids: &'a HistoryIds,
    expansions: usize,
}

impl<'a> Matcher<'a> {
    pub fn new(program: &'a Program, cache: &'a RwLock<Cache>, ids: &'a HistoryIds) -> Self {
        Matcher {
            program,
            cache,
            ids,
            expansions: 0,
        }
    }

    /// Match `input` from its first character. The last accepting state seen
    /// wins; stepping stops once no higher-priority thread is left.
    pub fn run(mut self, input: &str) -> Run {
        let start = self.start();
        let Target::State { id, acceptance } = start.target else {
            return self.finish(None);
        };
        let mut registers =
            Registers::new(self.program.layout.slots(), self.ids).execute(&start.instructions, 0, self.ids);
        let mut state = id;
        let mut candidate = None;
        if acceptance != Acceptance::Reject {
            candidate = Some((state, registers.clone(), 0));
        }

        if acceptance != Acceptance::Settled {
            for (index, ch) in input.chars().enumerate() {
                let Some(class) = self.program.alphabet.classify(ch) else {
                    trace!(position = index, "character outside the alphabet");
                    break;
                };
                let transition = self.step(state, Symbol::Class(class));
                let Target::State { id, acceptance } = transition.target else {
                    break;
                };
                let position = index + 1;
                registers = registers.execute(&transition.instructions, position, self.ids);
                state = id;
                match acceptance {
                    Acceptance::Reject => {}
                    Acceptance::Candidate => candidate = Some((state, registers.clone(), position)),
                    Acceptance::Settled => {
                        candidate = Some((state, registers.clone(), position));
                        break;
                    }
                }
            }
        }

        let accepted = candidate.and_then(|(state, registers, position)| {
            let flush = self.step(state, Symbol::End);
            match flush.target {
                Target::State { .. } => Some(registers.execute(&flush.instructions, position, self.ids)),
                Target::Dead => None,
            }
        });
        self.finish(accepted)
    }

    fn finish(self, accepted: Option<Registers>) -> Run {
        Run {
            accepted,
            expansions: self.expansions,
        }
    }

    fn start(&mut self) -> Transition {
        if let Some(start) = &read(self.cache).start {
            return start.clone();
        }
        let mut cache = write(self.cache);
        if let Some(start) = &cache.start {
            return start.clone();
        }
        let start = cache.determinizer.start(&self.program.tnfa);
        cache.start = Some(start.clone());
        self.expansions += 1;
        start
    }

    fn step(&mut self, state: DfaStateId, symbol: Symbol) -> Transition {
        if let Some(transition) = read(self.cache).table.lookup(state, symbol) {
            return transition.clone();
        }
        let mut guard = write(self.cache);
        // Another run may have built it while we waited for the lock.
        if let Some(transition) = guard.table.lookup(state, symbol) {
            return transition.clone();
        }
        let Cache {
            determinizer, table, ..
        } = &mut *guard;
        let transition = determinizer.expand(&self.program.tnfa, &self.program.alphabet, state, symbol);
        table.insert(state, symbol, transition.clone());
        self.expansions += 1;
        transition
    }
}
