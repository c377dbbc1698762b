/// On-demand determinization of the tagged NFA.
///
/// A DFA state is the ordered list of TNFA threads that survive an epsilon
/// closure, each with the registers holding its tag histories. Order is
/// priority: earlier threads win ties. Registers are numbered canonically (by
/// first appearance), so two closures that differ only in register naming
/// land on the same cached state; the per-transition instructions move the
/// register file from the source state's numbering into the target's.
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::alphabet::{Alphabet, ClassId};
use crate::compiler::{Edge, State, StateId, Tnfa};
use crate::registers::{Instruction, Reg};

/// Index of a DFA state.
pub type DfaStateId = u32;

/// One step of input: an alphabet element or the virtual end-of-input step
/// that flushes the accepting thread's registers to the output bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Class(ClassId),
    End,
}

/// Register file layout: the output bank (one slot per tag), the working
/// bank used by DFA states, and one scratch slot for breaking copy cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    tags: usize,
    working: usize,
}

impl RegisterLayout {
    /// Every thread holds at most one register per tag and a DFA state holds
    /// at most one thread per kernel state, which bounds the working bank.
    pub fn new(tnfa: &Tnfa) -> Self {
        let tags = tnfa.tag_count();
        RegisterLayout {
            tags,
            working: tnfa.kernel_count() * tags,
        }
    }

    pub fn tags(&self) -> usize {
        self.tags
    }

    pub fn slots(&self) -> usize {
        self.tags + self.working + 1
    }

    pub fn output(&self, tag: usize) -> Reg {
        assert!(tag < self.tags, "tag {tag} outside the output bank");
        tag as Reg
    }

    fn working(&self, reg: u32) -> Reg {
        assert!(
            (reg as usize) < self.working,
            "register {reg} outside the working bank of {}",
            self.working
        );
        self.tags as Reg + reg
    }

    fn scratch(&self) -> Reg {
        (self.tags + self.working) as Reg
    }
}

/// A TNFA state together with its per-tag working registers (`None` while a
/// tag has never fired on this thread).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
    pub state: StateId,
    pub registers: Box<[Option<u32>]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DfaState {
    configurations: Box<[Configuration]>,
}

impl DfaState {
    /// Number of working registers in use.
    fn register_count(&self) -> u32 {
        self.configurations
            .iter()
            .flat_map(|c| c.registers.iter().flatten())
            .max()
            .map_or(0, |&max| max + 1)
    }

    /// The closure stops at the final state, so an accepting thread is always
    /// the last one.
    pub fn acceptance(&self, tnfa: &Tnfa) -> Acceptance {
        match self.configurations.last() {
            Some(last) if last.state == tnfa.final_state => {
                if self.configurations.len() == 1 {
                    Acceptance::Settled
                } else {
                    Acceptance::Candidate
                }
            }
            _ => Acceptance::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Reject,
    /// Accepting, but higher-priority threads may still produce a match.
    Candidate,
    /// Accepting and no other thread is left.
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Dead,
    State {
        id: DfaStateId,
        acceptance: Acceptance,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: Target,
    pub instructions: Arc<[Instruction]>,
}

impl Transition {
    fn dead() -> Self {
        Transition {
            target: Target::Dead,
            instructions: Arc::new([]),
        }
    }
}

pub struct Determinizer {
    states: Vec<DfaState>,
    index: FxHashMap<DfaState, DfaStateId>,
    layout: RegisterLayout,
}

impl Determinizer {
    pub fn new(layout: RegisterLayout) -> Self {
        Determinizer {
            states: Vec::new(),
            index: FxHashMap::default(),
            layout,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// The closure of the TNFA start state, reached from a register file in
    /// which nothing is set.
    pub fn start(&mut self, tnfa: &Tnfa) -> Transition {
        let unset: Box<[Option<u32>]> = vec![None; self.layout.tags].into();
        let reached = closure(tnfa, &[(tnfa.start, 0)]);
        self.settle(tnfa, reached, &[&unset[..]], 0)
    }

    #[tracing::instrument(level = "trace", skip(self, tnfa, alphabet))]
    pub fn expand(
        &mut self,
        tnfa: &Tnfa,
        alphabet: &Alphabet,
        from: DfaStateId,
        symbol: Symbol,
    ) -> Transition {
        let source = self.states[from as usize].clone();
        let class = match symbol {
            Symbol::End => return self.flush(tnfa, &source, from),
            Symbol::Class(class) => class,
        };

        let element = alphabet.element(class);
        let seeds: Vec<(StateId, usize)> = source
            .configurations
            .iter()
            .enumerate()
            .filter_map(|(thread, c)| match tnfa.state(c.state) {
                State::Range { ranges, next } if ranges.iter().any(|r| r.contains(element.start)) => {
                    Some((*next, thread))
                }
                _ => None,
            })
            .collect();
        if seeds.is_empty() {
            trace!("no thread consumes {element}");
            return Transition::dead();
        }

        let reached = closure(tnfa, &seeds);
        let registers: Vec<&[Option<u32>]> = source
            .configurations
            .iter()
            .map(|c| &c.registers[..])
            .collect();
        self.settle(tnfa, reached, &registers, source.register_count())
    }

    /// Copy the accepting thread's registers into the output bank.
    fn flush(&self, tnfa: &Tnfa, source: &DfaState, from: DfaStateId) -> Transition {
        let acceptance = source.acceptance(tnfa);
        let Some(accepting) = source.configurations.last().filter(|_| acceptance != Acceptance::Reject) else {
            return Transition::dead();
        };
        let instructions: Vec<Instruction> = accepting
            .registers
            .iter()
            .enumerate()
            .map(|(tag, reg)| match reg {
                Some(reg) => Instruction::Copy {
                    src: self.layout.working(*reg),
                    dst: self.layout.output(tag),
                },
                None => Instruction::Close {
                    dst: self.layout.output(tag),
                },
            })
            .collect();
        Transition {
            target: Target::State {
                id: from,
                acceptance,
            },
            instructions: instructions.into(),
        }
    }

    /// Number the registers of the closure canonically, intern the resulting
    /// state and derive the instructions that produce its register file.
    fn settle(
        &mut self,
        tnfa: &Tnfa,
        reached: Vec<Reached>,
        seed_registers: &[&[Option<u32>]],
        previous_count: u32,
    ) -> Transition {
        if reached.is_empty() {
            return Transition::dead();
        }

        let mut values: Vec<Value> = Vec::new();
        let mut numbering: FxHashMap<Value, u32> = FxHashMap::default();
        let mut configurations = Vec::with_capacity(reached.len());
        for path in &reached {
            let inherited = seed_registers[path.seed];
            let registers: Box<[Option<u32>]> = (0..self.layout.tags)
                .map(|tag| {
                    let value = Value {
                        source: inherited[tag],
                        appends: path.fired.iter().filter(|&&fired| fired == tag).count() as u32,
                    };
                    if value.source.is_none() && value.appends == 0 {
                        return None;
                    }
                    Some(*numbering.entry(value).or_insert_with(|| {
                        values.push(value);
                        (values.len() - 1) as u32
                    }))
                })
                .collect();
            configurations.push(Configuration {
                state: path.state,
                registers,
            });
        }

        let state = DfaState {
            configurations: configurations.into(),
        };
        let acceptance = state.acceptance(tnfa);
        let id = self.intern(state);
        let instructions = self.instructions(&values, previous_count);
        trace!(id, ?acceptance, instructions = instructions.len(), "settled transition");
        Transition {
            target: Target::State { id, acceptance },
            instructions: instructions.into(),
        }
    }

    fn intern(&mut self, state: DfaState) -> DfaStateId {
        if let Some(&id) = self.index.get(&state) {
            return id;
        }
        let id = self.states.len() as DfaStateId;
        debug!(
            id,
            threads = state.configurations.len(),
            registers = state.register_count(),
            "new DFA state"
        );
        self.states.push(state.clone());
        self.index.insert(state, id);
        id
    }

    fn instructions(&self, values: &[Value], previous_count: u32) -> Vec<Instruction> {
        let layout = self.layout;
        let moves = values
            .iter()
            .enumerate()
            .map(|(reg, value)| Move {
                dst: layout.working(reg as u32),
                src: value.source.map(|src| layout.working(src)),
                branch: value.appends > 0,
            })
            .collect();
        let mut program = sequentialize(moves, layout.scratch());

        // A tag fired more than once on one path records the position again.
        for (reg, value) in values.iter().enumerate() {
            let reg = layout.working(reg as u32);
            for _ in 1..value.appends {
                program.push(Instruction::Branch { src: reg, dst: reg });
            }
        }
        // Release histories held by registers the new state no longer uses.
        for stale in values.len() as u32..previous_count {
            program.push(Instruction::Close {
                dst: layout.working(stale),
            });
        }
        program
    }
}

/// What a register of the new state holds, in terms of the source state's
/// registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Value {
    source: Option<u32>,
    appends: u32,
}

/// A thread reached by the closure: the kernel state it stopped at, the
/// source thread it descends from, and the tags fired on the way.
#[derive(Debug, Clone)]
struct Reached {
    state: StateId,
    seed: usize,
    fired: SmallVec<[usize; 4]>,
}

impl Reached {
    fn follow(&self, edge: &Edge) -> Reached {
        let mut fired = self.fired.clone();
        if let Some(tag) = edge.tag {
            fired.push(tag.index());
        }
        Reached {
            state: edge.target,
            seed: self.seed,
            fired,
        }
    }
}

/// Priority-first epsilon closure of `seeds` (given in priority order). The
/// first path to reach a state owns it. Exploration stops at the final state:
/// whatever is still pending has lower priority than the match.
fn closure(tnfa: &Tnfa, seeds: &[(StateId, usize)]) -> Vec<Reached> {
    let mut visited = vec![false; tnfa.states.len()];
    let mut stack: Vec<Reached> = seeds
        .iter()
        .rev()
        .map(|&(state, seed)| Reached {
            state,
            seed,
            fired: SmallVec::new(),
        })
        .collect();

    let mut reached = Vec::new();
    while let Some(path) = stack.pop() {
        let id = path.state as usize;
        if visited[id] {
            continue;
        }
        visited[id] = true;
        match tnfa.state(path.state) {
            State::Range { .. } => reached.push(path),
            State::Final => {
                reached.push(path);
                break;
            }
            State::Split { high, low } => {
                let mut edges: SmallVec<[&Edge; 2]> = std::iter::once(high).chain(low).collect();
                edges.sort_by_key(|edge| edge.priority);
                for edge in edges.iter().rev() {
                    stack.push(path.follow(edge));
                }
            }
        }
    }
    reached
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Move {
    dst: Reg,
    src: Option<Reg>,
    branch: bool,
}

impl Move {
    fn instruction(self) -> Instruction {
        match (self.src, self.branch) {
            (Some(src), false) => Instruction::Copy { src, dst: self.dst },
            (Some(src), true) => Instruction::Branch { src, dst: self.dst },
            (None, true) => Instruction::Set { dst: self.dst },
            (None, false) => unreachable!("move into r{} without a source", self.dst),
        }
    }
}

/// Order a set of parallel register moves so that every register is read
/// before it is overwritten. A move is ready once no other pending move reads
/// its destination; when only cycles remain, one destination is parked in
/// `scratch` and its readers redirected there.
fn sequentialize(mut moves: Vec<Move>, scratch: Reg) -> Vec<Instruction> {
    moves.retain(|m| m.branch || m.src != Some(m.dst));
    let mut program = Vec::with_capacity(moves.len());
    while !moves.is_empty() {
        let ready = moves.iter().position(|m| {
            !moves
                .iter()
                .any(|other| other.dst != m.dst && other.src == Some(m.dst))
        });
        let next = match ready {
            Some(index) => index,
            None => {
                let blocked = moves[0].dst;
                program.push(Instruction::Copy {
                    src: blocked,
                    dst: scratch,
                });
                for m in moves.iter_mut().filter(|m| m.src == Some(blocked)) {
                    m.src = Some(scratch);
                }
                0
            }
        };
        program.push(moves.remove(next).instruction());
    }
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::config::Config;
    use crate::parser::Parser;

    struct Fixture {
        tnfa: Tnfa,
        alphabet: Alphabet,
        determinizer: Determinizer,
    }

    impl Fixture {
        fn new(pattern: &str) -> Self {
            let tnfa = compile(&Parser::new(pattern, &Config::default()).parse().unwrap());
            let alphabet = Alphabet::partition(tnfa.ranges());
            let determinizer = Determinizer::new(RegisterLayout::new(&tnfa));
            Fixture {
                tnfa,
                alphabet,
                determinizer,
            }
        }

        fn step(&mut self, from: DfaStateId, ch: char) -> Transition {
            let class = self.alphabet.classify(ch).unwrap();
            self.determinizer
                .expand(&self.tnfa, &self.alphabet, from, Symbol::Class(class))
        }
    }

    fn target(transition: &Transition) -> (DfaStateId, Acceptance) {
        match transition.target {
            Target::State { id, acceptance } => (id, acceptance),
            Target::Dead => panic!("unexpected dead transition"),
        }
    }

    #[test]
    fn start_state_opens_group_zero() {
        let mut f = Fixture::new("ab");
        let start = f.determinizer.start(&f.tnfa);
        let (id, acceptance) = target(&start);
        assert_eq!(acceptance, Acceptance::Reject);
        assert_eq!(f.determinizer.states[id as usize].configurations.len(), 1);
        // Only the open tag of group 0 has fired.
        let layout = f.determinizer.layout;
        assert_eq!(&start.instructions[..], &[Instruction::Set { dst: layout.working(0) }]);
    }

    #[test]
    fn structurally_equal_states_are_shared() {
        let mut f = Fixture::new("a*a");
        let (start, _) = target(&f.determinizer.start(&f.tnfa));
        let first = f.step(start, 'a');
        let (s1, acceptance) = target(&first);
        assert_eq!(acceptance, Acceptance::Candidate);
        let (s2, _) = target(&f.step(s1, 'a'));
        assert_eq!(s1, s2);
        let count = f.determinizer.len();
        f.step(s2, 'a');
        assert_eq!(f.determinizer.len(), count);
    }

    #[test]
    fn lazy_match_settles_immediately() {
        let mut f = Fixture::new("a*?a");
        let (start, _) = target(&f.determinizer.start(&f.tnfa));
        let (_, acceptance) = target(&f.step(start, 'a'));
        assert_eq!(acceptance, Acceptance::Settled);
    }

    #[test]
    fn unknown_steps_are_dead() {
        let mut f = Fixture::new("ab");
        let (start, _) = target(&f.determinizer.start(&f.tnfa));
        assert_eq!(f.step(start, 'b').target, Target::Dead);
    }

    #[test]
    fn end_step_flushes_only_accepting_states() {
        let mut f = Fixture::new("(a)");
        let (start, _) = target(&f.determinizer.start(&f.tnfa));
        let end = f.determinizer.expand(&f.tnfa, &f.alphabet, start, Symbol::End);
        assert_eq!(end.target, Target::Dead);

        let (accepting, _) = target(&f.step(start, 'a'));
        let end = f
            .determinizer
            .expand(&f.tnfa, &f.alphabet, accepting, Symbol::End);
        assert_eq!(
            end.target,
            Target::State {
                id: accepting,
                acceptance: Acceptance::Settled
            }
        );
        assert_eq!(end.instructions.len(), 4);
        assert!(
            end.instructions
                .iter()
                .all(|i| matches!(i, Instruction::Copy { dst, .. } if *dst < 4))
        );
    }

    #[test]
    fn sequentialize_orders_dependent_copies() {
        // r1 <- r0 must run after r2 <- r1 reads r1.
        let program = sequentialize(
            vec![
                Move { dst: 1, src: Some(0), branch: false },
                Move { dst: 2, src: Some(1), branch: false },
            ],
            99,
        );
        assert_eq!(
            program,
            vec![
                Instruction::Copy { src: 1, dst: 2 },
                Instruction::Copy { src: 0, dst: 1 },
            ]
        );
    }

    #[test]
    fn sequentialize_breaks_cycles_through_scratch() {
        let program = sequentialize(
            vec![
                Move { dst: 0, src: Some(1), branch: false },
                Move { dst: 1, src: Some(0), branch: true },
                Move { dst: 2, src: Some(2), branch: false },
            ],
            9,
        );
        assert_eq!(
            program,
            vec![
                Instruction::Copy { src: 0, dst: 9 },
                Instruction::Copy { src: 1, dst: 0 },
                Instruction::Branch { src: 9, dst: 1 },
            ]
        );
    }

    #[test]
    fn sequentialize_keeps_in_place_branches() {
        let program = sequentialize(vec![Move { dst: 3, src: Some(3), branch: true }], 9);
        assert_eq!(program, vec![Instruction::Branch { src: 3, dst: 3 }]);
    }

    #[test]
    fn closure_follows_priority() {
        let f = Fixture::new("(a|ab)(c|bcd)");
        // From the start, the left alternative's range comes first.
        let reached = closure(&f.tnfa, &[(f.tnfa.start, 0)]);
        assert_eq!(reached.len(), 2);
        let first_tags: Vec<usize> = reached[0].fired.to_vec();
        // open 0, open 1
        assert_eq!(first_tags, vec![0, 2]);
    }
}
