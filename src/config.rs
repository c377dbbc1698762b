/// Tunables for compiling and running a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub(crate) max_nesting: usize,
    pub(crate) max_repetition: u32,
    pub(crate) freeze_after: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_nesting: 250,
            max_repetition: 1000,
            freeze_after: 4,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum depth of nested groups accepted by the parser.
    pub fn max_nesting(mut self, depth: usize) -> Self {
        self.max_nesting = depth;
        self
    }

    /// Largest count accepted in a `{n,m}` repetition. Counted repetitions
    /// are expanded into copies of their body, so this bounds automaton size.
    pub fn max_repetition(mut self, count: u32) -> Self {
        self.max_repetition = count;
        self
    }

    /// Number of consecutive matches that discover no new transitions before
    /// the transition table is packed into its frozen form. Zero disables
    /// freezing.
    pub fn freeze_after(mut self, runs: usize) -> Self {
        self.freeze_after = runs;
        self
    }
}
