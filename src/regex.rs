use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::compiler::compile;
use crate::config::Config;
use crate::error::Result;
use crate::history::HistoryIds;
use crate::parser::Parser;
use crate::r#match::{self, MatchResult};
use crate::vm::{self, Cache, Matcher, Program};

/// A compiled pattern.
///
/// Matching is anchored at the start of the text and extracts every
/// iteration of every capturing group without backtracking. The DFA behind
/// it is built lazily and shared by all calls, including calls from other
/// threads.
///
/// Some patterns (many nested or counted optional repetitions, for example)
/// can make the number of DFA states grow exponentially. Nothing here bounds
/// that growth; callers matching untrusted patterns should watch
/// [`Regex::state_count`] or run matches under their own time budget.
///
/// ```
/// use regex_tdfa::Regex;
///
/// let re = Regex::new("((a+)b)+").unwrap();
/// let m = re.interpret("aabab");
/// assert_eq!(m.end(), Some(5));
/// assert_eq!(m.spans(2), &[0..2, 3..4]);
/// ```
pub struct Regex {
    pattern: String,
    config: Config,
    program: Program,
    cache: RwLock<Cache>,
    ids: HistoryIds,
    clean_runs: AtomicUsize,
}

impl Regex {
    /// Compile `pattern` with the default [`Config`].
    pub fn new(pattern: &str) -> Result<Self> {
        Self::with_config(pattern, Config::default())
    }

    pub fn with_config(pattern: &str, config: Config) -> Result<Self> {
        let parsed = Parser::new(pattern, &config).parse()?;
        let program = Program::new(compile(&parsed));
        debug!(pattern, groups = parsed.group_count, "compiled pattern");
        let cache = RwLock::new(Cache::new(&program));
        Ok(Regex {
            pattern: pattern.to_string(),
            config,
            program,
            cache,
            ids: HistoryIds::new(),
            clean_runs: AtomicUsize::new(0),
        })
    }

    /// Match `text` from its first character.
    pub fn interpret(&self, text: &str) -> MatchResult {
        let run = Matcher::new(&self.program, &self.cache, &self.ids).run(text);
        self.record(run.expansions);
        match run.accepted {
            Some(registers) => r#match::build(&registers, &self.program.layout, &self.program.tnfa.parents),
            None => MatchResult::NoMatch,
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.interpret(text).is_match()
    }

    /// Number of capturing groups, not counting group 0.
    pub fn group_count(&self) -> usize {
        self.program.tnfa.group_count
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Number of DFA states built so far.
    pub fn state_count(&self) -> usize {
        vm::read(&self.cache).state_count()
    }

    /// Freeze the transition table once enough runs in a row found every
    /// transition already cached.
    fn record(&self, expansions: usize) {
        if expansions > 0 {
            self.clean_runs.store(0, Ordering::Relaxed);
            return;
        }
        let threshold = self.config.freeze_after;
        let clean = self.clean_runs.fetch_add(1, Ordering::Relaxed) + 1;
        if threshold == 0 || clean < threshold {
            return;
        }
        if !vm::read(&self.cache).is_frozen() {
            vm::write(&self.cache).freeze();
        }
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Regex")
            .field("pattern", &self.pattern)
            .field("groups", &self.group_count())
            .field("states", &self.state_count())
            .finish()
    }
}
