/// Persistent position histories.
///
/// A `History` is one link of an immutable chain. Branching creates a new
/// child that points at its parent, so every thread of the automaton can
/// extend a shared prefix without disturbing the other threads holding it.
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of history identifiers. Each compiled pattern owns one, so ids are
/// unique for the lifetime of the pattern.
#[derive(Debug, Default)]
pub struct HistoryIds {
    next: AtomicU64,
}

impl HistoryIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct History(Rc<Node>);

struct Node {
    id: u64,
    value: Option<usize>,
    parent: Option<History>,
}

impl History {
    /// A root with no recorded position.
    pub fn unset(ids: &HistoryIds) -> Self {
        History(Rc::new(Node {
            id: ids.next(),
            value: None,
            parent: None,
        }))
    }

    /// A new history recording `position` on top of this one.
    pub fn child(&self, ids: &HistoryIds, position: usize) -> Self {
        History(Rc::new(Node {
            id: ids.next(),
            value: Some(position),
            parent: Some(self.clone()),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn value(&self) -> Option<usize> {
        self.0.value
    }

    pub fn parent(&self) -> Option<&History> {
        self.0.parent.as_ref()
    }

    /// Own value followed by every predecessor's value.
    pub fn iter(&self) -> Iter<'_> {
        Iter { next: Some(self) }
    }

    /// Committed positions, newest first.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter().flatten()
    }
}

impl PartialEq for History {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for History {}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.id())?;
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = Option<usize>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

pub struct Iter<'a> {
    next: Option<&'a History>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Option<usize>;

    fn next(&mut self) -> Option<Option<usize>> {
        let current = self.next?;
        self.next = current.parent();
        Some(current.value())
    }
}

// Chains grow with every iteration of a repeated group. Unlink them one node
// at a time so dropping a long chain cannot overflow the stack.
impl Drop for Node {
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(History(rc)) = parent {
            match Rc::try_unwrap(rc) {
                Ok(mut node) => parent = node.parent.take(),
                Err(_) => break,
            }
        }
    }
}
