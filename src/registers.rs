/// The register file: a persistent array of histories and the instructions
/// that update it.
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::history::{History, HistoryIds};

/// Index of a register slot.
pub type Reg = u32;

/// A register update attached to a DFA transition. `Set` and `Branch` read
/// the current input position when they are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `dst <- src`
    Copy { src: Reg, dst: Reg },
    /// `dst <- [pos]`
    Set { dst: Reg },
    /// `dst <- src + [pos]`
    Branch { src: Reg, dst: Reg },
    /// `dst <- unset`, releasing whatever history it held.
    Close { dst: Reg },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Copy { src, dst } => write!(f, "r{dst} <- r{src}"),
            Instruction::Set { dst } => write!(f, "r{dst} <- pos"),
            Instruction::Branch { src, dst } => write!(f, "r{dst} <- r{src} + pos"),
            Instruction::Close { dst } => write!(f, "r{dst} <- nil"),
        }
    }
}

/// Immutable array over a fixed index domain, stored as a balanced binary
/// tree. `set` copies only the path to the updated leaf.
pub struct PersistentArray<T> {
    root: Option<Rc<Tree<T>>>,
    len: usize,
}

enum Tree<T> {
    Leaf(T),
    Branch(Rc<Tree<T>>, Rc<Tree<T>>),
}

impl<T> Clone for PersistentArray<T> {
    fn clone(&self) -> Self {
        PersistentArray {
            root: self.root.clone(),
            len: self.len,
        }
    }
}

impl<T> PersistentArray<T> {
    /// An array of `len` copies of `fill`. Subtrees of equal size are shared,
    /// so this allocates O(log len) nodes.
    pub fn new(len: usize, fill: T) -> Self {
        if len == 0 {
            return PersistentArray { root: None, len };
        }
        let mut built: FxHashMap<usize, Rc<Tree<T>>> = FxHashMap::default();
        built.insert(1, Rc::new(Tree::Leaf(fill)));
        let root = Self::build(len, &mut built);
        PersistentArray {
            root: Some(root),
            len,
        }
    }

    fn build(len: usize, built: &mut FxHashMap<usize, Rc<Tree<T>>>) -> Rc<Tree<T>> {
        if let Some(tree) = built.get(&len) {
            return tree.clone();
        }
        let mid = len / 2;
        let left = Self::build(mid, built);
        let right = Self::build(len - mid, built);
        let tree = Rc::new(Tree::Branch(left, right));
        built.insert(len, tree.clone());
        tree
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn get(&self, index: usize) -> &T {
        assert!(index < self.len(), "index {index} out of bounds for length {}", self.len);
        let mut node = self.root.as_deref();
        let (mut index, mut len) = (index, self.len);
        loop {
            match node {
                Some(Tree::Leaf(value)) => return value,
                Some(Tree::Branch(left, right)) => {
                    let mid = len / 2;
                    if index < mid {
                        node = Some(&**left);
                        len = mid;
                    } else {
                        node = Some(&**right);
                        index -= mid;
                        len -= mid;
                    }
                }
                None => unreachable!("non-empty array without a root"),
            }
        }
    }

    /// A new array equal to this one except at `index`.
    pub fn set(&self, index: usize, value: T) -> Self {
        assert!(index < self.len(), "index {index} out of bounds for length {}", self.len);
        let root = match &self.root {
            Some(root) => Self::set_in(root, self.len, index, value),
            None => unreachable!("non-empty array without a root"),
        };
        PersistentArray {
            root: Some(root),
            len: self.len,
        }
    }

    fn set_in(node: &Rc<Tree<T>>, len: usize, index: usize, value: T) -> Rc<Tree<T>> {
        match node.as_ref() {
            Tree::Leaf(_) => Rc::new(Tree::Leaf(value)),
            Tree::Branch(left, right) => {
                let mid = len / 2;
                if index < mid {
                    Rc::new(Tree::Branch(Self::set_in(left, mid, index, value), right.clone()))
                } else {
                    Rc::new(Tree::Branch(
                        left.clone(),
                        Self::set_in(right, len - mid, index - mid, value),
                    ))
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Registers of one running match.
#[derive(Clone, Debug)]
pub struct Registers {
    slots: PersistentArray<History>,
    unset: History,
}

impl Registers {
    pub fn new(len: usize, ids: &HistoryIds) -> Self {
        let unset = History::unset(ids);
        Registers {
            slots: PersistentArray::new(len, unset.clone()),
            unset,
        }
    }

    pub fn get(&self, reg: Reg) -> &History {
        self.slots.get(reg as usize)
    }

    /// Run `program` at input position `pos`, returning the updated file. The
    /// receiver is left untouched.
    pub fn execute(&self, program: &[Instruction], pos: usize, ids: &HistoryIds) -> Registers {
        let mut slots = self.slots.clone();
        for instruction in program {
            slots = match *instruction {
                Instruction::Copy { src, dst } => {
                    let value = slots.get(src as usize).clone();
                    slots.set(dst as usize, value)
                }
                Instruction::Set { dst } => slots.set(dst as usize, self.unset.child(ids, pos)),
                Instruction::Branch { src, dst } => {
                    let value = slots.get(src as usize).child(ids, pos);
                    slots.set(dst as usize, value)
                }
                Instruction::Close { dst } => slots.set(dst as usize, self.unset.clone()),
            };
        }
        Registers {
            slots,
            unset: self.unset.clone(),
        }
    }
}
