use crate::{store, variable::Variable};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

pub(crate) type NodeRef = Rc<Node>;

/// Raw address of a node, used as the key of the sibling-keyed back-reference
/// caches. Valid as an identity for exactly as long as the node is alive,
/// which the cache invariants guarantee.
pub(crate) type NodeKey = usize;

/// Represents an operation with one input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryOp {
    Abs,
    Sgn,
    Sqrt,
    Cbrt,
    Exp,
    ExpM1,
    Log,
    Log1P,
    Sin,
    Cos,
    Tan,
    Sec,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sech,
    Asinh,
    Acosh,
    Atanh,
    Erf,
    Erfc,
    // The specialised kinds below preserve algebraic information that the
    // rewrites and derivative rules exploit. They are produced by the
    // algebra; user code cannot request them directly (except the last two).
    Invert,
    Negate,
    Square,
    XConic,
    YConic,
    ZConic,
    Softpp,
    Spence,
}

/// Represents an operation with two inputs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Mul,
    Pow,
}

/// The payload of a DAG node: its kind and its children. Children are set at
/// construction and never mutated, which keeps the graph acyclic.
pub(crate) enum Payload {
    /// The absorbing sink for undefined arithmetic. A singleton; every
    /// operation on it returns it.
    Nan,
    Constant(f64),
    Variable(Variable),
    Unary(UnaryOp, NodeRef),
    Binary(BinaryOp, NodeRef, NodeRef),
}

use Payload::{Binary, Constant, Nan, Unary};

/// Interior representation of an expression. At most one live node exists for
/// each structural identity; the constructors in `store` enforce this through
/// the interning tables and the per-node back-reference caches, and `Drop`
/// keeps those tables coherent.
pub(crate) struct Node {
    pub(crate) payload: Payload,
    /// 1 + the maximum child depth; consulted only to trigger re-association
    /// of deep `add`/`mul` chains.
    pub(crate) depth: i32,
    pub(crate) backrefs: RefCell<BackRefs>,
    /// Derivative memo for the current derivative traversal; purged by the
    /// public derivative entry point after the result is materialised.
    pub(crate) derivative: RefCell<Option<NodeRef>>,
    /// Memoised evaluation, valid iff `clean_level` equals the global dirty
    /// level.
    pub(crate) value: Cell<f64>,
    pub(crate) clean_level: Cell<u64>,
}

/// Non-owning back-references from a node to the composites it participates
/// in. A composite must unregister itself here before it releases its
/// children, which is what makes the raw-address keys and weak pointers safe.
#[derive(Default)]
pub(crate) struct BackRefs {
    pub(crate) functions: FxHashMap<UnaryOp, Weak<Node>>,
    pub(crate) add: FxHashMap<NodeKey, Weak<Node>>,
    pub(crate) mul: FxHashMap<NodeKey, Weak<Node>>,
    pub(crate) pow: FxHashMap<NodeKey, Weak<Node>>,
}

pub(crate) fn key(node: &NodeRef) -> NodeKey {
    Rc::as_ptr(node) as NodeKey
}

impl Node {
    pub(crate) fn new(payload: Payload, depth: i32) -> NodeRef {
        Rc::new(Node {
            payload,
            depth,
            backrefs: RefCell::new(BackRefs::default()),
            derivative: RefCell::new(None),
            value: Cell::new(0.0),
            clean_level: Cell::new(0),
        })
    }

    pub(crate) fn is_sink(&self) -> bool {
        matches!(&self.payload, Nan)
    }

    pub(crate) fn constant_value(&self) -> Option<f64> {
        match &self.payload {
            Constant(n) => Some(*n),
            _ => None,
        }
    }

    /// True when taking the reciprocal of this node cannot lose information,
    /// i.e. the reciprocal folds into existing structure.
    pub(crate) fn easy_invert(&self) -> bool {
        match &self.payload {
            Constant(n) => *n != 0.0,
            Unary(UnaryOp::Invert, _) => true,
            Unary(UnaryOp::Negate, f) => f.easy_invert(),
            _ => false,
        }
    }

    /// True when negating this node cannot lose information.
    pub(crate) fn easy_negate(&self) -> bool {
        match &self.payload {
            Constant(_) => true,
            Unary(UnaryOp::Negate, _) => true,
            Unary(UnaryOp::Invert, f) => f.easy_negate(),
            _ => false,
        }
    }
}

impl Drop for Node {
    /// Unregister this composite from the back-reference caches of its
    /// children before the child handles are released. A missing or stale
    /// entry indicates a reference-counting bug; fail loudly in debug builds
    /// and detach silently in release builds.
    fn drop(&mut self) {
        let this = self as *const Node;
        match &self.payload {
            Nan => {}
            Constant(n) => store::forget_constant(*n, this),
            Payload::Variable(v) => store::forget_variable(v.id(), this),
            Unary(op, f) => {
                let removed = f.backrefs.borrow_mut().functions.remove(op);
                debug_assert!(
                    matches!(&removed, Some(w) if w.as_ptr() == this),
                    "function cache entry lost for {op:?}"
                );
            }
            Binary(op, f, g) => {
                let remove = |owner: &NodeRef, k: NodeKey| {
                    let mut backrefs = owner.backrefs.borrow_mut();
                    let removed = match op {
                        BinaryOp::Add => backrefs.add.remove(&k),
                        BinaryOp::Mul => backrefs.mul.remove(&k),
                        BinaryOp::Pow => backrefs.pow.remove(&k),
                    };
                    debug_assert!(
                        matches!(&removed, Some(w) if w.as_ptr() == this),
                        "operator cache entry lost for {op:?}"
                    );
                };
                match op {
                    // Symmetric entries on both operands; one entry when the
                    // operands coincide.
                    BinaryOp::Add | BinaryOp::Mul => {
                        remove(f, key(g));
                        if !Rc::ptr_eq(f, g) {
                            remove(g, key(f));
                        }
                    }
                    // The pow cache lives on the base, keyed by the exponent.
                    BinaryOp::Pow => remove(f, key(g)),
                }
            }
        }
    }
}
