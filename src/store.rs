//! Process-wide (per-thread) shared state: the interning tables that give
//! every structural identity at most one live node, the NaN sink singleton,
//! the dirty-level counter behind the evaluation cache, and the generic
//! cache-or-construct tails of the unary and binary constructors.

use crate::node::{key, BinaryOp, Node, NodeKey, NodeRef, Payload, UnaryOp};
use crate::variable::Variable;
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Default)]
struct Tables {
    constants: FxHashMap<u64, Weak<Node>>,
    variables: FxHashMap<usize, Weak<Node>>,
}

thread_local! {
    static TABLES: RefCell<Tables> = RefCell::new(Tables::default());
    static SINK: NodeRef = Node::new(Payload::Nan, 0);
    static DIRTY_LEVEL: Cell<u64> = const { Cell::new(1) };
    static VARIABLE_LABEL: Cell<u64> = const { Cell::new(0) };
}

/// The absorbing node for undefined arithmetic.
pub(crate) fn sink() -> NodeRef {
    SINK.with(Rc::clone)
}

/// Current value of the global dirty level.
pub(crate) fn dirty_level() -> u64 {
    DIRTY_LEVEL.with(Cell::get)
}

/// Advance the global dirty level, invalidating every memoised evaluation.
pub(crate) fn touch() {
    DIRTY_LEVEL.with(|level| level.set(level.get() + 1));
}

pub(crate) fn next_variable_label() -> u64 {
    VARIABLE_LABEL.with(|label| {
        label.set(label.get() + 1);
        label.get()
    })
}

/// Collapse the two zero spellings so they intern to one node.
fn normalize(n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        n
    }
}

/// Intern a constant. NaN collapses to the sink; all other values get at most
/// one live node each.
pub(crate) fn constant(n: f64) -> NodeRef {
    if n.is_nan() {
        return sink();
    }
    let n = normalize(n);
    TABLES.with(|tables| {
        let mut tables = tables.borrow_mut();
        if let Some(node) = tables.constants.get(&n.to_bits()).and_then(Weak::upgrade) {
            return node;
        }
        let node = Node::new(Payload::Constant(n), 0);
        let prev = tables.constants.insert(n.to_bits(), Rc::downgrade(&node));
        debug_assert!(prev.is_none());
        node
    })
}

/// Intern the leaf node of a variable, keyed by the identity of its cell.
pub(crate) fn variable(var: &Variable) -> NodeRef {
    TABLES.with(|tables| {
        let mut tables = tables.borrow_mut();
        if let Some(node) = tables.variables.get(&var.id()).and_then(Weak::upgrade) {
            return node;
        }
        let node = Node::new(Payload::Variable(var.clone()), 1);
        let prev = tables.variables.insert(var.id(), Rc::downgrade(&node));
        debug_assert!(prev.is_none());
        node
    })
}

/// Called from a constant node's destructor. `try_with` keeps thread teardown
/// graceful when the tables are gone before the last handles.
pub(crate) fn forget_constant(n: f64, node: *const Node) {
    let _ = TABLES.try_with(|tables| {
        let removed = tables.borrow_mut().constants.remove(&normalize(n).to_bits());
        debug_assert!(
            matches!(&removed, Some(w) if w.as_ptr() == node),
            "constant table entry lost for {n}"
        );
    });
}

/// Called from a variable node's destructor.
pub(crate) fn forget_variable(id: usize, node: *const Node) {
    let _ = TABLES.try_with(|tables| {
        let removed = tables.borrow_mut().variables.remove(&id);
        debug_assert!(
            matches!(&removed, Some(w) if w.as_ptr() == node),
            "variable table entry lost"
        );
    });
}

/// Generic tail of every unary constructor: return the cached wrapper for
/// `op` around `f`, or construct and register one.
pub(crate) fn function(f: &NodeRef, op: UnaryOp) -> NodeRef {
    if let Some(node) = f.backrefs.borrow().functions.get(&op).and_then(Weak::upgrade) {
        return node;
    }
    let node = Node::new(Payload::Unary(op, f.clone()), f.depth + 1);
    let prev = f.backrefs.borrow_mut().functions.insert(op, Rc::downgrade(&node));
    debug_assert!(prev.is_none());
    node
}

/// Generic tail of the two-phase `add`: the cache is consulted on the node
/// that received the `commutative_add` dispatch (the right operand) and the
/// composite is registered symmetrically on both operands.
pub(crate) fn cached_add(lhs: &NodeRef, rhs: &NodeRef) -> NodeRef {
    cached_commutative(lhs, rhs, BinaryOp::Add)
}

/// Generic tail of the two-phase `mul`; symmetric registration like `add`.
pub(crate) fn cached_mul(lhs: &NodeRef, rhs: &NodeRef) -> NodeRef {
    cached_commutative(lhs, rhs, BinaryOp::Mul)
}

fn cached_commutative(lhs: &NodeRef, rhs: &NodeRef, op: BinaryOp) -> NodeRef {
    let cached = {
        let refs = rhs.backrefs.borrow();
        let map = if op == BinaryOp::Add { &refs.add } else { &refs.mul };
        map.get(&key(lhs)).and_then(Weak::upgrade)
    };
    if let Some(node) = cached {
        return node;
    }
    let node = Node::new(
        Payload::Binary(op, lhs.clone(), rhs.clone()),
        lhs.depth.max(rhs.depth) + 1,
    );
    register(lhs, key(rhs), op, &node);
    if !Rc::ptr_eq(lhs, rhs) {
        register(rhs, key(lhs), op, &node);
    }
    node
}

fn register(owner: &NodeRef, k: NodeKey, op: BinaryOp, node: &NodeRef) {
    let mut refs = owner.backrefs.borrow_mut();
    let map = if op == BinaryOp::Add { &mut refs.add } else { &mut refs.mul };
    let prev = map.insert(k, Rc::downgrade(node));
    debug_assert!(prev.is_none());
}

/// Generic tail of `pow`: the cache lives on the base, keyed by the exponent.
pub(crate) fn cached_pow(base: &NodeRef, expo: &NodeRef) -> NodeRef {
    if let Some(node) = base
        .backrefs
        .borrow()
        .pow
        .get(&key(expo))
        .and_then(Weak::upgrade)
    {
        return node;
    }
    let node = Node::new(
        Payload::Binary(BinaryOp::Pow, base.clone(), expo.clone()),
        base.depth.max(expo.depth) + 1,
    );
    let prev = base
        .backrefs
        .borrow_mut()
        .pow
        .insert(key(expo), Rc::downgrade(&node));
    debug_assert!(prev.is_none());
    node
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn t_constants_are_interned() {
        let a = constant(2.5);
        let b = constant(2.5);
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &constant(3.5)));
    }

    #[test]
    fn t_negative_zero_collapses() {
        let pos = constant(0.0);
        let neg = constant(-0.0);
        assert!(Rc::ptr_eq(&pos, &neg));
        assert_eq!(pos.constant_value(), Some(0.0));
    }

    #[test]
    fn t_nan_constant_is_the_sink() {
        let nan = constant(f64::NAN);
        assert!(nan.is_sink());
        assert!(Rc::ptr_eq(&nan, &sink()));
    }

    #[test]
    fn t_interned_constant_is_released() {
        let value: f64 = 12345.6789;
        let bits = value.to_bits();
        {
            let _node = constant(value);
            TABLES.with(|t| assert!(t.borrow().constants.contains_key(&bits)));
        }
        // The last handle is gone; the table entry must be gone with it.
        TABLES.with(|t| assert!(!t.borrow().constants.contains_key(&bits)));
    }

    #[test]
    fn t_variable_nodes_are_interned_per_cell() {
        let x = Variable::new();
        let y = Variable::new();
        let xn = variable(&x);
        assert!(Rc::ptr_eq(&xn, &variable(&x)));
        assert!(Rc::ptr_eq(&xn, &variable(&x.clone())));
        assert!(!Rc::ptr_eq(&xn, &variable(&y)));
    }

    #[test]
    fn t_function_cache_shares_wrappers() {
        let x = Variable::new();
        let xn = variable(&x);
        let a = function(&xn, UnaryOp::Sin);
        let b = function(&xn, UnaryOp::Sin);
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &function(&xn, UnaryOp::Cos)));
        assert_eq!(a.depth, xn.depth + 1);
    }

    #[test]
    fn t_function_cache_entry_dies_with_the_wrapper() {
        let x = Variable::new();
        let xn = variable(&x);
        {
            let _sin = function(&xn, UnaryOp::Sin);
            assert!(xn.backrefs.borrow().functions.contains_key(&UnaryOp::Sin));
        }
        assert!(!xn.backrefs.borrow().functions.contains_key(&UnaryOp::Sin));
    }

    #[test]
    fn t_add_cache_is_symmetric() {
        let x = variable(&Variable::new());
        let y = variable(&Variable::new());
        let xy = cached_add(&x, &y);
        // Either operand order finds the same composite.
        assert!(Rc::ptr_eq(&xy, &cached_add(&x, &y)));
        assert!(xy.backrefs.borrow().add.is_empty());
        assert!(x.backrefs.borrow().add.contains_key(&key(&y)));
        assert!(y.backrefs.borrow().add.contains_key(&key(&x)));
    }

    #[test]
    fn t_add_of_a_node_with_itself() {
        let x = variable(&Variable::new());
        let xx = cached_add(&x, &x);
        assert!(Rc::ptr_eq(&xx, &cached_add(&x, &x)));
        drop(xx);
        assert!(x.backrefs.borrow().add.is_empty());
    }

    #[test]
    fn t_pow_cache_lives_on_the_base() {
        let x = variable(&Variable::new());
        let y = variable(&Variable::new());
        let p = cached_pow(&x, &y);
        assert!(Rc::ptr_eq(&p, &cached_pow(&x, &y)));
        assert!(x.backrefs.borrow().pow.contains_key(&key(&y)));
        assert!(y.backrefs.borrow().pow.is_empty());
        drop(p);
        assert!(x.backrefs.borrow().pow.is_empty());
    }
}
