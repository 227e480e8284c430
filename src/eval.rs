//! Numeric evaluation: the scalar kernel for every node kind, and the
//! dirty-level memoisation that makes repeated evaluation of shared
//! subexpressions cheap. A node's cached value is valid exactly while its
//! recorded level equals the global dirty level, which every variable
//! assignment advances.

use crate::node::{BinaryOp, NodeRef, Payload, UnaryOp};
use crate::{numeric, store};

impl UnaryOp {
    /// The scalar kernel behind this node kind. Also used by the algebra to
    /// fold constants, so folded and evaluated results always agree.
    pub(crate) fn apply(self, x: f64) -> f64 {
        use UnaryOp::*;
        match self {
            Abs => x.abs(),
            Sgn => ((x > 0.0) as i8 - (x < 0.0) as i8) as f64,
            Sqrt => x.sqrt(),
            Cbrt => x.cbrt(),
            Exp => x.exp(),
            ExpM1 => x.exp_m1(),
            Log => x.ln(),
            Log1P => x.ln_1p(),
            Sin => x.sin(),
            Cos => x.cos(),
            Tan => x.tan(),
            Sec => 1.0 / x.cos(),
            Asin => x.asin(),
            Acos => x.acos(),
            Atan => x.atan(),
            Sinh => x.sinh(),
            Cosh => x.cosh(),
            Tanh => x.tanh(),
            Sech => 1.0 / x.cosh(),
            Asinh => x.asinh(),
            Acosh => x.acosh(),
            Atanh => x.atanh(),
            Erf => libm::erf(x),
            Erfc => libm::erfc(x),
            Invert => 1.0 / x,
            Negate => -x,
            Softpp => numeric::spp(x),
            Spence => numeric::li2(x),
            Square => x * x,
            XConic => f64::sqrt(x * x - 1.0),
            YConic => f64::sqrt(x * x + 1.0),
            ZConic => f64::sqrt(1.0 - x * x),
        }
    }
}

pub(crate) fn evaluate(node: &NodeRef) -> f64 {
    let dirty = store::dirty_level();
    if node.clean_level.get() != dirty {
        node.value.set(compute(node));
        node.clean_level.set(dirty);
    }
    node.value.get()
}

fn compute(node: &NodeRef) -> f64 {
    match &node.payload {
        Payload::Nan => f64::NAN,
        Payload::Constant(n) => *n,
        Payload::Variable(v) => v.value(),
        Payload::Unary(op, f) => op.apply(evaluate(f)),
        Payload::Binary(BinaryOp::Add, f, g) => evaluate(f) + evaluate(g),
        Payload::Binary(BinaryOp::Mul, f, g) => {
            // A zero factor short-circuits: the other operand is not
            // evaluated at all, so 0 * NaN and 0 * inf both yield 0. This
            // lets a gating variable prune undefined branches of the DAG at
            // runtime, and is a documented deviation from IEEE semantics.
            let x = evaluate(f);
            if x == 0.0 {
                return 0.0;
            }
            let y = evaluate(g);
            if y == 0.0 {
                return 0.0;
            }
            x * y
        }
        Payload::Binary(BinaryOp::Pow, f, g) => f64::powf(evaluate(f), evaluate(g)),
    }
}
