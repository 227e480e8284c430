//! Symbolic differentiation. Every rule emits nodes through the algebra, so
//! the rewrites apply to derivatives exactly as they do to user-built
//! expressions, and hash-consing makes repeated derivation idempotent.
//!
//! During one derivative construction each node memoises its derivative, so a
//! subgraph shared by many parents is differentiated once. The public entry
//! point purges those memos immediately afterwards; the purge recurses only
//! through nodes that actually hold one, so its cost is bounded by the
//! derived subgraph.

use crate::algebra::{
    add, cos, cosh, exp, invert, log, log1p, mul, negate, pow, sec, sech, sgn, sin, sinh, square,
    tan, tanh, xconic, yconic, zconic,
};
use crate::node::{BinaryOp, NodeRef, Payload, UnaryOp};
use crate::store::{constant, sink};
use crate::variable::Variable;

/// Derivative of `node` with respect to `var`, memoised on the node for the
/// duration of the current traversal.
pub(crate) fn derive(node: &NodeRef, var: &Variable) -> NodeRef {
    if let Some(cached) = node.derivative.borrow().clone() {
        return cached;
    }
    let result = derivative(node, var);
    *node.derivative.borrow_mut() = Some(result.clone());
    result
}

/// Drop the derivative memos of `node` and of every descendant that holds
/// one. Called by the public derivative operation after materialising its
/// result.
pub(crate) fn purge(node: &NodeRef) {
    if node.derivative.borrow_mut().take().is_none() {
        return;
    }
    match &node.payload {
        Payload::Nan | Payload::Constant(_) | Payload::Variable(_) => {}
        Payload::Unary(_, f) => purge(f),
        Payload::Binary(_, f, g) => {
            purge(f);
            purge(g);
        }
    }
}

fn derivative(node: &NodeRef, var: &Variable) -> NodeRef {
    use UnaryOp::*;
    match &node.payload {
        Payload::Nan => sink(),
        // D(n) = 0
        Payload::Constant(_) => constant(0.0),
        // D(x) = 1 , D(?) = 0
        Payload::Variable(v) => constant((v == var) as i32 as f64),
        Payload::Unary(op, f) => {
            let df = derive(f, var);
            match op {
                // D(abs f) = D(f) * sgn f
                Abs => mul(&sgn(f), &df),
                // Jump discontinuity at zero notwithstanding; flat elsewhere.
                Sgn => constant(0.0),
                // D(sqrt f) = D(f) * 1/2 * 1/sqrt(f)
                Sqrt => mul(&df, &mul(&invert(node), &constant(0.5))),
                // D(cbrt f) = D(f) * 1/3 * 1/cbrt(f)^2
                Cbrt => mul(&df, &mul(&invert(&square(node)), &constant(1.0 / 3.0))),
                // D(exp f) = D(f) * exp f
                Exp => mul(&df, node),
                // D(expm1 f) = D(f) * exp f
                ExpM1 => mul(&df, &exp(f)),
                // D(log f) = D(f) / f
                Log => mul(&df, &invert(f)),
                // D(log1p f) = D(f) / (1 + f)
                Log1P => mul(&df, &invert(&add(f, &constant(1.0)))),
                // D(sin f) = D(f) * cos f
                Sin => mul(&df, &cos(f)),
                // D(cos f) = D(f) * -sin f
                Cos => mul(&df, &negate(&sin(f))),
                // D(tan f) = D(f) * sec(f)^2
                Tan => mul(&df, &square(&sec(f))),
                // D(sec f) = D(f) * tan(f) * sec(f)
                Sec => mul(&df, &mul(&tan(f), node)),
                // D(asin f) = D(f) / sqrt(1 - f^2)
                Asin => mul(&df, &invert(&zconic(f))),
                // D(acos f) = -D(f) / sqrt(1 - f^2)
                Acos => mul(&df, &negate(&invert(&zconic(f)))),
                // D(atan f) = D(f) / (f^2 + 1)
                Atan => mul(&df, &invert(&square(&yconic(f)))),
                // D(sinh f) = D(f) * cosh f
                Sinh => mul(&df, &cosh(f)),
                // D(cosh f) = D(f) * sinh f
                Cosh => mul(&df, &sinh(f)),
                // D(tanh f) = D(f) * sech(f)^2
                Tanh => mul(&df, &square(&sech(f))),
                // D(sech f) = D(f) * -tanh(f) * sech(f)
                Sech => mul(&df, &negate(&mul(&tanh(f), node))),
                // D(asinh f) = D(f) / sqrt(f^2 + 1)
                Asinh => mul(&df, &invert(&yconic(f))),
                // D(acosh f) = D(f) / sqrt(f^2 - 1)
                Acosh => mul(&df, &invert(&xconic(f))),
                // D(atanh f) = D(f) / (1 - f^2)
                Atanh => mul(&df, &invert(&square(&zconic(f)))),
                // D(erf f) = D(f) * 1/exp(f^2) * 1/sqrt(atan 1)
                Erf => mul(
                    &df,
                    &mul(
                        &invert(&exp(&square(f))),
                        &constant(1.0 / f64::sqrt(f64::atan(1.0))),
                    ),
                ),
                // D(erfc f) = D(f) * 1/exp(f^2) * -1/sqrt(atan 1)
                Erfc => mul(
                    &df,
                    &mul(
                        &invert(&exp(&square(f))),
                        &constant(-1.0 / f64::sqrt(f64::atan(1.0))),
                    ),
                ),
                // D(1/f) = D(f) * -(1/f)^2
                Invert => mul(&df, &negate(&square(node))),
                // D(-f) = -D(f)
                Negate => negate(&df),
                // D(softpp f) = D(f) * log(1 + exp f)
                Softpp => mul(&df, &log1p(&exp(f))),
                // D(Li2 f) = D(f) * log(1 - f) / (-f)
                Spence => {
                    let neg = negate(f);
                    mul(&df, &mul(&log1p(&neg), &invert(&neg)))
                }
                // D(f^2) = D(f) * 2 f
                Square => mul(&df, &mul(f, &constant(2.0))),
                // D(sqrt(f^2 - 1)) = D(f) * f / sqrt(f^2 - 1)
                XConic => mul(&df, &mul(&invert(node), f)),
                // D(sqrt(f^2 + 1)) = D(f) * f / sqrt(f^2 + 1)
                YConic => mul(&df, &mul(&invert(node), f)),
                // D(sqrt(1 - f^2)) = D(f) * -f / sqrt(1 - f^2)
                ZConic => mul(&df, &negate(&mul(&invert(node), f))),
            }
        }
        Payload::Binary(op, f, g) => {
            let df = derive(f, var);
            let dg = derive(g, var);
            match op {
                // D(f + g) = D(f) + D(g)
                BinaryOp::Add => add(&df, &dg),
                // D(f * g) = D(f) * g + D(g) * f
                BinaryOp::Mul => add(&mul(f, &dg), &mul(g, &df)),
                // D(f^g) = D(f) * g * f^(g-1) + D(g) * f^g * log(f)
                BinaryOp::Pow => {
                    let fg1 = pow(f, &add(g, &constant(-1.0)));
                    add(
                        &mul(&df, &mul(g, &fg1)),
                        &mul(&dg, &mul(node, &log(f))),
                    )
                }
            }
        }
    }
}
