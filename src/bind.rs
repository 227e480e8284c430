//! Substitution of variable leaves by expressions. The rebuilt composites go
//! through the rewriting constructors, so a substitution result is
//! hash-consed and simplified like any directly built expression; in
//! particular, substituting into an expression that does not mention any of
//! the mapped variables returns the original nodes unchanged.

use crate::algebra::{add, apply_unary, mul, pow};
use crate::node::{BinaryOp, NodeRef, Payload};

pub(crate) fn bind(node: &NodeRef, mapping: &[(usize, NodeRef)]) -> NodeRef {
    match &node.payload {
        Payload::Nan | Payload::Constant(_) => node.clone(),
        Payload::Variable(v) => {
            for (id, replacement) in mapping {
                if *id == v.id() {
                    return replacement.clone();
                }
            }
            node.clone()
        }
        Payload::Unary(op, f) => apply_unary(*op, &bind(f, mapping)),
        Payload::Binary(op, f, g) => {
            let bf = bind(f, mapping);
            let bg = bind(g, mapping);
            match op {
                BinaryOp::Add => add(&bf, &bg),
                BinaryOp::Mul => mul(&bf, &bg),
                BinaryOp::Pow => pow(&bf, &bg),
            }
        }
    }
}
