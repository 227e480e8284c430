//! The public expression handle and the free functions operating on groups
//! of variables. An `Expression` is a reference-counted pointer into the
//! shared DAG; cloning is cheap and equality is node identity, which
//! hash-consing makes the same thing as structural identity.

use crate::node::NodeRef;
use crate::{algebra, attribute::Attribute, bind, derivative, error::Error, eval, store};
use crate::variable::Variable;
use std::rc::Rc;

/// A list of variable/expression pairs, as consumed by [`Expression::bind_all`]
/// and [`atomic_assign`].
pub type Bindings = Vec<(Variable, Expression)>;

pub struct Expression {
    node: NodeRef,
}

impl Expression {
    pub(crate) fn from_node(node: NodeRef) -> Expression {
        Expression { node }
    }

    pub(crate) fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Evaluate under the current variable bindings. Undefined arithmetic
    /// yields NaN; there is no other failure mode.
    pub fn evaluate(&self) -> f64 {
        eval::evaluate(&self.node)
    }

    /// The symbolic derivative with respect to `var`, as a new expression.
    /// Derivatives are expressions like any other: they can be evaluated,
    /// composed and derived again. Calling this twice returns the same
    /// handle.
    pub fn derive(&self, var: &Variable) -> Expression {
        let result = derivative::derive(&self.node, var);
        derivative::purge(&self.node);
        Expression::from_node(result)
    }

    /// Substitute a single variable by a constant.
    pub fn bind(&self, var: &Variable, value: f64) -> Expression {
        self.bind_all(&[(var.clone(), Expression::from(value))])
    }

    /// Substitute every mapped variable simultaneously. The replacement
    /// expressions see none of the other substitutions, so a mapping may
    /// e.g. swap two variables.
    pub fn bind_all(&self, bindings: &[(Variable, Expression)]) -> Expression {
        let mapping: Vec<(usize, NodeRef)> = bindings
            .iter()
            .map(|(var, expr)| (var.id(), expr.node.clone()))
            .collect();
        Expression::from_node(bind::bind(&self.node, &mapping))
    }

    /// Conservative query: `true` means the property provably holds over the
    /// valid domain; `false` means unknown.
    pub fn guaranteed(&self, attr: Attribute) -> bool {
        crate::attribute::guaranteed(&self.node, attr)
    }

    /// Height of this node in the DAG.
    pub fn depth(&self) -> i32 {
        self.node.depth
    }

    /// Manually advance the dirty level, invalidating every cached
    /// evaluation. Variable assignment does this implicitly.
    pub fn touch() {
        store::touch();
    }

    pub fn pow(&self, expo: impl Into<Expression>) -> Expression {
        Expression::from_node(algebra::pow(&self.node, &expo.into().node))
    }

    pub fn abs(&self) -> Expression {
        Expression::from_node(algebra::abs(&self.node))
    }

    pub fn sgn(&self) -> Expression {
        Expression::from_node(algebra::sgn(&self.node))
    }

    pub fn sqrt(&self) -> Expression {
        Expression::from_node(algebra::sqrt(&self.node))
    }

    pub fn cbrt(&self) -> Expression {
        Expression::from_node(algebra::cbrt(&self.node))
    }

    pub fn exp(&self) -> Expression {
        Expression::from_node(algebra::exp(&self.node))
    }

    pub fn expm1(&self) -> Expression {
        Expression::from_node(algebra::expm1(&self.node))
    }

    pub fn log(&self) -> Expression {
        Expression::from_node(algebra::log(&self.node))
    }

    pub fn log1p(&self) -> Expression {
        Expression::from_node(algebra::log1p(&self.node))
    }

    pub fn sin(&self) -> Expression {
        Expression::from_node(algebra::sin(&self.node))
    }

    pub fn cos(&self) -> Expression {
        Expression::from_node(algebra::cos(&self.node))
    }

    pub fn tan(&self) -> Expression {
        Expression::from_node(algebra::tan(&self.node))
    }

    pub fn asin(&self) -> Expression {
        Expression::from_node(algebra::asin(&self.node))
    }

    pub fn acos(&self) -> Expression {
        Expression::from_node(algebra::acos(&self.node))
    }

    pub fn atan(&self) -> Expression {
        Expression::from_node(algebra::atan(&self.node))
    }

    pub fn sinh(&self) -> Expression {
        Expression::from_node(algebra::sinh(&self.node))
    }

    pub fn cosh(&self) -> Expression {
        Expression::from_node(algebra::cosh(&self.node))
    }

    pub fn tanh(&self) -> Expression {
        Expression::from_node(algebra::tanh(&self.node))
    }

    pub fn asinh(&self) -> Expression {
        Expression::from_node(algebra::asinh(&self.node))
    }

    pub fn acosh(&self) -> Expression {
        Expression::from_node(algebra::acosh(&self.node))
    }

    pub fn atanh(&self) -> Expression {
        Expression::from_node(algebra::atanh(&self.node))
    }

    pub fn erf(&self) -> Expression {
        Expression::from_node(algebra::erf(&self.node))
    }

    pub fn erfc(&self) -> Expression {
        Expression::from_node(algebra::erfc(&self.node))
    }

    /// The real dilogarithm, defined for arguments <= 1.
    pub fn li2(&self) -> Expression {
        Expression::from_node(algebra::spence(&self.node))
    }

    /// The integral of the softplus function.
    pub fn spp(&self) -> Expression {
        Expression::from_node(algebra::softpp(&self.node))
    }

    // The remaining node kinds (sec, invert, square, the conics, ...) are
    // reachable only through rewrites such as 1/cos(x), x * x or pow(x, 2);
    // their direct constructors stay internal.
}

/// Snapshot every right-hand side, then assign every left-hand variable, so
/// all the values are computed against the pre-assignment state. A
/// non-finite snapshot fails the whole operation before any variable is
/// written.
pub fn atomic_assign(bindings: &[(Variable, Expression)]) -> Result<(), Error> {
    let values: Vec<f64> = bindings.iter().map(|(_, expr)| expr.evaluate()).collect();
    for &value in &values {
        if !value.is_finite() {
            return Err(Error::NonFiniteAssignment(value));
        }
    }
    for ((var, _), value) in bindings.iter().zip(values) {
        var.assign(value)?;
    }
    Ok(())
}

impl Clone for Expression {
    fn clone(&self) -> Expression {
        Expression {
            node: self.node.clone(),
        }
    }
}

/// The empty expression is the NaN sink.
impl Default for Expression {
    fn default() -> Expression {
        Expression::from_node(store::sink())
    }
}

/// Node identity. Because every construction is hash-consed, two expressions
/// built the same way compare equal.
impl PartialEq for Expression {
    fn eq(&self, other: &Expression) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Expression {}

impl From<Variable> for Expression {
    fn from(var: Variable) -> Expression {
        Expression::from_node(store::variable(&var))
    }
}

impl From<&Variable> for Expression {
    fn from(var: &Variable) -> Expression {
        Expression::from_node(store::variable(var))
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Expression {
        Expression::from_node(store::constant(value))
    }
}

impl From<i32> for Expression {
    fn from(value: i32) -> Expression {
        Expression::from_node(store::constant(value as f64))
    }
}

fn sub_nodes(a: &NodeRef, b: &NodeRef) -> NodeRef {
    // f - g = f + -g
    algebra::add(a, &algebra::negate(b))
}

fn div_nodes(a: &NodeRef, b: &NodeRef) -> NodeRef {
    // f / g = f * 1/g
    algebra::mul(a, &algebra::invert(b))
}

macro_rules! binary_operator {
    ($op:ident, $method:ident, $node_fn:path) => {
        impl std::ops::$op<Expression> for Expression {
            type Output = Expression;
            fn $method(self, rhs: Expression) -> Expression {
                Expression::from_node($node_fn(self.node(), rhs.node()))
            }
        }

        impl std::ops::$op<&Expression> for Expression {
            type Output = Expression;
            fn $method(self, rhs: &Expression) -> Expression {
                Expression::from_node($node_fn(self.node(), rhs.node()))
            }
        }

        impl std::ops::$op<Expression> for &Expression {
            type Output = Expression;
            fn $method(self, rhs: Expression) -> Expression {
                Expression::from_node($node_fn(self.node(), rhs.node()))
            }
        }

        impl std::ops::$op<&Expression> for &Expression {
            type Output = Expression;
            fn $method(self, rhs: &Expression) -> Expression {
                Expression::from_node($node_fn(self.node(), rhs.node()))
            }
        }

        impl std::ops::$op<f64> for Expression {
            type Output = Expression;
            fn $method(self, rhs: f64) -> Expression {
                Expression::from_node($node_fn(self.node(), &store::constant(rhs)))
            }
        }

        impl std::ops::$op<f64> for &Expression {
            type Output = Expression;
            fn $method(self, rhs: f64) -> Expression {
                Expression::from_node($node_fn(self.node(), &store::constant(rhs)))
            }
        }

        impl std::ops::$op<Expression> for f64 {
            type Output = Expression;
            fn $method(self, rhs: Expression) -> Expression {
                Expression::from_node($node_fn(&store::constant(self), rhs.node()))
            }
        }

        impl std::ops::$op<&Expression> for f64 {
            type Output = Expression;
            fn $method(self, rhs: &Expression) -> Expression {
                Expression::from_node($node_fn(&store::constant(self), rhs.node()))
            }
        }
    };
}

binary_operator!(Add, add, algebra::add);
binary_operator!(Sub, sub, sub_nodes);
binary_operator!(Mul, mul, algebra::mul);
binary_operator!(Div, div, div_nodes);

impl std::ops::Neg for Expression {
    type Output = Expression;
    fn neg(self) -> Expression {
        Expression::from_node(algebra::negate(self.node()))
    }
}

impl std::ops::Neg for &Expression {
    type Output = Expression;
    fn neg(self) -> Expression {
        Expression::from_node(algebra::negate(self.node()))
    }
}
