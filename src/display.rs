//! The infix printer. Output is minimal: parentheses appear only where the
//! conventional precedence of `+`, `*` and `^` would misread the DAG
//! otherwise, and every function prints as `name(argument)`.

use crate::expr::Expression;
use crate::node::{BinaryOp, NodeRef, Payload, UnaryOp};
use std::fmt::{self, Display, Formatter, Write};

impl Display for Expression {
    fn fmt(&self, out: &mut Formatter<'_>) -> fmt::Result {
        print(self.node(), out)
    }
}

impl std::fmt::Debug for Expression {
    fn fmt(&self, out: &mut Formatter<'_>) -> fmt::Result {
        write!(out, "Expression({self})")
    }
}

fn function_name(op: UnaryOp) -> &'static str {
    use UnaryOp::*;
    match op {
        Abs => "abs",
        Sgn => "sgn",
        Sqrt => "sqrt",
        Cbrt => "cbrt",
        Exp => "exp",
        ExpM1 => "expm1",
        Log => "log",
        Log1P => "log1p",
        Sin => "sin",
        Cos => "cos",
        Tan => "tan",
        Sec => "sec",
        Asin => "asin",
        Acos => "acos",
        Atan => "atan",
        Sinh => "sinh",
        Cosh => "cosh",
        Tanh => "tanh",
        Sech => "sech",
        Asinh => "asinh",
        Acosh => "acosh",
        Atanh => "atanh",
        Erf => "erf",
        Erfc => "erfc",
        Softpp => "softpp",
        Spence => "Li2",
        XConic => "xconic",
        YConic => "yconic",
        ZConic => "zconic",
        // Printed with dedicated notation below.
        Invert | Negate | Square => unreachable!(),
    }
}

fn is_binary(node: &NodeRef, op: BinaryOp) -> bool {
    matches!(&node.payload, Payload::Binary(o, ..) if *o == op)
}

fn parenthesized(
    node: &NodeRef,
    out: &mut dyn Write,
    parens: bool,
) -> fmt::Result {
    if parens {
        write!(out, "(")?;
        print(node, out)?;
        write!(out, ")")
    } else {
        print(node, out)
    }
}

fn print(node: &NodeRef, out: &mut dyn Write) -> fmt::Result {
    match &node.payload {
        Payload::Nan => write!(out, "nan"),
        Payload::Constant(n) => write!(out, "{n}"),
        Payload::Variable(v) => write!(out, "{}", v.name()),
        Payload::Unary(UnaryOp::Negate, f) => {
            write!(out, "-")?;
            parenthesized(f, out, is_binary(f, BinaryOp::Add))
        }
        Payload::Unary(UnaryOp::Invert, f) => {
            write!(out, "1/(")?;
            print(f, out)?;
            write!(out, ")")
        }
        Payload::Unary(UnaryOp::Square, f) => {
            let parens = is_binary(f, BinaryOp::Add) || is_binary(f, BinaryOp::Mul);
            parenthesized(f, out, parens)?;
            write!(out, "^2")
        }
        Payload::Unary(op, f) => {
            write!(out, "{}(", function_name(*op))?;
            print(f, out)?;
            write!(out, ")")
        }
        Payload::Binary(BinaryOp::Add, f, g) => {
            print(f, out)?;
            write!(out, "+")?;
            print(g, out)
        }
        Payload::Binary(BinaryOp::Mul, f, g) => {
            let needs = |n: &NodeRef| is_binary(n, BinaryOp::Add) || is_binary(n, BinaryOp::Pow);
            parenthesized(f, out, needs(f))?;
            write!(out, "*")?;
            parenthesized(g, out, needs(g))
        }
        Payload::Binary(BinaryOp::Pow, f, g) => {
            let needs = |n: &NodeRef| {
                is_binary(n, BinaryOp::Add)
                    || is_binary(n, BinaryOp::Mul)
                    || is_binary(n, BinaryOp::Pow)
            };
            parenthesized(f, out, needs(f))?;
            write!(out, "^")?;
            parenthesized(g, out, needs(g))
        }
    }
}

#[cfg(test)]
mod test {
    use crate::expr::Expression;
    use crate::variable::Variable;

    fn named(name: &str) -> Expression {
        Expression::from(Variable::named(name))
    }

    #[test]
    fn t_leaves() {
        assert_eq!(format!("{}", Expression::default()), "nan");
        assert_eq!(format!("{}", Expression::from(14.0)), "14");
        assert_eq!(format!("{}", Expression::from(0.5)), "0.5");
        assert_eq!(format!("{}", named("alpha")), "alpha");
    }

    #[test]
    fn t_functions() {
        let x = named("x");
        assert_eq!(format!("{}", x.sin()), "sin(x)");
        assert_eq!(format!("{}", x.sin().exp()), "exp(sin(x))");
        assert_eq!(format!("{}", x.li2()), "Li2(x)");
        assert_eq!(format!("{}", x.spp()), "softpp(x)");
    }

    #[test]
    fn t_negate_and_invert() {
        let x = named("x");
        let y = named("y");
        assert_eq!(format!("{}", -x.sin()), "-sin(x)");
        assert_eq!(format!("{}", -(x.clone() + y.clone())), "-(x+y)");
        assert_eq!(format!("{}", Expression::from(1.0) / x.clone()), "1/(x)");
        // x - y prints through the negate rewrite.
        assert_eq!(format!("{}", x - y), "x+-y");
    }

    #[test]
    fn t_square_parenthesisation() {
        let x = named("x");
        let y = named("y");
        assert_eq!(format!("{}", x.pow(2)), "x^2");
        assert_eq!(format!("{}", (x.clone() + y.clone()).pow(2)), "(x+y)^2");
        assert_eq!(format!("{}", (x * y).pow(2)), "(x*y)^2");
    }

    #[test]
    fn t_mul_parenthesisation() {
        let x = named("x");
        let y = named("y");
        let z = named("z");
        assert_eq!(format!("{}", (x.clone() + y.clone()) * z.clone()), "(x+y)*z");
        assert_eq!(format!("{}", x.clone() * y.clone() + z.clone()), "x*y+z");
        let p = x.pow(y.clone()) * z;
        assert_eq!(format!("{p}"), "(x^y)*z");
    }

    #[test]
    fn t_pow_parenthesisation() {
        let x = named("x");
        let y = named("y");
        let z = named("z");
        assert_eq!(format!("{}", (x.clone() * y.clone()).pow(z.clone())), "(x*y)^z");
        assert_eq!(format!("{}", x.pow(y + z)), "x^(y+z)");
    }

    #[test]
    fn t_folded_constants_print_folded() {
        let e = Expression::from(2.0) + Expression::from(3.0) * Expression::from(4.0);
        assert_eq!(format!("{e}"), "14");
    }
}
