//! The rewriting constructors. Every expression, including every node a
//! derivative or substitution produces, is built through these functions, so
//! the DAG never holds a configuration that one of the peephole rules below
//! could reduce. Each operation dispatches on the kind of its (left) operand
//! first; binary operations that find nothing to do there hand over to a
//! commutative second phase dispatched on the other operand, and only then
//! fall through to the generic cache-or-construct tails in `store`.

use crate::attribute::{guaranteed, Attribute};
use crate::node::{BinaryOp, NodeRef, Payload, UnaryOp};
use crate::store;
use std::rc::Rc;

/// Depth at which `add`/`mul` chains re-associate toward the shallower side
/// instead of growing further, keeping later recursive traversals within
/// native stack limits.
pub(crate) const ASSOC_LIMIT: i32 = 10_000;

use Payload::{Binary, Constant, Nan, Unary};
use UnaryOp::*;

pub(crate) fn abs(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Abs.apply(*n)),
        Unary(Abs | Sqrt | Exp | Acos | Cosh | Acosh | Square | XConic | YConic | ZConic, _) => {
            x.clone()
        }
        Unary(Invert, f) => invert(&abs(f)),
        Unary(Negate, f) => abs(f),
        _ if guaranteed(x, Attribute::NonNegative) => x.clone(),
        _ if guaranteed(x, Attribute::NonPositive) => negate(x),
        _ => store::function(x, Abs),
    }
}

pub(crate) fn sgn(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Sgn.apply(*n)),
        Unary(Sgn, _) => x.clone(),
        Unary(Exp | Cosh, _) => store::constant(1.0),
        Unary(Abs, f) => abs(&sgn(f)),
        Unary(Cbrt | Asin | Atan | Sinh | Tanh | Asinh | Atanh | Erf, f) => sgn(f),
        Unary(Invert, f) => invert(&sgn(f)),
        Unary(Negate, f) => negate(&sgn(f)),
        _ if guaranteed(x, Attribute::Positive) => store::constant(1.0),
        _ if guaranteed(x, Attribute::Negative) => store::constant(-1.0),
        _ => store::function(x, Sgn),
    }
}

pub(crate) fn sqrt(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Sqrt.apply(*n)),
        Unary(Square, f) => abs(f),
        Unary(Invert, f) => invert(&sqrt(f)),
        Binary(BinaryOp::Pow, f, g) => pow(f, &mul(g, &store::constant(0.5))),
        _ => store::function(x, Sqrt),
    }
}

pub(crate) fn cbrt(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Cbrt.apply(*n)),
        Unary(Sgn, _) => x.clone(),
        Unary(Abs, f) => abs(&cbrt(f)),
        Unary(Invert, f) => invert(&cbrt(f)),
        Unary(Negate, f) => negate(&cbrt(f)),
        Binary(BinaryOp::Pow, f, g) => pow(f, &mul(g, &store::constant(1.0 / 3.0))),
        _ => store::function(x, Cbrt),
    }
}

pub(crate) fn exp(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Exp.apply(*n)),
        Unary(Log, f) if guaranteed(f, Attribute::Positive) => f.clone(),
        Unary(Negate, f) => invert(&exp(f)),
        Unary(Asinh, f) => add(f, &yconic(f)),
        _ => store::function(x, Exp),
    }
}

pub(crate) fn expm1(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(ExpM1.apply(*n)),
        _ => store::function(x, ExpM1),
    }
}

pub(crate) fn log(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Log.apply(*n)),
        Unary(Exp, f) => f.clone(),
        Unary(Invert, f) => negate(&log(f)),
        _ => store::function(x, Log),
    }
}

pub(crate) fn log1p(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Log1P.apply(*n)),
        _ => store::function(x, Log1P),
    }
}

pub(crate) fn sin(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Sin.apply(*n)),
        Unary(Asin, f) if guaranteed(f, Attribute::UnitRange) => f.clone(),
        Unary(Acos, f) => zconic(f),
        Unary(Negate, f) => negate(&sin(f)),
        _ => store::function(x, Sin),
    }
}

pub(crate) fn cos(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Cos.apply(*n)),
        Unary(Acos, f) if guaranteed(f, Attribute::UnitRange) => f.clone(),
        Unary(Asin, f) => zconic(f),
        Unary(Atan, f) => invert(&yconic(f)),
        Unary(Abs | Negate, f) => cos(f),
        _ => store::function(x, Cos),
    }
}

pub(crate) fn tan(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Tan.apply(*n)),
        Unary(Atan, f) => f.clone(),
        Unary(Negate, f) => negate(&tan(f)),
        _ => store::function(x, Tan),
    }
}

pub(crate) fn sec(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Sec.apply(*n)),
        Unary(Asin, f) => invert(&zconic(f)),
        Unary(Acos, f) => invert(f),
        Unary(Atan, f) => yconic(f),
        Unary(Abs | Negate, f) => sec(f),
        _ => store::function(x, Sec),
    }
}

pub(crate) fn asin(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Asin.apply(*n)),
        Unary(ZConic, f) => acos(&abs(f)),
        _ => store::function(x, Asin),
    }
}

pub(crate) fn acos(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Acos.apply(*n)),
        Unary(ZConic, f) => abs(&asin(f)),
        _ => store::function(x, Acos),
    }
}

pub(crate) fn atan(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Atan.apply(*n)),
        _ => store::function(x, Atan),
    }
}

pub(crate) fn sinh(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Sinh.apply(*n)),
        Unary(Asinh, f) => f.clone(),
        Unary(Acosh, f) => xconic(f),
        Unary(Abs, f) => abs(&sinh(f)),
        Unary(Negate, f) => negate(&sinh(f)),
        _ => store::function(x, Sinh),
    }
}

pub(crate) fn cosh(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Cosh.apply(*n)),
        Unary(Acosh, f)
            if guaranteed(f, Attribute::Positive)
                && guaranteed(f, Attribute::AntiOpenUnitRange) =>
        {
            f.clone()
        }
        Unary(Asinh, f) => yconic(f),
        Unary(Atanh, f) => invert(&zconic(f)),
        Unary(Abs | Negate, f) => cosh(f),
        _ => store::function(x, Cosh),
    }
}

pub(crate) fn tanh(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Tanh.apply(*n)),
        Unary(Atanh, f) if guaranteed(f, Attribute::OpenUnitRange) => f.clone(),
        Unary(Abs, f) => abs(&tanh(f)),
        Unary(Negate, f) => negate(&tanh(f)),
        _ => store::function(x, Tanh),
    }
}

pub(crate) fn sech(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Sech.apply(*n)),
        Unary(Abs | Negate, f) => sech(f),
        _ => store::function(x, Sech),
    }
}

pub(crate) fn asinh(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Asinh.apply(*n)),
        Unary(Sinh, f) => f.clone(),
        Unary(XConic, f) => acosh(&abs(f)),
        Unary(Abs, f) => abs(&asinh(f)),
        Unary(Negate, f) => negate(&asinh(f)),
        _ => store::function(x, Asinh),
    }
}

pub(crate) fn acosh(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Acosh.apply(*n)),
        Unary(Cosh, f) => abs(f),
        Unary(YConic, f) => abs(&asinh(f)),
        _ => store::function(x, Acosh),
    }
}

pub(crate) fn atanh(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Atanh.apply(*n)),
        Unary(Tanh, f) => f.clone(),
        Unary(Abs, f) => abs(&atanh(f)),
        Unary(Negate, f) => negate(&atanh(f)),
        _ => store::function(x, Atanh),
    }
}

pub(crate) fn erf(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Erf.apply(*n)),
        Unary(Abs, f) => abs(&erf(f)),
        Unary(Negate, f) => negate(&erf(f)),
        _ => store::function(x, Erf),
    }
}

pub(crate) fn erfc(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Erfc.apply(*n)),
        _ => store::function(x, Erfc),
    }
}

pub(crate) fn invert(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Invert.apply(*n)),
        Unary(Cos, f) => sec(f),
        Unary(Sec, f) => cos(f),
        Unary(Cosh, f) => sech(f),
        Unary(Sech, f) => cosh(f),
        Unary(Invert, f) if guaranteed(f, Attribute::NonZero) => f.clone(),
        Unary(Negate, f) => negate(&invert(f)),
        Binary(BinaryOp::Pow, f, g) => pow(f, &negate(g)),
        _ => store::function(x, Invert),
    }
}

pub(crate) fn negate(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Negate.apply(*n)),
        Unary(Negate, f) => f.clone(),
        _ => store::function(x, Negate),
    }
}

pub(crate) fn softpp(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Softpp.apply(*n)),
        _ => store::function(x, Softpp),
    }
}

pub(crate) fn spence(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Spence.apply(*n)),
        _ => store::function(x, Spence),
    }
}

pub(crate) fn square(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(Square.apply(*n)),
        Unary(Sqrt, f) if guaranteed(f, Attribute::NonNegative) => f.clone(),
        Unary(Abs | Negate, f) => square(f),
        Unary(Sgn, f) => sgn(&square(f)),
        Unary(Invert, f) => invert(&square(f)),
        Binary(BinaryOp::Pow, f, g) => pow(f, &mul(g, &store::constant(2.0))),
        _ => store::function(x, Square),
    }
}

pub(crate) fn xconic(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(XConic.apply(*n)),
        Unary(Cosh, f) => abs(&sinh(f)),
        Unary(Abs | Negate, f) => xconic(f),
        Unary(YConic, f) => abs(f),
        _ => store::function(x, XConic),
    }
}

pub(crate) fn yconic(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(YConic.apply(*n)),
        Unary(Sinh, f) => cosh(f),
        Unary(Abs | Negate, f) => yconic(f),
        Unary(XConic, f) if guaranteed(f, Attribute::AntiOpenUnitRange) => abs(f),
        _ => store::function(x, YConic),
    }
}

pub(crate) fn zconic(x: &NodeRef) -> NodeRef {
    match &x.payload {
        Nan => store::sink(),
        Constant(n) => store::constant(ZConic.apply(*n)),
        Unary(Sin, f) => abs(&cos(f)),
        Unary(Cos, f) => abs(&sin(f)),
        Unary(Abs | Negate, f) => zconic(f),
        Unary(ZConic, f) if guaranteed(f, Attribute::UnitRange) => abs(f),
        _ => store::function(x, ZConic),
    }
}

/// Rebuild `op` around a (possibly substituted) child through the rewriting
/// constructor for that kind.
pub(crate) fn apply_unary(op: UnaryOp, f: &NodeRef) -> NodeRef {
    match op {
        Abs => abs(f),
        Sgn => sgn(f),
        Sqrt => sqrt(f),
        Cbrt => cbrt(f),
        Exp => exp(f),
        ExpM1 => expm1(f),
        Log => log(f),
        Log1P => log1p(f),
        Sin => sin(f),
        Cos => cos(f),
        Tan => tan(f),
        Sec => sec(f),
        Asin => asin(f),
        Acos => acos(f),
        Atan => atan(f),
        Sinh => sinh(f),
        Cosh => cosh(f),
        Tanh => tanh(f),
        Sech => sech(f),
        Asinh => asinh(f),
        Acosh => acosh(f),
        Atanh => atanh(f),
        Erf => erf(f),
        Erfc => erfc(f),
        Invert => invert(f),
        Negate => negate(f),
        Softpp => softpp(f),
        Spence => spence(f),
        Square => square(f),
        XConic => xconic(f),
        YConic => yconic(f),
        ZConic => zconic(f),
    }
}

pub(crate) fn add(a: &NodeRef, b: &NodeRef) -> NodeRef {
    if a.is_sink() || b.is_sink() {
        return store::sink();
    }
    match &a.payload {
        Constant(n) => {
            if let Some(m) = b.constant_value() {
                return store::constant(n + m);
            }
            if *n == 0.0 {
                return b.clone();
            }
        }
        Binary(BinaryOp::Add, f, g) if a.depth > ASSOC_LIMIT => {
            // Re-associate toward the shallower side so chains stay within
            // the stack budget of the recursive traversals.
            if f.depth < g.depth {
                return add(g, &add(f, b));
            }
            if f.depth > g.depth {
                return add(f, &add(g, b));
            }
        }
        _ => {}
    }
    commutative_add(b, a)
}

fn commutative_add(this: &NodeRef, arg: &NodeRef) -> NodeRef {
    match &this.payload {
        Constant(n) => {
            if let Some(m) = arg.constant_value() {
                return store::constant(n + m);
            }
            if *n == 0.0 {
                return arg.clone();
            }
        }
        Binary(BinaryOp::Add, f, g) if this.depth > ASSOC_LIMIT => {
            if f.depth < g.depth {
                return commutative_add(g, &commutative_add(f, arg));
            }
            if f.depth > g.depth {
                return commutative_add(f, &commutative_add(g, arg));
            }
        }
        _ => {}
    }
    store::cached_add(arg, this)
}

pub(crate) fn mul(a: &NodeRef, b: &NodeRef) -> NodeRef {
    if a.is_sink() || b.is_sink() {
        return store::sink();
    }
    match &a.payload {
        Constant(n) => {
            if let Some(m) = b.constant_value() {
                return store::constant(n * m);
            }
            if *n == 0.0 {
                return a.clone();
            }
            if *n == 1.0 {
                return b.clone();
            }
            if *n == -1.0 {
                return negate(b);
            }
        }
        Unary(Invert, f) => {
            // 1/f * 1/g  ->  1/(f * g)
            if let Unary(Invert, g) = &b.payload {
                return invert(&mul(f, g));
            }
            // 1/f * b  ->  1/(f * 1/b), whenever inverting b is free.
            if b.easy_invert() {
                return invert(&mul(f, &invert(b)));
            }
        }
        Unary(Negate, f) => {
            return if b.easy_negate() {
                mul(f, &negate(b)) // -f * -b  ->  f * b
            } else {
                negate(&mul(f, b)) // -f * b  ->  -(f * b)
            };
        }
        Binary(BinaryOp::Add, f, g) if a.depth > ASSOC_LIMIT => {
            return add(&mul(f, b), &mul(g, b));
        }
        Binary(BinaryOp::Mul, f, g) if a.depth > ASSOC_LIMIT => {
            if f.depth < g.depth {
                return mul(g, &mul(f, b));
            }
            if f.depth > g.depth {
                return mul(f, &mul(g, b));
            }
        }
        Binary(BinaryOp::Pow, f, g) if Rc::ptr_eq(f, b) => {
            return pow(f, &add(g, &store::constant(1.0)));
        }
        Unary(Square, f) if Rc::ptr_eq(f, b) => {
            return pow(f, &store::constant(3.0));
        }
        _ => {}
    }
    if Rc::ptr_eq(a, b) {
        return square(a);
    }
    commutative_mul(b, a)
}

fn commutative_mul(this: &NodeRef, arg: &NodeRef) -> NodeRef {
    match &this.payload {
        Constant(n) => {
            if let Some(m) = arg.constant_value() {
                return store::constant(n * m);
            }
            if *n == 0.0 {
                return this.clone();
            }
            if *n == 1.0 {
                return arg.clone();
            }
            if *n == -1.0 {
                return negate(arg);
            }
        }
        Binary(BinaryOp::Add, f, g) if this.depth > ASSOC_LIMIT => {
            return add(&commutative_mul(arg, f), &commutative_mul(arg, g));
        }
        Binary(BinaryOp::Mul, f, g) if this.depth > ASSOC_LIMIT => {
            if f.depth < g.depth {
                return commutative_mul(g, &commutative_mul(f, arg));
            }
            if f.depth > g.depth {
                return commutative_mul(f, &commutative_mul(g, arg));
            }
        }
        Binary(BinaryOp::Pow, f, g) if Rc::ptr_eq(f, arg) => {
            return pow(f, &add(g, &store::constant(1.0)));
        }
        Unary(Square, f) if Rc::ptr_eq(f, arg) => {
            return pow(f, &store::constant(3.0));
        }
        _ => {}
    }
    store::cached_mul(arg, this)
}

pub(crate) fn pow(base: &NodeRef, expo: &NodeRef) -> NodeRef {
    if base.is_sink() || expo.is_sink() {
        return store::sink();
    }
    match &base.payload {
        Constant(n) => {
            if let Some(m) = expo.constant_value() {
                return store::constant(f64::powf(*n, m));
            }
            if *n == 0.0 && guaranteed(expo, Attribute::NonZero) {
                return base.clone();
            }
            if *n == 1.0 {
                return base.clone();
            }
            if *n == std::f64::consts::E {
                return exp(expo);
            }
        }
        Unary(Sqrt, f) => return pow(f, &mul(expo, &store::constant(0.5))),
        Unary(Cbrt, f) => return pow(f, &mul(expo, &store::constant(1.0 / 3.0))),
        Unary(Exp, f) => return exp(&mul(f, expo)),
        Unary(Square, f) => return pow(f, &mul(expo, &store::constant(2.0))),
        Unary(Invert, f) => return invert(&pow(f, expo)),
        Binary(BinaryOp::Pow, f, g) => return pow(f, &mul(g, expo)),
        _ => {}
    }
    if let Some(m) = expo.constant_value() {
        if m == 0.0 {
            return store::constant(1.0);
        }
        if m == 1.0 {
            return base.clone();
        }
        if m == 2.0 {
            return square(base);
        }
        if m == -1.0 {
            return invert(base);
        }
        if m == 0.5 {
            return sqrt(base);
        }
        if m == 1.0 / 3.0 {
            return cbrt(base);
        }
    }
    store::cached_pow(base, expo)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expr::Expression;
    use crate::store::{constant, variable};
    use crate::test_util::assert_float_eq;
    use crate::variable::Variable;

    fn leaf() -> (Variable, NodeRef) {
        let var = Variable::new();
        let node = variable(&var);
        (var, node)
    }

    #[test]
    fn t_constant_folding() {
        // 2 + 3 * 4 builds as the single constant node 14.
        let e = Expression::from(2.0) + Expression::from(3.0) * Expression::from(4.0);
        assert!(e == Expression::from(14.0));
        assert_eq!(e.depth(), 0);
        assert!(Expression::from(2.0).pow(10) == Expression::from(1024.0));
        assert!(Expression::from(0.25).sqrt() == Expression::from(0.5));
        assert!(Expression::from(-8.0).cbrt() == Expression::from(-2.0));
        assert!(Expression::from(0.5).expm1() == Expression::from(f64::exp_m1(0.5)));
        assert!(Expression::from(0.5).log1p() == Expression::from(f64::ln_1p(0.5)));
        // Folds that leave the reals collapse into the sink.
        assert!(Expression::from(-1.0).sqrt() == Expression::default());
    }

    #[test]
    fn t_add_identities() {
        let (_x, x) = leaf();
        assert!(std::rc::Rc::ptr_eq(&add(&constant(0.0), &x), &x));
        assert!(std::rc::Rc::ptr_eq(&add(&x, &constant(0.0)), &x));
        assert!(std::rc::Rc::ptr_eq(&add(&x, &constant(-0.0)), &x));
    }

    #[test]
    fn t_add_is_shared_across_operand_orders() {
        let (_x, x) = leaf();
        let (_y, y) = leaf();
        let xy = add(&x, &y);
        assert!(std::rc::Rc::ptr_eq(&xy, &add(&x, &y)));
        // The back-references are symmetric, so the mirrored build finds the
        // same composite.
        assert!(std::rc::Rc::ptr_eq(&xy, &add(&y, &x)));
    }

    #[test]
    fn t_mul_identities() {
        let (_x, x) = leaf();
        assert!(mul(&constant(0.0), &x).constant_value() == Some(0.0));
        assert!(mul(&x, &constant(0.0)).constant_value() == Some(0.0));
        assert!(std::rc::Rc::ptr_eq(&mul(&constant(1.0), &x), &x));
        assert!(std::rc::Rc::ptr_eq(&mul(&x, &constant(1.0)), &x));
        assert!(std::rc::Rc::ptr_eq(&mul(&constant(-1.0), &x), &negate(&x)));
        assert!(std::rc::Rc::ptr_eq(&mul(&x, &x), &square(&x)));
    }

    #[test]
    fn t_mul_is_shared_across_operand_orders() {
        let (_x, x) = leaf();
        let (_y, y) = leaf();
        let xy = mul(&x, &y);
        assert!(std::rc::Rc::ptr_eq(&xy, &mul(&y, &x)));
    }

    #[test]
    fn t_negate_cancels() {
        let (_x, x) = leaf();
        assert!(std::rc::Rc::ptr_eq(&negate(&negate(&x)), &x));
    }

    #[test]
    fn t_invert_cancels_only_when_nonzero() {
        let (_x, x) = leaf();
        // Unknown sign: the reciprocal pair must stay, because x may be 0.
        let nested = invert(&invert(&x));
        assert!(!std::rc::Rc::ptr_eq(&nested, &x));
        // A provably nonzero child cancels.
        let e = exp(&x);
        assert!(std::rc::Rc::ptr_eq(&invert(&invert(&e)), &e));
    }

    #[test]
    fn t_invert_pairs() {
        let (_x, x) = leaf();
        assert!(std::rc::Rc::ptr_eq(&invert(&cos(&x)), &sec(&x)));
        assert!(std::rc::Rc::ptr_eq(&invert(&sec(&x)), &cos(&x)));
        assert!(std::rc::Rc::ptr_eq(&invert(&cosh(&x)), &sech(&x)));
        assert!(std::rc::Rc::ptr_eq(&invert(&sech(&x)), &cosh(&x)));
        // 1/(-f) -> -(1/f)
        assert!(std::rc::Rc::ptr_eq(
            &invert(&negate(&x)),
            &negate(&invert(&x))
        ));
    }

    #[test]
    fn t_abs_rewrites() {
        let (_x, x) = leaf();
        let e = exp(&x);
        // abs over provably non-negative kinds is the identity.
        assert!(std::rc::Rc::ptr_eq(&abs(&e), &e));
        assert!(std::rc::Rc::ptr_eq(&abs(&abs(&x)), &abs(&x)));
        assert!(std::rc::Rc::ptr_eq(&abs(&square(&x)), &square(&x)));
        assert!(std::rc::Rc::ptr_eq(&abs(&cosh(&x)), &cosh(&x)));
        // abs folds through negation and reciprocals.
        assert!(std::rc::Rc::ptr_eq(&abs(&negate(&x)), &abs(&x)));
        assert!(std::rc::Rc::ptr_eq(&abs(&invert(&x)), &invert(&abs(&x))));
        // A provably non-positive node negates instead: the log of a
        // positive unit-range child.
        let nonpos = log(&zconic(&tanh(&x)));
        assert!(matches!(nonpos.payload, Unary(Log, _)));
        assert!(std::rc::Rc::ptr_eq(&abs(&nonpos), &negate(&nonpos)));
    }

    #[test]
    fn t_sgn_rewrites() {
        let (_x, x) = leaf();
        assert!(sgn(&exp(&x)).constant_value() == Some(1.0));
        assert!(sgn(&cosh(&x)).constant_value() == Some(1.0));
        assert!(sgn(&negate(&exp(&x))).constant_value() == Some(-1.0));
        assert!(std::rc::Rc::ptr_eq(&sgn(&sgn(&x)), &sgn(&x)));
        assert!(std::rc::Rc::ptr_eq(&sgn(&sinh(&x)), &sgn(&x)));
        assert!(std::rc::Rc::ptr_eq(&sgn(&cbrt(&x)), &sgn(&x)));
        assert!(std::rc::Rc::ptr_eq(&sgn(&atan(&x)), &sgn(&x)));
        assert!(std::rc::Rc::ptr_eq(&sgn(&erf(&x)), &sgn(&x)));
        assert!(std::rc::Rc::ptr_eq(&cbrt(&sgn(&x)), &sgn(&x)));
    }

    #[test]
    fn t_sqrt_and_square() {
        let (_x, x) = leaf();
        assert!(std::rc::Rc::ptr_eq(&sqrt(&square(&x)), &abs(&x)));
        assert!(std::rc::Rc::ptr_eq(&sqrt(&invert(&x)), &invert(&sqrt(&x))));
        // square(sqrt f) cancels only over a non-negative child.
        assert!(!std::rc::Rc::ptr_eq(&square(&sqrt(&x)), &x));
        let nn = cosh(&x);
        assert!(std::rc::Rc::ptr_eq(&square(&sqrt(&nn)), &nn));
        assert!(std::rc::Rc::ptr_eq(&square(&negate(&x)), &square(&x)));
        assert!(std::rc::Rc::ptr_eq(&square(&abs(&x)), &square(&x)));
        assert!(std::rc::Rc::ptr_eq(
            &square(&invert(&x)),
            &invert(&square(&x))
        ));
    }

    #[test]
    fn t_exp_log() {
        let (_x, x) = leaf();
        assert!(std::rc::Rc::ptr_eq(&log(&exp(&x)), &x));
        // exp(log f) needs a provably positive child.
        assert!(!std::rc::Rc::ptr_eq(&exp(&log(&x)), &x));
        let pos = cosh(&x);
        assert!(std::rc::Rc::ptr_eq(&exp(&log(&pos)), &pos));
        // log(1/f) -> -log(f); a square keeps the reciprocal a plain invert.
        let sq = square(&x);
        assert!(std::rc::Rc::ptr_eq(&log(&invert(&sq)), &negate(&log(&sq))));
        // exp(-f) -> 1/exp(f)
        assert!(std::rc::Rc::ptr_eq(
            &exp(&negate(&x)),
            &invert(&exp(&x))
        ));
    }

    #[test]
    fn t_trig_inverse_pairs() {
        let (_x, x) = leaf();
        assert!(std::rc::Rc::ptr_eq(&tan(&atan(&x)), &x));
        // sin(asin f) and cos(acos f) need |f| <= 1.
        let unit = tanh(&x);
        assert!(std::rc::Rc::ptr_eq(&sin(&asin(&unit)), &unit));
        assert!(std::rc::Rc::ptr_eq(&cos(&acos(&unit)), &unit));
        assert!(!std::rc::Rc::ptr_eq(&sin(&asin(&x)), &x));
        // Parity folds.
        assert!(std::rc::Rc::ptr_eq(&sin(&negate(&x)), &negate(&sin(&x))));
        assert!(std::rc::Rc::ptr_eq(&cos(&negate(&x)), &cos(&x)));
        assert!(std::rc::Rc::ptr_eq(&cos(&abs(&x)), &cos(&x)));
        assert!(std::rc::Rc::ptr_eq(&tan(&negate(&x)), &negate(&tan(&x))));
    }

    #[test]
    fn t_hyperbolic_inverse_pairs() {
        let (_x, x) = leaf();
        assert!(std::rc::Rc::ptr_eq(&sinh(&asinh(&x)), &x));
        assert!(std::rc::Rc::ptr_eq(&asinh(&sinh(&x)), &x));
        assert!(std::rc::Rc::ptr_eq(&atanh(&tanh(&x)), &x));
        // tanh(atanh f) needs |f| < 1.
        let open = erf(&x);
        assert!(std::rc::Rc::ptr_eq(&tanh(&atanh(&open)), &open));
        assert!(!std::rc::Rc::ptr_eq(&tanh(&atanh(&x)), &x));
        // acosh(cosh f) = |f|.
        assert!(std::rc::Rc::ptr_eq(&acosh(&cosh(&x)), &abs(&x)));
        // cosh(acosh f) cancels only for f >= 1; exp of a square qualifies.
        let big = exp(&square(&x));
        assert!(std::rc::Rc::ptr_eq(&cosh(&acosh(&big)), &big));
        assert!(!std::rc::Rc::ptr_eq(&cosh(&acosh(&x)), &x));
    }

    #[test]
    fn t_conic_rewrites() {
        let (_x, x) = leaf();
        assert!(std::rc::Rc::ptr_eq(&zconic(&sin(&x)), &abs(&cos(&x))));
        assert!(std::rc::Rc::ptr_eq(&zconic(&cos(&x)), &abs(&sin(&x))));
        assert!(std::rc::Rc::ptr_eq(&yconic(&sinh(&x)), &cosh(&x)));
        assert!(std::rc::Rc::ptr_eq(&xconic(&cosh(&x)), &abs(&sinh(&x))));
        // zconic(zconic f) = |f| over a unit-range child.
        let unit = sin(&x);
        assert!(std::rc::Rc::ptr_eq(&zconic(&zconic(&unit)), &abs(&unit)));
        // The conics ignore the sign of their argument.
        assert!(std::rc::Rc::ptr_eq(&yconic(&negate(&x)), &yconic(&x)));
        assert!(std::rc::Rc::ptr_eq(&zconic(&abs(&unit)), &zconic(&unit)));
    }

    #[test]
    fn t_mul_negate_folds_on_the_left() {
        let (_x, x) = leaf();
        let (_y, y) = leaf();
        // -x * -y -> x * y and -x * y -> -(x * y).
        assert!(std::rc::Rc::ptr_eq(
            &mul(&negate(&x), &negate(&y)),
            &mul(&x, &y)
        ));
        assert!(std::rc::Rc::ptr_eq(
            &mul(&negate(&x), &y),
            &negate(&mul(&x, &y))
        ));
        // The fold dispatches on the left operand only.
        let plain = mul(&x, &negate(&y));
        assert!(!std::rc::Rc::ptr_eq(&plain, &negate(&mul(&x, &y))));
    }

    #[test]
    fn t_mul_reciprocal_pair() {
        let (_x, x) = leaf();
        let (_y, y) = leaf();
        assert!(std::rc::Rc::ptr_eq(
            &mul(&invert(&x), &invert(&y)),
            &invert(&mul(&x, &y))
        ));
    }

    #[test]
    fn t_mul_merges_powers() {
        let (_x, x) = leaf();
        let cube = mul(&mul(&x, &x), &x);
        assert!(matches!(
            &cube.payload,
            Binary(BinaryOp::Pow, base, expo)
                if std::rc::Rc::ptr_eq(base, &x) && expo.constant_value() == Some(3.0)
        ));
        let p4 = mul(&cube, &x);
        assert!(matches!(
            &p4.payload,
            Binary(BinaryOp::Pow, base, expo)
                if std::rc::Rc::ptr_eq(base, &x) && expo.constant_value() == Some(4.0)
        ));
    }

    #[test]
    fn t_pow_special_exponents() {
        let (_x, x) = leaf();
        assert!(pow(&x, &constant(0.0)).constant_value() == Some(1.0));
        assert!(std::rc::Rc::ptr_eq(&pow(&x, &constant(1.0)), &x));
        assert!(std::rc::Rc::ptr_eq(&pow(&x, &constant(2.0)), &square(&x)));
        assert!(std::rc::Rc::ptr_eq(&pow(&x, &constant(-1.0)), &invert(&x)));
        assert!(std::rc::Rc::ptr_eq(&pow(&x, &constant(0.5)), &sqrt(&x)));
        assert!(std::rc::Rc::ptr_eq(
            &pow(&x, &constant(1.0 / 3.0)),
            &cbrt(&x)
        ));
    }

    #[test]
    fn t_pow_special_bases() {
        let (_x, x) = leaf();
        // 1^f = 1, 0^f = 0 for provably nonzero f, e^f = exp f.
        assert!(pow(&constant(1.0), &x).constant_value() == Some(1.0));
        assert!(!matches!(pow(&constant(0.0), &x).payload, Constant(_)));
        let nz = cosh(&x);
        assert!(pow(&constant(0.0), &nz).constant_value() == Some(0.0));
        assert!(std::rc::Rc::ptr_eq(
            &pow(&constant(std::f64::consts::E), &x),
            &exp(&x)
        ));
    }

    #[test]
    fn t_pow_merges_through_roots_and_powers() {
        let (_x, x) = leaf();
        let (_y, y) = leaf();
        // sqrt(f)^g = f^(g/2), (f^g)^h = f^(g*h), (1/f)^g = 1/f^g, ...
        assert!(std::rc::Rc::ptr_eq(
            &pow(&sqrt(&x), &y),
            &pow(&x, &mul(&y, &constant(0.5)))
        ));
        assert!(std::rc::Rc::ptr_eq(
            &sqrt(&pow(&x, &y)),
            &pow(&x, &mul(&y, &constant(0.5)))
        ));
        assert!(std::rc::Rc::ptr_eq(
            &pow(&pow(&x, &y), &constant(3.0)),
            &pow(&x, &mul(&y, &constant(3.0)))
        ));
        assert!(std::rc::Rc::ptr_eq(
            &invert(&pow(&x, &y)),
            &pow(&x, &negate(&y))
        ));
        assert!(std::rc::Rc::ptr_eq(&pow(&exp(&x), &y), &exp(&mul(&x, &y))));
        assert!(std::rc::Rc::ptr_eq(
            &square(&pow(&x, &y)),
            &pow(&x, &mul(&y, &constant(2.0)))
        ));
    }

    #[test]
    fn t_sink_absorbs_everything() {
        let (_x, x) = leaf();
        let nan = store::sink();
        assert!(std::rc::Rc::ptr_eq(&add(&x, &nan), &nan));
        assert!(std::rc::Rc::ptr_eq(&add(&nan, &x), &nan));
        assert!(std::rc::Rc::ptr_eq(&mul(&nan, &x), &nan));
        assert!(std::rc::Rc::ptr_eq(&pow(&x, &nan), &nan));
        assert!(std::rc::Rc::ptr_eq(&sin(&nan), &nan));
        assert!(std::rc::Rc::ptr_eq(&negate(&nan), &nan));
        // Even the annihilating constant does not beat the sink.
        assert!(std::rc::Rc::ptr_eq(&mul(&constant(0.0), &nan), &nan));
    }

    #[test]
    fn t_deep_chains_reassociate() {
        let terms = 10_100;
        let x = Variable::new();
        let ex = Expression::from(&x);
        let mut e = Expression::from(0.0);
        for _ in 0..terms {
            e = e + ex.clone();
        }
        // The chain would be `terms` deep without re-association.
        assert!(e.depth() <= ASSOC_LIMIT + 4);
        x.assign(0.5).unwrap();
        assert_float_eq!(e.evaluate(), 0.5 * terms as f64, 1e-9);
    }

    #[test]
    fn t_exp_asinh() {
        let (xv, x) = leaf();
        // exp(asinh f) = f + sqrt(f^2 + 1)
        let e = exp(&asinh(&x));
        assert!(std::rc::Rc::ptr_eq(&e, &add(&x, &yconic(&x))));
        xv.assign(0.75).unwrap();
        assert_float_eq!(
            crate::eval::evaluate(&e),
            f64::exp(f64::asinh(0.75)),
            1e-14
        );
    }

    #[test]
    fn t_rewrites_preserve_values() {
        // A grab-bag of rewritten forms compared numerically against their
        // plain mathematical meaning.
        let xv = Variable::new();
        let x = variable(&xv);
        let cases: Vec<(NodeRef, fn(f64) -> f64)> = vec![
            (sqrt(&square(&x)), |x| (x * x).sqrt()),
            (zconic(&sin(&x)), |x| (1.0 - x.sin() * x.sin()).sqrt()),
            (xconic(&cosh(&x)), |x| (x.cosh() * x.cosh() - 1.0).sqrt()),
            (invert(&cos(&x)), |x| 1.0 / x.cos()),
            (exp(&negate(&x)), |x| (-x).exp()),
            (log(&invert(&cosh(&x))), |x| (1.0 / x.cosh()).ln()),
            (mul(&mul(&x, &x), &x), |x| x * x * x),
        ];
        for (node, reference) in cases {
            for sample in [-2.0, -0.5, 0.25, 1.75] {
                xv.assign(sample).unwrap();
                assert_float_eq!(
                    crate::eval::evaluate(&node),
                    reference(sample),
                    1e-12,
                    format!("at {sample}")
                );
            }
        }
    }
}
