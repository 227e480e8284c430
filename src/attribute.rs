//! The conservative attribute propagator. `guaranteed` answers whether a
//! property is known to hold for an expression over the valid domain of the
//! current variable values; `false` always means "unknown", never "provably
//! false". The per-kind tables feed the simplification guards in the algebra
//! and keep rewrites from introducing spurious NaN.

use crate::node::{BinaryOp, NodeRef, Payload, UnaryOp};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    Defined,
    NonZero,
    Positive,
    Negative,
    NonPositive,
    NonNegative,
    /// |x| <= 1
    UnitRange,
    /// |x| > 1
    AntiUnitRange,
    /// |x| < 1
    OpenUnitRange,
    /// |x| >= 1
    AntiOpenUnitRange,
    Continuous,
    Increasing,
    Decreasing,
    NonIncreasing,
    NonDecreasing,
    BoundedAbove,
    BoundedBelow,
}

use Attribute::*;

pub(crate) fn guaranteed(node: &NodeRef, attr: Attribute) -> bool {
    match &node.payload {
        Payload::Nan => false,
        Payload::Constant(n) => constant(*n, attr),
        Payload::Variable(_) => matches!(attr, Defined | Continuous | Increasing | NonDecreasing),
        Payload::Unary(op, f) => unary(*op, f, attr),
        Payload::Binary(op, f, g) => binary(*op, f, g, attr),
    }
}

fn constant(n: f64, attr: Attribute) -> bool {
    if !n.is_finite() {
        return false;
    }
    match attr {
        Defined | Continuous | NonIncreasing | NonDecreasing | BoundedAbove | BoundedBelow => true,
        NonZero => n != 0.0,
        Positive => n > 0.0,
        Negative => n < 0.0,
        NonPositive => n <= 0.0,
        NonNegative => n >= 0.0,
        UnitRange => (-1.0..=1.0).contains(&n),
        AntiUnitRange => !(-1.0..=1.0).contains(&n),
        OpenUnitRange => n > -1.0 && n < 1.0,
        AntiOpenUnitRange => n <= -1.0 || n >= 1.0,
        Increasing | Decreasing => false,
    }
}

/// Shorthand for the child queries; the tables below read close to the
/// mathematical statements this way.
fn is(f: &NodeRef, attr: Attribute) -> bool {
    guaranteed(f, attr)
}

/// Monotonicity of compositions that grow with the magnitude of their input
/// (|f|, f^2, cosh f, yconic f).
fn monotone_in_magnitude(f: &NodeRef, attr: Attribute) -> bool {
    match attr {
        Increasing => is(f, Increasing) && is(f, Positive) || is(f, Decreasing) && is(f, Negative),
        Decreasing => is(f, Decreasing) && is(f, Positive) || is(f, Increasing) && is(f, Negative),
        NonIncreasing => {
            is(f, NonIncreasing) && is(f, NonNegative)
                || is(f, NonDecreasing) && is(f, NonPositive)
        }
        NonDecreasing => {
            is(f, NonDecreasing) && is(f, NonNegative)
                || is(f, NonIncreasing) && is(f, NonPositive)
        }
        _ => false,
    }
}

/// Monotonicity of compositions that shrink as the magnitude of their input
/// grows (zconic f).
fn antitone_in_magnitude(f: &NodeRef, attr: Attribute) -> bool {
    match attr {
        Increasing => is(f, Increasing) && is(f, Negative) || is(f, Decreasing) && is(f, Positive),
        Decreasing => is(f, Decreasing) && is(f, Negative) || is(f, Increasing) && is(f, Positive),
        NonIncreasing => {
            is(f, NonIncreasing) && is(f, NonPositive)
                || is(f, NonDecreasing) && is(f, NonNegative)
        }
        NonDecreasing => {
            is(f, NonDecreasing) && is(f, NonPositive)
                || is(f, NonIncreasing) && is(f, NonNegative)
        }
        _ => false,
    }
}

/// Monotonicity of order-reversing compositions (-f, acos f, erfc f).
fn monotone_reversed(f: &NodeRef, attr: Attribute) -> bool {
    match attr {
        Increasing => is(f, Decreasing),
        Decreasing => is(f, Increasing),
        NonIncreasing => is(f, NonDecreasing),
        NonDecreasing => is(f, NonIncreasing),
        _ => false,
    }
}

fn unary(op: UnaryOp, f: &NodeRef, attr: Attribute) -> bool {
    use UnaryOp::*;
    match op {
        Abs => {
            is(f, Defined)
                && match attr {
                    Defined | NonNegative | BoundedBelow => true,
                    NonZero | UnitRange | AntiUnitRange | OpenUnitRange | AntiOpenUnitRange
                    | Continuous => is(f, attr),
                    Positive => is(f, NonZero),
                    Increasing | Decreasing | NonIncreasing | NonDecreasing => {
                        monotone_in_magnitude(f, attr)
                    }
                    BoundedAbove => is(f, BoundedAbove) && is(f, BoundedBelow),
                    _ => false,
                }
        }
        Sgn => {
            is(f, Defined)
                && match attr {
                    Defined | UnitRange | BoundedAbove | BoundedBelow => true,
                    NonZero | Positive | Negative | NonPositive | NonNegative => is(f, attr),
                    AntiOpenUnitRange => is(f, NonZero),
                    Continuous => is(f, Positive) || is(f, Negative),
                    NonIncreasing => is(f, NonIncreasing) || is(f, Positive) || is(f, Negative),
                    NonDecreasing => is(f, NonDecreasing) || is(f, Positive) || is(f, Negative),
                    _ => false,
                }
        }
        Sqrt => {
            // Defined only over a provably non-negative child.
            is(f, NonNegative)
                && match attr {
                    Defined | NonNegative | BoundedBelow => true,
                    NonZero | Positive | UnitRange | AntiUnitRange | OpenUnitRange
                    | AntiOpenUnitRange | Continuous | Increasing | Decreasing | NonIncreasing
                    | NonDecreasing | BoundedAbove => is(f, attr),
                    _ => false,
                }
        }
        Cbrt => {
            is(f, Defined)
                && match attr {
                    Defined => true,
                    _ => is(f, attr),
                }
        }
        Exp => {
            is(f, Defined)
                && match attr {
                    Defined | NonZero | Positive | NonNegative | BoundedBelow => true,
                    Continuous | Increasing | Decreasing | NonIncreasing | NonDecreasing
                    | BoundedAbove => is(f, attr),
                    UnitRange => is(f, NonPositive),
                    AntiUnitRange => is(f, Positive),
                    OpenUnitRange => is(f, Negative),
                    AntiOpenUnitRange => is(f, NonNegative),
                    _ => false,
                }
        }
        ExpM1 => {
            is(f, Defined)
                && match attr {
                    Defined | BoundedBelow => true,
                    NonZero | Positive | Negative | NonPositive | NonNegative | Continuous
                    | Increasing | Decreasing | NonIncreasing | NonDecreasing | BoundedAbove => {
                        is(f, attr)
                    }
                    UnitRange | OpenUnitRange => is(f, NonPositive),
                    _ => false,
                }
        }
        Log => {
            is(f, Positive)
                && match attr {
                    Defined => true,
                    Continuous | Increasing | Decreasing | NonIncreasing | NonDecreasing
                    | BoundedAbove => is(f, attr),
                    NonZero => is(f, AntiUnitRange) || is(f, OpenUnitRange),
                    Positive => is(f, AntiUnitRange),
                    Negative => is(f, OpenUnitRange),
                    NonPositive => is(f, UnitRange),
                    NonNegative => is(f, AntiOpenUnitRange),
                    _ => false,
                }
        }
        Log1P => {
            (is(f, OpenUnitRange) || is(f, Positive))
                && match attr {
                    Defined => true,
                    NonZero | Positive | Negative | NonPositive | NonNegative | Continuous
                    | Increasing | Decreasing | NonIncreasing | NonDecreasing | BoundedAbove
                    | BoundedBelow => is(f, attr),
                    _ => false,
                }
        }
        Sin | Cos => {
            is(f, Defined)
                && match attr {
                    Defined | UnitRange | BoundedAbove | BoundedBelow => true,
                    Continuous => is(f, attr),
                    _ => false,
                }
        }
        // Poles everywhere; nothing can be promised without range analysis.
        Tan | Sec | Sech => false,
        Asin => {
            is(f, UnitRange)
                && match attr {
                    Defined | BoundedAbove | BoundedBelow => true,
                    NonZero | Positive | Negative | NonPositive | NonNegative | Continuous
                    | Increasing | Decreasing | NonIncreasing | NonDecreasing => is(f, attr),
                    _ => false,
                }
        }
        Acos => {
            is(f, UnitRange)
                && match attr {
                    Defined | NonNegative | BoundedAbove | BoundedBelow => true,
                    Continuous => is(f, attr),
                    NonZero | Positive => is(f, OpenUnitRange),
                    NonPositive => is(f, Positive) && is(f, AntiOpenUnitRange),
                    Increasing | Decreasing | NonIncreasing | NonDecreasing => {
                        monotone_reversed(f, attr)
                    }
                    _ => false,
                }
        }
        Atan => {
            is(f, Defined)
                && match attr {
                    Defined | BoundedAbove | BoundedBelow => true,
                    NonZero | Positive | Negative | NonPositive | NonNegative | Continuous
                    | Increasing | Decreasing | NonIncreasing | NonDecreasing => is(f, attr),
                    _ => false,
                }
        }
        Sinh | Asinh => {
            is(f, Defined)
                && match attr {
                    Defined => true,
                    NonZero | Positive | Negative | NonPositive | NonNegative | Continuous
                    | Increasing | Decreasing | NonIncreasing | NonDecreasing | BoundedAbove
                    | BoundedBelow => is(f, attr),
                    _ => false,
                }
        }
        Cosh => {
            is(f, Defined)
                && match attr {
                    Defined | NonZero | Positive | NonNegative | AntiOpenUnitRange
                    | BoundedBelow => true,
                    Continuous => is(f, attr),
                    AntiUnitRange => is(f, NonZero),
                    Increasing | Decreasing | NonIncreasing | NonDecreasing => {
                        monotone_in_magnitude(f, attr)
                    }
                    BoundedAbove => is(f, BoundedAbove) && is(f, BoundedBelow),
                    _ => false,
                }
        }
        Tanh => {
            is(f, Defined)
                && match attr {
                    Defined | UnitRange | OpenUnitRange | BoundedAbove | BoundedBelow => true,
                    NonZero | Positive | Negative | NonPositive | NonNegative | Continuous
                    | Increasing | Decreasing | NonIncreasing | NonDecreasing => is(f, attr),
                    _ => false,
                }
        }
        Acosh => {
            is(f, Positive)
                && is(f, AntiOpenUnitRange)
                && match attr {
                    Defined | NonNegative | BoundedBelow => true,
                    Continuous | Increasing | Decreasing | NonIncreasing | NonDecreasing
                    | BoundedAbove => is(f, attr),
                    NonZero | Positive => is(f, AntiUnitRange),
                    _ => false,
                }
        }
        Atanh => {
            is(f, OpenUnitRange)
                && match attr {
                    Defined => true,
                    NonZero | Positive | Negative | NonPositive | NonNegative | Continuous
                    | Increasing | Decreasing | NonIncreasing | NonDecreasing => is(f, attr),
                    _ => false,
                }
        }
        Erf => {
            is(f, Defined)
                && match attr {
                    Defined | UnitRange | OpenUnitRange | BoundedAbove | BoundedBelow => true,
                    NonZero | Positive | Negative | NonPositive | NonNegative | Continuous
                    | Increasing | Decreasing | NonIncreasing | NonDecreasing => is(f, attr),
                    _ => false,
                }
        }
        Erfc => {
            // erfc = 1 - erf: strictly inside (0, 2), order-reversing.
            is(f, Defined)
                && match attr {
                    Defined | NonZero | Positive | NonNegative | BoundedAbove | BoundedBelow => {
                        true
                    }
                    Continuous => is(f, attr),
                    Increasing | Decreasing | NonIncreasing | NonDecreasing => {
                        monotone_reversed(f, attr)
                    }
                    UnitRange => is(f, NonNegative),
                    OpenUnitRange => is(f, Positive),
                    AntiUnitRange => is(f, Negative),
                    AntiOpenUnitRange => is(f, NonPositive),
                    _ => false,
                }
        }
        Invert => {
            is(f, NonZero)
                && match attr {
                    Defined | NonZero => true,
                    Positive | Negative | NonPositive | NonNegative => is(f, attr),
                    UnitRange => is(f, AntiOpenUnitRange),
                    AntiUnitRange => is(f, OpenUnitRange),
                    OpenUnitRange => is(f, AntiUnitRange),
                    AntiOpenUnitRange => is(f, UnitRange),
                    Continuous => is(f, Positive) || is(f, Negative),
                    Increasing => is(f, Decreasing) && (is(f, Positive) || is(f, Negative)),
                    Decreasing => is(f, Increasing) && (is(f, Positive) || is(f, Negative)),
                    NonIncreasing => is(f, NonDecreasing) && (is(f, Positive) || is(f, Negative)),
                    NonDecreasing => is(f, NonIncreasing) && (is(f, Positive) || is(f, Negative)),
                    _ => false,
                }
        }
        Negate => {
            is(f, Defined)
                && match attr {
                    Defined => true,
                    NonZero | UnitRange | AntiUnitRange | OpenUnitRange | AntiOpenUnitRange
                    | Continuous => is(f, attr),
                    Positive => is(f, Negative),
                    Negative => is(f, Positive),
                    NonPositive => is(f, NonNegative),
                    NonNegative => is(f, NonPositive),
                    Increasing | Decreasing | NonIncreasing | NonDecreasing => {
                        monotone_reversed(f, attr)
                    }
                    BoundedAbove => is(f, BoundedBelow),
                    BoundedBelow => is(f, BoundedAbove),
                }
        }
        Softpp => false,
        Spence => {
            (is(f, UnitRange) || is(f, Negative))
                && match attr {
                    Defined | BoundedAbove => true,
                    NonZero | Positive | Negative | NonPositive | NonNegative | Continuous
                    | Increasing | Decreasing | NonIncreasing | NonDecreasing | BoundedBelow => {
                        is(f, attr)
                    }
                    _ => false,
                }
        }
        Square => {
            is(f, Defined)
                && match attr {
                    Defined | NonNegative | BoundedBelow => true,
                    NonZero | UnitRange | AntiUnitRange | OpenUnitRange | AntiOpenUnitRange
                    | Continuous => is(f, attr),
                    Positive => is(f, NonZero),
                    Increasing | Decreasing | NonIncreasing | NonDecreasing => {
                        monotone_in_magnitude(f, attr)
                    }
                    BoundedAbove => is(f, BoundedAbove) && is(f, BoundedBelow),
                    _ => false,
                }
        }
        XConic => {
            is(f, Positive)
                && is(f, AntiOpenUnitRange)
                && match attr {
                    Defined | NonNegative | BoundedBelow => true,
                    Continuous | Increasing | Decreasing | NonIncreasing | NonDecreasing
                    | BoundedAbove => is(f, attr),
                    NonZero | Positive => is(f, AntiUnitRange),
                    _ => false,
                }
        }
        YConic => {
            is(f, Defined)
                && match attr {
                    Defined | NonZero | Positive | NonNegative | AntiOpenUnitRange
                    | BoundedBelow => true,
                    Continuous => is(f, attr),
                    AntiUnitRange => is(f, NonZero),
                    Increasing | Decreasing | NonIncreasing | NonDecreasing => {
                        monotone_in_magnitude(f, attr)
                    }
                    BoundedAbove => is(f, BoundedAbove) && is(f, BoundedBelow),
                    _ => false,
                }
        }
        ZConic => {
            is(f, UnitRange)
                && match attr {
                    Defined | NonNegative | UnitRange | BoundedAbove | BoundedBelow => true,
                    Continuous => is(f, attr),
                    NonZero | Positive => is(f, OpenUnitRange),
                    NonPositive => is(f, AntiOpenUnitRange),
                    OpenUnitRange => is(f, NonZero),
                    Increasing | Decreasing | NonIncreasing | NonDecreasing => {
                        antitone_in_magnitude(f, attr)
                    }
                    _ => false,
                }
        }
    }
}

fn binary(op: BinaryOp, f: &NodeRef, g: &NodeRef, attr: Attribute) -> bool {
    match op {
        BinaryOp::Add => {
            is(f, Defined)
                && is(g, Defined)
                && match attr {
                    Defined => true,
                    NonZero => {
                        is(f, Positive) && is(g, NonNegative)
                            || is(f, Negative) && is(g, NonPositive)
                            || is(f, NonPositive) && is(g, Negative)
                            || is(f, NonNegative) && is(g, Positive)
                    }
                    Positive => {
                        is(f, Positive) && is(g, NonNegative)
                            || is(f, NonNegative) && is(g, Positive)
                    }
                    Negative => {
                        is(f, Negative) && is(g, NonPositive)
                            || is(f, NonPositive) && is(g, Negative)
                    }
                    NonPositive | NonNegative | Continuous | NonIncreasing | NonDecreasing
                    | BoundedAbove | BoundedBelow => is(f, attr) && is(g, attr),
                    Increasing => {
                        is(f, Increasing) && is(g, NonDecreasing)
                            || is(f, NonDecreasing) && is(g, Increasing)
                    }
                    Decreasing => {
                        is(f, Decreasing) && is(g, NonIncreasing)
                            || is(f, NonIncreasing) && is(g, Decreasing)
                    }
                    _ => false,
                }
        }
        BinaryOp::Mul => {
            is(f, Defined)
                && is(g, Defined)
                && match attr {
                    Defined => true,
                    NonZero | UnitRange | AntiUnitRange | OpenUnitRange | AntiOpenUnitRange
                    | Continuous => is(f, attr) && is(g, attr),
                    Positive => {
                        is(f, Positive) && is(g, Positive) || is(f, Negative) && is(g, Negative)
                    }
                    Negative => {
                        is(f, Positive) && is(g, Negative) || is(f, Negative) && is(g, Positive)
                    }
                    _ => false,
                }
        }
        BinaryOp::Pow => {
            // A power is only promised anything over a positive base.
            is(f, Positive)
                && is(g, Defined)
                && match attr {
                    Defined | NonZero | Positive | NonNegative => true,
                    Continuous => is(f, attr) && is(g, attr),
                    _ => false,
                }
        }
    }
}
