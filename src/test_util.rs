//! Shared helpers for the unit tests: float comparison, randomised sampling
//! of variable values over given ranges, and numeric verification of
//! symbolic derivatives.

use crate::expr::Expression;
use crate::variable::Variable;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Assert that the floating point numbers are equal within the given epsilon.
macro_rules! assert_float_eq {
    ($a:expr, $b:expr, $eps:expr, $debug:expr) => {{
        // Make variables to avoid evaluating expressions multiple times.
        let a = $a;
        let b = $b;
        let eps = $eps;
        let error = f64::abs(a - b);
        if error > eps {
            eprintln!("{:?}", $debug);
        }
        assert!(
            error <= eps,
            "Assertion failed: |({}) - ({})| = {:e} <= {:e}",
            a,
            b,
            error,
            eps
        );
    }};
    ($a:expr, $b:expr, $eps:expr) => {
        assert_float_eq!($a, $b, $eps, "")
    };
    ($a:expr, $b:expr) => {
        assert_float_eq!($a, $b, f64::EPSILON)
    };
}
pub(crate) use assert_float_eq;

/// Walks every combination of per-variable samples, assigning them to the
/// live variables so the expressions under test see them directly.
pub(crate) struct Sampler {
    vars: Vec<Variable>,
    samples_per_var: usize,
    var_samples: Vec<f64>,
    counter: Vec<usize>,
    done: bool,
}

impl Sampler {
    /// Create a sampler for all the variables. `vardata` should contain a
    /// tuple of (variable, lower bound, upper bound). The variables are
    /// sampled between the bounds, `samples_per_var` times.
    pub fn new(vardata: &[(Variable, f64, f64)], samples_per_var: usize, seed: u64) -> Sampler {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut var_samples = Vec::with_capacity(vardata.len() * samples_per_var);
        for (_var, lower, upper) in vardata {
            let span = upper - lower;
            for _ in 0..samples_per_var {
                var_samples.push(lower + rng.random::<f64>() * span);
            }
        }
        Sampler {
            vars: vardata.iter().map(|(var, ..)| var.clone()).collect(),
            samples_per_var,
            var_samples,
            counter: vec![0; vardata.len()],
            done: false,
        }
    }

    /// Assign the next combination of samples to the variables. Returns
    /// false once every combination has been visited.
    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        for (i, c) in self.counter.iter().enumerate() {
            self.vars[i]
                .assign(self.var_samples[i * self.samples_per_var + *c])
                .unwrap();
        }
        for c in self.counter.iter_mut() {
            *c += 1;
            if *c < self.samples_per_var {
                break;
            } else {
                *c = 0;
            }
        }
        if self.counter.iter().all(|c| *c == 0) {
            self.done = true;
        }
        true
    }
}

/// Check the symbolic derivative of `expr` with respect to `var` against a
/// central difference, at every sampled combination of variable values. The
/// tolerance scales with the magnitude of the numeric derivative. Samples
/// where the difference quotient itself leaves the domain are skipped.
pub(crate) fn compare_derivative(
    expr: &Expression,
    var: &Variable,
    vardata: &[(Variable, f64, f64)],
    samples_per_var: usize,
    eps: f64,
) {
    const H: f64 = 1e-6;
    let deriv = expr.derive(var);
    let mut sampler = Sampler::new(vardata, samples_per_var, 42);
    while sampler.advance() {
        let x = var.value();
        var.assign(x + H).unwrap();
        let right = expr.evaluate();
        var.assign(x - H).unwrap();
        let left = expr.evaluate();
        var.assign(x).unwrap();
        let numeric = (right - left) / (2.0 * H);
        if !numeric.is_finite() {
            continue;
        }
        assert_float_eq!(
            deriv.evaluate(),
            numeric,
            eps * numeric.abs().max(1.0),
            format!("d/d{} of {} at {}", var.name(), expr, x)
        );
    }
}
