use crate::{error::Error, store};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A named scalar cell. Cloning a variable yields another handle to the same
/// cell; an expression mentioning the variable sees assignments through any
/// handle. Every assignment advances the global dirty level, invalidating all
/// memoised evaluations.
pub struct Variable {
    cell: Rc<VarCell>,
}

struct VarCell {
    value: Cell<f64>,
    name: RefCell<String>,
}

impl Variable {
    /// Create a variable holding `0.0`, with a synthesised unique name.
    pub fn new() -> Variable {
        let label = store::next_variable_label();
        Variable {
            cell: Rc::new(VarCell {
                value: Cell::new(0.0),
                name: RefCell::new(format!("[&{label}]")),
            }),
        }
    }

    /// Create a variable holding `0.0`, with the given display name.
    pub fn named(name: &str) -> Variable {
        let var = Variable::new();
        var.set_name(name);
        var
    }

    /// Create a named variable holding an initial value, subject to the same
    /// finiteness precondition as [`Variable::assign`].
    pub fn with_value(name: &str, value: f64) -> Result<Variable, Error> {
        let var = Variable::named(name);
        var.assign(value)?;
        Ok(var)
    }

    /// The value currently bound to this variable.
    pub fn value(&self) -> f64 {
        self.cell.value.get()
    }

    /// Bind a new value. Only finite values are accepted; NaN and infinities
    /// enter the system through expression arithmetic, never through a
    /// variable. Bumps the global dirty level.
    pub fn assign(&self, value: f64) -> Result<(), Error> {
        if !value.is_finite() {
            return Err(Error::NonFiniteAssignment(value));
        }
        self.cell.value.set(value);
        store::touch();
        Ok(())
    }

    /// The display name.
    pub fn name(&self) -> String {
        self.cell.name.borrow().clone()
    }

    /// Replace the display name.
    pub fn set_name(&self, name: &str) {
        *self.cell.name.borrow_mut() = name.to_string();
    }

    /// Stable identity of the underlying cell, used as the interning key for
    /// the variable's leaf node.
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.cell) as usize
    }
}

impl Clone for Variable {
    fn clone(&self) -> Variable {
        Variable {
            cell: self.cell.clone(),
        }
    }
}

impl Default for Variable {
    fn default() -> Variable {
        Variable::new()
    }
}

/// Identity comparison: two handles are equal iff they refer to the same
/// cell, regardless of name or value.
impl PartialEq for Variable {
    fn eq(&self, other: &Variable) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Eq for Variable {}

impl std::fmt::Debug for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Variable({} = {})", self.name(), self.value())
    }
}
