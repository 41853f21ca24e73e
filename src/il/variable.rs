//! IL variables and their usage counters.
//!
//! Variables are stored in the variable table of an
//! [`ILFunction`](crate::il::ILFunction) and referenced from instructions by
//! [`VariableId`]. Each variable tracks how often it is stored to, loaded, and
//! has its address taken; transforms use these counters as a cheap global
//! check that a local is used exactly the way a recognized pattern expects.
//!
//! The counters are derived data. They are recomputed from the tree reachable
//! from the function body by
//! [`ILFunction::recount_variables`](crate::il::ILFunction::recount_variables),
//! which the transform pipeline calls before running statement transforms and
//! after every change.

use std::fmt;

use crate::typesystem::TypeSig;

/// Index of a variable in the variable table of its function.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(pub(crate) usize);

impl VariableId {
    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V_{}", self.0)
    }
}

/// Storage class of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// An ordinary local declared in the method.
    Local,
    /// A compiler-introduced stack slot.
    StackSlot,
    /// A method parameter.
    Parameter,
    /// A local whose single assignment was absorbed into an initializer
    /// expression. Later stages must not declare it as a standalone local.
    InitializerTarget,
}

/// A local storage location referenced by `ldloc`, `ldloca` and `stloc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ILVariable {
    /// Display name
    pub name: String,
    /// Declared type
    pub ty: TypeSig,
    /// Storage class
    pub kind: VariableKind,
    store_count: usize,
    load_count: usize,
    address_count: usize,
}

impl ILVariable {
    /// Creates a variable with all counters at zero.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeSig, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
            store_count: 0,
            load_count: 0,
            address_count: 0,
        }
    }

    /// Number of `stloc` instructions writing this variable.
    #[must_use]
    pub fn store_count(&self) -> usize {
        self.store_count
    }

    /// Number of `ldloc` instructions reading this variable.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.load_count
    }

    /// Number of `ldloca` instructions taking this variable's address.
    #[must_use]
    pub fn address_count(&self) -> usize {
        self.address_count
    }

    pub(crate) fn reset_counts(&mut self) {
        self.store_count = 0;
        self.load_count = 0;
        self.address_count = 0;
    }

    pub(crate) fn add_store(&mut self) {
        self.store_count += 1;
    }

    pub(crate) fn add_load(&mut self) {
        self.load_count += 1;
    }

    pub(crate) fn add_address(&mut self) {
        self.address_count += 1;
    }
}

impl fmt::Display for ILVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
