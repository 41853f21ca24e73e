//! Read-only type and member metadata consulted by the IL transforms.
//!
//! The transforms only need a narrow slice of a .NET type system: the static
//! type of locals and parameters, "is this a well-known type" checks, and
//! member enumeration on a declaring type with or without inherited members.
//! That slice is modelled here as a flat arena of [`TypeDef`]s and
//! [`MethodDef`]s addressed by [`TypeId`] / [`MethodId`].
//!
//! A [`TypeSystem`] is immutable once built and is shared between worker
//! threads through an `Arc`; all construction goes through
//! [`TypeSystemBuilder`].
//!
//! # Examples
//!
//! ```rust
//! use dotlift::typesystem::{Parameter, TypeFlavor, TypeSig, TypeSystemBuilder};
//!
//! let mut builder = TypeSystemBuilder::with_corlib();
//! let console = builder.add_type("System", "Console", TypeFlavor::Class, None);
//! builder.add_static_method(console, "WriteLine", vec![Parameter::new("value", TypeSig::String)], TypeSig::Void);
//! let types = builder.build();
//! assert!(types.find_type("System.Console").is_some());
//! ```

mod corlib;
mod interpolation;
mod known;

use std::fmt;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

pub use known::KnownTypeCode;

/// Index of a type definition inside a [`TypeSystem`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Index of a method definition inside a [`TypeSystem`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId(pub(crate) usize);

impl MethodId {
    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// Static type of a local, parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    /// `void`
    Void,
    /// `bool`
    Boolean,
    /// `int`
    Int32,
    /// `string`
    String,
    /// `object`
    Object,
    /// A reference type defined in the type system.
    Class(TypeId),
    /// A value type defined in the type system.
    ValueType(TypeId),
    /// A managed reference (`ref T`, `in T`, `out T`).
    ByRef(Box<TypeSig>),
    /// An unresolved generic parameter, by position.
    GenericParameter(u16),
}

impl TypeSig {
    /// Wraps this type into a managed reference.
    #[must_use]
    pub fn by_ref(self) -> Self {
        TypeSig::ByRef(Box::new(self))
    }

    /// Returns the type definition this signature points at, if any.
    #[must_use]
    pub fn definition(&self) -> Option<TypeId> {
        match self {
            TypeSig::Class(id) | TypeSig::ValueType(id) => Some(*id),
            _ => None,
        }
    }
}

/// Coarse classification of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFlavor {
    /// Reference type
    Class,
    /// Value type (struct)
    ValueType,
    /// Interface
    Interface,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method attributes relevant to call rewriting
    pub struct MethodModifiers: u32 {
        /// Method has no `this` argument
        const STATIC = 0x0010;
        /// Method is dispatched through the vtable
        const VIRTUAL = 0x0040;
        /// Method has no implementation
        const ABSTRACT = 0x0400;
        /// Method name is special (constructors, accessors)
        const SPECIAL_NAME = 0x0800;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Options controlling member enumeration
    pub struct MemberOptions: u32 {
        /// Only members declared directly on the type
        const IGNORE_INHERITED_MEMBERS = 0x0001;
    }
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Declared parameter type
    pub ty: TypeSig,
}

impl Parameter {
    /// Creates a new parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeSig) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A type definition.
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Namespace, possibly empty
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Reference, value or interface type
    pub flavor: TypeFlavor,
    /// Direct base type
    pub base: Option<TypeId>,
    /// Methods declared directly on this type, in declaration order
    pub methods: Vec<MethodId>,
    /// Set for types the decompiler knows by identity
    pub known: Option<KnownTypeCode>,
}

impl TypeDef {
    /// Fully qualified name.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// A method definition.
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Method name, `.ctor` for constructors
    pub name: String,
    /// The type declaring this method
    pub declaring_type: TypeId,
    /// Static/virtual/special-name flags
    pub modifiers: MethodModifiers,
    /// Parameters, excluding the implicit `this`
    pub parameters: Vec<Parameter>,
    /// Return type
    pub return_type: TypeSig,
}

impl MethodDef {
    /// Returns true if the method has no `this` argument.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(MethodModifiers::STATIC)
    }

    /// Returns true if the method is dispatched virtually.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.modifiers.contains(MethodModifiers::VIRTUAL)
    }

    /// Returns true for instance constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor"
    }
}

/// Immutable arena of type and method definitions.
#[derive(Debug, Default)]
pub struct TypeSystem {
    types: Vec<TypeDef>,
    methods: Vec<MethodDef>,
    by_name: FxHashMap<String, TypeId>,
    known: FxHashMap<KnownTypeCode, TypeId>,
}

impl TypeSystem {
    /// Returns the type definition for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by the builder of this type system.
    #[must_use]
    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.0]
    }

    /// Returns the method definition for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by the builder of this type system.
    #[must_use]
    pub fn method(&self, id: MethodId) -> &MethodDef {
        &self.methods[id.0]
    }

    /// Number of registered types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Looks up a type by its fully qualified name.
    #[must_use]
    pub fn find_type(&self, full_name: &str) -> Option<TypeId> {
        self.by_name.get(full_name).copied()
    }

    /// Returns the definition registered for a known type code.
    #[must_use]
    pub fn known_type(&self, code: KnownTypeCode) -> Option<TypeId> {
        self.known.get(&code).copied()
    }

    /// Returns the first declared method of `ty` named `name` with `param_count` parameters.
    #[must_use]
    pub fn find_method(&self, ty: TypeId, name: &str, param_count: usize) -> Option<MethodId> {
        self.type_def(ty).methods.iter().copied().find(|&m| {
            let method = self.method(m);
            method.name == name && method.parameters.len() == param_count
        })
    }

    /// Strips any number of managed-reference wrappers.
    #[must_use]
    pub fn unwrap_by_ref<'a>(&self, ty: &'a TypeSig) -> &'a TypeSig {
        let mut current = ty;
        while let TypeSig::ByRef(inner) = current {
            current = inner;
        }
        current
    }

    /// Returns true if `ty` is the known type `code`.
    ///
    /// Managed references are not stripped; `ref string` is not a string.
    #[must_use]
    pub fn is_known_type(&self, ty: &TypeSig, code: KnownTypeCode) -> bool {
        match ty {
            TypeSig::Void => code == KnownTypeCode::Void,
            TypeSig::Boolean => code == KnownTypeCode::Boolean,
            TypeSig::Int32 => code == KnownTypeCode::Int32,
            TypeSig::String => code == KnownTypeCode::String,
            TypeSig::Object => code == KnownTypeCode::Object,
            TypeSig::Class(id) | TypeSig::ValueType(id) => {
                self.type_def(*id).known == Some(code)
            }
            TypeSig::ByRef(_) | TypeSig::GenericParameter(_) => false,
        }
    }

    /// Returns true if the type definition `id` is the known type `code`.
    #[must_use]
    pub fn is_known_def(&self, id: TypeId, code: KnownTypeCode) -> bool {
        self.type_def(id).known == Some(code)
    }

    /// Enumerates methods of `ty` accepted by `filter`.
    ///
    /// Methods declared on `ty` come first, in declaration order. Unless
    /// [`MemberOptions::IGNORE_INHERITED_MEMBERS`] is set, the base type chain
    /// is walked afterwards, nearest base first.
    pub fn get_methods<F>(&self, ty: TypeId, filter: F, options: MemberOptions) -> Vec<MethodId>
    where
        F: Fn(&MethodDef) -> bool,
    {
        let mut result = Vec::new();
        let mut current = Some(ty);
        // The chain can never be longer than the number of types; stops malformed cycles.
        let mut remaining = self.types.len();

        while let Some(id) = current {
            if remaining == 0 {
                break;
            }
            remaining -= 1;

            let def = self.type_def(id);
            result.extend(
                def.methods
                    .iter()
                    .copied()
                    .filter(|&m| filter(self.method(m))),
            );

            if options.contains(MemberOptions::IGNORE_INHERITED_MEMBERS) {
                break;
            }
            current = def.base;
        }

        result
    }

    /// Human readable `Type.Method` name.
    #[must_use]
    pub fn method_full_name(&self, id: MethodId) -> String {
        let method = self.method(id);
        format!(
            "{}::{}",
            self.type_def(method.declaring_type).full_name(),
            method.name
        )
    }
}

/// Incrementally builds a [`TypeSystem`].
#[derive(Debug, Default)]
pub struct TypeSystemBuilder {
    inner: TypeSystem,
}

impl TypeSystemBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type definition.
    pub fn add_type(
        &mut self,
        namespace: &str,
        name: &str,
        flavor: TypeFlavor,
        base: Option<TypeId>,
    ) -> TypeId {
        let id = TypeId(self.inner.types.len());
        let def = TypeDef {
            namespace: namespace.to_string(),
            name: name.to_string(),
            flavor,
            base,
            methods: Vec::new(),
            known: None,
        };
        self.inner.by_name.insert(def.full_name(), id);
        self.inner.types.push(def);
        id
    }

    /// Registers the definition for a known type code under its canonical name.
    pub fn add_known_type(
        &mut self,
        code: KnownTypeCode,
        flavor: TypeFlavor,
        base: Option<TypeId>,
    ) -> TypeId {
        let id = self.add_type(code.namespace(), code.name(), flavor, base);
        self.inner.types[id.0].known = Some(code);
        self.inner.known.insert(code, id);
        id
    }

    /// Registers a method on `declaring_type`.
    pub fn add_method(
        &mut self,
        declaring_type: TypeId,
        name: &str,
        modifiers: MethodModifiers,
        parameters: Vec<Parameter>,
        return_type: TypeSig,
    ) -> MethodId {
        let id = MethodId(self.inner.methods.len());
        self.inner.methods.push(MethodDef {
            name: name.to_string(),
            declaring_type,
            modifiers,
            parameters,
            return_type,
        });
        self.inner.types[declaring_type.0].methods.push(id);
        id
    }

    /// Registers a non-virtual instance method.
    pub fn add_instance_method(
        &mut self,
        declaring_type: TypeId,
        name: &str,
        parameters: Vec<Parameter>,
        return_type: TypeSig,
    ) -> MethodId {
        self.add_method(
            declaring_type,
            name,
            MethodModifiers::empty(),
            parameters,
            return_type,
        )
    }

    /// Registers a static method.
    pub fn add_static_method(
        &mut self,
        declaring_type: TypeId,
        name: &str,
        parameters: Vec<Parameter>,
        return_type: TypeSig,
    ) -> MethodId {
        self.add_method(
            declaring_type,
            name,
            MethodModifiers::STATIC,
            parameters,
            return_type,
        )
    }

    /// Registers an instance constructor.
    pub fn add_constructor(&mut self, declaring_type: TypeId, parameters: Vec<Parameter>) -> MethodId {
        self.add_method(
            declaring_type,
            ".ctor",
            MethodModifiers::SPECIAL_NAME,
            parameters,
            TypeSig::Void,
        )
    }

    /// Looks up a type registered so far.
    #[must_use]
    pub fn find_type(&self, full_name: &str) -> Option<TypeId> {
        self.inner.find_type(full_name)
    }

    /// Returns the definition registered so far for a known type code.
    #[must_use]
    pub fn known_type(&self, code: KnownTypeCode) -> Option<TypeId> {
        self.inner.known_type(code)
    }

    /// Looks up a method registered so far.
    #[must_use]
    pub fn find_method(&self, ty: TypeId, name: &str, param_count: usize) -> Option<MethodId> {
        self.inner.find_method(ty, name, param_count)
    }

    /// Finishes construction.
    #[must_use]
    pub fn build(self) -> TypeSystem {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> (TypeSystem, TypeId, TypeId) {
        let mut builder = TypeSystemBuilder::with_corlib();
        let object = builder.known_type(KnownTypeCode::Object);
        let base = builder.add_type("App", "Base", TypeFlavor::Class, object);
        let derived = builder.add_type("App", "Derived", TypeFlavor::Class, Some(base));
        builder.add_instance_method(base, "Write", vec![Parameter::new("s", TypeSig::String)], TypeSig::Void);
        builder.add_instance_method(derived, "Write", vec![Parameter::new("i", TypeSig::Int32)], TypeSig::Void);
        (builder.build(), base, derived)
    }

    #[test]
    fn test_get_methods_declared_only() {
        let (types, _, derived) = hierarchy();
        let found = types.get_methods(
            derived,
            |m| m.name == "Write",
            MemberOptions::IGNORE_INHERITED_MEMBERS,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(types.method(found[0]).parameters[0].ty, TypeSig::Int32);
    }

    #[test]
    fn test_get_methods_inherited_order() {
        let (types, base, derived) = hierarchy();
        let found = types.get_methods(derived, |m| m.name == "Write", MemberOptions::empty());
        assert_eq!(found.len(), 2);
        assert_eq!(types.method(found[0]).declaring_type, derived);
        assert_eq!(types.method(found[1]).declaring_type, base);
    }

    #[test]
    fn test_get_methods_survives_base_cycle() {
        let mut builder = TypeSystemBuilder::new();
        let a = builder.add_type("", "A", TypeFlavor::Class, None);
        let b = builder.add_type("", "B", TypeFlavor::Class, Some(a));
        builder.inner.types[a.index()].base = Some(b);
        builder.add_instance_method(a, "M", Vec::new(), TypeSig::Void);
        let types = builder.build();
        let found = types.get_methods(b, |_| true, MemberOptions::empty());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_is_known_type() {
        let types = TypeSystemBuilder::with_corlib().build();
        let string_def = types.known_type(KnownTypeCode::String).unwrap();

        assert!(types.is_known_type(&TypeSig::String, KnownTypeCode::String));
        assert!(types.is_known_type(&TypeSig::Class(string_def), KnownTypeCode::String));
        assert!(!types.is_known_type(&TypeSig::String.by_ref(), KnownTypeCode::String));
        assert!(!types.is_known_type(&TypeSig::Int32, KnownTypeCode::String));
    }

    #[test]
    fn test_unwrap_by_ref() {
        let types = TypeSystem::default();
        let nested = TypeSig::Int32.by_ref().by_ref();
        assert_eq!(types.unwrap_by_ref(&nested), &TypeSig::Int32);
        assert_eq!(types.unwrap_by_ref(&TypeSig::String), &TypeSig::String);
    }

    #[test]
    fn test_find_type_and_method() {
        let (types, base, _) = hierarchy();
        assert_eq!(types.find_type("App.Base"), Some(base));
        assert!(types.find_type("App.Missing").is_none());
        let write = types.find_method(base, "Write", 1).unwrap();
        assert_eq!(types.method_full_name(write), "App.Base::Write");
        assert!(types.find_method(base, "Write", 2).is_none());
    }
}
