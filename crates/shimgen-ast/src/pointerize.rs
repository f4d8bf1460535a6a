//! Pointerization analysis.
//!
//! Decides, per function and per parameter, whether an aggregate crosses the
//! native boundary by value, and builds the plan the emitters consume:
//!
//! 1. **Classification**: a parameter or return is *by value* iff it resolves to
//!    an aggregate at pointer depth 0. This rule lives in [`TypeEnv::classify`]
//!    and nowhere else.
//! 2. **Rewrite**: each by-value parameter becomes the same aggregate one
//!    pointer deeper in the shim signature.
//! 3. **Call reconstruction**: the shim calls the original with arguments in
//!    original order, dereferencing exactly the rewritten parameters.
//! 4. **Helper collection**: every by-value aggregate enters a run-scoped,
//!    insert-once [`HelperSet`]. Nothing is emitted here.
//! 5. **Return handling**: a by-value aggregate return makes the shim return a
//!    pointer to a heap copy. By-value parameters and a by-value return are
//!    independent triggers for generating a shim.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::ast::{
    Declaration, Field, Function, Header, Parameter, Position, Signature, StructDef, Tag,
    Typedef, TypedefTarget, TypeSpec,
};
use crate::naming::NamingConfig;
use crate::pretty::type_with_depth;
use crate::types::{HostType, Type, TypeTable};

/// Limit on typedef alias chains; deeper chains can only come from a cycle.
const MAX_ALIAS_HOPS: usize = 64;

/// An analysis error. All of these abort the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisError {
    /// A type name that is neither a primitive nor declared in the header.
    UnresolvedAggregate {
        type_name: String,
        context: String,
        position: Position,
    },
    /// A keyword-built primitive the type table does not register.
    UnknownType {
        name: String,
        context: String,
        position: Position,
    },
    /// A by-value use of an aggregate that is declared but never defined.
    IncompleteAggregate {
        type_name: String,
        context: String,
        position: Position,
    },
}

impl core::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AnalysisError::UnresolvedAggregate { type_name, context, position } => write!(
                f,
                "{}: unresolved type '{}' in {}",
                position, type_name, context
            ),
            AnalysisError::UnknownType { name, context, position } => write!(
                f,
                "{}: unknown primitive type '{}' in {}",
                position, name, context
            ),
            AnalysisError::IncompleteAggregate { type_name, context, position } => write!(
                f,
                "{}: incomplete type '{}' passed by value in {}",
                position, type_name, context
            ),
        }
    }
}

impl core::error::Error for AnalysisError {}

/// Why a type failed to resolve, before context is attached.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Failure {
    Unresolved(String),
    Unknown(String),
    Incomplete(String),
}

impl Failure {
    fn at(self, context: String, position: Position) -> AnalysisError {
        match self {
            Failure::Unresolved(type_name) => AnalysisError::UnresolvedAggregate {
                type_name,
                context,
                position,
            },
            Failure::Unknown(name) => AnalysisError::UnknownType {
                name,
                context,
                position,
            },
            Failure::Incomplete(type_name) => AnalysisError::IncompleteAggregate {
                type_name,
                context,
                position,
            },
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Named<'h> {
    Primitive { host: HostType, is_char: bool },
    Struct(&'h StructDef),
    /// Declared (forward or by tag use) but never defined.
    Opaque,
    Callback,
}

#[derive(Clone, Copy, Debug)]
struct Resolved<'h> {
    named: Named<'h>,
    /// Pointer levels contributed by typedef aliases.
    alias_depth: usize,
}

impl<'h> Resolved<'h> {
    fn direct(named: Named<'h>) -> Self {
        Self {
            named,
            alias_depth: 0,
        }
    }
}

/// An aggregate used by value.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateUse<'h> {
    /// Name the helpers and the host handle are keyed by.
    pub name: String,
    /// C spelling without qualifiers, e.g. `Color` or `struct Node`.
    pub spelled: String,
    /// Definition supplying the fields (the alias target for typedef aliases).
    pub def: &'h StructDef,
}

/// How a value crosses the native boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot<'h> {
    /// `void` return.
    Void,
    /// A scalar passed directly.
    Primitive(HostType),
    /// `char*`: host strings.
    Text,
    /// Any other pointer. `aggregate` names the pointee for single-level
    /// pointers to complete aggregates.
    Pointer { aggregate: Option<String> },
    /// Function pointer.
    Callback,
    /// Aggregate at depth 0: must be pointerized.
    ByValue(AggregateUse<'h>),
}

impl<'h> Slot<'h> {
    pub fn is_by_value(&self) -> bool {
        matches!(self, Slot::ByValue(_))
    }
}

/// Resolution environment: the type table plus everything the header declares.
pub struct TypeEnv<'h> {
    table: &'h TypeTable,
    structs: BTreeMap<&'h str, &'h StructDef>,
    struct_tags: BTreeMap<&'h str, &'h StructDef>,
    enums: BTreeSet<&'h str>,
    typedefs: BTreeMap<&'h str, &'h Typedef>,
}

impl<'h> TypeEnv<'h> {
    /// Index every declaration in `header`, including those inside macro blocks.
    pub fn new(table: &'h TypeTable, header: &'h Header) -> Self {
        let mut env = Self {
            table,
            structs: BTreeMap::new(),
            struct_tags: BTreeMap::new(),
            enums: BTreeSet::new(),
            typedefs: BTreeMap::new(),
        };
        for decl in header.walk() {
            match decl {
                Declaration::StructDef(def) => {
                    if def.is_typedef {
                        env.structs.insert(def.name.as_str(), def);
                    }
                    if let Some(tag) = &def.tag {
                        env.struct_tags.insert(tag.as_str(), def);
                    }
                }
                Declaration::EnumDef(def) => {
                    // Enum tags and typedef names both resolve to `int`.
                    if let Some(name) = &def.name {
                        env.enums.insert(name.as_str());
                    }
                    if let Some(tag) = &def.tag {
                        env.enums.insert(tag.as_str());
                    }
                }
                Declaration::Typedef(td) => {
                    env.typedefs.insert(td.name.as_str(), td);
                }
                _ => {}
            }
        }
        env
    }

    fn resolve(&self, spec: &TypeSpec) -> Result<Resolved<'h>, Failure> {
        self.resolve_hops(spec, 0)
    }

    fn resolve_hops(&self, spec: &TypeSpec, hops: usize) -> Result<Resolved<'h>, Failure> {
        if hops > MAX_ALIAS_HOPS {
            return Err(Failure::Unresolved(spec.name.clone()));
        }
        match spec.tag {
            Some(Tag::Enum) => {
                return Ok(Resolved::direct(Named::Primitive {
                    host: HostType::I32,
                    is_char: false,
                }))
            }
            Some(Tag::Struct) | Some(Tag::Union) => {
                // A tagged reference declares the tag even without a body.
                let named = match self.struct_tags.get(spec.name.as_str()) {
                    Some(def) => Named::Struct(def),
                    None => Named::Opaque,
                };
                return Ok(Resolved::direct(named));
            }
            None => {}
        }

        let name = match self.table.resolve_spec(spec) {
            Ok(Type::Primitive(host)) => {
                return Ok(Resolved::direct(Named::Primitive {
                    host,
                    is_char: spec.name == "char" && !spec.is_unsigned,
                }))
            }
            Ok(Type::AggregateRef(name)) => name,
            Err(err) => return Err(Failure::Unknown(err.name)),
        };

        if let Some(def) = self.structs.get(name.as_str()) {
            return Ok(Resolved::direct(Named::Struct(def)));
        }
        if self.enums.contains(name.as_str()) {
            return Ok(Resolved::direct(Named::Primitive {
                host: HostType::I32,
                is_char: false,
            }));
        }
        match self.typedefs.get(name.as_str()).map(|td| &td.target) {
            Some(TypedefTarget::FunctionPointer(_)) => Ok(Resolved::direct(Named::Callback)),
            Some(TypedefTarget::Type { ty, pointer_depth, array_len }) => {
                let inner = self.resolve_hops(ty, hops + 1)?;
                Ok(Resolved {
                    named: inner.named,
                    alias_depth: inner.alias_depth
                        + pointer_depth
                        + usize::from(array_len.is_some()),
                })
            }
            None => Err(Failure::Unresolved(name)),
        }
    }

    /// Check every type mentioned by a function-pointer signature.
    fn check_signature(&self, sig: &Signature) -> Result<(), Failure> {
        self.resolve(&sig.return_type)?;
        for param in &sig.params {
            match &param.function_pointer {
                Some(inner) => self.check_signature(inner)?,
                None => {
                    self.resolve(&param.ty)?;
                }
            }
        }
        Ok(())
    }

    /// Classify a value of type `ty` at `depth` (array decay already counted).
    ///
    /// This is the single home of the by-value rule: an aggregate at depth 0
    /// yields [`Slot::ByValue`]; primitives never do.
    fn classify(
        &self,
        ty: &TypeSpec,
        depth: usize,
        function_pointer: Option<&Signature>,
    ) -> Result<Slot<'h>, Failure> {
        if let Some(sig) = function_pointer {
            self.check_signature(sig)?;
            return Ok(Slot::Callback);
        }
        let resolved = self.resolve(ty)?;
        let total = depth + resolved.alias_depth;
        let slot = match (resolved.named, total) {
            (Named::Callback, 0) => Slot::Callback,
            (Named::Primitive { host: HostType::Void, .. }, 0) => Slot::Void,
            (Named::Primitive { host, .. }, 0) => Slot::Primitive(host),
            (Named::Primitive { is_char: true, .. }, 1) => Slot::Text,
            (Named::Struct(def), 0) => {
                let mut bare = ty.clone();
                bare.is_const = false;
                Slot::ByValue(AggregateUse {
                    name: ty.name.clone(),
                    spelled: type_with_depth(&bare, 0),
                    def,
                })
            }
            (Named::Opaque, 0) => return Err(Failure::Incomplete(ty.name.clone())),
            (Named::Struct(_), 1) if resolved.alias_depth == 0 => Slot::Pointer {
                aggregate: Some(ty.name.clone()),
            },
            _ => Slot::Pointer { aggregate: None },
        };
        Ok(slot)
    }

    /// Classify a parameter on its own, outside of any function.
    pub fn classify_param(&self, param: &Parameter) -> Result<Slot<'h>, AnalysisError> {
        self.classify(
            &param.ty,
            param.effective_depth(),
            param.function_pointer.as_deref(),
        )
        .map_err(|failure| {
            failure.at(format!("parameter '{}'", param.name), Position::default())
        })
    }
}

/// A shim argument, in original parameter order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Argument {
    /// `*name`: a rewritten by-value parameter.
    Deref(String),
    /// `name`, unchanged.
    Pass(String),
}

impl core::fmt::Display for Argument {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Argument::Deref(name) => write!(f, "*{}", name),
            Argument::Pass(name) => f.write_str(name),
        }
    }
}

/// What the shim for one function looks like.
#[derive(Clone, Debug, PartialEq)]
pub struct ShimPlan {
    /// Exported shim symbol, e.g. `ClearBackground_pointerized`.
    pub symbol: String,
    /// Shim parameters: the originals with by-value aggregates one level deeper.
    pub params: Vec<Parameter>,
    /// Arguments for the call to the original function.
    pub arguments: Vec<Argument>,
    /// At least one parameter was rewritten.
    pub by_value_params: bool,
    /// The return value is a by-value aggregate, returned as a heap copy.
    pub by_value_return: bool,
}

impl ShimPlan {
    /// The call to the original function, e.g. `ClearBackground(*color)`.
    pub fn call_expression(&self, callee: &str) -> String {
        let args: Vec<String> = self.arguments.iter().map(ToString::to_string).collect();
        format!("{}({})", callee, args.join(", "))
    }
}

/// Why a function gets no binding at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// `...` cannot be forwarded through a fixed-arity symbol.
    Variadic,
    /// `static` functions export no symbol.
    Static,
}

impl SkipReason {
    pub fn describe(self) -> &'static str {
        match self {
            SkipReason::Variadic => "variadic functions cannot be bound",
            SkipReason::Static => "static functions export no symbol",
        }
    }
}

/// How a function is exposed to the host.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    /// Bound straight to the original symbol.
    Direct,
    /// Bound to a generated shim.
    Shim(ShimPlan),
    Skipped(SkipReason),
}

/// One parameter with its classification.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamPlan<'h> {
    pub param: &'h Parameter,
    pub slot: Slot<'h>,
}

/// The plan for one function.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionPlan<'h> {
    pub function: &'h Function,
    pub params: Vec<ParamPlan<'h>>,
    pub ret: Slot<'h>,
    pub binding: Binding,
}

impl<'h> FunctionPlan<'h> {
    /// The symbol the host binding resolves, if bound.
    pub fn symbol(&self) -> Option<&str> {
        match &self.binding {
            Binding::Direct => Some(&self.function.name),
            Binding::Shim(shim) => Some(&shim.symbol),
            Binding::Skipped(_) => None,
        }
    }

    pub fn shim(&self) -> Option<&ShimPlan> {
        match &self.binding {
            Binding::Shim(shim) => Some(shim),
            _ => None,
        }
    }
}

/// How a struct field becomes an allocator parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    /// Assigned directly.
    Scalar(HostType),
    /// Taken as a pointer and dereferenced into the field.
    Aggregate(String),
    /// Taken as `const T*` and copied with `memcpy`.
    Array,
    /// Pointer or function pointer, assigned directly.
    Pointer,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldPlan<'h> {
    pub field: &'h Field,
    pub kind: FieldKind,
}

/// An allocator/deallocator pair to emit.
#[derive(Clone, Debug, PartialEq)]
pub struct HelperPlan<'h> {
    pub aggregate: AggregateUse<'h>,
    pub alloc_symbol: String,
    pub free_symbol: String,
    /// Allocator parameters, in field order. Empty for unions.
    pub fields: Vec<FieldPlan<'h>>,
}

/// Insert-once, order-preserving set of aggregates needing helpers.
#[derive(Clone, Debug, Default)]
pub struct HelperSet<'h> {
    seen: BTreeSet<String>,
    order: Vec<AggregateUse<'h>>,
}

impl<'h> HelperSet<'h> {
    pub fn new() -> Self {
        Self {
            seen: BTreeSet::new(),
            order: Vec::new(),
        }
    }

    /// Record a requirement. Returns `false` if the name was already present.
    pub fn insert(&mut self, aggregate: AggregateUse<'h>) -> bool {
        if !self.seen.insert(aggregate.name.clone()) {
            return false;
        }
        self.order.push(aggregate);
        true
    }

    /// Aggregates in first-need order.
    pub fn iter(&self) -> impl Iterator<Item = &AggregateUse<'h>> {
        self.order.iter()
    }
}

/// The full transformation plan for a header.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderPlan<'h> {
    /// Every function, in declaration order.
    pub functions: Vec<FunctionPlan<'h>>,
    /// Helper pairs, in first-need order, one per aggregate name.
    pub helpers: Vec<HelperPlan<'h>>,
}

impl<'h> HeaderPlan<'h> {
    /// Whether `name` gets a host handle class.
    pub fn has_handle(&self, name: &str) -> bool {
        self.helpers.iter().any(|h| h.aggregate.name == name)
    }
}

/// The pointerization analyzer.
pub struct Analyzer<'h> {
    env: TypeEnv<'h>,
    naming: NamingConfig,
}

impl<'h> Analyzer<'h> {
    pub fn new(table: &'h TypeTable, header: &'h Header, naming: NamingConfig) -> Self {
        Self {
            env: TypeEnv::new(table, header),
            naming,
        }
    }

    /// Analyze every function in `header`, in order, and close over the helpers
    /// they require.
    pub fn analyze(&self, header: &'h Header) -> Result<HeaderPlan<'h>, AnalysisError> {
        for def in header.structs() {
            self.check_struct(def)?;
        }

        let mut needs = HelperSet::new();
        let mut functions = Vec::new();
        let mut planned = BTreeSet::new();
        for function in header.functions() {
            // Redeclarations, e.g. one per conditional branch, bind once.
            if !planned.insert(function.name.as_str()) {
                tracing::debug!(function = %function.name, "skipping redeclaration");
                continue;
            }
            let plan = self.plan_function(function, &mut needs)?;
            functions.push(plan);
        }

        let mut helpers = Vec::new();
        for aggregate in needs.iter() {
            helpers.push(self.plan_helper(aggregate.clone())?);
        }
        tracing::debug!(
            functions = functions.len(),
            helpers = helpers.len(),
            "pointerization plan built"
        );
        Ok(HeaderPlan { functions, helpers })
    }

    /// Resolve every field of a struct definition.
    fn check_struct(&self, def: &'h StructDef) -> Result<(), AnalysisError> {
        for field in &def.fields {
            self.classify_field(def, field)?;
        }
        Ok(())
    }

    fn classify_field(&self, def: &StructDef, field: &Field) -> Result<Slot<'h>, AnalysisError> {
        let depth = field.pointer_depth + usize::from(field.array_len.is_some());
        self.env
            .classify(&field.ty, depth, field.function_pointer.as_deref())
            .map_err(|failure| {
                failure.at(
                    format!("field '{}' of struct '{}'", field.name, def.name),
                    def.position,
                )
            })
    }

    /// Plan one function and record the aggregates it needs.
    pub fn plan_function(
        &self,
        function: &'h Function,
        needs: &mut HelperSet<'h>,
    ) -> Result<FunctionPlan<'h>, AnalysisError> {
        let sig = &function.signature;
        let ret = self
            .env
            .classify(&sig.return_type, sig.return_pointer_depth, None)
            .map_err(|failure| {
                failure.at(
                    format!("return type of function '{}'", function.name),
                    function.position,
                )
            })?;

        let mut params = Vec::with_capacity(sig.params.len());
        for param in &sig.params {
            let slot = self
                .env
                .classify(
                    &param.ty,
                    param.effective_depth(),
                    param.function_pointer.as_deref(),
                )
                .map_err(|failure| {
                    failure.at(
                        format!("parameter '{}' of function '{}'", param.name, function.name),
                        function.position,
                    )
                })?;
            params.push(ParamPlan { param, slot });
        }

        let binding = if sig.is_variadic {
            tracing::warn!(function = %function.name, "skipping variadic function");
            Binding::Skipped(SkipReason::Variadic)
        } else if function.annotations.iter().any(|a| a == "static") {
            tracing::debug!(function = %function.name, "skipping static function");
            Binding::Skipped(SkipReason::Static)
        } else {
            match self.shim_for(function, &params, &ret) {
                Some(shim) => {
                    for plan in &params {
                        if let Slot::ByValue(agg) = &plan.slot {
                            self.require(agg.clone(), needs)?;
                        }
                    }
                    if let Slot::ByValue(agg) = &ret {
                        self.require(agg.clone(), needs)?;
                    }
                    tracing::debug!(
                        function = %function.name,
                        symbol = %shim.symbol,
                        "function needs a shim"
                    );
                    Binding::Shim(shim)
                }
                None => Binding::Direct,
            }
        };

        Ok(FunctionPlan {
            function,
            params,
            ret,
            binding,
        })
    }

    /// Build the shim for a function, or `None` if nothing crosses by value.
    fn shim_for(
        &self,
        function: &Function,
        params: &[ParamPlan<'h>],
        ret: &Slot<'h>,
    ) -> Option<ShimPlan> {
        let by_value_params = params.iter().any(|p| p.slot.is_by_value());
        let by_value_return = ret.is_by_value();
        if !by_value_params && !by_value_return {
            return None;
        }

        let mut shim_params = Vec::with_capacity(params.len());
        let mut arguments = Vec::with_capacity(params.len());
        for plan in params {
            let mut param = plan.param.clone();
            if plan.slot.is_by_value() {
                param.pointer_depth += 1;
                arguments.push(Argument::Deref(param.name.clone()));
            } else {
                arguments.push(Argument::Pass(param.name.clone()));
            }
            shim_params.push(param);
        }

        Some(ShimPlan {
            symbol: self.naming.shim_name(&function.name),
            params: shim_params,
            arguments,
            by_value_params,
            by_value_return,
        })
    }

    /// Add an aggregate and, transitively, the aggregates of its by-value fields.
    fn require(
        &self,
        aggregate: AggregateUse<'h>,
        needs: &mut HelperSet<'h>,
    ) -> Result<(), AnalysisError> {
        let def = aggregate.def;
        if !needs.insert(aggregate) || def.is_union {
            return Ok(());
        }
        for field in &def.fields {
            if let Slot::ByValue(inner) = self.classify_field(def, field)? {
                self.require(inner, needs)?;
            }
        }
        Ok(())
    }

    fn plan_helper(&self, aggregate: AggregateUse<'h>) -> Result<HelperPlan<'h>, AnalysisError> {
        let def = aggregate.def;
        let mut fields = Vec::new();
        if !def.is_union {
            for field in &def.fields {
                let slot = self.classify_field(def, field)?;
                let kind = match slot {
                    _ if field.array_len.is_some() => FieldKind::Array,
                    Slot::Primitive(host) => FieldKind::Scalar(host),
                    Slot::ByValue(inner) => FieldKind::Aggregate(inner.name),
                    _ => FieldKind::Pointer,
                };
                fields.push(FieldPlan { field, kind });
            }
        }
        Ok(HelperPlan {
            alloc_symbol: self.naming.alloc_name(&aggregate.name),
            free_symbol: self.naming.free_name(&aggregate.name),
            aggregate,
            fields,
        })
    }
}

/// Analyze `header` with the given table and naming.
pub fn analyze<'h>(
    table: &'h TypeTable,
    header: &'h Header,
    naming: &NamingConfig,
) -> Result<HeaderPlan<'h>, AnalysisError> {
    Analyzer::new(table, header, naming.clone()).analyze(header)
}
