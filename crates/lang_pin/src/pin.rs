// ==============================================================================
// Pins
// ==============================================================================
//
// A pin is one declaration record: a namespace, a method, a variable, a
// constant, or an ancestry edge between two namespaces. Pins are immutable
// once built; refinements (narrowing, overload selection, proxying with an
// inferred type) produce new pins.
//
// Every pin except the root holds a shared reference to its enclosing
// declaration (`closure`). The closure chain yields the pin's lexical gates
// and its namespace.

use std::fmt;
use std::sync::{Arc, OnceLock};

use comment_parser::Docstring;
use lang_ty::{ComplexType, ParamKind, Scope, UniqueType};
use smol_str::{format_smolstr, SmolStr};

use crate::{Chain, Location, ParamDecl, Position, Range, Signature};

pub type PinRef = Arc<Pin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Local,
    Instance,
    Class,
    Global,
}

impl VariableKind {
    /// Kind implied by a variable's sigil.
    pub fn of_name(name: &str) -> VariableKind {
        if name.starts_with("@@") {
            VariableKind::Class
        } else if name.starts_with('@') {
            VariableKind::Instance
        } else if name.starts_with('$') {
            VariableKind::Global
        } else {
            VariableKind::Local
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    Class,
    Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// The kind of ancestry edge a reference pin models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Superclass,
    Include,
    Prepend,
    Extend,
    /// Replacement documentation for a method, keyed by the method's path.
    Override,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Superclass => "superclass",
            ReferenceKind::Include => "include",
            ReferenceKind::Prepend => "prepend",
            ReferenceKind::Extend => "extend",
            ReferenceKind::Override => "override",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceData {
    pub kind: NamespaceKind,
    /// Generic names declared by the namespace (`Array[Elem]`).
    pub generics: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodData {
    pub scope: Scope,
    pub visibility: Visibility,
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariableData {
    pub declared_type: Option<ComplexType>,
    pub assignment: Option<Chain>,
    /// Span over which this declaration governs lookups.
    pub presence: Option<Range>,
    /// Derived from control flow rather than merely declared.
    pub certain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterData {
    pub decl: ParamDecl,
    pub index: usize,
    pub declared_type: Option<ComplexType>,
    pub presence: Option<Range>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceData {
    pub kind: ReferenceKind,
    pub generic_values: Vec<ComplexType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockData {
    /// The call the block is passed to.
    pub receiver: Option<Chain>,
    /// Explicit `self` inside the block (`instance_eval` style).
    pub binder: Option<ComplexType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinKind {
    Namespace(NamespaceData),
    Method(MethodData),
    LocalVariable(VariableData),
    Parameter(ParameterData),
    Constant(VariableData),
    GlobalVariable(VariableData),
    InstanceVariable(VariableData),
    ClassVariable(VariableData),
    Keyword,
    Reference(ReferenceData),
    ProxyType,
    Block(BlockData),
}

impl PinKind {
    pub fn name(&self) -> &'static str {
        match self {
            PinKind::Namespace(_) => "namespace",
            PinKind::Method(_) => "method",
            PinKind::LocalVariable(_) => "local",
            PinKind::Parameter(_) => "parameter",
            PinKind::Constant(_) => "constant",
            PinKind::GlobalVariable(_) => "global",
            PinKind::InstanceVariable(_) => "ivar",
            PinKind::ClassVariable(_) => "cvar",
            PinKind::Keyword => "keyword",
            PinKind::Reference(_) => "reference",
            PinKind::ProxyType => "proxy",
            PinKind::Block(_) => "block",
        }
    }

    fn variable(&self) -> Option<&VariableData> {
        match self {
            PinKind::LocalVariable(data)
            | PinKind::Constant(data)
            | PinKind::GlobalVariable(data)
            | PinKind::InstanceVariable(data)
            | PinKind::ClassVariable(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Pin {
    pub name: SmolStr,
    pub closure: Option<PinRef>,
    pub location: Option<Location>,
    pub comments: String,
    pub kind: PinKind,
    path: SmolStr,
    proxy_type: Option<ComplexType>,
    docstring: OnceLock<Docstring>,
    declared: OnceLock<ComplexType>,
}

impl Pin {
    pub fn new(name: impl Into<SmolStr>, closure: Option<&PinRef>, kind: PinKind) -> Pin {
        let name = name.into();
        let path = compute_path(&name, closure, &kind);
        Pin {
            name,
            closure: closure.cloned(),
            location: None,
            comments: String::new(),
            kind,
            path,
            proxy_type: None,
            docstring: OnceLock::new(),
            declared: OnceLock::new(),
        }
    }

    /// The root namespace: empty name, no closure.
    pub fn root() -> PinRef {
        Arc::new(Pin::new_namespace("", None, NamespaceKind::Class))
    }

    pub fn new_namespace(name: impl Into<SmolStr>, closure: Option<&PinRef>, kind: NamespaceKind) -> Pin {
        Pin::new(
            name,
            closure,
            PinKind::Namespace(NamespaceData {
                kind,
                generics: Vec::new(),
            }),
        )
    }

    pub fn method(
        name: impl Into<SmolStr>,
        closure: &PinRef,
        scope: Scope,
        signatures: Vec<Signature>,
    ) -> Pin {
        Pin::new(
            name,
            Some(closure),
            PinKind::Method(MethodData {
                scope,
                visibility: Visibility::Public,
                signatures,
            }),
        )
    }

    pub fn local(
        name: impl Into<SmolStr>,
        closure: &PinRef,
        declared_type: Option<ComplexType>,
        presence: Option<Range>,
    ) -> Pin {
        Pin::new(
            name,
            Some(closure),
            PinKind::LocalVariable(VariableData {
                declared_type,
                assignment: None,
                presence,
                certain: false,
            }),
        )
    }

    pub fn parameter(
        name: impl Into<SmolStr>,
        closure: &PinRef,
        decl: ParamDecl,
        index: usize,
        declared_type: Option<ComplexType>,
    ) -> Pin {
        Pin::new(
            name,
            Some(closure),
            PinKind::Parameter(ParameterData {
                decl,
                index,
                declared_type,
                presence: closure.location.as_ref().map(|l| l.range),
            }),
        )
    }

    pub fn constant(name: impl Into<SmolStr>, closure: &PinRef, declared_type: Option<ComplexType>) -> Pin {
        Pin::new(
            name,
            Some(closure),
            PinKind::Constant(VariableData {
                declared_type,
                ..VariableData::default()
            }),
        )
    }

    pub fn reference(
        kind: ReferenceKind,
        name: impl Into<SmolStr>,
        closure: &PinRef,
        generic_values: Vec<ComplexType>,
    ) -> Pin {
        Pin::new(
            name,
            Some(closure),
            PinKind::Reference(ReferenceData {
                kind,
                generic_values,
            }),
        )
    }

    /// An instance, class or global variable; `Local` gives a local.
    pub fn variable(
        kind: VariableKind,
        name: impl Into<SmolStr>,
        closure: &PinRef,
        declared_type: Option<ComplexType>,
    ) -> Pin {
        let data = VariableData {
            declared_type,
            ..VariableData::default()
        };
        let kind = match kind {
            VariableKind::Local => PinKind::LocalVariable(data),
            VariableKind::Instance => PinKind::InstanceVariable(data),
            VariableKind::Class => PinKind::ClassVariable(data),
            VariableKind::Global => PinKind::GlobalVariable(data),
        };
        Pin::new(name, Some(closure), kind)
    }

    /// A flow-derived local shadowing this variable over `presence`.
    pub fn narrowed(&self, ty: ComplexType, presence: Range) -> Pin {
        let mut pin = Pin::new(
            self.name.clone(),
            self.closure.as_ref(),
            PinKind::LocalVariable(VariableData {
                declared_type: Some(ty),
                assignment: None,
                presence: Some(presence),
                certain: true,
            }),
        );
        pin.location = self.location.clone();
        pin.comments = self.comments.clone();
        pin
    }

    pub fn keyword(name: impl Into<SmolStr>) -> Pin {
        Pin::new(name, None, PinKind::Keyword)
    }

    pub fn block(closure: &PinRef, receiver: Option<Chain>) -> Pin {
        Pin::new(
            "",
            Some(closure),
            PinKind::Block(BlockData {
                receiver,
                binder: None,
            }),
        )
    }

    /// A pin carrying nothing but a type.
    pub fn anonymous(ty: ComplexType) -> Pin {
        let mut pin = Pin::new("", None, PinKind::ProxyType);
        pin.proxy_type = Some(ty);
        pin
    }

    /// A proxy evaluating to `ty` with `closure`'s gates and namespace.
    pub fn proxy_in(closure: &PinRef, ty: ComplexType) -> Pin {
        let mut pin = Pin::new("", Some(closure), PinKind::ProxyType);
        pin.proxy_type = Some(ty);
        pin
    }

    pub fn with_location(mut self, location: Location) -> Pin {
        self.location = Some(location);
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Pin {
        self.comments = comments.into();
        self.docstring = OnceLock::new();
        self.declared = OnceLock::new();
        self
    }

    /// Explicit `self` for a block (`instance_eval` style).
    pub fn with_binder(mut self, binder: ComplexType) -> Pin {
        if let PinKind::Block(data) = &mut self.kind {
            data.binder = Some(binder);
        }
        self
    }

    pub fn with_generics(mut self, generics: Vec<SmolStr>) -> Pin {
        if let PinKind::Namespace(data) = &mut self.kind {
            data.generics = generics;
        }
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Pin {
        if let PinKind::Method(data) = &mut self.kind {
            data.visibility = visibility;
        }
        self
    }

    pub fn with_assignment(mut self, chain: Chain) -> Pin {
        match &mut self.kind {
            PinKind::LocalVariable(data)
            | PinKind::Constant(data)
            | PinKind::GlobalVariable(data)
            | PinKind::InstanceVariable(data)
            | PinKind::ClassVariable(data) => data.assignment = Some(chain),
            _ => {}
        }
        self
    }

    pub fn into_ref(self) -> PinRef {
        Arc::new(self)
    }

    /// Same identity, evaluating to `ty`.
    pub fn proxy(&self, ty: ComplexType) -> Pin {
        let mut pin = self.clone();
        pin.proxy_type = Some(ty);
        pin
    }

    /// A method pin reduced to the overload that was selected for a call.
    pub fn with_single_signature(&self, signature: Signature) -> Pin {
        let mut pin = self.clone();
        if let PinKind::Method(data) = &mut pin.kind {
            data.signatures = vec![signature];
            pin.declared = OnceLock::new();
        }
        pin
    }

    pub fn with_signatures(&self, signatures: Vec<Signature>) -> Pin {
        let mut pin = self.clone();
        if let PinKind::Method(data) = &mut pin.kind {
            data.signatures = signatures;
            pin.declared = OnceLock::new();
        }
        pin
    }

    pub fn path(&self) -> &SmolStr {
        &self.path
    }

    pub fn is_proxied(&self) -> bool {
        self.proxy_type.is_some()
    }

    pub fn docstring(&self) -> &Docstring {
        self.docstring.get_or_init(|| Docstring::parse(&self.comments))
    }

    /// Fully qualified namespace this pin lives in. For namespaces, their
    /// own path.
    pub fn namespace(&self) -> SmolStr {
        match &self.kind {
            PinKind::Namespace(_) => self.path.clone(),
            _ => self
                .closure
                .as_ref()
                .map(|c| c.namespace())
                .unwrap_or_default(),
        }
    }

    /// Lexical scopes for relative constant lookup, innermost first, ending
    /// with the root gate `""`.
    pub fn gates(&self) -> Vec<SmolStr> {
        match (&self.kind, &self.closure) {
            (PinKind::Namespace(_), Some(closure)) => {
                let mut gates = vec![self.path.clone()];
                gates.extend(closure.gates());
                gates
            }
            (PinKind::Namespace(_), None) if !self.path.is_empty() => {
                vec![self.path.clone(), SmolStr::default()]
            }
            (_, Some(closure)) => closure.gates(),
            (_, None) => vec![SmolStr::default()],
        }
    }

    /// Type of `self` inside this pin.
    pub fn context(&self) -> ComplexType {
        match &self.kind {
            PinKind::Namespace(_) if self.path.is_empty() => ComplexType::root("Object"),
            PinKind::Namespace(data) => {
                let meta = match data.kind {
                    NamespaceKind::Class => "Class",
                    NamespaceKind::Module => "Module",
                };
                ComplexType::from(UniqueType::list(meta, vec![ComplexType::root(&self.path)]))
            }
            PinKind::Method(data) => {
                let ns = self.namespace();
                let instance = if ns.is_empty() {
                    ComplexType::root("Object")
                } else {
                    ComplexType::root(&ns)
                };
                match data.scope {
                    Scope::Instance => instance,
                    Scope::Class => self
                        .closure
                        .as_ref()
                        .map(|c| c.context())
                        .unwrap_or_else(|| instance.to_class_scope()),
                }
            }
            PinKind::Block(BlockData {
                binder: Some(binder),
                ..
            }) => binder.clone(),
            PinKind::ProxyType => match &self.proxy_type {
                Some(ty) => ty.clone(),
                None => self.closure_context(),
            },
            _ => self.closure_context(),
        }
    }

    fn closure_context(&self) -> ComplexType {
        self.closure
            .as_ref()
            .map(|c| c.context())
            .unwrap_or_else(|| ComplexType::root("Object"))
    }

    /// Nearest enclosing method, this pin included.
    pub fn enclosing_method(&self) -> Option<&Pin> {
        let mut current = self;
        loop {
            if matches!(current.kind, PinKind::Method(_)) {
                return Some(current);
            }
            current = current.closure.as_deref()?;
        }
    }

    pub fn as_namespace(&self) -> Option<&NamespaceData> {
        match &self.kind {
            PinKind::Namespace(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodData> {
        match &self.kind {
            PinKind::Method(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ReferenceData> {
        match &self.kind {
            PinKind::Reference(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockData> {
        match &self.kind {
            PinKind::Block(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_parameter(&self) -> Option<&ParameterData> {
        match &self.kind {
            PinKind::Parameter(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableData> {
        self.kind.variable()
    }

    pub fn is_namespace(&self) -> bool {
        self.as_namespace().is_some()
    }

    pub fn is_method(&self) -> bool {
        self.as_method().is_some()
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, PinKind::Constant(_))
    }

    /// Locals and parameters: the pins flow narrowing works on.
    pub fn is_local(&self) -> bool {
        matches!(self.kind, PinKind::LocalVariable(_) | PinKind::Parameter(_))
    }

    pub fn method_scope(&self) -> Option<Scope> {
        self.as_method().map(|m| m.scope)
    }

    pub fn signatures(&self) -> &[Signature] {
        self.as_method().map(|m| m.signatures.as_slice()).unwrap_or(&[])
    }

    pub fn presence(&self) -> Option<Range> {
        match &self.kind {
            PinKind::Parameter(data) => data.presence,
            _ => self.as_variable().and_then(|v| v.presence),
        }
    }

    pub fn is_certain(&self) -> bool {
        self.as_variable().is_some_and(|v| v.certain)
    }

    /// Whether this variable governs lookups at `pos`. Pins without a
    /// presence range are visible everywhere.
    pub fn visible_at(&self, pos: Position) -> bool {
        self.presence().map_or(true, |range| range.contains(pos))
    }

    pub fn assignment(&self) -> Option<&Chain> {
        self.as_variable().and_then(|v| v.assignment.as_ref())
    }

    /// The type the pin evaluates to without consulting the store.
    /// `undefined` when it has to be inferred.
    pub fn return_type(&self) -> &ComplexType {
        if let Some(proxied) = &self.proxy_type {
            return proxied;
        }
        self.declared.get_or_init(|| self.declared_type())
    }

    fn declared_type(&self) -> ComplexType {
        match &self.kind {
            PinKind::Namespace(_) => self.context(),
            PinKind::Method(data) => {
                let from_signatures =
                    ComplexType::union_all(data.signatures.iter().map(|s| s.return_type.clone()));
                if from_signatures.is_defined() {
                    from_signatures
                } else {
                    self.docstring().return_type()
                }
            }
            PinKind::Parameter(data) => match &data.declared_type {
                Some(ty) => ty.clone(),
                None => self.parameter_type_from_closure(),
            },
            PinKind::LocalVariable(data)
            | PinKind::Constant(data)
            | PinKind::GlobalVariable(data)
            | PinKind::InstanceVariable(data)
            | PinKind::ClassVariable(data) => match &data.declared_type {
                Some(ty) => ty.clone(),
                None => {
                    let doc = self.docstring();
                    doc.tag("type")
                        .map(|t| t.complex_type())
                        .unwrap_or_else(|| doc.return_type())
                }
            },
            PinKind::Keyword | PinKind::Reference(_) | PinKind::ProxyType | PinKind::Block(_) => {
                ComplexType::undefined()
            }
        }
    }

    /// `@param` documentation or the signature of the enclosing method.
    fn parameter_type_from_closure(&self) -> ComplexType {
        let Some(closure) = self.closure.as_deref() else {
            return ComplexType::undefined();
        };
        let Some(method) = closure.as_method() else {
            return ComplexType::undefined();
        };
        let documented = closure.docstring().param_type(&self.name);
        if documented.is_defined() {
            return documented;
        }
        method
            .signatures
            .first()
            .and_then(|sig| sig.parameters.iter().find(|p| p.name == self.name))
            .map(|p| p.declared_type.clone())
            .unwrap_or_default()
    }

    /// The referenced type of an ancestry edge, generic values attached.
    pub fn referenced_type(&self) -> Option<UniqueType> {
        let data = self.as_reference()?;
        let named = ComplexType::parse(&self.name);
        let base = named.first().clone();
        if data.generic_values.is_empty() {
            return Some(base);
        }
        let kind = match base.param_kind() {
            ParamKind::None => ParamKind::List,
            kind => kind,
        };
        Some(UniqueType::new(
            base.name().clone(),
            base.is_rooted(),
            Vec::new(),
            data.generic_values.clone(),
            kind,
        ))
    }

    /// Gates a reference's name is resolved against. A superclass cannot be
    /// found inside the class it is the superclass of.
    pub fn reference_gates(&self) -> Vec<SmolStr> {
        let Some(closure) = self.closure.as_deref() else {
            return vec![SmolStr::default()];
        };
        let gates = closure.gates();
        match self.as_reference().map(|r| r.kind) {
            Some(ReferenceKind::Superclass) => gates
                .into_iter()
                .filter(|g| g != closure.path())
                .collect(),
            _ => gates,
        }
    }

    /// Macro directives carrying a body.
    pub fn macros(&self) -> Vec<&comment_parser::Directive> {
        self.docstring()
            .macros()
            .filter(|d| !d.body.trim().is_empty())
            .collect()
    }

    /// Names of macros this pin refers to without defining them.
    pub fn macro_references(&self) -> Vec<&str> {
        self.docstring()
            .macros()
            .filter(|d| d.body.trim().is_empty())
            .filter_map(|d| d.label())
            .collect()
    }
}

fn compute_path(name: &SmolStr, closure: Option<&PinRef>, kind: &PinKind) -> SmolStr {
    let closure_path = closure.map(|c| c.path().clone()).unwrap_or_default();
    let ns = closure.map(|c| c.namespace()).unwrap_or_default();
    match kind {
        PinKind::Namespace(_) => {
            if let Some(absolute) = name.strip_prefix("::") {
                SmolStr::new(absolute)
            } else if ns.is_empty() {
                name.clone()
            } else {
                format_smolstr!("{ns}::{name}")
            }
        }
        PinKind::Method(data) => match data.scope {
            Scope::Instance => format_smolstr!("{ns}#{name}"),
            Scope::Class => format_smolstr!("{ns}.{name}"),
        },
        PinKind::Constant(_) | PinKind::ClassVariable(_) => {
            if ns.is_empty() {
                name.clone()
            } else {
                format_smolstr!("{ns}::{name}")
            }
        }
        PinKind::InstanceVariable(_) => format_smolstr!("{ns}#{name}"),
        PinKind::GlobalVariable(_) | PinKind::Keyword => name.clone(),
        PinKind::LocalVariable(_) | PinKind::Parameter(_) => format_smolstr!("{closure_path}|{name}"),
        PinKind::Block(_) => format_smolstr!("{closure_path}|<block>"),
        PinKind::Reference(data) => format_smolstr!("{closure_path}<{}:{name}>", data.kind),
        PinKind::ProxyType => SmolStr::default(),
    }
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.kind == other.kind
            && self.location == other.location
            && self.proxy_type == other.proxy_type
    }
}

impl Eq for Pin {}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.kind.name(), self.path)?;
        if let Some(proxied) = &self.proxy_type {
            write!(f, " => {proxied}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PinKind::Method(data) => {
                let sigs: Vec<String> = data.signatures.iter().map(ToString::to_string).collect();
                write!(f, "{} {}", self.path, sigs.join(" | "))
            }
            _ => write!(f, "{} {}", self.path, self.return_type()),
        }
    }
}
