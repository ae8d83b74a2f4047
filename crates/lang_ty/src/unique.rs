// ==============================================================================
// Unique Types
// ==============================================================================
//
// A UniqueType is one member of a union: a name plus optional parameters.
// Everything derived from the structure (tag, namespace, scope, rootedness) is
// computed once at construction so that shared values can be read from any
// thread without synchronisation.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smol_str::{format_smolstr, SmolStr};

use crate::{ComplexType, DUCK_MARKER, GENERIC_TAG_NAME};

/// Bracket style of a parameterised type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamKind {
    #[default]
    None,
    /// `Array<String>`
    List,
    /// `Array(String, Integer)`
    Fixed,
    /// `Hash{Symbol => String}`
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Instance,
    Class,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Instance => write!(f, "instance"),
            Scope::Class => write!(f, "class"),
        }
    }
}

/// Names that never refer to a user declaration.
pub const RESERVED_NAMES: &[&str] = &["nil", "void", "undefined", "self", "Boolean"];

#[derive(Clone, derive_more::Debug)]
#[debug("{}", _0.rooted_tag)]
pub struct UniqueType(Arc<UniqueData>);

struct UniqueData {
    name: SmolStr,
    rooted_flag: bool,
    key_types: Vec<ComplexType>,
    subtypes: Vec<ComplexType>,
    kind: ParamKind,

    tag: SmolStr,
    rooted_tag: SmolStr,
    namespace: SmolStr,
    scope: Scope,
    rooted: bool,
}

impl UniqueType {
    pub fn new(
        name: impl Into<SmolStr>,
        rooted: bool,
        key_types: Vec<ComplexType>,
        subtypes: Vec<ComplexType>,
        kind: ParamKind,
    ) -> Self {
        let name = name.into();
        // a parameter kind without parameters is the bare form
        let kind = match kind {
            _ if key_types.is_empty() && subtypes.is_empty() => ParamKind::None,
            ParamKind::None => ParamKind::List,
            kind => kind,
        };

        let substring = substring(kind, &key_types, &subtypes, ComplexType::tag);
        let rooted_substring = substring_of(kind, &key_types, &subtypes);
        let tag = format_smolstr!("{name}{substring}");
        let rooted_tag = if rooted {
            format_smolstr!("::{name}{rooted_substring}")
        } else {
            format_smolstr!("{name}{rooted_substring}")
        };

        let is_duck = name.starts_with(DUCK_MARKER);
        let is_meta = (name == "Class" || name == "Module") && !subtypes.is_empty();
        let namespace = if is_duck {
            SmolStr::new_static("Object")
        } else if name == "nil" {
            SmolStr::new_static("NilClass")
        } else if is_meta {
            subtypes[0].name()
        } else {
            name.clone()
        };
        let scope = if is_meta && !is_duck {
            Scope::Class
        } else {
            Scope::Instance
        };
        let all_rooted = rooted
            && key_types
                .iter()
                .chain(subtypes.iter())
                .all(ComplexType::is_rooted);

        UniqueType(Arc::new(UniqueData {
            name,
            rooted_flag: rooted,
            key_types,
            subtypes,
            kind,
            tag,
            rooted_tag,
            namespace,
            scope,
            rooted: all_rooted,
        }))
    }

    /// A relative, unparameterised type.
    pub fn named(name: impl Into<SmolStr>) -> Self {
        Self::new(name, false, Vec::new(), Vec::new(), ParamKind::None)
    }

    /// An absolute, unparameterised type.
    pub fn rooted(name: impl Into<SmolStr>) -> Self {
        Self::new(name, true, Vec::new(), Vec::new(), ParamKind::None)
    }

    pub fn list(name: impl Into<SmolStr>, subtypes: Vec<ComplexType>) -> Self {
        Self::new(name, true, Vec::new(), subtypes, ParamKind::List)
    }

    pub fn fixed(name: impl Into<SmolStr>, subtypes: Vec<ComplexType>) -> Self {
        Self::new(name, true, Vec::new(), subtypes, ParamKind::Fixed)
    }

    pub fn hash(name: impl Into<SmolStr>, keys: ComplexType, values: ComplexType) -> Self {
        Self::new(name, true, vec![keys], vec![values], ParamKind::Hash)
    }

    /// `generic<T>`
    pub fn generic(param: impl Into<SmolStr>) -> Self {
        Self::new(
            GENERIC_TAG_NAME,
            false,
            Vec::new(),
            vec![ComplexType::from(UniqueType::named(param))],
            ParamKind::List,
        )
    }

    /// Same structure with a different name and rooted flag.
    pub fn renamed(&self, name: impl Into<SmolStr>, rooted: bool) -> Self {
        Self::new(
            name,
            rooted,
            self.0.key_types.clone(),
            self.0.subtypes.clone(),
            self.0.kind,
        )
    }

    /// Same name with replaced parameters.
    pub fn with_params(&self, key_types: Vec<ComplexType>, subtypes: Vec<ComplexType>) -> Self {
        Self::new(
            self.0.name.clone(),
            self.0.rooted_flag,
            key_types,
            subtypes,
            self.0.kind,
        )
    }

    pub fn name(&self) -> &SmolStr {
        &self.0.name
    }

    pub fn tag(&self) -> &SmolStr {
        &self.0.tag
    }

    pub fn rooted_tag(&self) -> &SmolStr {
        &self.0.rooted_tag
    }

    pub fn namespace(&self) -> &SmolStr {
        &self.0.namespace
    }

    pub fn rooted_namespace(&self) -> SmolStr {
        if self.0.rooted_flag {
            format_smolstr!("::{}", self.0.namespace)
        } else {
            self.0.namespace.clone()
        }
    }

    pub fn scope(&self) -> Scope {
        self.0.scope
    }

    /// Rooted itself and in every parameter.
    pub fn is_rooted(&self) -> bool {
        self.0.rooted
    }

    /// Only this member's own marker, ignoring parameters.
    pub fn has_root_marker(&self) -> bool {
        self.0.rooted_flag
    }

    pub fn key_types(&self) -> &[ComplexType] {
        &self.0.key_types
    }

    pub fn subtypes(&self) -> &[ComplexType] {
        &self.0.subtypes
    }

    pub fn param_kind(&self) -> ParamKind {
        self.0.kind
    }

    pub fn all_params(&self) -> impl Iterator<Item = &ComplexType> {
        self.0.key_types.iter().chain(self.0.subtypes.iter())
    }

    /// Union of the value parameters, or undefined when there are none.
    pub fn value_type(&self) -> ComplexType {
        ComplexType::union_all(self.0.subtypes.iter().cloned())
    }

    pub fn key_type(&self) -> ComplexType {
        ComplexType::union_all(self.0.key_types.iter().cloned())
    }

    pub fn is_duck(&self) -> bool {
        self.0.name.starts_with(DUCK_MARKER)
    }

    pub fn is_nil(&self) -> bool {
        self.0.name == "nil"
    }

    pub fn is_void(&self) -> bool {
        self.0.name == "void"
    }

    pub fn is_undefined(&self) -> bool {
        self.0.name == "undefined"
    }

    pub fn is_defined(&self) -> bool {
        !self.is_undefined()
    }

    pub fn is_self(&self) -> bool {
        self.0.name == "self"
    }

    pub fn is_reserved(&self) -> bool {
        RESERVED_NAMES.contains(&self.0.name.as_str())
    }

    pub fn is_tuple(&self) -> bool {
        self.0.kind == ParamKind::Fixed
    }

    /// A `generic<T>` placeholder.
    pub fn is_generic_placeholder(&self) -> bool {
        self.0.name == GENERIC_TAG_NAME
    }

    /// `T` for `generic<T>`.
    pub fn generic_name(&self) -> Option<SmolStr> {
        if !self.is_generic_placeholder() {
            return None;
        }
        self.0.subtypes.first().map(ComplexType::name)
    }

    pub fn is_literal(&self) -> bool {
        literal_class(&self.0.name).is_some()
    }

    /// Class name a literal type widens to.
    pub fn literal_class(&self) -> Option<&'static str> {
        literal_class(&self.0.name)
    }
}

fn literal_class(name: &str) -> Option<&'static str> {
    let first = name.chars().next()?;
    match first {
        _ if name == "true" || name == "false" => Some("Boolean"),
        '\'' | '"' => Some("String"),
        ':' if !name.starts_with("::") => Some("Symbol"),
        '-' | '0'..='9' => {
            let digits = name.trim_start_matches('-');
            if digits.is_empty() || !digits.starts_with(|c: char| c.is_ascii_digit()) {
                None
            } else if digits.contains('.') {
                Some("Float")
            } else {
                Some("Integer")
            }
        }
        _ => None,
    }
}

fn substring_of(kind: ParamKind, key_types: &[ComplexType], subtypes: &[ComplexType]) -> String {
    substring(kind, key_types, subtypes, ComplexType::rooted_tag)
}

fn substring<'a>(
    kind: ParamKind,
    key_types: &'a [ComplexType],
    subtypes: &'a [ComplexType],
    to_str: fn(&'a ComplexType) -> &'a SmolStr,
) -> String {
    let nothing_defined = key_types
        .iter()
        .chain(subtypes.iter())
        .all(ComplexType::is_undefined);
    if nothing_defined {
        return String::new();
    }

    let join = |types: &'a [ComplexType]| -> String {
        types
            .iter()
            .map(|t| to_str(t).as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    match kind {
        ParamKind::None => String::new(),
        ParamKind::Hash => format!("{{{} => {}}}", join(key_types), join(subtypes)),
        ParamKind::Fixed => format!("({})", join(subtypes)),
        ParamKind::List => format!("<{}>", join(subtypes)),
    }
}

impl PartialEq for UniqueType {
    fn eq(&self, other: &Self) -> bool {
        self.0.tag == other.0.tag
    }
}

impl Eq for UniqueType {}

impl Hash for UniqueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.tag.hash(state);
    }
}

impl fmt::Display for UniqueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.tag)
    }
}
