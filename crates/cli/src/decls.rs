// ==============================================================================
// Declaration Files
// ==============================================================================
//
// A declaration file is TOML describing the pins of one provenance group:
//
// ```toml
// [[namespace]]
// name = "Box"
// generics = ["Elem"]
// include = ["Enumerable<generic<Elem>>"]
//
// [[method]]
// namespace = "Box"
// name = "map"
//
//   [[method.signature]]
//   generics = ["U"]
//   returns = "Box<generic<U>>"
//   block = { params = [{ name = "e", type = "generic<Elem>" }], returns = "generic<U>" }
//
// [[constant]]
// namespace = "Box"
// name = "EMPTY"
// type = "Box"
//
// [[override]]
// method = "Box#first"
// returns = "generic<Elem>, nil"
// ```
//
// Namespaces nest under a namespace declared earlier in the same file
// (`Foo::Bar` inside `Foo`); otherwise they are compact declarations at the
// top level, the same as `class Foo::Bar`.

use std::hash::Hasher;
use std::path::{Path, PathBuf};

use lang_pin::{NamespaceKind, ParamDecl, Parameter, Pin, PinRef, ReferenceKind, Signature, Visibility};
use lang_ty::{ComplexType, Scope, TypeParseError};
use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHasher};
use serde::Deserialize;
use smol_str::SmolStr;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum DeclError {
    #[error("failed to read declaration file {}", path.display())]
    #[diagnostic(code(infer::decls::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid declaration file {}", path.display())]
    #[diagnostic(code(infer::decls::parse))]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("bad type in {} ({context})", path.display())]
    #[diagnostic(code(infer::decls::type_tag), help("type tags look like `Array<String>, nil`"))]
    Type {
        path: PathBuf,
        context: String,
        #[source]
        source: TypeParseError,
    },
}

// ==============================================================================
// File format
// ==============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclFile {
    #[serde(default, rename = "namespace")]
    pub namespaces: Vec<NamespaceDecl>,
    #[serde(default, rename = "method")]
    pub methods: Vec<MethodDecl>,
    #[serde(default, rename = "constant")]
    pub constants: Vec<ConstantDecl>,
    #[serde(default, rename = "override")]
    pub overrides: Vec<OverrideDecl>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindDecl {
    #[default]
    Class,
    Module,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamespaceDecl {
    pub name: String,
    #[serde(default)]
    pub kind: KindDecl,
    pub superclass: Option<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub prepend: Vec<String>,
    #[serde(default)]
    pub extend: Vec<String>,
    #[serde(default)]
    pub generics: Vec<String>,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeDecl {
    #[default]
    Instance,
    Class,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityDecl {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDecl {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub scope: ScopeDecl,
    #[serde(default)]
    pub visibility: VisibilityDecl,
    #[serde(default, rename = "signature")]
    pub signatures: Vec<SignatureDecl>,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignatureDecl {
    #[serde(default)]
    pub generics: Vec<String>,
    #[serde(default)]
    pub params: Vec<ParamDeclToml>,
    pub returns: Option<String>,
    pub block: Option<Box<SignatureDecl>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKindDecl {
    #[default]
    Req,
    Opt,
    Rest,
    KwReq,
    KwOpt,
    KwRest,
    Block,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamDeclToml {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<String>,
    #[serde(default)]
    pub kind: ParamKindDecl,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstantDecl {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<String>,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideDecl {
    /// Path of the method, `Foo#bar` or `Foo.bar`.
    pub method: String,
    pub returns: String,
}

impl From<ParamKindDecl> for ParamDecl {
    fn from(kind: ParamKindDecl) -> Self {
        match kind {
            ParamKindDecl::Req => ParamDecl::Req,
            ParamKindDecl::Opt => ParamDecl::Opt,
            ParamKindDecl::Rest => ParamDecl::Rest,
            ParamKindDecl::KwReq => ParamDecl::KwReq,
            ParamKindDecl::KwOpt => ParamDecl::KwOpt,
            ParamKindDecl::KwRest => ParamDecl::KwRest,
            ParamKindDecl::Block => ParamDecl::Block,
        }
    }
}

// ==============================================================================
// Pin construction
// ==============================================================================

struct PinBuilder<'p> {
    path: &'p Path,
    root: PinRef,
    namespaces: FxHashMap<SmolStr, PinRef>,
    pins: Vec<PinRef>,
}

impl<'p> PinBuilder<'p> {
    fn new(path: &'p Path) -> Self {
        Self {
            path,
            root: Pin::root(),
            namespaces: FxHashMap::default(),
            pins: Vec::new(),
        }
    }

    fn parse_type(&self, text: &str, context: impl FnOnce() -> String) -> Result<ComplexType, DeclError> {
        ComplexType::try_parse(text).map_err(|source| DeclError::Type {
            path: self.path.to_path_buf(),
            context: context(),
            source,
        })
    }

    fn optional_type(&self, text: Option<&str>, context: impl FnOnce() -> String) -> Result<ComplexType, DeclError> {
        match text {
            Some(text) => self.parse_type(text, context),
            None => Ok(ComplexType::undefined()),
        }
    }

    /// The pin methods and constants of `path` hang off. Namespaces only
    /// reopened in this file get a closure that is not emitted.
    fn closure_for(&self, path: &str) -> PinRef {
        if path.is_empty() {
            return self.root.clone();
        }
        match self.namespaces.get(path) {
            Some(pin) => pin.clone(),
            None => Pin::new_namespace(path, Some(&self.root), NamespaceKind::Class).into_ref(),
        }
    }

    fn namespace(&mut self, decl: &NamespaceDecl) -> Result<(), DeclError> {
        let path = decl.name.trim_start_matches("::");
        let (closure, name) = match path.rsplit_once("::") {
            Some((outer, name)) if self.namespaces.contains_key(outer) => (self.closure_for(outer), name),
            _ => (self.root.clone(), path),
        };
        let kind = match decl.kind {
            KindDecl::Class => NamespaceKind::Class,
            KindDecl::Module => NamespaceKind::Module,
        };
        let pin = Pin::new_namespace(name, Some(&closure), kind)
            .with_generics(decl.generics.iter().map(SmolStr::new).collect())
            .with_comments(decl.comments.as_str())
            .into_ref();
        self.namespaces.insert(pin.path().clone(), pin.clone());
        self.pins.push(pin.clone());

        let edges = decl
            .superclass
            .iter()
            .map(|name| (ReferenceKind::Superclass, name))
            .chain(decl.include.iter().map(|name| (ReferenceKind::Include, name)))
            .chain(decl.prepend.iter().map(|name| (ReferenceKind::Prepend, name)))
            .chain(decl.extend.iter().map(|name| (ReferenceKind::Extend, name)));
        for (kind, text) in edges {
            let ty = self.parse_type(text, || format!("{kind} of {path}"))?;
            let member = ty.first();
            let name = if member.is_rooted() {
                format!("::{}", member.name())
            } else {
                member.name().to_string()
            };
            let reference = Pin::reference(kind, name, &pin, member.subtypes().to_vec());
            self.pins.push(reference.into_ref());
        }
        Ok(())
    }

    fn signature(&self, decl: &SignatureDecl, owner: &str) -> Result<Signature, DeclError> {
        let mut parameters = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let ty = self.optional_type(param.ty.as_deref(), || format!("parameter {} of {owner}", param.name))?;
            parameters.push(Parameter::new(param.name.as_str(), param.kind.into(), ty));
        }
        let returns = self.optional_type(decl.returns.as_deref(), || format!("return type of {owner}"))?;
        let block = match &decl.block {
            Some(block) => Some(self.signature(block, owner)?),
            None => None,
        };
        Ok(Signature::new(
            decl.generics.iter().map(SmolStr::new).collect(),
            parameters,
            returns,
            block,
        ))
    }

    fn method(&mut self, decl: &MethodDecl) -> Result<(), DeclError> {
        let owner = format!("{}#{}", decl.namespace, decl.name);
        let signatures = decl
            .signatures
            .iter()
            .map(|sig| self.signature(sig, &owner))
            .collect::<Result<Vec<_>, _>>()?;
        let scope = match decl.scope {
            ScopeDecl::Instance => Scope::Instance,
            ScopeDecl::Class => Scope::Class,
        };
        let visibility = match decl.visibility {
            VisibilityDecl::Public => Visibility::Public,
            VisibilityDecl::Protected => Visibility::Protected,
            VisibilityDecl::Private => Visibility::Private,
        };
        let closure = self.closure_for(decl.namespace.trim_start_matches("::"));
        let pin = Pin::method(decl.name.as_str(), &closure, scope, signatures)
            .with_visibility(visibility)
            .with_comments(decl.comments.as_str());
        self.pins.push(pin.into_ref());
        Ok(())
    }

    fn constant(&mut self, decl: &ConstantDecl) -> Result<(), DeclError> {
        let declared = match &decl.ty {
            Some(text) => Some(self.parse_type(text, || format!("constant {}", decl.name))?),
            None => None,
        };
        let closure = self.closure_for(decl.namespace.trim_start_matches("::"));
        let pin = Pin::constant(decl.name.as_str(), &closure, declared).with_comments(decl.comments.as_str());
        self.pins.push(pin.into_ref());
        Ok(())
    }

    fn override_method(&mut self, decl: &OverrideDecl) -> Result<(), DeclError> {
        let returns = self.parse_type(&decl.returns, || format!("override of {}", decl.method))?;
        let pin = Pin::reference(ReferenceKind::Override, decl.method.as_str(), &self.root, vec![returns]);
        self.pins.push(pin.into_ref());
        Ok(())
    }
}

/// Pins declared by one declaration file's contents.
pub fn parse_declarations(path: &Path, source: &str) -> Result<Vec<PinRef>, DeclError> {
    let file: DeclFile = toml::from_str(source).map_err(|source| DeclError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut builder = PinBuilder::new(path);
    // outer namespaces first so nested ones find their closure
    let mut namespaces: Vec<&NamespaceDecl> = file.namespaces.iter().collect();
    namespaces.sort_by_key(|decl| decl.name.matches("::").count());
    for decl in namespaces {
        builder.namespace(decl)?;
    }
    for decl in &file.methods {
        builder.method(decl)?;
    }
    for decl in &file.constants {
        builder.constant(decl)?;
    }
    for decl in &file.overrides {
        builder.override_method(decl)?;
    }
    Ok(builder.pins)
}

// ==============================================================================
// Workspace loading
// ==============================================================================

/// Provenance groups of a set of declaration files, with a checksum of
/// their contents.
#[derive(Debug)]
pub struct Workspace {
    pub checksum: u64,
    pub groups: Vec<(SmolStr, Vec<PinRef>)>,
}

/// Load every declaration file as its own group. Unreadable files are
/// errors; files that fail to parse are skipped with a warning.
pub fn load_workspace(paths: &[PathBuf]) -> Result<Workspace, DeclError> {
    let mut hasher = FxHasher::default();
    let mut groups = Vec::with_capacity(paths.len());
    for path in paths {
        let source = std::fs::read_to_string(path).map_err(|source| DeclError::Io {
            path: path.clone(),
            source,
        })?;
        hasher.write(path.to_string_lossy().as_bytes());
        hasher.write(source.as_bytes());

        match parse_declarations(path, &source) {
            Ok(pins) => {
                log::debug!("{} declares {} pins", path.display(), pins.len());
                groups.push((SmolStr::new(path.to_string_lossy()), pins));
            }
            Err(err) => log::warn!("skipping {}: {err}", path.display()),
        }
    }
    Ok(Workspace {
        checksum: hasher.finish(),
        groups,
    })
}
