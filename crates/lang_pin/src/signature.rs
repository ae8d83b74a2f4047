// ==============================================================================
// Signatures
// ==============================================================================
//
// One overload of a callable: generic names, ordered parameters, a return
// type and an optional block signature. Signatures are values; every
// resolution step returns a new one.

use std::fmt;

use lang_ty::{ComplexType, GenericBindings, UniqueType};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamDecl {
    /// `x`
    Req,
    /// `x = 1`
    Opt,
    /// `*rest`
    Rest,
    /// `x:`
    KwReq,
    /// `x: 1`
    KwOpt,
    /// `**opts`
    KwRest,
    /// `&block`
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: SmolStr,
    pub decl: ParamDecl,
    pub declared_type: ComplexType,
}

impl Parameter {
    pub fn new(name: impl Into<SmolStr>, decl: ParamDecl, declared_type: ComplexType) -> Self {
        Self {
            name: name.into(),
            decl,
            declared_type,
        }
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.decl, ParamDecl::Req | ParamDecl::Opt | ParamDecl::Rest)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = &self.declared_type;
        let name = &self.name;
        match self.decl {
            ParamDecl::Req => write!(f, "{ty} {name}"),
            ParamDecl::Opt => write!(f, "?{ty} {name}"),
            ParamDecl::Rest => write!(f, "*{ty} {name}"),
            ParamDecl::KwReq => write!(f, "{name}: {ty}"),
            ParamDecl::KwOpt => write!(f, "?{name}: {ty}"),
            ParamDecl::KwRest => write!(f, "**{ty} {name}"),
            ParamDecl::Block => write!(f, "&{ty} {name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub generics: Vec<SmolStr>,
    pub parameters: Vec<Parameter>,
    pub return_type: ComplexType,
    pub block: Option<Box<Signature>>,
}

impl Signature {
    pub fn new(
        generics: Vec<SmolStr>,
        parameters: Vec<Parameter>,
        return_type: ComplexType,
        block: Option<Signature>,
    ) -> Self {
        Self {
            generics,
            parameters,
            return_type,
            block: block.map(Box::new),
        }
    }

    /// `() -> ret`
    pub fn returning(return_type: ComplexType) -> Self {
        Self::new(Vec::new(), Vec::new(), return_type, None)
    }

    pub fn has_block(&self) -> bool {
        self.block.is_some()
    }

    pub fn has_rest(&self) -> bool {
        self.parameters.iter().any(|p| p.decl == ParamDecl::Rest)
    }

    pub fn required_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.decl == ParamDecl::Req)
            .count()
    }

    pub fn optional_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.decl == ParamDecl::Opt)
            .count()
    }

    /// Positional parameters in declaration order.
    pub fn positional(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_positional())
    }

    /// Whether a call with `argc` positional arguments fits this overload.
    ///
    /// A signature declaring a block only fits calls that pass one; calls
    /// passing a block may still use a signature without one.
    pub fn arity_matches(&self, argc: usize, with_block: bool) -> bool {
        if self.has_block() && !with_block {
            return false;
        }
        let required = self.required_count();
        if argc < required {
            return false;
        }
        self.has_rest() || argc <= required + self.optional_count()
    }

    /// Rewrite every type in the signature, nested block included.
    pub fn transform_types(&self, f: &mut dyn FnMut(&ComplexType) -> ComplexType) -> Signature {
        Signature {
            generics: self.generics.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|p| Parameter {
                    name: p.name.clone(),
                    decl: p.decl,
                    declared_type: f(&p.declared_type),
                })
                .collect(),
            return_type: f(&self.return_type),
            block: self.block.as_ref().map(|b| Box::new(b.transform_types(&mut *f))),
        }
    }

    /// Every remaining `generic<T>` placeholder becomes `undefined`.
    pub fn erase_generics(&self) -> Signature {
        self.transform_types(&mut |t| t.erase_all_generics())
    }

    pub fn substitute_generics(&self, bindings: &GenericBindings) -> Signature {
        self.transform_types(&mut |t| t.substitute_generics(bindings))
    }

    pub fn self_to_type(&self, dst: &ComplexType) -> Signature {
        self.transform_types(&mut |t| t.self_to_type(dst))
    }

    pub fn is_generic(&self) -> bool {
        self.return_type.is_generic()
            || self.parameters.iter().any(|p| p.declared_type.is_generic())
            || self.block.as_ref().is_some_and(|b| b.is_generic())
    }

    /// One unification pass over parameters, return type and block.
    pub fn resolve_generics_from_context(
        &self,
        arg_types: Option<&[ComplexType]>,
        return_context: Option<&ComplexType>,
        yield_arg_types: Option<&[ComplexType]>,
        yield_return_context: Option<&ComplexType>,
        bindings: &mut GenericBindings,
    ) -> Signature {
        self.resolve_with(
            &self.generics,
            arg_types,
            return_context,
            yield_arg_types,
            yield_return_context,
            bindings,
        )
    }

    fn resolve_with(
        &self,
        generics: &[SmolStr],
        arg_types: Option<&[ComplexType]>,
        return_context: Option<&ComplexType>,
        yield_arg_types: Option<&[ComplexType]>,
        yield_return_context: Option<&ComplexType>,
        bindings: &mut GenericBindings,
    ) -> Signature {
        let mut parameters = Vec::with_capacity(self.parameters.len());
        for (idx, param) in self.parameters.iter().enumerate() {
            let arg = arg_types.and_then(|args| args.get(idx));
            parameters.push(Parameter {
                name: param.name.clone(),
                decl: param.decl,
                declared_type: param
                    .declared_type
                    .resolve_generics_from_context(generics, arg, bindings),
            });
        }

        let return_type = self
            .return_type
            .resolve_generics_from_context(generics, return_context, bindings);

        // the block shares the callable's generic names
        let block = self.block.as_ref().map(|block| {
            Box::new(block.resolve_with(
                generics,
                yield_arg_types,
                yield_return_context,
                None,
                None,
                bindings,
            ))
        });

        Signature {
            generics: self.generics.clone(),
            parameters,
            return_type,
            block,
        }
    }

    /// Repeat unification until the bindings stop changing, then erase
    /// whatever is still unbound.
    pub fn resolve_generics_until_complete(
        &self,
        arg_types: Option<&[ComplexType]>,
        return_context: Option<&ComplexType>,
        yield_arg_types: Option<&[ComplexType]>,
        yield_return_context: Option<&ComplexType>,
        bindings: &mut GenericBindings,
    ) -> Signature {
        let mut resolved = self.clone();
        // each productive pass binds at least one more name
        for _ in 0..=self.generics.len() {
            let before = bindings.clone();
            resolved = self.resolve_generics_from_context(
                arg_types,
                return_context,
                yield_arg_types,
                yield_return_context,
                bindings,
            );
            if *bindings == before {
                break;
            }
        }
        // one final pass so late bindings reach earlier slots
        resolved = resolved.substitute_generics(bindings);
        log::debug!("resolved signature {self} => {resolved} with {bindings:?}");
        resolved.erase_generics()
    }

    /// Type of the positional parameter an argument at `idx` lands in.
    pub fn parameter_for_argument(&self, idx: usize) -> Option<&Parameter> {
        let positional: Vec<&Parameter> = self.positional().collect();
        match positional.get(idx) {
            Some(param) if param.decl != ParamDecl::Rest => Some(param),
            _ => positional.iter().copied().find(|p| p.decl == ParamDecl::Rest),
        }
    }

    /// The block's parameter types, `undefined` past the end.
    pub fn block_parameter_type(&self, idx: usize) -> ComplexType {
        self.block
            .as_ref()
            .and_then(|b| b.parameters.get(idx))
            .map(|p| p.declared_type.clone())
            .unwrap_or_default()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.generics.is_empty() {
            write!(f, "[{}] ", self.generics.join(", "))?;
        }
        let params: Vec<String> = self
            .parameters
            .iter()
            .filter(|p| p.decl != ParamDecl::Block)
            .map(ToString::to_string)
            .collect();
        write!(f, "({})", params.join(", "))?;
        if let Some(block) = &self.block {
            write!(f, " {{ {block} }}")?;
        }
        write!(f, " -> {}", self.return_type)
    }
}

/// `generic<T>` as a type, for building signatures by hand.
pub fn generic(name: &str) -> ComplexType {
    ComplexType::from(UniqueType::generic(name))
}
