// ==============================================================================
// Expression Chains
// ==============================================================================
//
// A chain is a parsed reference or call expression flattened into steps:
// `Foo::Bar.new(1).baz { |x| x.to_s }` becomes
// `[Constant(Foo::Bar), Call(new, [1]), Call(baz, block)]`.
// Each link is resolved against the result of the links before it.

use std::fmt;

use lang_ty::ComplexType;
use smol_str::SmolStr;

use crate::{Location, VariableKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub links: Vec<Link>,
    pub location: Option<Location>,
    /// Safe navigation (`foo&.bar`) somewhere in the chain.
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// `Foo::Bar`, `::Foo`, or the root namespace when empty.
    Constant(SmolStr),
    /// A method call or a bare word that may be a local variable.
    Call(Call),
    /// `[a, b]`
    Array(Vec<Chain>),
    /// `{ k => v }`
    Hash(Vec<(Chain, Chain)>),
    /// A literal with a known type (`1`, `'str'`, `:sym`, `true`).
    Literal(ComplexType),
    /// `&:sym` passed as a block.
    BlockSymbol(SmolStr),
    /// `self`
    SelfRef,
    /// `@ivar`, `@@cvar`, `$global`
    Variable { kind: VariableKind, name: SmolStr },
    /// Anything the chainer could not classify.
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub word: SmolStr,
    pub location: Option<Location>,
    pub arguments: Vec<Chain>,
    pub block: Option<Box<Chain>>,
}

impl Call {
    /// A trailing `&:sym` argument is moved into the block slot.
    pub fn new(
        word: impl Into<SmolStr>,
        location: Option<Location>,
        mut arguments: Vec<Chain>,
        block: Option<Chain>,
    ) -> Self {
        let mut block = block;
        let trailing_block_pass = arguments
            .last()
            .and_then(|arg| arg.links.first())
            .is_some_and(|link| matches!(link, Link::BlockSymbol(_)));
        if trailing_block_pass {
            block = arguments.pop();
        }
        Self {
            word: word.into(),
            location,
            arguments,
            block: block.map(Box::new),
        }
    }

    pub fn with_block(&self) -> bool {
        self.block.is_some()
    }

    /// `&:sym` shorthand passed as the block.
    pub fn block_symbol(&self) -> Option<&SmolStr> {
        match self.block.as_deref()?.links.as_slice() {
            [Link::BlockSymbol(name)] => Some(name),
            _ => None,
        }
    }
}

impl Link {
    pub fn call(word: impl Into<SmolStr>) -> Link {
        Link::Call(Call::new(word, None, Vec::new(), None))
    }

    pub fn word(&self) -> Option<&SmolStr> {
        match self {
            Link::Constant(name) | Link::BlockSymbol(name) => Some(name),
            Link::Call(call) => Some(&call.word),
            Link::Variable { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl Chain {
    pub fn new(links: Vec<Link>) -> Self {
        Self {
            links,
            location: None,
            nullable: false,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn constant(name: impl Into<SmolStr>) -> Self {
        Self::new(vec![Link::Constant(name.into())])
    }

    pub fn literal(ty: ComplexType) -> Self {
        Self::new(vec![Link::Literal(ty)])
    }

    /// A bare word, e.g. a local variable reference.
    pub fn word(word: impl Into<SmolStr>) -> Self {
        Self::new(vec![Link::call(word)])
    }

    pub fn then(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn last(&self) -> Option<&Link> {
        self.links.last()
    }

    /// Every link but the last.
    pub fn base(&self) -> Chain {
        let end = self.links.len().saturating_sub(1);
        Chain {
            links: self.links[..end].to_vec(),
            location: self.location.clone(),
            nullable: self.nullable,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// A bare constant reference (`Foo::Bar`).
    pub fn is_constant(&self) -> bool {
        matches!(self.links.as_slice(), [Link::Constant(_)])
    }

    pub fn is_undefined(&self) -> bool {
        self.links.is_empty() || self.links.iter().any(|l| matches!(l, Link::Undefined))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Constant(name) if name.is_empty() => write!(f, "<root>"),
            Link::Constant(name) => write!(f, "{name}"),
            Link::Call(call) => {
                write!(f, "{}", call.word)?;
                if !call.arguments.is_empty() {
                    let args: Vec<String> = call.arguments.iter().map(ToString::to_string).collect();
                    write!(f, "({})", args.join(", "))?;
                }
                if let Some(block) = &call.block {
                    write!(f, " {{ {block} }}")?;
                }
                Ok(())
            }
            Link::Array(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Link::Hash(entries) => {
                let entries: Vec<String> =
                    entries.iter().map(|(k, v)| format!("{k} => {v}")).collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Link::Literal(ty) => write!(f, "<{ty}>"),
            Link::BlockSymbol(name) => write!(f, "&:{name}"),
            Link::SelfRef => write!(f, "self"),
            Link::Variable { name, .. } => write!(f, "{name}"),
            Link::Undefined => write!(f, "<undefined>"),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.nullable { "&." } else { "." };
        let links: Vec<String> = self.links.iter().map(ToString::to_string).collect();
        write!(f, "{}", links.join(sep))
    }
}
