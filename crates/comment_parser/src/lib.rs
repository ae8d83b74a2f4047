mod collect;

#[cfg(test)]
mod tests;

use lang_ty::ComplexType;
use pest_derive::Parser;
use smol_str::SmolStr;

pub use collect::{collect_docstring, parse_tag_line, TagLine};

#[derive(Parser)]
#[grammar = "comment.pest"]
pub struct CommentParser;

// box the error since rust warning about error type being too big
type ParseError = Box<pest::error::Error<Rule>>;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("not a tag line: `{0}`")]
    NotATag(String),
    #[error(transparent)]
    Grammar(#[from] ParseError),
}

/// Tags whose first word is the name of a parameter.
pub const NAMED_TAGS: &[&str] = &["param", "yieldparam", "option"];

/// `@return [String] the name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: SmolStr,
    pub param: Option<SmolStr>,
    /// Raw text between the brackets.
    pub types: Option<String>,
    pub text: String,
}

impl Tag {
    /// Declared types of the tag, `undefined` when there are none or they
    /// do not parse.
    pub fn complex_type(&self) -> ComplexType {
        match &self.types {
            Some(types) => ComplexType::parse(types),
            None => ComplexType::undefined(),
        }
    }
}

/// `@!macro [attach] name` followed by an indented body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: SmolStr,
    pub types: Option<String>,
    pub text: String,
    pub body: String,
}

impl Directive {
    pub fn is_macro(&self) -> bool {
        self.name == "macro"
    }

    /// First word after the directive, e.g. the macro name.
    pub fn label(&self) -> Option<&str> {
        self.text.split_whitespace().next()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Docstring {
    pub description: String,
    pub tags: Vec<Tag>,
    pub directives: Vec<Directive>,
}

impl Docstring {
    pub fn parse(text: &str) -> Docstring {
        collect_docstring(text)
    }

    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name == name)
    }

    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |tag| tag.name == name)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tag(name).is_some()
    }

    /// Union of every `@return` tag's types.
    pub fn return_type(&self) -> ComplexType {
        ComplexType::union_all(self.tags_named("return").map(Tag::complex_type))
    }

    pub fn param_type(&self, param: &str) -> ComplexType {
        self.tags_named("param")
            .find(|tag| tag.param.as_deref() == Some(param))
            .map(Tag::complex_type)
            .unwrap_or_default()
    }

    pub fn macros(&self) -> impl Iterator<Item = &Directive> {
        self.directives.iter().filter(|d| d.is_macro())
    }
}
