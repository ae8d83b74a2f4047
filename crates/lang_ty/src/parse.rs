use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::{ComplexType, ParamKind, UniqueType};

#[derive(Parser)]
#[grammar = "tag.pest"]
struct TagParser;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type tag `{text}`: {message}")]
pub struct TypeParseError {
    pub text: String,
    pub message: String,
}

impl ComplexType {
    /// Parse a type tag, reporting why it failed.
    pub fn try_parse(text: &str) -> Result<ComplexType, TypeParseError> {
        let mut pairs = TagParser::parse(Rule::type_expr, text).map_err(|err| TypeParseError {
            text: text.to_string(),
            message: err.variant.message().into_owned(),
        })?;

        let list = pairs
            .next()
            .and_then(|expr| expr.into_inner().find(|p| p.as_rule() == Rule::type_list))
            .ok_or_else(|| TypeParseError {
                text: text.to_string(),
                message: "empty type expression".to_string(),
            })?;

        Ok(ComplexType::new(collect_members(list)))
    }

    /// Parse a type tag. Unparseable input is `undefined`.
    pub fn parse(text: &str) -> ComplexType {
        match ComplexType::try_parse(text) {
            Ok(ty) => ty,
            Err(err) => {
                log::debug!("{err}");
                ComplexType::undefined()
            }
        }
    }

    /// Union of several annotation strings, e.g. the types of one `@return` tag.
    pub fn parse_all<'a>(texts: impl IntoIterator<Item = &'a str>) -> ComplexType {
        ComplexType::union_all(texts.into_iter().map(ComplexType::parse))
    }
}

fn collect_members(list: Pair<Rule>) -> Vec<UniqueType> {
    list.into_inner()
        .filter(|pair| pair.as_rule() == Rule::member)
        .map(collect_member)
        .collect()
}

fn collect_params(params: Pair<Rule>) -> Vec<ComplexType> {
    params
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::param_list)
        .flat_map(collect_members)
        .map(ComplexType::from)
        .collect()
}

fn collect_member(member: Pair<Rule>) -> UniqueType {
    let mut rooted = false;
    let mut name = "";
    let mut kind = ParamKind::None;
    let mut key_types = Vec::new();
    let mut subtypes = Vec::new();

    for pair in member.into_inner() {
        match pair.as_rule() {
            Rule::root_marker => rooted = true,
            Rule::type_name => name = pair.as_str(),
            Rule::list_params => {
                kind = ParamKind::List;
                subtypes = collect_params(pair);
            }
            Rule::fixed_params => {
                kind = ParamKind::Fixed;
                subtypes = collect_params(pair);
            }
            Rule::hash_params => {
                kind = ParamKind::Hash;
                let mut lists = pair
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::param_list);
                if let Some(keys) = lists.next() {
                    key_types = collect_members(keys).into_iter().map(ComplexType::from).collect();
                }
                if let Some(values) = lists.next() {
                    subtypes = collect_members(values)
                        .into_iter()
                        .map(ComplexType::from)
                        .collect();
                }
            }
            _ => {}
        }
    }

    UniqueType::new(name, rooted, key_types, subtypes, kind)
}
