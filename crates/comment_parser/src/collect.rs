use pest::Parser;
use smol_str::SmolStr;

use crate::{CollectError, CommentParser, Directive, Docstring, Rule, Tag, NAMED_TAGS};

/// One parsed `@tag` or `@!directive` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLine {
    pub directive: bool,
    pub name: SmolStr,
    pub leading_word: Option<SmolStr>,
    pub types: Option<String>,
    pub text: String,
}

pub fn parse_tag_line(line: &str) -> Result<TagLine, CollectError> {
    let line = line.trim();
    if !line.starts_with('@') {
        return Err(CollectError::NotATag(line.to_string()));
    }

    let pairs = CommentParser::parse(Rule::tag_line, line).map_err(Box::new)?;

    let mut tag = TagLine {
        directive: false,
        name: SmolStr::default(),
        leading_word: None,
        types: None,
        text: String::new(),
    };

    for pair in pairs.flat_map(|p| p.into_inner()) {
        match pair.as_rule() {
            Rule::directive_marker => tag.directive = true,
            Rule::tag_name => tag.name = pair.as_str().into(),
            Rule::leading_word => tag.leading_word = Some(pair.as_str().into()),
            Rule::types => {
                tag.types = pair
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::types_text)
                    .map(|p| p.as_str().trim().to_string());
            }
            Rule::text => tag.text = pair.as_str().trim().to_string(),
            _ => {}
        }
    }

    Ok(tag)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Split documentation text into description, tags and directives.
///
/// Lines indented deeper than a tag continue it: tag text is joined with a
/// space, directive bodies keep their lines (dedented).
pub fn collect_docstring(text: &str) -> Docstring {
    let mut doc = Docstring::default();
    let mut description = Vec::new();
    let lines: Vec<&str> = text.lines().collect();

    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        idx += 1;

        if !line.trim_start().starts_with('@') {
            description.push(line.trim());
            continue;
        }

        let parsed = match parse_tag_line(line) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::debug!("{err}");
                description.push(line.trim());
                continue;
            }
        };

        let indent = indent_of(line);
        let mut continuation = Vec::new();
        while idx < lines.len() {
            let next = lines[idx];
            if !next.trim().is_empty() && indent_of(next) <= indent {
                break;
            }
            continuation.push(next);
            idx += 1;
        }
        while continuation.last().is_some_and(|l| l.trim().is_empty()) {
            continuation.pop();
        }

        if parsed.directive {
            doc.directives.push(Directive {
                name: parsed.name,
                types: parsed.types,
                text: parsed.text,
                body: dedent(&continuation),
            });
        } else {
            doc.tags.push(into_tag(parsed, &continuation));
        }
    }

    doc.description = description.join("\n").trim().to_string();
    doc
}

fn into_tag(parsed: TagLine, continuation: &[&str]) -> Tag {
    let mut text = parsed.text;
    for line in continuation.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(line);
    }

    let mut param = parsed.leading_word;
    if param.is_none() && NAMED_TAGS.contains(&parsed.name.as_str()) {
        let (first, rest) = match text.split_once(char::is_whitespace) {
            Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
            None => (text.clone(), String::new()),
        };
        if !first.is_empty() {
            param = Some(first.into());
            text = rest;
        }
    }

    Tag {
        name: parsed.name,
        param,
        types: parsed.types,
        text,
    }
}

fn dedent(lines: &[&str]) -> String {
    let min = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| l.get(min..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}
