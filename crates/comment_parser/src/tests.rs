use indoc::indoc;
use lang_ty::ComplexType;

use crate::{parse_tag_line, CollectError, Docstring};

#[test]
fn tag_line_parts() {
    let line = parse_tag_line("@return [String, nil] the name").expect("tag line");
    assert!(!line.directive);
    assert_eq!(line.name, "return");
    assert_eq!(line.types.as_deref(), Some("String, nil"));
    assert_eq!(line.text, "the name");
    assert_eq!(line.leading_word, None);

    let line = parse_tag_line("@param count [Integer]").expect("tag line");
    assert_eq!(line.leading_word.as_deref(), Some("count"));
    assert_eq!(line.types.as_deref(), Some("Integer"));

    let line = parse_tag_line("@!macro [attach] property").expect("directive line");
    assert!(line.directive);
    assert_eq!(line.name, "macro");
    assert_eq!(line.types.as_deref(), Some("attach"));
    assert_eq!(line.text, "property");
}

#[test]
fn not_a_tag() {
    assert!(matches!(
        parse_tag_line("plain text"),
        Err(CollectError::NotATag(_))
    ));
}

#[test]
fn duck_type_in_brackets() {
    let line = parse_tag_line("@param key [#[]] lookup").expect("tag line");
    assert_eq!(line.types.as_deref(), Some("#[]"));
}

#[test]
fn docstring_sections() {
    let doc = Docstring::parse(indoc! {"
        Finds a user.

        @param id [Integer] primary key
        @param [String] name display
          name, continued
        @return [User, nil]
    "});

    assert_eq!(doc.description, "Finds a user.");
    assert_eq!(doc.tags.len(), 3);
    assert_eq!(doc.param_type("id"), ComplexType::parse("Integer"));
    assert_eq!(doc.param_type("name"), ComplexType::parse("String"));

    let name = doc.tags_named("param").nth(1).expect("second param");
    assert_eq!(name.param.as_deref(), Some("name"));
    assert_eq!(name.text, "display name, continued");

    assert_eq!(doc.return_type(), ComplexType::parse("User, nil"));
    assert!(doc.param_type("missing").is_undefined());
}

#[test]
fn macro_directive_body() {
    let doc = Docstring::parse(indoc! {"
        @!macro [attach] property
          @return [$1]
        Defines a property.
    "});

    let directive = doc.macros().next().expect("macro directive");
    assert_eq!(directive.label(), Some("property"));
    assert_eq!(directive.body, "@return [$1]");
    assert_eq!(doc.description, "Defines a property.");

    let expanded = Docstring::parse(&directive.body.replace("$1", "String"));
    assert_eq!(expanded.return_type(), ComplexType::parse("String"));
}

#[test]
fn missing_return_is_undefined() {
    assert!(Docstring::parse("no tags here").return_type().is_undefined());
}
