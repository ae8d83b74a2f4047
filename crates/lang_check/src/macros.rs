// ==============================================================================
// Macro Return Types
// ==============================================================================
//
// Documentation macros are return-type templates: `$1`, `$2`, ... are replaced
// by the namespaces of the call's argument types and the result is read back
// as a docstring. A pin's own macro bodies are tried first, then the named
// macros it refers to.

use comment_parser::Docstring;
use lang_pin::Pin;
use lang_ty::ComplexType;

use crate::Resolver;

impl Resolver<'_> {
    pub(crate) fn macro_return_type(&self, pin: &Pin, arg_types: &[ComplexType]) -> ComplexType {
        for directive in pin.macros() {
            let ty = expand_macro(&directive.body, arg_types);
            if ty.is_defined() {
                return ty;
            }
        }
        for name in pin.macro_references() {
            let Some(directive) = self.store.named_macro(name) else {
                log::debug!("{} refers to unknown macro `{name}`", pin.path());
                continue;
            };
            let ty = expand_macro(&directive.body, arg_types);
            if ty.is_defined() {
                return ty;
            }
        }
        ComplexType::undefined()
    }
}

pub(crate) fn expand_macro(body: &str, arg_types: &[ComplexType]) -> ComplexType {
    let mut text = body.to_owned();
    // highest index first so `$1` never eats the prefix of `$10`
    for (idx, arg) in arg_types.iter().enumerate().rev() {
        text = text.replace(&format!("${}", idx + 1), &arg.namespace());
    }
    Docstring::parse(&text).return_type()
}
