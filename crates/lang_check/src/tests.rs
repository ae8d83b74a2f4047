use indoc::indoc;
use lang_pin::{
    generic, Call, Chain, Link, Location, NamespaceKind, Node, ParamDecl, Parameter, Pin, PinRef,
    Position, Range, ReferenceKind, Signature, VariableKind,
};
use lang_store::Store;
use lang_ty::{ComplexType, Scope};
use proptest::prelude::*;
use smol_str::SmolStr;

use crate::{
    check_chain, edit_distance, suggest_similar, visible_pins, FlowSensitiveTyping, ProblemKind,
    Resolver, ResolverConfig,
};

fn ty(text: &str) -> ComplexType {
    ComplexType::parse(text)
}

fn class(name: &str, closure: &PinRef) -> PinRef {
    Pin::new_namespace(name, Some(closure), NamespaceKind::Class).into_ref()
}

fn sig(params: Vec<Parameter>, returns: &str) -> Signature {
    Signature::new(Vec::new(), params, ty(returns), None)
}

fn req(name: &str, declared: &str) -> Parameter {
    Parameter::new(name, ParamDecl::Req, ty(declared))
}

fn method(name: &str, closure: &PinRef, signatures: Vec<Signature>) -> PinRef {
    Pin::method(name, closure, Scope::Instance, signatures).into_ref()
}

fn call(word: &str, arguments: Vec<Chain>) -> Link {
    Link::Call(Call::new(word, None, arguments, None))
}

fn call_with_block(word: &str, body: Chain) -> Link {
    Link::Call(Call::new(word, None, Vec::new(), Some(body)))
}

fn lit(text: &str) -> Chain {
    Chain::literal(ty(text))
}

fn at(line: u32, character: u32) -> Location {
    Location::new("a.rb", Range::from_to(line, character, line, character + 3))
}

/// A small core library plus a user class:
///
/// ```text
/// class Object;  def identity[T](x: T) -> T; def pair(a, b = nil); def takes_int(n: Integer) ...
///                def fetch(n: Integer) -> undefined | def fetch(n: Integer) -> String
/// class Array[Elem]; def first; def map[U] { |e| -> U } -> Array<U>; def each { |e| }
/// class Integer; def to_s -> String; def +(Integer) -> Integer
/// class String;  def upcase -> String
/// class Class;   def new -> self
/// class Foo;     @name: String; def greet -> String
/// ```
struct Fixture {
    store: Store,
    object: PinRef,
    foo: PinRef,
    main: PinRef,
}

impl Fixture {
    fn new() -> Self {
        Self::build(true)
    }

    fn without_class_new() -> Self {
        Self::build(false)
    }

    fn build(with_class_new: bool) -> Self {
        let root = Pin::root();
        let object = class("Object", &root);
        let main = Pin::method("main", &object, Scope::Instance, vec![])
            .with_location(Location::new("a.rb", Range::from_to(0, 0, 20, 3)))
            .into_ref();

        let identity = Pin::method(
            "identity",
            &object,
            Scope::Instance,
            vec![Signature::new(
                vec!["T".into()],
                vec![Parameter::new("x", ParamDecl::Req, generic("T"))],
                generic("T"),
                None,
            )],
        )
        .into_ref();
        let pair = method(
            "pair",
            &object,
            vec![sig(
                vec![
                    req("a", "Integer"),
                    Parameter::new("b", ParamDecl::Opt, ty("Integer")),
                ],
                "Integer",
            )],
        );
        let takes_int = method("takes_int", &object, vec![sig(vec![req("n", "Integer")], "Symbol")]);
        let value = method("value", &object, vec![sig(vec![], "Integer")]);
        let fetch = method(
            "fetch",
            &object,
            vec![
                sig(vec![req("n", "Integer")], "undefined"),
                sig(vec![req("n", "Integer")], "String"),
            ],
        );
        let each_item = method(
            "each_item",
            &object,
            vec![Signature::new(
                Vec::new(),
                Vec::new(),
                ty("void"),
                Some(sig(vec![req("item", "Integer")], "String")),
            )],
        );
        let build = Pin::method("build", &object, Scope::Instance, vec![])
            .with_comments(indoc! {"
                @!macro [new] builder
                  @return [$1]
            "})
            .into_ref();
        let make = Pin::method("make", &object, Scope::Instance, vec![])
            .with_comments("@!macro builder")
            .into_ref();

        let array = Pin::new_namespace("Array", Some(&root), NamespaceKind::Class)
            .with_generics(vec!["Elem".into()])
            .into_ref();
        let first = method("first", &array, vec![Signature::returning(generic("Elem"))]);
        let map = method(
            "map",
            &array,
            vec![Signature::new(
                vec!["U".into()],
                Vec::new(),
                ty("Array<generic<U>>"),
                Some(Signature::new(
                    Vec::new(),
                    vec![Parameter::new("e", ParamDecl::Req, generic("Elem"))],
                    generic("U"),
                    None,
                )),
            )],
        );
        let each = method(
            "each",
            &array,
            vec![Signature::new(
                Vec::new(),
                Vec::new(),
                ty("self"),
                Some(Signature::new(
                    Vec::new(),
                    vec![Parameter::new("e", ParamDecl::Req, generic("Elem"))],
                    ty("void"),
                    None,
                )),
            )],
        );

        let integer = class("Integer", &root);
        let to_s = method("to_s", &integer, vec![sig(vec![], "String")]);
        let plus = method("+", &integer, vec![sig(vec![req("other", "Integer")], "Integer")]);
        let string = class("String", &root);
        let upcase = method("upcase", &string, vec![sig(vec![], "String")]);
        let symbol = class("Symbol", &root);
        let proc_class = class("Proc", &root);
        let class_class = class("Class", &root);
        let class_new = method("new", &class_class, vec![sig(vec![], "self")]);

        let foo = class("Foo", &root);
        let name = Pin::variable(VariableKind::Instance, "@name", &foo, Some(ty("String"))).into_ref();
        let greet = method("greet", &foo, vec![sig(vec![], "String")]);
        let bar = class("Bar", &foo);

        let mut core = vec![
            root.clone(),
            object.clone(),
            identity,
            pair,
            takes_int,
            value,
            fetch,
            each_item,
            build,
            make,
            array,
            first,
            map,
            each,
            integer,
            to_s,
            plus,
            string,
            upcase,
            symbol,
            proc_class,
            class_class,
        ];
        if with_class_new {
            core.push(class_new);
        }
        let user = vec![foo.clone(), name, greet, bar];
        let store = Store::from_groups([("core".into(), core), ("foo.rb".into(), user)]);
        Self {
            store,
            object,
            foo,
            main,
        }
    }

    fn infer(&self, chain: &Chain, name_pin: &PinRef, locals: &[PinRef]) -> ComplexType {
        let config = ResolverConfig::default();
        Resolver::new(&self.store, &config).infer(chain, name_pin, locals)
    }

    fn define(&self, chain: &Chain, name_pin: &PinRef, locals: &[PinRef]) -> Vec<PinRef> {
        let config = ResolverConfig::default();
        Resolver::new(&self.store, &config).define(chain, name_pin, locals)
    }

    fn problems(&self, chain: &Chain, name_pin: &PinRef) -> Vec<ProblemKind> {
        let config = ResolverConfig::default();
        let resolver = Resolver::new(&self.store, &config);
        check_chain(&resolver, chain, name_pin, &[])
            .into_iter()
            .map(|p| p.kind)
            .collect()
    }

    fn greet(&self) -> PinRef {
        self.store.path_pins("Foo#greet")[0].clone()
    }
}

// ==============================================================================
// Constants and variables
// ==============================================================================

#[test]
fn constants_resolve_from_gates() {
    let fx = Fixture::new();
    let greet = fx.greet();

    let bar = fx.define(&Chain::constant("Bar"), &greet, &[]);
    assert_eq!(bar.len(), 1);
    assert_eq!(bar[0].path(), "Foo::Bar");
    assert_eq!(fx.infer(&Chain::constant("Foo::Bar"), &fx.main, &[]), ty("Class<Foo::Bar>"));
    assert!(fx.define(&Chain::constant("Bar"), &fx.main, &[]).is_empty());

    let root = fx.define(&Chain::constant(""), &fx.main, &[]);
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].path(), "");
}

#[test]
fn instance_variables_and_self() {
    let fx = Fixture::new();
    let greet = fx.greet();
    let ivar = Chain::new(vec![Link::Variable {
        kind: VariableKind::Instance,
        name: "@name".into(),
    }]);
    assert_eq!(fx.infer(&ivar, &greet, &[]), ty("String"));

    let this = Chain::new(vec![Link::SelfRef]);
    assert_eq!(fx.infer(&this, &greet, &[]), ty("Foo"));
    let this_greet = Chain::new(vec![Link::SelfRef, call("greet", vec![])]);
    assert_eq!(fx.infer(&this_greet, &greet, &[]), ty("String"));
}

#[test]
fn local_shadows_method() {
    let fx = Fixture::new();
    assert_eq!(fx.infer(&Chain::word("value"), &fx.main, &[]), ty("Integer"));

    let local = Pin::local("value", &fx.main, Some(ty("String")), None).into_ref();
    assert_eq!(fx.infer(&Chain::word("value"), &fx.main, &[local]), ty("String"));
}

#[test]
fn locals_are_probed_through_assignments() {
    let fx = Fixture::new();
    let foo_new = Chain::constant("Foo").then(call("new", vec![]));
    let made = Pin::local("made", &fx.main, None, None)
        .with_assignment(foo_new)
        .into_ref();
    let greeting = Chain::word("made").then(call("greet", vec![]));
    assert_eq!(fx.infer(&greeting, &fx.main, &[made]), ty("String"));

    // `a = a` gives up instead of recursing forever
    let looped = Pin::local("a", &fx.main, None, None)
        .with_assignment(Chain::word("a"))
        .into_ref();
    assert!(fx.infer(&Chain::word("a"), &fx.main, &[looped]).is_undefined());
}

#[test]
fn safe_navigation_adds_nil() {
    let fx = Fixture::new();
    let maybe = Pin::local("s", &fx.main, Some(ty("String, nil")), None).into_ref();
    let chain = Chain::word("s").then(call("upcase", vec![])).nullable();
    assert_eq!(fx.infer(&chain, &fx.main, &[maybe]), ty("String, nil"));
}

#[test]
fn undefined_receiver_stops_the_chain() {
    let fx = Fixture::new();
    let chain = Chain::word("nothing_here").then(call("upcase", vec![]));
    assert!(fx.define(&chain, &fx.main, &[]).is_empty());
    assert!(fx.define(&Chain::new(vec![Link::Undefined]), &fx.main, &[]).is_empty());
}

// ==============================================================================
// Calls
// ==============================================================================

#[test]
fn generic_return_binds_from_argument() {
    let fx = Fixture::new();
    let chain = Chain::new(vec![call("identity", vec![lit("1")])]);
    assert_eq!(fx.infer(&chain, &fx.main, &[]), ty("Integer"));

    let selected = fx.define(&chain, &fx.main, &[]);
    assert_eq!(selected[0].signatures().len(), 1);
    assert_eq!(selected[0].signatures()[0].to_string(), "[T] (Integer x) -> Integer");
}

#[test]
fn unbound_generic_is_erased_but_pin_survives() {
    let fx = Fixture::new();
    let unknown = Chain::new(vec![Link::Undefined]);
    let chain = Chain::new(vec![call("identity", vec![unknown])]);
    let pins = fx.define(&chain, &fx.main, &[]);
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].path(), "Object#identity");
    assert!(pins[0].return_type().is_undefined());
    assert!(fx.infer(&chain, &fx.main, &[]).is_undefined());
}

#[test]
fn arity_gates_overloads() {
    let fx = Fixture::new();
    let with = |n: usize| Chain::new(vec![call("pair", vec![lit("1"); n])]);
    assert_eq!(fx.infer(&with(1), &fx.main, &[]), ty("Integer"));
    assert_eq!(fx.infer(&with(2), &fx.main, &[]), ty("Integer"));
    assert!(fx.infer(&with(0), &fx.main, &[]).is_undefined());
    assert!(fx.infer(&with(3), &fx.main, &[]).is_undefined());
}

#[test]
fn later_overload_answers_when_first_match_is_undefined() {
    let fx = Fixture::new();
    let chain = Chain::new(vec![call("fetch", vec![lit("1")])]);
    assert_eq!(fx.infer(&chain, &fx.main, &[]), ty("String"));

    let pins = fx.define(&chain, &fx.main, &[]);
    assert_eq!(pins.len(), 1);
    let signatures = pins[0].signatures();
    assert_eq!(signatures.len(), 1);
    assert_eq!(signatures[0].return_type, ty("String"));
}

#[test]
fn class_new_constructs_instance() {
    for fx in [Fixture::new(), Fixture::without_class_new()] {
        let chain = Chain::constant("Foo").then(call("new", vec![]));
        assert_eq!(fx.infer(&chain, &fx.main, &[]), ty("Foo"));
        let greeting = chain.then(call("greet", vec![]));
        assert_eq!(fx.infer(&greeting, &fx.main, &[]), ty("String"));
    }
}

#[test]
fn namespace_generics_flow_through_calls() {
    let fx = Fixture::new();
    let array = Chain::new(vec![Link::Array(vec![lit("1"), lit("2")])]);
    assert_eq!(fx.infer(&array.clone().then(call("first", vec![])), &fx.main, &[]), ty("Integer"));
    let each = call_with_block("each", Chain::new(vec![Link::Undefined]));
    assert_eq!(fx.infer(&array.clone().then(each), &fx.main, &[]), ty("Array<Integer>"));
    // `each` declares a block, so a call without one matches no overload
    assert!(fx.infer(&array.then(call("each", vec![])), &fx.main, &[]).is_undefined());
}

#[test]
fn block_symbol_drives_map() {
    let fx = Fixture::new();
    let to_s = Chain::new(vec![Link::BlockSymbol("to_s".into())]);
    let chain = Chain::new(vec![
        Link::Array(vec![lit("1"), lit("2")]),
        call("map", vec![to_s.clone()]),
    ]);
    assert_eq!(fx.infer(&chain, &fx.main, &[]), ty("Array<String>"));
    assert_eq!(fx.infer(&to_s, &fx.main, &[]), ty("Proc"));
}

#[test]
fn block_body_binds_generic() {
    let fx = Fixture::new();
    let body = lit("'x'").with_location(at(3, 4));
    let chain = Chain::new(vec![Link::Array(vec![lit("1")]), call_with_block("map", body)]);
    assert_eq!(fx.infer(&chain, &fx.main, &[]), ty("Array<String>"));
}

#[test]
fn block_parameters_come_from_receiver() {
    let fx = Fixture::new();
    let receiver = Chain::new(vec![
        Link::Array(vec![lit("1"), lit("2")]),
        call_with_block("each", Chain::new(vec![Link::Undefined])),
    ]);
    let block = Pin::block(&fx.main, Some(receiver)).into_ref();
    let x = Pin::parameter("x", &block, ParamDecl::Req, 0, None).into_ref();
    assert_eq!(fx.infer(&Chain::word("x"), &block, &[x]), ty("Integer"));
}

#[test]
fn super_skips_own_method() {
    let root = Pin::root();
    let base = class("Base", &root);
    let base_greet = method("greet", &base, vec![sig(vec![], "String")]);
    let child = class("Child", &root);
    let superclass = Pin::reference(ReferenceKind::Superclass, "Base", &child, vec![]).into_ref();
    let child_greet = Pin::method("greet", &child, Scope::Instance, vec![]).into_ref();
    let store = Store::from_groups([(
        "a.rb".into(),
        vec![base, base_greet, child, superclass, child_greet.clone()],
    )]);

    let config = ResolverConfig::default();
    let resolver = Resolver::new(&store, &config);
    let pins = resolver.define(&Chain::word("super"), &child_greet, &[]);
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].path(), "Base#greet");
    assert_eq!(resolver.infer(&Chain::word("super"), &child_greet, &[]), ty("String"));
}

#[test]
fn yield_uses_block_signature() {
    let fx = Fixture::new();
    let each_item = fx.store.path_pins("Object#each_item")[0].clone();
    assert_eq!(fx.infer(&Chain::word("yield"), &each_item, &[]), ty("String"));
    assert!(fx.define(&Chain::word("yield"), &fx.main, &[]).is_empty());
}

#[test]
fn macros_fill_in_return_types() {
    let fx = Fixture::new();
    let build = Chain::new(vec![call("build", vec![Chain::constant("Foo")])]);
    assert_eq!(fx.infer(&build, &fx.main, &[]), ty("Foo"));

    let make = Chain::new(vec![call("make", vec![lit("1")])]);
    assert_eq!(fx.infer(&make, &fx.main, &[]), ty("Integer"));
}

// ==============================================================================
// Literals
// ==============================================================================

#[test]
fn array_literals() {
    let fx = Fixture::new();
    let array = |items: Vec<Chain>| Chain::new(vec![Link::Array(items)]);
    assert_eq!(fx.infer(&array(vec![lit("1"), lit("2")]), &fx.main, &[]), ty("Array<Integer>"));
    assert_eq!(
        fx.infer(&array(vec![lit("1"), lit("'a'")]), &fx.main, &[]),
        ty("Array(Integer, String)")
    );
    assert_eq!(fx.infer(&array(vec![]), &fx.main, &[]), ty("Array"));
    let unknown = Chain::new(vec![Link::Undefined]);
    assert_eq!(fx.infer(&array(vec![lit("1"), unknown]), &fx.main, &[]), ty("Array"));
}

#[test]
fn hash_literals() {
    let fx = Fixture::new();
    let hash = Chain::new(vec![Link::Hash(vec![
        (lit(":a"), lit("1")),
        (lit(":b"), lit("'x'")),
    ])]);
    assert_eq!(fx.infer(&hash, &fx.main, &[]), ty("Hash{Symbol => Integer, String}"));
    assert_eq!(fx.infer(&Chain::new(vec![Link::Hash(vec![])]), &fx.main, &[]), ty("Hash"));
}

// ==============================================================================
// Flow-sensitive typing
// ==============================================================================

fn method_with_foo(fx: &Fixture) -> (PinRef, PinRef) {
    let run = Pin::method("run", &fx.object, Scope::Instance, vec![])
        .with_location(Location::new("a.rb", Range::from_to(0, 0, 10, 3)))
        .into_ref();
    let foo = Pin::local("foo", &run, Some(ty("String, nil")), Some(Range::from_to(0, 0, 10, 3)))
        .into_ref();
    (run, foo)
}

#[test]
fn nil_test_narrows_else_branch() {
    let fx = Fixture::new();
    let (run, foo) = method_with_foo(&fx);

    // if foo.nil?
    //   ...
    // else
    //   foo.bar
    // end
    let condition = Node::send(
        Node::local("foo", Range::from_to(1, 3, 1, 6)),
        "nil?",
        vec![],
        Range::from_to(1, 3, 1, 11),
    );
    let else_branch = Node::send(
        Node::local("foo", Range::from_to(4, 2, 4, 5)),
        "bar",
        vec![],
        Range::from_to(4, 2, 4, 9),
    );
    let node = Node::If {
        condition: Box::new(condition),
        then_branch: Some(Box::new(Node::Other {
            range: Range::from_to(2, 2, 2, 10),
        })),
        else_branch: Some(Box::new(else_branch)),
        range: Range::from_to(1, 0, 5, 3),
    };

    let mut locals = vec![foo.clone()];
    FlowSensitiveTyping::new(&mut locals, None).walk(&node);
    assert_eq!(locals.len(), 3);

    let in_else = visible_pins(&locals, "foo", &run, Some(Position::new(4, 2)));
    assert_eq!(in_else.len(), 1);
    assert!(in_else[0].is_certain());
    assert_eq!(in_else[0].return_type(), &ty("String"));

    let in_then = visible_pins(&locals, "foo", &run, Some(Position::new(2, 4)));
    assert_eq!(in_then[0].return_type(), &ty("nil"));

    let after = visible_pins(&locals, "foo", &run, Some(Position::new(7, 0)));
    assert_eq!(after, vec![foo]);

    let chain = Chain::word("foo").with_location(Location::new("a.rb", Range::from_to(4, 2, 4, 5)));
    assert_eq!(fx.infer(&chain, &run, &locals), ty("String"));
}

#[test]
fn break_extends_narrowing_to_rest_of_loop() {
    let fx = Fixture::new();
    let (run, foo) = method_with_foo(&fx);

    // while cond
    //   break if foo.nil?
    //   foo.upcase
    // end
    let test = Node::If {
        condition: Box::new(Node::send(
            Node::bare_word("foo", Range::from_to(2, 11, 2, 14)),
            "nil?",
            vec![],
            Range::from_to(2, 11, 2, 19),
        )),
        then_branch: Some(Box::new(Node::Break {
            range: Range::from_to(2, 2, 2, 7),
        })),
        else_branch: None,
        range: Range::from_to(2, 2, 2, 19),
    };
    let use_site = Node::Other {
        range: Range::from_to(3, 2, 3, 12),
    };
    let node = Node::Loop {
        condition: Some(Box::new(Node::Other {
            range: Range::from_to(1, 6, 1, 10),
        })),
        body: Box::new(Node::Begin {
            statements: vec![test, use_site],
            range: Range::from_to(2, 2, 3, 12),
        }),
        range: Range::from_to(1, 0, 4, 3),
    };

    let mut locals = vec![foo];
    FlowSensitiveTyping::new(&mut locals, None).walk(&node);

    let later = visible_pins(&locals, "foo", &run, Some(Position::new(3, 2)));
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].return_type(), &ty("String"));
}

#[test]
fn is_a_and_guarded_operands() {
    let fx = Fixture::new();
    let (run, foo) = method_with_foo(&fx);

    // foo.is_a?(String) && foo.upcase
    let node = Node::And {
        lhs: Box::new(Node::send(
            Node::local("foo", Range::from_to(1, 0, 1, 3)),
            "is_a?",
            vec![Node::constant("String", Range::from_to(1, 10, 1, 16))],
            Range::from_to(1, 0, 1, 17),
        )),
        rhs: Box::new(Node::send(
            Node::local("foo", Range::from_to(1, 21, 1, 24)),
            "upcase",
            vec![],
            Range::from_to(1, 21, 1, 31),
        )),
        range: Range::from_to(1, 0, 1, 31),
    };
    let mut locals = vec![foo.clone()];
    FlowSensitiveTyping::new(&mut locals, None).walk(&node);

    let inside = visible_pins(&locals, "foo", &run, Some(Position::new(1, 22)));
    assert_eq!(inside[0].return_type(), &ty("String"));
    let outside = visible_pins(&locals, "foo", &run, Some(Position::new(1, 1)));
    assert_eq!(outside, vec![foo]);
}

#[test]
fn untyped_locals_narrow_through_resolver() {
    let fx = Fixture::new();
    let run = Pin::method("run", &fx.object, Scope::Instance, vec![]).into_ref();
    let assigned = Chain::new(vec![call("identity", vec![lit("1")])]);
    let n = Pin::local("n", &run, None, Some(Range::from_to(0, 0, 9, 0)))
        .with_assignment(assigned)
        .into_ref();

    // unless n.nil? then ... end
    let node = Node::If {
        condition: Box::new(Node::Not {
            operand: Box::new(Node::send(
                Node::local("n", Range::from_to(1, 7, 1, 8)),
                "nil?",
                vec![],
                Range::from_to(1, 7, 1, 13),
            )),
            range: Range::from_to(1, 7, 1, 13),
        }),
        then_branch: Some(Box::new(Node::Other {
            range: Range::from_to(2, 2, 2, 8),
        })),
        else_branch: None,
        range: Range::from_to(1, 0, 3, 3),
    };

    let mut skipped = vec![n.clone()];
    FlowSensitiveTyping::new(&mut skipped, None).walk(&node);
    assert_eq!(skipped.len(), 1);

    let config = ResolverConfig::default();
    let resolver = Resolver::new(&fx.store, &config);
    let mut locals = vec![n];
    FlowSensitiveTyping::new(&mut locals, None)
        .with_resolver(&resolver)
        .walk(&node);
    let inside = visible_pins(&locals, "n", &run, Some(Position::new(2, 3)));
    assert_eq!(inside[0].return_type(), &ty("Integer"));
}

#[test]
fn visible_pins_prefers_own_closure() {
    let fx = Fixture::new();
    let (run, foo) = method_with_foo(&fx);
    let other = Pin::method("other", &fx.object, Scope::Instance, vec![]).into_ref();
    let elsewhere = Pin::local("foo", &other, Some(ty("Integer")), Some(Range::from_to(0, 0, 10, 3))).into_ref();

    let locals = vec![elsewhere.clone(), foo.clone()];
    assert_eq!(visible_pins(&locals, "foo", &run, Some(Position::new(1, 0))), vec![foo]);
    assert_eq!(
        visible_pins(&locals, "foo", &fx.main, Some(Position::new(1, 0))).len(),
        2
    );
    assert!(visible_pins(&locals, "bar", &run, None).is_empty());
}

// ==============================================================================
// Problems
// ==============================================================================

#[test]
fn unresolved_names_suggest_close_matches() {
    let fx = Fixture::new();
    let problems = fx.problems(&Chain::constant("Fooo"), &fx.main);
    assert_eq!(
        problems,
        vec![ProblemKind::UnresolvedConstant {
            name: "Fooo".into(),
            suggestion: Some("Foo".into()),
        }]
    );

    let chain = Chain::constant("Foo")
        .then(call("new", vec![]))
        .then(call("gret", vec![]));
    let problems = fx.problems(&chain, &fx.main);
    let [ProblemKind::UnresolvedMethod { word, suggestion, .. }] = problems.as_slice() else {
        panic!("expected one unresolved method, got {problems:?}");
    };
    assert_eq!(word, "gret");
    assert_eq!(suggestion.as_deref(), Some("greet"));
    assert_eq!(
        problems[0].to_string(),
        "undefined method `gret` for `Foo`, did you mean `greet`?"
    );
}

#[test]
fn arity_and_argument_problems() {
    let fx = Fixture::new();
    let too_many = Chain::new(vec![call("pair", vec![lit("1"); 3])]);
    assert_eq!(
        fx.problems(&too_many, &fx.main),
        vec![ProblemKind::ArityMismatch {
            word: "pair".into(),
            given: 3,
            expected: "1..2".into(),
        }]
    );

    let wrong = Chain::new(vec![call("takes_int", vec![lit("'s'")])]);
    let problems = fx.problems(&wrong, &fx.main);
    assert_eq!(problems.len(), 1);
    assert_eq!(
        problems[0].to_string(),
        "argument 1 to `takes_int` expected `Integer`, got `String`"
    );

    let fine = Chain::new(vec![call("takes_int", vec![lit("1")])]);
    assert!(fx.problems(&fine, &fx.main).is_empty());
    assert!(fx.problems(&Chain::word("super"), &fx.main).is_empty());
}

#[test]
fn suggestions_skip_exact_and_distant_names() {
    let names: Vec<SmolStr> = vec!["greet".into(), "great".into(), "zzzzzz".into()];
    assert_eq!(suggest_similar("gret", names.iter()), Some("greet".into()));
    assert_eq!(suggest_similar("greet", names.iter()), Some("great".into()));
    assert_eq!(suggest_similar("x", names.iter()), None);
}

#[test]
fn edit_distance_counts_char_edits() {
    assert_eq!(edit_distance("", "abc"), 3);
    assert_eq!(edit_distance("kitten", "sitting"), 3);
    assert_eq!(edit_distance("flaw", "lawn"), 2);
    assert_eq!(edit_distance("héllo", "hello"), 1);
}

#[test]
fn suggestion_tolerance_grows_with_length() {
    let names: Vec<SmolStr> = vec!["ab".into(), "to_s".into(), "inspect".into()];
    assert_eq!(suggest_similar("xy", names.iter()), None);
    assert_eq!(suggest_similar("xb", names.iter()), Some("ab".into()));
    assert_eq!(suggest_similar("tos", names.iter()), Some("to_s".into()));
    assert_eq!(suggest_similar("inspetc", names.iter()), Some("inspect".into()));
}

proptest! {
    #[test]
    fn edit_distance_is_a_metric(a in "[a-z]{0,8}", b in "[a-z]{0,8}") {
        prop_assert_eq!(edit_distance(&a, &b), edit_distance(&b, &a));
        prop_assert_eq!(edit_distance(&a, &a), 0);
        prop_assert!(edit_distance(&a, &b) <= a.len().max(b.len()));
    }
}
