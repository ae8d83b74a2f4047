use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indoc::indoc;
use lang_pin::{generic, NamespaceKind, Pin, PinRef, ReferenceKind, Signature};
use lang_ty::{ComplexType, Scope, UniqueType};
use proptest::prelude::*;
use smol_str::SmolStr;

use crate::{SnapshotCache, Store};

fn ty(text: &str) -> ComplexType {
    ComplexType::parse(text)
}

fn class(name: &str, closure: &PinRef) -> PinRef {
    Pin::new_namespace(name, Some(closure), NamespaceKind::Class).into_ref()
}

fn module(name: &str, closure: &PinRef) -> PinRef {
    Pin::new_namespace(name, Some(closure), NamespaceKind::Module).into_ref()
}

fn method(name: &str, closure: &PinRef, returns: &str) -> PinRef {
    Pin::method(
        name,
        closure,
        Scope::Instance,
        vec![Signature::returning(ty(returns))],
    )
    .into_ref()
}

fn reference(kind: ReferenceKind, name: &str, closure: &PinRef) -> PinRef {
    Pin::reference(kind, name, closure, vec![]).into_ref()
}

fn paths(pins: &[PinRef]) -> Vec<&str> {
    pins.iter().map(|p| p.path().as_str()).collect()
}

fn gates(list: &[&str]) -> Vec<SmolStr> {
    list.iter().map(|g| SmolStr::new(g)).collect()
}

// ==============================================================================
// Groups
// ==============================================================================

#[test]
fn update_replaces_only_its_group() {
    let root = Pin::root();
    let foo = class("Foo", &root);
    let bar = class("Bar", &root);
    let mut store = Store::new();
    store.update("a.rb", vec![foo.clone()]);
    store.update("b.rb", vec![bar.clone()]);

    store.update("a.rb", vec![class("Baz", &root)]);
    assert!(store.path_pins("Foo").is_empty());
    assert_eq!(store.path_pins("Bar"), vec![bar]);
    assert_eq!(store.path_pins("Baz").len(), 1);
    assert_eq!(store.group_keys().collect::<Vec<_>>(), ["a.rb", "b.rb"]);

    assert!(store.remove("b.rb"));
    assert!(!store.remove("b.rb"));
    assert!(store.path_pins("Bar").is_empty());
    assert_eq!(store.pin_count(), 1);
}

#[test]
fn path_pins_keep_group_order_across_updates() {
    let root = Pin::root();
    let in_a = class("Shared", &root);
    let in_b = method("x", &root, "Integer");
    let shared_b = Pin::new_namespace("Shared", Some(&root), NamespaceKind::Class)
        .with_comments("second")
        .into_ref();

    let mut store = Store::new();
    store.update("a.rb", vec![in_a]);
    store.update("b.rb", vec![shared_b, in_b]);
    assert_eq!(store.path_pins("Shared")[0].comments, "");

    // re-updating the first group keeps it ahead of the second
    let replaced = Pin::new_namespace("Shared", Some(&root), NamespaceKind::Class)
        .with_comments("first")
        .into_ref();
    store.update("a.rb", vec![replaced]);
    let shared = store.path_pins("Shared");
    assert_eq!(shared.len(), 2);
    assert_eq!(shared[0].comments, "first");
    assert_eq!(shared[1].comments, "second");
}

fn group_pins(prefix: &str, names: &[String]) -> Vec<PinRef> {
    let root = Pin::root();
    names
        .iter()
        .flat_map(|name| {
            let ns = class(&format!("{prefix}{name}"), &root);
            let meth = method("call", &ns, "String");
            [ns, meth]
        })
        .collect()
}

proptest! {
    #[test]
    fn disjoint_groups_commute(
        a in prop::collection::btree_set("[A-Z][a-z]{0,4}", 1..6),
        b in prop::collection::btree_set("[A-Z][a-z]{0,4}", 1..6),
    ) {
        let a: Vec<String> = a.into_iter().collect();
        let b: Vec<String> = b.into_iter().collect();
        let pins_a = group_pins("A", &a);
        let pins_b = group_pins("B", &b);

        let mut ab = Store::new();
        ab.update("a", pins_a.clone());
        ab.update("b", pins_b.clone());
        let mut ba = Store::new();
        ba.update("b", pins_b.clone());
        ba.update("a", pins_a.clone());

        for pin in pins_a.iter().chain(&pins_b) {
            prop_assert_eq!(ab.path_pins(pin.path()), ba.path_pins(pin.path()));
        }
        prop_assert_eq!(ab.pin_count(), ba.pin_count());
    }
}

// ==============================================================================
// Constants
// ==============================================================================

fn mixin_store() -> Store {
    // module Foo
    //   module Bar; Baz = 1; end
    //   class Quuz; include Bar; end
    // end
    let root = Pin::root();
    let foo = module("Foo", &root);
    let bar = module("Bar", &foo);
    let baz = Pin::constant("Baz", &bar, Some(ty("Integer"))).into_ref();
    let quuz = class("Quuz", &foo);
    let include = reference(ReferenceKind::Include, "Bar", &quuz);
    Store::from_groups([("foo.rb".into(), vec![foo, bar, baz, quuz, include])])
}

#[test]
fn constant_through_included_module() {
    let store = mixin_store();
    assert_eq!(
        store.resolve_constant("Baz", &gates(&["Foo::Quuz", "Foo", ""])),
        Some("Foo::Bar::Baz".into())
    );
    // cached result stays the same
    assert_eq!(
        store.resolve_constant("Baz", &gates(&["Foo::Quuz", "Foo", ""])),
        Some("Foo::Bar::Baz".into())
    );
    assert_eq!(store.resolve_constant("Baz", &gates(&["Foo", ""])), None);
}

#[test]
fn nested_and_absolute_constants() {
    let store = mixin_store();
    let inner = gates(&["Foo::Quuz", "Foo", ""]);
    assert_eq!(store.resolve_constant("Bar::Baz", &inner), Some("Foo::Bar::Baz".into()));
    assert_eq!(store.resolve_constant("Foo::Quuz", &inner), Some("Foo::Quuz".into()));
    assert_eq!(store.resolve_constant("::Bar", &inner), None);
    assert_eq!(store.resolve_constant("::Foo::Bar", &inner), Some("Foo::Bar".into()));
    assert_eq!(store.resolve_constant("Missing", &inner), None);
}

#[test]
fn dereference_and_collect_constants() {
    let store = mixin_store();
    let include = store.references("Foo::Quuz", ReferenceKind::Include);
    assert_eq!(store.dereference(&include[0]), Some("Foo::Bar".into()));

    let root = Pin::root();
    let quuz = class("Foo::Quuz", &root);
    let max = Pin::constant("MAX", &quuz, Some(ty("Integer"))).into_ref();
    let mut store = store;
    store.update("quuz.rb", vec![quuz, max]);
    assert_eq!(
        paths(&store.collect_constants("Foo::Quuz")),
        ["Foo::Quuz::MAX", "Foo::Bar::Baz"]
    );
    assert_eq!(paths(&store.collect_constants("Foo")), ["Foo::Bar", "Foo::Quuz"]);
}

#[test]
fn mixin_constants_follow_declaration_order() {
    // module Helpers; module Config; class Host; extend Helpers; include Config; end
    let root = Pin::root();
    let helpers = module("Helpers", &root);
    let config = module("Config", &root);
    let host = class("Host", &root);
    let store = Store::from_groups([(
        SmolStr::new("host.rb"),
        vec![
            root.clone(),
            helpers.clone(),
            Pin::constant("HELP", &helpers, Some(ty("String"))).into_ref(),
            config.clone(),
            Pin::constant("SETTING", &config, Some(ty("Integer"))).into_ref(),
            host.clone(),
            reference(ReferenceKind::Extend, "Helpers", &host),
            reference(ReferenceKind::Include, "Config", &host),
            Pin::constant("OWN", &host, Some(ty("Symbol"))).into_ref(),
        ],
    )]);
    assert_eq!(
        paths(&store.collect_constants("Host")),
        ["Host::OWN", "Helpers::HELP", "Config::SETTING"]
    );
}

#[test]
fn superclass_is_not_resolved_inside_itself() {
    // class Foo::Error < Error; end
    let root = Pin::root();
    let error = class("Error", &root);
    let foo = module("Foo", &root);
    let foo_error = class("Foo::Error", &root);
    let sup = reference(ReferenceKind::Superclass, "Error", &foo_error);
    let store = Store::from_groups([("a.rb".into(), vec![error, foo, foo_error, sup.clone()])]);
    assert_eq!(store.dereference(&sup), Some("Error".into()));
    assert_eq!(
        store
            .ancestors("Foo::Error", Scope::Instance)
            .iter()
            .map(|f| f.path.as_str())
            .collect::<Vec<_>>(),
        ["Foo::Error", "Error", "Object", "BasicObject"]
    );
}

// ==============================================================================
// Ancestry
// ==============================================================================

#[test]
fn own_method_precedes_included() {
    // module M; def x; end; end
    // class Bar; include M; def x; end; end
    let root = Pin::root();
    let m = module("M", &root);
    let m_x = method("x", &m, "String");
    let bar = class("Bar", &root);
    let include = reference(ReferenceKind::Include, "M", &bar);
    let bar_x = method("x", &bar, "Integer");
    let store = Store::from_groups([("a.rb".into(), vec![m, m_x, bar, include, bar_x])]);

    let stack = store.method_stack(&UniqueType::named("Bar"), "x");
    assert_eq!(paths(&stack), ["Bar#x", "M#x"]);
    assert_eq!(paths(&store.ancestry_stack("Bar")), ["Bar", "M"]);
    assert_eq!(paths(&store.methods_visible("Bar", Scope::Instance)), ["Bar#x"]);
}

#[test]
fn prepends_come_first() {
    let root = Pin::root();
    let first = module("First", &root);
    let second = module("Second", &root);
    let inc = module("Inc", &root);
    let foo = class("Foo", &root);
    let store = Store::from_groups([(
        "a.rb".into(),
        vec![
            first,
            second,
            inc,
            foo.clone(),
            reference(ReferenceKind::Prepend, "First", &foo),
            reference(ReferenceKind::Prepend, "Second", &foo),
            reference(ReferenceKind::Include, "Inc", &foo),
        ],
    )]);
    let order: Vec<_> = store
        .ancestors("Foo", Scope::Instance)
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert_eq!(order, ["Second", "First", "Foo", "Inc", "Object", "BasicObject"]);
}

#[test]
fn class_scope_uses_extends_then_metaclass() {
    let root = Pin::root();
    let m = module("M", &root);
    let foo = class("Foo", &root);
    let extend = reference(ReferenceKind::Extend, "M", &foo);
    let store = Store::from_groups([("a.rb".into(), vec![m, foo, extend])]);
    let frames: Vec<_> = store
        .ancestors("Foo", Scope::Class)
        .into_iter()
        .map(|f| (f.path.to_string(), f.scope))
        .collect();
    assert_eq!(
        frames,
        [
            ("Foo".to_string(), Scope::Class),
            ("M".to_string(), Scope::Instance),
            ("Object".to_string(), Scope::Class),
            ("BasicObject".to_string(), Scope::Class),
            ("Class".to_string(), Scope::Instance),
            ("Module".to_string(), Scope::Instance),
            ("Object".to_string(), Scope::Instance),
            ("BasicObject".to_string(), Scope::Instance),
        ]
    );
}

#[test]
fn booleans_and_cycles() {
    let root = Pin::root();
    let a = class("A", &root);
    let b = class("B", &root);
    let store = Store::from_groups([(
        "cycle.rb".into(),
        vec![
            a.clone(),
            b.clone(),
            reference(ReferenceKind::Superclass, "B", &a),
            reference(ReferenceKind::Superclass, "A", &b),
        ],
    )]);
    let order: Vec<_> = store
        .ancestors("A", Scope::Instance)
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert_eq!(order, ["A", "B"]);
    assert!(store.is_super_and_sub("Boolean", "TrueClass"));
    assert!(store.is_super_and_sub("Object", "FalseClass"));
    assert!(!store.is_super_and_sub("Integer", "String"));
}

#[test]
fn dangling_reference_is_skipped() {
    let root = Pin::root();
    let foo = class("Foo", &root);
    let store = Store::from_groups([(
        "a.rb".into(),
        vec![foo.clone(), reference(ReferenceKind::Include, "Nowhere", &foo)],
    )]);
    let order: Vec<_> = store
        .ancestors("Foo", Scope::Instance)
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert_eq!(order, ["Foo", "Object", "BasicObject"]);
}

#[test]
fn namespace_generics_bind_from_receiver() {
    // class Array[Elem]; include Enumerable[Elem]; def first: () -> Elem
    // module Enumerable[T]; def to_a: () -> Array<T>
    let root = Pin::root();
    let enumerable = Pin::new_namespace("Enumerable", Some(&root), NamespaceKind::Module)
        .with_generics(vec!["T".into()])
        .into_ref();
    let to_a = Pin::method(
        "to_a",
        &enumerable,
        Scope::Instance,
        vec![Signature::returning(ty("Array<generic<T>>"))],
    )
    .into_ref();
    let array = Pin::new_namespace("Array", Some(&root), NamespaceKind::Class)
        .with_generics(vec!["Elem".into()])
        .into_ref();
    let include =
        Pin::reference(ReferenceKind::Include, "Enumerable", &array, vec![generic("Elem")]).into_ref();
    let first = Pin::method(
        "first",
        &array,
        Scope::Instance,
        vec![Signature::returning(generic("Elem"))],
    )
    .into_ref();
    let store = Store::from_groups([(
        "core".into(),
        vec![enumerable, to_a, array, include, first],
    )]);

    let receiver = ty("Array<String>").first().clone();
    let first = store.method_stack(&receiver, "first");
    assert_eq!(first[0].return_type(), &ty("String"));
    let to_a = store.method_stack(&receiver, "to_a");
    assert_eq!(to_a[0].return_type(), &ty("Array<String>"));

    // the stored pin keeps its placeholder
    assert!(store.path_pins("Array#first")[0].return_type().is_generic());
}

#[test]
fn override_replaces_return_type() {
    let root = Pin::root();
    let foo = class("Foo", &root);
    let bar = method("bar", &foo, "String");
    let over =
        Pin::reference(ReferenceKind::Override, "Foo#bar", &foo, vec![ty("Integer")]).into_ref();
    let store = Store::from_groups([
        ("foo.rb".into(), vec![foo, bar]),
        ("overrides".into(), vec![over]),
    ]);
    let stack = store.method_stack(&UniqueType::named("Foo"), "bar");
    assert_eq!(stack[0].return_type(), &ty("Integer"));
    assert_eq!(store.path_pins("Foo#bar")[0].return_type(), &ty("String"));
}

#[test]
fn named_macros_are_indexed() {
    let root = Pin::root();
    let foo = class("Foo", &root);
    let definer = Pin::method("property", &foo, Scope::Class, vec![])
        .with_comments(indoc! {"
            @!macro [attach] property
              @return [$1]
        "})
        .into_ref();
    let store = Store::from_groups([("foo.rb".into(), vec![foo, definer])]);
    let directive = store.named_macro("property");
    assert!(directive.is_some_and(|d| d.body.contains("@return [$1]")));
    assert!(store.named_macro("other").is_none());
}

// ==============================================================================
// Snapshots
// ==============================================================================

fn small_store(name: &str) -> Store {
    let root = Pin::root();
    Store::from_groups([("a.rb".into(), vec![class(name, &root)])])
}

#[test]
fn refresh_builds_once_per_checksum() {
    let cache: SnapshotCache<&str> = SnapshotCache::new();
    let builds = AtomicUsize::new(0);

    let snapshots: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    cache.refresh(&"ws", 1, || {
                        builds.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        small_store("Foo")
                    })
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(snapshots
        .windows(2)
        .all(|pair| Arc::ptr_eq(&pair[0].store, &pair[1].store)));
}

#[test]
fn readers_see_previous_snapshot_during_rebuild() {
    let cache: SnapshotCache<&str> = SnapshotCache::new();
    cache.refresh(&"ws", 1, || small_store("Old"));

    let next = cache.refresh(&"ws", 2, || {
        let during = cache.current(&"ws").unwrap();
        assert_eq!(during.checksum, 1);
        assert!(during.store.is_namespace("Old"));
        small_store("New")
    });
    assert_eq!(next.checksum, 2);
    assert!(cache.current(&"ws").unwrap().store.is_namespace("New"));

    assert!(cache.invalidate(&"ws"));
    assert!(cache.current(&"ws").is_none());
    assert!(cache.is_empty());
}
