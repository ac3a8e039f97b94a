// Tests for the scope table arena

use mint::{Binding, Function, Lexer, ScopeKind, Scopes, TokenSpan, Type, Value, Variable};
use std::rc::Rc;

fn int(name: &str, n: i64) -> Binding {
    Binding::Variable(Variable::new(name, Value::Int(n)))
}

fn function(name: &str, params: &[&str]) -> Binding {
    let tokens = Lexer::new("1").scan_tokens().unwrap();
    Binding::Function(Rc::new(Function {
        name: name.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
        body: TokenSpan::program(tokens),
        inline: true,
    }))
}

fn value_of(scopes: &Scopes, scope: mint::ScopeId, name: &str) -> Option<Value> {
    match scopes.lookup(scope, name)? {
        Binding::Variable(variable) => Some(variable.value.clone()),
        Binding::Function(_) => None,
    }
}

#[test]
fn lookup_prefers_newest_binding() {
    let mut scopes = Scopes::new();
    let root = scopes.root();
    scopes.declare(root, int("x", 1));
    scopes.declare(root, int("x", 2));

    assert_eq!(value_of(&scopes, root, "x"), Some(Value::Int(2)));
    assert_eq!(scopes.table(root).bindings().len(), 2);
}

#[test]
fn lookup_falls_back_to_parent() {
    let mut scopes = Scopes::new();
    let root = scopes.root();
    scopes.declare(root, int("x", 1));
    let child = scopes.push(root, ScopeKind::Block);

    assert_eq!(scopes.parent(child), Some(root));
    assert_eq!(scopes.parent(root), None);
    assert_eq!(value_of(&scopes, child, "x"), Some(Value::Int(1)));
    assert!(scopes.lookup(child, "y").is_none());
}

#[test]
fn child_binding_shadows_without_touching_parent() {
    let mut scopes = Scopes::new();
    let root = scopes.root();
    scopes.declare(root, int("x", 1));
    let child = scopes.push(root, ScopeKind::Function);
    scopes.declare(child, int("x", 2));

    assert_eq!(value_of(&scopes, child, "x"), Some(Value::Int(2)));
    assert_eq!(value_of(&scopes, root, "x"), Some(Value::Int(1)));

    scopes.pop(child);
    assert_eq!(scopes.depth(), 1);
    assert_eq!(value_of(&scopes, root, "x"), Some(Value::Int(1)));
}

#[test]
fn function_table_may_skip_callers() {
    let mut scopes = Scopes::new();
    let root = scopes.root();
    let caller = scopes.push(root, ScopeKind::Function);
    scopes.declare(caller, int("local", 1));
    let callee = scopes.push(root, ScopeKind::Function);

    assert!(scopes.lookup(callee, "local").is_none());
    scopes.pop(callee);
    scopes.pop(caller);
}

#[test]
fn lookup_function_reports_defining_table() {
    let mut scopes = Scopes::new();
    let root = scopes.root();
    scopes.declare(root, function("f", &["a"]));
    let block = scopes.push(root, ScopeKind::Block);
    scopes.declare(block, int("f", 0));

    // The variable hides the function from inside the block
    assert!(scopes.lookup_function(block, "f").is_none());

    let (home, f) = scopes.lookup_function(root, "f").unwrap();
    assert_eq!(home, root);
    assert_eq!(f.arity(), 1);
}

#[test]
fn return_needs_a_frame() {
    let mut scopes = Scopes::new();
    let root = scopes.root();
    assert!(!scopes.in_frame(root));

    let branch = scopes.push(root, ScopeKind::Block);
    assert!(!scopes.in_frame(branch));

    let call = scopes.push(branch, ScopeKind::Function);
    let body = scopes.push(call, ScopeKind::Block);
    assert!(scopes.in_frame(body));

    let inline = scopes.push(body, ScopeKind::Inline);
    assert!(scopes.in_frame(inline));
}

#[test]
fn assignment_reaches_through_blocks_and_calls() {
    let mut scopes = Scopes::new();
    let root = scopes.root();
    scopes.declare(root, int("x", 1));

    let branch = scopes.push(root, ScopeKind::Block);
    let call = scopes.push(root, ScopeKind::Function);
    let body = scopes.push(call, ScopeKind::Block);
    assert!(scopes.assignable(branch, "x").is_some());

    let variable = scopes.assignable(body, "x").unwrap();
    variable.value = Value::Int(2);
    assert_eq!(value_of(&scopes, root, "x"), Some(Value::Int(2)));

    // A parameter of the call is found before the outer variable
    scopes.declare(call, int("x", 5));
    let variable = scopes.assignable(body, "x").unwrap();
    variable.value = Value::Int(6);
    assert_eq!(value_of(&scopes, call, "x"), Some(Value::Int(6)));
    assert_eq!(value_of(&scopes, root, "x"), Some(Value::Int(2)));
}

#[test]
fn block_expression_stops_assignment() {
    let mut scopes = Scopes::new();
    let root = scopes.root();
    scopes.declare(root, int("x", 1));

    let inline = scopes.push(root, ScopeKind::Inline);
    assert!(scopes.assignable(inline, "x").is_none());

    let branch = scopes.push(inline, ScopeKind::Block);
    assert!(scopes.assignable(branch, "x").is_none());

    scopes.declare(inline, int("x", 3));
    assert!(scopes.assignable(branch, "x").is_some());
    assert_eq!(value_of(&scopes, root, "x"), Some(Value::Int(1)));
}

#[test]
fn functions_are_not_assignable() {
    let mut scopes = Scopes::new();
    let root = scopes.root();
    scopes.declare(root, int("f", 1));
    scopes.declare(root, function("f", &[]));
    assert!(scopes.assignable(root, "f").is_none());
}

#[test]
fn variable_type_resolves_on_first_value() {
    let mut variable = Variable::new("r", Value::Nil);
    assert_eq!(variable.ty, Type::Unresolved);

    variable.assign(Value::String("s".to_string())).unwrap();
    assert_eq!(variable.ty, Type::String);
    assert_eq!(variable.assign(Value::Int(1)), Err(Type::Int));
}

#[test]
fn variable_promotes_between_int_and_float() {
    let mut variable = Variable::new("n", Value::Int(1));
    variable.assign(Value::Float(1.5)).unwrap();
    assert_eq!(variable.ty, Type::Float);

    variable.assign(Value::Int(2)).unwrap();
    assert_eq!(variable.value, Value::Float(2.0));
    assert_eq!(variable.assign(Value::Bool(true)), Err(Type::Bool));
    assert_eq!(variable.value, Value::Float(2.0));
}
