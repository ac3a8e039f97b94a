//! Lexical scope tables.
//!
//! Every table lives in a [`Scopes`] arena and points at its parent by
//! [`ScopeId`]. Tables are opened and discarded strictly last-in first-out,
//! so the arena behaves like a stack whose entries link back to any earlier
//! entry (a function's definition table is not necessarily its caller's).

use crate::lexer::TokenSpan;
use crate::value::{Type, Value};
use log::trace;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    /// Opened for each function call.
    Function,
    /// Opened for each `if` branch and each `for` iteration.
    Block,
    /// Opened for a `{ ... }` block expression.
    Inline,
}

impl ScopeKind {
    /// Frames catch `return`.
    pub fn is_frame(self) -> bool {
        matches!(self, ScopeKind::Function | ScopeKind::Inline)
    }

    /// Assignments never update variables outside a block expression.
    pub fn isolates_assignment(self) -> bool {
        self == ScopeKind::Inline
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub value: Value,
    pub ty: Type,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        let ty = value.ty();
        Self {
            name: name.into(),
            value,
            ty,
        }
    }

    /// Stores `value`, keeping the variable's type stable. An unresolved
    /// variable takes the type of the first value it receives; after that only
    /// `Int`/`Float` promotion is accepted. On mismatch the offending type is
    /// returned.
    pub fn assign(&mut self, value: Value) -> Result<(), Type> {
        let incoming = value.ty();
        match (self.ty, incoming) {
            (Type::Unresolved, _) => {
                self.ty = incoming;
                self.value = value;
            }
            (current, incoming) if current == incoming => self.value = value,
            (Type::Float, Type::Int) => self.value = value.promote(),
            (Type::Int, Type::Float) => {
                self.ty = Type::Float;
                self.value = value;
            }
            (_, incoming) => return Err(incoming),
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: TokenSpan,
    /// `fn f(x) x + 1`: the body is a single expression whose value is returned.
    pub inline: bool,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone)]
pub enum Binding {
    Variable(Variable),
    Function(Rc<Function>),
}

impl Binding {
    pub fn name(&self) -> &str {
        match self {
            Binding::Variable(variable) => &variable.name,
            Binding::Function(function) => &function.name,
        }
    }
}

#[derive(Debug)]
pub struct ScopeTable {
    bindings: Vec<Binding>,
    parent: Option<ScopeId>,
    kind: ScopeKind,
}

impl ScopeTable {
    fn new(parent: Option<ScopeId>, kind: ScopeKind) -> Self {
        Self {
            bindings: Vec::new(),
            parent,
            kind,
        }
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Newest binding named `name` in this table only.
    pub fn lookup_local(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().rev().find(|binding| binding.name() == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.bindings.iter().rposition(|binding| binding.name() == name)
    }

    pub fn declare(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }
}

#[derive(Debug)]
pub struct Scopes {
    tables: Vec<ScopeTable>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            tables: vec![ScopeTable::new(None, ScopeKind::Global)],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Number of live tables.
    pub fn depth(&self) -> usize {
        self.tables.len()
    }

    pub fn push(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.tables.len());
        trace!("open {:?} scope {} (parent {})", kind, id.0, parent.0);
        self.tables.push(ScopeTable::new(Some(parent), kind));
        id
    }

    /// Discards `id` and anything opened after it.
    pub fn pop(&mut self, id: ScopeId) {
        debug_assert!(id.0 > 0, "the global scope is never discarded");
        debug_assert_eq!(id.0 + 1, self.tables.len(), "scopes are closed in LIFO order");
        trace!("close scope {}", id.0);
        self.tables.truncate(id.0.max(1));
    }

    pub fn table(&self, id: ScopeId) -> &ScopeTable {
        &self.tables[id.0]
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.table(id).parent
    }

    pub fn declare(&mut self, id: ScopeId, binding: Binding) {
        self.tables[id.0].declare(binding);
    }

    /// `id` followed by each of its ancestors up to the global scope.
    pub fn chain(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), move |current| self.parent(*current))
    }

    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<&Binding> {
        self.chain(id)
            .find_map(|scope| self.table(scope).lookup_local(name))
    }

    /// Like [`Scopes::lookup`], restricted to functions, also returning the
    /// table that holds the definition.
    pub fn lookup_function(&self, id: ScopeId, name: &str) -> Option<(ScopeId, Rc<Function>)> {
        self.chain(id).find_map(|scope| match self.table(scope).lookup_local(name)? {
            Binding::Function(function) => Some((scope, Rc::clone(function))),
            Binding::Variable(_) => None,
        })
    }

    /// Whether a `return` in `id` has a frame to return from.
    pub fn in_frame(&self, id: ScopeId) -> bool {
        self.chain(id).any(|scope| self.table(scope).kind.is_frame())
    }

    /// The variable an assignment in `id` would update: the nearest binding
    /// named `name`, searching outward through `if`/`for` bodies and function
    /// calls (along the definition chain) but not past a block expression.
    /// A function binding found first hides outer variables.
    pub fn assignable(&mut self, id: ScopeId, name: &str) -> Option<&mut Variable> {
        let mut found = None;
        for scope in self.chain(id) {
            let table = self.table(scope);
            if let Some(index) = table.position(name) {
                found = Some((scope, index));
                break;
            }
            if table.kind.isolates_assignment() {
                break;
            }
        }

        let (scope, index) = found?;
        match &mut self.tables[scope.0].bindings[index] {
            Binding::Variable(variable) => Some(variable),
            Binding::Function(_) => None,
        }
    }
}
