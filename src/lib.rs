// mint language interpreter library
//
// A small dynamically-typed scripting language. Source is lexed once; the
// parser pulls one statement at a time and resolves names against the live
// scope chain, and the evaluator re-parses block bodies from their stored
// token spans every time they run.

// Public modules
pub mod ast;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod runner;
pub mod scope;
pub mod value;

// Re-export commonly used items
pub use ast::{BinaryOp, Expr, Stmt, UnaryOp};
pub use error::{ErrorKind, MintError, Span};
pub use evaluator::{Evaluator, Runtime};
pub use lexer::{Lexer, Token, TokenSpan, TokenType};
pub use parser::Parser;
pub use scope::{Binding, Function, ScopeId, ScopeKind, Scopes, Variable};
pub use value::{Type, Value};

// Re-export main functions
pub use runner::{execute, run};
