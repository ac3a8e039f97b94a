use crate::error::Span;
use crate::lexer::TokenSpan;
use crate::scope::Function;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// Statements carry their bodies as unparsed token spans; a body is parsed
/// each time it runs, against the scope table opened for that run.
#[derive(Debug, Clone)]
pub enum Stmt {
    Expression {
        expr: Expr,
        span: Span,
    },
    Assign {
        name: String,
        value: Expr,
        span: Span,
    },
    /// Already bound in the scope table by the parser.
    Function {
        function: Rc<Function>,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Print {
        expr: Expr,
        span: Span,
    },
    If {
        condition: Expr,
        then_branch: TokenSpan,
        else_branch: Option<TokenSpan>,
        span: Span,
    },
    For {
        condition: Expr,
        body: TokenSpan,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Expression { span, .. } => span,
            Stmt::Assign { span, .. } => span,
            Stmt::Function { span, .. } => span,
            Stmt::Return { span, .. } => span,
            Stmt::Print { span, .. } => span,
            Stmt::If { span, .. } => span,
            Stmt::For { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal {
        value: Value,
        span: Span,
    },
    Variable {
        name: String,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },
    Grouping {
        expr: Box<Expr>,
        span: Span,
    },
    /// `{ ... }` used as a value: the first value returned inside it.
    Block {
        body: TokenSpan,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Literal { span, .. } => span,
            Expr::Variable { span, .. } => span,
            Expr::Binary { span, .. } => span,
            Expr::Unary { span, .. } => span,
            Expr::Call { span, .. } => span,
            Expr::Grouping { span, .. } => span,
            Expr::Block { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOp {
    /// Binding strength used by the precedence-climbing parser.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => 2,
            BinaryOp::Add | BinaryOp::Subtract => 3,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 4,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 2
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }
}

// Source-like rendering used by debug logging. Binary expressions are fully
// parenthesised so the output parses back to the same tree.

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Literal { value, .. } => match value {
                Value::String(s) if s.contains('"') => write!(f, "'{}'", s),
                Value::String(s) => write!(f, "\"{}\"", s),
                other => write!(f, "{}", other),
            },
            Expr::Variable { name, .. } => write!(f, "{}", name),
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator.symbol(), right),
            Expr::Unary {
                operator, operand, ..
            } => write!(f, "{}{}", operator.symbol(), operand),
            Expr::Call { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Grouping { expr, .. } => write!(f, "({})", expr),
            Expr::Block { body, .. } => write!(f, "{{ {} }}", body),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stmt::Expression { expr, .. } => write!(f, "{}", expr),
            Stmt::Assign { name, value, .. } => write!(f, "{} = {}", name, value),
            Stmt::Function { function, .. } => {
                write!(f, "fn {}({})", function.name, function.params.join(", "))?;
                if function.inline {
                    write!(f, " {}", function.body)
                } else {
                    write!(f, " {{ {} }}", function.body)
                }
            }
            Stmt::Return { value: Some(value), .. } => write!(f, "return {}", value),
            Stmt::Return { value: None, .. } => write!(f, "return"),
            Stmt::Print { expr, .. } => write!(f, "print {}", expr),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                write!(f, "if {} {{ {} }}", condition, then_branch)?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else {{ {} }}", else_branch)?;
                }
                Ok(())
            }
            Stmt::For { condition, body, .. } => write!(f, "for {} {{ {} }}", condition, body),
        }
    }
}
