use crate::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use crate::error::{MintError, Span};
use crate::lexer::TokenSpan;
use crate::parser::Parser;
use crate::scope::{Binding, ScopeKind, Scopes, Variable};
use crate::value::Value;
use log::{debug, trace};
use std::cmp::Ordering;
use std::io::Write;

/// State shared by every evaluator of one run: the scope arena and the sink
/// that `print` writes to.
pub struct Runtime<W: Write> {
    pub scopes: Scopes,
    out: W,
}

impl<W: Write> Runtime<W> {
    pub fn new(out: W) -> Self {
        Self {
            scopes: Scopes::new(),
            out,
        }
    }

    /// Runs a whole program in the global scope.
    pub fn run_program(&mut self, program: TokenSpan) -> Result<(), MintError> {
        let parser = Parser::new(program, self.scopes.root());
        Evaluator::new(parser).run(self)?;
        self.out
            .flush()
            .map_err(|error| MintError::io_error(Span::single(0), error))
    }
}

/// Executes the statements of one span as its parser produces them.
pub struct Evaluator {
    parser: Parser,
}

impl Evaluator {
    pub fn new(parser: Parser) -> Self {
        Self { parser }
    }

    /// Runs until the span ends or a `return` executes; the returned value, if
    /// any, belongs to the nearest enclosing call or block expression.
    pub fn run<W: Write>(&mut self, rt: &mut Runtime<W>) -> Result<Option<Value>, MintError> {
        while let Some(stmt) = self.parser.parse_statement(&mut rt.scopes)? {
            if let Some(value) = self.execute_statement(&stmt, rt)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn execute_statement<W: Write>(
        &mut self,
        stmt: &Stmt,
        rt: &mut Runtime<W>,
    ) -> Result<Option<Value>, MintError> {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.evaluate_expression(expr, rt)?;
                Ok(None)
            }
            Stmt::Assign { name, value, span } => {
                let value = self.evaluate_expression(value, rt)?;
                self.assign(name, value, span, rt)?;
                Ok(None)
            }
            // Bound while parsing
            Stmt::Function { .. } => Ok(None),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate_expression(expr, rt)?,
                    None => Value::Nil,
                };
                Ok(Some(value))
            }
            Stmt::Print { expr, span } => {
                let value = self.evaluate_expression(expr, rt)?;
                writeln!(rt.out, "{}", value).map_err(|error| MintError::io_error(span.clone(), error))?;
                Ok(None)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let branch = if self.evaluate_condition(condition, "if", rt)? {
                    Some(then_branch)
                } else {
                    else_branch.as_ref()
                };

                match branch {
                    Some(body) => self.execute_block(body, ScopeKind::Block, rt),
                    None => Ok(None),
                }
            }
            Stmt::For { condition, body, .. } => {
                while self.evaluate_condition(condition, "for", rt)? {
                    if let Some(value) = self.execute_block(body, ScopeKind::Block, rt)? {
                        return Ok(Some(value));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Runs `body` in a new table under the current one.
    fn execute_block<W: Write>(
        &mut self,
        body: &TokenSpan,
        kind: ScopeKind,
        rt: &mut Runtime<W>,
    ) -> Result<Option<Value>, MintError> {
        let scope = rt.scopes.push(self.parser.scope(), kind);
        let result = Evaluator::new(Parser::new(body.clone(), scope)).run(rt);
        rt.scopes.pop(scope);
        result
    }

    fn evaluate_condition<W: Write>(
        &mut self,
        condition: &Expr,
        keyword: &str,
        rt: &mut Runtime<W>,
    ) -> Result<bool, MintError> {
        match self.evaluate_expression(condition, rt)? {
            Value::Bool(b) => Ok(b),
            other => Err(MintError::type_error(
                condition.span().clone(),
                format!("'{}' condition must be bool, got {}", keyword, other.type_name()),
            )
            .with_help("Compare explicitly, for example: x != 0")),
        }
    }

    fn assign<W: Write>(
        &mut self,
        name: &str,
        value: Value,
        span: &Span,
        rt: &mut Runtime<W>,
    ) -> Result<(), MintError> {
        let scope = self.parser.scope();
        match rt.scopes.assignable(scope, name) {
            Some(variable) => {
                let declared = variable.ty;
                variable.assign(value).map_err(|incoming| {
                    MintError::type_error(
                        span.clone(),
                        format!(
                            "Cannot assign {} to variable '{}' of type {}",
                            incoming, name, declared
                        ),
                    )
                    .with_help("Only int and float convert into each other implicitly")
                })
            }
            None => {
                rt.scopes
                    .declare(scope, Binding::Variable(Variable::new(name, value)));
                Ok(())
            }
        }
    }

    pub fn evaluate_expression<W: Write>(
        &mut self,
        expr: &Expr,
        rt: &mut Runtime<W>,
    ) -> Result<Value, MintError> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::Variable { name, span } => match rt.scopes.lookup(self.parser.scope(), name) {
                Some(Binding::Variable(variable)) => Ok(variable.value.clone()),
                _ => Err(MintError::name_error(
                    span.clone(),
                    format!("Undefined variable '{}'", name),
                )),
            },
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                let left_val = self.evaluate_expression(left, rt)?;
                let right_val = self.evaluate_expression(right, rt)?;
                evaluate_binary_op(*operator, left_val, right_val, span)
            }
            Expr::Unary {
                operator,
                operand,
                span,
            } => {
                let operand_val = self.evaluate_expression(operand, rt)?;
                evaluate_unary_op(*operator, operand_val, span)
            }
            Expr::Call { name, args, span } => self.call_function(name, args, span, rt),
            Expr::Grouping { expr, .. } => self.evaluate_expression(expr, rt),
            Expr::Block { body, .. } => Ok(self
                .execute_block(body, ScopeKind::Inline, rt)?
                .unwrap_or(Value::Nil)),
        }
    }

    fn call_function<W: Write>(
        &mut self,
        name: &str,
        args: &[Expr],
        span: &Span,
        rt: &mut Runtime<W>,
    ) -> Result<Value, MintError> {
        let (home, function) = rt
            .scopes
            .lookup_function(self.parser.scope(), name)
            .ok_or_else(|| MintError::name_error(span.clone(), format!("Undefined function '{}'", name)))?;

        if args.len() != function.arity() {
            return Err(MintError::arity_error(
                span.clone(),
                format!(
                    "Function '{}' expects {} argument(s), got {}",
                    name,
                    function.arity(),
                    args.len()
                ),
            ));
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate_expression(arg, rt)?);
        }

        debug!("call {}({} args), depth {}", name, values.len(), rt.scopes.depth());
        let frame = rt.scopes.push(home, ScopeKind::Function);
        for (param, value) in function.params.iter().zip(values) {
            rt.scopes
                .declare(frame, Binding::Variable(Variable::new(param.as_str(), value)));
        }

        let mut parser = Parser::new(function.body.clone(), frame);
        let result = if function.inline {
            parser
                .parse_inline_body(&rt.scopes)
                .and_then(|body| Evaluator::new(parser).evaluate_expression(&body, rt))
        } else {
            Evaluator::new(parser)
                .run(rt)
                .map(|value| value.unwrap_or(Value::Nil))
        };

        rt.scopes.pop(frame);
        trace!("return from {}", name);
        result
    }
}

#[derive(Debug, Clone, Copy)]
enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

/// Pairs up two numeric operands, promoting to float when either one is.
fn numbers(left: &Value, right: &Value) -> Option<Numbers> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(Numbers::Ints(*l, *r)),
        (Value::Float(l), Value::Float(r)) => Some(Numbers::Floats(*l, *r)),
        (Value::Int(l), Value::Float(r)) => Some(Numbers::Floats(*l as f64, *r)),
        (Value::Float(l), Value::Int(r)) => Some(Numbers::Floats(*l, *r as f64)),
        _ => None,
    }
}

fn unsupported(operator: BinaryOp, left: &Value, right: &Value, span: &Span) -> MintError {
    MintError::type_error(
        span.clone(),
        format!(
            "Unsupported operand types for '{}': {} and {}",
            operator.symbol(),
            left.type_name(),
            right.type_name()
        ),
    )
}

fn overflow(operator: BinaryOp, span: &Span) -> MintError {
    MintError::arithmetic_error(
        span.clone(),
        format!("Integer overflow in '{}'", operator.symbol()),
    )
}

fn division_by_zero(span: &Span) -> MintError {
    MintError::arithmetic_error(span.clone(), "Division by zero".to_string())
}

pub fn evaluate_binary_op(
    operator: BinaryOp,
    left: Value,
    right: Value,
    span: &Span,
) -> Result<Value, MintError> {
    if operator.is_comparison() {
        return compare(operator, &left, &right, span).map(Value::Bool);
    }

    match operator {
        BinaryOp::Add => match (&left, &right) {
            (Value::String(l), Value::String(r)) => Ok(Value::String(format!("{}{}", l, r))),
            _ => match numbers(&left, &right) {
                Some(Numbers::Ints(l, r)) => l
                    .checked_add(r)
                    .map(Value::Int)
                    .ok_or_else(|| overflow(operator, span)),
                Some(Numbers::Floats(l, r)) => Ok(Value::Float(l + r)),
                None => Err(unsupported(operator, &left, &right, span)),
            },
        },
        BinaryOp::Subtract => match numbers(&left, &right) {
            Some(Numbers::Ints(l, r)) => l
                .checked_sub(r)
                .map(Value::Int)
                .ok_or_else(|| overflow(operator, span)),
            Some(Numbers::Floats(l, r)) => Ok(Value::Float(l - r)),
            None => Err(unsupported(operator, &left, &right, span)),
        },
        BinaryOp::Multiply => match (&left, &right) {
            (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
                repeat(s, *n, span)
            }
            _ => match numbers(&left, &right) {
                Some(Numbers::Ints(l, r)) => l
                    .checked_mul(r)
                    .map(Value::Int)
                    .ok_or_else(|| overflow(operator, span)),
                Some(Numbers::Floats(l, r)) => Ok(Value::Float(l * r)),
                None => Err(unsupported(operator, &left, &right, span)),
            },
        },
        BinaryOp::Divide => match numbers(&left, &right) {
            // Division always produces a float
            Some(Numbers::Ints(_, 0)) => Err(division_by_zero(span)),
            Some(Numbers::Ints(l, r)) => Ok(Value::Float(l as f64 / r as f64)),
            Some(Numbers::Floats(_, r)) if r == 0.0 => Err(division_by_zero(span)),
            Some(Numbers::Floats(l, r)) => Ok(Value::Float(l / r)),
            None => Err(unsupported(operator, &left, &right, span)),
        },
        BinaryOp::Modulo => match numbers(&left, &right) {
            Some(Numbers::Ints(_, 0)) => Err(division_by_zero(span)),
            Some(Numbers::Ints(l, r)) => l
                .checked_rem(r)
                .map(Value::Int)
                .ok_or_else(|| overflow(operator, span)),
            Some(Numbers::Floats(_, r)) if r == 0.0 => Err(division_by_zero(span)),
            Some(Numbers::Floats(l, r)) => Ok(Value::Float(l % r)),
            None => Err(unsupported(operator, &left, &right, span)),
        },
        _ => unreachable!("comparisons are handled above"),
    }
}

/// Upper bound on the byte length of a string built by repetition.
pub const MAX_STRING_BYTES: usize = 1 << 28;

fn repeat(s: &str, count: i64, span: &Span) -> Result<Value, MintError> {
    let count = usize::try_from(count).map_err(|_| {
        MintError::arithmetic_error(
            span.clone(),
            format!("Cannot repeat a string {} times", count),
        )
        .with_help("The repeat count must be zero or positive")
    })?;

    match s.len().checked_mul(count) {
        Some(len) if len <= MAX_STRING_BYTES => Ok(Value::String(s.repeat(count))),
        _ => Err(MintError::arithmetic_error(
            span.clone(),
            format!("Repeating a string {} times is too large", count),
        )
        .with_help(format!("Strings are limited to {} bytes", MAX_STRING_BYTES))),
    }
}

/// Comparisons need both operands of one type; int and float promote to
/// each other and bools only support equality.
fn compare(operator: BinaryOp, left: &Value, right: &Value, span: &Span) -> Result<bool, MintError> {
    let ordering = match (left, right) {
        (Value::String(l), Value::String(r)) => l.partial_cmp(r),
        (Value::Bool(l), Value::Bool(r)) => match operator {
            BinaryOp::Equal => return Ok(l == r),
            BinaryOp::NotEqual => return Ok(l != r),
            _ => return Err(unsupported(operator, left, right, span)),
        },
        _ => match numbers(left, right) {
            Some(Numbers::Ints(l, r)) => l.partial_cmp(&r),
            Some(Numbers::Floats(l, r)) => l.partial_cmp(&r),
            None => return Err(unsupported(operator, left, right, span)),
        },
    };

    // `None` only for NaN, where everything but `!=` is false
    Ok(match operator {
        BinaryOp::Equal => ordering == Some(Ordering::Equal),
        BinaryOp::NotEqual => ordering != Some(Ordering::Equal),
        BinaryOp::Less => ordering == Some(Ordering::Less),
        BinaryOp::LessEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Greater => ordering == Some(Ordering::Greater),
        BinaryOp::GreaterEqual => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        _ => unreachable!("not a comparison operator"),
    })
}

pub fn evaluate_unary_op(operator: UnaryOp, operand: Value, span: &Span) -> Result<Value, MintError> {
    match (operator, operand) {
        (UnaryOp::Negate, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(|| {
            MintError::arithmetic_error(span.clone(), "Integer overflow in '-'".to_string())
        }),
        (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (operator, operand) => Err(MintError::type_error(
            span.clone(),
            format!(
                "Unsupported operand type for '{}': {}",
                operator.symbol(),
                operand.type_name()
            ),
        )),
    }
}
