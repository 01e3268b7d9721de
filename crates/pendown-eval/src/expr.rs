//! Expression evaluation over the grammar-shaped tree.
//!
//! Operator precedence is already encoded in the tree: each level node
//! (`Expression`, `Relational`, `Adding`, `Multiplying`, `Exponent`) holds
//! operands of the next tighter level separated by operator tokens. A level
//! is evaluated by descending into each operand and folding the results
//! left to right with that level's operator table.

use crate::block::Program;
use crate::canvas::RecordingCanvas;
use crate::config::InterpreterConfig;
use crate::error::{EvalError, EvalResult};
use crate::halt::HaltMonitor;
use crate::runtime::Runtime;
use crate::scope::Scope;
use crate::stack;
use crate::value::{TypedValue, ValueType};
use pendown_types::{ParseNode, ParseTree, RuleKind, Span, Token, TokenKind};

/// Evaluate an expression node in the runtime's current scope.
pub fn evaluate(rt: &mut Runtime<'_>, node: &ParseNode) -> EvalResult<TypedValue> {
    stack::ensure_sufficient_stack(|| {
        match node.kind {
            kind if kind.is_operator_level() => level(rt, node),
            RuleKind::Sign => sign(rt, node),
            RuleKind::Number => number(node),
            RuleKind::StringLiteral => string(node),
            RuleKind::Variable => variable(rt, node),
            RuleKind::Paren => {
                let mut inner = node.nodes();
                match (inner.next(), inner.next()) {
                    (Some(inner), None) => evaluate(rt, inner),
                    _ => Err(EvalError::malformed(
                        "parentheses must hold one expression",
                        node.span,
                    )),
                }
            }
            RuleKind::FunctionCall => function_call(rt, node),
            other => Err(EvalError::malformed(
                format!("{other:?} is not an expression"),
                node.span,
            )),
        }
    })
}

/// Evaluate a standalone expression against `scope`, with no procedures
/// in view and default configuration.
pub fn evaluate_in(scope: &mut Scope, node: &ParseNode) -> EvalResult<TypedValue> {
    let program = Program::empty();
    let config = InterpreterConfig::default();
    let mut canvas = RecordingCanvas::new();
    let mut rt = Runtime::new(
        &program,
        &config,
        std::mem::take(scope),
        HaltMonitor::new(),
        &mut canvas,
        &[],
    );
    let result = evaluate(&mut rt, node);
    *scope = rt.into_scope();
    result
}

// ══════════════════════════════════════════════════════════════════════════════
// Operator levels
// ══════════════════════════════════════════════════════════════════════════════

fn level(rt: &mut Runtime<'_>, node: &ParseNode) -> EvalResult<TypedValue> {
    let mut operands: Vec<(TypedValue, Span)> = Vec::new();
    let mut operators: Vec<&Token> = Vec::new();
    for child in &node.children {
        match child {
            ParseTree::Node(n) if operands.len() == operators.len() => {
                operands.push((evaluate(rt, n)?, n.span));
            }
            ParseTree::Token(t) if operands.len() == operators.len() + 1 => operators.push(t),
            ParseTree::Token(t) if t.kind == TokenKind::Keyword => {}
            _ => {
                return Err(EvalError::malformed(
                    "operands and operators must alternate",
                    child.span(),
                ))
            }
        }
    }
    if operands.len() != operators.len() + 1 {
        return Err(EvalError::malformed(
            format!("{:?} is missing an operand", node.kind),
            node.span,
        ));
    }

    let mut operands = operands.into_iter();
    let Some((mut acc, mut acc_span)) = operands.next() else {
        return Err(EvalError::malformed("empty expression", node.span));
    };
    for (op, (rhs, rhs_span)) in operators.into_iter().zip(operands) {
        acc = match node.kind {
            RuleKind::Expression => boolean(&acc, acc_span, op, &rhs, rhs_span)?,
            RuleKind::Relational => relational(&acc, acc_span, op, &rhs, rhs_span)?,
            _ => arithmetic(&acc, acc_span, op, &rhs, rhs_span)?,
        };
        acc_span = acc_span.merge(rhs_span);
    }
    Ok(acc)
}

fn arithmetic(
    lhs: &TypedValue,
    lhs_span: Span,
    op: &Token,
    rhs: &TypedValue,
    rhs_span: Span,
) -> EvalResult<TypedValue> {
    let a = lhs.as_number(lhs_span)?;
    let b = rhs.as_number(rhs_span)?;
    let n = match op.text.to_lowercase().as_str() {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" => a / b,
        "%" | "mod" => a % b,
        "\\" => (a / b).trunc(),
        "^" => a.powf(b),
        other => {
            tracing::warn!(operator = other, span = %op.span, "unknown arithmetic operator");
            a
        }
    };
    Ok(TypedValue::Number(n))
}

fn relational(
    lhs: &TypedValue,
    lhs_span: Span,
    op: &Token,
    rhs: &TypedValue,
    rhs_span: Span,
) -> EvalResult<TypedValue> {
    let a = lhs.as_number(lhs_span)?;
    let b = rhs.as_number(rhs_span)?;
    let holds = match op.text.as_str() {
        "<" => a < b,
        ">" => a > b,
        "<=" | "=<" => a <= b,
        ">=" | "=>" => a >= b,
        "=" | "==" => a == b,
        "<>" | "!=" => a != b,
        other => {
            tracing::warn!(operator = other, span = %op.span, "unknown relational operator");
            return Ok(TypedValue::Null);
        }
    };
    Ok(TypedValue::Boolean(holds))
}

fn boolean(
    lhs: &TypedValue,
    lhs_span: Span,
    op: &Token,
    rhs: &TypedValue,
    rhs_span: Span,
) -> EvalResult<TypedValue> {
    let a = lhs.as_bool(lhs_span)?;
    let b = rhs.as_bool(rhs_span)?;
    let value = match op.text.to_lowercase().as_str() {
        "and" | "&&" => a && b,
        "or" | "||" => a || b,
        other => {
            tracing::warn!(operator = other, span = %op.span, "unknown boolean operator");
            return Ok(TypedValue::Null);
        }
    };
    Ok(TypedValue::Boolean(value))
}

// ══════════════════════════════════════════════════════════════════════════════
// Unary & primaries
// ══════════════════════════════════════════════════════════════════════════════

fn sign(rt: &mut Runtime<'_>, node: &ParseNode) -> EvalResult<TypedValue> {
    let mut operand = None;
    let (mut minus, mut plus, mut inverse) = (0usize, 0usize, false);
    for child in &node.children {
        match child {
            ParseTree::Token(t) if operand.is_none() => match t.text.to_lowercase().as_str() {
                "-" => minus += 1,
                "+" => plus += 1,
                "not" | "!" => inverse = true,
                _ if t.kind == TokenKind::Keyword => {}
                other => {
                    return Err(EvalError::malformed(
                        format!("'{other}' is not a sign"),
                        t.span,
                    ))
                }
            },
            ParseTree::Node(n) if operand.is_none() => operand = Some(n),
            _ => {
                return Err(EvalError::malformed(
                    "a sign applies to exactly one operand",
                    child.span(),
                ))
            }
        }
    }
    let operand = operand
        .ok_or_else(|| EvalError::malformed("sign without an operand", node.span))?;
    if (minus > 0 && plus > 0) || plus > 1 {
        tracing::warn!(span = %node.span, "ambiguous sign sequence");
    }

    let value = evaluate(rt, operand)?;
    if minus == 0 && plus == 0 && !inverse {
        return Ok(value);
    }
    match value {
        TypedValue::Number(n) if inverse => Ok(TypedValue::Boolean(n == 0.0)),
        TypedValue::Number(n) if minus % 2 == 1 => Ok(TypedValue::Number(-n)),
        TypedValue::Number(n) => Ok(TypedValue::Number(n)),
        TypedValue::Boolean(b) if inverse => Ok(TypedValue::Boolean(!b)),
        other => Err(EvalError::TypeMismatch {
            expected: if inverse {
                ValueType::Boolean
            } else {
                ValueType::Number
            },
            found: other.value_type(),
            span: operand.span,
        }),
    }
}

fn number(node: &ParseNode) -> EvalResult<TypedValue> {
    let token = node
        .first_token()
        .ok_or_else(|| EvalError::malformed("number without a literal", node.span))?;
    let invalid = || EvalError::InvalidLiteral {
        text: token.text.clone(),
        span: node.span,
    };
    let value = match token.kind {
        TokenKind::Integer => token.text.parse::<i64>().map_err(|_| invalid())? as f64,
        TokenKind::Float => token.text.parse::<f64>().map_err(|_| invalid())?,
        other => {
            return Err(EvalError::malformed(
                format!("{other:?} token in a number"),
                node.span,
            ))
        }
    };
    Ok(TypedValue::Number(value))
}

fn string(node: &ParseNode) -> EvalResult<TypedValue> {
    let token = node
        .first_token()
        .ok_or_else(|| EvalError::malformed("string without a literal", node.span))?;
    let text = token.text.as_str();
    let text = text.strip_prefix('"').unwrap_or(text);
    let text = text.strip_suffix('"').unwrap_or(text);
    Ok(TypedValue::String(text.to_string()))
}

fn variable(rt: &mut Runtime<'_>, node: &ParseNode) -> EvalResult<TypedValue> {
    let token = node
        .first_token()
        .ok_or_else(|| EvalError::malformed("variable without a name", node.span))?;
    let name = rt.canonical(&token.text);
    match rt.scope.lookup(&name) {
        Some(value) => Ok(value.clone()),
        None => Err(EvalError::UndefinedVariable {
            name,
            span: node.span,
        }),
    }
}

fn function_call(rt: &mut Runtime<'_>, node: &ParseNode) -> EvalResult<TypedValue> {
    let token = node
        .first_token()
        .ok_or_else(|| EvalError::malformed("call without a name", node.span))?;
    let args: Vec<&ParseNode> = node.nodes().collect();
    let signal = rt.call(&token.text, &args, node.span)?;
    if signal.is_halt() {
        return Err(EvalError::Halted);
    }
    signal.value.ok_or_else(|| EvalError::NoOutput {
        name: rt.canonical(&token.text),
        span: node.span,
    })
}
