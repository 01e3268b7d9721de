//! Helpers for constructing parse trees by hand.
//!
//! Parsers producing trees in memory and tests use these instead of
//! spelling out every [`ParseNode`]. All spans are synthetic; attach a
//! position with [`ParseNode::at`] where diagnostics matter.

use crate::tree::{ParseNode, ParseTree, RuleKind, Token, TokenKind};
use crate::Span;

fn node(kind: RuleKind, children: Vec<ParseTree>) -> ParseNode {
    ParseNode::new(kind, children, Span::default())
}

fn nodes(items: Vec<ParseNode>) -> Vec<ParseTree> {
    items.into_iter().map(ParseTree::from).collect()
}

/// An identifier token.
pub fn ident(name: &str) -> Token {
    Token::new(TokenKind::Identifier, name, Span::default())
}

/// An operator token.
pub fn op(symbol: &str) -> Token {
    Token::new(TokenKind::Operator, symbol, Span::default())
}

// ── Primaries ────────────────────────────────────────────────────────────────

/// A numeric literal; text containing `.`, `e` or `E` becomes a float token.
pub fn num(text: &str) -> ParseNode {
    let kind = if text.contains(['.', 'e', 'E']) {
        TokenKind::Float
    } else {
        TokenKind::Integer
    };
    node(
        RuleKind::Number,
        vec![Token::new(kind, text, Span::default()).into()],
    )
}

/// A double-quoted string literal holding `value`.
pub fn string(value: &str) -> ParseNode {
    quoted(&format!("\"{value}\""))
}

/// A quoted literal with exact token text (e.g. the Logo word `"abc`).
pub fn quoted(text: &str) -> ParseNode {
    node(
        RuleKind::StringLiteral,
        vec![Token::new(TokenKind::Quoted, text, Span::default()).into()],
    )
}

/// A variable reference.
pub fn var(name: &str) -> ParseNode {
    node(RuleKind::Variable, vec![ident(name).into()])
}

/// A parenthesized expression.
pub fn paren(inner: ParseNode) -> ParseNode {
    node(RuleKind::Paren, vec![inner.into()])
}

/// A procedure call in expression position.
pub fn call_expr(name: &str, args: Vec<ParseNode>) -> ParseNode {
    let mut children = vec![ident(name).into()];
    children.extend(nodes(args));
    node(RuleKind::FunctionCall, children)
}

// ── Expression levels ────────────────────────────────────────────────────────

/// A unary sign node: `signs` are the leading tokens (`+`, `-`, `not`).
pub fn sign(signs: &[&str], operand: ParseNode) -> ParseNode {
    let mut children: Vec<ParseTree> = signs.iter().map(|s| op(s).into()).collect();
    children.push(operand.into());
    node(RuleKind::Sign, children)
}

/// A precedence level: `first (op operand)*`.
pub fn level(kind: RuleKind, first: ParseNode, rest: Vec<(&str, ParseNode)>) -> ParseNode {
    let mut children = vec![first.into()];
    for (symbol, operand) in rest {
        children.push(op(symbol).into());
        children.push(operand.into());
    }
    node(kind, children)
}

/// Boolean `and`/`or` level.
pub fn boolean(first: ParseNode, rest: Vec<(&str, ParseNode)>) -> ParseNode {
    level(RuleKind::Expression, first, rest)
}

/// Relational level.
pub fn relational(first: ParseNode, rest: Vec<(&str, ParseNode)>) -> ParseNode {
    level(RuleKind::Relational, first, rest)
}

/// Additive level.
pub fn adding(first: ParseNode, rest: Vec<(&str, ParseNode)>) -> ParseNode {
    level(RuleKind::Adding, first, rest)
}

/// Multiplicative level.
pub fn multiplying(first: ParseNode, rest: Vec<(&str, ParseNode)>) -> ParseNode {
    level(RuleKind::Multiplying, first, rest)
}

/// Exponent level.
pub fn exponent(first: ParseNode, rest: Vec<(&str, ParseNode)>) -> ParseNode {
    level(RuleKind::Exponent, first, rest)
}

// ── Statements ───────────────────────────────────────────────────────────────

pub fn program(stmts: Vec<ParseNode>) -> ParseNode {
    node(RuleKind::Program, nodes(stmts))
}

pub fn block(stmts: Vec<ParseNode>) -> ParseNode {
    node(RuleKind::Block, nodes(stmts))
}

/// `to name :p1 :p2 ... [body] end`
pub fn procedure(name: &str, params: &[&str], body: ParseNode) -> ParseNode {
    let mut children: Vec<ParseTree> = vec![ident(name).into()];
    children.extend(params.iter().map(|p| ParseTree::from(ident(p))));
    children.push(body.into());
    node(RuleKind::ProcedureDef, children)
}

/// A procedure call statement.
pub fn call(name: &str, args: Vec<ParseNode>) -> ParseNode {
    let mut children = vec![ident(name).into()];
    children.extend(nodes(args));
    node(RuleKind::ProcedureCall, children)
}

/// A drawing/console primitive such as `fd 10` or `print "hi`.
pub fn primitive(name: &str, args: Vec<ParseNode>) -> ParseNode {
    let mut children = vec![ident(name).into()];
    children.extend(nodes(args));
    node(RuleKind::Primitive, children)
}

pub fn assign(name: &str, value: ParseNode) -> ParseNode {
    node(RuleKind::Assign, vec![ident(name).into(), value.into()])
}

pub fn local(name: &str, init: Option<ParseNode>) -> ParseNode {
    let mut children = vec![ident(name).into()];
    children.extend(init.map(ParseTree::from));
    node(RuleKind::Local, children)
}

pub fn for_loop(
    variable: &str,
    start: ParseNode,
    stop: ParseNode,
    step: Option<ParseNode>,
    body: ParseNode,
) -> ParseNode {
    let mut children = vec![ident(variable).into(), start.into(), stop.into()];
    children.extend(step.map(ParseTree::from));
    children.push(body.into());
    node(RuleKind::For, children)
}

pub fn repeat(count: ParseNode, body: ParseNode) -> ParseNode {
    node(RuleKind::Repeat, vec![count.into(), body.into()])
}

pub fn while_loop(condition: ParseNode, body: ParseNode) -> ParseNode {
    node(RuleKind::While, vec![condition.into(), body.into()])
}

pub fn if_then(condition: ParseNode, then: ParseNode, otherwise: Option<ParseNode>) -> ParseNode {
    let mut children = vec![condition.into(), then.into()];
    children.extend(otherwise.map(ParseTree::from));
    node(RuleKind::If, children)
}

pub fn stop() -> ParseNode {
    node(RuleKind::Stop, vec![])
}

pub fn output(value: ParseNode) -> ParseNode {
    node(RuleKind::Output, vec![value.into()])
}

pub fn brk() -> ParseNode {
    node(RuleKind::Break, vec![])
}
