//! Parse-tree model consumed by the interpreter.
//!
//! The tree mirrors the shape a grammar-driven parser produces: every rule
//! becomes a [`ParseNode`] whose ordered children are nested rule nodes and
//! terminal [`Token`]s. The interpreter relies only on node kinds, child
//! order, token text and spans.
//!
//! Expression levels keep the grammar's precedence hierarchy in the tree
//! itself, so a level node's children alternate operand node / operator
//! token: `Adding[Multiplying, "-", Multiplying, "+", Multiplying]`.

use crate::{Span, TreeError};
use serde::{Deserialize, Serialize};

// ══════════════════════════════════════════════════════════════════════════════
// Kinds
// ══════════════════════════════════════════════════════════════════════════════

/// Grammar rule a [`ParseNode`] was produced by.
///
/// Child layouts below list rule children (nodes) and the tokens the
/// interpreter reads; `Keyword` tokens may appear anywhere and are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    // ── Statements ──
    /// Whole program: statement nodes.
    Program,
    /// Bracketed statement list: statement nodes.
    Block,
    /// `to name :a :b ... end`: name token, parameter tokens, body `Block`.
    ProcedureDef,
    /// `name arg...`: name token, argument expressions.
    ProcedureCall,
    /// Built-in drawing/console command: name token, argument expressions.
    Primitive,
    /// `make "x expr` / `LET x = expr`: name token, value expression.
    Assign,
    /// `local "x` / `DIM x`: name token, optional initializer expression.
    Local,
    /// `for i = a to b [step s]`: variable token, start, stop, optional
    /// step expressions, body `Block`.
    For,
    /// `repeat n [...]`: count expression, body `Block`.
    Repeat,
    /// `while cond [...]`: condition expression, body `Block`.
    While,
    /// `if cond [...] [...]`: condition, then `Block`, optional else `Block`.
    If,
    /// `stop`: leave the current procedure.
    Stop,
    /// `output expr`: leave the current procedure with a value.
    Output,
    /// `exit for` / `break`: unwind the enclosing loop and block.
    Break,

    // ── Expression levels (lowest precedence first) ──
    /// Boolean `and`/`or` level.
    Expression,
    /// `= <> < > <= >=` level.
    Relational,
    /// `+ -` level.
    Adding,
    /// `* / % \` level.
    Multiplying,
    /// `^` level.
    Exponent,
    /// Leading `+`/`-`/`not` tokens followed by one operand node.
    Sign,

    // ── Primaries ──
    /// Integer or float literal token.
    Number,
    /// Quoted literal token.
    StringLiteral,
    /// Identifier token naming a variable.
    Variable,
    /// Parenthesized inner expression.
    Paren,
    /// Procedure call in expression position: name token, arguments.
    FunctionCall,
}

impl RuleKind {
    /// True for the precedence-level kinds folded by the evaluator.
    pub fn is_operator_level(self) -> bool {
        matches!(
            self,
            RuleKind::Expression
                | RuleKind::Relational
                | RuleKind::Adding
                | RuleKind::Multiplying
                | RuleKind::Exponent
        )
    }
}

/// Lexical class of a terminal token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Identifier,
    Integer,
    Float,
    Quoted,
    Operator,
    Keyword,
}

// ══════════════════════════════════════════════════════════════════════════════
// Nodes
// ══════════════════════════════════════════════════════════════════════════════

/// A terminal token with its exact source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    #[serde(default)]
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}

/// A child of a rule node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseTree {
    Node(ParseNode),
    Token(Token),
}

impl ParseTree {
    pub fn span(&self) -> Span {
        match self {
            ParseTree::Node(n) => n.span,
            ParseTree::Token(t) => t.span,
        }
    }
}

impl From<ParseNode> for ParseTree {
    fn from(node: ParseNode) -> Self {
        ParseTree::Node(node)
    }
}

impl From<Token> for ParseTree {
    fn from(token: Token) -> Self {
        ParseTree::Token(token)
    }
}

/// A rule node: kind, ordered children, source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseNode {
    pub kind: RuleKind,
    #[serde(default)]
    pub children: Vec<ParseTree>,
    #[serde(default)]
    pub span: Span,
}

impl ParseNode {
    /// Create a node. A synthetic span is widened to cover its children.
    pub fn new(kind: RuleKind, children: Vec<ParseTree>, span: Span) -> Self {
        let span = if span.is_synthetic() {
            children
                .iter()
                .fold(Span::default(), |acc, c| acc.merge(c.span()))
        } else {
            span
        };
        Self {
            kind,
            children,
            span,
        }
    }

    /// Replace the span with a single source position.
    pub fn at(mut self, line: u32, col: u32) -> Self {
        self.span = Span::point(line, col);
        self
    }

    /// Child rule nodes in order.
    pub fn nodes(&self) -> impl Iterator<Item = &ParseNode> {
        self.children.iter().filter_map(|c| match c {
            ParseTree::Node(n) => Some(n),
            ParseTree::Token(_) => None,
        })
    }

    /// Child tokens in order, keywords excluded.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.children.iter().filter_map(|c| match c {
            ParseTree::Token(t) if t.kind != TokenKind::Keyword => Some(t),
            _ => None,
        })
    }

    /// The first non-keyword token, typically the rule's name or literal.
    pub fn first_token(&self) -> Option<&Token> {
        self.tokens().next()
    }

    /// Concatenated token text of the whole subtree, for diagnostics.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                ParseTree::Node(n) => n.collect_text(out),
                ParseTree::Token(t) => {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(&t.text);
                }
            }
        }
    }

    /// Load a tree serialized by an external parser.
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
