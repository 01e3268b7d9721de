//! Code blocks: the executable form of a parse tree.
//!
//! Building walks the statement rules of a [`ParseNode`] tree once and lays
//! the resulting blocks out in an arena ([`Program`]) addressed by
//! [`BlockId`]. Each block knows its lexical parent, the procedures it
//! defines, and the names it declares. Expression subtrees are kept as
//! parse nodes and evaluated directly.

use crate::canvas::Primitive;
use crate::config::InterpreterConfig;
use crate::control;
use crate::error::{EvalError, EvalResult};
use crate::expr;
use crate::runtime::Runtime;
use crate::signal::ReturnValue;
use crate::stack;
use crate::value::TypedValue;
use pendown_types::{ParseNode, RuleKind, Span};
use std::collections::{BTreeMap, BTreeSet};

/// Index of a block in its [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

// ══════════════════════════════════════════════════════════════════════════════
// Blocks & statements
// ══════════════════════════════════════════════════════════════════════════════

/// A user-defined procedure's signature.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDef {
    pub name: String,
    pub params: Vec<String>,
}

/// `for variable = start to stop [step step]`
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub variable: String,
    pub start: ParseNode,
    pub stop: ParseNode,
    pub step: Option<ParseNode>,
}

/// What a block does when processed.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    /// The program root.
    Program,
    /// A plain nested statement list.
    List,
    /// A procedure body; only entered through a call.
    Procedure(ProcedureDef),
    For(ForLoop),
    Repeat {
        count: ParseNode,
    },
    While {
        condition: ParseNode,
    },
    If {
        condition: ParseNode,
        then: BlockId,
        otherwise: Option<BlockId>,
    },
}

/// A single executable command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Process a nested block or control construct.
    Run(BlockId),
    Assign {
        name: String,
        value: ParseNode,
    },
    Local {
        name: String,
        init: Option<ParseNode>,
    },
    Call {
        name: String,
        args: Vec<ParseNode>,
    },
    Primitive {
        primitive: Primitive,
        args: Vec<ParseNode>,
    },
    Stop,
    Output(ParseNode),
    Break,
}

/// A command plus the rule and position it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub command: Command,
    pub kind: RuleKind,
    pub span: Span,
}

/// An executable unit owning child statements, local procedures and
/// declared names.
#[derive(Debug, Clone)]
pub struct CodeBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    parent: Option<BlockId>,
    statements: Vec<Statement>,
    functions: BTreeMap<String, BlockId>,
    locals: BTreeSet<String>,
    origin: RuleKind,
    span: Span,
}

impl CodeBlock {
    fn new(id: BlockId, kind: BlockKind, parent: Option<BlockId>, node: &ParseNode) -> Self {
        Self {
            id,
            kind,
            parent,
            statements: Vec::new(),
            functions: BTreeMap::new(),
            locals: BTreeSet::new(),
            origin: node.kind,
            span: node.span,
        }
    }

    /// Lexical parent block.
    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Procedure defined directly in this block.
    pub fn local_function(&self, name: &str) -> Option<BlockId> {
        self.functions.get(name).copied()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Names this block declares or assigns.
    pub fn local_variables(&self) -> impl Iterator<Item = &str> {
        self.locals.iter().map(String::as_str)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.locals.contains(name)
    }

    /// Rule kind of the originating parse node.
    pub fn origin(&self) -> RuleKind {
        self.origin
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Execute this block in a fresh frame.
    pub fn process(&self, rt: &mut Runtime<'_>) -> EvalResult<ReturnValue> {
        tracing::trace!(
            kind = ?self.origin,
            line = self.span.start_line,
            col = self.span.start_col,
            "process block"
        );
        stack::ensure_sufficient_stack(|| {
            let mut scoped = rt.scoped(self.id);
            match &self.kind {
                BlockKind::Program | BlockKind::List => self.run_statements(&mut scoped),
                BlockKind::Procedure(_) => Ok(ReturnValue::SUCCESS),
                BlockKind::For(for_loop) => control::run_for(&mut scoped, self, for_loop),
                BlockKind::Repeat { count } => control::run_repeat(&mut scoped, self, count),
                BlockKind::While { condition } => control::run_while(&mut scoped, self, condition),
                BlockKind::If {
                    condition,
                    then,
                    otherwise,
                } => control::run_if(&mut scoped, condition, *then, *otherwise),
            }
        })
    }

    /// Run this block's statements in one more nested frame (loop bodies).
    pub(crate) fn run_body(&self, rt: &mut Runtime<'_>) -> EvalResult<ReturnValue> {
        let mut scoped = rt.scoped(self.id);
        self.run_statements(&mut scoped)
    }

    /// Run statements in order in the current frame.
    ///
    /// Stops at the first non-SUCCESS signal and returns it unchanged. The
    /// halt monitor is polled before every statement and after the last.
    pub(crate) fn run_statements(&self, rt: &mut Runtime<'_>) -> EvalResult<ReturnValue> {
        for stmt in &self.statements {
            if rt.is_halted() {
                tracing::debug!(line = stmt.span.start_line, "halt observed");
                return Ok(ReturnValue::HALT);
            }
            rt.tick(stmt.span)?;
            rt.notify_statement(stmt.kind, stmt.span);
            let signal = match self.execute(rt, stmt) {
                Err(EvalError::Halted) => ReturnValue::HALT,
                other => other?,
            };
            if !signal.is_success() {
                return Ok(signal);
            }
        }
        if rt.is_halted() {
            return Ok(ReturnValue::HALT);
        }
        Ok(ReturnValue::SUCCESS)
    }

    fn execute(&self, rt: &mut Runtime<'_>, stmt: &Statement) -> EvalResult<ReturnValue> {
        match &stmt.command {
            Command::Run(id) => {
                let program = rt.program();
                program.block(*id).process(rt)
            }
            Command::Assign { name, value } => {
                let value = expr::evaluate(rt, value)?;
                rt.scope.assign(name, value);
                Ok(ReturnValue::SUCCESS)
            }
            Command::Local { name, init } => {
                let value = match init {
                    Some(init) => expr::evaluate(rt, init)?,
                    None => TypedValue::Null,
                };
                rt.scope.declare(name, value);
                Ok(ReturnValue::SUCCESS)
            }
            Command::Call { name, args } => {
                let args: Vec<&ParseNode> = args.iter().collect();
                let signal = rt.call(name, &args, stmt.span)?;
                if signal.is_halt() {
                    Ok(ReturnValue::HALT)
                } else {
                    Ok(ReturnValue::SUCCESS)
                }
            }
            Command::Primitive { primitive, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(expr::evaluate(rt, arg)?);
                }
                rt.primitive(*primitive, &values, stmt.span)
            }
            Command::Stop => Ok(ReturnValue::RETURN),
            Command::Output(value) => Ok(ReturnValue::output(expr::evaluate(rt, value)?)),
            Command::Break => Ok(ReturnValue::BREAK),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Program
// ══════════════════════════════════════════════════════════════════════════════

/// Arena of all blocks built from one parse tree.
#[derive(Debug, Clone)]
pub struct Program {
    blocks: Vec<CodeBlock>,
}

impl Program {
    /// Build the block structure for a `Program` (or `Block`) root node.
    pub fn build(root: &ParseNode, config: &InterpreterConfig) -> EvalResult<Self> {
        if !matches!(root.kind, RuleKind::Program | RuleKind::Block) {
            return Err(EvalError::malformed(
                format!("expected a program root, found {:?}", root.kind),
                root.span,
            ));
        }
        let mut builder = Builder {
            blocks: Vec::new(),
            config,
        };
        let id = builder.alloc(BlockKind::Program, None, root);
        builder.fill(id, root.nodes())?;
        Ok(Program {
            blocks: builder.blocks,
        })
    }

    /// A program with an empty root block.
    pub fn empty() -> Self {
        let root = ParseNode::new(RuleKind::Program, Vec::new(), Span::default());
        Program {
            blocks: vec![CodeBlock::new(BlockId(0), BlockKind::Program, None, &root)],
        }
    }

    pub fn root(&self) -> &CodeBlock {
        &self.blocks[0]
    }

    pub fn block(&self, id: BlockId) -> &CodeBlock {
        &self.blocks[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Resolve a procedure visible from `from`: the block's own
    /// definitions first, then each lexical parent in turn.
    pub fn find_function(&self, from: BlockId, name: &str) -> Option<&CodeBlock> {
        let mut current = Some(from);
        while let Some(id) = current {
            let block = self.block(id);
            if let Some(found) = block.local_function(name) {
                return Some(self.block(found));
            }
            current = block.parent;
        }
        None
    }
}

struct Builder<'c> {
    blocks: Vec<CodeBlock>,
    config: &'c InterpreterConfig,
}

impl Builder<'_> {
    fn alloc(&mut self, kind: BlockKind, parent: Option<BlockId>, node: &ParseNode) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(CodeBlock::new(id, kind, parent, node));
        id
    }

    fn fill<'n>(
        &mut self,
        id: BlockId,
        stmts: impl Iterator<Item = &'n ParseNode>,
    ) -> EvalResult<()> {
        for node in stmts {
            if let Some(stmt) = self.statement(id, node)? {
                self.blocks[id.0 as usize].statements.push(stmt);
            }
        }
        Ok(())
    }

    fn name(&self, node: &ParseNode) -> EvalResult<String> {
        node.first_token()
            .map(|t| self.config.canonical_name(&t.text))
            .ok_or_else(|| EvalError::malformed(format!("{:?} needs a name", node.kind), node.span))
    }

    fn declare_local(&mut self, id: BlockId, name: &str) {
        self.blocks[id.0 as usize].locals.insert(name.to_string());
    }

    /// The trailing `Block` child of a construct.
    fn body<'n>(&self, node: &'n ParseNode) -> EvalResult<&'n ParseNode> {
        node.nodes()
            .last()
            .filter(|n| n.kind == RuleKind::Block)
            .ok_or_else(|| {
                EvalError::malformed(format!("{:?} needs a body block", node.kind), node.span)
            })
    }

    fn statement(&mut self, parent: BlockId, node: &ParseNode) -> EvalResult<Option<Statement>> {
        let command = match node.kind {
            RuleKind::Block => {
                let id = self.alloc(BlockKind::List, Some(parent), node);
                self.fill(id, node.nodes())?;
                Command::Run(id)
            }
            RuleKind::ProcedureDef => {
                self.procedure(parent, node)?;
                return Ok(None);
            }
            RuleKind::For => Command::Run(self.for_loop(parent, node)?),
            RuleKind::Repeat | RuleKind::While => {
                let body = self.body(node)?;
                let parts: Vec<&ParseNode> = node.nodes().collect();
                let [head, _] = parts[..] else {
                    return Err(EvalError::malformed(
                        format!("{:?} needs an expression and a body", node.kind),
                        node.span,
                    ));
                };
                let kind = if node.kind == RuleKind::Repeat {
                    BlockKind::Repeat {
                        count: head.clone(),
                    }
                } else {
                    BlockKind::While {
                        condition: head.clone(),
                    }
                };
                let id = self.alloc(kind, Some(parent), node);
                self.fill(id, body.nodes())?;
                Command::Run(id)
            }
            RuleKind::If => Command::Run(self.if_else(parent, node)?),
            RuleKind::Assign => {
                let name = self.name(node)?;
                let value = single_expression(node)?;
                self.declare_local(parent, &name);
                Command::Assign { name, value }
            }
            RuleKind::Local => {
                let name = self.name(node)?;
                let init = node.nodes().next().cloned();
                self.declare_local(parent, &name);
                Command::Local { name, init }
            }
            RuleKind::ProcedureCall => Command::Call {
                name: self.name(node)?,
                args: node.nodes().cloned().collect(),
            },
            RuleKind::Primitive => {
                let token = node.first_token().ok_or_else(|| {
                    EvalError::malformed("primitive needs a name", node.span)
                })?;
                let primitive =
                    Primitive::from_name(&token.text).ok_or_else(|| EvalError::UnknownPrimitive {
                        name: token.text.clone(),
                        span: node.span,
                    })?;
                let args: Vec<ParseNode> = node.nodes().cloned().collect();
                primitive.check_arity(&token.text, args.len(), node.span)?;
                Command::Primitive { primitive, args }
            }
            RuleKind::Stop => Command::Stop,
            RuleKind::Output => Command::Output(single_expression(node)?),
            RuleKind::Break => Command::Break,
            other => {
                return Err(EvalError::malformed(
                    format!("expected a statement, found {other:?}"),
                    node.span,
                ))
            }
        };
        Ok(Some(Statement {
            command,
            kind: node.kind,
            span: node.span,
        }))
    }

    fn procedure(&mut self, parent: BlockId, node: &ParseNode) -> EvalResult<()> {
        let mut names = node.tokens().map(|t| self.config.canonical_name(&t.text));
        let name = names.next().ok_or_else(|| {
            EvalError::malformed("procedure definition needs a name", node.span)
        })?;
        let params: Vec<String> = names.collect();
        let body = self.body(node)?;

        let def = ProcedureDef {
            name: name.clone(),
            params: params.clone(),
        };
        let id = self.alloc(BlockKind::Procedure(def), Some(parent), node);
        for param in &params {
            self.declare_local(id, param);
        }
        self.fill(id, body.nodes())?;

        let functions = &mut self.blocks[parent.0 as usize].functions;
        if functions.insert(name.clone(), id).is_some() {
            tracing::warn!(procedure = %name, line = node.span.start_line, "procedure redefined");
        }
        Ok(())
    }

    fn for_loop(&mut self, parent: BlockId, node: &ParseNode) -> EvalResult<BlockId> {
        let variable = self.name(node)?;
        let body = self.body(node)?;
        let bounds: Vec<&ParseNode> = node.nodes().collect();
        let (start, stop, step) = match bounds[..] {
            [start, stop, _] => (start, stop, None),
            [start, stop, step, _] => (start, stop, Some(step.clone())),
            _ => {
                return Err(EvalError::malformed(
                    "for needs start, stop, optional step and a body",
                    node.span,
                ))
            }
        };
        let kind = BlockKind::For(ForLoop {
            variable: variable.clone(),
            start: start.clone(),
            stop: stop.clone(),
            step,
        });
        let id = self.alloc(kind, Some(parent), node);
        self.declare_local(id, &variable);
        self.fill(id, body.nodes())?;
        Ok(id)
    }

    fn if_else(&mut self, parent: BlockId, node: &ParseNode) -> EvalResult<BlockId> {
        let parts: Vec<&ParseNode> = node.nodes().collect();
        let (condition, then, otherwise) = match parts[..] {
            [c, t] => (c, t, None),
            [c, t, e] => (c, t, Some(e)),
            _ => {
                return Err(EvalError::malformed(
                    "if needs a condition, a then block and an optional else block",
                    node.span,
                ))
            }
        };
        for branch in std::iter::once(then).chain(otherwise) {
            if branch.kind != RuleKind::Block {
                return Err(EvalError::malformed("if branches must be blocks", branch.span));
            }
        }

        let id = self.alloc(
            BlockKind::If {
                condition: condition.clone(),
                then: BlockId(0),
                otherwise: None,
            },
            Some(parent),
            node,
        );
        let then_id = self.alloc(BlockKind::List, Some(id), then);
        self.fill(then_id, then.nodes())?;
        let else_id = match otherwise {
            Some(e) => {
                let else_id = self.alloc(BlockKind::List, Some(id), e);
                self.fill(else_id, e.nodes())?;
                Some(else_id)
            }
            None => None,
        };
        self.blocks[id.0 as usize].kind = BlockKind::If {
            condition: condition.clone(),
            then: then_id,
            otherwise: else_id,
        };
        Ok(id)
    }
}

fn single_expression(node: &ParseNode) -> EvalResult<ParseNode> {
    let mut exprs = node.nodes();
    match (exprs.next(), exprs.next()) {
        (Some(expr), None) => Ok(expr.clone()),
        _ => Err(EvalError::malformed(
            format!("{:?} needs exactly one expression", node.kind),
            node.span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendown_types::build::*;

    fn build(root: ParseNode) -> EvalResult<Program> {
        Program::build(&root, &InterpreterConfig::default())
    }

    #[test]
    fn test_nested_blocks_link_to_parents() {
        let prog = build(program(vec![block(vec![block(vec![assign("x", num("1"))])])])).unwrap();
        assert_eq!(prog.len(), 3);
        assert_eq!(prog.block(BlockId(1)).parent(), Some(BlockId(0)));
        assert_eq!(prog.block(BlockId(2)).parent(), Some(BlockId(1)));
        assert!(prog.block(BlockId(2)).has_variable("x"));
        assert!(!prog.root().has_variable("x"));
    }

    #[test]
    fn test_procedures_register_in_defining_block() {
        let prog = build(program(vec![
            call("Square", vec![num("10")]),
            procedure("square", &[":size"], block(vec![primitive("fd", vec![var(":size")])])),
        ]))
        .unwrap();
        let root = prog.root();
        assert!(root.has_function("square"));
        assert_eq!(root.statements().len(), 1);

        let proc_block = prog.find_function(root.id, "square").unwrap();
        assert_eq!(
            proc_block.kind,
            BlockKind::Procedure(ProcedureDef {
                name: "square".into(),
                params: vec!["size".into()],
            })
        );
        assert_eq!(proc_block.local_variables().collect::<Vec<_>>(), vec!["size"]);
    }

    #[test]
    fn test_function_lookup_walks_lexical_parents() {
        let prog = build(program(vec![
            procedure("outer", &[], block(vec![stop()])),
            block(vec![block(vec![call("outer", vec![])])]),
        ]))
        .unwrap();
        let innermost = BlockId(prog.len() as u32 - 1);
        assert!(prog.find_function(innermost, "outer").is_some());
        assert!(prog.find_function(innermost, "missing").is_none());
    }

    #[test]
    fn test_for_loop_shape() {
        let prog = build(program(vec![for_loop(
            "I",
            num("1"),
            num("3"),
            None,
            block(vec![primitive("print", vec![var("i")])]),
        )]))
        .unwrap();
        let for_block = prog.block(BlockId(1));
        match &for_block.kind {
            BlockKind::For(f) => {
                assert_eq!(f.variable, "i");
                assert!(f.step.is_none());
            }
            other => panic!("expected for, got {other:?}"),
        }
        assert_eq!(for_block.statements().len(), 1);
        assert!(for_block.has_variable("i"));
    }

    #[test]
    fn test_if_else_allocates_branches() {
        let prog = build(program(vec![if_then(
            num("1"),
            block(vec![primitive("pu", vec![])]),
            Some(block(vec![primitive("pd", vec![])])),
        )]))
        .unwrap();
        match &prog.block(BlockId(1)).kind {
            BlockKind::If { then, otherwise, .. } => {
                assert_eq!(*then, BlockId(2));
                assert_eq!(*otherwise, Some(BlockId(3)));
                assert_eq!(prog.block(*then).parent(), Some(BlockId(1)));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_primitive_is_rejected() {
        let err = build(program(vec![primitive("jump", vec![]).at(3, 1)])).unwrap_err();
        assert_eq!(
            err,
            EvalError::UnknownPrimitive {
                name: "jump".into(),
                span: Span::point(3, 1),
            }
        );
    }

    #[test]
    fn test_primitive_arity_checked_at_build() {
        let err = build(program(vec![primitive("setxy", vec![num("1")])])).unwrap_err();
        assert!(matches!(err, EvalError::ArityMismatch { found: 1, .. }));
    }

    #[test]
    fn test_expression_at_statement_level_is_malformed() {
        let err = build(program(vec![num("1")])).unwrap_err();
        assert!(matches!(err, EvalError::MalformedTree { .. }));
    }

    #[test]
    fn test_for_without_body_is_malformed() {
        let node = ParseNode::new(
            RuleKind::For,
            vec![ident("i").into(), num("1").into(), num("2").into()],
            Span::default(),
        );
        assert!(build(program(vec![node])).is_err());
    }

    #[test]
    fn test_root_must_be_program() {
        assert!(build(num("1")).is_err());
    }
}
