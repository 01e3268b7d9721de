//! Integration tests for control constructs and cancellation.
//!
//! Covers:
//! - `for` ranges, steps, loop-variable scoping and signal propagation
//! - `repeat`, `while` and `if`
//! - step budgets on loops with empty bodies
//! - HALT from listeners, other threads and interrupted pauses
//! - run determinism

use pendown_eval::{
    DrawCall, EvalError, HaltMonitor, Interpreter, InterpreterConfig, InterpreterListener,
    ProcessResult, RecordingCanvas, ReturnValue, RunReport, Scope, TypedValue,
};
use pendown_types::build::*;
use pendown_types::{ParseNode, RuleKind, Span};
use pretty_assertions::assert_eq;
use std::thread;
use std::time::{Duration, Instant};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn run(tree: ParseNode) -> (RunReport, RecordingCanvas) {
    let interp = Interpreter::new(&tree).expect("program should build");
    let mut canvas = RecordingCanvas::new();
    let report = interp.run(&mut canvas).expect("program should run");
    (report, canvas)
}

fn printed(tree: ParseNode) -> Vec<String> {
    let (_, canvas) = run(tree);
    canvas.messages().into_iter().map(String::from).collect()
}

fn print(value: ParseNode) -> ParseNode {
    primitive("print", vec![value])
}

fn fd(distance: &str) -> ParseNode {
    primitive("fd", vec![num(distance)])
}

/// Values `for i = start to stop [step step]` assigns to `i`.
fn visits(start: &str, stop: &str, step: Option<&str>) -> Vec<String> {
    printed(program(vec![for_loop(
        "i",
        num(start),
        num(stop),
        step.map(num),
        block(vec![print(var("i"))]),
    )]))
}

fn forwards(canvas: &RecordingCanvas) -> Vec<f64> {
    canvas
        .calls()
        .iter()
        .filter_map(|c| match c {
            DrawCall::Forward { distance } => Some(*distance),
            _ => None,
        })
        .collect()
}

/// Halts the run when a primitive on `line` is about to execute.
struct HaltAtLine {
    line: u32,
    monitor: HaltMonitor,
}

impl InterpreterListener for HaltAtLine {
    fn current_statement(&self, kind: RuleKind, span: Span, _scope: &Scope) {
        if kind == RuleKind::Primitive && span.start_line == self.line {
            self.monitor.halt();
        }
    }
}

fn halting_interpreter(tree: &ParseNode, line: u32) -> Interpreter {
    let mut interp = Interpreter::new(tree).expect("program should build");
    let monitor = interp.halt_monitor();
    interp.add_listener(Box::new(HaltAtLine { line, monitor }));
    interp
}

// ══════════════════════════════════════════════════════════════════════════════
// For
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn for_visits_inclusive_range() {
    assert_eq!(visits("1", "3", None), vec!["1", "2", "3"]);
}

#[test]
fn for_descending_bounds_without_step_never_run() {
    assert!(visits("5", "1", None).is_empty());
}

#[test]
fn for_equal_bounds_run_once() {
    assert_eq!(visits("1", "1", None), vec!["1"]);
}

#[test]
fn for_negative_step_counts_down() {
    assert_eq!(visits("5", "1", Some("-1")), vec!["5", "4", "3", "2", "1"]);
}

#[test]
fn for_contradicting_step_never_runs() {
    assert!(visits("1", "5", Some("-1")).is_empty());
}

#[test]
fn for_zero_step_never_runs() {
    assert!(visits("1", "5", Some("0")).is_empty());
}

#[test]
fn for_fractional_step() {
    assert_eq!(visits("0", "2", Some("0.5")), vec!["0", "0.5", "1", "1.5", "2"]);
}

#[test]
fn for_bounds_are_evaluated_once() {
    // Changing `n` inside the body does not move the bound.
    let prog = program(vec![
        assign("n", num("3")),
        for_loop(
            "i",
            num("1"),
            var("n"),
            None,
            block(vec![assign("n", num("100")), print(var("i"))]),
        ),
    ]);
    assert_eq!(printed(prog), vec!["1", "2", "3"]);
}

#[test]
fn for_variable_shadows_and_disappears() {
    let prog = program(vec![
        assign("i", num("100")),
        for_loop("i", num("1"), num("2"), None, block(vec![])),
        print(var("i")),
    ]);
    assert_eq!(printed(prog), vec!["100"]);
}

#[test]
fn for_body_updates_outer_accumulator() {
    let prog = program(vec![
        assign("sum", num("0")),
        for_loop(
            "i",
            num("1"),
            num("4"),
            None,
            block(vec![assign(
                "sum",
                adding(var("sum"), vec![("+", var("i"))]),
            )]),
        ),
        print(var("sum")),
    ]);
    assert_eq!(printed(prog), vec!["10"]);
}

#[test]
fn for_output_leaves_the_procedure() {
    let prog = program(vec![
        procedure(
            "first_over",
            &["limit"],
            block(vec![
                for_loop(
                    "i",
                    num("1"),
                    num("10"),
                    None,
                    block(vec![if_then(
                        relational(var("i"), vec![(">", var("limit"))]),
                        block(vec![output(var("i"))]),
                        None,
                    )]),
                ),
                output(num("0")),
            ]),
        ),
        print(call_expr("first_over", vec![num("3")])),
        print(call_expr("first_over", vec![num("20")])),
    ]);
    assert_eq!(printed(prog), vec!["4", "0"]);
}

#[test]
fn for_bound_must_be_numeric() {
    let tree = program(vec![for_loop(
        "i",
        num("1"),
        string("ten").at(1, 12),
        None,
        block(vec![]),
    )]);
    let err = Interpreter::new(&tree)
        .and_then(|interp| interp.run(&mut RecordingCanvas::new()))
        .expect_err("string bound should fail");
    assert_eq!(err.span(), Span::point(1, 12));
}

// ══════════════════════════════════════════════════════════════════════════════
// Repeat / While / If
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn repeat_truncates_count() {
    let (_, canvas) = run(program(vec![repeat(num("2.9"), block(vec![fd("5")]))]));
    assert_eq!(forwards(&canvas), vec![5.0, 5.0]);
}

#[test]
fn repeat_non_positive_never_runs() {
    let (_, canvas) = run(program(vec![
        repeat(num("0"), block(vec![fd("1")])),
        repeat(sign(&["-"], num("3")), block(vec![fd("1")])),
    ]));
    assert!(canvas.calls().is_empty());
}

#[test]
fn while_counts_up() {
    let prog = program(vec![
        assign("i", num("0")),
        while_loop(
            relational(var("i"), vec![("<", num("3"))]),
            block(vec![
                assign("i", adding(var("i"), vec![("+", num("1"))])),
                print(var("i")),
            ]),
        ),
    ]);
    assert_eq!(printed(prog), vec!["1", "2", "3"]);
}

#[test]
fn if_picks_branch() {
    let choose = |cond: ParseNode| {
        printed(program(vec![if_then(
            cond,
            block(vec![print(string("yes"))]),
            Some(block(vec![print(string("no"))])),
        )]))
    };
    assert_eq!(choose(num("1")), vec!["yes"]);
    assert_eq!(choose(relational(num("2"), vec![("<", num("1"))])), vec!["no"]);
}

#[test]
fn if_without_else_skips() {
    let prog = program(vec![
        if_then(num("0"), block(vec![fd("1")]), None),
        fd("2"),
    ]);
    let (_, canvas) = run(prog);
    assert_eq!(forwards(&canvas), vec![2.0]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Step budget
// ══════════════════════════════════════════════════════════════════════════════

fn budget_error(tree: ParseNode) -> EvalError {
    let config = InterpreterConfig {
        max_steps: Some(100),
        ..InterpreterConfig::default()
    };
    Interpreter::with_config(&tree, config)
        .and_then(|interp| interp.run(&mut RecordingCanvas::new()))
        .expect_err("budget should run out")
}

#[test]
fn empty_while_exhausts_step_budget() {
    let tree = program(vec![while_loop(num("1").at(2, 7), block(vec![]))]);
    assert_eq!(
        budget_error(tree),
        EvalError::StepLimitExhausted {
            limit: 100,
            span: Span::point(2, 7),
        }
    );
}

#[test]
fn empty_repeat_exhausts_step_budget() {
    let tree = program(vec![repeat(num("1e18"), block(vec![]))]);
    assert!(matches!(
        budget_error(tree),
        EvalError::StepLimitExhausted { limit: 100, .. }
    ));
}

#[test]
fn empty_for_exhausts_step_budget() {
    let tree = program(vec![for_loop("i", num("1"), num("1e18"), None, block(vec![]))]);
    assert!(matches!(
        budget_error(tree),
        EvalError::StepLimitExhausted { limit: 100, .. }
    ));
}

#[test]
fn loop_iterations_count_as_steps() {
    let tree = program(vec![repeat(num("3"), block(vec![]))]);
    let (report, _) = run(tree);
    // One for the repeat statement, one per iteration.
    assert_eq!(report.steps, 4);
}

// ══════════════════════════════════════════════════════════════════════════════
// Halt
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn halt_in_innermost_block_stops_every_level() {
    let tree = program(vec![
        block(vec![
            block(vec![
                block(vec![fd("1").at(3, 1), fd("2").at(4, 1)]),
                fd("3").at(5, 1),
            ]),
            fd("4").at(6, 1),
        ]),
        fd("5").at(7, 1),
    ]);
    let interp = halting_interpreter(&tree, 3);
    let mut canvas = RecordingCanvas::new();
    let report = interp.run(&mut canvas).unwrap();
    assert_eq!(report.outcome, ReturnValue::HALT);
    assert_eq!(forwards(&canvas), vec![1.0]);
    assert_eq!(report.scope.depth(), 1);
}

#[test]
fn halt_inside_expression_call_unwinds() {
    let tree = program(vec![
        procedure(
            "f",
            &[],
            block(vec![fd("1").at(2, 1), output(num("5"))]),
        ),
        print(call_expr("f", vec![])),
        fd("9"),
    ]);
    let interp = halting_interpreter(&tree, 2);
    let mut canvas = RecordingCanvas::new();
    let report = interp.run(&mut canvas).unwrap();
    assert!(report.outcome.is_halt());
    assert_eq!(canvas.calls(), &[DrawCall::Forward { distance: 1.0 }]);
}

#[test]
fn halt_from_another_thread_stops_infinite_loop() {
    let tree = program(vec![while_loop(num("1"), block(vec![]))]);
    let interp = Interpreter::new(&tree).unwrap();
    let monitor = interp.halt_monitor();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        monitor.halt();
    });
    let report = interp.run(&mut RecordingCanvas::new()).unwrap();
    stopper.join().unwrap();
    assert_eq!(report.outcome.result, ProcessResult::Halt);
}

#[test]
fn halt_cuts_pause_short() {
    let tree = program(vec![primitive("pause", vec![num("60000")]), fd("1")]);
    let interp = Interpreter::new(&tree).unwrap();
    let monitor = interp.halt_monitor();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        monitor.halt();
    });
    let started = Instant::now();
    let mut canvas = RecordingCanvas::new();
    let report = interp.run(&mut canvas).unwrap();
    stopper.join().unwrap();
    assert!(report.outcome.is_halt());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(canvas.calls().is_empty());
}

#[test]
fn resume_allows_another_run() {
    let tree = program(vec![fd("1")]);
    let interp = Interpreter::new(&tree).unwrap();
    let monitor = interp.halt_monitor();
    monitor.halt();
    let report = interp.run(&mut RecordingCanvas::new()).unwrap();
    assert!(report.outcome.is_halt());

    monitor.resume();
    let mut canvas = RecordingCanvas::new();
    let report = interp.run(&mut canvas).unwrap();
    assert!(report.outcome.is_success());
    assert_eq!(forwards(&canvas), vec![1.0]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn identical_runs_match() {
    let tree = program(vec![
        procedure(
            "spiral",
            &["len"],
            block(vec![if_then(
                relational(var("len"), vec![("<", num("40"))]),
                block(vec![
                    primitive("fd", vec![var("len")]),
                    primitive("rt", vec![num("91")]),
                    call("spiral", vec![adding(var("len"), vec![("+", num("3"))])]),
                ]),
                None,
            )]),
        ),
        primitive("pencolor", vec![num("10"), num("20"), num("30")]),
        call("spiral", vec![var("start")]),
        assign("done", num("1")),
    ]);
    let interp = Interpreter::new(&tree).unwrap();
    let seeded = || {
        let mut scope = Scope::new();
        scope.declare("start", TypedValue::Number(1.0));
        scope
    };

    let mut a = RecordingCanvas::new();
    let mut b = RecordingCanvas::new();
    let first = interp.run_with_scope(seeded(), &mut a).unwrap();
    let second = interp.run_with_scope(seeded(), &mut b).unwrap();

    assert_eq!(a.calls(), b.calls());
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(first.scope.snapshot(), second.scope.snapshot());
    assert_eq!(first.steps, second.steps);
    assert_eq!(forwards(&a).len(), 13);
}
