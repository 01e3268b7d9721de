//! Control constructs: `for`, `repeat`, `while` and `if`.
//!
//! Each runs with its construct frame already pushed by
//! [`CodeBlock::process`]; loop bodies push one more frame per iteration.
//! A non-SUCCESS body signal ends the loop and is returned unchanged.

use crate::block::{BlockId, CodeBlock, ForLoop};
use crate::error::EvalResult;
use crate::expr;
use crate::runtime::Runtime;
use crate::signal::ReturnValue;
use crate::value::TypedValue;
use pendown_types::ParseNode;

// ══════════════════════════════════════════════════════════════════════════════
// For
// ══════════════════════════════════════════════════════════════════════════════

/// Which way a counted loop moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
    /// Zero step, or equal bounds when inferring.
    Undetermined,
}

impl Direction {
    /// Direction implied by the bounds alone.
    pub fn between(start: f64, stop: f64) -> Self {
        Self::of(stop - start)
    }

    /// Direction of travel for a step.
    pub fn of(step: f64) -> Self {
        if step > 0.0 {
            Direction::Increase
        } else if step < 0.0 {
            Direction::Decrease
        } else {
            Direction::Undetermined
        }
    }
}

/// The values a `for` variable takes: `start`, `start + step`, ... while
/// still within `stop` (inclusive). An undetermined step yields nothing.
#[derive(Debug, Clone)]
pub struct ForRange {
    current: f64,
    stop: f64,
    step: f64,
    direction: Direction,
    started: bool,
    done: bool,
}

impl ForRange {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self {
            current: start,
            stop,
            step,
            direction: Direction::of(step),
            started: false,
            done: false,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl Iterator for ForRange {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.done {
            return None;
        }
        if self.started {
            self.current += self.step;
        }
        self.started = true;
        let within = match self.direction {
            Direction::Increase => self.current <= self.stop,
            Direction::Decrease => self.current >= self.stop,
            Direction::Undetermined => false,
        };
        if within {
            Some(self.current)
        } else {
            self.done = true;
            None
        }
    }
}

pub(crate) fn run_for(
    rt: &mut Runtime<'_>,
    block: &CodeBlock,
    for_loop: &ForLoop,
) -> EvalResult<ReturnValue> {
    let start = expr::evaluate(rt, &for_loop.start)?.as_number(for_loop.start.span)?;
    let stop = expr::evaluate(rt, &for_loop.stop)?.as_number(for_loop.stop.span)?;
    let step = match &for_loop.step {
        Some(step) => expr::evaluate(rt, step)?.as_number(step.span)?,
        None => 1.0,
    };

    let range = ForRange::new(start, stop, step);
    let inferred = Direction::between(start, stop);
    if inferred != Direction::Undetermined && range.direction() != inferred {
        tracing::warn!(
            variable = %for_loop.variable,
            start,
            stop,
            step,
            "for step runs away from its bound"
        );
    }
    tracing::trace!(variable = %for_loop.variable, start, stop, step, "for");

    for value in range {
        rt.tick(block.span())?;
        rt.scope.declare(&for_loop.variable, TypedValue::Number(value));
        let signal = block.run_body(rt)?;
        if !signal.is_success() {
            return Ok(signal);
        }
    }
    Ok(ReturnValue::SUCCESS)
}

// ══════════════════════════════════════════════════════════════════════════════
// Repeat / While / If
// ══════════════════════════════════════════════════════════════════════════════

pub(crate) fn run_repeat(
    rt: &mut Runtime<'_>,
    block: &CodeBlock,
    count: &ParseNode,
) -> EvalResult<ReturnValue> {
    let times = expr::evaluate(rt, count)?.as_number(count.span)?.trunc();
    let mut done = 0.0;
    while done < times {
        if rt.is_halted() {
            return Ok(ReturnValue::HALT);
        }
        rt.tick(count.span)?;
        let signal = block.run_body(rt)?;
        if !signal.is_success() {
            return Ok(signal);
        }
        done += 1.0;
    }
    Ok(ReturnValue::SUCCESS)
}

pub(crate) fn run_while(
    rt: &mut Runtime<'_>,
    block: &CodeBlock,
    condition: &ParseNode,
) -> EvalResult<ReturnValue> {
    loop {
        if rt.is_halted() {
            return Ok(ReturnValue::HALT);
        }
        rt.tick(condition.span)?;
        if !expr::evaluate(rt, condition)?.as_bool(condition.span)? {
            return Ok(ReturnValue::SUCCESS);
        }
        let signal = block.run_body(rt)?;
        if !signal.is_success() {
            return Ok(signal);
        }
    }
}

pub(crate) fn run_if(
    rt: &mut Runtime<'_>,
    condition: &ParseNode,
    then: BlockId,
    otherwise: Option<BlockId>,
) -> EvalResult<ReturnValue> {
    let program = rt.program();
    if expr::evaluate(rt, condition)?.as_bool(condition.span)? {
        program.block(then).process(rt)
    } else if let Some(otherwise) = otherwise {
        program.block(otherwise).process(rt)
    } else {
        Ok(ReturnValue::SUCCESS)
    }
}
