//! The host drawing/console collaborator.
//!
//! The interpreter only issues named primitives against a [`Canvas`]; it
//! never renders and consumes no return values. [`RecordingCanvas`] keeps
//! the call sequence in memory for tests and replay.

use crate::error::{EvalError, EvalResult};
use crate::value::TypedValue;
use pendown_types::Span;
use serde::Serialize;
use sha2::{Digest, Sha256};

// ══════════════════════════════════════════════════════════════════════════════
// Primitives
// ══════════════════════════════════════════════════════════════════════════════

/// Built-in drawing and console commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Forward,
    Backward,
    Left,
    Right,
    SetXY,
    PenUp,
    PenDown,
    Clear,
    Home,
    PenColor,
    CanvasColor,
    Print,
    Warning,
    Label,
    FontSize,
    FontName,
    FontStyle,
    HideTurtle,
    ShowTurtle,
    Pause,
}

impl Primitive {
    /// Resolve a primitive by any of its names (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let p = match name.to_lowercase().as_str() {
            "forward" | "fd" => Primitive::Forward,
            "back" | "backward" | "bk" => Primitive::Backward,
            "left" | "lt" => Primitive::Left,
            "right" | "rt" => Primitive::Right,
            "setxy" => Primitive::SetXY,
            "penup" | "pu" => Primitive::PenUp,
            "pendown" | "pd" => Primitive::PenDown,
            "clearscreen" | "cs" | "clear" => Primitive::Clear,
            "home" => Primitive::Home,
            "pencolor" | "setpencolor" => Primitive::PenColor,
            "canvascolor" | "setscreencolor" => Primitive::CanvasColor,
            "print" | "pr" | "message" => Primitive::Print,
            "warning" => Primitive::Warning,
            "label" | "drawstring" => Primitive::Label,
            "fontsize" => Primitive::FontSize,
            "fontname" => Primitive::FontName,
            "fontstyle" => Primitive::FontStyle,
            "hideturtle" | "ht" => Primitive::HideTurtle,
            "showturtle" | "st" => Primitive::ShowTurtle,
            "pause" | "wait" => Primitive::Pause,
            _ => return None,
        };
        Some(p)
    }

    /// Accepted argument counts.
    pub fn arities(self) -> &'static [usize] {
        match self {
            Primitive::PenUp
            | Primitive::PenDown
            | Primitive::Clear
            | Primitive::Home
            | Primitive::HideTurtle
            | Primitive::ShowTurtle => &[0],
            Primitive::SetXY => &[2],
            Primitive::PenColor => &[1, 3, 4],
            Primitive::CanvasColor => &[1, 3],
            _ => &[1],
        }
    }

    pub(crate) fn check_arity(self, name: &str, found: usize, span: Span) -> EvalResult<()> {
        let accepted = self.arities();
        if accepted.contains(&found) {
            return Ok(());
        }
        let expected = accepted
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(EvalError::ArityMismatch {
            name: name.to_string(),
            expected,
            found,
            span,
        })
    }
}

/// A pen or background colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// A colour name or `#rrggbb` string, resolved by the host.
    Named(String),
    Rgba(u8, u8, u8, u8),
}

// ══════════════════════════════════════════════════════════════════════════════
// Canvas
// ══════════════════════════════════════════════════════════════════════════════

/// Host-supplied drawing surface and console. All calls are fire-and-forget.
pub trait Canvas {
    fn forward(&mut self, distance: f64);
    fn backward(&mut self, distance: f64);
    fn left(&mut self, angle: f64);
    fn right(&mut self, angle: f64);
    fn set_xy(&mut self, x: f64, y: f64);
    fn pen_up(&mut self);
    fn pen_down(&mut self);
    fn clear(&mut self);
    fn home(&mut self);
    fn pen_color(&mut self, color: Color);
    fn canvas_color(&mut self, color: Color);
    fn draw_string(&mut self, text: &str);
    fn font_size(&mut self, size: i32);
    fn font_name(&mut self, face: &str);
    fn font_style(&mut self, style: i32);
    fn hide_turtle(&mut self);
    fn show_turtle(&mut self);
    /// Console output.
    fn message(&mut self, text: &str);
    /// Console output flagged as a warning.
    fn warning(&mut self, text: &str);
}

fn channel(value: &TypedValue, span: Span) -> EvalResult<u8> {
    Ok(value.as_number(span)?.clamp(0.0, 255.0) as u8)
}

fn color_from(args: &[TypedValue], span: Span) -> EvalResult<Color> {
    match args {
        [TypedValue::String(name)] => Ok(Color::Named(name.clone())),
        [other] => Err(EvalError::TypeMismatch {
            expected: crate::value::ValueType::String,
            found: other.value_type(),
            span,
        }),
        [r, g, b] => Ok(Color::Rgba(
            channel(r, span)?,
            channel(g, span)?,
            channel(b, span)?,
            255,
        )),
        [r, g, b, a] => Ok(Color::Rgba(
            channel(r, span)?,
            channel(g, span)?,
            channel(b, span)?,
            channel(a, span)?,
        )),
        _ => Err(EvalError::malformed("colour needs 1, 3 or 4 arguments", span)),
    }
}

/// Issue `primitive` against the canvas. `Pause` is handled by the caller.
pub(crate) fn dispatch(
    canvas: &mut dyn Canvas,
    primitive: Primitive,
    args: &[TypedValue],
    span: Span,
) -> EvalResult<()> {
    let num = |i: usize| -> EvalResult<f64> {
        args.get(i)
            .ok_or_else(|| EvalError::malformed("missing primitive argument", span))?
            .as_number(span)
    };
    let text = |i: usize| -> EvalResult<String> {
        args.get(i)
            .map(TypedValue::to_string)
            .ok_or_else(|| EvalError::malformed("missing primitive argument", span))
    };
    match primitive {
        Primitive::Forward => canvas.forward(num(0)?),
        Primitive::Backward => canvas.backward(num(0)?),
        Primitive::Left => canvas.left(num(0)?),
        Primitive::Right => canvas.right(num(0)?),
        Primitive::SetXY => canvas.set_xy(num(0)?, num(1)?),
        Primitive::PenUp => canvas.pen_up(),
        Primitive::PenDown => canvas.pen_down(),
        Primitive::Clear => canvas.clear(),
        Primitive::Home => canvas.home(),
        Primitive::PenColor => canvas.pen_color(color_from(args, span)?),
        Primitive::CanvasColor => canvas.canvas_color(color_from(args, span)?),
        Primitive::Print => canvas.message(&text(0)?),
        Primitive::Warning => canvas.warning(&text(0)?),
        Primitive::Label => canvas.draw_string(&text(0)?),
        Primitive::FontSize => canvas.font_size(num(0)? as i32),
        Primitive::FontName => canvas.font_name(&text(0)?),
        Primitive::FontStyle => canvas.font_style(num(0)? as i32),
        Primitive::HideTurtle => canvas.hide_turtle(),
        Primitive::ShowTurtle => canvas.show_turtle(),
        Primitive::Pause => {}
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Recording canvas
// ══════════════════════════════════════════════════════════════════════════════

/// One recorded canvas call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum DrawCall {
    Forward { distance: f64 },
    Backward { distance: f64 },
    Left { angle: f64 },
    Right { angle: f64 },
    SetXY { x: f64, y: f64 },
    PenUp,
    PenDown,
    Clear,
    Home,
    PenColor { color: Color },
    CanvasColor { color: Color },
    DrawString { text: String },
    FontSize { size: i32 },
    FontName { face: String },
    FontStyle { style: i32 },
    HideTurtle,
    ShowTurtle,
    Message { text: String },
    Warning { text: String },
}

/// A canvas that records every call in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Console lines (`message` calls) in order.
    pub fn messages(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Message { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Serialize the call sequence to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.calls).unwrap_or_else(|_| "[]".to_string())
    }

    /// Hex SHA-256 of the serialized call sequence.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.to_json().as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn record(&mut self, call: DrawCall) {
        self.calls.push(call);
    }
}

impl Canvas for RecordingCanvas {
    fn forward(&mut self, distance: f64) {
        self.record(DrawCall::Forward { distance });
    }
    fn backward(&mut self, distance: f64) {
        self.record(DrawCall::Backward { distance });
    }
    fn left(&mut self, angle: f64) {
        self.record(DrawCall::Left { angle });
    }
    fn right(&mut self, angle: f64) {
        self.record(DrawCall::Right { angle });
    }
    fn set_xy(&mut self, x: f64, y: f64) {
        self.record(DrawCall::SetXY { x, y });
    }
    fn pen_up(&mut self) {
        self.record(DrawCall::PenUp);
    }
    fn pen_down(&mut self) {
        self.record(DrawCall::PenDown);
    }
    fn clear(&mut self) {
        self.record(DrawCall::Clear);
    }
    fn home(&mut self) {
        self.record(DrawCall::Home);
    }
    fn pen_color(&mut self, color: Color) {
        self.record(DrawCall::PenColor { color });
    }
    fn canvas_color(&mut self, color: Color) {
        self.record(DrawCall::CanvasColor { color });
    }
    fn draw_string(&mut self, text: &str) {
        self.record(DrawCall::DrawString { text: text.into() });
    }
    fn font_size(&mut self, size: i32) {
        self.record(DrawCall::FontSize { size });
    }
    fn font_name(&mut self, face: &str) {
        self.record(DrawCall::FontName { face: face.into() });
    }
    fn font_style(&mut self, style: i32) {
        self.record(DrawCall::FontStyle { style });
    }
    fn hide_turtle(&mut self) {
        self.record(DrawCall::HideTurtle);
    }
    fn show_turtle(&mut self) {
        self.record(DrawCall::ShowTurtle);
    }
    fn message(&mut self, text: &str) {
        self.record(DrawCall::Message { text: text.into() });
    }
    fn warning(&mut self, text: &str) {
        self.record(DrawCall::Warning { text: text.into() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_aliases_resolve() {
        assert_eq!(Primitive::from_name("FD"), Some(Primitive::Forward));
        assert_eq!(Primitive::from_name("bk"), Some(Primitive::Backward));
        assert_eq!(Primitive::from_name("cs"), Some(Primitive::Clear));
        assert_eq!(Primitive::from_name("PRINT"), Some(Primitive::Print));
        assert_eq!(Primitive::from_name("jump"), None);
    }

    #[test]
    fn test_arity_check() {
        let span = Span::point(1, 1);
        assert!(Primitive::PenColor.check_arity("pencolor", 3, span).is_ok());
        let err = Primitive::SetXY.check_arity("setxy", 1, span).unwrap_err();
        assert_eq!(err.to_string(), "'setxy' expects 2 argument(s), got 1");
    }

    #[test]
    fn test_dispatch_records_calls() {
        let mut canvas = RecordingCanvas::new();
        let span = Span::default();
        dispatch(&mut canvas, Primitive::Forward, &[TypedValue::Number(10.0)], span).unwrap();
        dispatch(
            &mut canvas,
            Primitive::PenColor,
            &[
                TypedValue::Number(300.0),
                TypedValue::Number(0.0),
                TypedValue::Number(12.0),
            ],
            span,
        )
        .unwrap();
        dispatch(&mut canvas, Primitive::Print, &[TypedValue::Number(3.0)], span).unwrap();
        assert_eq!(
            canvas.calls(),
            &[
                DrawCall::Forward { distance: 10.0 },
                DrawCall::PenColor {
                    color: Color::Rgba(255, 0, 12, 255)
                },
                DrawCall::Message { text: "3".into() },
            ]
        );
        assert_eq!(canvas.messages(), vec!["3"]);
    }

    #[test]
    fn test_dispatch_rejects_non_number() {
        let mut canvas = RecordingCanvas::new();
        let err = dispatch(
            &mut canvas,
            Primitive::Forward,
            &[TypedValue::from("far")],
            Span::point(4, 1),
        )
        .unwrap_err();
        assert_eq!(err.span(), Span::point(4, 1));
        assert!(canvas.calls().is_empty());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let mut a = RecordingCanvas::new();
        let mut b = RecordingCanvas::new();
        for canvas in [&mut a, &mut b] {
            canvas.pen_down();
            canvas.forward(5.0);
        }
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        b.left(90.0);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
