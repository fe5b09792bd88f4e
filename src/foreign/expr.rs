//! Expression tree of the foreign header dialect.
//!
//! Only the expression subset that can appear in macro bodies and record
//! defaults is represented.

use crate::ast::{Span, Spanned};

pub type ForeignNode = Spanned<ForeignExpr>;

#[derive(Debug, Clone, PartialEq)]
pub enum ForeignExpr {
    Var(String),
    Atom(String),
    Integer(i64),
    Float(f64),
    Str(String),
    Char(char),
    /// `[]`
    Nil,
    /// Argument reference captured from the macro call site.
    Unquote(String),
    /// `[A, B | Tail]`; `tail` is `None` for a proper list.
    List {
        items: Vec<ForeignNode>,
        tail: Option<Box<ForeignNode>>,
    },
    Tuple(Vec<ForeignNode>),
    BinaryOp {
        op: String,
        lhs: Box<ForeignNode>,
        rhs: Box<ForeignNode>,
    },
    UnaryOp {
        op: String,
        operand: Box<ForeignNode>,
    },
    /// `F(Args)`
    Call {
        target: Box<ForeignNode>,
        args: Vec<ForeignNode>,
    },
    /// `M:F(Args)`
    RemoteCall {
        module: Box<ForeignNode>,
        function: Box<ForeignNode>,
        args: Vec<ForeignNode>,
    },
    /// `#name{field = Value, ...}`
    Record {
        name: String,
        fields: Vec<(String, ForeignNode)>,
    },
    /// `begin E1, E2 end`
    Block(Vec<ForeignNode>),
}

impl ForeignExpr {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            ForeignExpr::Atom(_)
                | ForeignExpr::Integer(_)
                | ForeignExpr::Float(_)
                | ForeignExpr::Str(_)
                | ForeignExpr::Char(_)
                | ForeignExpr::Nil
        )
    }
}

pub fn node(expr: ForeignExpr, span: Span) -> ForeignNode {
    Spanned { value: expr, span }
}

/// Span running from the start of `a` to the end of `b`.
pub fn join_spans(a: Span, b: Span) -> Span {
    Span {
        start: a.start.min(b.start),
        end: a.end.max(b.end),
    }
}
