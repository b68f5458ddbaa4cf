// crates/manifest-script/src/ast.rs
// ============================================================================
// Module: Script Syntax Tree
// Description: Tagged-variant tree produced by the script parser.
// Purpose: Give the interpreter a closed set of shapes to walk.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The tree deliberately models only what manifest scripts need: constant
//! assignment, namespaces, attribute assignment, and method calls with an
//! optional block. Every node records the line it starts on.

/// Parsed script: an ordered list of statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Top-level statements in source order.
    pub statements: Vec<Statement>,
}

/// Statement with its starting line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Statement shape.
    pub kind: StatementKind,
    /// 1-based line the statement starts on.
    pub line: usize,
}

/// Statement shapes understood by the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// Bare expression, usually a method call.
    Expression(Expression),
    /// `NAME = value` or `A::NAME = value`.
    ConstantAssign {
        /// Constant path segments.
        path: Vec<String>,
        /// Assigned value.
        value: Expression,
    },
    /// `receiver.attribute = value`.
    AttributeAssign {
        /// Receiver expression.
        receiver: Expression,
        /// Attribute name without the trailing `=`.
        attribute: String,
        /// Assigned value.
        value: Expression,
    },
    /// `name = value`.
    LocalAssign {
        /// Local variable name.
        name: String,
        /// Assigned value.
        value: Expression,
    },
    /// `module A::B ... end` or `class A ... end`.
    Namespace {
        /// Namespace path segments.
        path: Vec<String>,
        /// Statements inside the namespace.
        body: Vec<Statement>,
    },
}

/// Expression shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// String literal, possibly interpolated.
    Str(Vec<StrSegment>),
    /// Numeric literal kept as source text.
    Number(String),
    /// `nil`
    Nil,
    /// `true` or `false`
    Bool(bool),
    /// `[a, b, ...]`
    Array(Vec<Expression>),
    /// Constant reference such as `VERSION` or `Gem::Specification`.
    Constant(Vec<String>),
    /// Method call, with or without a receiver.
    Call(Box<Call>),
}

/// Piece of an interpolated string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrSegment {
    /// Literal text.
    Text(String),
    /// Embedded expression from `#{...}`.
    Interpolated(Expression),
}

/// Method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Receiver, or `None` for a bare call or local reference.
    pub receiver: Option<Expression>,
    /// Method name.
    pub method: String,
    /// Positional arguments.
    pub args: Vec<Expression>,
    /// Whether the call was written with an argument list.
    pub has_args: bool,
    /// Attached `do ... end` or `{ ... }` block.
    pub block: Option<Block>,
    /// 1-based line of the method name.
    pub line: usize,
}

/// Block attached to a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block parameter names.
    pub params: Vec<String>,
    /// Statements inside the block.
    pub body: Vec<Statement>,
    /// Line of the block opener.
    pub line: usize,
}
