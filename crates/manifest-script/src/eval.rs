// crates/manifest-script/src/eval.rs
// ============================================================================
// Module: Script Interpreter
// Description: Capability-allowlisted walker over the script syntax tree.
// Purpose: Execute manifest scripts against a specification builder target.
// Dependencies: crate::{ast, error, parser}, thiserror
// ============================================================================

//! ## Overview
//! The interpreter runs a parsed script with no ambient capabilities. The only
//! effects a script can have are:
//! - attribute writes and method calls on the single specification object
//!   created by `Gem::Specification.new`, forwarded to a
//!   [`SpecificationTarget`];
//! - constant definitions, resolved lexically through `module` namespaces;
//! - file inclusion through `require_relative` or `require "./path"`,
//!   delegated to an [`IncludeResolver`].
//!
//! Anything else fails with an evaluation error naming the offending method
//! or constant. Included files are evaluated once; a file that includes one
//! of its own includers fails with a cyclic-include error.
//! Security posture: script input is untrusted; include depth is bounded.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::ast::Block;
use crate::ast::Call;
use crate::ast::Expression;
use crate::ast::Program;
use crate::ast::Statement;
use crate::ast::StatementKind;
use crate::ast::StrSegment;
use crate::error::ScriptError;
use crate::error::ScriptResult;
use crate::parser::parse_program;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum depth of nested file inclusion.
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// Constant path of the specification constructor receiver.
const SPECIFICATION_CONSTANT: [&str; 2] = ["Gem", "Specification"];

// ============================================================================
// SECTION: Values
// ============================================================================

/// Runtime value produced by script expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `nil`
    Nil,
    /// `true` or `false`
    Bool(bool),
    /// Numeric literal, kept as written.
    Number(String),
    /// String value.
    Str(String),
    /// Array value.
    List(Vec<Value>),
}

impl Value {
    /// Returns the class name used in error messages.
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Nil => "NilClass",
            Self::Bool(true) => "TrueClass",
            Self::Bool(false) => "FalseClass",
            Self::Number(raw) => {
                if raw.contains('.') { "Float" } else { "Integer" }
            }
            Self::Str(_) => "String",
            Self::List(_) => "Array",
        }
    }

    /// Returns the inspected form (`"text"`, `nil`, `["a", 1]`).
    #[must_use]
    pub fn inspect(&self) -> String {
        match self {
            Self::Nil => "nil".to_string(),
            Self::Str(text) => format!("\"{}\"", text.escape_debug()),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::inspect).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Bool(_) | Self::Number(_) => self.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => Ok(()),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Number(raw) => f.write_str(&raw.replace('_', "")),
            Self::Str(text) => f.write_str(text),
            Self::List(_) => f.write_str(&self.inspect()),
        }
    }
}

// ============================================================================
// SECTION: Capability Seams
// ============================================================================

/// Failure reported by a [`SpecificationTarget`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// The target does not expose the requested method.
    #[error("undefined method")]
    UndefinedMethod,
    /// The method exists but rejected its arguments.
    #[error("{0}")]
    Invalid(String),
}

/// Builder that receives the effects of a specification block.
///
/// Implement this for the manifest model being populated; the interpreter
/// forwards `s.attr = value` to [`assign`](Self::assign) and `s.method(args)`
/// to [`invoke`](Self::invoke).
pub trait SpecificationTarget {
    /// Handles `receiver.attribute = value`.
    ///
    /// # Errors
    /// Returns [`TargetError::UndefinedMethod`] for attributes the target does
    /// not accept, or [`TargetError::Invalid`] for unusable values.
    fn assign(&mut self, attribute: &str, value: Value) -> Result<(), TargetError>;

    /// Handles `receiver.method(args...)`.
    ///
    /// # Errors
    /// Returns [`TargetError::UndefinedMethod`] for methods the target does
    /// not expose, or [`TargetError::Invalid`] for unusable arguments.
    fn invoke(&mut self, method: &str, args: Vec<Value>) -> Result<(), TargetError>;
}

/// Form of an include request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    /// `require_relative "path"`: resolved against the including file.
    Relative,
    /// `require "./path"`: resolved against the including file's directory.
    Require,
}

/// Include request raised by a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRequest<'a> {
    /// Request form.
    pub kind: IncludeKind,
    /// Requested path exactly as written.
    pub target: &'a str,
    /// Line of the request in the including file.
    pub line: usize,
}

/// Locates and loads files pulled in by scripts.
pub trait IncludeResolver {
    /// Maps a request made from `from` to the identity of the included file.
    ///
    /// The returned path is used for cycle and repeat detection, so equal
    /// files must map to equal paths.
    ///
    /// # Errors
    /// Returns an evaluation [`ScriptError`] when the file cannot be found.
    fn locate(&self, from: &Path, request: &IncludeRequest<'_>) -> ScriptResult<PathBuf>;

    /// Loads and decodes the located file.
    ///
    /// # Errors
    /// Returns [`ScriptError`] when the file cannot be read or decoded;
    /// decoding errors should carry `path`.
    fn load(&self, path: &Path) -> ScriptResult<String>;
}

/// Resolver that refuses every include.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn locate(&self, _from: &Path, request: &IncludeRequest<'_>) -> ScriptResult<PathBuf> {
        Err(ScriptError::evaluation(
            format!("cannot load such file -- {}", request.target),
            request.line,
        ))
    }

    fn load(&self, path: &Path) -> ScriptResult<String> {
        Err(ScriptError::evaluation(format!("cannot load such file -- {}", path.display()), 0))
    }
}

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Summary of a successful script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    /// Line of the `Gem::Specification.new` call in the root file.
    pub specification_line: usize,
    /// Included files in load order.
    pub included: Vec<PathBuf>,
}

/// Parses and evaluates a script.
///
/// # Arguments
/// * `source` - Decoded script text.
/// * `path` - Path of the script, used for error attribution and includes.
/// * `target` - Builder receiving the specification block's effects.
/// * `resolver` - Include resolver.
///
/// # Errors
/// Returns [`ScriptError`] for syntax failures, unsupported constructs,
/// undefined names, include failures, and a missing or repeated
/// specification block. Every returned error carries a path.
pub fn evaluate<T, R>(
    source: &str,
    path: &Path,
    target: &mut T,
    resolver: &R,
) -> ScriptResult<ScriptOutcome>
where
    T: SpecificationTarget,
    R: IncludeResolver,
{
    let program = parse_program(source).map_err(|err| err.attributed_to(path, 0))?;
    let mut interpreter = Interpreter {
        target,
        resolver,
        constants: BTreeMap::new(),
        include_stack: vec![path.to_path_buf()],
        loaded: BTreeSet::from([path.to_path_buf()]),
        included: Vec::new(),
        specification: None,
    };
    interpreter.run_file(&program, path)?;
    let Some((spec_path, specification_line)) = interpreter.specification else {
        return Err(ScriptError::evaluation(
            "manifest does not define a Gem::Specification",
            0,
        )
        .attributed_to(path, 0));
    };
    if spec_path.as_path() != path {
        return Err(ScriptError::evaluation(
            "Gem::Specification.new must be called from the manifest itself",
            specification_line,
        )
        .attributed_to(&spec_path, 0));
    }
    Ok(ScriptOutcome {
        specification_line,
        included: interpreter.included,
    })
}

// ============================================================================
// SECTION: Interpreter
// ============================================================================

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Evaluated {
    /// Plain value.
    Value(Value),
    /// The specification object under construction.
    Specification,
}

/// Local variable binding.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    /// Plain value.
    Value(Value),
    /// Handle to the specification object.
    Specification,
}

/// Lexical scope for one file, namespace, or block.
#[derive(Debug, Default)]
struct Scope {
    /// Enclosing namespace path.
    namespace: Vec<String>,
    /// Local variable layers; blocks push a layer that sees outer layers.
    locals: Vec<BTreeMap<String, Binding>>,
}

impl Scope {
    /// Creates a scope with a single empty local layer.
    fn new(namespace: Vec<String>) -> Self {
        Self {
            namespace,
            locals: vec![BTreeMap::new()],
        }
    }

    /// Looks up a local through all layers, innermost first.
    fn local(&self, name: &str) -> Option<&Binding> {
        self.locals.iter().rev().find_map(|layer| layer.get(name))
    }

    /// Binds a local in the innermost layer that already holds it, or the
    /// innermost layer otherwise.
    fn bind(&mut self, name: &str, binding: Binding) {
        if let Some(layer) = self.locals.iter_mut().rev().find(|layer| layer.contains_key(name)) {
            layer.insert(name.to_string(), binding);
        } else if let Some(layer) = self.locals.last_mut() {
            layer.insert(name.to_string(), binding);
        }
    }
}

/// Interpreter state shared across all files of one evaluation.
struct Interpreter<'a, T, R> {
    /// Specification builder.
    target: &'a mut T,
    /// Include resolver.
    resolver: &'a R,
    /// Defined constants keyed by full `A::B` path.
    constants: BTreeMap<String, Value>,
    /// Files currently being evaluated, outermost first.
    include_stack: Vec<PathBuf>,
    /// Files evaluated so far.
    loaded: BTreeSet<PathBuf>,
    /// Included files in load order.
    included: Vec<PathBuf>,
    /// File and line of the specification constructor, once seen.
    specification: Option<(PathBuf, usize)>,
}

impl<T, R> Interpreter<'_, T, R>
where
    T: SpecificationTarget,
    R: IncludeResolver,
{
    /// Runs a file's top-level statements in a fresh scope.
    fn run_file(&mut self, program: &Program, path: &Path) -> ScriptResult<()> {
        let mut scope = Scope::new(Vec::new());
        self.run_statements(&program.statements, &mut scope, path)
            .map_err(|err| err.attributed_to(path, 0))
    }

    /// Runs statements in order, stopping at the first failure.
    fn run_statements(
        &mut self,
        statements: &[Statement],
        scope: &mut Scope,
        path: &Path,
    ) -> ScriptResult<()> {
        for statement in statements {
            self.run_statement(statement, scope, path)?;
        }
        Ok(())
    }

    /// Runs one statement.
    fn run_statement(
        &mut self,
        statement: &Statement,
        scope: &mut Scope,
        path: &Path,
    ) -> ScriptResult<()> {
        let line = statement.line;
        match &statement.kind {
            StatementKind::Expression(expression) => {
                self.eval(expression, scope, path, line)?;
            }
            StatementKind::ConstantAssign {
                path: constant,
                value,
            } => {
                let value = self.eval_value(value, scope, path, line)?;
                let key = join_path(scope.namespace.iter().chain(constant.iter()));
                self.constants.insert(key, value);
            }
            StatementKind::AttributeAssign {
                receiver,
                attribute,
                value,
            } => {
                let receiver = self.eval(receiver, scope, path, line)?;
                let value = self.eval_value(value, scope, path, line)?;
                match receiver {
                    Evaluated::Specification => {
                        self.target.assign(attribute, value).map_err(|err| {
                            target_failure(err, &format!("{attribute}="), line)
                        })?;
                    }
                    Evaluated::Value(other) => {
                        return Err(undefined_method(&format!("{attribute}="), &other, line));
                    }
                }
            }
            StatementKind::LocalAssign {
                name,
                value,
            } => {
                let binding = match self.eval(value, scope, path, line)? {
                    Evaluated::Value(value) => Binding::Value(value),
                    Evaluated::Specification => Binding::Specification,
                };
                scope.bind(name, binding);
            }
            StatementKind::Namespace {
                path: namespace,
                body,
            } => {
                let mut full = scope.namespace.clone();
                full.extend(namespace.iter().cloned());
                let mut inner = Scope::new(full);
                self.run_statements(body, &mut inner, path)?;
            }
        }
        Ok(())
    }

    /// Evaluates an expression that must produce a plain value.
    fn eval_value(
        &mut self,
        expression: &Expression,
        scope: &mut Scope,
        path: &Path,
        line: usize,
    ) -> ScriptResult<Value> {
        match self.eval(expression, scope, path, line)? {
            Evaluated::Value(value) => Ok(value),
            Evaluated::Specification => Err(ScriptError::evaluation(
                "the specification object cannot be used as a value",
                line,
            )),
        }
    }

    /// Evaluates an expression.
    fn eval(
        &mut self,
        expression: &Expression,
        scope: &mut Scope,
        path: &Path,
        line: usize,
    ) -> ScriptResult<Evaluated> {
        match expression {
            Expression::Str(segments) => {
                let mut text = String::new();
                for segment in segments {
                    match segment {
                        StrSegment::Text(part) => text.push_str(part),
                        StrSegment::Interpolated(inner) => {
                            let value = self.eval_value(inner, scope, path, line)?;
                            text.push_str(&value.to_string());
                        }
                    }
                }
                Ok(Evaluated::Value(Value::Str(text)))
            }
            Expression::Number(raw) => Ok(Evaluated::Value(Value::Number(raw.clone()))),
            Expression::Nil => Ok(Evaluated::Value(Value::Nil)),
            Expression::Bool(flag) => Ok(Evaluated::Value(Value::Bool(*flag))),
            Expression::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_value(item, scope, path, line)?);
                }
                Ok(Evaluated::Value(Value::List(values)))
            }
            Expression::Constant(constant) => {
                self.lookup_constant(constant, scope, line).map(Evaluated::Value)
            }
            Expression::Call(call) => self.eval_call(call, scope, path),
        }
    }

    /// Resolves a constant lexically through the enclosing namespaces.
    fn lookup_constant(
        &self,
        constant: &[String],
        scope: &Scope,
        line: usize,
    ) -> ScriptResult<Value> {
        for depth in (0 ..= scope.namespace.len()).rev() {
            let key = join_path(scope.namespace[.. depth].iter().chain(constant.iter()));
            if let Some(value) = self.constants.get(&key) {
                return Ok(value.clone());
            }
        }
        Err(ScriptError::evaluation(
            format!("uninitialized constant {}", join_path(constant.iter())),
            line,
        ))
    }

    /// Evaluates a method call.
    fn eval_call(&mut self, call: &Call, scope: &mut Scope, path: &Path) -> ScriptResult<Evaluated> {
        let line = call.line;
        let Some(receiver) = &call.receiver else {
            return self.eval_bare_call(call, scope, path);
        };

        if call.method == "new" && is_specification_constant(receiver) {
            return self.construct_specification(call, scope, path);
        }

        let receiver = self.eval(receiver, scope, path, line)?;
        if let Some(block) = &call.block {
            return Err(ScriptError::evaluation(
                format!("unexpected block passed to `{}'", call.method),
                block.line,
            ));
        }
        match receiver {
            Evaluated::Specification => {
                let args = self.eval_args(&call.args, scope, path, line)?;
                self.target
                    .invoke(&call.method, args)
                    .map_err(|err| target_failure(err, &call.method, line))?;
                Ok(Evaluated::Value(Value::Nil))
            }
            Evaluated::Value(value) => {
                if !call.args.is_empty() {
                    return Err(undefined_method(&call.method, &value, line));
                }
                match call.method.as_str() {
                    "freeze" | "dup" => Ok(Evaluated::Value(value)),
                    "to_s" => Ok(Evaluated::Value(Value::Str(value.to_string()))),
                    _ => Err(undefined_method(&call.method, &value, line)),
                }
            }
        }
    }

    /// Evaluates a call without a receiver: a local, an include, or an error.
    fn eval_bare_call(
        &mut self,
        call: &Call,
        scope: &mut Scope,
        path: &Path,
    ) -> ScriptResult<Evaluated> {
        let line = call.line;
        if !call.has_args && call.block.is_none() {
            match scope.local(&call.method) {
                Some(Binding::Value(value)) => return Ok(Evaluated::Value(value.clone())),
                Some(Binding::Specification) => return Ok(Evaluated::Specification),
                None => {}
            }
        }

        let kind = match call.method.as_str() {
            "require_relative" => IncludeKind::Relative,
            "require" => IncludeKind::Require,
            _ if call.has_args || call.block.is_some() => {
                return Err(ScriptError::evaluation(
                    format!("undefined method `{}' for main:Object", call.method),
                    line,
                ));
            }
            _ => {
                return Err(ScriptError::evaluation(
                    format!("undefined local variable or method `{}' for main:Object", call.method),
                    line,
                ));
            }
        };
        let args = self.eval_args(&call.args, scope, path, line)?;
        let [Value::Str(target)] = args.as_slice() else {
            return Err(ScriptError::evaluation(
                format!("wrong arguments for `{}' (expected one string)", call.method),
                line,
            ));
        };
        if kind == IncludeKind::Require && !is_path_like(target) {
            return Err(ScriptError::evaluation(
                format!("cannot load such file -- {target}"),
                line,
            ));
        }
        let request = IncludeRequest {
            kind,
            target: target.as_str(),
            line,
        };
        self.include(path, &request).map(|loaded| Evaluated::Value(Value::Bool(loaded)))
    }

    /// Evaluates an included file unless it was already loaded.
    fn include(&mut self, from: &Path, request: &IncludeRequest<'_>) -> ScriptResult<bool> {
        if self.include_stack.len() >= MAX_INCLUDE_DEPTH {
            return Err(ScriptError::evaluation(
                format!("include depth exceeds limit (max {MAX_INCLUDE_DEPTH})"),
                request.line,
            ));
        }
        let located = self.resolver.locate(from, request)?;
        if self.include_stack.contains(&located) {
            let mut chain: Vec<String> =
                self.include_stack.iter().map(|p| p.display().to_string()).collect();
            chain.push(located.display().to_string());
            return Err(ScriptError::evaluation(
                format!("cyclic include detected: {}", chain.join(" -> ")),
                request.line,
            ));
        }
        if self.loaded.contains(&located) {
            return Ok(false);
        }

        let text =
            self.resolver.load(&located).map_err(|err| err.attributed_to(from, request.line))?;
        let program = parse_program(&text).map_err(|err| err.attributed_to(&located, 0))?;
        self.loaded.insert(located.clone());
        self.included.push(located.clone());
        self.include_stack.push(located.clone());
        let result = self.run_file(&program, &located);
        self.include_stack.pop();
        result.map(|()| true)
    }

    /// Runs `Gem::Specification.new` and its block.
    fn construct_specification(
        &mut self,
        call: &Call,
        scope: &mut Scope,
        path: &Path,
    ) -> ScriptResult<Evaluated> {
        let line = call.line;
        if let Some((_, first)) = &self.specification {
            return Err(ScriptError::evaluation(
                format!("manifest defines more than one Gem::Specification (first on line {first})"),
                line,
            ));
        }
        if !call.args.is_empty() {
            return Err(ScriptError::evaluation(
                "Gem::Specification.new takes no arguments",
                line,
            ));
        }
        self.specification = Some((path.to_path_buf(), line));
        if let Some(block) = &call.block {
            self.run_specification_block(block, scope, path)?;
        }
        Ok(Evaluated::Specification)
    }

    /// Runs the specification block with its parameter bound to the builder.
    fn run_specification_block(
        &mut self,
        block: &Block,
        scope: &mut Scope,
        path: &Path,
    ) -> ScriptResult<()> {
        if block.params.len() > 1 {
            return Err(ScriptError::evaluation(
                "Gem::Specification.new block takes a single parameter",
                block.line,
            ));
        }
        let mut layer = BTreeMap::new();
        if let Some(param) = block.params.first() {
            layer.insert(param.clone(), Binding::Specification);
        }
        scope.locals.push(layer);
        let result = self.run_statements(&block.body, scope, path);
        scope.locals.pop();
        result
    }

    /// Evaluates call arguments to plain values.
    fn eval_args(
        &mut self,
        args: &[Expression],
        scope: &mut Scope,
        path: &Path,
        line: usize,
    ) -> ScriptResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_value(arg, scope, path, line)?);
        }
        Ok(values)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Joins constant segments with `::`.
fn join_path<'s>(segments: impl Iterator<Item = &'s String>) -> String {
    segments.map(String::as_str).collect::<Vec<_>>().join("::")
}

/// Returns true when the expression is the `Gem::Specification` constant.
fn is_specification_constant(expression: &Expression) -> bool {
    matches!(
        expression,
        Expression::Constant(path) if path.iter().map(String::as_str).eq(SPECIFICATION_CONSTANT)
    )
}

/// Returns true for `require` targets that name a file rather than a library.
fn is_path_like(target: &str) -> bool {
    target.starts_with("./") || target.starts_with("../") || target.starts_with('/')
}

/// Builds an undefined-method error for a plain value receiver.
fn undefined_method(method: &str, receiver: &Value, line: usize) -> ScriptError {
    let message = match receiver {
        Value::Nil => format!("undefined method `{method}' for nil"),
        other => format!("undefined method `{method}' for an instance of {}", other.class_name()),
    };
    ScriptError::evaluation(message, line)
}

/// Converts a target failure into an evaluation error.
fn target_failure(err: TargetError, method: &str, line: usize) -> ScriptError {
    match err {
        TargetError::UndefinedMethod => ScriptError::evaluation(
            format!("undefined method `{method}' for an instance of Gem::Specification"),
            line,
        ),
        TargetError::Invalid(message) => ScriptError::evaluation(message, line),
    }
}
