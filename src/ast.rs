//! Abstract Syntax Tree types for JavaScript
//!
//! Every composite node sits behind an `Rc` so that evaluator frames can hold
//! on to the node they are executing without borrowing the tree. Cloning a
//! `Statement` or an `Expression` is therefore always cheap.

use std::rc::Rc;

use crate::lexer::Span;
use crate::value::{CheapClone, JsString};

/// A complete program (script or module)
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Rc<[Statement]>,
    pub source_type: SourceType,
    pub strict: bool,
    pub scope: Rc<VarScope>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Script,
    Module,
}

// ============ SCOPES ============

/// Declarations hoisted to the top of a function body, script or module
#[derive(Debug, Clone, Default)]
pub struct VarScope {
    /// `var` names declared anywhere in the body (nested blocks included)
    pub var_names: Vec<JsString>,
    /// Top-level function declarations, last one per name wins
    pub functions: Vec<Rc<FunctionNode>>,
    /// Top-level `let`/`const`
    pub lexical: Vec<LexicalName>,
    /// Names of functions declared in nested blocks (sloppy-mode var copies)
    pub block_functions: Vec<JsString>,
}

/// Lexically scoped declarations of a block or switch case block
#[derive(Debug, Clone, Default)]
pub struct BlockScope {
    pub lexical: Vec<LexicalName>,
    pub functions: Vec<Rc<FunctionNode>>,
}

impl BlockScope {
    pub fn is_empty(&self) -> bool {
        self.lexical.is_empty() && self.functions.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LexicalName {
    pub name: JsString,
    pub constant: bool,
}

// ============ STATEMENTS ============

#[derive(Debug, Clone)]
pub enum Statement {
    // Declarations
    VariableDeclaration(Rc<VariableDeclaration>),
    FunctionDeclaration(Rc<FunctionNode>),

    // Control Flow
    Block(Rc<BlockStatement>),
    If(Rc<IfStatement>),
    Switch(Rc<SwitchStatement>),
    For(Rc<ForStatement>),
    ForIn(Rc<ForInOfStatement>),
    ForOf(Rc<ForInOfStatement>),
    While(Rc<WhileStatement>),
    DoWhile(Rc<WhileStatement>),
    Try(Rc<TryStatement>),
    With(Rc<WithStatement>),
    Labeled(Rc<LabeledStatement>),

    // Jump
    Return(Option<Expression>, Span),
    Break(Option<JsString>, Span),
    Continue(Option<JsString>, Span),
    Throw(Expression, Span),

    // Module
    Import(Rc<ImportDeclaration>),
    Export(Rc<ExportDeclaration>),

    // Other
    Expression(Expression, Span),
    Empty,
    Debugger,
}

impl CheapClone for Statement {}

#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub body: Rc<[Statement]>,
    /// None when the block declares nothing lexically
    pub scope: Option<Rc<BlockScope>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub kind: VariableKind,
    pub declarations: Vec<VariableDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Let,
    Const,
    Var,
}

#[derive(Debug, Clone)]
pub struct VariableDeclarator {
    pub id: Pattern,
    pub init: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Statement,
    pub alternate: Option<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
    pub scope: Option<Rc<BlockScope>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// None for `default:`
    pub test: Option<Expression>,
    pub consequent: Rc<[Statement]>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Statement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Variable(Rc<VariableDeclaration>),
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub struct ForInOfStatement {
    pub left: ForInOfLeft,
    pub right: Expression,
    pub body: Statement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ForInOfLeft {
    /// `for (var x of ..)`, `for (const [a, b] of ..)`
    Variable(VariableKind, Pattern),
    /// `for (x of ..)`, `for (obj.prop in ..)`, `for ([a, b] of ..)`
    Pattern(Pattern),
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Statement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TryStatement {
    pub block: Rc<BlockStatement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Rc<BlockStatement>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Rc<BlockStatement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WithStatement {
    pub object: Expression,
    pub body: Statement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LabeledStatement {
    pub label: JsString,
    pub body: Statement,
    pub span: Span,
}

// Module declarations

#[derive(Debug, Clone)]
pub struct ImportDeclaration {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: JsString,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ImportSpecifier {
    /// `import { imported as local }`
    Named { imported: JsString, local: JsString },
    /// `import local from ..`
    Default { local: JsString },
    /// `import * as local from ..`
    Namespace { local: JsString },
}

impl ImportSpecifier {
    pub fn local(&self) -> &JsString {
        match self {
            ImportSpecifier::Named { local, .. }
            | ImportSpecifier::Default { local }
            | ImportSpecifier::Namespace { local } => local,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExportDeclaration {
    /// `export { a, b as c }` or `export { a } from "mod"`
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<JsString>,
    },
    /// `export var/let/const/function ..`
    Declaration(Statement),
    /// `export default <expression>`
    DefaultExpression(Expression),
    /// `export default function ..` (hoisted like a declaration)
    DefaultFunction(Rc<FunctionNode>),
    /// `export * from "mod"` / `export * as ns from "mod"`
    All {
        source: JsString,
        alias: Option<JsString>,
    },
}

#[derive(Debug, Clone)]
pub struct ExportSpecifier {
    pub local: JsString,
    pub exported: JsString,
}

// ============ EXPRESSIONS ============

#[derive(Debug, Clone)]
pub enum Expression {
    // Literals
    Literal(LiteralValue, Span),
    Template(Rc<TemplateLiteral>),
    Array(Rc<ArrayExpression>),
    Object(Rc<ObjectExpression>),
    Function(Rc<FunctionNode>),
    ArrowFunction(Rc<FunctionNode>),

    // Identifiers
    Identifier(Identifier),
    This(Span),
    NewTarget(Span),

    // Operations
    Unary(Rc<UnaryExpression>),
    Binary(Rc<BinaryExpression>),
    Logical(Rc<LogicalExpression>),
    Conditional(Rc<ConditionalExpression>),
    Assignment(Rc<AssignmentExpression>),
    Update(Rc<UpdateExpression>),
    Sequence(Rc<[Expression]>, Span),

    // Access
    Member(Rc<MemberExpression>),
    OptionalChain(Rc<Expression>, Span),
    Call(Rc<CallExpression>),
    New(Rc<CallExpression>),

    // Suspension
    Yield(Rc<YieldExpression>),
    Await(Rc<Expression>, Span),
}

impl CheapClone for Expression {}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal(_, s)
            | Expression::This(s)
            | Expression::NewTarget(s)
            | Expression::Sequence(_, s)
            | Expression::OptionalChain(_, s)
            | Expression::Await(_, s) => *s,
            Expression::Template(t) => t.span,
            Expression::Array(a) => a.span,
            Expression::Object(o) => o.span,
            Expression::Function(f) | Expression::ArrowFunction(f) => f.span,
            Expression::Identifier(i) => i.span,
            Expression::Unary(u) => u.span,
            Expression::Binary(b) => b.span,
            Expression::Logical(l) => l.span,
            Expression::Conditional(c) => c.span,
            Expression::Assignment(a) => a.span,
            Expression::Update(u) => u.span,
            Expression::Member(m) => m.span,
            Expression::Call(c) | Expression::New(c) => c.span,
            Expression::Yield(y) => y.span,
        }
    }

    /// IsAnonymousFunctionDefinition: the expression creates a function that
    /// takes its name from the binding or property it is assigned to.
    pub fn is_anonymous_function_definition(&self) -> bool {
        match self {
            Expression::Function(f) => f.id.is_none(),
            Expression::ArrowFunction(_) => true,
            _ => false,
        }
    }

    /// Short source-like description used in "x is not a function" messages
    pub fn describe(&self) -> String {
        match self {
            Expression::Identifier(id) => id.name.to_string(),
            Expression::This(_) => "this".to_string(),
            Expression::Member(m) => match &m.property {
                MemberProperty::Identifier(name) => format!("{}.{}", m.object.describe(), name),
                MemberProperty::Expression(_) => format!("{}[...]", m.object.describe()),
            },
            Expression::Call(c) => format!("{}(...)", c.callee.describe()),
            Expression::OptionalChain(inner, _) => inner.describe(),
            Expression::Literal(LiteralValue::String(s), _) => format!("\"{}\"", s),
            Expression::Literal(LiteralValue::Number(n), _) => crate::value::number_to_string(*n),
            Expression::Literal(LiteralValue::Boolean(b), _) => b.to_string(),
            Expression::Literal(LiteralValue::Null, _) => "null".to_string(),
            _ => "expression".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: JsString,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TemplateLiteral {
    /// Cooked text chunks; always one more than `expressions`
    pub quasis: Vec<JsString>,
    pub expressions: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ArrayExpression {
    /// None marks an elision (`[1, , 3]`)
    pub elements: Vec<Option<ArrayElement>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ArrayElement {
    Expression(Expression),
    Spread(Expression),
}

#[derive(Debug, Clone)]
pub struct ObjectExpression {
    pub properties: Vec<ObjectMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ObjectMember {
    /// `key: value` and shorthand `key`
    Property {
        key: PropertyName,
        value: Expression,
        shorthand: bool,
    },
    /// `key() {}`, `get key() {}`, `set key(v) {}`
    Method {
        key: PropertyName,
        function: Rc<FunctionNode>,
        kind: MethodKind,
    },
    /// `...source`
    Spread(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Get,
    Set,
}

/// Property name in object literals and object patterns
#[derive(Debug, Clone)]
pub enum PropertyName {
    /// Identifier, string and numeric keys, resolved to their string form
    Static(JsString),
    Computed(Expression),
}

/// A function of any flavour: declaration, expression, arrow, method or accessor
#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub id: Option<Identifier>,
    pub params: Rc<[Pattern]>,
    pub rest: Option<Pattern>,
    pub body: FunctionBody,
    pub kind: FunctionKind,
    pub generator: bool,
    pub async_: bool,
    pub strict: bool,
    pub scope: Rc<VarScope>,
    /// Names bound by the parameter list
    pub param_names: Rc<[JsString]>,
    /// Plain identifiers only (no defaults, patterns or rest)
    pub simple_params: bool,
    /// Value of the function's `length` property
    pub length: u32,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Rc<[Statement]>),
    /// Concise arrow body
    Expression(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Normal,
    Arrow,
    Method,
    Getter,
    Setter,
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub operator: UnaryOp,
    pub argument: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,  // -
    Plus,   // +
    Not,    // !
    BitNot, // ~
    Typeof, // typeof
    Void,   // void
    Delete, // delete
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub operator: BinaryOp,
    pub left: Expression,
    pub right: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Mod, // %
    Exp, // **

    // Comparison
    Eq,          // ==
    NotEq,       // !=
    StrictEq,    // ===
    StrictNotEq, // !==
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=

    // Bitwise
    BitAnd,  // &
    BitOr,   // |
    BitXor,  // ^
    LShift,  // <<
    RShift,  // >>
    URShift, // >>>

    // Other
    In,         // in
    Instanceof, // instanceof
}

#[derive(Debug, Clone)]
pub struct LogicalExpression {
    pub operator: LogicalOp,
    pub left: Expression,
    pub right: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,               // &&
    Or,                // ||
    NullishCoalescing, // ??
}

#[derive(Debug, Clone)]
pub struct ConditionalExpression {
    pub test: Expression,
    pub consequent: Expression,
    pub alternate: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct AssignmentExpression {
    pub operator: AssignmentOp,
    pub target: AssignmentTarget,
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum AssignmentTarget {
    /// Identifier or member expression
    Simple(Expression),
    /// Destructuring assignment (`[a, b] = ..`, `({ a } = ..)`)
    Pattern(Pattern),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOp {
    Assign,        // =
    AddAssign,     // +=
    SubAssign,     // -=
    MulAssign,     // *=
    DivAssign,     // /=
    ModAssign,     // %=
    ExpAssign,     // **=
    BitAndAssign,  // &=
    BitOrAssign,   // |=
    BitXorAssign,  // ^=
    LShiftAssign,  // <<=
    RShiftAssign,  // >>=
    URShiftAssign, // >>>=
    AndAssign,     // &&=
    OrAssign,      // ||=
    NullishAssign, // ??=
}

impl AssignmentOp {
    /// The binary operator a compound assignment applies
    pub fn binary_op(self) -> Option<BinaryOp> {
        let op = match self {
            AssignmentOp::AddAssign => BinaryOp::Add,
            AssignmentOp::SubAssign => BinaryOp::Sub,
            AssignmentOp::MulAssign => BinaryOp::Mul,
            AssignmentOp::DivAssign => BinaryOp::Div,
            AssignmentOp::ModAssign => BinaryOp::Mod,
            AssignmentOp::ExpAssign => BinaryOp::Exp,
            AssignmentOp::BitAndAssign => BinaryOp::BitAnd,
            AssignmentOp::BitOrAssign => BinaryOp::BitOr,
            AssignmentOp::BitXorAssign => BinaryOp::BitXor,
            AssignmentOp::LShiftAssign => BinaryOp::LShift,
            AssignmentOp::RShiftAssign => BinaryOp::RShift,
            AssignmentOp::URShiftAssign => BinaryOp::URShift,
            _ => return None,
        };
        Some(op)
    }

    /// The short-circuit operator a logical assignment applies
    pub fn logical_op(self) -> Option<LogicalOp> {
        match self {
            AssignmentOp::AndAssign => Some(LogicalOp::And),
            AssignmentOp::OrAssign => Some(LogicalOp::Or),
            AssignmentOp::NullishAssign => Some(LogicalOp::NullishCoalescing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateExpression {
    pub operator: UpdateOp,
    pub argument: Expression,
    pub prefix: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment, // ++
    Decrement, // --
}

#[derive(Debug, Clone)]
pub struct MemberExpression {
    pub object: Expression,
    pub property: MemberProperty,
    /// `a?.b`: short-circuits the enclosing chain when `a` is nullish
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum MemberProperty {
    Identifier(JsString),
    Expression(Expression),
}

/// Call and `new` share one node shape
#[derive(Debug, Clone)]
pub struct CallExpression {
    pub callee: Expression,
    pub arguments: Rc<[Argument]>,
    /// `f?.()`
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Argument {
    Expression(Expression),
    Spread(Expression),
}

#[derive(Debug, Clone)]
pub struct YieldExpression {
    pub argument: Option<Expression>,
    pub delegate: bool,
    pub span: Span,
}

// ============ PATTERNS ============

#[derive(Debug, Clone)]
pub enum Pattern {
    Identifier(Identifier),
    Object(Rc<ObjectPattern>),
    Array(Rc<ArrayPattern>),
    /// Target with a default value (`x = 1`)
    Assignment(Rc<AssignmentPattern>),
    /// Member expression target, only valid in destructuring assignment
    Expression(Expression),
}

impl CheapClone for Pattern {}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier(i) => i.span,
            Pattern::Object(o) => o.span,
            Pattern::Array(a) => a.span,
            Pattern::Assignment(a) => a.span,
            Pattern::Expression(e) => e.span(),
        }
    }

    /// BoundNames
    pub fn collect_bound_names(&self, names: &mut Vec<JsString>) {
        match self {
            Pattern::Identifier(id) => names.push(id.name.cheap_clone()),
            Pattern::Object(obj) => {
                for prop in &obj.properties {
                    prop.value.collect_bound_names(names);
                }
                if let Some(rest) = &obj.rest {
                    rest.collect_bound_names(names);
                }
            }
            Pattern::Array(arr) => {
                for elem in arr.elements.iter().flatten() {
                    elem.collect_bound_names(names);
                }
                if let Some(rest) = &arr.rest {
                    rest.collect_bound_names(names);
                }
            }
            Pattern::Assignment(assign) => assign.target.collect_bound_names(names),
            Pattern::Expression(_) => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectPattern {
    pub properties: Vec<ObjectPatternProperty>,
    pub rest: Option<Pattern>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectPatternProperty {
    pub key: PropertyName,
    pub value: Pattern,
}

#[derive(Debug, Clone)]
pub struct ArrayPattern {
    pub elements: Vec<Option<Pattern>>,
    pub rest: Option<Pattern>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct AssignmentPattern {
    pub target: Pattern,
    pub default: Expression,
    pub span: Span,
}
