//! Frames and execution contexts
//!
//! Evaluation never recurses on the Rust stack. Each execution context owns
//! an explicit stack of [`Frame`]s: a frame handler either finishes its work
//! or pushes a continuation frame followed by the frames of the child node
//! it needs evaluated first. Expression results travel on the context's value
//! stack, references produced by left-hand-side evaluation on the reference
//! stack, and statement results in the context's completion register.

use std::rc::Rc;

use crate::ast::{
    ArrayExpression, ArrayPattern, AssignmentExpression, AssignmentPattern, Argument, BinaryOp,
    CallExpression, ConditionalExpression, ForInOfStatement, ForStatement, FunctionNode, IfStatement,
    LogicalExpression, MemberExpression, ObjectExpression, ObjectPattern, Pattern, Statement,
    SwitchStatement, TemplateLiteral, TryStatement, UnaryOp, UpdateExpression, VariableDeclaration,
    WhileStatement, WithStatement, Expression, Program,
};
use crate::completion::Completion;
use crate::environment::EnvRef;
use crate::error::JsError;
use crate::interpreter::iteration::{ForInIterator, IteratorRecord};
use crate::interpreter::module::ModuleRef;
use crate::interpreter::reference::Reference;
use crate::object::{JsObjectRef, PromiseCapability, PropertyKey};
use crate::value::{JsString, JsValue};

/// Label set of the statement being evaluated
pub type Labels = Rc<[JsString]>;

/// Heights of the value and reference stacks, restored when an abrupt
/// completion is intercepted
#[derive(Debug, Clone, Copy, Default)]
pub struct StackHeight {
    pub values: usize,
    pub refs: usize,
}

/// How a pattern stores the values it destructures
#[derive(Clone)]
pub enum BindMode {
    /// PutValue on the resolved reference (`var`, assignment patterns)
    Put,
    /// InitializeBinding in the given environment (`let`, `const`, parameters)
    Initialize(EnvRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// The test value is on the value stack
    Test,
    /// The body just completed
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForPhase {
    Init,
    Test,
    Body,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForInOfKind {
    In,
    Of,
}

pub enum ForInOfSource {
    Keys(ForInIterator),
    Iterator(IteratorRecord),
}

pub enum ForInOfPhase {
    /// The right-hand side value is on the value stack
    Source,
    /// The body just completed
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPhase {
    Block,
    Catch,
    Finally,
}

pub enum SwitchPhase {
    /// The discriminant is on the value stack
    Discriminant,
    /// The test of case `index` is on the value stack
    Test { discriminant: JsValue, index: usize },
    /// Run the statements of case `next`
    Run { next: usize },
}

pub enum LiteralStep {
    /// Start member `index`
    Start,
    /// A computed key is on the value stack
    Key,
    /// The value for this key is on the value stack
    Value(PropertyKey),
    /// A spread source is on the value stack
    Spread,
}

pub enum PatternStep {
    /// Start element `index`
    Start,
    /// A computed key is on the value stack
    Key,
    /// The member target reference is on the reference stack
    Target(Option<PropertyKey>),
    /// The rest target reference (if any) is ready
    Rest,
}

/// What happens once call arguments are evaluated
#[derive(Clone)]
pub enum ArgsThen {
    Call(Rc<CallExpression>),
    Construct(Rc<CallExpression>),
}

/// What a generator hands back when it yields
pub enum YieldValue {
    Value(JsValue),
    /// The inner iterator result of `yield*`, passed through unchanged
    Delegate(JsValue),
}

/// The outcome of dispatching one frame
pub enum Command {
    Proceed,
    /// Suspend until the value settles
    Await(JsValue),
    Yield(YieldValue),
    /// A generator finished its argument binding and waits for the first next()
    Park,
}

pub enum Frame {
    // ═══════════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════════
    /// Evaluate a statement
    Stmt(Statement),
    /// Evaluate a statement with the label set of its enclosing labels
    LabeledStmt { stmt: Statement, labels: Labels },
    /// Evaluate statements in order, keeping the last non-empty value
    StatementList {
        body: Rc<[Statement]>,
        index: usize,
        last: Option<JsValue>,
    },
    /// Restore the lexical environment (on both normal and abrupt exit)
    RestoreEnv(EnvRef),
    /// UpdateEmpty(completion, undefined)
    UpdateEmpty,
    /// The expression value becomes the statement completion
    ExpressionStatement,
    /// Continue with declarator `index`
    VarDeclaration {
        decl: Rc<VariableDeclaration>,
        index: usize,
    },
    /// The test value of an if statement is on the value stack
    If(Rc<IfStatement>),
    While {
        node: Rc<WhileStatement>,
        labels: Labels,
        value: JsValue,
        phase: LoopPhase,
    },
    DoWhile {
        node: Rc<WhileStatement>,
        labels: Labels,
        value: JsValue,
        phase: LoopPhase,
    },
    For {
        node: Rc<ForStatement>,
        labels: Labels,
        value: JsValue,
        phase: ForPhase,
        /// `let` names copied into each iteration environment
        per_iteration: Rc<[JsString]>,
        outer_env: EnvRef,
    },
    ForInOf {
        node: Rc<ForInOfStatement>,
        kind: ForInOfKind,
        labels: Labels,
        value: JsValue,
        phase: ForInOfPhase,
        source: Option<ForInOfSource>,
        outer_env: EnvRef,
    },
    Switch {
        node: Rc<SwitchStatement>,
        phase: SwitchPhase,
        value: JsValue,
        outer_env: EnvRef,
        height: StackHeight,
    },
    Try {
        node: Rc<TryStatement>,
        phase: TryPhase,
        /// Completion to restore once the finally block completes normally
        pending: Option<Completion>,
        env: EnvRef,
        height: StackHeight,
    },
    /// Converts a break aimed at `label` into a normal completion
    Labeled { label: JsString, height: StackHeight },
    /// The return value is on the value stack
    Return,
    /// The exception value is on the value stack
    Throw,
    /// The object of a with statement is on the value stack
    With(Rc<WithStatement>),
    /// The value of `export default <expr>` is on the value stack
    ExportDefault,
    /// Run a linked module body
    ModuleBody(ModuleRef),
    /// Mark a module body as evaluated
    ModuleDone(ModuleRef),

    // ═══════════════════════════════════════════════════════════════════════
    // Expressions
    // ═══════════════════════════════════════════════════════════════════════
    /// Evaluate an expression and push its value
    Expr(Expression),
    /// Evaluate an expression to a reference and push it on the reference stack
    EvalRef(Expression),
    /// Duplicate the top value
    Dup,
    /// Drop the top value
    Discard,
    Sequence { exprs: Rc<[Expression]>, index: usize },
    Template {
        node: Rc<TemplateLiteral>,
        index: usize,
        text: String,
    },
    ArrayLiteral {
        node: Rc<ArrayExpression>,
        index: usize,
        array: JsObjectRef,
        /// The previous element's value is on the stack (`true` if spread)
        pending: Option<bool>,
    },
    ObjectLiteral {
        node: Rc<ObjectExpression>,
        index: usize,
        object: JsObjectRef,
        step: LiteralStep,
    },
    /// The operand is on the value stack
    Unary(UnaryOp),
    /// The reference to delete is on the reference stack
    DeleteRef,
    /// The left operand is on the value stack
    BinaryRight(Rc<crate::ast::BinaryExpression>),
    /// Both operands are on the value stack
    BinaryApply(BinaryOp),
    LogicalRight(Rc<LogicalExpression>),
    Conditional(Rc<ConditionalExpression>),
    /// The target reference of a simple assignment is ready
    AssignValue(Rc<AssignmentExpression>),
    /// Pop value and reference, store, push the value back
    AssignRef,
    /// Pop value and reference, store
    PutRef,
    /// The target reference of a compound assignment is ready
    CompoundGet(Rc<AssignmentExpression>),
    /// Left value and right value are on the stack, reference on the reference stack
    CompoundApply(Rc<AssignmentExpression>),
    /// The operand reference of ++/-- is ready
    UpdateApply(Rc<UpdateExpression>),
    /// The object of a member expression is on the value stack
    MemberGet(Rc<MemberExpression>),
    /// The object and the computed key are on the value stack
    MemberGetKey(Rc<MemberExpression>),
    /// Reference form of [`Frame::MemberGet`]
    MemberRef(Rc<MemberExpression>),
    MemberRefKey(Rc<MemberExpression>),
    /// End of an optional chain; short-circuiting unwinds to here
    OptionalChainEnd(StackHeight),
    /// The object of a member callee is on the value stack
    CalleeMember {
        member: Rc<MemberExpression>,
        call: Rc<CallExpression>,
    },
    CalleeMemberKey {
        member: Rc<MemberExpression>,
        call: Rc<CallExpression>,
    },
    /// A non-reference callee value is on the value stack
    CalleeValue(Rc<CallExpression>),
    /// Evaluate arguments, then call or construct
    Arguments {
        list: Rc<[Argument]>,
        index: usize,
        args: Vec<JsValue>,
        pending: Option<bool>,
        then: ArgsThen,
    },
    /// The operand of `yield` is on the value stack
    YieldValue,
    /// The iterable of `yield*` is on the value stack
    YieldStarStart,
    /// A `yield*` suspended on its inner iterator; the resumption value is on the stack
    YieldStar(IteratorRecord),
    /// The operand of `await` is on the value stack
    AwaitValue,

    // ═══════════════════════════════════════════════════════════════════════
    // Functions
    // ═══════════════════════════════════════════════════════════════════════
    /// Return point of an in-context call
    CallReturn {
        env: EnvRef,
        var_env: EnvRef,
        strict: bool,
        height: StackHeight,
        /// The receiver when called via `new`
        construct: Option<JsObjectRef>,
    },
    /// Bind parameter `index` (non-simple parameter lists)
    BindParameters {
        node: Rc<FunctionNode>,
        args: Rc<[JsValue]>,
        index: usize,
    },
    /// Hoist vars, functions and lexical declarations of a body
    InstantiateBody(Rc<FunctionNode>),
    /// Initial suspension point of a generator body
    GeneratorStart,
    /// Root of a generator context
    GeneratorRoot,
    /// Root of an async function context
    AsyncRoot(JsObjectRef),
    /// Root of a promise reaction job
    ReactionRoot(Option<PromiseCapability>),
    /// Root of a thenable resolution job
    ThenableRoot { reject: JsValue },
    /// Root of a host-queued call
    TaskRoot,
    /// Evaluate the hoisting record of a script before its body
    GlobalInstantiation(Program),

    // ═══════════════════════════════════════════════════════════════════════
    // Patterns
    // ═══════════════════════════════════════════════════════════════════════
    /// Destructure the value on top of the value stack into a pattern
    Bind { pattern: Pattern, mode: BindMode },
    /// Apply a default and store one element; the value is on the stack
    BindElement {
        target: Pattern,
        default: Option<Expression>,
        mode: BindMode,
        /// The member target reference is on the reference stack
        has_ref: bool,
    },
    /// Default value evaluation of `target = default` finished
    BindDefault { node: Rc<AssignmentPattern>, mode: BindMode },
    ObjectPattern {
        node: Rc<ObjectPattern>,
        mode: BindMode,
        source: JsValue,
        index: usize,
        excluded: Vec<PropertyKey>,
        step: PatternStep,
    },
    ArrayPattern {
        node: Rc<ArrayPattern>,
        mode: BindMode,
        iter: IteratorRecord,
        index: usize,
        step: PatternStep,
    },
}

/// What kind of work a context performs; decides what happens to its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Script,
    Module,
    /// A call made from native code
    Nested,
    Generator,
    Async,
    /// A promise job
    Job,
    /// A host-queued call
    Task,
}

/// An execution context: one resumable evaluation
pub struct ExecutionContext {
    pub frames: Vec<Frame>,
    pub values: Vec<JsValue>,
    pub refs: Vec<Reference>,
    pub env: EnvRef,
    pub var_env: EnvRef,
    pub strict: bool,
    pub completion: Completion,
    pub kind: ContextKind,
    /// Set once the task was aborted; only finally blocks still run
    pub aborting: Option<JsError>,
    /// In-context call nesting
    pub call_depth: usize,
}

impl ExecutionContext {
    pub fn new(kind: ContextKind, env: EnvRef, strict: bool) -> Self {
        Self {
            frames: Vec::new(),
            values: Vec::new(),
            refs: Vec::new(),
            var_env: env.clone(),
            env,
            strict,
            completion: Completion::Normal(None),
            kind,
            aborting: None,
            call_depth: 0,
        }
    }

    pub fn height(&self) -> StackHeight {
        StackHeight {
            values: self.values.len(),
            refs: self.refs.len(),
        }
    }

    pub fn truncate(&mut self, height: StackHeight) {
        self.values.truncate(height.values);
        self.refs.truncate(height.refs);
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn push_value(&mut self, value: JsValue) {
        self.values.push(value);
    }

    pub fn pop_value(&mut self) -> Result<JsValue, JsError> {
        self.values
            .pop()
            .ok_or_else(|| JsError::internal_error("value stack underflow"))
    }

    pub fn peek_value(&self) -> Result<&JsValue, JsError> {
        self.values
            .last()
            .ok_or_else(|| JsError::internal_error("value stack underflow"))
    }

    pub fn pop_ref(&mut self) -> Result<Reference, JsError> {
        self.refs
            .pop()
            .ok_or_else(|| JsError::internal_error("reference stack underflow"))
    }

    pub fn peek_ref(&self) -> Result<&Reference, JsError> {
        self.refs
            .last()
            .ok_or_else(|| JsError::internal_error("reference stack underflow"))
    }

    /// Set a normal statement completion
    pub fn complete(&mut self, value: Option<JsValue>) {
        self.completion = Completion::Normal(value);
    }

    /// Start propagating an abrupt completion
    pub fn abrupt(&mut self, completion: Completion) {
        self.completion = completion;
    }

    pub fn take_completion(&mut self) -> Completion {
        std::mem::take(&mut self.completion)
    }
}
