//! Parser AST types (component C4's output). A tagged union of node
//! variants, matched exhaustively by the executor (§9 "dynamic dispatch"
//! design note) rather than dispatched through open polymorphism.

use crate::source::Location;
use crate::word::Word;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fd {
    Raw(i32),
}
impl Fd {
    pub const STDIN: Fd = Fd::Raw(0);
    pub const STDOUT: Fd = Fd::Raw(1);
    pub const STDERR: Fd = Fd::Raw(2);
    pub fn raw(self) -> i32 {
        let Fd::Raw(n) = self;
        n
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RedirOp {
    FileIn,       // <
    FileInOut,    // <>
    FileOut,      // >
    FileAppend,   // >>
    FileClobber,  // >|
    FdIn,         // <&
    FdOut,        // >&
    Pipe,         // >>| (open a pipe)
    HereString,   // <<<
    HereDoc,      // << / <<-
}

/// A here-document body. The delimiter and `remove_tabs` flag are known when
/// the redirection operator is parsed; `content` and `quoted_delimiter` are
/// filled in by the post-pass once the containing simple command is fully
/// parsed and the lexer's heredoc side-map has been consulted (§4.4).
#[derive(Clone, Debug, PartialEq)]
pub struct HereDoc {
    pub delimiter: Word,
    pub remove_tabs: bool,
    pub quoted_delimiter: bool,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RedirTarget {
    Word(Word),
    HereDoc(Rc<HereDoc>),
    /// `>&-` / `<&-`
    Close,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Redirect {
    pub fd: Option<Fd>,
    pub op: RedirOp,
    pub target: RedirTarget,
}

impl Redirect {
    pub fn fd_or_default(&self) -> Fd {
        use RedirOp::*;
        self.fd.unwrap_or(match self.op {
            FileIn | FileInOut | FdIn | HereString | HereDoc => Fd::STDIN,
            FileOut | FileAppend | FileClobber | FdOut | Pipe => Fd::STDOUT,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AssignValue {
    Scalar(Word),
    IndexedArray(Vec<Word>),
    AssocArray(Vec<(Word, Word)>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assign {
    pub name: String,
    /// `Some(index)` when this is an array-element assignment `name[index]=`.
    pub index: Option<Word>,
    /// `+=` rather than `=`.
    pub append: bool,
    pub value: AssignValue,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimpleCommand {
    pub assigns: Vec<Assign>,
    pub words: Vec<Word>,
    pub redirects: Vec<Redirect>,
    pub background: bool,
}

impl SimpleCommand {
    pub fn is_empty(&self) -> bool {
        self.assigns.is_empty() && self.words.is_empty() && self.redirects.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TestBinaryOp {
    StrEq,
    StrNe,
    StrMatch,  // =~
    StrLt,
    StrGt,
    NumEq,
    NumNe,
    NumLt,
    NumLe,
    NumGt,
    NumGe,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TestUnaryOp {
    IsFile,
    IsDir,
    Exists,
    IsReadable,
    IsWritable,
    IsExecutable,
    IsNonEmpty,
    IsEmptyString,
    IsNonEmptyString,
}

/// `[[ ... ]]` enhanced-test expression AST.
#[derive(Clone, Debug, PartialEq)]
pub enum TestExpr {
    Word(Word),
    Unary(TestUnaryOp, Word),
    Binary(Box<TestExpr>, TestBinaryOp, Box<TestExpr>),
    And(Box<TestExpr>, Box<TestExpr>),
    Or(Box<TestExpr>, Box<TestExpr>),
    Not(Box<TestExpr>),
    Group(Box<TestExpr>),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CaseTerminator {
    #[default]
    Break,       // ;;
    FallThrough, // ;&
    Continue,    // ;;&
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseItem {
    pub patterns: Vec<Word>,
    pub body: List,
    pub terminator: CaseTerminator,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElifThen {
    pub condition: List,
    pub body: List,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CompoundCommand {
    If {
        condition: List,
        body: List,
        elifs: Vec<ElifThen>,
        r#else: Option<List>,
    },
    While { condition: List, body: List },
    Until { condition: List, body: List },
    ForIn { name: String, items: Option<Vec<Word>>, body: List },
    CForLoop {
        init: Option<String>,
        cond: Option<String>,
        update: Option<String>,
        body: List,
    },
    Case { subject: Word, items: Vec<CaseItem> },
    Select { name: String, items: Option<Vec<Word>>, body: List },
    Subshell { body: Rc<List> },
    BraceGroup { body: List },
    ArithmeticEval { expr: String },
    EnhancedTest { expr: TestExpr },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FullCompoundCommand {
    pub command: CompoundCommand,
    pub redirects: Vec<Redirect>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub body: Rc<FullCompoundCommand>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Simple(SimpleCommand),
    Compound(FullCompoundCommand),
    Function(FunctionDefinition),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Rc<Command>>,
    pub negated: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AndOr {
    AndThen, // &&
    OrElse,  // ||
}

#[derive(Clone, Debug, PartialEq)]
pub struct AndOrList {
    pub first: Pipeline,
    pub rest: Vec<(AndOr, Pipeline)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub and_or: Rc<AndOrList>,
    pub is_background: bool,
}

/// Sequence of and-or lists separated by `;` or `&`; called `StatementList`
/// in spec.md's node taxonomy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct List(pub Vec<Item>);

pub type StatementList = List;
