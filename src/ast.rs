use crate::span::Spanned;

/// A parsed source file: an ordered sequence of top-level function
/// definitions. Nothing else is allowed at the top level.
pub type File = Vec<Function>;

/// A function signature: `name(param, param, ...)`. Every parameter and
/// every return value is `double`; parameter names within one prototype
/// are unique.
#[derive(Clone, Debug)]
pub struct Prototype {
    pub name: String,
    pub params: Vec<String>,
}

/// A top-level function definition.
#[derive(Clone, Debug)]
pub struct Function {
    pub proto: Spanned<Prototype>,
    pub body: Block,
}

/// An ordered sequence of expressions. Its value is the value of the last
/// expression, or `0.0` if the block is empty.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub exprs: Vec<Expr>,
}

/// A single AST expression, carrying the source location of the token
/// that introduced it so the emitter can report a line number for errors
/// raised after parsing has already discarded the token stream.
pub type Expr = Spanned<ExprKind>;

/// The closed family of expression node kinds. Every node evaluates to a
/// `double` at runtime except `String`, which evaluates to a pointer and
/// is only valid as the immediate operand of `Print`.
#[derive(Clone, Debug)]
pub enum ExprKind {
    Number(f64),
    String(String),
    Variable(String),
    BinaryOp {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Defines or updates a local slot; evaluates to the assigned value.
    Assign {
        name: String,
        value: Box<Expr>,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
    },
    Print(Box<Expr>),
    If {
        cond: Box<Expr>,
        then_block: Block,
        else_block: Block,
    },
    For {
        var: String,
        start: Box<Expr>,
        end: Box<Expr>,
        /// Defaults to `1.0` when absent.
        step: Option<Box<Expr>>,
        body: Block,
    },
}

/// Arithmetic and comparison operators, in the order they appear in the
/// precedence table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinOp {
    /// The instruction-name hint used when emitting IR, matching the
    /// classic LLVM tutorial naming (`addtmp`, `subtmp`, ...).
    pub fn inst_name(self) -> &'static str {
        match self {
            BinOp::Add => "addtmp",
            BinOp::Sub => "subtmp",
            BinOp::Mul => "multmp",
            BinOp::Div => "divtmp",
            BinOp::Eq => "equal",
            BinOp::Ne => "notEqual",
            BinOp::Lt => "less",
            BinOp::Gt => "greater",
            BinOp::Le => "lessOrEqual",
            BinOp::Ge => "greaterOrEqual",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
        }
    }

    /// Binding power: higher binds tighter. `==`/`!=`/`<=`/`>=` share the
    /// same tier as `<`/`>` since the two groups never appear together in
    /// a well-formed chain.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Mul | BinOp::Div => 10,
            BinOp::Add | BinOp::Sub => 8,
            BinOp::Lt | BinOp::Gt | BinOp::Eq | BinOp::Ne | BinOp::Le | BinOp::Ge => 7,
        }
    }
}
