//! AST node definitions
//!
//! Nodes are plain data, built once by the parser and read-only afterwards.
//! Every node implements `Display`; rendering a parsed program produces
//! source whose re-parse evaluates identically.

use serde::Serialize;
use std::fmt;

/// A parsed program: the top-level statement sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// A brace-delimited statement sequence (loop, branch and function bodies).
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// `let name = value;` or `const name = value;`
    Let {
        name: String,
        value: Expr,
        constant: bool,
    },
    /// `return;` or `return value;`
    Return(Option<Expr>),
    /// `break;`: terminate the innermost loop
    Break,
    /// `skip;`: jump to the innermost loop's next check
    Skip,
    /// `for idx, val in iterable: { ... }` (`idx` is optional)
    For {
        index: Option<String>,
        value: String,
        iterable: Expr,
        body: Block,
    },
    /// A bare expression
    Expression(Expr),
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Prefix {
        op: PrefixOp,
        operand: Box<Expr>,
    },
    Infix {
        op: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `name = value`: reassignment of an existing binding
    Assign {
        name: String,
        value: Box<Expr>,
    },
    /// `left[index]`, or `left[index] = value` when `value` is present
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
        value: Option<Box<Expr>>,
    },
    If {
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    /// `during condition: { ... }`: loop while the condition is truthy
    During {
        condition: Box<Expr>,
        body: Block,
    },
    /// `fun(a, b): { ... }`
    Function {
        params: Vec<String>,
        body: Block,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Hash(Vec<(Expr, Expr)>),
}

/// Unary prefix operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrefixOp {
    Bang,
    Minus,
}

/// Binary infix operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InfixOp {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Gt,
    And,
    Or,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Bang => write!(f, "!"),
            PrefixOp::Minus => write!(f, "-"),
        }
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InfixOp::Plus => "+",
            InfixOp::Minus => "-",
            InfixOp::Star => "*",
            InfixOp::Slash => "/",
            InfixOp::Percent => "%",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
            InfixOp::And => "and",
            InfixOp::Or => "or",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        write!(f, " }}")
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Let {
                name,
                value,
                constant,
            } => {
                let kw = if *constant { "const" } else { "let" };
                write!(f, "{kw} {name} = {value};")
            }
            Stmt::Return(None) => write!(f, "return;"),
            Stmt::Return(Some(value)) => write!(f, "return {value};"),
            Stmt::Break => write!(f, "break;"),
            Stmt::Skip => write!(f, "skip;"),
            Stmt::For {
                index,
                value,
                iterable,
                body,
            } => {
                let idx = index.as_deref().unwrap_or("_");
                write!(f, "for {idx}, {value} in {iterable}: {body}")
            }
            Stmt::Expression(expr) => write!(f, "{expr};"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(name) => write!(f, "{name}"),
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Float(x) => write!(f, "{x:?}"),
            Expr::Str(s) => write!(f, "{s:?}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Prefix { op, operand } => write!(f, "({op}{operand})"),
            Expr::Infix { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::Assign { name, value } => write!(f, "{name} = {value}"),
            Expr::Index { left, index, value } => {
                write!(f, "({left}[{index}]")?;
                if let Some(value) = value {
                    write!(f, " = {value}")?;
                }
                write!(f, ")")
            }
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if {condition}: {consequence}")?;
                if let Some(alt) = alternative {
                    write!(f, " else: {alt}")?;
                }
                Ok(())
            }
            Expr::During { condition, body } => write!(f, "during {condition}: {body}"),
            Expr::Function { params, body } => {
                write!(f, "fun({}): {body}", params.join(", "))
            }
            Expr::Call { callee, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{callee}({})", args.join(", "))
            }
            Expr::Array(elements) => {
                let elems: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elems.join(", "))
            }
            Expr::Hash(pairs) => {
                let pairs: Vec<String> =
                    pairs.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
        }
    }
}
