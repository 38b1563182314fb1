//! XPath expression AST.

/// Binary operators, in precedence order from loosest (`or`) to tightest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// A parsed XPath expression.
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path(PathExpr),
    Literal(String),
    Number(f64),
    Call(String, Vec<Expr>),
}

/// A location path: `/a//b[1]/@href`.
#[derive(Debug, Clone)]
pub(crate) struct PathExpr {
    /// Starts at the document root rather than the context node.
    pub absolute: bool,
    pub steps: Vec<Step>,
}

/// One location step.
#[derive(Debug, Clone)]
pub(crate) struct Step {
    /// The step was written after `//`: expand the context through
    /// `descendant-or-self::node()` first.
    pub descendant: bool,
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

/// Supported axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    Ancestor,
    Attribute,
    FollowingSibling,
    PrecedingSibling,
}

/// Node tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    /// A name test (`div`, `@href`). Stored lowercased; HTML tree names
    /// are lowercase.
    Name(String),
    /// `*`
    Wildcard,
    /// `text()`
    Text,
    /// `node()`
    Node,
}
