//! Compiled form of a query expression.
//!
//! A query is a [`LocationPath`]: an ordered list of [`Step`]s, each
//! pairing an axis with a node test and zero or more predicates. The
//! evaluator walks this structure directly; there is no intermediate
//! rewriting pass beyond the `//` desugaring done by the parser.

/// Direction a step moves from each context node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Direct children, in document order.
    Child,
    /// All descendants, preorder.
    Descendant,
    /// The context node followed by all descendants, preorder.
    DescendantOrSelf,
    /// The context node itself.
    SelfAxis,
    /// The parent node, if any.
    Parent,
    /// The attributes of the context node, in source order.
    Attribute,
}

/// Filter applied to each node an axis produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// Match a specific element or attribute name, case-insensitively.
    Name(String),
    /// `*`: match any node of the axis' principal kind.
    Any,
    /// `text()`: match text nodes only.
    Text,
    /// `comment()`: match comment nodes only.
    Comment,
    /// `node()`: match any node.
    AnyNode,
}

/// How two values are compared inside a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl ComparisonOp {
    /// Apply the operator to two positions.
    #[must_use]
    pub fn holds(self, left: usize, right: usize) -> bool {
        match self {
            ComparisonOp::Eq => left == right,
            ComparisonOp::Ne => left != right,
            ComparisonOp::Lt => left < right,
            ComparisonOp::Le => left <= right,
            ComparisonOp::Gt => left > right,
            ComparisonOp::Ge => left >= right,
        }
    }
}

/// A `[...]` filter on a step.
///
/// Positions are 1-based and local to one context node's step results,
/// so `li[2]` selects the second `li` child of each context node, not
/// the second node of the merged result set.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `[n]`: keep the node at position n.
    Index(usize),
    /// `[last()]` or `[last()-k]`: keep the node at position size − k.
    Last {
        /// Offset subtracted from the local set size.
        offset: usize,
    },
    /// `[position() op n]`: compare the local position against a constant.
    Position {
        /// The comparison operator.
        op: ComparisonOp,
        /// The constant operand.
        value: usize,
    },
    /// `[@href]` or `[span]`: keep nodes where the path selects anything.
    Exists(LocationPath),
    /// `[@class='x']`: compare the string value of the path's results
    /// against a literal with `=` or `!=`.
    Compare {
        /// Path evaluated relative to the candidate node.
        path: LocationPath,
        /// `=` or `!=`; the parser rejects other operators here.
        op: ComparisonOp,
        /// Right-hand literal.
        literal: String,
    },
}

/// One axis-test-predicates unit of a path.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Axis the step moves along.
    pub axis: Axis,
    /// Node test applied to axis output.
    pub test: NodeTest,
    /// Predicates applied in order after the node test.
    pub predicates: Vec<Predicate>,
}

/// A full location path.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// Whether evaluation starts from the document root instead of the
    /// context node.
    pub absolute: bool,
    /// Steps applied left to right.
    pub steps: Vec<Step>,
}
