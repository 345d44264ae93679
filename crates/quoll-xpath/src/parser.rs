//! Recursive-descent parser for query expressions.

use crate::ast::{Axis, ComparisonOp, LocationPath, NodeTest, Predicate, Step};
use crate::error::QueryError;
use crate::lexer::{tokenize, Token};

/// Parse a query expression into a [`LocationPath`].
///
/// # Errors
///
/// Returns [`QueryError::Malformed`] with the byte position of the first
/// token (or character) that does not fit the grammar.
pub fn parse(text: &str) -> Result<LocationPath, QueryError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        index: 0,
        end: text.len(),
    };
    let path = parser.location_path()?;
    if let Some((token, position)) = parser.peek() {
        return Err(QueryError::malformed(
            position,
            format!("unexpected {} after end of path", token.describe()),
        ));
    }
    Ok(path)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    index: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<(&Token, usize)> {
        self.tokens.get(self.index).map(|(t, p)| (t, *p))
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let item = self.tokens.get(self.index).cloned();
        if item.is_some() {
            self.index += 1;
        }
        item
    }

    fn position(&self) -> usize {
        self.peek().map_or(self.end, |(_, p)| p)
    }

    fn expect(&mut self, wanted: &Token, what: &str) -> Result<(), QueryError> {
        match self.advance() {
            Some((token, _)) if token == *wanted => Ok(()),
            Some((token, position)) => Err(QueryError::malformed(
                position,
                format!("expected {what}, found {}", token.describe()),
            )),
            None => Err(QueryError::malformed(self.end, format!("expected {what}"))),
        }
    }

    /// `('/' | '//')? step (('/' | '//') step)*`
    ///
    /// A leading separator makes the path absolute; `//` desugars into a
    /// `descendant-or-self::node()` step before the step that follows it.
    fn location_path(&mut self) -> Result<LocationPath, QueryError> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some((Token::Slash, _)) => {
                self.index += 1;
                // "/" on its own selects just the root.
                if self.peek().is_none() {
                    return Ok(LocationPath {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some((Token::DoubleSlash, _)) => {
                self.index += 1;
                steps.push(descendant_or_self_step());
                true
            }
            _ => false,
        };
        steps.push(self.step()?);
        loop {
            match self.peek() {
                Some((Token::Slash, _)) => {
                    self.index += 1;
                    steps.push(self.step()?);
                }
                Some((Token::DoubleSlash, _)) => {
                    self.index += 1;
                    steps.push(descendant_or_self_step());
                    steps.push(self.step()?);
                }
                _ => break,
            }
        }
        Ok(LocationPath { absolute, steps })
    }

    /// `'.' | '..' | ('@' | axis '::')? node_test predicate*`
    fn step(&mut self) -> Result<Step, QueryError> {
        match self.peek() {
            Some((Token::Dot, _)) => {
                self.index += 1;
                return Ok(Step {
                    axis: Axis::SelfAxis,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                });
            }
            Some((Token::DotDot, _)) => {
                self.index += 1;
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                });
            }
            _ => {}
        }
        let axis = self.axis()?;
        let test = self.node_test(axis)?;
        let mut predicates = Vec::new();
        while matches!(self.peek(), Some((Token::OpenBracket, _))) {
            self.index += 1;
            predicates.push(self.predicate()?);
            self.expect(&Token::CloseBracket, "']'")?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn axis(&mut self) -> Result<Axis, QueryError> {
        if matches!(self.peek(), Some((Token::At, _))) {
            self.index += 1;
            return Ok(Axis::Attribute);
        }
        // An explicit axis is a name followed by '::'.
        if let Some((Token::Name(name), position)) = self.peek() {
            if matches!(self.tokens.get(self.index + 1), Some((Token::ColonColon, _))) {
                let axis = match name.as_str() {
                    "child" => Axis::Child,
                    "descendant" => Axis::Descendant,
                    "descendant-or-self" => Axis::DescendantOrSelf,
                    "self" => Axis::SelfAxis,
                    "parent" => Axis::Parent,
                    "attribute" => Axis::Attribute,
                    other => {
                        return Err(QueryError::malformed(
                            position,
                            format!("unsupported axis '{other}'"),
                        ))
                    }
                };
                self.index += 2;
                return Ok(axis);
            }
        }
        Ok(Axis::Child)
    }

    fn node_test(&mut self, axis: Axis) -> Result<NodeTest, QueryError> {
        match self.advance() {
            Some((Token::Star, _)) => Ok(NodeTest::Any),
            Some((Token::Name(name), position)) => {
                if matches!(self.peek(), Some((Token::OpenParen, _))) {
                    self.index += 1;
                    self.expect(&Token::CloseParen, "')'")?;
                    return match name.as_str() {
                        "text" => Ok(NodeTest::Text),
                        "comment" => Ok(NodeTest::Comment),
                        "node" => Ok(NodeTest::AnyNode),
                        other => Err(QueryError::malformed(
                            position,
                            format!("unsupported node test '{other}()'"),
                        )),
                    };
                }
                // Attribute names keep their case for display but match
                // case-insensitively, same as element names.
                let _ = axis;
                Ok(NodeTest::Name(name))
            }
            Some((token, position)) => Err(QueryError::malformed(
                position,
                format!("expected a node test, found {}", token.describe()),
            )),
            None => Err(QueryError::malformed(self.end, "expected a node test")),
        }
    }

    /// The expression between `[` and `]`.
    fn predicate(&mut self) -> Result<Predicate, QueryError> {
        match self.peek() {
            Some((Token::Number(value), _)) => {
                let value = *value;
                self.index += 1;
                Ok(Predicate::Index(value))
            }
            Some((Token::Name(name), _)) if name == "last" && self.paren_follows() => {
                self.index += 2;
                self.expect(&Token::CloseParen, "')'")?;
                let mut offset = 0;
                if matches!(self.peek(), Some((Token::Minus, _))) {
                    self.index += 1;
                    offset = self.number("a position offset")?;
                }
                Ok(Predicate::Last { offset })
            }
            Some((Token::Name(name), _)) if name == "position" && self.paren_follows() => {
                self.index += 2;
                self.expect(&Token::CloseParen, "')'")?;
                let op = self.comparison_op()?;
                let value = self.number("a position")?;
                Ok(Predicate::Position { op, value })
            }
            _ => {
                let path = self.location_path()?;
                match self.peek() {
                    Some((Token::Equal | Token::NotEqual, _)) => {
                        let op = self.comparison_op()?;
                        let literal = self.literal()?;
                        Ok(Predicate::Compare { path, op, literal })
                    }
                    Some((Token::Less | Token::LessEqual | Token::Greater | Token::GreaterEqual, position)) => {
                        Err(QueryError::malformed(
                            position,
                            "only '=' and '!=' compare a path against a literal",
                        ))
                    }
                    _ => Ok(Predicate::Exists(path)),
                }
            }
        }
    }

    fn paren_follows(&self) -> bool {
        matches!(self.tokens.get(self.index + 1), Some((Token::OpenParen, _)))
    }

    fn comparison_op(&mut self) -> Result<ComparisonOp, QueryError> {
        match self.advance() {
            Some((Token::Equal, _)) => Ok(ComparisonOp::Eq),
            Some((Token::NotEqual, _)) => Ok(ComparisonOp::Ne),
            Some((Token::Less, _)) => Ok(ComparisonOp::Lt),
            Some((Token::LessEqual, _)) => Ok(ComparisonOp::Le),
            Some((Token::Greater, _)) => Ok(ComparisonOp::Gt),
            Some((Token::GreaterEqual, _)) => Ok(ComparisonOp::Ge),
            Some((token, position)) => Err(QueryError::malformed(
                position,
                format!("expected a comparison operator, found {}", token.describe()),
            )),
            None => Err(QueryError::malformed(
                self.end,
                "expected a comparison operator",
            )),
        }
    }

    fn number(&mut self, what: &str) -> Result<usize, QueryError> {
        match self.advance() {
            Some((Token::Number(value), _)) => Ok(value),
            Some((token, position)) => Err(QueryError::malformed(
                position,
                format!("expected {what}, found {}", token.describe()),
            )),
            None => Err(QueryError::malformed(self.end, format!("expected {what}"))),
        }
    }

    fn literal(&mut self) -> Result<String, QueryError> {
        match self.advance() {
            Some((Token::Literal(value), _)) => Ok(value),
            Some((token, position)) => Err(QueryError::malformed(
                position,
                format!("expected a string literal, found {}", token.describe()),
            )),
            None => Err(QueryError::malformed(self.end, "expected a string literal")),
        }
    }
}

fn descendant_or_self_step() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::AnyNode,
        predicates: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::parse;
    use crate::ast::{Axis, ComparisonOp, NodeTest, Predicate};

    #[test]
    fn double_slash_desugars() {
        let path = parse("//div").unwrap();
        assert!(path.absolute);
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[0].axis, Axis::DescendantOrSelf);
        assert_eq!(path.steps[0].test, NodeTest::AnyNode);
        assert_eq!(path.steps[1].axis, Axis::Child);
        assert_eq!(path.steps[1].test, NodeTest::Name("div".to_string()));
    }

    #[test]
    fn abbreviations_expand() {
        let path = parse("./../@id").unwrap();
        assert!(!path.absolute);
        assert_eq!(path.steps[0].axis, Axis::SelfAxis);
        assert_eq!(path.steps[1].axis, Axis::Parent);
        assert_eq!(path.steps[2].axis, Axis::Attribute);
        assert_eq!(path.steps[2].test, NodeTest::Name("id".to_string()));
    }

    #[test]
    fn predicates_parse() {
        let path = parse("li[2][last()-1][position()<=3][@href][a/@href!='x']").unwrap();
        let predicates = &path.steps[0].predicates;
        assert_eq!(predicates[0], Predicate::Index(2));
        assert_eq!(predicates[1], Predicate::Last { offset: 1 });
        assert_eq!(
            predicates[2],
            Predicate::Position {
                op: ComparisonOp::Le,
                value: 3
            }
        );
        assert!(matches!(predicates[3], Predicate::Exists(_)));
        assert!(matches!(
            predicates[4],
            Predicate::Compare {
                op: ComparisonOp::Ne,
                ..
            }
        ));
    }

    #[test]
    fn root_only_path() {
        let path = parse("/").unwrap();
        assert!(path.absolute);
        assert!(path.steps.is_empty());
    }

    #[test]
    fn errors_carry_positions() {
        let err = parse("//div[").unwrap_err();
        let crate::error::QueryError::Malformed { position, .. } = err;
        assert_eq!(position, 6);
    }

    #[test]
    fn ordering_against_literal_is_rejected() {
        assert!(parse("a[@x < 'y']").is_err());
    }

    #[test]
    fn unsupported_axis_is_rejected() {
        assert!(parse("ancestor::div").is_err());
    }
}
