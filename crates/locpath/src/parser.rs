//! Recursive-descent parser over the token stream.
//!
//! One function per precedence level, lowest binding first: or, and,
//! equality, relational, additive, multiplicative, unary, union, then
//! path/filter and primary expressions. All binary operators associate
//! left. Abbreviations are desugared while parsing: `//` becomes a
//! `descendant-or-self::node()` step, `.` and `..` become `self::node()`
//! and `parent::node()`, `@` selects the attribute axis, and a step with
//! no explicit axis uses `child::`.
//!
//! Function calls are checked for argument-list shape only; arity is the
//! function registry's business at evaluation time.

use tracing::debug;

pub mod ast;

use crate::error::{ParseError, SyntaxError};
use crate::lexer::{Lexer, NodeTypeName, Token, TokenKind};
use crate::model::QName;
use ast::{Axis, BinaryOp, Expr, KindTest, NameTest, NodeTest, PathExpr, PathStart, Step};

/// Parses an expression string into its AST. All-or-nothing: any lexical
/// or grammar problem aborts with no partial result.
pub fn parse_xpath(input: &str) -> Result<Expr, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    debug!(expr = input, tokens = tokens.len(), "parsing xpath");
    let expr = Parser::new(tokens, input.len()).parse()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    fn parse(mut self) -> Result<Expr, SyntaxError> {
        let expr = self.parse_expr()?;
        if let Some(token) = self.peek() {
            return Err(self.unexpected(token.clone(), "end of expression"));
        }
        Ok(expr)
    }

    // ===== Productions 14-27: operator precedence ladder =====

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_equality()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Equal) => BinaryOp::Eq,
                Some(TokenKind::NotEqual) => BinaryOp::Ne,
                _ => break,
            };
            self.bump();
            let right = self.parse_relational()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::LessThan) => BinaryOp::Lt,
                Some(TokenKind::LessThanEqual) => BinaryOp::Le,
                Some(TokenKind::GreaterThan) => BinaryOp::Gt,
                Some(TokenKind::GreaterThanEqual) => BinaryOp::Ge,
                _ => break,
            };
            self.bump();
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Div) => BinaryOp::Div,
                Some(TokenKind::Mod) => BinaryOp::Mod,
                _ => break,
            };
            self.bump();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat(&TokenKind::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_path_expr()?;
        while self.eat(&TokenKind::Pipe) {
            let right = self.parse_path_expr()?;
            left = Expr::Union {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // ===== Productions 1-13 and 18-20: paths, filters, primaries =====

    fn parse_path_expr(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            Some(
                TokenKind::Slash
                | TokenKind::DoubleSlash
                | TokenKind::Dot
                | TokenKind::DotDot
                | TokenKind::At
                | TokenKind::Name(_)
                | TokenKind::AxisName(_)
                | TokenKind::NodeType(_),
            ) => self.parse_location_path(),
            _ => {
                let primary = self.parse_primary()?;
                let predicates = self.parse_predicates()?;
                match self.peek_kind() {
                    Some(TokenKind::Slash) => {
                        self.bump();
                        let filter = wrap_filter(primary, predicates);
                        let steps = self.parse_relative_steps()?;
                        Ok(Expr::Path(PathExpr {
                            start: PathStart::Filter(Box::new(filter)),
                            steps,
                        }))
                    }
                    Some(TokenKind::DoubleSlash) => {
                        self.bump();
                        let filter = wrap_filter(primary, predicates);
                        let mut steps = vec![Step::descendant_or_self()];
                        steps.extend(self.parse_relative_steps()?);
                        Ok(Expr::Path(PathExpr {
                            start: PathStart::Filter(Box::new(filter)),
                            steps,
                        }))
                    }
                    _ => Ok(wrap_filter(primary, predicates)),
                }
            }
        }
    }

    fn parse_location_path(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Slash) => {
                self.bump();
                let steps = if self.starts_step() {
                    self.parse_relative_steps()?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path(PathExpr {
                    start: PathStart::Root,
                    steps,
                }))
            }
            Some(TokenKind::DoubleSlash) => {
                self.bump();
                let mut steps = vec![Step::descendant_or_self()];
                steps.extend(self.parse_relative_steps()?);
                Ok(Expr::Path(PathExpr {
                    start: PathStart::Root,
                    steps,
                }))
            }
            _ => {
                let steps = self.parse_relative_steps()?;
                Ok(Expr::Path(PathExpr {
                    start: PathStart::Relative,
                    steps,
                }))
            }
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                TokenKind::Dot
                    | TokenKind::DotDot
                    | TokenKind::At
                    | TokenKind::Name(_)
                    | TokenKind::AxisName(_)
                    | TokenKind::NodeType(_)
            )
        )
    }

    fn parse_relative_steps(&mut self) -> Result<Vec<Step>, SyntaxError> {
        let mut steps = vec![self.parse_step()?];
        loop {
            match self.peek_kind() {
                Some(TokenKind::Slash) => {
                    self.bump();
                    steps.push(self.parse_step()?);
                }
                Some(TokenKind::DoubleSlash) => {
                    self.bump();
                    steps.push(Step::descendant_or_self());
                    steps.push(self.parse_step()?);
                }
                _ => break,
            }
        }
        Ok(steps)
    }

    fn parse_step(&mut self) -> Result<Step, SyntaxError> {
        match self.peek_kind() {
            // AbbreviatedStep: '.' and '..' take no node test and no
            // predicates.
            Some(TokenKind::Dot) => {
                self.bump();
                Ok(Step {
                    axis: Axis::SelfAxis,
                    test: NodeTest::Kind(KindTest::Node),
                    predicates: Vec::new(),
                })
            }
            Some(TokenKind::DotDot) => {
                self.bump();
                Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::Kind(KindTest::Node),
                    predicates: Vec::new(),
                })
            }
            Some(TokenKind::At) => {
                self.bump();
                self.finish_step(Axis::Attribute)
            }
            Some(TokenKind::AxisName(_)) => {
                let token = self.bump().expect("peeked");
                let TokenKind::AxisName(name) = token.kind else {
                    unreachable!()
                };
                let Some(axis) = Axis::from_name(&name) else {
                    return Err(SyntaxError {
                        position: token.offset,
                        expected: "an axis name".to_string(),
                        found: format!("'{name}'"),
                    });
                };
                self.expect(&TokenKind::ColonColon, "'::'")?;
                self.finish_step(axis)
            }
            _ => self.finish_step(Axis::Child),
        }
    }

    fn finish_step(&mut self, axis: Axis) -> Result<Step, SyntaxError> {
        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Name(_)) => {
                let token = self.bump().expect("peeked");
                let TokenKind::Name(name) = token.kind else {
                    unreachable!()
                };
                if name == "*" {
                    return Ok(NodeTest::Name(NameTest::Any));
                }
                if let Some(prefix) = name.strip_suffix(":*") {
                    return Ok(NodeTest::Name(NameTest::Namespace(prefix.to_string())));
                }
                Ok(NodeTest::Name(NameTest::Name(qname_from_str(&name))))
            }
            Some(TokenKind::NodeType(_)) => {
                let token = self.bump().expect("peeked");
                let TokenKind::NodeType(node_type) = token.kind else {
                    unreachable!()
                };
                self.expect(&TokenKind::LeftParen, "'('")?;
                let test = match node_type {
                    NodeTypeName::Node => KindTest::Node,
                    NodeTypeName::Text => KindTest::Text,
                    NodeTypeName::Comment => KindTest::Comment,
                    NodeTypeName::ProcessingInstruction => {
                        let target = match self.peek_kind() {
                            Some(TokenKind::Literal(_)) => {
                                let token = self.bump().expect("peeked");
                                let TokenKind::Literal(s) = token.kind else {
                                    unreachable!()
                                };
                                Some(s)
                            }
                            _ => None,
                        };
                        KindTest::ProcessingInstruction(target)
                    }
                };
                self.expect(&TokenKind::RightParen, "')'")?;
                Ok(NodeTest::Kind(test))
            }
            _ => Err(self.expected_here("a node test")),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut predicates = Vec::new();
        while self.eat(&TokenKind::LeftBracket) {
            let expr = self.parse_expr()?;
            self.expect(&TokenKind::RightBracket, "']'")?;
            predicates.push(expr);
        }
        Ok(predicates)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::VariableReference(_)) => {
                let token = self.bump().expect("peeked");
                let TokenKind::VariableReference(name) = token.kind else {
                    unreachable!()
                };
                Ok(Expr::VarRef(qname_from_str(&name)))
            }
            Some(TokenKind::LeftParen) => {
                self.bump();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RightParen, "')'")?;
                Ok(expr)
            }
            Some(TokenKind::Literal(_)) => {
                let token = self.bump().expect("peeked");
                let TokenKind::Literal(s) = token.kind else {
                    unreachable!()
                };
                Ok(Expr::Literal(s))
            }
            Some(TokenKind::Number(_)) => {
                let token = self.bump().expect("peeked");
                let TokenKind::Number(n) = token.kind else {
                    unreachable!()
                };
                Ok(Expr::Number(n))
            }
            Some(TokenKind::FunctionName(_)) => {
                let token = self.bump().expect("peeked");
                let TokenKind::FunctionName(name) = token.kind else {
                    unreachable!()
                };
                self.expect(&TokenKind::LeftParen, "'('")?;
                let mut args = Vec::new();
                if self.peek_kind() != Some(&TokenKind::RightParen) {
                    args.push(self.parse_expr()?);
                    while self.eat(&TokenKind::Comma) {
                        args.push(self.parse_expr()?);
                    }
                }
                self.expect(&TokenKind::RightParen, "')'")?;
                Ok(Expr::FunctionCall {
                    name: qname_from_str(&name),
                    args,
                })
            }
            _ => Err(self.expected_here("an expression")),
        }
    }

    // ===== Token plumbing =====

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), SyntaxError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.expected_here(expected))
        }
    }

    fn expected_here(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError {
                position: token.offset,
                expected: expected.to_string(),
                found: token.kind.describe(),
            },
            None => SyntaxError {
                position: self.end,
                expected: expected.to_string(),
                found: "end of expression".to_string(),
            },
        }
    }

    fn unexpected(&self, token: Token, expected: &str) -> SyntaxError {
        SyntaxError {
            position: token.offset,
            expected: expected.to_string(),
            found: token.kind.describe(),
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// A bare primary stays what it is; predicates wrap it in a filter.
fn wrap_filter(primary: Expr, predicates: Vec<Expr>) -> Expr {
    if predicates.is_empty() {
        primary
    } else {
        Expr::Filter {
            primary: Box::new(primary),
            predicates,
        }
    }
}

fn qname_from_str(s: &str) -> QName {
    match s.split_once(':') {
        Some((prefix, local)) => QName::prefixed(prefix, local),
        None => QName::local(s),
    }
}
