//! Expression tokenizer.
//!
//! One forward pass over the expression string, producing the XPath 1.0
//! `ExprToken` set. The §3.7 disambiguation rule is applied as tokens are
//! emitted: whether the scanner is in an "operand just ended" state decides
//! if `*` is the multiply operator or a wildcard name test, and whether a
//! bare word like `and` or `div` is an operator or the start of a name
//! test. A name is reclassified by lookahead — a `(` after it makes it a
//! node-type keyword or function name, a `::` makes it an axis name.

use crate::error::LexError;

/// Node-type keywords usable as node tests (`node()`, `text()`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTypeName {
    Node,
    Text,
    Comment,
    ProcessingInstruction,
}

impl NodeTypeName {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "node" => Some(Self::Node),
            "text" => Some(Self::Text),
            "comment" => Some(Self::Comment),
            "processing-instruction" => Some(Self::ProcessingInstruction),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Text => "text",
            Self::Comment => "comment",
            Self::ProcessingInstruction => "processing-instruction",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    DotDot,
    At,
    Comma,
    ColonColon,
    Slash,
    DoubleSlash,
    Pipe,
    Plus,
    Minus,
    Star,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    And,
    Or,
    Mod,
    Div,
    Number(f64),
    Literal(String),
    /// A name test: `*`, `prefix:*`, an NCName or a QName.
    Name(String),
    /// A name that is followed by `(` and is not a node-type keyword.
    FunctionName(String),
    /// A node-type keyword followed by `(`.
    NodeType(NodeTypeName),
    /// A name followed by `::`. Validated against the axis set by the parser.
    AxisName(String),
    /// `$name` — the string excludes the `$`.
    VariableReference(String),
}

impl TokenKind {
    /// Human-readable rendering for syntax error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::LeftParen => "'('".into(),
            Self::RightParen => "')'".into(),
            Self::LeftBracket => "'['".into(),
            Self::RightBracket => "']'".into(),
            Self::Dot => "'.'".into(),
            Self::DotDot => "'..'".into(),
            Self::At => "'@'".into(),
            Self::Comma => "','".into(),
            Self::ColonColon => "'::'".into(),
            Self::Slash => "'/'".into(),
            Self::DoubleSlash => "'//'".into(),
            Self::Pipe => "'|'".into(),
            Self::Plus => "'+'".into(),
            Self::Minus => "'-'".into(),
            Self::Star => "'*'".into(),
            Self::Equal => "'='".into(),
            Self::NotEqual => "'!='".into(),
            Self::LessThan => "'<'".into(),
            Self::LessThanEqual => "'<='".into(),
            Self::GreaterThan => "'>'".into(),
            Self::GreaterThanEqual => "'>='".into(),
            Self::And => "'and'".into(),
            Self::Or => "'or'".into(),
            Self::Mod => "'mod'".into(),
            Self::Div => "'div'".into(),
            Self::Number(n) => format!("number {n}"),
            Self::Literal(s) => format!("literal \"{s}\""),
            Self::Name(s) => format!("name '{s}'"),
            Self::FunctionName(s) => format!("function name '{s}'"),
            Self::NodeType(t) => format!("node type '{}'", t.as_str()),
            Self::AxisName(s) => format!("axis name '{s}'"),
            Self::VariableReference(s) => format!("variable '${s}'"),
        }
    }

    /// Whether a token of this kind can end an operand. Per XPath 1.0
    /// §3.7 the *preceding* token decides how `*` and the named operators
    /// lex: they are operators unless there is no preceding token or it is
    /// `@`, `::`, `(`, `[`, `,` or another operator.
    fn ends_operand(&self) -> bool {
        !matches!(
            self,
            Self::At
                | Self::ColonColon
                | Self::LeftParen
                | Self::LeftBracket
                | Self::Comma
                | Self::Slash
                | Self::DoubleSlash
                | Self::Pipe
                | Self::Plus
                | Self::Minus
                | Self::Star
                | Self::Equal
                | Self::NotEqual
                | Self::LessThan
                | Self::LessThanEqual
                | Self::GreaterThan
                | Self::GreaterThanEqual
                | Self::And
                | Self::Or
                | Self::Mod
                | Self::Div
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character in the expression.
    pub offset: usize,
}

/// Restartable tokenizer: no state besides the cursor and the
/// operand-ended flag, both advanced by [`next_token`](Lexer::next_token).
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    operand_ended: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            operand_ended: false,
        }
    }

    /// Tokenizes the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Produces the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();
        let Some(ch) = self.peek() else {
            return Ok(None);
        };
        let offset = self.pos;
        let kind = match ch {
            b'(' => self.single(TokenKind::LeftParen),
            b')' => self.single(TokenKind::RightParen),
            b'[' => self.single(TokenKind::LeftBracket),
            b']' => self.single(TokenKind::RightBracket),
            b'@' => self.single(TokenKind::At),
            b',' => self.single(TokenKind::Comma),
            b'|' => self.single(TokenKind::Pipe),
            b'+' => self.single(TokenKind::Plus),
            b'-' => self.single(TokenKind::Minus),
            b'=' => self.single(TokenKind::Equal),
            b'*' => {
                self.advance();
                if self.operand_ended {
                    TokenKind::Star
                } else {
                    TokenKind::Name("*".to_string())
                }
            }
            b':' => {
                self.advance();
                if self.peek() == Some(b':') {
                    self.advance();
                    TokenKind::ColonColon
                } else {
                    return Err(LexError::LoneColon { offset });
                }
            }
            b'!' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::NotEqual
                } else {
                    return Err(LexError::LoneBang { offset });
                }
            }
            b'<' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::LessThanEqual
                } else {
                    TokenKind::LessThan
                }
            }
            b'>' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::GreaterThanEqual
                } else {
                    TokenKind::GreaterThan
                }
            }
            b'/' => {
                self.advance();
                if self.peek() == Some(b'/') {
                    self.advance();
                    TokenKind::DoubleSlash
                } else {
                    TokenKind::Slash
                }
            }
            b'.' => self.read_dot(offset)?,
            b'"' | b'\'' => self.read_literal(offset)?,
            b'$' => self.read_variable_reference(offset)?,
            b'0'..=b'9' => self.read_number(offset)?,
            _ if is_name_start(ch) => self.read_name(),
            _ => {
                // Re-decode the full character for the message; names are
                // the only multi-byte-capable token start.
                let ch = core::str::from_utf8(&self.input[offset..])
                    .ok()
                    .and_then(|s| s.chars().next())
                    .unwrap_or(char::from(ch));
                return Err(LexError::UnexpectedChar { ch, offset });
            }
        };
        self.operand_ended = kind.ends_operand();
        Ok(Some(Token { kind, offset }))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// `.`, `..`, or a number of the `.Digits` form.
    fn read_dot(&mut self, offset: usize) -> Result<TokenKind, LexError> {
        self.advance();
        if self.peek() == Some(b'.') {
            self.advance();
            return Ok(TokenKind::DotDot);
        }
        if matches!(self.peek(), Some(b'0'..=b'9')) {
            self.take_while(|b| b.is_ascii_digit());
            return self.parse_number(offset);
        }
        Ok(TokenKind::Dot)
    }

    /// `Digits ('.' Digits?)?` — the leading-dot form is handled by
    /// [`read_dot`](Self::read_dot). No sign, no exponent.
    fn read_number(&mut self, offset: usize) -> Result<TokenKind, LexError> {
        self.take_while(|b| b.is_ascii_digit());
        if self.peek() == Some(b'.') {
            self.advance();
            self.take_while(|b| b.is_ascii_digit());
        }
        self.parse_number(offset)
    }

    fn parse_number(&mut self, offset: usize) -> Result<TokenKind, LexError> {
        let text = self.slice(offset);
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| LexError::InvalidNumber { offset })
    }

    /// Scans to the matching quote. XPath 1.0 literals have no escapes.
    fn read_literal(&mut self, offset: usize) -> Result<TokenKind, LexError> {
        let quote = self.input[self.pos];
        self.advance();
        let content_start = self.pos;
        self.take_while(|b| b != quote);
        if self.pos >= self.input.len() {
            return Err(LexError::UnterminatedLiteral { offset });
        }
        let content = self.slice_range(content_start, self.pos).to_string();
        self.advance();
        Ok(TokenKind::Literal(content))
    }

    /// `'$' QName`.
    fn read_variable_reference(&mut self, offset: usize) -> Result<TokenKind, LexError> {
        self.advance();
        if !self.peek().is_some_and(is_name_start) {
            return Err(LexError::MissingVariableName { offset });
        }
        let name_start = self.pos;
        self.take_qname();
        Ok(TokenKind::VariableReference(
            self.slice(name_start).to_string(),
        ))
    }

    /// An NCName, QName, `prefix:*`, or a keyword, classified by context.
    fn read_name(&mut self) -> TokenKind {
        let start = self.pos;
        self.take_qname();
        let name = self.slice(start).to_string();

        // After an operand, a bare word can only be an operator name.
        if self.operand_ended {
            match name.as_str() {
                "and" => return TokenKind::And,
                "or" => return TokenKind::Or,
                "mod" => return TokenKind::Mod,
                "div" => return TokenKind::Div,
                _ => {}
            }
        }

        // Lookahead past whitespace: '(' makes this a node type or
        // function name, '::' makes it an axis name.
        let mut ahead = self.pos;
        while ahead < self.input.len() && self.input[ahead].is_ascii_whitespace() {
            ahead += 1;
        }
        if self.input.get(ahead) == Some(&b'(') {
            return match NodeTypeName::from_name(&name) {
                Some(t) => TokenKind::NodeType(t),
                None => TokenKind::FunctionName(name),
            };
        }
        if self.input.get(ahead) == Some(&b':') && self.input.get(ahead + 1) == Some(&b':') {
            return TokenKind::AxisName(name);
        }
        TokenKind::Name(name)
    }

    /// Consumes `NCName (':' (NCName | '*'))?` from the current position.
    fn take_qname(&mut self) {
        self.take_while(is_name_char);
        if self.peek() == Some(b':') {
            match self.input.get(self.pos + 1) {
                Some(&b'*') => {
                    self.pos += 2;
                }
                Some(&b) if b != b':' && is_name_start(b) => {
                    self.advance();
                    self.take_while(is_name_char);
                }
                _ => {} // '::' or end: leave the colon for the next token
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn take_while<F: Fn(u8) -> bool>(&mut self, pred: F) {
        while self.pos < self.input.len() && pred(self.input[self.pos]) {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|b| b.is_ascii_whitespace());
    }

    fn slice(&self, start: usize) -> &str {
        self.slice_range(start, self.pos)
    }

    fn slice_range(&self, start: usize, end: usize) -> &str {
        core::str::from_utf8(&self.input[start..end]).unwrap_or("")
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.') || b >= 0x80
}
