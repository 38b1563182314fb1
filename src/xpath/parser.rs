//! XPath 1.0 tokenizer and recursive-descent parser.
//!
//! Covers the practical core of the grammar: location paths with
//! abbreviated (`//`, `.`, `..`, `@`) and named axes, predicates, the
//! operators, and function calls. Namespaced names and the rarely-used
//! filter-expression path continuations are not supported.

use super::ast::{Axis, BinaryOp, Expr, NodeTest, PathExpr, Step};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Dot,
    DotDot,
    Comma,
    Pipe,
    Plus,
    Minus,
    Star,
    Equals,
    NotEquals,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    DoubleColon,
    Literal(String),
    Number(f64),
    Ident(String),
}

pub(crate) fn parse(source: &str) -> Result<Expr, String> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!(
            "unexpected trailing input at token {}",
            parser.pos + 1
        ));
    }
    Ok(expr)
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Token::DoubleSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '@' => {
                tokens.push(Token::At);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Equals);
                i += 1;
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEquals);
                    i += 2;
                } else {
                    return Err("unexpected '!'".to_string());
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::LessEq);
                    i += 2;
                } else {
                    tokens.push(Token::Less);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::GreaterEq);
                    i += 2;
                } else {
                    tokens.push(Token::Greater);
                    i += 1;
                }
            }
            ':' => {
                if chars.get(i + 1) == Some(&':') {
                    tokens.push(Token::DoubleColon);
                    i += 2;
                } else {
                    return Err("namespaced names are not supported".to_string());
                }
            }
            '"' | '\'' => {
                let quote = ch;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end == chars.len() {
                    return Err("unterminated string literal".to_string());
                }
                tokens.push(Token::Literal(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '.' => {
                if chars.get(i + 1).is_some_and(char::is_ascii_digit) {
                    let (number, next) = lex_number(&chars, i)?;
                    tokens.push(Token::Number(number));
                    i = next;
                } else if chars.get(i + 1) == Some(&'.') {
                    tokens.push(Token::DotDot);
                    i += 2;
                } else {
                    tokens.push(Token::Dot);
                    i += 1;
                }
            }
            c if c.is_ascii_digit() => {
                let (number, next) = lex_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '-'))
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character {other:?}")),
        }
    }
    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize) -> Result<(f64, usize), String> {
    let mut end = start;
    let mut seen_dot = false;
    while end < chars.len() && (chars[end].is_ascii_digit() || (chars[end] == '.' && !seen_dot)) {
        if chars[end] == '.' {
            seen_dot = true;
        }
        end += 1;
    }
    let text: String = chars[start..end].iter().collect();
    text.parse::<f64>()
        .map(|number| (number, end))
        .map_err(|_| format!("invalid number {text:?}"))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, wanted: &Token) -> Result<(), String> {
        match self.advance() {
            Some(token) if token == *wanted => Ok(()),
            other => Err(format!("expected {wanted:?}, found {other:?}")),
        }
    }

    fn peek_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name == word)
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.peek_ident("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_equality()?;
        while self.peek_ident("and") {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Equals) => BinaryOp::Eq,
                Some(Token::NotEquals) => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Less) => BinaryOp::Lt,
                Some(Token::LessEq) => BinaryOp::LtEq,
                Some(Token::Greater) => BinaryOp::Gt,
                Some(Token::GreaterEq) => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Ident(name)) if name == "div" => BinaryOp::Div,
                Some(Token::Ident(name)) if name == "mod" => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_primary()?;
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            let right = self.parse_primary()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Literal(_)) => {
                if let Some(Token::Literal(text)) = self.advance() {
                    Ok(Expr::Literal(text))
                } else {
                    Err("literal expected".to_string())
                }
            }
            Some(Token::Number(_)) => {
                if let Some(Token::Number(number)) = self.advance() {
                    Ok(Expr::Number(number))
                } else {
                    Err("number expected".to_string())
                }
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name))
                if self.peek_at(1) == Some(&Token::LParen)
                    && name != "text"
                    && name != "node" =>
            {
                self.parse_call()
            }
            _ => Ok(Expr::Path(self.parse_path()?)),
        }
    }

    fn parse_call(&mut self) -> Result<Expr, String> {
        let Some(Token::Ident(name)) = self.advance() else {
            return Err("function name expected".to_string());
        };
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.peek() == Some(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        Ok(Expr::Call(name, args))
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Ident(_) | Token::Star | Token::At | Token::Dot | Token::DotDot)
        )
    }

    fn parse_path(&mut self) -> Result<PathExpr, String> {
        let mut steps = Vec::new();
        let absolute;
        let mut pending_descendant = false;

        match self.peek() {
            Some(Token::Slash) => {
                absolute = true;
                self.advance();
                if !self.starts_step() {
                    // A lone `/` selects the document root.
                    return Ok(PathExpr { absolute, steps });
                }
            }
            Some(Token::DoubleSlash) => {
                absolute = true;
                pending_descendant = true;
                self.advance();
            }
            _ => absolute = false,
        }

        steps.push(self.parse_step(pending_descendant)?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.advance();
                    steps.push(self.parse_step(false)?);
                }
                Some(Token::DoubleSlash) => {
                    self.advance();
                    steps.push(self.parse_step(true)?);
                }
                _ => break,
            }
        }

        Ok(PathExpr { absolute, steps })
    }

    fn parse_step(&mut self, descendant: bool) -> Result<Step, String> {
        let (axis, test) = match self.peek() {
            Some(Token::Dot) => {
                self.advance();
                (Axis::SelfAxis, NodeTest::Node)
            }
            Some(Token::DotDot) => {
                self.advance();
                (Axis::Parent, NodeTest::Node)
            }
            Some(Token::At) => {
                self.advance();
                let test = self.parse_node_test(true)?;
                (Axis::Attribute, test)
            }
            Some(Token::Ident(name)) if self.peek_at(1) == Some(&Token::DoubleColon) => {
                let axis = axis_by_name(name)?;
                self.advance();
                self.advance();
                let test = self.parse_node_test(axis == Axis::Attribute)?;
                (axis, test)
            }
            _ => {
                let test = self.parse_node_test(false)?;
                (Axis::Child, test)
            }
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.advance();
            predicates.push(self.parse_or()?);
            self.expect(&Token::RBracket)?;
        }

        Ok(Step {
            descendant,
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self, attribute_axis: bool) -> Result<NodeTest, String> {
        match self.advance() {
            Some(Token::Star) => Ok(NodeTest::Wildcard),
            Some(Token::Ident(name)) => {
                if !attribute_axis && self.peek() == Some(&Token::LParen) {
                    match name.as_str() {
                        "text" => {
                            self.advance();
                            self.expect(&Token::RParen)?;
                            return Ok(NodeTest::Text);
                        }
                        "node" => {
                            self.advance();
                            self.expect(&Token::RParen)?;
                            return Ok(NodeTest::Node);
                        }
                        other => return Err(format!("unsupported node test {other}()")),
                    }
                }
                Ok(NodeTest::Name(name.to_lowercase()))
            }
            other => Err(format!("expected a node test, found {other:?}")),
        }
    }
}

fn axis_by_name(name: &str) -> Result<Axis, String> {
    match name {
        "child" => Ok(Axis::Child),
        "descendant" => Ok(Axis::Descendant),
        "descendant-or-self" => Ok(Axis::DescendantOrSelf),
        "self" => Ok(Axis::SelfAxis),
        "parent" => Ok(Axis::Parent),
        "ancestor" => Ok(Axis::Ancestor),
        "attribute" => Ok(Axis::Attribute),
        "following-sibling" => Ok(Axis::FollowingSibling),
        "preceding-sibling" => Ok(Axis::PrecedingSibling),
        other => Err(format!("unsupported axis {other:?}")),
    }
}
