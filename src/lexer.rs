use crate::diagnostics::{Diagnostic, DiagnosticKind, SourcePos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Else,
    While,
    For,
    In,
    Match,
    Func,
    Return,
    Break,
    Continue,
    True,
    False,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Char,
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Arrow,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampersand,
    Pipe,
    Tilde,
    DoubleAmpersand,
    DoublePipe,
    Bang,
    BangEqual,
    EqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Unknown,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub pos: SourcePos,
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
            line: 1,
            column: 1,
        }
    }

    /// Position of the next unconsumed character.
    fn pos(&self) -> SourcePos {
        SourcePos::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = if let Some((idx, ch)) = self.peeked.take() {
            Some((idx, ch))
        } else {
            self.chars.next()
        };
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some((idx, ch))
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn match_next(&mut self, expected: char) -> bool {
        if let Some((_, ch)) = self.peek() {
            if ch == expected {
                self.bump();
                return true;
            }
        }
        false
    }

    fn collect_while<F>(&mut self, start: usize, mut predicate: F) -> String
    where
        F: FnMut(char) -> bool,
    {
        let mut end = self.current;
        while let Some((idx, ch)) = self.peek() {
            if predicate(ch) {
                self.bump();
                end = idx + ch.len_utf8();
            } else {
                break;
            }
        }
        self.source[start..end].to_string()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let mut progressed = false;

            while let Some((_, ch)) = self.peek() {
                if ch.is_whitespace() {
                    self.bump();
                    progressed = true;
                } else {
                    break;
                }
            }

            let mut handled_comment = false;
            if let Some((start, '/')) = self.peek() {
                if let Some((_, next)) = self.chars.clone().next() {
                    if next == '/' {
                        self.bump();
                        self.bump();
                        while let Some((_, ch)) = self.peek() {
                            if ch == '\n' {
                                break;
                            }
                            self.bump();
                        }
                        handled_comment = true;
                    } else if next == '*' {
                        self.bump();
                        self.bump();
                        while let Some((_, ch)) = self.bump() {
                            if ch == '*' {
                                if let Some((_, '/')) = self.peek() {
                                    self.bump();
                                    break;
                                }
                            }
                        }
                        handled_comment = true;
                    }
                }
                if !handled_comment {
                    self.peeked = Some((start, '/'));
                }
            }

            if handled_comment {
                progressed = true;
            }

            if !progressed {
                break;
            }
        }
    }

    fn identifier_or_keyword(&mut self, start: usize, pos: SourcePos) -> Token {
        let lexeme = self.collect_while(start, |ch| ch.is_alphanumeric() || ch == '_');
        let kind = keyword_for(&lexeme).unwrap_or(TokenKind::Identifier);
        Token { kind, lexeme, pos }
    }

    fn number_literal(&mut self, start: usize, pos: SourcePos) -> Token {
        let mut end = self.current;
        let mut seen_dot = false;
        while let Some((idx, ch)) = self.peek() {
            match ch {
                '0'..='9' => {
                    self.bump();
                    end = idx + ch.len_utf8();
                }
                '.' if !seen_dot => {
                    // A dot only belongs to the number when a digit follows.
                    let mut lookahead = self.chars.clone();
                    match lookahead.next() {
                        Some((_, '0'..='9')) => {
                            seen_dot = true;
                            self.bump();
                            end = idx + 1;
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
        Token {
            kind: TokenKind::Number,
            lexeme: self.source[start..end].to_string(),
            pos,
        }
    }

    fn string_literal(&mut self, pos: SourcePos) -> Result<Token, Diagnostic> {
        let mut value = String::new();
        while let Some((_, ch)) = self.bump() {
            match ch {
                '"' => {
                    return Ok(Token {
                        kind: TokenKind::String,
                        lexeme: value,
                        pos,
                    });
                }
                '\\' => {
                    if let Some((_, esc)) = self.bump() {
                        value.push(unescape(esc));
                    } else {
                        break;
                    }
                }
                _ => value.push(ch),
            }
        }
        Err(Diagnostic::new(DiagnosticKind::Lex, "unterminated string literal").at(pos))
    }

    fn char_literal(&mut self, pos: SourcePos) -> Result<Token, Diagnostic> {
        let ch = match self.bump() {
            Some((_, '\\')) => match self.bump() {
                Some((_, esc)) => unescape(esc),
                None => {
                    return Err(
                        Diagnostic::new(DiagnosticKind::Lex, "unterminated char literal").at(pos),
                    );
                }
            },
            Some((_, '\'')) => {
                return Err(Diagnostic::new(DiagnosticKind::Lex, "empty char literal").at(pos));
            }
            Some((_, ch)) => ch,
            None => {
                return Err(
                    Diagnostic::new(DiagnosticKind::Lex, "unterminated char literal").at(pos),
                );
            }
        };
        if !self.match_next('\'') {
            return Err(Diagnostic::new(DiagnosticKind::Lex, "unterminated char literal").at(pos));
        }
        Ok(Token {
            kind: TokenKind::Char,
            lexeme: ch.to_string(),
            pos,
        })
    }

    fn simple_token(&mut self, start: usize, pos: SourcePos, kind: TokenKind) -> Token {
        let end = self.current;
        Token {
            kind,
            lexeme: self.source[start..end].to_string(),
            pos,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let pos = self.pos();
            let (start, ch) = match self.bump() {
                Some(pair) => pair,
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        lexeme: String::new(),
                        pos,
                    });
                    break;
                }
            };

            let token = match ch {
                'a'..='z' | 'A'..='Z' | '_' => self.identifier_or_keyword(start, pos),
                '0'..='9' => self.number_literal(start, pos),
                '"' => self.string_literal(pos)?,
                '\'' => self.char_literal(pos)?,
                '(' => self.simple_token(start, pos, TokenKind::LParen),
                ')' => self.simple_token(start, pos, TokenKind::RParen),
                '{' => self.simple_token(start, pos, TokenKind::LBrace),
                '}' => self.simple_token(start, pos, TokenKind::RBrace),
                '[' => self.simple_token(start, pos, TokenKind::LBracket),
                ']' => self.simple_token(start, pos, TokenKind::RBracket),
                ',' => self.simple_token(start, pos, TokenKind::Comma),
                ';' => self.simple_token(start, pos, TokenKind::Semicolon),
                '~' => self.simple_token(start, pos, TokenKind::Tilde),
                '+' => {
                    if self.match_next('=') {
                        self.simple_token(start, pos, TokenKind::PlusAssign)
                    } else {
                        self.simple_token(start, pos, TokenKind::Plus)
                    }
                }
                '-' => {
                    if self.match_next('>') {
                        self.simple_token(start, pos, TokenKind::Arrow)
                    } else if self.match_next('=') {
                        self.simple_token(start, pos, TokenKind::MinusAssign)
                    } else {
                        self.simple_token(start, pos, TokenKind::Minus)
                    }
                }
                '*' => {
                    if self.match_next('=') {
                        self.simple_token(start, pos, TokenKind::StarAssign)
                    } else {
                        self.simple_token(start, pos, TokenKind::Star)
                    }
                }
                '/' => {
                    if self.match_next('=') {
                        self.simple_token(start, pos, TokenKind::SlashAssign)
                    } else {
                        self.simple_token(start, pos, TokenKind::Slash)
                    }
                }
                '%' => {
                    if self.match_next('=') {
                        self.simple_token(start, pos, TokenKind::PercentAssign)
                    } else {
                        self.simple_token(start, pos, TokenKind::Percent)
                    }
                }
                '=' => {
                    if self.match_next('=') {
                        self.simple_token(start, pos, TokenKind::EqualEqual)
                    } else {
                        self.simple_token(start, pos, TokenKind::Assign)
                    }
                }
                '!' => {
                    if self.match_next('=') {
                        self.simple_token(start, pos, TokenKind::BangEqual)
                    } else {
                        self.simple_token(start, pos, TokenKind::Bang)
                    }
                }
                '&' => {
                    if self.match_next('&') {
                        self.simple_token(start, pos, TokenKind::DoubleAmpersand)
                    } else {
                        self.simple_token(start, pos, TokenKind::Ampersand)
                    }
                }
                '|' => {
                    if self.match_next('|') {
                        self.simple_token(start, pos, TokenKind::DoublePipe)
                    } else {
                        self.simple_token(start, pos, TokenKind::Pipe)
                    }
                }
                '<' => {
                    if self.match_next('=') {
                        self.simple_token(start, pos, TokenKind::LessEqual)
                    } else {
                        self.simple_token(start, pos, TokenKind::Less)
                    }
                }
                '>' => {
                    if self.match_next('=') {
                        self.simple_token(start, pos, TokenKind::GreaterEqual)
                    } else {
                        self.simple_token(start, pos, TokenKind::Greater)
                    }
                }
                _ => self.simple_token(start, pos, TokenKind::Unknown),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn unescape(esc: char) -> char {
    match esc {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '0' => '\0',
        '\'' => '\'',
        '"' => '"',
        '\\' => '\\',
        other => other,
    }
}

fn keyword_for(ident: &str) -> Option<TokenKind> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "if" => Kw::If,
        "else" => Kw::Else,
        "while" => Kw::While,
        "for" => Kw::For,
        "in" => Kw::In,
        "match" => Kw::Match,
        "func" => Kw::Func,
        "return" => Kw::Return,
        "break" => Kw::Break,
        "continue" => Kw::Continue,
        "true" => Kw::True,
        "false" => Kw::False,
        "null" => Kw::Null,
        _ => return None,
    };
    Some(TokenKind::Keyword(keyword))
}
