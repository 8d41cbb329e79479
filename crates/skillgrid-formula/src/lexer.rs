//! Tolerant formula lexer
//!
//! Splits formula text into coarse tokens without ever failing. String
//! literals and quoted sheet names are consumed whole so their contents are
//! never mistaken for functions, references or parentheses. An unterminated
//! literal simply runs to the end of the input.

/// Token kinds produced by [`Lexer`]
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Run of letters, digits, `_`, `.` and `$` (names, references, numbers)
    Word(String),
    /// `"..."` string literal, quotes removed
    Text(String),
    /// `'...'` quoted sheet name, quotes removed
    QuotedName(String),
    LeftParen,
    RightParen,
    Colon,
    Comma,
    /// `!` separating a sheet name from a reference
    Bang,
    /// Any other single character (operators, braces, `#`)
    Symbol(char),
}

/// A token with its byte span in the formula body
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

impl Lexeme {
    /// True when `next` begins exactly where this lexeme ends
    pub fn touches(&self, next: &Lexeme) -> bool {
        self.end == next.start
    }
}

/// Character-level scanner over a formula body
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Scan the whole input
    pub fn tokenize(mut self) -> Vec<Lexeme> {
        let mut lexemes = Vec::new();
        while let Some(lexeme) = self.next_lexeme() {
            lexemes.push(lexeme);
        }
        lexemes
    }

    fn next_lexeme(&mut self) -> Option<Lexeme> {
        self.skip_whitespace();
        let start = self.pos;
        let c = self.peek_char()?;

        let token = match c {
            '"' => Token::Text(self.quoted('"')),
            '\'' => Token::QuotedName(self.quoted('\'')),
            c if is_word_char(c) => {
                while self.peek_char().is_some_and(is_word_char) {
                    self.advance();
                }
                Token::Word(self.input[start..self.pos].to_string())
            }
            _ => {
                self.advance();
                match c {
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    ':' => Token::Colon,
                    ',' | ';' => Token::Comma,
                    '!' => Token::Bang,
                    other => Token::Symbol(other),
                }
            }
        };

        Some(Lexeme {
            token,
            start,
            end: self.pos,
        })
    }

    /// Consume a literal delimited by `quote`; a doubled quote is an escape
    fn quoted(&mut self, quote: char) -> String {
        self.advance();
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            self.advance();
            if c == quote {
                if self.peek_char() == Some(quote) {
                    self.advance();
                    text.push(quote);
                    continue;
                }
                return text;
            }
            text.push(c);
        }
        text
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$')
}

/// Tokenize a formula body (without the leading `=`)
pub fn tokenize(input: &str) -> Vec<Lexeme> {
    Lexer::new(input).tokenize()
}
