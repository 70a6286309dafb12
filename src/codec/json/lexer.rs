//! Tokenizer for the canonical JSON mapping, grounded line-for-line on a
//! hand-rolled `reader`/`lexer` pair rather than a pull-based `io.Reader`
//! abstraction: since this crate always decodes a complete in-memory
//! buffer (§1 non-goals exclude streaming codecs), the lexer is a cursor
//! over a borrowed byte slice instead.

use crate::error::{JsonError, Position};

/// The kind of token the lexer last produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    String,
    Number,
    True,
    False,
    Null,
    ObjectOpen,
    ObjectClose,
    ArrayOpen,
    ArrayClose,
    Colon,
    Comma,
}

/// A cursor over a JSON byte slice, tracking a 1-based (line, column)
/// position normalized over CR, LF, and CRLF line terminators.
///
/// Columns are counted per byte rather than per Unicode scalar value —
/// the grammar's only multi-byte content is inside string literals, where
/// position only matters for reporting an escape or control-character
/// error, and a byte count is close enough for that purpose without the
/// cost of decoding every character up front.
///
/// Once an error occurs it is sticky: further calls to [`Lexer::next`]
/// return the same error without attempting to scan past it.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    kind: TokenKind,
    tok_pos: Position,
    value: String,
    error: Option<JsonError>,
}

impl<'a> Lexer<'a> {
    /// Builds a lexer positioned before the first token — call
    /// [`Lexer::next`] once to scan it.
    pub fn new(input: &'a [u8]) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 0,
            col: 0,
            kind: TokenKind::Eof,
            tok_pos: Position::default(),
            value: String::new(),
            error: None,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The position the current token started at.
    pub fn position(&self) -> Position {
        self.tok_pos
    }

    /// The string payload of a `String` or `Number` token.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Scans the next token. After `Eof` is reached, repeated calls keep
    /// returning `Eof`.
    pub fn next(&mut self) -> Result<(), JsonError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        match self.scan() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.error = Some(e.clone());
                self.kind = TokenKind::Eof;
                Err(e)
            }
        }
    }

    fn scan(&mut self) -> Result<(), JsonError> {
        self.skip_whitespace();
        self.tok_pos = self.cursor_position();
        match self.peek_byte() {
            None => {
                self.kind = TokenKind::Eof;
                self.value.clear();
                Ok(())
            }
            Some(b'{') => self.accept_simple(TokenKind::ObjectOpen),
            Some(b'}') => self.accept_simple(TokenKind::ObjectClose),
            Some(b'[') => self.accept_simple(TokenKind::ArrayOpen),
            Some(b']') => self.accept_simple(TokenKind::ArrayClose),
            Some(b',') => self.accept_simple(TokenKind::Comma),
            Some(b':') => self.accept_simple(TokenKind::Colon),
            Some(b'"') => self.scan_string(),
            Some(b'-' | b'+' | b'0'..=b'9') => self.scan_number(),
            Some(b) if b.is_ascii_alphabetic() => self.scan_keyword(),
            Some(b) => Err(JsonError::UnexpectedToken {
                pos: self.tok_pos,
                expected: "a JSON token",
                found: (b as char).to_string(),
            }),
        }
    }

    fn cursor_position(&self) -> Position {
        Position {
            line: self.line,
            column: self.col,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) {
        match self.peek_byte() {
            None => {}
            Some(b'\r') => {
                self.pos += 1;
                if self.peek_byte() == Some(b'\n') {
                    self.pos += 1;
                }
                self.line += 1;
                self.col = 0;
            }
            Some(b'\n') => {
                self.pos += 1;
                self.line += 1;
                self.col = 0;
            }
            Some(_) => {
                self.pos += 1;
                self.col += 1;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_byte(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.bump();
        }
    }

    fn accept_simple(&mut self, kind: TokenKind) -> Result<(), JsonError> {
        self.kind = kind;
        self.value.clear();
        self.bump();
        Ok(())
    }

    fn scan_string(&mut self) -> Result<(), JsonError> {
        self.bump(); // opening quote
        let mut buf = Vec::new();
        loop {
            let run_start = self.pos;
            while matches!(self.input.get(self.pos), Some(&b) if b != b'"' && b != b'\\' && b >= 0x20)
            {
                self.pos += 1;
            }
            self.col += self.pos - run_start;
            buf.extend_from_slice(&self.input[run_start..self.pos]);

            match self.peek_byte() {
                None => return Err(JsonError::UnexpectedEof),
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(b'\\') => {
                    self.bump();
                    self.scan_escape(&mut buf)?;
                }
                Some(b) => {
                    return Err(JsonError::UnexpectedToken {
                        pos: self.cursor_position(),
                        expected: "a string character",
                        found: format!("{:#04x}", b),
                    });
                }
            }
        }
        self.kind = TokenKind::String;
        self.value = String::from_utf8(buf).map_err(|_| JsonError::UnexpectedEof)?;
        Ok(())
    }

    /// Resolves one escape sequence (the leading `\` already consumed).
    ///
    /// `\uXXXX` stores the decoded code point directly with no surrogate
    /// pair combination — a lone surrogate maps to the Unicode
    /// replacement character rather than being rejected. See the crate's
    /// documented limitation on this corner of the grammar.
    fn scan_escape(&mut self, buf: &mut Vec<u8>) -> Result<(), JsonError> {
        let esc_pos = self.cursor_position();
        match self.peek_byte() {
            None => Err(JsonError::UnexpectedEof),
            Some(b'"') => {
                buf.push(b'"');
                self.bump();
                Ok(())
            }
            Some(b'\\') => {
                buf.push(b'\\');
                self.bump();
                Ok(())
            }
            Some(b'/') => {
                buf.push(b'/');
                self.bump();
                Ok(())
            }
            Some(b'b') => {
                buf.push(0x08);
                self.bump();
                Ok(())
            }
            Some(b'f') => {
                buf.push(0x0C);
                self.bump();
                Ok(())
            }
            Some(b'n') => {
                buf.push(b'\n');
                self.bump();
                Ok(())
            }
            Some(b'r') => {
                buf.push(b'\r');
                self.bump();
                Ok(())
            }
            Some(b't') => {
                buf.push(b'\t');
                self.bump();
                Ok(())
            }
            Some(b'u') => {
                self.bump();
                let mut cp: u32 = 0;
                for _ in 0..4 {
                    let digit = self
                        .peek_byte()
                        .and_then(|h| (h as char).to_digit(16))
                        .ok_or(JsonError::BadEscape { pos: esc_pos })?;
                    cp = (cp << 4) | digit;
                    self.bump();
                }
                let ch = char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER);
                let mut scratch = [0u8; 4];
                buf.extend_from_slice(ch.encode_utf8(&mut scratch).as_bytes());
                Ok(())
            }
            Some(_) => Err(JsonError::BadEscape { pos: esc_pos }),
        }
    }

    fn scan_number(&mut self) -> Result<(), JsonError> {
        let start = self.pos;

        if matches!(self.peek_byte(), Some(b'-' | b'+')) {
            self.bump();
        }

        match self.peek_byte() {
            Some(b'0') => {
                self.bump();
                if matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                    return Err(JsonError::BadNumber { pos: self.tok_pos });
                }
            }
            Some(b'1'..=b'9') => {
                while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                    self.bump();
                }
            }
            _ => return Err(JsonError::BadNumber { pos: self.tok_pos }),
        }

        if self.peek_byte() == Some(b'.') {
            self.bump();
            if !matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                return Err(JsonError::BadNumber { pos: self.tok_pos });
            }
            while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                self.bump();
            }
        }

        if matches!(self.peek_byte(), Some(b'e' | b'E')) {
            self.bump();
            if matches!(self.peek_byte(), Some(b'-' | b'+')) {
                self.bump();
            }
            if !matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                return Err(JsonError::BadNumber { pos: self.tok_pos });
            }
            while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                self.bump();
            }
        }

        self.kind = TokenKind::Number;
        self.value = core::str::from_utf8(&self.input[start..self.pos])
            .expect("numeric lexeme is ascii")
            .to_string();
        Ok(())
    }

    fn scan_keyword(&mut self) -> Result<(), JsonError> {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphabetic()) {
            self.bump();
        }
        let word =
            core::str::from_utf8(&self.input[start..self.pos]).expect("keyword lexeme is ascii");
        match word {
            "true" => self.kind = TokenKind::True,
            "false" => self.kind = TokenKind::False,
            "null" => self.kind = TokenKind::Null,
            other => {
                return Err(JsonError::BadKeyword {
                    pos: self.tok_pos,
                    found: other.to_string(),
                })
            }
        }
        self.value.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<TokenKind> {
        let mut lx = Lexer::new(input.as_bytes());
        let mut out = Vec::new();
        loop {
            lx.next().unwrap();
            out.push(lx.kind());
            if lx.kind() == TokenKind::Eof {
                break;
            }
        }
        out
    }

    #[test]
    fn tokenizes_structural_characters() {
        assert_eq!(
            tokens("{ } [ ] : ,"),
            vec![
                TokenKind::ObjectOpen,
                TokenKind::ObjectClose,
                TokenKind::ArrayOpen,
                TokenKind::ArrayClose,
                TokenKind::Colon,
                TokenKind::Comma,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes_decode() {
        let mut lx = Lexer::new(br#""a\nbA\"c""#);
        lx.next().unwrap();
        assert_eq!(lx.kind(), TokenKind::String);
        assert_eq!(lx.value(), "a\nbA\"c");
    }

    #[test]
    fn leading_zero_is_rejected() {
        let mut lx = Lexer::new(b"01");
        assert!(lx.next().is_err());
    }

    #[test]
    fn number_lexical_form_is_preserved() {
        let mut lx = Lexer::new(b"-12.50e+3");
        lx.next().unwrap();
        assert_eq!(lx.kind(), TokenKind::Number);
        assert_eq!(lx.value(), "-12.50e+3");
    }

    #[test]
    fn crlf_counts_as_one_line() {
        let mut lx = Lexer::new(b"1\r\n2");
        lx.next().unwrap();
        assert_eq!(lx.position(), Position { line: 0, column: 0 });
        lx.next().unwrap();
        assert_eq!(lx.position(), Position { line: 1, column: 0 });
    }

    #[test]
    fn keyword_must_be_known() {
        let mut lx = Lexer::new(b"nil");
        assert!(matches!(lx.next(), Err(JsonError::BadKeyword { .. })));
    }

    #[test]
    fn sticky_error_stays_after_first_failure() {
        let mut lx = Lexer::new(b"@");
        let first = lx.next().unwrap_err();
        let second = lx.next().unwrap_err();
        assert_eq!(first, second);
    }
}
