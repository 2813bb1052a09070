//! Hand-rolled tokenizer for SQL + SQL/PGQ. Parallels
//! [`kg_query`]'s SPARQL lexer in structure, but recognizes SQL's
//! single-quoted strings (`''`-escaped, no backslash escapes), `->`/`<-`
//! edge arrows, and `<>` as an alternate spelling of `!=`.

use crate::error::{ParseError, ParseResult};

/// One lexical token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token's payload.
    pub kind: TokenKind,
    /// Byte offset of the token's first character in the source text.
    pub position: usize,
}

/// The tagged union of everything the lexer can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A bare word: keyword, table/column/alias name, or function name.
    Ident(String),
    /// `"quoted identifier"` — a delimited identifier, case preserved.
    QuotedIdent(String),
    /// A single-quoted string literal, `''`-escapes resolved.
    String(String),
    /// An unsigned integer literal's lexical form.
    Integer(String),
    /// An unsigned decimal/double literal's lexical form.
    Decimal(String),
    /// `:name` — a bind parameter, accepted by `GRAPH_TABLE` property
    /// maps' value positions; see
    /// `parser::parse_property_map`).
    Param(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Semicolon,
    Colon,
    Star,
    Plus,
    Minus,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    /// `->` — edge arrow, head right.
    ArrowRight,
    /// `<-` — edge arrow, head left.
    ArrowLeft,
    Eof,
}

impl TokenKind {
    /// Debug-ish label used in `UnexpectedToken` diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("identifier `{s}`"),
            TokenKind::String(s) => format!("'{s}'"),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{other:?}"),
        }
    }
}

/// Tokenizes `input` into a flat list terminated by a single [`TokenKind::Eof`].
pub fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut pos = 0usize;
    let mut tokens = Vec::new();

    loop {
        pos = skip_trivia(bytes, pos);
        if pos >= bytes.len() {
            tokens.push(Token { kind: TokenKind::Eof, position: pos });
            break;
        }
        let start = pos;
        let c = bytes[pos] as char;
        let kind = match c {
            '\'' => lex_single_quoted_string(bytes, &mut pos)?,
            '"' => lex_quoted_ident(bytes, &mut pos)?,
            '0'..='9' => lex_number(bytes, &mut pos),
            ':' => {
                pos += 1;
                if matches!(peek_at(bytes, pos), Some(c) if is_ident_start(c)) {
                    let name_start = pos;
                    while matches!(peek_at(bytes, pos), Some(c) if is_ident_continue(c)) {
                        pos += 1;
                    }
                    TokenKind::Param(String::from_utf8_lossy(&bytes[name_start..pos]).into_owned())
                } else {
                    TokenKind::Colon
                }
            }
            '(' => { pos += 1; TokenKind::LParen }
            ')' => { pos += 1; TokenKind::RParen }
            '[' => { pos += 1; TokenKind::LBracket }
            ']' => { pos += 1; TokenKind::RBracket }
            '{' => { pos += 1; TokenKind::LBrace }
            '}' => { pos += 1; TokenKind::RBrace }
            ',' => { pos += 1; TokenKind::Comma }
            '.' => { pos += 1; TokenKind::Dot }
            ';' => { pos += 1; TokenKind::Semicolon }
            '*' => { pos += 1; TokenKind::Star }
            '+' => { pos += 1; TokenKind::Plus }
            '/' => { pos += 1; TokenKind::Slash }
            '%' => { pos += 1; TokenKind::Percent }
            '=' => { pos += 1; TokenKind::Eq }
            '-' => {
                pos += 1;
                if peek(bytes, pos) == Some(b'>') { pos += 1; TokenKind::ArrowRight } else { TokenKind::Minus }
            }
            '<' => {
                pos += 1;
                if peek(bytes, pos) == Some(b'-') { pos += 1; TokenKind::ArrowLeft }
                else if peek(bytes, pos) == Some(b'=') { pos += 1; TokenKind::Le }
                else if peek(bytes, pos) == Some(b'>') { pos += 1; TokenKind::Ne }
                else { TokenKind::Lt }
            }
            '>' => {
                pos += 1;
                if peek(bytes, pos) == Some(b'=') { pos += 1; TokenKind::Ge } else { TokenKind::Gt }
            }
            '!' => {
                pos += 1;
                if peek(bytes, pos) == Some(b'=') { pos += 1; TokenKind::Ne }
                else {
                    return Err(ParseError::InvalidSyntax { msg: "unexpected '!'".to_string(), position: start });
                }
            }
            c if is_ident_start(c) => lex_ident(bytes, &mut pos),
            other => {
                return Err(ParseError::InvalidSyntax {
                    msg: format!("unexpected character '{other}'"),
                    position: start,
                })
            }
        };
        tokens.push(Token { kind, position: start });
    }
    Ok(tokens)
}

fn peek(bytes: &[u8], pos: usize) -> Option<u8> {
    bytes.get(pos).copied()
}

fn peek_at(bytes: &[u8], pos: usize) -> Option<char> {
    bytes.get(pos).map(|&b| b as char)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn skip_trivia(bytes: &[u8], mut pos: usize) -> usize {
    loop {
        while pos < bytes.len() && (bytes[pos] as char).is_whitespace() {
            pos += 1;
        }
        if pos + 1 < bytes.len() && bytes[pos] == b'-' && bytes[pos + 1] == b'-' {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        if pos + 1 < bytes.len() && bytes[pos] == b'/' && bytes[pos + 1] == b'*' {
            pos += 2;
            while pos + 1 < bytes.len() && !(bytes[pos] == b'*' && bytes[pos + 1] == b'/') {
                pos += 1;
            }
            pos = (pos + 2).min(bytes.len());
            continue;
        }
        break;
    }
    pos
}

/// SQL string literals escape an embedded quote by doubling it (`'it''s'`);
/// unlike SPARQL there is no backslash-escape family.
fn lex_single_quoted_string(bytes: &[u8], pos: &mut usize) -> ParseResult<TokenKind> {
    *pos += 1;
    let mut out = String::new();
    loop {
        match peek(bytes, *pos) {
            None => return Err(ParseError::UnexpectedEndOfInput),
            Some(b'\'') => {
                if peek(bytes, *pos + 1) == Some(b'\'') {
                    out.push('\'');
                    *pos += 2;
                } else {
                    *pos += 1;
                    return Ok(TokenKind::String(out));
                }
            }
            Some(_) => {
                let len = utf8_len(bytes[*pos]);
                out.push_str(&String::from_utf8_lossy(&bytes[*pos..*pos + len]));
                *pos += len;
            }
        }
    }
}

fn lex_quoted_ident(bytes: &[u8], pos: &mut usize) -> ParseResult<TokenKind> {
    *pos += 1;
    let mut out = String::new();
    loop {
        match peek(bytes, *pos) {
            None => return Err(ParseError::UnexpectedEndOfInput),
            Some(b'"') => {
                if peek(bytes, *pos + 1) == Some(b'"') {
                    out.push('"');
                    *pos += 2;
                } else {
                    *pos += 1;
                    return Ok(TokenKind::QuotedIdent(out));
                }
            }
            Some(_) => {
                let len = utf8_len(bytes[*pos]);
                out.push_str(&String::from_utf8_lossy(&bytes[*pos..*pos + len]));
                *pos += len;
            }
        }
    }
}

fn utf8_len(lead: u8) -> usize {
    if lead & 0x80 == 0 {
        1
    } else if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else {
        4
    }
}

fn lex_number(bytes: &[u8], pos: &mut usize) -> TokenKind {
    let start = *pos;
    while matches!(peek_at(bytes, *pos), Some('0'..='9')) {
        *pos += 1;
    }
    let mut is_decimal = false;
    if peek(bytes, *pos) == Some(b'.') && matches!(peek_at(bytes, *pos + 1), Some('0'..='9')) {
        is_decimal = true;
        *pos += 1;
        while matches!(peek_at(bytes, *pos), Some('0'..='9')) {
            *pos += 1;
        }
    }
    if matches!(peek_at(bytes, *pos), Some('e') | Some('E')) {
        let mut look = *pos + 1;
        if matches!(peek_at(bytes, look), Some('+') | Some('-')) {
            look += 1;
        }
        if matches!(peek_at(bytes, look), Some('0'..='9')) {
            is_decimal = true;
            *pos = look;
            while matches!(peek_at(bytes, *pos), Some('0'..='9')) {
                *pos += 1;
            }
        }
    }
    let text = String::from_utf8_lossy(&bytes[start..*pos]).into_owned();
    if is_decimal {
        TokenKind::Decimal(text)
    } else {
        TokenKind::Integer(text)
    }
}

fn lex_ident(bytes: &[u8], pos: &mut usize) -> TokenKind {
    let start = *pos;
    while matches!(peek_at(bytes, *pos), Some(c) if is_ident_continue(c)) {
        *pos += 1;
    }
    TokenKind::Ident(String::from_utf8_lossy(&bytes[start..*pos]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_select_tokens() {
        let ks = kinds("SELECT a, b FROM t WHERE a = 1");
        assert_eq!(
            ks,
            vec![
                TokenKind::Ident("SELECT".into()),
                TokenKind::Ident("a".into()),
                TokenKind::Comma,
                TokenKind::Ident("b".into()),
                TokenKind::Ident("FROM".into()),
                TokenKind::Ident("t".into()),
                TokenKind::Ident("WHERE".into()),
                TokenKind::Ident("a".into()),
                TokenKind::Eq,
                TokenKind::Integer("1".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literal_escapes_doubled_quote() {
        assert_eq!(kinds("'it''s'")[0], TokenKind::String("it's".into()));
    }

    #[test]
    fn distinguishes_arrows_and_comparisons() {
        assert_eq!(kinds("->"), vec![TokenKind::ArrowRight, TokenKind::Eof]);
        assert_eq!(kinds("<-"), vec![TokenKind::ArrowLeft, TokenKind::Eof]);
        assert_eq!(kinds("<>"), vec![TokenKind::Ne, TokenKind::Eof]);
        assert_eq!(kinds("<="), vec![TokenKind::Le, TokenKind::Eof]);
    }

    #[test]
    fn line_and_block_comments_are_skipped() {
        assert_eq!(kinds("-- comment\nSELECT /* x */ 1"), vec![TokenKind::Ident("SELECT".into()), TokenKind::Integer("1".into()), TokenKind::Eof]);
    }
}
