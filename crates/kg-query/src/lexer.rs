//! Hand-rolled tokenizer for SPARQL 1.1/1.2.
//!
//! A cursor over the source bytes, producing [`Token`]s tagged with the byte
//! offset they start at (every [`crate::error::ParseError`] variant carries
//! a position derived from this). Keywords are not distinguished from plain
//! identifiers at this layer — the parser compares them case-insensitively
//! (uppercased), so the lexer only ever emits [`TokenKind::Ident`]
//! and lets the parser decide whether an identifier is a keyword, a function
//! name, or a prefix.

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
    /// A bare word: keyword, `a`, or (with a following `(`) a function name.
    Ident(String),
    /// `<iri>` — the bracket's content, unescaped.
    Iri(String),
    /// `prefix:` — a namespace declaration target (`PNAME_NS`).
    PNameNs(String),
    /// `prefix:local` — a prefixed name (`PNAME_LN`); `prefix` may be empty
    /// (the default namespace, written `:local`).
    PNameLn(String, String),
    /// `?name` or `$name`.
    Variable(String),
    /// `_:id`.
    BlankNode(String),
    /// An unsigned integer literal's lexical form.
    Integer(String),
    /// An unsigned decimal literal's lexical form (no exponent).
    Decimal(String),
    /// An unsigned double literal's lexical form (has an exponent).
    Double(String),
    /// A string literal's unescaped content (quote style is not retained).
    String(String),
    /// `@lang` or `@lang--dir` immediately following a string literal.
    LangTag { lang: String, direction: Option<String> },
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    /// `{|` — RDF-star annotation block open.
    LBracePipe,
    /// `|}` — RDF-star annotation block close.
    PipeRBrace,
    /// `<<` — RDF-star quoted-triple open.
    LAngleAngle,
    /// `>>` — RDF-star quoted-triple close.
    RAngleAngle,
    Dot,
    Comma,
    Semicolon,
    Pipe,
    PipePipe,
    Amp,
    AmpAmp,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    CaretCaret,
    Bang,
    /// A bare `?` used as the zero-or-one path modifier (not followed by a
    /// name character, so it cannot be a variable).
    QuestionMark,
    /// `~` — the RDF-star reifier marker (`<<s p o ~r>>`).
    Tilde,
    Eof,
}

impl TokenKind {
    /// Debug-ish label used in `UnexpectedToken` diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("identifier `{s}`"),
            TokenKind::Iri(s) => format!("<{s}>"),
            TokenKind::Variable(s) => format!("?{s}"),
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
            '<' => lex_lt_family(bytes, &mut pos)?,
            '>' => {
                pos += 1;
                if peek(bytes, pos) == Some(b'>') {
                    pos += 1;
                    TokenKind::RAngleAngle
                } else if peek(bytes, pos) == Some(b'=') {
                    pos += 1;
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '?' | '$' => lex_variable_or_modifier(bytes, &mut pos)?,
            '_' if peek_at(bytes, pos + 1) == Some(':') => lex_blank_node(bytes, &mut pos)?,
            '"' | '\'' => lex_string(bytes, &mut pos, start)?,
            '0'..='9' => lex_number(bytes, &mut pos),
            '.' if matches!(peek_at(bytes, pos + 1), Some('0'..='9')) => lex_number(bytes, &mut pos),
            '@' => lex_lang_tag(bytes, &mut pos, start)?,
            '(' => { pos += 1; TokenKind::LParen }
            ')' => { pos += 1; TokenKind::RParen }
            '{' => {
                pos += 1;
                if peek(bytes, pos) == Some(b'|') { pos += 1; TokenKind::LBracePipe } else { TokenKind::LBrace }
            }
            '}' => { pos += 1; TokenKind::RBrace }
            '[' => { pos += 1; TokenKind::LBracket }
            ']' => { pos += 1; TokenKind::RBracket }
            ',' => { pos += 1; TokenKind::Comma }
            ';' => { pos += 1; TokenKind::Semicolon }
            '|' => {
                pos += 1;
                if peek(bytes, pos) == Some(b'|') { pos += 1; TokenKind::PipePipe }
                else if peek(bytes, pos) == Some(b'}') { pos += 1; TokenKind::PipeRBrace }
                else { TokenKind::Pipe }
            }
            '&' => {
                pos += 1;
                if peek(bytes, pos) == Some(b'&') { pos += 1; TokenKind::AmpAmp } else { TokenKind::Amp }
            }
            '=' => { pos += 1; TokenKind::Eq }
            '!' => {
                pos += 1;
                if peek(bytes, pos) == Some(b'=') { pos += 1; TokenKind::Ne } else { TokenKind::Bang }
            }
            '+' => { pos += 1; TokenKind::Plus }
            '-' => { pos += 1; TokenKind::Minus }
            '*' => { pos += 1; TokenKind::Star }
            '/' => { pos += 1; TokenKind::Slash }
            '^' => {
                pos += 1;
                if peek(bytes, pos) == Some(b'^') { pos += 1; TokenKind::CaretCaret } else { TokenKind::Caret }
            }
            ':' => {
                pos += 1;
                lex_pname(bytes, &mut pos, "")?
            }
            '~' => { pos += 1; TokenKind::Tilde }
            c if is_pn_chars_base(c) => lex_ident_or_pname(bytes, &mut pos)?,
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

fn skip_trivia(bytes: &[u8], mut pos: usize) -> usize {
    loop {
        while pos < bytes.len() && (bytes[pos] as char).is_whitespace() {
            pos += 1;
        }
        if pos < bytes.len() && bytes[pos] == b'#' {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        break;
    }
    pos
}

/// `<` starts either an IRIREF, `<<`, or `<=`/`<`. IRIREF forbids control
/// chars (<=0x20) and `<>"{}|^\``, so a maximal-munch scan for a closing
/// unescaped `>` resolves the ambiguity without lookahead into the grammar.
fn lex_lt_family(bytes: &[u8], pos: &mut usize) -> ParseResult<TokenKind> {
    let start = *pos;
    *pos += 1;
    if peek(bytes, *pos) == Some(b'<') {
        *pos += 1;
        return Ok(TokenKind::LAngleAngle);
    }
    if peek(bytes, *pos) == Some(b'=') {
        *pos += 1;
        return Ok(TokenKind::Le);
    }
    let content_start = *pos;
    let mut scan = *pos;
    loop {
        match peek(bytes, scan) {
            None => break,
            Some(b'>') => {
                let iri = String::from_utf8_lossy(&bytes[content_start..scan]).into_owned();
                *pos = scan + 1;
                return Ok(TokenKind::Iri(iri));
            }
            Some(b) if b <= 0x20 || matches!(b, b'<' | b'"' | b'{' | b'}' | b'|' | b'^' | b'`') => break,
            Some(_) => scan += 1,
        }
    }
    // Not a valid IRIREF: the lone `<` is the less-than operator.
    let _ = start;
    Ok(TokenKind::Lt)
}

fn lex_variable_or_modifier(bytes: &[u8], pos: &mut usize) -> ParseResult<TokenKind> {
    let sigil_pos = *pos;
    *pos += 1;
    let name_start = *pos;
    while matches!(peek_at(bytes, *pos), Some(c) if is_pn_chars(c) ) {
        *pos += 1;
    }
    if *pos == name_start {
        if bytes[sigil_pos] == b'?' {
            return Ok(TokenKind::QuestionMark);
        }
        return Err(ParseError::InvalidSyntax {
            msg: "expected a variable name after '$'".to_string(),
            position: sigil_pos,
        });
    }
    Ok(TokenKind::Variable(String::from_utf8_lossy(&bytes[name_start..*pos]).into_owned()))
}

fn lex_blank_node(bytes: &[u8], pos: &mut usize) -> ParseResult<TokenKind> {
    let start = *pos;
    *pos += 2; // `_:`
    let name_start = *pos;
    while matches!(peek_at(bytes, *pos), Some(c) if is_pn_chars(c) || c == '.') {
        *pos += 1;
    }
    if *pos == name_start {
        return Err(ParseError::InvalidSyntax { msg: "empty blank node label".to_string(), position: start });
    }
    Ok(TokenKind::BlankNode(String::from_utf8_lossy(&bytes[name_start..*pos]).into_owned()))
}

fn lex_string(bytes: &[u8], pos: &mut usize, start: usize) -> ParseResult<TokenKind> {
    let quote = bytes[*pos];
    let triple = peek(bytes, *pos + 1) == Some(quote) && peek(bytes, *pos + 2) == Some(quote);
    *pos += if triple { 3 } else { 1 };
    let mut out = String::new();
    loop {
        match peek(bytes, *pos) {
            None => return Err(ParseError::UnexpectedEndOfInput),
            Some(b'\\') => {
                *pos += 1;
                out.push(lex_escape(bytes, pos, start)?);
            }
            Some(b) if b == quote => {
                if !triple {
                    *pos += 1;
                    return Ok(TokenKind::String(out));
                }
                if peek(bytes, *pos + 1) == Some(quote) && peek(bytes, *pos + 2) == Some(quote) {
                    *pos += 3;
                    return Ok(TokenKind::String(out));
                }
                out.push(b as char);
                *pos += 1;
            }
            Some(_) => {
                let ch_len = utf8_len(bytes[*pos]);
                out.push_str(&String::from_utf8_lossy(&bytes[*pos..*pos + ch_len]));
                *pos += ch_len;
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

fn lex_escape(bytes: &[u8], pos: &mut usize, start: usize) -> ParseResult<char> {
    let Some(c) = peek(bytes, *pos) else {
        return Err(ParseError::UnexpectedEndOfInput);
    };
    *pos += 1;
    Ok(match c as char {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'b' => '\u{8}',
        'f' => '\u{c}',
        '"' => '"',
        '\'' => '\'',
        '\\' => '\\',
        'u' => lex_unicode_escape(bytes, pos, 4, start)?,
        'U' => lex_unicode_escape(bytes, pos, 8, start)?,
        other => {
            return Err(ParseError::InvalidSyntax {
                msg: format!("unknown escape '\\{other}'"),
                position: start,
            })
        }
    })
}

fn lex_unicode_escape(bytes: &[u8], pos: &mut usize, digits: usize, start: usize) -> ParseResult<char> {
    let s = std::str::from_utf8(&bytes[*pos..(*pos + digits).min(bytes.len())]).map_err(|_| ParseError::InvalidSyntax {
        msg: "invalid unicode escape".to_string(),
        position: start,
    })?;
    let code = u32::from_str_radix(s, 16).map_err(|_| ParseError::InvalidSyntax {
        msg: "invalid unicode escape digits".to_string(),
        position: start,
    })?;
    *pos += digits;
    char::from_u32(code).ok_or_else(|| ParseError::InvalidSyntax {
        msg: "unicode escape is not a valid scalar value".to_string(),
        position: start,
    })
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
    let mut is_double = false;
    if matches!(peek_at(bytes, *pos), Some('e') | Some('E')) {
        let mut look = *pos + 1;
        if matches!(peek_at(bytes, look), Some('+') | Some('-')) {
            look += 1;
        }
        if matches!(peek_at(bytes, look), Some('0'..='9')) {
            is_double = true;
            *pos = look;
            while matches!(peek_at(bytes, *pos), Some('0'..='9')) {
                *pos += 1;
            }
        }
    }
    let text = String::from_utf8_lossy(&bytes[start..*pos]).into_owned();
    if is_double {
        TokenKind::Double(text)
    } else if is_decimal {
        TokenKind::Decimal(text)
    } else {
        TokenKind::Integer(text)
    }
}

/// `@lang` or `@lang--dir` immediately following a string literal.
/// BCP-47 subtags never contain `--`, so a double dash unambiguously
/// starts the SPARQL 1.2 direction suffix.
fn lex_lang_tag(bytes: &[u8], pos: &mut usize, start: usize) -> ParseResult<TokenKind> {
    *pos += 1;
    let lang_start = *pos;
    if !matches!(peek_at(bytes, *pos), Some(c) if c.is_ascii_alphabetic()) {
        return Err(ParseError::InvalidSyntax { msg: "expected a language tag after '@'".to_string(), position: start });
    }
    while matches!(peek_at(bytes, *pos), Some(c) if c.is_ascii_alphanumeric()) {
        *pos += 1;
    }
    loop {
        if peek(bytes, *pos) == Some(b'-') && peek(bytes, *pos + 1) == Some(b'-') {
            break;
        }
        if peek(bytes, *pos) == Some(b'-') && matches!(peek_at(bytes, *pos + 1), Some(c) if c.is_ascii_alphanumeric()) {
            *pos += 1;
            while matches!(peek_at(bytes, *pos), Some(c) if c.is_ascii_alphanumeric()) {
                *pos += 1;
            }
        } else {
            break;
        }
    }
    let lang = String::from_utf8_lossy(&bytes[lang_start..*pos]).into_owned();
    let direction = if peek(bytes, *pos) == Some(b'-') && peek(bytes, *pos + 1) == Some(b'-') {
        *pos += 2;
        let dir_start = *pos;
        while matches!(peek_at(bytes, *pos), Some(c) if c.is_ascii_alphabetic()) {
            *pos += 1;
        }
        Some(String::from_utf8_lossy(&bytes[dir_start..*pos]).into_owned())
    } else {
        None
    };
    Ok(TokenKind::LangTag { lang, direction })
}

fn is_pn_chars_base(c: char) -> bool {
    c.is_alphabetic()
}

fn is_pn_chars(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_pn_local_extra(c: char) -> bool {
    // Simplified PN_LOCAL continuation set: identifier chars plus the
    // punctuation SPARQL allows unescaped mid-local-name.
    is_pn_chars(c) || c == '.' || c == ':' || c == '%'
}

/// Lexes an identifier, a `PNAME_NS` (`prefix:`), or a `PNAME_LN`
/// (`prefix:local`) starting at a `PN_CHARS_BASE` character.
fn lex_ident_or_pname(bytes: &[u8], pos: &mut usize) -> ParseResult<TokenKind> {
    let start = *pos;
    while matches!(peek_at(bytes, *pos), Some(c) if is_pn_chars(c)) {
        *pos += 1;
    }
    let prefix = String::from_utf8_lossy(&bytes[start..*pos]).into_owned();
    if peek(bytes, *pos) == Some(b':') {
        *pos += 1;
        return lex_pname(bytes, pos, &prefix);
    }
    Ok(TokenKind::Ident(prefix))
}

fn lex_pname(bytes: &[u8], pos: &mut usize, prefix: &str) -> ParseResult<TokenKind> {
    let local_start = *pos;
    while matches!(peek_at(bytes, *pos), Some(c) if is_pn_local_extra(c)) {
        *pos += 1;
    }
    // Trailing '.' is not part of PN_LOCAL (it would be ambiguous with a
    // terminating statement dot); back off one character if so.
    let mut end = *pos;
    if end > local_start && bytes[end - 1] == b'.' {
        end -= 1;
        *pos = end;
    }
    if end == local_start {
        return Ok(TokenKind::PNameNs(prefix.to_string()));
    }
    let local = String::from_utf8_lossy(&bytes[local_start..end]).into_owned();
    Ok(TokenKind::PNameLn(prefix.to_string(), local))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_select_query_tokens() {
        let ks = kinds("SELECT ?x WHERE { ?x :p ?y }");
        assert_eq!(
            ks,
            vec![
                TokenKind::Ident("SELECT".into()),
                TokenKind::Variable("x".into()),
                TokenKind::Ident("WHERE".into()),
                TokenKind::LBrace,
                TokenKind::Variable("x".into()),
                TokenKind::PNameLn("".into(), "p".into()),
                TokenKind::Variable("y".into()),
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_iri_from_less_than() {
        assert_eq!(kinds("<http://x/y>")[0], TokenKind::Iri("http://x/y".into()));
        assert_eq!(kinds("?a < ?b")[1], TokenKind::Lt);
    }

    #[test]
    fn lexes_rdf_star_brackets() {
        assert_eq!(kinds("<<"), vec![TokenKind::LAngleAngle, TokenKind::Eof]);
        assert_eq!(kinds(">>"), vec![TokenKind::RAngleAngle, TokenKind::Eof]);
        assert_eq!(kinds("{|"), vec![TokenKind::LBracePipe, TokenKind::Eof]);
        assert_eq!(kinds("|}"), vec![TokenKind::PipeRBrace, TokenKind::Eof]);
    }

    #[test]
    fn lexes_direction_tagged_literal() {
        let ks = kinds("\"hi\"@en--ltr");
        assert_eq!(
            ks,
            vec![
                TokenKind::String("hi".into()),
                TokenKind::LangTag { lang: "en".into(), direction: Some("ltr".into()) },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_numeric_literal_families() {
        assert_eq!(kinds("42")[0], TokenKind::Integer("42".into()));
        assert_eq!(kinds("4.2")[0], TokenKind::Decimal("4.2".into()));
        assert_eq!(kinds("4.2e10")[0], TokenKind::Double("4.2e10".into()));
        assert_eq!(kinds("1e10")[0], TokenKind::Double("1e10".into()));
    }

    #[test]
    fn lexes_triple_quoted_string_with_embedded_quote() {
        let ks = kinds("'''a\"b'''");
        assert_eq!(ks[0], TokenKind::String("a\"b".into()));
    }

    #[test]
    fn bare_question_mark_is_path_modifier() {
        let ks = kinds(":p?");
        assert_eq!(ks, vec![TokenKind::PNameLn("".into(), "p".into()), TokenKind::QuestionMark, TokenKind::Eof]);
    }
}
