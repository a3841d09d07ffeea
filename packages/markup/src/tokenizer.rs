use logos::Logos;
use std::fmt;

use crate::error::{ParseError, ParseResult};

/// Token types for XML-style markup
///
/// Tags are lexed whole; attribute lists are split by the parser.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token<'src> {
    #[regex(r"<!--([^-]|-[^-])*-->")]
    Comment,

    #[regex(r"<\?([^?]|\?[^>])*\?>")]
    ProcessingInstruction,

    #[regex(r"<!DOCTYPE[^>]*>")]
    Doctype,

    #[regex(r"<!\[CDATA\[([^\]]|\][^\]])*\]\]>", |lex| {
        let slice = lex.slice();
        &slice[9..slice.len() - 3]
    })]
    CData(&'src str),

    #[regex(r"</[^>]*>", |lex| lex.slice())]
    CloseTag(&'src str),

    #[regex(r#"<[A-Za-z_]([^>"']|"[^"]*"|'[^']*')*>"#, |lex| lex.slice())]
    OpenTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Comment => write!(f, "comment"),
            Token::ProcessingInstruction => write!(f, "processing instruction"),
            Token::Doctype => write!(f, "doctype"),
            Token::CData(_) => write!(f, "CDATA section"),
            Token::CloseTag(s) => write!(f, "closing tag {}", s),
            Token::OpenTag(s) => write!(f, "tag {}", s),
            Token::Text(_) => write!(f, "text"),
        }
    }
}

/// Tokenize markup source, failing on the first unrecognized input
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, std::ops::Range<usize>)>> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(ParseError::lexer_error(span.start)),
        })
        .collect()
}
