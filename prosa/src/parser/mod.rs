pub mod error;
mod items;
mod jumps;
mod sentences;
mod structural;

pub use error::ParseError;

use crate::Program;
use crate::lexer::{self, Token};

/// Parser entry point: token stream in, paragraphs out.
pub struct Parser {
    tokens: Vec<Token>,
    extended: bool,
    file_id: usize,
}

impl Parser {
    /// Lex and parse a preprocessed source text.
    pub fn new(source: &str, extended: bool, file_id: usize) -> Parser {
        Parser {
            tokens: lexer::tokenize(source),
            extended,
            file_id,
        }
    }

    /// Parse an externally produced token stream.
    pub fn from_tokens(tokens: Vec<Token>, extended: bool, file_id: usize) -> Parser {
        Parser {
            tokens,
            extended,
            file_id,
        }
    }

    /// Run the three passes. Ok carries fail-soft diagnostics; Err means
    /// at least one structural error made the program unsafe to execute.
    pub fn parse(&self) -> Result<(Program, Vec<ParseError>), Vec<ParseError>> {
        let mut errors = Vec::new();
        let items = items::classify_tokens(&self.tokens, self.extended, self.file_id, &mut errors);
        if errors.iter().any(|e| e.is_fatal()) {
            return Err(errors);
        }
        let sentences = sentences::assemble(&items, self.file_id, &mut errors);
        let paragraphs = structural::group_paragraphs(sentences, self.file_id, &mut errors);
        if errors.iter().any(|e| e.is_fatal()) {
            return Err(errors);
        }
        Ok((
            Program {
                paragraphs,
                source_id: self.file_id,
            },
            errors,
        ))
    }
}
