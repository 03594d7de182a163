use crate::item::Item;
use crate::lexer::Token;
use crate::parser::error::ParseError;

/// First pass: classify every raw token into an Item. Two trailing
/// newline items are appended so the final paragraph always terminates.
pub(crate) fn classify_tokens(
    tokens: &[Token],
    extended: bool,
    file_id: usize,
    errors: &mut Vec<ParseError>,
) -> Vec<Item> {
    let mut items = Vec::with_capacity(tokens.len() + 2);
    for token in tokens {
        match Item::classify(&token.text, extended) {
            Ok(item) => items.push(item.with_span(token.span.clone())),
            Err(e) => {
                errors.push(ParseError::error(e.to_string(), token.span.clone(), file_id));
            }
        }
    }
    let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
    items.push(Item::placeholder("<EOL>").with_span(end..end));
    items.push(Item::placeholder("<EOL>").with_span(end..end));
    items
}
