//! Tokenizer for the routing condition language.

use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    Is,
    Len,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
}

/// A token plus its byte offset in the source, for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let word = take_while(&mut chars, |c| c.is_ascii_alphanumeric() || c == '_');
                tokens.push(Spanned {
                    token: keyword_or_ident(word),
                    offset,
                });
            }
            c if c.is_ascii_digit() => {
                let literal = take_while(&mut chars, |c| c.is_ascii_digit() || c == '.');
                let token = if literal.contains('.') {
                    literal
                        .parse::<f64>()
                        .map(Token::Float)
                        .map_err(|_| ExprError::syntax(offset, format!("invalid number '{literal}'")))?
                } else {
                    literal
                        .parse::<i64>()
                        .map(Token::Int)
                        .map_err(|_| ExprError::syntax(offset, format!("invalid number '{literal}'")))?
                };
                tokens.push(Spanned { token, offset });
            }
            '\'' | '"' => {
                chars.next();
                let text = take_string(&mut chars, ch, offset)?;
                tokens.push(Spanned {
                    token: Token::Str(text),
                    offset,
                });
            }
            '=' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        tokens.push(Spanned {
                            token: Token::Eq,
                            offset,
                        });
                    }
                    _ => return Err(ExprError::syntax(offset, "'=' is not an operator; use '=='")),
                }
            }
            '!' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        tokens.push(Spanned {
                            token: Token::Ne,
                            offset,
                        });
                    }
                    _ => return Err(ExprError::syntax(offset, "'!' is not an operator; use '!='")),
                }
            }
            '<' => {
                chars.next();
                let token = if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    Token::Le
                } else {
                    Token::Lt
                };
                tokens.push(Spanned { token, offset });
            }
            '>' => {
                chars.next();
                let token = if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    Token::Ge
                } else {
                    Token::Gt
                };
                tokens.push(Spanned { token, offset });
            }
            '(' => {
                chars.next();
                tokens.push(Spanned {
                    token: Token::LParen,
                    offset,
                });
            }
            ')' => {
                chars.next();
                tokens.push(Spanned {
                    token: Token::RParen,
                    offset,
                });
            }
            '[' => {
                chars.next();
                tokens.push(Spanned {
                    token: Token::LBracket,
                    offset,
                });
            }
            ']' => {
                chars.next();
                tokens.push(Spanned {
                    token: Token::RBracket,
                    offset,
                });
            }
            '.' => {
                chars.next();
                tokens.push(Spanned {
                    token: Token::Dot,
                    offset,
                });
            }
            other => {
                return Err(ExprError::syntax(
                    offset,
                    format!("unrecognized character '{other}'"),
                ))
            }
        }
    }

    Ok(tokens)
}

fn keyword_or_ident(word: String) -> Token {
    match word.as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "is" => Token::Is,
        "len" => Token::Len,
        "True" => Token::True,
        "False" => Token::False,
        "None" => Token::None,
        _ => Token::Ident(word),
    }
}

fn take_while(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    predicate: impl Fn(char) -> bool,
) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if predicate(c) {
            out.push(c);
            chars.next();
        } else {
            break;
        }
    }
    out
}

fn take_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    delimiter: char,
    start: usize,
) -> Result<String, ExprError> {
    let mut out = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            c if c == delimiter => return Ok(out),
            '\\' => match chars.next() {
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            other => out.push(other),
        }
    }
    Err(ExprError::syntax(start, "unterminated string literal"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn tokenizes_comparison_expression() {
        assert_eq!(
            kinds("quality.attempts < 3"),
            vec![
                Token::Ident("quality".into()),
                Token::Dot,
                Token::Ident("attempts".into()),
                Token::Lt,
                Token::Int(3),
            ]
        );
    }

    #[test]
    fn tokenizes_keywords_and_literals() {
        assert_eq!(
            kinds("not True and None or False"),
            vec![
                Token::Not,
                Token::True,
                Token::And,
                Token::None,
                Token::Or,
                Token::False,
            ]
        );
    }

    #[test]
    fn tokenizes_strings_with_both_quote_styles() {
        assert_eq!(
            kinds("'APROVADO' \"REFINAR\""),
            vec![Token::Str("APROVADO".into()), Token::Str("REFINAR".into())]
        );
    }

    #[test]
    fn tokenizes_bracket_paths() {
        assert_eq!(
            kinds("artifacts.items[0]['name']"),
            vec![
                Token::Ident("artifacts".into()),
                Token::Dot,
                Token::Ident("items".into()),
                Token::LBracket,
                Token::Int(0),
                Token::RBracket,
                Token::LBracket,
                Token::Str("name".into()),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn tokenizes_floats() {
        assert_eq!(kinds("0.75"), vec![Token::Float(0.75)]);
    }

    #[test]
    fn rejects_single_equals() {
        assert!(matches!(
            tokenize("quality.x = 1"),
            Err(ExprError::Syntax { .. })
        ));
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(matches!(
            tokenize("quality.x == 'open"),
            Err(ExprError::Syntax { .. })
        ));
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(matches!(tokenize("a + b"), Err(ExprError::Syntax { .. })));
    }
}
