//! Lexer implementation using logos

mod token;

pub use token::Token;

use logos::Logos;

/// Replace curly quotes with straight double quotes so pasted source
/// (documents, chat clients) lexes the same as hand-typed source.
fn normalize_quotes(source: &str) -> String {
    source
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
            other => other,
        })
        .collect()
}

/// Tokenize source code.
///
/// Never fails: characters the lexer cannot match become [`Token::Illegal`]
/// and are reported by the parser. The returned stream always ends with
/// [`Token::Eof`].
pub fn tokenize(source: &str) -> Vec<Token> {
    let source = normalize_quotes(source);
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(&source);

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(token),
            Err(_) => tokens.push(Token::Illegal(lexer.slice().to_string())),
        }
    }

    tokens.push(Token::Eof);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_empty() {
        assert_eq!(tokenize(""), vec![Token::Eof]);
    }

    #[test]
    fn test_tokenize_keywords() {
        let tokens = tokenize("let const return break skip for in during if else fun");
        assert_eq!(
            tokens,
            vec![
                Token::Let,
                Token::Const,
                Token::Return,
                Token::Break,
                Token::Skip,
                Token::For,
                Token::In,
                Token::During,
                Token::If,
                Token::Else,
                Token::Fun,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_integer_literal() {
        let tokens = tokenize("42");
        assert_eq!(tokens, vec![Token::Int(42), Token::Eof]);
    }

    #[test]
    fn test_tokenize_float_literal() {
        let tokens = tokenize("1.5");
        assert!(matches!(&tokens[0], Token::Float(x) if (*x - 1.5).abs() < f64::EPSILON));
    }

    #[test]
    fn test_tokenize_string_literal() {
        let tokens = tokenize(r#""hello world""#);
        assert_eq!(tokens[0], Token::Str("hello world".to_string()));
    }

    #[test]
    fn test_tokenize_curly_quotes_normalized() {
        let tokens = tokenize("\u{201C}hello\u{201D}");
        assert_eq!(tokens[0], Token::Str("hello".to_string()));
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("= == != < > + - * / % !");
        assert_eq!(
            tokens,
            vec![
                Token::Assign,
                Token::Eq,
                Token::NotEq,
                Token::Lt,
                Token::Gt,
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::Bang,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_delimiters() {
        let tokens = tokenize("( ) { } [ ] , ; :");
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::RParen,
                Token::LBrace,
                Token::RBrace,
                Token::LBracket,
                Token::RBracket,
                Token::Comma,
                Token::Semi,
                Token::Colon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_identifiers() {
        let tokens = tokenize("foo bar_baz x123 _");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("foo".to_string()),
                Token::Ident("bar_baz".to_string()),
                Token::Ident("x123".to_string()),
                Token::Ident("_".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_line_comment() {
        let tokens = tokenize("1 // the rest is ignored\n2");
        assert_eq!(tokens, vec![Token::Int(1), Token::Int(2), Token::Eof]);
    }

    #[test]
    fn test_tokenize_illegal_character() {
        let tokens = tokenize("let x = @");
        assert_eq!(tokens[3], Token::Illegal("@".to_string()));
    }

    #[test]
    fn test_tokenize_for_loop_header() {
        let tokens = tokenize("for i, v in xs: {");
        assert_eq!(
            tokens,
            vec![
                Token::For,
                Token::Ident("i".to_string()),
                Token::Comma,
                Token::Ident("v".to_string()),
                Token::In,
                Token::Ident("xs".to_string()),
                Token::Colon,
                Token::LBrace,
                Token::Eof,
            ]
        );
    }
}
