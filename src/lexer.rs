use logos::Logos;

use crate::error::{AsmError, Context, ErrorKind};

/// Tokens of one source line, first token first. Empty for blank and
/// comment-only lines.
pub type TokenLine = Vec<String>;

/// Raw lexemes of a single line. Whitespace only separates; it never
/// becomes a lexeme.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(skip r"[ \t\r\f\x0B\x{A0}]+")]
enum Lexeme {
    // ── Quoted string, escapes kept verbatim ──
    #[regex(r#""([^"\\]|\\.)*""#)]
    Quoted,

    // ── Operand separator ─────────────────────
    #[token(",")]
    Comma,

    // ── Comment to end of line ────────────────
    #[regex(r";[^\n]*")]
    Comment,

    // ── Anything else up to a separator ───────
    #[regex(r#"[^ \t\r\f\x0B\x{A0},;"]+"#)]
    Word,
}

/// Split source text into one [`TokenLine`] per source line.
///
/// `\r\n` and `\n` are equivalent and every line keeps its slot, so the
/// index of a token line is always its line number minus one. Groups
/// joined only by commas (whitespace around the comma allowed) collapse
/// into one token with the commas kept; groups separated by whitespace
/// alone stay separate tokens. A leading byte-order mark is dropped.
pub fn tokenize(source: &str) -> Result<Vec<TokenLine>, AsmError> {
    let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
    source
        .split('\n')
        .enumerate()
        .map(|(index, line)| tokenize_line(line, Context::for_index(index)))
        .collect()
}

/// Tokenize a single line (no line terminator).
pub fn tokenize_line(line: &str, ctx: Context) -> Result<TokenLine, AsmError> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    let mut tokens = TokenLine::new();
    let mut current = String::new();
    let mut after_comma = false;
    let mut last_end: Option<usize> = None;

    for (lexeme, span) in Lexeme::lexer(line).spanned() {
        // The only input no lexeme matches is a `"` without a closing quote.
        let lexeme = lexeme.map_err(|_| ctx.error(ErrorKind::UnterminatedString))?;
        let adjacent = last_end == Some(span.start);
        last_end = Some(span.end);

        match lexeme {
            Lexeme::Comment => break,
            Lexeme::Comma => {
                current.push(',');
                after_comma = true;
            }
            Lexeme::Word | Lexeme::Quoted => {
                let text = &line[span];
                if !current.is_empty() && !after_comma && !adjacent {
                    tokens.push(std::mem::take(&mut current));
                }
                current.push_str(text);
                after_comma = false;
            }
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tracing::trace!(line = ctx.line, ?tokens, "tokenized");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(src: &str) -> TokenLine {
        tokenize_line(src, Context::new(1)).unwrap()
    }

    #[test]
    fn empty_source_is_one_empty_line() {
        assert_eq!(tokenize("").unwrap(), vec![TokenLine::new()]);
    }

    #[test]
    fn comments_produce_no_tokens() {
        assert!(line("; comment").is_empty());
        assert!(line("    ; indented comment").is_empty());
        assert!(line("   \t ").is_empty());
    }

    #[test]
    fn whitespace_around_commas_is_insignificant() {
        assert_eq!(line("ADD R1, R2, R3"), ["ADD", "R1,R2,R3"]);
        assert_eq!(line("ADD R1,R2,R3"), ["ADD", "R1,R2,R3"]);
        assert_eq!(line("ADD R1 ,  R2 ,R3"), ["ADD", "R1,R2,R3"]);
    }

    #[test]
    fn whitespace_alone_never_merges() {
        assert_eq!(line("ADD R1 R2 R3"), ["ADD", "R1", "R2", "R3"]);
    }

    #[test]
    fn mixed_grouping_is_kept_as_written() {
        assert_eq!(line("ADD R1,R2 R3"), ["ADD", "R1,R2", "R3"]);
    }

    #[test]
    fn trailing_comment_is_stripped() {
        assert_eq!(line("LOOP ADD R1, R1, #-1 ; count down"), ["LOOP", "ADD", "R1,R1,#-1"]);
        assert_eq!(line("HALT;done"), ["HALT"]);
    }

    #[test]
    fn quoted_string_is_atomic() {
        assert_eq!(
            line(r#".STRINGZ "A thing" ; comment text"#),
            [".STRINGZ", r#""A thing""#]
        );
        assert_eq!(line(r#".STRINGZ "semi ; colon""#), [".STRINGZ", r#""semi ; colon""#]);
    }

    #[test]
    fn escaped_quote_does_not_close_string() {
        assert_eq!(
            line(r#".STRINGZ "He says \"hi\"""#),
            [".STRINGZ", r#""He says \"hi\"""#]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("ADD R1,R1,R1\n.STRINGZ \"oops").unwrap_err();
        assert_eq!(err.line(), 2);
        assert_eq!(err.kind(), &ErrorKind::UnterminatedString);

        let err = tokenize_line(r#".STRINGZ "ends in \""#, Context::new(5)).unwrap_err();
        assert_eq!(err.to_string(), "at line 5: unterminated string literal");
    }

    #[test]
    fn no_break_space_and_bom_separate() {
        assert_eq!(line("\tHALT\u{A0}"), ["HALT"]);
        assert_eq!(line("ADD\u{A0}R1,\u{A0}R2,R3"), ["ADD", "R1,R2,R3"]);
        assert_eq!(tokenize("\u{FEFF}.ORIG x3000").unwrap(), [[".ORIG", "x3000"]]);
    }

    #[test]
    fn line_endings_are_equivalent() {
        let unix = tokenize(".ORIG x3000\nADD R1, R2, R3\n.END").unwrap();
        let dos = tokenize(".ORIG x3000\r\nADD R1, R2, R3\r\n.END").unwrap();
        assert_eq!(unix, dos);
    }

    #[test]
    fn line_slots_are_preserved() {
        let src = "; header\n\n.ORIG x3000\n  ; note\nHALT\n.END\n";
        insta::assert_debug_snapshot!(tokenize(src).unwrap(), @r###"
        [
            [],
            [],
            [
                ".ORIG",
                "x3000",
            ],
            [],
            [
                "HALT",
            ],
            [
                ".END",
            ],
            [],
        ]
        "###);
    }
}
