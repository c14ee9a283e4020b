//! lc3asm – LC-3 16-bit ISA two-pass assembler core
//!
//! Source text goes in, an [`AssembledImage`] and its [`SymbolTable`] come
//! out. Loading and saving files, and running the result, are left to the
//! caller.

pub mod encoder;
pub mod error;
pub mod image;
pub mod isa;
pub mod lexer;
pub mod operand;
pub mod parser;
pub mod symbols;

pub use error::{AsmError, Context, ErrorKind, Warning, handle_errors};
pub use image::AssembledImage;
pub use lexer::{TokenLine, tokenize};
pub use operand::{parse_literal, parse_register};
pub use symbols::SymbolTable;

/// Successful assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub image: AssembledImage,
    pub symbols: SymbolTable,
    /// Non-fatal findings, such as text after `.END`.
    pub warnings: Vec<Warning>,
}

/// Assemble a program from source text.
///
/// Tokenize, bind labels, encode. The first error stops everything and
/// nothing partial is returned.
///
/// # Errors
///
/// The first fatal problem in the source, tagged with its line.
pub fn assemble(source: &str) -> Result<Assembly, AsmError> {
    let span = tracing::info_span!("assemble", source_len = source.len());
    let _guard = span.enter();

    /* 1. tokenize */
    let lines = tokenize(source)?;

    /* 2. pass 1 · pass 2 */
    let pass = parser::build_symbol_table(&lines)?;
    let image = encoder::encode(&lines, &pass)?;

    let warnings = trailing_text(&lines, pass.end_index);
    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    tracing::info!(
        origin = format_args!("x{:04X}", image.origin()),
        words = image.len(),
        labels = pass.symbols.len(),
        "assembled"
    );
    Ok(Assembly {
        image,
        symbols: pass.symbols,
        warnings,
    })
}

fn trailing_text(lines: &[TokenLine], end_index: usize) -> Vec<Warning> {
    lines
        .iter()
        .enumerate()
        .skip(end_index + 1)
        .filter(|(_, tokens)| !tokens.is_empty())
        .map(|(index, _)| Warning {
            line: index + 1,
            message: "ignored text after .END".to_owned(),
        })
        .collect()
}
