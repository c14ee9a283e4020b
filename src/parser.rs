use crate::{
    error::{AsmError, Context, ErrorKind},
    isa::{Directive, Operation},
    lexer::TokenLine,
    operand::{decode_string, looks_like_literal, parse_literal, parse_register},
    symbols::SymbolTable,
};

/// One non-empty source line split into its parts: leading labels, then
/// at most one operation with its operand tokens.
#[derive(Debug, PartialEq)]
pub struct Statement<'a> {
    pub labels: Vec<&'a str>,
    pub operation: Option<Operation>,
    operand_tokens: &'a [String],
}

impl<'a> Statement<'a> {
    /// Every leading token that is not a mnemonic or directive is a label.
    pub fn parse(tokens: &'a [String], ctx: Context) -> Result<Self, AsmError> {
        let mut labels = Vec::new();
        let mut rest = tokens;

        while let Some((first, tail)) = rest.split_first() {
            if let Some(operation) = Operation::lookup(first) {
                return Ok(Statement {
                    labels,
                    operation: Some(operation),
                    operand_tokens: tail,
                });
            }
            match validate_label(first) {
                Ok(label) => labels.push(label),
                // A word that was taken for a label was really a misspelt
                // operation: its operands are what failed here.
                Err(_) if !labels.is_empty() => {
                    let guess = labels[labels.len() - 1];
                    return Err(ctx.error(ErrorKind::UnknownMnemonic(guess.to_owned())));
                }
                Err(e) => return Err(ctx.error(e)),
            }
            rest = tail;
        }

        // `LABEL WORD` with no operation: the second word is an operation
        // nobody recognises.
        if let [_, guess, ..] = labels[..] {
            return Err(ctx.error(ErrorKind::UnknownMnemonic(guess.to_owned())));
        }

        Ok(Statement {
            labels,
            operation: None,
            operand_tokens: &[],
        })
    }

    /// Operands of the operation, checked against its arity.
    ///
    /// Operands have to arrive as one comma-joined group. Several groups
    /// mean the source separated them with whitespace only.
    pub fn operands(&self, ctx: Context) -> Result<Vec<&'a str>, AsmError> {
        let Some(operation) = self.operation else {
            return Ok(Vec::new());
        };

        let operands: Vec<&str> = match self.operand_tokens {
            [] => Vec::new(),
            [text] if operation == Operation::Directive(Directive::Stringz) => vec![text.as_str()],
            [group] => group.split(',').collect(),
            _ if operation.arity() > 1 => {
                return Err(ctx.error(ErrorKind::OperandSeparator(operation.name())));
            }
            many => many.iter().map(String::as_str).collect(),
        };

        if operands.len() != operation.arity() {
            return Err(ctx.error(ErrorKind::OperandCount {
                mnemonic: operation.name(),
                expected: operation.arity(),
                found: operands.len(),
            }));
        }
        Ok(operands)
    }
}

fn validate_label(token: &str) -> Result<&str, ErrorKind> {
    let mut chars = token.chars();
    let well_formed = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !well_formed || parse_register(token).is_ok() || looks_like_literal(token) {
        return Err(ErrorKind::InvalidLabel(token.to_owned()));
    }
    Ok(token)
}

/// Words a statement occupies in the image.
pub fn statement_size(stmt: &Statement<'_>, ctx: Context) -> Result<u32, AsmError> {
    let Some(operation) = stmt.operation else {
        return Ok(0);
    };

    let size = match operation {
        Operation::Instruction(_) => 1,
        Operation::Directive(Directive::Fill) => 1,
        Operation::Directive(Directive::Orig | Directive::End) => 0,
        Operation::Directive(Directive::Blkw) => {
            let operands = stmt.operands(ctx)?;
            u32::from(block_length(operands[0], ctx)?)
        }
        Operation::Directive(Directive::Stringz) => {
            let operands = stmt.operands(ctx)?;
            let text = ctx.attach(decode_string(operands[0]))?;
            text.len() as u32 + 1
        }
    };
    Ok(size)
}

/// `.ORIG` operand.
pub fn origin_address(token: &str, ctx: Context) -> Result<u16, AsmError> {
    unsigned_word(token, Directive::Orig, ctx)
}

/// `.BLKW` operand.
pub fn block_length(token: &str, ctx: Context) -> Result<u16, AsmError> {
    unsigned_word(token, Directive::Blkw, ctx)
}

fn unsigned_word(token: &str, directive: Directive, ctx: Context) -> Result<u16, AsmError> {
    let value = parse_literal(token).map_err(|e| {
        if looks_like_literal(token) {
            ctx.error(e)
        } else {
            ctx.error(ErrorKind::DirectiveOperand {
                directive: directive.name(),
                reason: format!("expected a literal, found `{token}`"),
            })
        }
    })?;
    u16::try_from(value).map_err(|_| {
        ctx.error(ErrorKind::DirectiveOperand {
            directive: directive.name(),
            reason: format!("{value} is not in x0000..xFFFF"),
        })
    })
}

/// Result of the first pass.
#[derive(Debug)]
pub struct FirstPass {
    pub origin: u16,
    pub symbols: SymbolTable,
    /// Zero-based index of the `.END` line.
    pub end_index: usize,
}

const MEMORY_WORDS: u32 = 0x1_0000;

/// Pass 1: assign addresses and bind labels.
///
/// `.ORIG` has to be the first statement and may appear only once;
/// `.END` stops the walk.
pub fn build_symbol_table(lines: &[TokenLine]) -> Result<FirstPass, AsmError> {
    let mut origin: Option<u16> = None;
    let mut pc: u32 = 0;
    let mut symbols = SymbolTable::new();

    for (index, tokens) in lines.iter().enumerate() {
        if tokens.is_empty() {
            continue;
        }
        let ctx = Context::for_index(index);
        let stmt = Statement::parse(tokens, ctx)?;

        let Some(start) = origin else {
            if let Some(label) = stmt.labels.first() {
                return Err(ctx.error(ErrorKind::LabelBeforeOrig((*label).to_owned())));
            }
            if stmt.operation != Some(Operation::Directive(Directive::Orig)) {
                return Err(ctx.error(ErrorKind::MissingOrig));
            }
            let operands = stmt.operands(ctx)?;
            let start = origin_address(operands[0], ctx)?;
            tracing::debug!(line = ctx.line, origin = format_args!("x{start:04X}"), "origin set");
            origin = Some(start);
            pc = u32::from(start);
            continue;
        };

        for label in &stmt.labels {
            let address = u16::try_from(pc).map_err(|_| ctx.error(ErrorKind::AddressOverflow))?;
            ctx.attach(symbols.define(label, address))?;
            tracing::trace!(line = ctx.line, label, address = format_args!("x{address:04X}"), "label bound");
        }

        match stmt.operation {
            Some(Operation::Directive(Directive::Orig)) => {
                return Err(ctx.error(ErrorKind::DuplicateOrig));
            }
            Some(Operation::Directive(Directive::End)) => {
                tracing::debug!(
                    labels = symbols.len(),
                    words = pc - u32::from(start),
                    "first pass complete"
                );
                return Ok(FirstPass {
                    origin: start,
                    symbols,
                    end_index: index,
                });
            }
            _ => {
                pc += statement_size(&stmt, ctx)?;
                if pc > MEMORY_WORDS {
                    return Err(ctx.error(ErrorKind::AddressOverflow));
                }
            }
        }
    }

    let last_line = lines.len().max(1);
    match origin {
        None => Err(AsmError::new(last_line, ErrorKind::MissingOrig)),
        Some(_) => Err(AsmError::new(last_line, ErrorKind::MissingEnd)),
    }
}
