use bitvec::prelude::*;

use crate::{
    error::{AsmError, Context, ErrorKind},
    image::AssembledImage,
    isa::{Directive, OperandKind, Opcode, Operation},
    lexer::TokenLine,
    operand::{decode_string, parse_literal, parse_register},
    parser::{FirstPass, Statement, block_length},
    symbols::SymbolTable,
};

/// Bits destined for one instruction field, right-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    bits: u16,
    width: usize,
}

fn place(word: &mut u16, lsb: usize, field: Field) {
    word.view_bits_mut::<Lsb0>()[lsb..lsb + field.width].store(field.bits);
}

fn mask(bits: u32) -> u16 {
    ((1u32 << bits) - 1) as u16
}

fn signed_field(value: i32, bits: u32) -> Result<u16, ErrorKind> {
    let min = -(1i32 << (bits - 1));
    let max = (1i32 << (bits - 1)) - 1;
    if !(min..=max).contains(&value) {
        return Err(ErrorKind::Range {
            value,
            bits,
            signedness: "signed",
        });
    }
    Ok((value as u16) & mask(bits))
}

fn unsigned_field(value: i32, bits: u32) -> Result<u16, ErrorKind> {
    if !(0..=i32::from(mask(bits))).contains(&value) {
        return Err(ErrorKind::Range {
            value,
            bits,
            signedness: "unsigned",
        });
    }
    Ok(value as u16)
}

/// A full word accepts both signed and unsigned spellings.
fn word_value(value: i32) -> Result<u16, ErrorKind> {
    if !(i32::from(i16::MIN)..=i32::from(u16::MAX)).contains(&value) {
        return Err(ErrorKind::Range {
            value,
            bits: 16,
            signedness: "signed or unsigned",
        });
    }
    Ok(value as u16)
}

/// Parse `token` as a literal if it is spelled like one. `None` means it
/// should be read some other way (register, label).
fn literal(token: &str) -> Option<Result<i32, ErrorKind>> {
    match parse_literal(token) {
        Ok(v) => Some(Ok(v)),
        Err(e) if token.starts_with('#') => Some(Err(e)),
        Err(_) => None,
    }
}

fn register_shaped(token: &str) -> bool {
    match token.as_bytes() {
        [b'R' | b'r', rest @ ..] => !rest.is_empty() && rest.iter().all(|b| b.is_ascii_digit() || *b == b'-'),
        _ => false,
    }
}

/// Per-instruction state while its operands are turned into fields.
struct Operands<'s> {
    opcode: Opcode,
    address: u16,
    symbols: &'s SymbolTable,
    ctx: Context,
}

impl Operands<'_> {
    fn wrong_kind(&self, position: usize, kind: OperandKind, token: &str) -> AsmError {
        self.ctx.error(ErrorKind::OperandKind {
            mnemonic: self.opcode.name(),
            position,
            expected: kind.describe(),
            found: token.to_owned(),
        })
    }

    fn register(&self, position: usize, kind: OperandKind, token: &str) -> Result<u8, AsmError> {
        match parse_register(token) {
            Ok(r) => Ok(r),
            Err(e) if register_shaped(token) => Err(self.ctx.error(e)),
            Err(_) => Err(self.wrong_kind(position, kind, token)),
        }
    }

    /// `target - (address + 1)`.
    fn pc_offset(&self, target: u16) -> i32 {
        i32::from(target) - (i32::from(self.address) + 1)
    }

    fn field(&self, position: usize, kind: OperandKind, token: &str) -> Result<Field, AsmError> {
        let ctx = self.ctx;
        let field = match kind {
            OperandKind::Register => Field {
                bits: u16::from(self.register(position, kind, token)?),
                width: 3,
            },
            OperandKind::RegisterOrImmediate { bits } => match literal(token) {
                Some(value) => {
                    let imm = ctx.attach(value.and_then(|v| signed_field(v, bits)))?;
                    Field {
                        bits: (1 << bits) | imm,
                        width: bits as usize + 1,
                    }
                }
                None => Field {
                    bits: u16::from(self.register(position, kind, token)?),
                    width: bits as usize + 1,
                },
            },
            OperandKind::PcOffset { bits } => {
                let offset = match literal(token) {
                    Some(value) => ctx.attach(value)?,
                    None if parse_register(token).is_ok() => {
                        return Err(self.wrong_kind(position, kind, token));
                    }
                    None => self.pc_offset(ctx.attach(self.symbols.address_of(token))?),
                };
                Field {
                    bits: ctx.attach(signed_field(offset, bits))?,
                    width: bits as usize,
                }
            }
            OperandKind::Offset { bits } => match literal(token) {
                Some(value) => Field {
                    bits: ctx.attach(value.and_then(|v| signed_field(v, bits)))?,
                    width: bits as usize,
                },
                None => return Err(self.wrong_kind(position, kind, token)),
            },
            OperandKind::Unsigned { bits } => match literal(token) {
                Some(value) => Field {
                    bits: ctx.attach(value.and_then(|v| unsigned_field(v, bits)))?,
                    width: bits as usize,
                },
                None => return Err(self.wrong_kind(position, kind, token)),
            },
            OperandKind::Word | OperandKind::Text => {
                return Err(self.wrong_kind(position, kind, token));
            }
        };
        Ok(field)
    }
}

/// Encode one instruction at `address`.
pub fn encode_instruction(
    opcode: Opcode,
    operands: &[&str],
    address: u16,
    symbols: &SymbolTable,
    ctx: Context,
) -> Result<u16, AsmError> {
    let template = opcode.template();
    if operands.len() != template.len() {
        return Err(ctx.error(ErrorKind::OperandCount {
            mnemonic: opcode.name(),
            expected: template.len(),
            found: operands.len(),
        }));
    }

    let state = Operands {
        opcode,
        address,
        symbols,
        ctx,
    };
    let mut word = opcode.fixed_bits();
    for (i, (slot, token)) in template.iter().zip(operands).enumerate() {
        let field = state.field(i + 1, slot.kind, token)?;
        place(&mut word, slot.lsb, field);
    }
    Ok(word)
}

/// `.FILL` value: a literal or the address of a label.
fn fill_value(token: &str, symbols: &SymbolTable, ctx: Context) -> Result<u16, AsmError> {
    match literal(token) {
        Some(value) => ctx.attach(value.and_then(word_value)),
        None if parse_register(token).is_ok() => Err(ctx.error(ErrorKind::OperandKind {
            mnemonic: Directive::Fill.name(),
            position: 1,
            expected: OperandKind::Word.describe(),
            found: token.to_owned(),
        })),
        None => ctx.attach(symbols.address_of(token)),
    }
}

/// Pass 2: turn every statement up to `.END` into words.
pub fn encode(lines: &[TokenLine], pass: &FirstPass) -> Result<AssembledImage, AsmError> {
    let mut words: Vec<u16> = Vec::new();
    let walked = lines.get(..=pass.end_index).unwrap_or(lines);

    for (index, tokens) in walked.iter().enumerate() {
        if tokens.is_empty() {
            continue;
        }
        let ctx = Context::for_index(index);
        let stmt = Statement::parse(tokens, ctx)?;
        let Some(operation) = stmt.operation else {
            continue;
        };
        let operands = stmt.operands(ctx)?;
        // Pass 1 already rejected anything that would run past xFFFF.
        let address = pass.origin.wrapping_add(words.len() as u16);

        match operation {
            Operation::Instruction(opcode) => {
                let word = encode_instruction(opcode, &operands, address, &pass.symbols, ctx)?;
                tracing::trace!(
                    line = ctx.line,
                    address = format_args!("x{address:04X}"),
                    word = format_args!("x{word:04X}"),
                    "{}",
                    opcode.name()
                );
                words.push(word);
            }
            Operation::Directive(Directive::Fill) => {
                words.push(fill_value(operands[0], &pass.symbols, ctx)?);
            }
            Operation::Directive(Directive::Blkw) => {
                let count = block_length(operands[0], ctx)?;
                words.resize(words.len() + usize::from(count), 0);
            }
            Operation::Directive(Directive::Stringz) => {
                words.extend(ctx.attach(decode_string(operands[0]))?);
                words.push(0);
            }
            Operation::Directive(Directive::Orig) => {}
            Operation::Directive(Directive::End) => break,
        }
    }

    tracing::debug!(words = words.len(), "second pass complete");
    Ok(AssembledImage::new(pass.origin, words))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::Conditions;

    fn symbols(pairs: &[(&str, u16)]) -> SymbolTable {
        let mut table = SymbolTable::new();
        for (name, addr) in pairs {
            table.define(name, *addr).unwrap();
        }
        table
    }

    fn enc(opcode: Opcode, operands: &[&str], address: u16) -> Result<u16, AsmError> {
        let table = symbols(&[("TOP", 0x3000), ("DATA", 0x3010), ("FAR", 0x3200)]);
        encode_instruction(opcode, operands, address, &table, Context::new(9))
    }

    #[test]
    fn places_bit_fields() {
        let mut word = 0;
        place(&mut word, 9, Field { bits: 0b101, width: 3 });
        place(&mut word, 0, Field { bits: 0b11_1111, width: 6 });
        assert_eq!(word, 0b0000_1010_0011_1111);
    }

    #[test]
    fn operate_instructions() {
        assert_eq!(enc(Opcode::Add, &["R1", "R2", "R3"], 0x3000).unwrap(), 0x1283);
        assert_eq!(enc(Opcode::Add, &["R1", "R1", "#-1"], 0x3000).unwrap(), 0x127F);
        assert_eq!(enc(Opcode::And, &["R0", "R0", "#0"], 0x3000).unwrap(), 0x5020);
        assert_eq!(enc(Opcode::And, &["r7", "r6", "x0F"], 0x3000).unwrap(), 0x5FAF);
        assert_eq!(enc(Opcode::Not, &["R1", "R2"], 0x3000).unwrap(), 0x92BF);
    }

    #[test]
    fn control_instructions() {
        assert_eq!(enc(Opcode::Jmp, &["R3"], 0x3000).unwrap(), 0xC0C0);
        assert_eq!(enc(Opcode::Ret, &[], 0x3000).unwrap(), 0xC1C0);
        assert_eq!(enc(Opcode::Jsrr, &["R4"], 0x3000).unwrap(), 0x4100);
        assert_eq!(enc(Opcode::Jsr, &["FAR"], 0x3000).unwrap(), 0x49FF);
        assert_eq!(enc(Opcode::Trap, &["x25"], 0x3000).unwrap(), 0xF025);
        assert_eq!(enc(Opcode::Halt, &[], 0x3000).unwrap(), 0xF025);
        assert_eq!(enc(Opcode::Rti, &[], 0x3000).unwrap(), 0x8000);
    }

    #[test]
    fn branches_are_pc_relative() {
        let br = Opcode::Br(Conditions(0b111));
        assert_eq!(enc(br, &["TOP"], 0x3001).unwrap(), 0x0FFE);
        assert_eq!(enc(Opcode::Br(Conditions(0b010)), &["DATA"], 0x3000).unwrap(), 0x040F);
        assert_eq!(enc(br, &["#-1"], 0x3000).unwrap(), 0x0FFF);
    }

    #[test]
    fn memory_instructions() {
        assert_eq!(enc(Opcode::Ld, &["R0", "DATA"], 0x300D).unwrap(), 0x2002);
        assert_eq!(enc(Opcode::Lea, &["R2", "TOP"], 0x3000).unwrap(), 0xE5FF);
        assert_eq!(enc(Opcode::Ldr, &["R1", "R2", "#-3"], 0x3000).unwrap(), 0x62BD);
        assert_eq!(enc(Opcode::Str, &["R1", "R2", "#31"], 0x3000).unwrap(), 0x729F);
    }

    #[test]
    fn range_checks() {
        let err = enc(Opcode::Add, &["R1", "R1", "#16"], 0x3000).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::Range { value: 16, bits: 5, signedness: "signed" }
        );
        assert_eq!(err.line(), 9);

        assert!(enc(Opcode::Add, &["R1", "R1", "#-16"], 0x3000).is_ok());
        assert!(enc(Opcode::Ldr, &["R1", "R2", "#32"], 0x3000).is_err());
        assert!(enc(Opcode::Trap, &["x100"], 0x3000).is_err());
        assert!(enc(Opcode::Trap, &["#-1"], 0x3000).is_err());
    }

    #[test]
    fn label_out_of_reach() {
        let err = enc(Opcode::Ld, &["R0", "FAR"], 0x3000).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Range { bits: 9, .. }));
        assert!(enc(Opcode::Jsr, &["FAR"], 0x3000).is_ok());
    }

    #[test]
    fn operand_kinds() {
        let err = enc(Opcode::Add, &["R1", "TOP", "R2"], 0x3000).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::OperandKind {
                mnemonic: "ADD",
                position: 2,
                expected: "a register",
                found: "TOP".into(),
            }
        );
        let err = enc(Opcode::Add, &["R1", "R9", "R2"], 0x3000).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidRegister("R9".into()));

        let err = enc(Opcode::Ld, &["R0", "R1"], 0x3000).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OperandKind { position: 2, .. }));

        let err = enc(Opcode::Ldr, &["R0", "R1", "TOP"], 0x3000).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OperandKind { position: 3, .. }));

        let err = enc(Opcode::Add, &["R1", "R1", "#--1"], 0x3000).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidLiteral("#--1".into()));
    }

    #[test]
    fn undefined_label() {
        let err = enc(Opcode::Br(Conditions(0b001)), &["NOWHERE"], 0x3000).unwrap_err();
        assert_eq!(err.to_string(), "at line 9: undefined label: `NOWHERE`");
    }

    #[test]
    fn operand_count() {
        let err = enc(Opcode::Add, &["R1", "R2"], 0x3000).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::OperandCount { mnemonic: "ADD", expected: 3, found: 2 }
        );
    }

    #[test]
    fn fill_values() {
        let table = symbols(&[("TOP", 0x3000)]);
        let ctx = Context::new(1);
        assert_eq!(fill_value("#-1", &table, ctx).unwrap(), 0xFFFF);
        assert_eq!(fill_value("xFFFF", &table, ctx).unwrap(), 0xFFFF);
        assert_eq!(fill_value("TOP", &table, ctx).unwrap(), 0x3000);
        assert!(fill_value("#65536", &table, ctx).is_err());
        assert!(fill_value("#-32769", &table, ctx).is_err());
        assert!(fill_value("R1", &table, ctx).is_err());
    }
}
