//! The LC-3 instruction and directive set.
//!
//! Every mnemonic maps to one [`Opcode`] whose operand template says how
//! many operands it takes, what kind each one is, and which bits of the
//! instruction word it lands in. The encoder is driven entirely by these
//! tables.

/// Kind of a single operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// `R0`..`R7`, three bits.
    Register,
    /// A register, or a signed immediate of `bits` width which also sets
    /// the immediate-mode flag (bit 5).
    RegisterOrImmediate { bits: u32 },
    /// A label, resolved relative to the next address, or a literal
    /// offset.
    PcOffset { bits: u32 },
    /// Signed literal offset.
    Offset { bits: u32 },
    /// Unsigned literal.
    Unsigned { bits: u32 },
    /// Full word: a literal (signed or unsigned) or a label's address.
    Word,
    /// Quoted string.
    Text,
}

impl OperandKind {
    pub fn describe(self) -> &'static str {
        match self {
            OperandKind::Register => "a register",
            OperandKind::RegisterOrImmediate { .. } => "a register or immediate",
            OperandKind::PcOffset { .. } => "a label or offset",
            OperandKind::Offset { .. } => "an offset literal",
            OperandKind::Unsigned { .. } => "an unsigned literal",
            OperandKind::Word => "a literal or label",
            OperandKind::Text => "a quoted string",
        }
    }
}

/// An operand slot and the lowest bit of the field it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub kind: OperandKind,
    pub lsb: usize,
}

const fn slot(kind: OperandKind, lsb: usize) -> Slot {
    Slot { kind, lsb }
}

const REG_9: Slot = slot(OperandKind::Register, 9);
const REG_6: Slot = slot(OperandKind::Register, 6);
const REG_OR_IMM5: Slot = slot(OperandKind::RegisterOrImmediate { bits: 5 }, 0);
const PC9: Slot = slot(OperandKind::PcOffset { bits: 9 }, 0);
const PC11: Slot = slot(OperandKind::PcOffset { bits: 11 }, 0);
const OFF6: Slot = slot(OperandKind::Offset { bits: 6 }, 0);
const TRAPVECT8: Slot = slot(OperandKind::Unsigned { bits: 8 }, 0);

/// Condition codes of a branch, `n` `z` `p` from high to low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditions(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    And,
    Br(Conditions),
    Jmp,
    Jsr,
    Jsrr,
    Ld,
    Ldi,
    Ldr,
    Lea,
    Not,
    Ret,
    Rti,
    St,
    Sti,
    Str,
    Trap,
    Getc,
    Out,
    Puts,
    In,
    Putsp,
    Halt,
}

impl Opcode {
    pub fn lookup(word: &str) -> Option<Self> {
        use Opcode::*;
        let op = match word.to_ascii_uppercase().as_str() {
            "ADD" => Add,
            "AND" => And,
            "BR" | "BRNZP" => Br(Conditions(0b111)),
            "BRN" => Br(Conditions(0b100)),
            "BRZ" => Br(Conditions(0b010)),
            "BRP" => Br(Conditions(0b001)),
            "BRNZ" => Br(Conditions(0b110)),
            "BRNP" => Br(Conditions(0b101)),
            "BRZP" => Br(Conditions(0b011)),
            "JMP" => Jmp,
            "JSR" => Jsr,
            "JSRR" => Jsrr,
            "LD" => Ld,
            "LDI" => Ldi,
            "LDR" => Ldr,
            "LEA" => Lea,
            "NOT" => Not,
            "RET" => Ret,
            "RTI" => Rti,
            "ST" => St,
            "STI" => Sti,
            "STR" => Str,
            "TRAP" => Trap,
            "GETC" => Getc,
            "OUT" => Out,
            "PUTS" => Puts,
            "IN" => In,
            "PUTSP" => Putsp,
            "HALT" => Halt,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            Add => "ADD",
            And => "AND",
            Br(Conditions(0b100)) => "BRn",
            Br(Conditions(0b010)) => "BRz",
            Br(Conditions(0b001)) => "BRp",
            Br(Conditions(0b110)) => "BRnz",
            Br(Conditions(0b101)) => "BRnp",
            Br(Conditions(0b011)) => "BRzp",
            Br(_) => "BR",
            Jmp => "JMP",
            Jsr => "JSR",
            Jsrr => "JSRR",
            Ld => "LD",
            Ldi => "LDI",
            Ldr => "LDR",
            Lea => "LEA",
            Not => "NOT",
            Ret => "RET",
            Rti => "RTI",
            St => "ST",
            Sti => "STI",
            Str => "STR",
            Trap => "TRAP",
            Getc => "GETC",
            Out => "OUT",
            Puts => "PUTS",
            In => "IN",
            Putsp => "PUTSP",
            Halt => "HALT",
        }
    }

    /// Operand slots, in source order.
    pub fn template(self) -> &'static [Slot] {
        use Opcode::*;
        match self {
            Add | And => &[REG_9, REG_6, REG_OR_IMM5],
            Not => &[REG_9, REG_6],
            Br(_) => &[PC9],
            Jmp | Jsrr => &[REG_6],
            Jsr => &[PC11],
            Ld | Ldi | Lea | St | Sti => &[REG_9, PC9],
            Ldr | Str => &[REG_9, REG_6, OFF6],
            Trap => &[TRAPVECT8],
            Ret | Rti | Getc | Out | Puts | In | Putsp | Halt => &[],
        }
    }

    /// Opcode nibble plus every bit that does not come from an operand.
    pub fn fixed_bits(self) -> u16 {
        use Opcode::*;
        let (opcode, rest): (u16, u16) = match self {
            Br(Conditions(nzp)) => (0b0000, u16::from(nzp) << 9),
            Add => (0b0001, 0),
            Ld => (0b0010, 0),
            St => (0b0011, 0),
            Jsr => (0b0100, 1 << 11),
            Jsrr => (0b0100, 0),
            And => (0b0101, 0),
            Ldr => (0b0110, 0),
            Str => (0b0111, 0),
            Rti => (0b1000, 0),
            Not => (0b1001, 0b11_1111),
            Ldi => (0b1010, 0),
            Sti => (0b1011, 0),
            Jmp => (0b1100, 0),
            Ret => (0b1100, 7 << 6),
            Lea => (0b1110, 0),
            Trap => (0b1111, 0),
            Getc => (0b1111, 0x20),
            Out => (0b1111, 0x21),
            Puts => (0b1111, 0x22),
            In => (0b1111, 0x23),
            Putsp => (0b1111, 0x24),
            Halt => (0b1111, 0x25),
        };
        (opcode << 12) | rest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Orig,
    Fill,
    Blkw,
    Stringz,
    End,
}

impl Directive {
    pub fn lookup(word: &str) -> Option<Self> {
        let dir = match word.to_ascii_uppercase().as_str() {
            ".ORIG" => Directive::Orig,
            ".FILL" => Directive::Fill,
            ".BLKW" => Directive::Blkw,
            ".STRINGZ" => Directive::Stringz,
            ".END" => Directive::End,
            _ => return None,
        };
        Some(dir)
    }

    pub fn name(self) -> &'static str {
        match self {
            Directive::Orig => ".ORIG",
            Directive::Fill => ".FILL",
            Directive::Blkw => ".BLKW",
            Directive::Stringz => ".STRINGZ",
            Directive::End => ".END",
        }
    }

    pub fn template(self) -> &'static [OperandKind] {
        match self {
            Directive::Orig => &[OperandKind::Unsigned { bits: 16 }],
            Directive::Fill => &[OperandKind::Word],
            Directive::Blkw => &[OperandKind::Unsigned { bits: 16 }],
            Directive::Stringz => &[OperandKind::Text],
            Directive::End => &[],
        }
    }
}

/// First meaningful token of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Instruction(Opcode),
    Directive(Directive),
}

impl Operation {
    pub fn lookup(word: &str) -> Option<Self> {
        Opcode::lookup(word)
            .map(Operation::Instruction)
            .or_else(|| Directive::lookup(word).map(Operation::Directive))
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Instruction(op) => op.name(),
            Operation::Directive(dir) => dir.name(),
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Operation::Instruction(op) => op.template().len(),
            Operation::Directive(dir) => dir.template().len(),
        }
    }
}
