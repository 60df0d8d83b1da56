/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The instruction model: registers, operands, opcodes, instructions, and
//! the grouping nodes that carry them.  Register names are parsed into the
//! typed `Reg` form exactly once, at this boundary; nothing downstream ever
//! re-parses strings.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

//=============================================================================
// Registers

/// Number of general-purpose registers in the machine's register file.
pub const NUM_MACHINE_REGISTERS: u32 = 8;

/// A register identifier.  `Virtual` registers are produced by upstream code
/// generation and have an unbounded index domain; `Physical` registers are
/// the machine's real slots, indices `0 .. NUM_MACHINE_REGISTERS`.  The three
/// reserved symbolic registers never participate in allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum Reg {
  Virtual(u32),
  Physical(u32),
  ReturnAddress,
  StackPointer,
  FramePointer,
}

impl Reg {
  pub fn is_virtual(self) -> bool {
    match self {
      Reg::Virtual(_) => true,
      _ => false,
    }
  }

  pub fn is_reserved(self) -> bool {
    match self {
      Reg::ReturnAddress | Reg::StackPointer | Reg::FramePointer => true,
      Reg::Virtual(_) | Reg::Physical(_) => false,
    }
  }
}

impl fmt::Display for Reg {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Reg::Virtual(ix) => write!(fmt, "vr{}", ix),
      Reg::Physical(ix) => write!(fmt, "r{}", ix),
      Reg::ReturnAddress => write!(fmt, "ra"),
      Reg::StackPointer => write!(fmt, "sp"),
      Reg::FramePointer => write!(fmt, "fp"),
    }
  }
}

impl FromStr for Reg {
  type Err = ();

  fn from_str(s: &str) -> Result<Reg, ()> {
    match s {
      "ra" => return Ok(Reg::ReturnAddress),
      "sp" => return Ok(Reg::StackPointer),
      "fp" => return Ok(Reg::FramePointer),
      _ => {}
    }
    if let Some(ix) = s.strip_prefix("vr") {
      if let Ok(n) = ix.parse::<u32>() {
        return Ok(Reg::Virtual(n));
      }
    } else if let Some(ix) = s.strip_prefix("r") {
      if let Ok(n) = ix.parse::<u32>() {
        return Ok(Reg::Physical(n));
      }
    }
    Err(())
  }
}

//=============================================================================
// Operands

/// One operand slot of an instruction.  Which slots hold registers, and in
/// which role, is fixed per opcode; see `reg_utils::reg_positions`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum Operand {
  Reg(Reg),
  Imm(i32),
  Label(String),
}

impl fmt::Display for Operand {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Operand::Reg(reg) => reg.fmt(fmt),
      Operand::Imm(imm) => write!(fmt, "{}", imm),
      Operand::Label(name) => write!(fmt, "{}", name),
    }
  }
}

//=============================================================================
// Opcodes

/// The machine's opcode repertoire.  This enum is closed: the role table in
/// `reg_utils` matches on it exhaustively, so a new opcode cannot be added
/// without also deciding its operand roles.  `Raw` carries verbatim text for
/// opaque instructions that allocation must pass through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum Opcode {
  Add,
  Sub,
  Adc,
  Sbc,
  And,
  Or,
  Xor,
  Not,
  Cmp,
  Cmpi,
  Addi,
  Subi,
  Andi,
  Ori,
  Xori,
  Li,
  Liu,
  Lui,
  Load,
  Store,
  La,
  Jmp,
  Jr,
  Jalr,
  Beq,
  Bne,
  Blt,
  Bgt,
  Bltu,
  Bgtu,
  Call,
  CallPtr,
  Enter,
  Leave,
  Ret,
  Nop,
  Hlt,
  Break,
  Raw(String),
}

impl Opcode {
  /// Map a textual mnemonic to an opcode.  Unrecognized mnemonics become
  /// `Raw`, preserving the original text.
  pub fn from_mnemonic(s: &str) -> Opcode {
    match s {
      "ADD" => Opcode::Add,
      "SUB" => Opcode::Sub,
      "ADC" => Opcode::Adc,
      "SBC" => Opcode::Sbc,
      "AND" => Opcode::And,
      "OR" => Opcode::Or,
      "XOR" => Opcode::Xor,
      "NOT" => Opcode::Not,
      "CMP" => Opcode::Cmp,
      "CMPI" => Opcode::Cmpi,
      "ADDI" => Opcode::Addi,
      "SUBI" => Opcode::Subi,
      "ANDI" => Opcode::Andi,
      "ORI" => Opcode::Ori,
      "XORI" => Opcode::Xori,
      "LI" => Opcode::Li,
      "LIU" => Opcode::Liu,
      "LUI" => Opcode::Lui,
      "LOAD" => Opcode::Load,
      "STORE" => Opcode::Store,
      "LA" => Opcode::La,
      "JMP" => Opcode::Jmp,
      "JR" => Opcode::Jr,
      "JALR" => Opcode::Jalr,
      "BEQ" => Opcode::Beq,
      "BNE" => Opcode::Bne,
      "BLT" => Opcode::Blt,
      "BGT" => Opcode::Bgt,
      "BLTU" => Opcode::Bltu,
      "BGTU" => Opcode::Bgtu,
      "CALL" => Opcode::Call,
      "CALLPTR" => Opcode::CallPtr,
      "ENTER" => Opcode::Enter,
      "LEAVE" => Opcode::Leave,
      "RET" => Opcode::Ret,
      "NOP" => Opcode::Nop,
      "HLT" => Opcode::Hlt,
      "BREAK" => Opcode::Break,
      _ => Opcode::Raw(s.to_string()),
    }
  }
}

impl fmt::Display for Opcode {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    let s = match self {
      Opcode::Add => "ADD",
      Opcode::Sub => "SUB",
      Opcode::Adc => "ADC",
      Opcode::Sbc => "SBC",
      Opcode::And => "AND",
      Opcode::Or => "OR",
      Opcode::Xor => "XOR",
      Opcode::Not => "NOT",
      Opcode::Cmp => "CMP",
      Opcode::Cmpi => "CMPI",
      Opcode::Addi => "ADDI",
      Opcode::Subi => "SUBI",
      Opcode::Andi => "ANDI",
      Opcode::Ori => "ORI",
      Opcode::Xori => "XORI",
      Opcode::Li => "LI",
      Opcode::Liu => "LIU",
      Opcode::Lui => "LUI",
      Opcode::Load => "LOAD",
      Opcode::Store => "STORE",
      Opcode::La => "LA",
      Opcode::Jmp => "JMP",
      Opcode::Jr => "JR",
      Opcode::Jalr => "JALR",
      Opcode::Beq => "BEQ",
      Opcode::Bne => "BNE",
      Opcode::Blt => "BLT",
      Opcode::Bgt => "BGT",
      Opcode::Bltu => "BLTU",
      Opcode::Bgtu => "BGTU",
      Opcode::Call => "CALL",
      Opcode::CallPtr => "CALLPTR",
      Opcode::Enter => "ENTER",
      Opcode::Leave => "LEAVE",
      Opcode::Ret => "RET",
      Opcode::Nop => "NOP",
      Opcode::Hlt => "HLT",
      Opcode::Break => "BREAK",
      Opcode::Raw(text) => return write!(fmt, "{}", text),
    };
    write!(fmt, "{}", s)
  }
}

//=============================================================================
// Instructions and grouping nodes

/// One machine instruction: an opcode plus its ordered operand list.  The
/// allocator performs no arity validation; malformed operand lists are an
/// upstream contract violation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Inst {
  pub op: Opcode,
  pub params: Vec<Operand>,
}

impl Inst {
  pub fn new(op: Opcode, params: Vec<Operand>) -> Inst {
    Inst { op, params }
  }

  pub fn nullary(op: Opcode) -> Inst {
    Inst { op, params: vec![] }
  }
}

impl fmt::Display for Inst {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    write!(fmt, "{}", self.op)?;
    for (i, param) in self.params.iter().enumerate() {
      if i == 0 {
        write!(fmt, " {}", param)?;
      } else {
        write!(fmt, ", {}", param)?;
      }
    }
    Ok(())
  }
}

/// A label declaration: a named position in the stream.  Carries no
/// registers and is never touched by allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct LabelDecl {
  pub name: String,
}

impl LabelDecl {
  pub fn new<S: Into<String>>(name: S) -> LabelDecl {
    LabelDecl { name: name.into() }
  }
}

/// A named child sequence, one function body.  Grouping is structural only;
/// allocation state never crosses a subroutine boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Subroutine {
  pub name: String,
  pub children: Vec<Node>,
}

impl Subroutine {
  pub fn new<S: Into<String>>(name: S, children: Vec<Node>) -> Subroutine {
    Subroutine { name: name.into(), children }
  }
}

/// One element of an instruction stream.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum Node {
  Inst(Inst),
  Label(LabelDecl),
  Subroutine(Subroutine),
}

impl fmt::Display for Node {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Node::Inst(inst) => write!(fmt, "{}", inst),
      Node::Label(label) => write!(fmt, "{}:", label.name),
      Node::Subroutine(sub) => {
        writeln!(fmt, ".sub {}", sub.name)?;
        for child in &sub.children {
          writeln!(fmt, "{}", child)?;
        }
        write!(fmt, ".end")
      }
    }
  }
}

/// The top-level instruction stream for one compilation unit.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct TopLevel {
  pub children: Vec<Node>,
}

impl TopLevel {
  pub fn new(children: Vec<Node>) -> TopLevel {
    TopLevel { children }
  }
}

impl fmt::Display for TopLevel {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    for child in &self.children {
      writeln!(fmt, "{}", child)?;
    }
    Ok(())
  }
}

//=============================================================================
// Tests
