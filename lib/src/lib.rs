/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Main file / top-level module for the regalloc16 library.
//!
//! The library rewrites an instruction stream that references an unbounded
//! set of virtual registers (`vr0`, `vr1`, ...) into an equivalent stream
//! that references only the machine's bounded set of physical registers
//! (`r0` .. `r7`), inserting spill loads/stores when virtual-register
//! demand exceeds physical supply.

mod driver;
mod error;
mod inst;
mod naive;
mod reg_utils;

pub use crate::driver::Driver;
pub use crate::error::AllocError;
pub use crate::inst::{
  Inst, LabelDecl, Node, Opcode, Operand, Reg, Subroutine, TopLevel,
  NUM_MACHINE_REGISTERS,
};
pub use crate::naive::compile as naive_compile;
pub use crate::reg_utils::{
  dest_regs, referenced_regs, reg_positions, rewrite, rewrite_inst,
  source_regs, RegPositions,
};
