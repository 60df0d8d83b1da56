/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The naive allocator: a stateless, per-instruction renaming with no
//! pressure analysis.  Virtual index k maps straight to physical slot k, so
//! the result is only correct when the caller already knows virtual indices
//! never reach the machine register count, or when a larger strategy uses
//! this as a building block.

use crate::error::AllocError;
use crate::inst::{Inst, Node, Operand, Reg, Subroutine, NUM_MACHINE_REGISTERS};
use crate::reg_utils::reg_positions;

fn map_reg(reg: Reg) -> Result<Reg, AllocError> {
  match reg {
    // The return address register keeps its symbolic name.
    Reg::ReturnAddress => Ok(Reg::ReturnAddress),
    // Stack and frame pointers occupy the top two machine slots under
    // this direct textual renaming.
    Reg::StackPointer => Ok(Reg::Physical(NUM_MACHINE_REGISTERS - 2)),
    Reg::FramePointer => Ok(Reg::Physical(NUM_MACHINE_REGISTERS - 1)),
    Reg::Virtual(ix) => Ok(Reg::Physical(ix)),
    // Physical registers never appear as allocator input.
    Reg::Physical(_) => Err(AllocError::UnmappableRegister(reg.to_string())),
  }
}

fn compile_inst(inst: &Inst) -> Result<Inst, AllocError> {
  let positions = reg_positions(&inst.op);
  let mut params = Vec::with_capacity(inst.params.len());
  for (pos, param) in inst.params.iter().enumerate() {
    let is_reg_position =
      positions.dst.contains(&pos) || positions.src.contains(&pos);
    let param = match (is_reg_position, param) {
      (true, Operand::Reg(reg)) => Operand::Reg(map_reg(*reg)?),
      (true, other) => {
        return Err(AllocError::UnmappableRegister(other.to_string()));
      }
      (false, other) => other.clone(),
    };
    params.push(param);
  }
  Ok(Inst::new(inst.op.clone(), params))
}

/// Rewrite one node.  Labels pass through unchanged; subroutines recurse.
pub fn compile(node: &Node) -> Result<Node, AllocError> {
  match node {
    Node::Inst(inst) => Ok(Node::Inst(compile_inst(inst)?)),
    Node::Label(_) => Ok(node.clone()),
    Node::Subroutine(sub) => {
      let children = sub
        .children
        .iter()
        .map(compile)
        .collect::<Result<Vec<Node>, AllocError>>()?;
      Ok(Node::Subroutine(Subroutine::new(sub.name.clone(), children)))
    }
  }
}

//=============================================================================
// Tests

#[cfg(test)]
mod tests {
  use super::*;
  use crate::inst::{LabelDecl, Opcode};

  fn inst(op: Opcode, params: Vec<Operand>) -> Node {
    Node::Inst(Inst::new(op, params))
  }

  fn vr(ix: u32) -> Operand {
    Operand::Reg(Reg::Virtual(ix))
  }

  fn r(ix: u32) -> Operand {
    Operand::Reg(Reg::Physical(ix))
  }

  #[test]
  fn cmp_strips_virtual_tags() {
    let input = inst(Opcode::Cmp, vec![vr(1), vr(0)]);
    let expected = inst(Opcode::Cmp, vec![r(1), r(0)]);
    assert_eq!(compile(&input), Ok(expected));
  }

  #[test]
  fn add_keeps_indices() {
    let input = inst(Opcode::Add, vec![vr(2), vr(1), vr(0)]);
    let expected = inst(Opcode::Add, vec![r(2), r(1), r(0)]);
    assert_eq!(compile(&input), Ok(expected));
  }

  #[test]
  fn return_address_passes_through() {
    let input = inst(
      Opcode::Add,
      vec![vr(4), vr(3), Operand::Reg(Reg::ReturnAddress)],
    );
    let expected = inst(
      Opcode::Add,
      vec![r(4), r(3), Operand::Reg(Reg::ReturnAddress)],
    );
    assert_eq!(compile(&input), Ok(expected));
  }

  #[test]
  fn stack_and_frame_pointers_take_top_slots() {
    let input = inst(
      Opcode::Add,
      vec![
        Operand::Reg(Reg::StackPointer),
        Operand::Reg(Reg::FramePointer),
        vr(3),
      ],
    );
    let expected = inst(Opcode::Add, vec![r(6), r(7), r(3)]);
    assert_eq!(compile(&input), Ok(expected));
  }

  #[test]
  fn unmappable_identifier_is_fatal() {
    let input = inst(
      Opcode::Add,
      vec![Operand::Label("foo".to_string()), vr(1), vr(0)],
    );
    assert_eq!(
      compile(&input),
      Err(AllocError::UnmappableRegister("foo".to_string()))
    );
  }

  #[test]
  fn physical_register_input_is_fatal() {
    let input = inst(Opcode::Cmp, vec![r(3), vr(0)]);
    assert_eq!(
      compile(&input),
      Err(AllocError::UnmappableRegister("r3".to_string()))
    );
  }

  #[test]
  fn immediate_operands_pass_through() {
    let input = inst(Opcode::Li, vec![vr(3), Operand::Imm(42)]);
    let expected = inst(Opcode::Li, vec![r(3), Operand::Imm(42)]);
    assert_eq!(compile(&input), Ok(expected));
  }

  #[test]
  fn labels_pass_through() {
    let input = Node::Label(LabelDecl::new("start"));
    assert_eq!(compile(&input), Ok(input.clone()));
  }

  #[test]
  fn subroutines_recurse() {
    let input = Node::Subroutine(Subroutine::new(
      "leaf",
      vec![inst(Opcode::Cmp, vec![vr(1), vr(0)])],
    ));
    let expected = Node::Subroutine(Subroutine::new(
      "leaf",
      vec![inst(Opcode::Cmp, vec![r(1), r(0)])],
    ));
    assert_eq!(compile(&input), Ok(expected));
  }
}
