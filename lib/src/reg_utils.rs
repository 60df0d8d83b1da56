/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Static, per-opcode knowledge of which operand positions hold registers
//! and in which role (read, written), plus the rewrite primitive that
//! substitutes one register for another throughout an instruction stream.
//! This table is the single source of truth for every allocation decision.

use smallvec::SmallVec;

use crate::inst::{Inst, Node, Opcode, Operand, Reg};

/// At most three register operands per instruction on this machine.
pub type RegVec = SmallVec<[Reg; 3]>;

/// The register-holding operand positions of one opcode, split by role.
/// A position occurring in both lists would be a read-modify-write
/// operand; no current opcode has one.
#[derive(Clone, Copy, Debug)]
pub struct RegPositions {
  pub dst: &'static [usize],
  pub src: &'static [usize],
}

const NONE: RegPositions = RegPositions { dst: &[], src: &[] };

/// Operand roles as a function of opcode, and nothing else.  The match is
/// exhaustive on purpose: adding an opcode forces a decision here.
pub fn reg_positions(op: &Opcode) -> RegPositions {
  match op {
    // OP dst, src1, src2
    Opcode::Add
    | Opcode::Sub
    | Opcode::Adc
    | Opcode::Sbc
    | Opcode::And
    | Opcode::Or
    | Opcode::Xor => RegPositions { dst: &[0], src: &[1, 2] },

    // NOT dst, src / OPI dst, src, imm
    Opcode::Not
    | Opcode::Addi
    | Opcode::Subi
    | Opcode::Andi
    | Opcode::Ori
    | Opcode::Xori => RegPositions { dst: &[0], src: &[1] },

    // CMP left, right (both read; flags are not a register operand)
    Opcode::Cmp => RegPositions { dst: &[], src: &[0, 1] },

    // CMPI left, imm
    Opcode::Cmpi => RegPositions { dst: &[], src: &[0] },

    // LI/LIU/LUI dst, imm and LA dst, label
    Opcode::Li | Opcode::Liu | Opcode::Lui | Opcode::La => {
      RegPositions { dst: &[0], src: &[] }
    }

    // LOAD dst, base[, offset]
    Opcode::Load => RegPositions { dst: &[0], src: &[1] },

    // STORE val, base[, offset]
    Opcode::Store => RegPositions { dst: &[], src: &[0, 1] },

    // JR target[, offset] / CALLPTR target
    Opcode::Jr | Opcode::CallPtr => RegPositions { dst: &[], src: &[0] },

    // JALR dst, target[, offset]
    Opcode::Jalr => RegPositions { dst: &[0], src: &[1] },

    // Label-target transfers and register-free control.
    Opcode::Jmp
    | Opcode::Beq
    | Opcode::Bne
    | Opcode::Blt
    | Opcode::Bgt
    | Opcode::Bltu
    | Opcode::Bgtu
    | Opcode::Call
    | Opcode::Enter
    | Opcode::Leave
    | Opcode::Ret
    | Opcode::Nop
    | Opcode::Hlt
    | Opcode::Break => NONE,

    // Opaque text: no register operands the allocator can see.
    Opcode::Raw(_) => NONE,
  }
}

fn reg_at(inst: &Inst, pos: usize) -> Option<Reg> {
  match inst.params.get(pos) {
    Some(Operand::Reg(reg)) => Some(*reg),
    _ => None,
  }
}

/// Every register the instruction references, in operand order.
pub fn referenced_regs(inst: &Inst) -> RegVec {
  let positions = reg_positions(&inst.op);
  let mut regs = RegVec::new();
  for pos in 0..inst.params.len() {
    if positions.dst.contains(&pos) || positions.src.contains(&pos) {
      if let Some(reg) = reg_at(inst, pos) {
        regs.push(reg);
      }
    }
  }
  regs
}

/// The registers the instruction reads, in operand order.
pub fn source_regs(inst: &Inst) -> RegVec {
  let positions = reg_positions(&inst.op);
  let mut regs = RegVec::new();
  for &pos in positions.src {
    if let Some(reg) = reg_at(inst, pos) {
      regs.push(reg);
    }
  }
  regs
}

/// The registers the instruction writes, in operand order.
pub fn dest_regs(inst: &Inst) -> RegVec {
  let positions = reg_positions(&inst.op);
  let mut regs = RegVec::new();
  for &pos in positions.dst {
    if let Some(reg) = reg_at(inst, pos) {
      regs.push(reg);
    }
  }
  regs
}

/// Substitute `to` for `from` at every register position of `inst`.  Pure
/// and total: non-register operands and non-matching registers are left
/// untouched, and an opcode with no register positions simply has nothing
/// to replace.
pub fn rewrite_inst(inst: &Inst, from: Reg, to: Reg) -> Inst {
  let positions = reg_positions(&inst.op);
  let params = inst
    .params
    .iter()
    .enumerate()
    .map(|(pos, param)| match param {
      Operand::Reg(reg)
        if *reg == from
          && (positions.dst.contains(&pos) || positions.src.contains(&pos)) =>
      {
        Operand::Reg(to)
      }
      other => other.clone(),
    })
    .collect();
  Inst::new(inst.op.clone(), params)
}

/// Substitute `to` for `from` throughout a node list.  Labels pass through;
/// subroutines are not descended into (each frame is rewritten by its own
/// allocation pass).
pub fn rewrite(nodes: &[Node], from: Reg, to: Reg) -> Vec<Node> {
  nodes
    .iter()
    .map(|node| match node {
      Node::Inst(inst) => Node::Inst(rewrite_inst(inst, from, to)),
      other => other.clone(),
    })
    .collect()
}

//=============================================================================
// Tests

#[cfg(test)]
mod tests {
  use super::*;
  use crate::inst::LabelDecl;

  fn add_vr() -> Inst {
    Inst::new(
      Opcode::Add,
      vec![
        Operand::Reg(Reg::Virtual(2)),
        Operand::Reg(Reg::Virtual(1)),
        Operand::Reg(Reg::Virtual(0)),
      ],
    )
  }

  #[test]
  fn roles_three_operand_alu() {
    let inst = add_vr();
    assert_eq!(dest_regs(&inst).as_slice(), &[Reg::Virtual(2)]);
    assert_eq!(
      source_regs(&inst).as_slice(),
      &[Reg::Virtual(1), Reg::Virtual(0)]
    );
    assert_eq!(
      referenced_regs(&inst).as_slice(),
      &[Reg::Virtual(2), Reg::Virtual(1), Reg::Virtual(0)]
    );
  }

  #[test]
  fn roles_cmp_reads_both() {
    let inst = Inst::new(
      Opcode::Cmp,
      vec![Operand::Reg(Reg::Virtual(1)), Operand::Reg(Reg::Virtual(0))],
    );
    assert!(dest_regs(&inst).is_empty());
    assert_eq!(
      source_regs(&inst).as_slice(),
      &[Reg::Virtual(1), Reg::Virtual(0)]
    );
  }

  #[test]
  fn roles_la_ignores_label_operand() {
    let inst = Inst::new(
      Opcode::La,
      vec![
        Operand::Reg(Reg::Virtual(3)),
        Operand::Label("start".to_string()),
      ],
    );
    assert_eq!(dest_regs(&inst).as_slice(), &[Reg::Virtual(3)]);
    assert!(source_regs(&inst).is_empty());
    assert_eq!(referenced_regs(&inst).as_slice(), &[Reg::Virtual(3)]);
  }

  #[test]
  fn roles_store_reads_value_and_base() {
    let inst = Inst::new(
      Opcode::Store,
      vec![
        Operand::Reg(Reg::Virtual(4)),
        Operand::Reg(Reg::FramePointer),
        Operand::Imm(-1),
      ],
    );
    assert!(dest_regs(&inst).is_empty());
    assert_eq!(
      source_regs(&inst).as_slice(),
      &[Reg::Virtual(4), Reg::FramePointer]
    );
  }

  #[test]
  fn roles_jalr() {
    let inst = Inst::new(
      Opcode::Jalr,
      vec![Operand::Reg(Reg::ReturnAddress), Operand::Reg(Reg::Virtual(0))],
    );
    assert_eq!(dest_regs(&inst).as_slice(), &[Reg::ReturnAddress]);
    assert_eq!(source_regs(&inst).as_slice(), &[Reg::Virtual(0)]);
  }

  #[test]
  fn roles_control_free_of_registers() {
    for op in &[Opcode::Ret, Opcode::Nop, Opcode::Enter, Opcode::Leave] {
      let inst = Inst::nullary(op.clone());
      assert!(referenced_regs(&inst).is_empty());
      assert!(source_regs(&inst).is_empty());
      assert!(dest_regs(&inst).is_empty());
    }
  }

  #[test]
  fn referenced_is_union_of_sources_and_dests() {
    let insts = vec![
      add_vr(),
      Inst::new(
        Opcode::Load,
        vec![Operand::Reg(Reg::Virtual(0)), Operand::Reg(Reg::Virtual(1))],
      ),
      Inst::new(
        Opcode::Cmpi,
        vec![Operand::Reg(Reg::Virtual(9)), Operand::Imm(5)],
      ),
      Inst::nullary(Opcode::Ret),
    ];
    for inst in &insts {
      let mut both: Vec<Reg> = dest_regs(inst).into_iter().collect();
      both.extend(source_regs(inst));
      let mut referenced: Vec<Reg> = referenced_regs(inst).into_iter().collect();
      both.sort();
      referenced.sort();
      assert_eq!(both, referenced);
    }
  }

  #[test]
  fn rewrite_changes_only_matching_positions() {
    let nodes = vec![
      Node::Inst(add_vr()),
      Node::Label(LabelDecl::new("loop")),
      Node::Inst(Inst::new(
        Opcode::Addi,
        vec![
          Operand::Reg(Reg::Virtual(1)),
          Operand::Reg(Reg::Virtual(1)),
          Operand::Imm(1),
        ],
      )),
      Node::Inst(Inst::new(
        Opcode::La,
        vec![
          Operand::Reg(Reg::Virtual(0)),
          Operand::Label("vr1".to_string()),
        ],
      )),
    ];
    let rewritten = rewrite(&nodes, Reg::Virtual(1), Reg::Physical(5));
    assert_eq!(
      rewritten,
      vec![
        Node::Inst(Inst::new(
          Opcode::Add,
          vec![
            Operand::Reg(Reg::Virtual(2)),
            Operand::Reg(Reg::Physical(5)),
            Operand::Reg(Reg::Virtual(0)),
          ],
        )),
        Node::Label(LabelDecl::new("loop")),
        Node::Inst(Inst::new(
          Opcode::Addi,
          vec![
            Operand::Reg(Reg::Physical(5)),
            Operand::Reg(Reg::Physical(5)),
            Operand::Imm(1),
          ],
        )),
        // The label operand spelled "vr1" is not a register and must
        // survive untouched.
        Node::Inst(Inst::new(
          Opcode::La,
          vec![
            Operand::Reg(Reg::Virtual(0)),
            Operand::Label("vr1".to_string()),
          ],
        )),
      ]
    );
  }

  #[test]
  fn rewrite_raw_is_identity() {
    let node = Node::Inst(Inst::new(
      Opcode::Raw("SYSCALL".to_string()),
      vec![Operand::Imm(3)],
    ));
    let rewritten = rewrite(&[node.clone()], Reg::Virtual(0), Reg::Physical(0));
    assert_eq!(rewritten, vec![node]);
  }
}
