/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The allocation driver.  Per linear run of instructions it measures
//! virtual-register pressure and picks one of two strategies: direct-fit
//! renaming when every distinct virtual register can have its own physical
//! slot, or spill-everything when demand exceeds the physical budget.  The
//! spill strategy parks every virtual register in a dedicated stack slot
//! and shuttles values through scratch registers around each instruction,
//! so no scratch assignment outlives a single instruction.

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::error::AllocError;
use crate::inst::{
  Inst, Node, Opcode, Operand, Reg, Subroutine, TopLevel,
  NUM_MACHINE_REGISTERS,
};
use crate::reg_utils::{
  dest_regs, referenced_regs, rewrite, rewrite_inst, source_regs,
};

/// Arithmetic on the machine's load/store offset field: a signed 5-bit
/// immediate.  Offsets outside this range need an address computation.
const MIN_SHORT_OFFSET: i32 = -16;
const MAX_SHORT_OFFSET: i32 = 15;

pub struct Driver {
  num_registers: usize,
}

impl Default for Driver {
  fn default() -> Driver {
    Driver::new(NUM_MACHINE_REGISTERS as usize)
  }
}

impl Driver {
  /// `num_registers` is the physical register budget: it selects between
  /// the direct-fit and spill strategies and bounds the spill scratch
  /// pool.
  pub fn new(num_registers: usize) -> Driver {
    Driver { num_registers }
  }

  /// Allocate a whole compilation unit, preserving grouping structure.
  /// The top-level run and each subroutine body are allocated
  /// independently; frames share no slots and no scratch assignments.
  pub fn compile(&self, top_level: &TopLevel) -> Result<TopLevel, AllocError> {
    Ok(TopLevel::new(self.compile_nodes(&top_level.children)?))
  }

  fn compile_nodes(&self, children: &[Node]) -> Result<Vec<Node>, AllocError> {
    let children = self.compile_children(children)?;
    children
      .into_iter()
      .map(|node| match node {
        Node::Subroutine(sub) => Ok(Node::Subroutine(Subroutine::new(
          sub.name,
          self.compile_nodes(&sub.children)?,
        ))),
        other => Ok(other),
      })
      .collect()
  }

  /// Allocate one linear run.  Subroutine nodes within the run are passed
  /// through untouched here; `compile_nodes` gives each its own pass.
  pub fn compile_children(
    &self, children: &[Node],
  ) -> Result<Vec<Node>, AllocError> {
    let vregs = ordered_virtual_regs(children);
    debug!(
      "run of {} nodes: pressure {} vs budget {} -> {}",
      children.len(),
      vregs.len(),
      self.num_registers,
      if vregs.len() <= self.num_registers { "direct fit" } else { "spill" }
    );
    if vregs.len() <= self.num_registers {
      Ok(self.direct_fit(children, &vregs))
    } else {
      self.spill(children, &vregs)
    }
  }

  /// Direct-fit: each distinct virtual register gets its own physical
  /// slot.  The earliest-seen register receives the highest-numbered slot
  /// among those needed; reserved registers stay symbolic.  Instruction
  /// count, order and labels are untouched.
  fn direct_fit(&self, children: &[Node], vregs: &[u32]) -> Vec<Node> {
    let m = vregs.len();
    let mut nodes = children.to_vec();
    for (i, &vreg) in vregs.iter().enumerate() {
      let slot = (m - 1 - i) as u32;
      trace!("direct fit: vr{} -> r{}", vreg, slot);
      nodes = rewrite(&nodes, Reg::Virtual(vreg), Reg::Physical(slot));
    }
    nodes
  }

  /// Spill-everything: every virtual register lives in a frame slot and
  /// visits a scratch register only for the duration of one instruction.
  fn spill(
    &self, children: &[Node], vregs: &[u32],
  ) -> Result<Vec<Node>, AllocError> {
    if self.num_registers == 0 {
      return Err(AllocError::InsufficientPhysicalRegisters);
    }

    // The frame's slot table: one slot per distinct virtual register, in
    // first-reference order, immediately past any pre-reserved frame area.
    let rank: FxHashMap<u32, usize> =
      vregs.iter().enumerate().map(|(i, &v)| (v, i)).collect();

    // The run must open with the ENTER that establishes the frame the
    // slots are addressed relative to.
    let enter = match children.first() {
      Some(Node::Inst(inst)) if inst.op == Opcode::Enter => inst,
      _ => return Err(AllocError::MissingLeadingEnter),
    };
    let pre_reserved = match enter.params.first() {
      Some(Operand::Imm(n)) => *n,
      _ => 0,
    };
    trace!(
      "spill: {} slots at fp offsets {}..",
      vregs.len(),
      -(pre_reserved + 1)
    );

    let mut out = Vec::with_capacity(children.len());
    out.push(Node::Inst(Inst::new(
      Opcode::Enter,
      vec![Operand::Imm(pre_reserved + vregs.len() as i32)],
    )));
    for node in &children[1..] {
      match node {
        Node::Inst(inst) => {
          self.spill_inst(inst, pre_reserved, &rank, &mut out)?
        }
        other => out.push(other.clone()),
      }
    }
    Ok(out)
  }

  /// Rewrite one instruction for the spill strategy: loads for its virtual
  /// sources immediately before, scratch registers substituted within, and
  /// stores for its virtual destinations immediately after.
  fn spill_inst(
    &self, inst: &Inst, pre_reserved: i32, rank: &FxHashMap<u32, usize>,
    out: &mut Vec<Node>,
  ) -> Result<(), AllocError> {
    let sources = distinct_by_rank(&source_regs(inst), rank);
    let dests = distinct_by_rank(&dest_regs(inst), rank);

    // Sources claim scratch registers counting down from the top of the
    // physical range, in first-reference rank order.
    let mut scratch: FxHashMap<u32, Reg> = FxHashMap::default();
    for (i, &vreg) in sources.iter().enumerate() {
      scratch.insert(vreg, self.scratch_reg(i)?);
    }
    // Destinations follow the same descending-rank rule over the
    // destination set.  A register that is also a source keeps its source
    // scratch; a destination-only register may share a slot with a source
    // because the machine reads all operands before writing.
    for (i, &vreg) in dests.iter().enumerate() {
      let reg = self.scratch_reg(i)?;
      scratch.entry(vreg).or_insert(reg);
    }

    let mut rewritten = inst.clone();
    for &vreg in sources.iter().chain(dests.iter()) {
      rewritten = rewrite_inst(&rewritten, Reg::Virtual(vreg), scratch[&vreg]);
    }

    for &vreg in &sources {
      let offset = self.slot_offset(pre_reserved, rank[&vreg]);
      gen_load(scratch[&vreg], offset, out);
    }
    out.push(Node::Inst(rewritten));
    for &vreg in &dests {
      let offset = self.slot_offset(pre_reserved, rank[&vreg]);
      gen_store(scratch[&vreg], offset, out);
    }
    Ok(())
  }

  fn scratch_reg(&self, i: usize) -> Result<Reg, AllocError> {
    if i >= self.num_registers {
      return Err(AllocError::InsufficientPhysicalRegisters);
    }
    Ok(Reg::Physical((self.num_registers - 1 - i) as u32))
  }

  /// The fp-relative offset of a slot: the stack grows downward, so slot
  /// words sit below the frame pointer, past the pre-reserved area.
  fn slot_offset(&self, pre_reserved: i32, slot_index: usize) -> i32 {
    -(pre_reserved + slot_index as i32 + 1)
  }
}

/// Distinct virtual registers referenced by instruction nodes in the run,
/// in order of first appearance.  Reserved registers never count against
/// pressure, and nested subroutines are measured by their own pass.
fn ordered_virtual_regs(children: &[Node]) -> Vec<u32> {
  let mut seen = Vec::new();
  for node in children {
    if let Node::Inst(inst) = node {
      for reg in referenced_regs(inst) {
        if let Reg::Virtual(ix) = reg {
          if !seen.contains(&ix) {
            seen.push(ix);
          }
        }
      }
    }
  }
  seen
}

/// Distinct virtual registers from a role list, ordered by global
/// first-reference rank.
fn distinct_by_rank(
  regs: &[Reg], rank: &FxHashMap<u32, usize>,
) -> Vec<u32> {
  let mut vregs = Vec::new();
  for reg in regs {
    if let Reg::Virtual(ix) = reg {
      if !vregs.contains(ix) {
        vregs.push(*ix);
      }
    }
  }
  vregs.sort_by_key(|v| rank[v]);
  vregs
}

fn fp() -> Operand {
  Operand::Reg(Reg::FramePointer)
}

fn ra() -> Operand {
  Operand::Reg(Reg::ReturnAddress)
}

/// Emit a load of `reg` from the slot at fp-relative `offset`.  Offsets
/// beyond the machine's signed 5-bit field synthesize the address through
/// `ra`, which never carries a live value across an instruction boundary
/// inside a frame body.
fn gen_load(reg: Reg, offset: i32, out: &mut Vec<Node>) {
  if offset >= MIN_SHORT_OFFSET && offset <= MAX_SHORT_OFFSET {
    out.push(Node::Inst(Inst::new(
      Opcode::Load,
      vec![Operand::Reg(reg), fp(), Operand::Imm(offset)],
    )));
  } else {
    gen_far_address(offset, out);
    out.push(Node::Inst(Inst::new(
      Opcode::Load,
      vec![Operand::Reg(reg), ra()],
    )));
  }
}

/// Emit a store of `reg` to the slot at fp-relative `offset`.
fn gen_store(reg: Reg, offset: i32, out: &mut Vec<Node>) {
  if offset >= MIN_SHORT_OFFSET && offset <= MAX_SHORT_OFFSET {
    out.push(Node::Inst(Inst::new(
      Opcode::Store,
      vec![Operand::Reg(reg), fp(), Operand::Imm(offset)],
    )));
  } else {
    gen_far_address(offset, out);
    out.push(Node::Inst(Inst::new(
      Opcode::Store,
      vec![Operand::Reg(reg), ra()],
    )));
  }
}

/// Materialize `fp + offset` in `ra`, one byte of the 16-bit two's
/// complement offset at a time.
fn gen_far_address(offset: i32, out: &mut Vec<Node>) {
  let off16 = offset as i16 as u16;
  let lo = (off16 & 0x00ff) as i32;
  let hi = (off16 >> 8) as i32;
  out.push(Node::Inst(Inst::new(
    Opcode::Li,
    vec![ra(), Operand::Imm(lo)],
  )));
  out.push(Node::Inst(Inst::new(
    Opcode::Lui,
    vec![ra(), Operand::Imm(hi)],
  )));
  out.push(Node::Inst(Inst::new(
    Opcode::Add,
    vec![ra(), ra(), fp()],
  )));
}

//=============================================================================
// Tests
