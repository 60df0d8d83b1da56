/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Allocation failures.  Every variant is fatal to the compilation unit
//! being processed; there is no retry and no partial output.

use std::error::Error;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
  /// A register operand is neither a recognized virtual form nor a
  /// reserved symbolic name.  Carries the offending operand's text.
  UnmappableRegister(String),
  /// The spill strategy has no scratch capacity to shuttle values.
  InsufficientPhysicalRegisters,
  /// Spilling is required but the run does not begin with an ENTER
  /// instruction to establish the frame.
  MissingLeadingEnter,
}

impl fmt::Display for AllocError {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    match self {
      AllocError::UnmappableRegister(name) => write!(
        fmt,
        "unable to map virtual register to physical register: `{}'",
        name
      ),
      AllocError::InsufficientPhysicalRegisters => {
        write!(fmt, "insufficient physical registers")
      }
      AllocError::MissingLeadingEnter => write!(fmt, "missing leading enter"),
    }
  }
}

impl Error for AllocError {}
