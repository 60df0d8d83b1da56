//! Built-in test programs, kept as listing text so they also exercise the
//! parser.  Look one up with `find_test_case`; the names live in
//! `TEST_CASE_NAMES` so the CLI can report what is available.

use regalloc16::TopLevel;

use crate::parser;

pub const TEST_CASE_NAMES: &[&str] =
  &["direct-fit", "spill", "subroutines", "far-offset"];

pub fn find_test_case(name: &str) -> Option<TopLevel> {
  let source = match name {
    // Three distinct virtual registers; fits an 8-register machine with
    // room to spare.
    "direct-fit" => {
      "\
        LI vr0, 10\n\
        LI vr1, 32\n\
        ADD vr2, vr1, vr0\n\
        CMP vr2, vr0\n\
        RET\n"
    }

    // Nine distinct virtual registers; forces the spill strategy on the
    // default budget.
    "spill" => {
      "\
        ENTER\n\
        LI vr0, 0\n\
        LI vr1, 1\n\
        LI vr2, 2\n\
        LI vr3, 3\n\
        LI vr4, 4\n\
        LI vr5, 5\n\
        LI vr6, 6\n\
        LI vr7, 7\n\
        ADD vr8, vr0, vr1\n\
        ADD vr8, vr8, vr2\n\
        ADD vr8, vr8, vr3\n\
        ADD vr8, vr8, vr4\n\
        ADD vr8, vr8, vr5\n\
        ADD vr8, vr8, vr6\n\
        ADD vr8, vr8, vr7\n\
        LEAVE\n\
        RET\n"
    }

    // Two function bodies allocated independently of the top level and of
    // each other.
    "subroutines" => {
      "\
        CALL sum\n\
        HLT\n\
        .sub sum\n\
        ADD vr2, vr1, vr0\n\
        RET\n\
        .end\n\
        .sub max\n\
        CMP vr1, vr0\n\
        BGT pick_left\n\
        ADD vr2, vr1, vr1\n\
        RET\n\
        pick_left:\n\
        ADD vr2, vr0, vr0\n\
        RET\n\
        .end\n"
    }

    // A large ENTER pre-reservation pushes spill slots beyond the signed
    // 5-bit load/store offset field.
    "far-offset" => {
      "\
        ENTER 30\n\
        LI vr0, 0\n\
        LI vr1, 1\n\
        LI vr2, 2\n\
        LI vr3, 3\n\
        LI vr4, 4\n\
        LI vr5, 5\n\
        LI vr6, 6\n\
        LI vr7, 7\n\
        ADD vr8, vr7, vr6\n\
        LEAVE\n\
        RET\n"
    }

    _ => return None,
  };
  Some(parser::parse_content(source).expect("built-in test case must parse"))
}
