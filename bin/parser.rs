//! Parser for assembly-style instruction listings, so the allocator can be
//! exercised from the command line.  The format is line oriented:
//!
//! ```text
//! # comment
//! main:
//!         ENTER
//!         LI vr0, 0
//!         CMP vr1, vr0
//! .sub leaf
//!         RET
//! .end
//! ```
//!
//! Register-shaped identifiers (`vrN`, `rN`, `ra`, `sp`, `fp`) always parse
//! as registers; any other identifier operand is a label reference.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use regalloc16::{
  Inst, LabelDecl, Node, Opcode, Operand, Reg, Subroutine, TopLevel,
};

#[derive(Debug)]
pub enum ParseError {
  IoError(io::Error),
  Parse { line: usize, message: String },
}

impl From<io::Error> for ParseError {
  fn from(err: io::Error) -> ParseError {
    ParseError::IoError(err)
  }
}

impl fmt::Display for ParseError {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    match self {
      ParseError::IoError(err) => write!(fmt, "{}", err),
      ParseError::Parse { line, message } => {
        write!(fmt, "line {}: {}", line, message)
      }
    }
  }
}

pub type ParseResult<T> = Result<T, ParseError>;

pub fn parse_file(path: &Path) -> ParseResult<TopLevel> {
  let content = fs::read_to_string(path)?;
  parse_content(&content)
}

pub fn parse_content(source: &str) -> ParseResult<TopLevel> {
  let mut top: Vec<Node> = Vec::new();
  // Stack of open `.sub` bodies; instructions land in the innermost one.
  let mut subs: Vec<(String, Vec<Node>)> = Vec::new();

  for (ix, raw) in source.lines().enumerate() {
    let lineno = ix + 1;
    let line = match raw.find('#') {
      Some(pos) => &raw[..pos],
      None => raw,
    };
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    if line == ".end" {
      match subs.pop() {
        Some((name, children)) => {
          let node = Node::Subroutine(Subroutine::new(name, children));
          current(&mut top, &mut subs).push(node);
        }
        None => {
          return parse_err(lineno, "'.end' without a matching '.sub'");
        }
      }
      continue;
    }

    if line == ".sub" || line.starts_with(".sub ") || line.starts_with(".sub\t")
    {
      let name = line[".sub".len()..].trim();
      if name.is_empty() || !is_identifier(name) {
        return parse_err(lineno, "'.sub' requires a subroutine name");
      }
      subs.push((name.to_string(), Vec::new()));
      continue;
    }

    if line.starts_with('.') {
      return Err(ParseError::Parse {
        line: lineno,
        message: format!("unknown directive `{}'", line),
      });
    }

    if let Some(name) = line.strip_suffix(':') {
      if !is_identifier(name) {
        return parse_err(lineno, "malformed label declaration");
      }
      current(&mut top, &mut subs).push(Node::Label(LabelDecl::new(name)));
      continue;
    }

    let inst = parse_inst(lineno, line)?;
    current(&mut top, &mut subs).push(Node::Inst(inst));
  }

  if let Some((name, _)) = subs.last() {
    return Err(ParseError::Parse {
      line: source.lines().count(),
      message: format!("'.sub {}' is never closed by '.end'", name),
    });
  }
  Ok(TopLevel::new(top))
}

fn current<'a>(
  top: &'a mut Vec<Node>, subs: &'a mut Vec<(String, Vec<Node>)>,
) -> &'a mut Vec<Node> {
  match subs.last_mut() {
    Some((_, children)) => children,
    None => top,
  }
}

fn parse_inst(lineno: usize, line: &str) -> ParseResult<Inst> {
  let (mnemonic, rest) = match line.find(char::is_whitespace) {
    Some(pos) => (&line[..pos], line[pos..].trim()),
    None => (line, ""),
  };
  let op = Opcode::from_mnemonic(mnemonic);
  let mut params = Vec::new();
  if !rest.is_empty() {
    for field in rest.split(',') {
      params.push(parse_operand(lineno, field.trim())?);
    }
  }
  Ok(Inst::new(op, params))
}

fn parse_operand(lineno: usize, field: &str) -> ParseResult<Operand> {
  if field.is_empty() {
    return parse_err(lineno, "empty operand");
  }
  if let Ok(reg) = field.parse::<Reg>() {
    return Ok(Operand::Reg(reg));
  }
  let first = field.chars().next().unwrap();
  if first == '-' || first.is_ascii_digit() {
    return match parse_number(field) {
      Some(value) => Ok(Operand::Imm(value)),
      None => Err(ParseError::Parse {
        line: lineno,
        message: format!("malformed number `{}'", field),
      }),
    };
  }
  if is_identifier(field) {
    return Ok(Operand::Label(field.to_string()));
  }
  Err(ParseError::Parse {
    line: lineno,
    message: format!("malformed operand `{}'", field),
  })
}

fn parse_number(field: &str) -> Option<i32> {
  let (sign, magnitude) = match field.strip_prefix('-') {
    Some(rest) => (-1i64, rest),
    None => (1i64, field),
  };
  let value = if let Some(hex) = magnitude.strip_prefix("0x") {
    i64::from_str_radix(hex, 16).ok()?
  } else {
    magnitude.parse::<i64>().ok()?
  };
  let value = sign * value;
  if value < i32::MIN as i64 || value > i32::MAX as i64 {
    return None;
  }
  Some(value as i32)
}

fn is_identifier(s: &str) -> bool {
  !s.is_empty()
    && s.chars().next().map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
    && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_err<T>(line: usize, message: &str) -> ParseResult<T> {
  Err(ParseError::Parse { line, message: message.to_string() })
}

//=============================================================================
// Tests

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_instructions_labels_and_subroutines() {
    let source = "\
# leading comment
main:
        ENTER 2
        LI vr0, 0x10
        CMP vr1, vr0   # trailing comment
.sub leaf
        LA vr0, main
        RET
.end
";
    let top = parse_content(source).unwrap();
    assert_eq!(top.children.len(), 5);
    assert_eq!(top.children[0], Node::Label(LabelDecl::new("main")));
    assert_eq!(
      top.children[1],
      Node::Inst(Inst::new(Opcode::Enter, vec![Operand::Imm(2)]))
    );
    assert_eq!(
      top.children[2],
      Node::Inst(Inst::new(
        Opcode::Li,
        vec![Operand::Reg(Reg::Virtual(0)), Operand::Imm(16)]
      ))
    );
    match &top.children[4] {
      Node::Subroutine(sub) => {
        assert_eq!(sub.name, "leaf");
        assert_eq!(
          sub.children[0],
          Node::Inst(Inst::new(
            Opcode::La,
            vec![
              Operand::Reg(Reg::Virtual(0)),
              Operand::Label("main".to_string()),
            ]
          ))
        );
        assert_eq!(sub.children[1], Node::Inst(Inst::nullary(Opcode::Ret)));
      }
      other => panic!("expected subroutine, got {:?}", other),
    }
  }

  #[test]
  fn negative_and_hex_immediates() {
    let top = parse_content("LOAD vr0, fp, -16\nLI vr1, 0xff\n").unwrap();
    assert_eq!(
      top.children[0],
      Node::Inst(Inst::new(
        Opcode::Load,
        vec![
          Operand::Reg(Reg::Virtual(0)),
          Operand::Reg(Reg::FramePointer),
          Operand::Imm(-16),
        ]
      ))
    );
    assert_eq!(
      top.children[1],
      Node::Inst(Inst::new(
        Opcode::Li,
        vec![Operand::Reg(Reg::Virtual(1)), Operand::Imm(255)]
      ))
    );
  }

  #[test]
  fn display_output_reparses_to_the_same_stream() {
    let source = "\
start:
        ENTER
        LI vr0, 1
        ADD vr1, vr0, sp
.sub helper
        JALR ra, vr0
        RET
.end
        JMP start
";
    let top = parse_content(source).unwrap();
    let round_trip = parse_content(&top.to_string()).unwrap();
    assert_eq!(top, round_trip);
  }

  #[test]
  fn unterminated_sub_is_an_error() {
    assert!(parse_content(".sub broken\nRET\n").is_err());
  }

  #[test]
  fn stray_end_is_an_error() {
    assert!(parse_content("RET\n.end\n").is_err());
  }

  #[test]
  fn unknown_mnemonic_parses_as_raw() {
    let top = parse_content("SYSCALL 3\n").unwrap();
    assert_eq!(
      top.children[0],
      Node::Inst(Inst::new(
        Opcode::Raw("SYSCALL".to_string()),
        vec![Operand::Imm(3)]
      ))
    );
  }
}
