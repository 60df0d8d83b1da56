/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Command-line harness for the regalloc16 library: parse an instruction
//! listing (or pick a built-in test case), run register allocation, and
//! print the allocated listing.

mod parser;
mod test_cases;

use std::path::Path;
use std::process;

use log::{error, info};
use regalloc16::{naive_compile, Driver, Node, TopLevel, NUM_MACHINE_REGISTERS};

fn main() {
  pretty_env_logger::init();

  let matches = clap::Command::new("regalloc16-util")
    .about("run the regalloc16 register allocator on instruction listings")
    .arg(
      clap::Arg::new("num-regs")
        .short('n')
        .long("num-regs")
        .takes_value(true)
        .help("physical register budget (default: the machine register count)"),
    )
    .arg(
      clap::Arg::new("naive")
        .long("naive")
        .help("use the naive per-instruction allocator instead of the driver"),
    )
    .arg(
      clap::Arg::new("test")
        .short('t')
        .long("test")
        .takes_value(true)
        .help("built-in test case name"),
    )
    .arg(clap::Arg::new("input").help("input listing file"))
    .get_matches();

  let num_registers = match matches.value_of("num-regs") {
    None => NUM_MACHINE_REGISTERS as usize,
    Some(text) => match text.parse::<usize>() {
      Ok(n) => n,
      Err(_) => {
        error!("invalid register count `{}'", text);
        process::exit(1);
      }
    },
  };

  let top_level = if let Some(name) = matches.value_of("test") {
    match test_cases::find_test_case(name) {
      Some(top_level) => top_level,
      None => {
        error!(
          "unknown test case `{}'; available: {}",
          name,
          test_cases::TEST_CASE_NAMES.join(", ")
        );
        process::exit(1);
      }
    }
  } else if let Some(path) = matches.value_of("input") {
    match parser::parse_file(Path::new(path)) {
      Ok(top_level) => top_level,
      Err(err) => {
        error!("{}: {}", path, err);
        process::exit(1);
      }
    }
  } else {
    error!("either an input listing file or -t NAME is required");
    process::exit(1);
  };

  let result = if matches.is_present("naive") {
    top_level
      .children
      .iter()
      .map(naive_compile)
      .collect::<Result<Vec<Node>, _>>()
      .map(TopLevel::new)
  } else {
    Driver::new(num_registers).compile(&top_level)
  };

  match result {
    Ok(allocated) => {
      info!(
        "allocated {} nodes with a budget of {} registers",
        allocated.children.len(),
        num_registers
      );
      print!("{}", allocated);
    }
    Err(err) => {
      error!("register allocation failed: {}", err);
      process::exit(1);
    }
  }
}
