// pii-mask/src/ui.rs
//! Styled status messages on stderr. Colors are used only on a terminal.

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use std::fmt::Display;
use std::io;

pub fn error_msg(msg: impl Display) {
    if io::stderr().is_terminal() {
        eprintln!("{} {}", "Error:".red().bold(), msg);
    } else {
        eprintln!("Error: {}", msg);
    }
}

pub fn info_msg(msg: impl Display) {
    if io::stderr().is_terminal() {
        eprintln!("{}", msg.cyan());
    } else {
        eprintln!("{}", msg);
    }
}
