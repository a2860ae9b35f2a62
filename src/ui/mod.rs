//! Interactive terminal flow.
//!
//! One function per page; every transition between pages goes through
//! `App::navigate` so the guard always has the last word on where the
//! operator actually lands.

pub mod pages;

use std::io::{self, Write};

use anyhow::Result;

pub use pages::run;

/// Print a prompt and read one trimmed line from stdin
fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Read a password without echoing it
fn prompt_password(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(label)?)
}
