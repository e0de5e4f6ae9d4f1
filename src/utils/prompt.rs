// file: src/utils/prompt.rs
// description: yes/no confirmation before destructive index operations

use crate::error::Result;
use std::io::{BufRead, Write};

/// Ask `question` and read one line. Only `y` or `yes` (any case) confirm.
pub fn confirm<R: BufRead, W: Write>(question: &str, mut reader: R, mut writer: W) -> Result<bool> {
    write!(writer, "{} [y/N] ", question)?;
    writer.flush()?;

    let mut answer = String::new();
    reader.read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
