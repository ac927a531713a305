//! Launching the user's editor on a temp-file buffer.

use crate::error::{GhistError, Result};
use std::io::Write;
use std::process::Command;

/// Write `original` to a temp file, run `editor` on it, and read the
/// buffer back. The temp file is removed when the handle drops.
pub fn edit_text(editor: &str, original: &str) -> Result<String> {
    let mut file = tempfile::Builder::new()
        .prefix("ghist-edit-")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(original.as_bytes())?;
    file.flush()?;

    // Editor settings may carry arguments ("code --wait"), so run the
    // whole thing through the shell.
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("{editor} \"$1\""))
        .arg("sh")
        .arg(file.path())
        .status()?;
    if !status.success() {
        return Err(GhistError::Config(format!(
            "editor '{editor}' exited with {status}"
        )));
    }

    // Read back by path: some editors replace the file rather than
    // writing through the original inode.
    let edited = std::fs::read_to_string(file.path())?;
    Ok(edited)
}
