//! Interactive prompts for inputs not given as flags.

use anyhow::{bail, Context, Result};
use fwgrab_core::config::HtmlSource;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const HTML_PROMPT: &str =
    "Enter the path to the local HTML file (or press Enter to provide a URL): ";
const URL_PROMPT: &str = "Enter the URL of the HTML file: ";
const DEST_PROMPT: &str =
    "Enter the directory to store firmware files (or press Enter to use the current directory): ";

/// Prints `question`, reads one line, and returns it trimmed.
fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    output.write_all(question.as_bytes())?;
    output.flush()?;
    let mut line = String::new();
    let n = input.read_line(&mut line).context("read from stdin")?;
    if n == 0 {
        bail!("no input (stdin closed) for: {}", question.trim_end());
    }
    Ok(line.trim().to_string())
}

/// Asks for a local HTML path; a blank answer asks for a URL instead.
pub fn prompt_source<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<HtmlSource> {
    let path = ask(input, output, HTML_PROMPT)?;
    if !path.is_empty() {
        return Ok(HtmlSource::LocalFile(PathBuf::from(path)));
    }
    let url = ask(input, output, URL_PROMPT)?;
    if url.is_empty() {
        bail!("no catalog HTML file or URL given");
    }
    Ok(HtmlSource::RemoteUrl(url))
}

/// Asks for the destination root; a blank answer means `cwd`.
pub fn prompt_destination<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    cwd: &Path,
) -> Result<PathBuf> {
    let dir = ask(input, output, DEST_PROMPT)?;
    if dir.is_empty() {
        Ok(cwd.to_path_buf())
    } else {
        Ok(PathBuf::from(dir))
    }
}
