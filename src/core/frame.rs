//! Text framing helpers for git's line-oriented output
//!
//! git output may or may not end with a newline depending on the command and
//! the format string, so every splitter here treats a missing trailing
//! delimiter the same as a present one.

/// Split a stream into newline-separated records.
///
/// A trailing newline does not produce an extra empty record, and `\r\n`
/// endings are accepted.
pub fn lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// Split a stream into blank-line-separated blocks.
///
/// Each returned block keeps its inner newlines but has no trailing newline.
/// Runs of blank lines never yield empty blocks.
pub fn blocks(text: &str) -> Vec<&str> {
    text.trim_end_matches(|c: char| c == '\n' || c == '\r')
        .split("\n\n")
        .map(|block| block.trim_start_matches('\n'))
        .filter(|block| !block.is_empty())
        .collect()
}

/// First line of a block, if the block has any content.
pub fn header(block: &str) -> Option<&str> {
    block.lines().next().filter(|line| !line.is_empty())
}

/// Whitespace-separated fields of a record.
pub fn fields(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Split a record once on `sep`, returning the untrimmed halves.
pub fn split_pair(line: &str, sep: char) -> Option<(&str, &str)> {
    line.split_once(sep)
}

/// Parse a `key = value` assignment, trimming both sides.
pub fn key_value(line: &str) -> Option<(&str, &str)> {
    split_pair(line, '=').map(|(k, v)| (k.trim(), v.trim()))
}
