//! Line-oriented JSON I/O for `init` and `exec`

use std::io::{BufRead, Write};

use serde_json::{json, Value};

use super::errors::CliResult;

/// Read request lines from `reader`, skipping blank lines
pub fn read_lines<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<String>> {
    reader
        .lines()
        .filter(|line| !matches!(line, Ok(text) if text.trim().is_empty()))
        .map(|line| line.map_err(Into::into))
}

/// Write `{"status":"ok","data":...}` as one line
pub fn write_response<W: Write>(writer: &mut W, data: Value) -> CliResult<()> {
    let line = json!({ "status": "ok", "data": data }).to_string();
    write_line(writer, &line)
}

/// Write a pre-encoded JSON line to `writer`
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> CliResult<()> {
    writeln!(writer, "{}", line)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_lines_skips_blank() {
        let input = Cursor::new("a\n\n  \nb\n");
        let lines: Vec<String> = read_lines(input).map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_write_line() {
        let mut out = Vec::new();
        write_line(&mut out, r#"{"status":"ok"}"#).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"status\":\"ok\"}\n");
    }

    #[test]
    fn test_write_response_wraps_data() {
        let mut out = Vec::new();
        write_response(&mut out, json!({"created": true})).unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["data"]["created"], true);
    }
}
