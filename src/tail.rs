//! Backward, buffered tail reading.
//!
//! The scanner walks a file from its end toward its start in fixed-size
//! chunks, so reading the last few lines of a multi-gigabyte file touches
//! only the bytes near the end (plus one forward pass to number the lines).

use crate::encoding::Encoding;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// One logical line of a file: a 1-based line number plus the line content
/// with trailing newline characters stripped. Returned sequences are always
/// ordered ascending by number, oldest to newest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLine {
    pub number: u64,
    pub content: String,
}

/// Read the last `line_count` lines of the file at `path`.
///
/// Chunks are read backwards from end-of-file in `buffer_size`-byte steps
/// (rounded up to whole code units) and scanned for line feeds; line bytes
/// accumulate until a boundary is found and are only decoded once complete.
pub(crate) fn read_tail(
    path: &Path,
    line_count: usize,
    buffer_size: usize,
    encoding: Encoding,
) -> Result<Vec<FileLine>> {
    if line_count == 0 {
        return Err(Error::invalid_argument("line count must be at least 1"));
    }
    if buffer_size == 0 {
        return Err(Error::invalid_argument("buffer size must be at least 1"));
    }
    if !path.exists() {
        return Err(Error::not_found(path));
    }

    // Plain read-only open: no lock is held, concurrent appenders are fine.
    let mut file = File::open(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            Error::not_found(path)
        } else {
            Error::Io(e)
        }
    })?;
    let len = file.metadata()?.len();

    let unit = encoding.unit_len();
    let data_start = skip_bom(&mut file, len, encoding)?;
    if len == data_start {
        return Ok(Vec::new());
    }
    if (len - data_start) % unit as u64 != 0 {
        return Err(Error::Decode {
            encoding: encoding.name(),
            message: format!(
                "file length {} is not a whole number of {}-byte code units",
                len - data_start,
                unit
            ),
        });
    }

    // Keep every read aligned to whole code units.
    let chunk = buffer_size.div_ceil(unit) * unit;
    let mut buf = vec![0u8; chunk];

    let mut cursor = len;
    // Bytes of the line currently being assembled, in reverse order.
    let mut pending_rev: Vec<u8> = Vec::new();
    // Completed lines, newest first.
    let mut completed: Vec<String> = Vec::new();

    'scan: while cursor > data_start && completed.len() < line_count {
        let take = ((cursor - data_start) as usize).min(chunk);
        cursor -= take as u64;
        file.seek(SeekFrom::Start(cursor))?;
        file.read_exact(&mut buf[..take])?;

        for unit_bytes in buf[..take].chunks_exact(unit).rev() {
            if encoding.is_line_feed(unit_bytes) {
                if !pending_rev.is_empty() {
                    completed.push(commit_line(&mut pending_rev, encoding)?);
                    if completed.len() == line_count {
                        break 'scan;
                    }
                }
            } else {
                pending_rev.extend(unit_bytes.iter().rev());
            }
        }
    }

    // Leftover fragment at start-of-file (or where the scan stopped) is the
    // oldest returned line, unless it is empty.
    if !pending_rev.is_empty() && completed.len() < line_count {
        completed.push(commit_line(&mut pending_rev, encoding)?);
    }

    completed.reverse();
    if completed.is_empty() {
        return Ok(Vec::new());
    }

    let total = count_lines(&mut file, data_start, len, chunk, encoding)?;
    let start = (total + 1).saturating_sub(completed.len() as u64).max(1);

    tracing::debug!(
        path = %path.display(),
        requested = line_count,
        returned = completed.len(),
        total,
        "tail read complete"
    );

    Ok(completed
        .into_iter()
        .enumerate()
        .map(|(i, content)| FileLine {
            number: start + i as u64,
            content,
        })
        .collect())
}

/// Restore the accumulated bytes to file order, drop one trailing carriage
/// return if present, and decode the line.
fn commit_line(pending_rev: &mut Vec<u8>, encoding: Encoding) -> Result<String> {
    pending_rev.reverse();
    let unit = encoding.unit_len();
    if pending_rev.len() >= unit
        && encoding.is_carriage_return(&pending_rev[pending_rev.len() - unit..])
    {
        pending_rev.truncate(pending_rev.len() - unit);
    }
    let line = encoding.decode(pending_rev)?;
    pending_rev.clear();
    Ok(line)
}

/// Count logical lines with one forward pass over `[data_start, len)`.
///
/// A line is a maximal non-empty run of code units between line feeds, the
/// same rule the backward scanner uses to commit, so numbering derived from
/// this count matches the returned tail.
fn count_lines(
    file: &mut File,
    data_start: u64,
    len: u64,
    chunk: usize,
    encoding: Encoding,
) -> Result<u64> {
    file.seek(SeekFrom::Start(data_start))?;
    let unit = encoding.unit_len();
    let mut buf = vec![0u8; chunk];
    // Bound the scan at the length captured before the backward pass, so a
    // concurrent appender cannot skew the numbering.
    let mut remaining = (len - data_start) as usize;
    let mut count = 0u64;
    let mut segment_units = 0u64;

    while remaining > 0 {
        let take = remaining.min(chunk);
        file.read_exact(&mut buf[..take])?;
        remaining -= take;

        for unit_bytes in buf[..take].chunks_exact(unit) {
            if encoding.is_line_feed(unit_bytes) {
                if segment_units > 0 {
                    count += 1;
                }
                segment_units = 0;
            } else {
                segment_units += 1;
            }
        }
    }
    if segment_units > 0 {
        count += 1;
    }
    Ok(count)
}

/// Returns the offset where decodable content starts: past the byte order
/// mark when the configured encoding defines one and the file carries it.
fn skip_bom(file: &mut File, len: u64, encoding: Encoding) -> Result<u64> {
    let bom = encoding.bom();
    if bom.is_empty() || len < bom.len() as u64 {
        return Ok(0);
    }
    let mut head = vec![0u8; bom.len()];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut head)?;
    Ok(if head == bom { bom.len() as u64 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TempLogFile;

    fn contents(lines: &[FileLine]) -> Vec<&str> {
        lines.iter().map(|l| l.content.as_str()).collect()
    }

    fn numbers(lines: &[FileLine]) -> Vec<u64> {
        lines.iter().map(|l| l.number).collect()
    }

    #[test]
    fn test_last_five_of_one_hundred() {
        let body: String = (1..=100).map(|i| format!("Line {i}\n")).collect();
        let fixture = TempLogFile::with_bytes(body.as_bytes()).unwrap();

        let lines = read_tail(fixture.path(), 5, 4096, Encoding::Utf8).unwrap();

        assert_eq!(numbers(&lines), vec![96, 97, 98, 99, 100]);
        assert_eq!(
            contents(&lines),
            vec!["Line 96", "Line 97", "Line 98", "Line 99", "Line 100"]
        );
    }

    #[test]
    fn test_empty_file_returns_empty() {
        let fixture = TempLogFile::new().unwrap();
        let lines = read_tail(fixture.path(), 10, 4096, Encoding::Utf8).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_no_trailing_newline_is_newest_line() {
        let fixture = TempLogFile::with_bytes(b"only line").unwrap();
        let lines = read_tail(fixture.path(), 10, 4096, Encoding::Utf8).unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[0].content, "only line");
    }

    #[test]
    fn test_requesting_more_lines_than_exist() {
        let body: String = (1..=10).map(|i| format!("row {i}\n")).collect();
        let fixture = TempLogFile::with_bytes(body.as_bytes()).unwrap();

        let lines = read_tail(fixture.path(), 20, 4096, Encoding::Utf8).unwrap();

        assert_eq!(lines.len(), 10);
        assert_eq!(numbers(&lines), (1..=10).collect::<Vec<u64>>());
        assert_eq!(lines[0].content, "row 1");
        assert_eq!(lines[9].content, "row 10");
    }

    #[test]
    fn test_buffer_size_independence() {
        let body: String = (1..=50).map(|i| format!("entry number {i}\n")).collect();
        let fixture = TempLogFile::with_bytes(body.as_bytes()).unwrap();

        let baseline = read_tail(fixture.path(), 7, 4096, Encoding::Utf8).unwrap();
        for buffer_size in [1, 16, 64] {
            let lines = read_tail(fixture.path(), 7, buffer_size, Encoding::Utf8).unwrap();
            assert_eq!(lines, baseline, "buffer_size={buffer_size}");
        }
    }

    #[test]
    fn test_repeated_reads_are_identical() {
        let fixture = TempLogFile::with_bytes(b"alpha\nbeta\ngamma\n").unwrap();
        let first = read_tail(fixture.path(), 2, 8, Encoding::Utf8).unwrap();
        let second = read_tail(fixture.path(), 2, 8, Encoding::Utf8).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_crlf_content_has_no_carriage_returns() {
        let fixture = TempLogFile::with_bytes(b"first\r\nsecond\r\nthird\r\n").unwrap();
        let lines = read_tail(fixture.path(), 2, 4096, Encoding::Utf8).unwrap();

        assert_eq!(contents(&lines), vec!["second", "third"]);
        assert_eq!(numbers(&lines), vec![2, 3]);
    }

    #[test]
    fn test_empty_interior_lines_are_not_lines() {
        let fixture = TempLogFile::with_bytes(b"a\n\n\nb\nc\n").unwrap();
        let lines = read_tail(fixture.path(), 10, 4096, Encoding::Utf8).unwrap();

        assert_eq!(contents(&lines), vec!["a", "b", "c"]);
        assert_eq!(numbers(&lines), vec![1, 2, 3]);
    }

    #[test]
    fn test_numbering_when_tail_is_partial() {
        let fixture = TempLogFile::with_bytes(b"a\n\nb\nc\nd\n").unwrap();
        let lines = read_tail(fixture.path(), 2, 4096, Encoding::Utf8).unwrap();

        // Four logical lines total; the last two are numbered 3 and 4.
        assert_eq!(contents(&lines), vec!["c", "d"]);
        assert_eq!(numbers(&lines), vec![3, 4]);
    }

    #[test]
    fn test_multibyte_characters_across_chunk_boundaries() {
        let body = "première ligne\n日本語のテキスト\n🦀 crab line\n";
        let fixture = TempLogFile::with_bytes(body.as_bytes()).unwrap();

        // A 1-byte buffer forces every multi-byte character to straddle reads.
        let lines = read_tail(fixture.path(), 3, 1, Encoding::Utf8).unwrap();
        assert_eq!(
            contents(&lines),
            vec!["première ligne", "日本語のテキスト", "🦀 crab line"]
        );
    }

    #[test]
    fn test_utf16_with_bom_and_tiny_buffer() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "alpha\nbeta\ngamma\n".encode_utf16() {
            bytes.extend(unit.to_le_bytes());
        }
        let fixture = TempLogFile::with_bytes(&bytes).unwrap();

        for buffer_size in [1, 3, 4096] {
            let lines = read_tail(fixture.path(), 2, buffer_size, Encoding::Utf16).unwrap();
            assert_eq!(contents(&lines), vec!["beta", "gamma"], "buffer_size={buffer_size}");
            assert_eq!(numbers(&lines), vec![2, 3]);
        }
    }

    #[test]
    fn test_utf32_round_trip() {
        let mut bytes = Vec::new();
        for c in "one\ntwo→\n".chars() {
            bytes.extend((c as u32).to_le_bytes());
        }
        let fixture = TempLogFile::with_bytes(&bytes).unwrap();

        let lines = read_tail(fixture.path(), 5, 8, Encoding::Utf32).unwrap();
        assert_eq!(contents(&lines), vec!["one", "two→"]);
    }

    #[test]
    fn test_utf16_misaligned_length_is_decode_error() {
        let fixture = TempLogFile::with_bytes(&[0x61, 0x00, 0x62]).unwrap();
        let result = read_tail(fixture.path(), 1, 4096, Encoding::Utf16);
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn test_ascii_rejects_non_ascii_bytes() {
        let fixture = TempLogFile::with_bytes("caf\u{e9}\n".as_bytes()).unwrap();
        let result = read_tail(fixture.path(), 1, 4096, Encoding::Ascii);
        assert!(matches!(result, Err(Error::Decode { encoding: "ascii", .. })));
    }

    #[test]
    fn test_zero_line_count_is_invalid() {
        let fixture = TempLogFile::with_bytes(b"x\n").unwrap();
        let result = read_tail(fixture.path(), 0, 4096, Encoding::Utf8);
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_zero_buffer_size_is_invalid() {
        let fixture = TempLogFile::with_bytes(b"x\n").unwrap();
        let result = read_tail(fixture.path(), 1, 0, Encoding::Utf8);
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = read_tail(
            Path::new("definitely/not/here.log"),
            1,
            4096,
            Encoding::Utf8,
        );
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_file_of_only_newlines_has_no_lines() {
        let fixture = TempLogFile::with_bytes(b"\n\n\n").unwrap();
        let lines = read_tail(fixture.path(), 5, 4096, Encoding::Utf8).unwrap();
        assert!(lines.is_empty());
    }
}
