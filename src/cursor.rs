//! Everything related to incrementally reading lines from a single file.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Identity token for a file, stable across renames.
///
/// On Unix this is the device/inode pair, so a rotation that replaces the
/// file behind a path is visible even when the replacement is larger than
/// the original. On other platforms no token is available and rotation
/// detection degrades to truncation-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;

        Some(FileIdentity {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn from_metadata(_metadata: &std::fs::Metadata) -> Option<Self> {
        None
    }
}

/// Per-file tail state: the next unread byte offset, the identity token
/// observed last, and the unterminated tail of the previous read.
///
/// A cursor is the only reader of its file; `drain` both reads and
/// advances the state. Rotation (identity change) and truncation
/// (size shrink below the offset) reset the cursor to offset zero, and the
/// replacement content is drained from the start in the same call.
#[derive(Debug)]
pub struct TailCursor {
    path: PathBuf,
    offset: u64,
    identity: Option<FileIdentity>,
    fragment: Vec<u8>,
    /// Last drained chunk ended in a bare `\r`; a `\n` opening the next
    /// chunk belongs to that terminator and must not emit an empty line.
    split_crlf: bool,
}

impl TailCursor {
    /// Cursor for a file that appeared during a run: starts at offset 0 so
    /// its whole content is treated as new.
    pub fn from_start(path: impl Into<PathBuf>) -> Self {
        TailCursor {
            path: path.into(),
            offset: 0,
            identity: None,
            fragment: Vec::new(),
            split_crlf: false,
        }
    }

    /// Cursor for a file present at startup: starts at the current size so
    /// pre-existing content is not replayed.
    ///
    /// If the file cannot be observed the cursor falls back to offset 0;
    /// the next scan reconciles it away if the file is really gone.
    pub async fn at_end(path: impl Into<PathBuf>) -> Self {
        let mut cursor = Self::from_start(path);

        if let Ok(metadata) = tokio::fs::metadata(&cursor.path).await {
            cursor.offset = metadata.len();
            cursor.identity = FileIdentity::from_metadata(&metadata);
        }

        cursor
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.fragment.clear();
        self.split_crlf = false;
    }

    /// Reads everything appended since the last drain and returns the
    /// complete lines found, in byte order.
    ///
    /// Terminators `\r\n`, `\n` and `\r` are equivalent. A trailing
    /// unterminated remainder is carried to the next drain. Stat or read
    /// failures (the file vanished between scan and drain, permissions)
    /// yield no lines and leave the cursor as it was.
    pub async fn drain(&mut self) -> Vec<String> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "stat failed, skipping drain");
                return Vec::new();
            }
        };

        let size = metadata.len();
        match (self.identity, FileIdentity::from_metadata(&metadata)) {
            // First observation establishes the baseline.
            (None, observed) => self.identity = observed,
            (Some(known), Some(observed)) if known != observed => {
                self.identity = Some(observed);
                self.reset();
            }
            _ => {}
        }
        if size < self.offset {
            self.reset();
        }

        if size <= self.offset {
            return Vec::new();
        }

        let chunk = match self.read_chunk(size - self.offset).await {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "read failed, skipping drain");
                return Vec::new();
            }
        };
        if chunk.is_empty() {
            return Vec::new();
        }
        self.offset += chunk.len() as u64;

        let mut data = std::mem::take(&mut self.fragment);
        let skip_leading_newline = self.split_crlf && data.is_empty();
        data.extend_from_slice(&chunk);
        let bytes = if skip_leading_newline && data.first() == Some(&b'\n') {
            &data[1..]
        } else {
            &data[..]
        };

        let (lines, remainder, ends_in_cr) = split_lines(bytes);
        self.fragment = remainder;
        self.split_crlf = ends_in_cr;

        lines
    }

    /// Reads up to `want` bytes starting at the current offset. A short
    /// read returns the bytes actually obtained.
    async fn read_chunk(&self, want: u64) -> io::Result<Vec<u8>> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;

        let want = want as usize;
        let mut buf = vec![0u8; want];
        let mut filled = 0;

        while filled < want {
            match file.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) => {
                    if filled == 0 {
                        return Err(err);
                    }
                    break;
                }
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}

/// Splits a chunk into terminator-delimited lines.
///
/// Returns the complete lines, the unterminated remainder, and whether the
/// chunk ended in a bare `\r` (whose `\n` may arrive in the next chunk).
/// Decoding to text is lossy UTF-8 per line; splitting only happens on
/// single-byte terminators, so a multi-byte scalar inside a line is never
/// cut.
fn split_lines(data: &[u8]) -> (Vec<String>, Vec<u8>, bool) {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut ends_in_cr = false;

    while i < data.len() {
        match data[i] {
            b'\n' => {
                lines.push(decode(&data[start..i]));
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(decode(&data[start..i]));
                if data.get(i + 1) == Some(&b'\n') {
                    i += 2;
                } else {
                    ends_in_cr = i + 1 == data.len();
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }

    (lines, data[start..].to_vec(), ends_in_cr)
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Reads the whole file and returns up to its last `count` lines,
/// including a trailing unterminated one.
///
/// Used for the startup initial-lines feature only; it does not touch any
/// cursor bookkeeping.
pub async fn tail_last_lines(path: &Path, count: usize) -> io::Result<Vec<String>> {
    let data = tokio::fs::read(path).await?;
    let (mut lines, remainder, _) = split_lines(&data);
    if !remainder.is_empty() {
        lines.push(decode(&remainder));
    }

    let start = lines.len().saturating_sub(count);
    Ok(lines.split_off(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    fn append(path: &Path, bytes: &[u8]) {
        let mut file = fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(bytes).unwrap();
    }

    #[test]
    fn split_lines_handles_all_terminators() {
        let (lines, rest, ends_in_cr) = split_lines(b"a\nb\r\nc\rtail");
        assert_eq!(lines, vec!["a", "b", "c"]);
        assert_eq!(rest, b"tail");
        assert!(!ends_in_cr);
    }

    #[test]
    fn split_lines_flags_trailing_carriage_return() {
        let (lines, rest, ends_in_cr) = split_lines(b"a\r");
        assert_eq!(lines, vec!["a"]);
        assert!(rest.is_empty());
        assert!(ends_in_cr);
    }

    #[tokio::test]
    async fn drains_appended_lines_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "old\n").unwrap();

        let mut cursor = TailCursor::at_end(&path).await;
        assert!(cursor.drain().await.is_empty());

        append(&path, b"one\ntwo\n");
        assert_eq!(cursor.drain().await, vec!["one", "two"]);
        assert!(cursor.drain().await.is_empty());
    }

    #[tokio::test]
    async fn fragment_completes_on_later_terminator() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "").unwrap();

        let mut cursor = TailCursor::from_start(&path);

        append(&path, b"partial");
        assert!(cursor.drain().await.is_empty());

        append(&path, b" line\n");
        assert_eq!(cursor.drain().await, vec!["partial line"]);
    }

    #[tokio::test]
    async fn crlf_split_across_drains_emits_one_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "").unwrap();

        let mut cursor = TailCursor::from_start(&path);

        append(&path, b"windows\r");
        assert_eq!(cursor.drain().await, vec!["windows"]);

        append(&path, b"\nnext\n");
        assert_eq!(cursor.drain().await, vec!["next"]);
    }

    #[tokio::test]
    async fn truncation_resets_and_reads_new_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "a very long stale line\n").unwrap();

        let mut cursor = TailCursor::at_end(&path).await;

        fs::write(&path, "fresh\n").unwrap();
        assert_eq!(cursor.drain().await, vec!["fresh"]);
        assert_eq!(cursor.offset(), 6);
    }

    #[tokio::test]
    async fn rotation_discards_buffered_fragment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "").unwrap();

        let mut cursor = TailCursor::from_start(&path);
        append(&path, b"half a li");
        assert!(cursor.drain().await.is_empty());

        // Replace the file behind the path: same name, new identity. The
        // replacement is larger than the offset so only the identity token
        // can catch this.
        fs::rename(&path, dir.path().join("a.log.1")).unwrap();
        fs::write(&path, "replacement content line\n").unwrap();

        assert_eq!(cursor.drain().await, vec!["replacement content line"]);
    }

    #[tokio::test]
    async fn vanished_file_yields_nothing_and_keeps_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "one\n").unwrap();

        let mut cursor = TailCursor::at_end(&path).await;
        let offset = cursor.offset();

        fs::remove_file(&path).unwrap();
        assert!(cursor.drain().await.is_empty());
        assert_eq!(cursor.offset(), offset);
    }

    #[tokio::test]
    async fn multibyte_sequence_survives_partial_line_carry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "").unwrap();

        let mut cursor = TailCursor::from_start(&path);

        // First half of a two-byte UTF-8 scalar, no terminator yet.
        append(&path, &[0xC3]);
        assert!(cursor.drain().await.is_empty());

        append(&path, &[0xA9, b'\n']);
        assert_eq!(cursor.drain().await, vec!["é"]);
    }

    #[tokio::test]
    async fn tail_last_lines_returns_trailing_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "one\ntwo\nthree\nfour\n").unwrap();

        let lines = tail_last_lines(&path, 2).await.unwrap();
        assert_eq!(lines, vec!["three", "four"]);

        let all = tail_last_lines(&path, 10).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn tail_last_lines_includes_unterminated_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "one\npartial").unwrap();

        let lines = tail_last_lines(&path, 2).await.unwrap();
        assert_eq!(lines, vec!["one", "partial"]);
    }
}
