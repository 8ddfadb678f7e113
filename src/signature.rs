//! Content signing for generated files.
//!
//! Every file the tool generates ends with a two line trailer:
//!
//! ```text
//! <!-- @aipim-signature: <sha256 of the content above, trimmed> -->
//! <!-- @aipm-version: <version of the tool that wrote it> -->
//! ```
//!
//! The trailer lets a later run decide whether a file is still exactly what
//! the tool produced (and may be regenerated) or has been touched by a human
//! (and must be left alone), without keeping any state outside the file.

use crate::util::hashing::content_fingerprint;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

pub const SIGNATURE_PREFIX: &str = "<!-- @aipim-signature:";
pub const VERSION_PREFIX: &str = "<!-- @aipm-version:";

/// Version reported for signed files that carry no version line.
const UNKNOWN_VERSION: &str = "0.0.0";

// Reading accepts both the `aipim` and `aipm` spelling for either marker.
static SIGNATURE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*<!-- @aipi?m-signature:[ \t]*([0-9a-f]{64})[ \t]*-->[ \t]*\r?$")
        .expect("signature pattern is valid")
});

static VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*<!-- @aipi?m-version:[ \t]*([0-9A-Za-z.+-]+)[ \t]*-->[ \t]*\r?$")
        .expect("version pattern is valid")
});

/// A single trailer-shaped line, including malformed ones, so that re-signing
/// replaces a damaged trailer instead of stacking a second one under it.
static ANY_TRAILER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*<!-- @aipi?m-(?:signature|version):.*-->[ \t]*\r?$")
        .expect("trailer pattern is valid")
});

/// Classification of a managed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// Trailer present and its digest matches the content.
    Pristine,
    /// Trailer present but the content no longer matches it.
    Modified,
    /// No usable trailer: written before signing existed, or by hand.
    Legacy,
    /// Nothing on disk.
    Missing,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Pristine => "pristine",
            FileStatus::Modified => "modified",
            FileStatus::Legacy => "legacy",
            FileStatus::Missing => "missing",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The data carried by a trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    /// Hex encoded SHA-256 of the trimmed, trailer-free content.
    pub digest: String,
    /// Version of the tool that produced the file.
    pub version: String,
}

/// Signs `content`, replacing any trailer it already carries.
///
/// The content is stripped of its trailer block and of any other marker
/// lines, trimmed, hashed, and followed by a fresh trailer naming `version`.
/// Signing already signed content therefore never accumulates trailers.
pub fn sign(content: &str, version: &str) -> String {
    // Signed content never carries marker lines.
    let body: String = strip_trailer(content)
        .split_inclusive('\n')
        .filter(|line| !is_marker(line))
        .collect();
    let body = body.trim();
    let digest = content_fingerprint(body);

    let mut signed = String::with_capacity(body.len() + 128);
    if !body.is_empty() {
        signed.push_str(body);
        signed.push('\n');
    }
    signed.push_str(&format!("{SIGNATURE_PREFIX} {digest} -->\n"));
    signed.push_str(&format!("{VERSION_PREFIX} {version} -->\n"));
    signed
}

/// Classifies `content` by its trailer.
///
/// Returns `Legacy` when there is no well-formed signature line, otherwise
/// `Pristine` or `Modified` depending on whether the digest still matches.
/// Never returns `Missing`; existence is the caller's concern.
pub fn verify(content: &str) -> FileStatus {
    let Some(trailer) = extract_trailer(content) else {
        return FileStatus::Legacy;
    };

    if content_fingerprint(&strip_trailer(content)) == trailer.digest {
        FileStatus::Pristine
    } else {
        FileStatus::Modified
    }
}

/// Extracts the trailer, if `content` has a well-formed signature line.
///
/// The trailer starts at the last signature line and runs over the trailer
/// and blank lines that follow it. Only that block is read, so marker lines
/// elsewhere in the body are plain content.
pub fn extract_trailer(content: &str) -> Option<Trailer> {
    let block = locate_trailer(content)?.block;
    let digest = SIGNATURE_LINE.captures(block).map(|caps| caps[1].to_string())?;

    let version = VERSION_LINE
        .captures_iter(block)
        .last()
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string());

    Some(Trailer { digest, version })
}

/// Removes the trailer block from `content` and trims the result.
///
/// Text after the trailer stays part of the body. Without a well-formed
/// signature, trailer-shaped lines at the very end are still dropped.
pub fn strip_trailer(content: &str) -> String {
    match locate_trailer(content) {
        Some(found) if found.rest.trim().is_empty() => found.head.trim().to_string(),
        Some(found) => format!("{}\n{}", found.head.trim_end(), found.rest)
            .trim()
            .to_string(),
        None => strip_trailing_markers(content).trim().to_string(),
    }
}

/// `content` split around its trailer block.
struct TrailerBlock<'a> {
    head: &'a str,
    block: &'a str,
    rest: &'a str,
}

fn locate_trailer(content: &str) -> Option<TrailerBlock<'_>> {
    let start = SIGNATURE_LINE.find_iter(content).last()?.start();

    let mut end = start;
    for line in content[start..].split_inclusive('\n') {
        if !is_blank_or_marker(line) {
            break;
        }
        end += line.len();
    }

    Some(TrailerBlock {
        head: &content[..start],
        block: &content[start..end],
        rest: &content[end..],
    })
}

fn strip_trailing_markers(content: &str) -> &str {
    let mut end = content.len();
    for line in content.split_inclusive('\n').rev() {
        if !is_blank_or_marker(line) {
            break;
        }
        end -= line.len();
    }
    &content[..end]
}

fn is_blank_or_marker(line: &str) -> bool {
    line.trim().is_empty() || is_marker(line)
}

fn is_marker(line: &str) -> bool {
    ANY_TRAILER_LINE.is_match(line.trim_end_matches('\n'))
}
