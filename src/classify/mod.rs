//! File classification — magic bytes, text sampling, minified JavaScript.
//!
//! The walker needs three judgements per file: a descriptive content-type
//! string for the filetype rule table, a binary/text decision gating the
//! license scan, and minified-JavaScript signals (by name, and by mean
//! line length after stripping comments and string literals).

pub mod missing_source;

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes sampled from the head of a file for classification.
pub const SAMPLE_LEN: usize = 4096;

// ─── Content Types ──────────────────────────────────────────────────

/// Provider of descriptive content-type strings.
///
/// The bundled [`MagicClassifier`] recognizes the handful of formats the
/// rule tables care about. Implementations backed by file(1) or libmagic
/// can be injected instead; the filetype table matches on substrings like
/// `ELF` and `text`, so labels should stay close to file(1) convention.
pub trait ContentTypeSource: Send + Sync {
    fn content_type(&self, path: &Path) -> String;
}

/// Magic-byte classifier over a leading sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicClassifier;

impl MagicClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a byte sample from the start of a file.
    pub fn classify_sample(&self, sample: &[u8]) -> String {
        if sample.starts_with(&[0x7F, 0x45, 0x4C, 0x46]) {
            return elf_label(sample).to_string();
        }
        if sample.starts_with(b"MZ") {
            return "PE executable (MS Windows)".to_string();
        }
        if sample.starts_with(&[0xCA, 0xFE, 0xBA, 0xBE]) {
            return "compiled Java class data".to_string();
        }
        if sample.starts_with(b"FWS") || sample.starts_with(b"CWS") || sample.starts_with(b"ZWS") {
            return "Macromedia Flash data".to_string();
        }
        if sample.starts_with(b"%PDF") {
            return "PDF document".to_string();
        }
        if sample.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return "PNG image data".to_string();
        }
        if sample.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return "JPEG image data".to_string();
        }
        if sample.starts_with(b"GIF8") {
            return "GIF image data".to_string();
        }
        if sample.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return "Zip archive data".to_string();
        }
        if sample.starts_with(&[0x1F, 0x8B]) {
            return "gzip compressed data".to_string();
        }
        if sample_is_text(sample) {
            if sample.iter().any(|&b| b >= 0x80) {
                return "UTF-8 Unicode text".to_string();
            }
            return "ASCII text".to_string();
        }
        "data".to_string()
    }
}

impl ContentTypeSource for MagicClassifier {
    fn content_type(&self, path: &Path) -> String {
        match read_sample(path) {
            Ok(sample) => self.classify_sample(&sample),
            Err(e) => {
                tracing::warn!("Cannot sample {}: {}", path.display(), e);
                "data".to_string()
            }
        }
    }
}

fn read_sample(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; SAMPLE_LEN];
    let mut filled = 0;
    loop {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == buf.len() {
            break;
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

fn elf_label(sample: &[u8]) -> &'static str {
    // e_type lives at offset 16, byte order given by EI_DATA at offset 5.
    if sample.len() < 18 {
        return "ELF file";
    }
    let e_type = match sample[5] {
        1 => u16::from_le_bytes([sample[16], sample[17]]),
        2 => u16::from_be_bytes([sample[16], sample[17]]),
        _ => return "ELF file",
    };
    match e_type {
        1 => "ELF relocatable object",
        2 => "ELF executable",
        3 => "ELF shared object",
        4 => "ELF core file",
        _ => "ELF file",
    }
}

/// Binary/text decision over a leading sample.
///
/// A NUL byte means binary; otherwise more than 20% control characters
/// outside the usual whitespace and escape set does. High bytes are
/// treated as text so UTF-8 prose passes.
pub fn sample_is_text(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return true;
    }
    let mut weird = 0usize;
    for &b in sample {
        if b == 0 {
            return false;
        }
        let control = (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0B | 0x0C | 0x1B))
            || b == 0x7F;
        if control {
            weird += 1;
        }
    }
    weird * 5 <= sample.len()
}

// ─── Minified JavaScript ────────────────────────────────────────────

pub fn is_javascript(basename: &str) -> bool {
    static JS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.js$").expect("fixed pattern"));
    JS.is_match(basename)
}

/// Comments and string literals, removed before measuring line lengths.
/// String alternatives come first so `//` inside a literal stays inert.
static JS_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|//[^\n]*|/\*.*?\*/"#)
        .expect("fixed pattern")
});

/// Mean line length of a block after dropping comments, string literals,
/// blank lines, and the trailing newline.
///
/// Handwritten source rarely exceeds a few dozen characters per line once
/// literals are gone; generated or minified code easily exceeds 255.
pub fn mean_line_length_after_strip(block: &str) -> f64 {
    let stripped = JS_NOISE.replace_all(block, "");
    let joined: String = stripped
        .lines()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if joined.is_empty() {
        return 0.0;
    }
    let newlines = joined.chars().filter(|&c| c == '\n').count();
    joined.chars().count() as f64 / (newlines + 1) as f64
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_magic_labels() {
        let clf = MagicClassifier::new();
        // 64-bit LSB shared object header prefix
        let mut elf = vec![0x7F, b'E', b'L', b'F', 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        elf.extend_from_slice(&[3, 0]); // e_type = ET_DYN
        assert_eq!(clf.classify_sample(&elf), "ELF shared object");

        elf[16] = 2; // e_type = ET_EXEC
        assert_eq!(clf.classify_sample(&elf), "ELF executable");

        assert_eq!(
            clf.classify_sample(b"MZ\x90\x00rest of the header"),
            "PE executable (MS Windows)"
        );
        assert_eq!(
            clf.classify_sample(&[0xCA, 0xFE, 0xBA, 0xBE, 0, 0]),
            "compiled Java class data"
        );
        assert_eq!(clf.classify_sample(b"CWS\x0aswf"), "Macromedia Flash data");
        assert_eq!(clf.classify_sample(b"plain words here"), "ASCII text");
        assert_eq!(clf.classify_sample("caf\u{e9} latte".as_bytes()), "UTF-8 Unicode text");
        assert_eq!(clf.classify_sample(&[0x00, 0x01, 0x02, 0x03]), "data");
    }

    #[test]
    fn test_content_type_reads_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, [0x7F, b'E', b'L', b'F', 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0])
            .unwrap();
        let clf = MagicClassifier::new();
        assert_eq!(clf.content_type(&path), "ELF relocatable object");
        assert_eq!(clf.content_type(&dir.path().join("absent")), "data");
    }

    #[test]
    fn test_sample_is_text_boundaries() {
        assert!(sample_is_text(b""));
        assert!(sample_is_text(b"hello\tworld\n"));
        assert!(!sample_is_text(b"has a \x00 byte"));
        let noisy: Vec<u8> = (0..100).map(|i| if i % 3 == 0 { 0x01 } else { b'a' }).collect();
        assert!(!sample_is_text(&noisy));
    }

    #[test]
    fn test_is_javascript_by_extension() {
        assert!(is_javascript("app.js"));
        assert!(is_javascript("APP.JS"));
        assert!(!is_javascript("app.json"));
        assert!(!is_javascript("js"));
    }

    #[test]
    fn test_mean_line_length_single_long_line() {
        let line = "x".repeat(2000);
        let mean = mean_line_length_after_strip(&line);
        assert!((mean - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mean_line_length_ignores_comments_and_strings() {
        let long_comment = format!("/* {} */\ncode();\ncall();\n", "y".repeat(5000));
        let mean = mean_line_length_after_strip(&long_comment);
        assert!(mean < 10.0, "comment should not count, got {mean}");

        let long_string = format!("var a = \"{}\";\nb();\n", "z".repeat(5000));
        let mean = mean_line_length_after_strip(&long_string);
        assert!(mean < 15.0, "string literal should not count, got {mean}");

        let slashes_in_string = "var u = \"http://example.org\";\nnext();\n";
        let mean = mean_line_length_after_strip(slashes_in_string);
        assert!(mean > 0.0);
    }

    #[test]
    fn test_mean_line_length_empty_after_strip() {
        assert_eq!(mean_line_length_after_strip("// only a comment\n"), 0.0);
        assert_eq!(mean_line_length_after_strip(""), 0.0);
    }
}
