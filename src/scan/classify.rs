//! Language classification of individual files.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::language::Language;

/// How much of a file is read to sniff its language.
const SNIFF_LEN: usize = 4 * 1024;

/// Constructs that only appear in C++ headers.
static CPP_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:class\s+\w+|namespace\b|template\s*<|(?:public|private|protected)\s*:)|std::|\busing\s+namespace\b",
    )
    .unwrap()
});

/// Classify a file from its name and, where the name is ambiguous, its
/// leading content.
///
/// `head` is called at most once, and only for `.h` headers or files
/// without an extension.
pub fn classify(path: &Path, head: impl FnOnce() -> Option<Vec<u8>>) -> Language {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("h") => match head() {
            Some(bytes) => sniff_header(&bytes),
            None => Language::C,
        },
        Some(ext) => Language::from_extension(ext).unwrap_or(Language::Unknown),
        None => head()
            .and_then(|bytes| sniff_shebang(&bytes))
            .unwrap_or(Language::Unknown),
    }
}

/// Read the first bytes of a file for sniffing.
pub fn read_head(path: &Path) -> Option<Vec<u8>> {
    use std::io::Read;

    let file = std::fs::File::open(path).ok()?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head).ok()?;
    Some(head)
}

/// `.h` is C unless it uses C++-only constructs.
pub fn sniff_header(bytes: &[u8]) -> Language {
    let text = String::from_utf8_lossy(&bytes[..bytes.len().min(SNIFF_LEN)]);
    if CPP_MARKERS.is_match(&text) {
        Language::Cpp
    } else {
        Language::C
    }
}

/// Language named by a `#!` line, if any.
pub fn sniff_shebang(bytes: &[u8]) -> Option<Language> {
    let first_line = bytes.split(|&b| b == b'\n').next()?;
    let line = std::str::from_utf8(first_line).ok()?.trim();
    let command = line.strip_prefix("#!")?;

    // `#!/usr/bin/env python3` names the interpreter after `env`.
    let mut words = command.split_whitespace();
    let mut program = words.next()?.rsplit('/').next()?;
    if program == "env" {
        program = words.find(|w| !w.starts_with('-'))?;
    }

    let name = program.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
    match name {
        "python" => Some(Language::Python),
        "node" | "nodejs" => Some(Language::JavaScript),
        "sh" | "bash" | "zsh" | "dash" | "ksh" => Some(Language::Shell),
        "ruby" => Some(Language::Ruby),
        "php" => Some(Language::Php),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_head() -> Option<Vec<u8>> {
        None
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify(Path::new("src/main.rs"), no_head), Language::Rust);
        assert_eq!(classify(Path::new("web/App.TSX"), no_head), Language::TypeScript);
        assert_eq!(classify(Path::new("lib/x.hpp"), no_head), Language::Cpp);
        assert_eq!(classify(Path::new("notes.unknownlang"), no_head), Language::Unknown);
    }

    #[test]
    fn test_header_sniffing() {
        let c = b"#ifndef BUF_H\n#define BUF_H\nstruct buffer { int len; };\n#endif\n";
        let cpp = b"#pragma once\nnamespace net {\nclass Socket {\npublic:\n  void close();\n};\n}\n";
        assert_eq!(classify(Path::new("buf.h"), || Some(c.to_vec())), Language::C);
        assert_eq!(classify(Path::new("socket.h"), || Some(cpp.to_vec())), Language::Cpp);
        assert_eq!(sniff_header(b"#include <vector>\nstd::vector<int> v;\n"), Language::Cpp);
        assert_eq!(classify(Path::new("missing.h"), no_head), Language::C);
    }

    #[test]
    fn test_shebang_sniffing() {
        assert_eq!(sniff_shebang(b"#!/usr/bin/env python3\nprint(1)\n"), Some(Language::Python));
        assert_eq!(sniff_shebang(b"#!/bin/bash\necho hi\n"), Some(Language::Shell));
        assert_eq!(sniff_shebang(b"#!/usr/bin/env -S node --harmony\n"), Some(Language::JavaScript));
        assert_eq!(sniff_shebang(b"echo hi\n"), None);
        assert_eq!(
            classify(Path::new("bin/tool"), || Some(b"#!/usr/bin/python\n".to_vec())),
            Language::Python
        );
        assert_eq!(classify(Path::new("LICENSE"), || Some(b"MIT".to_vec())), Language::Unknown);
    }
}
