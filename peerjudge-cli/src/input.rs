// Copyright 2025 PeerJudge (https://github.com/peerjudge)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Text input loading for the CLI.
//!
//! Remote URLs are rejected up front with an error naming the URL, rather
//! than surfacing a misleading file-not-found from the filesystem layer.
//! Only locally extracted text is accepted; PDF extraction is an upstream
//! concern.

use anyhow::{bail, Context};
use std::path::Path;
use std::sync::OnceLock;

fn url_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").expect("static pattern"))
}

/// Load a UTF-8 text input from a local path.
pub fn load_text(path: &Path) -> anyhow::Result<String> {
    let path_str = path.to_string_lossy();
    if url_pattern().is_match(&path_str) {
        bail!(
            "input looks like a URL ({path_str}): remote fetching is not supported, \
             download the file locally first"
        );
    }
    if path.extension().map(|e| e.eq_ignore_ascii_case("pdf")).unwrap_or(false) {
        bail!(
            "PDF input is not read directly ({}); extract the text first",
            path.display()
        );
    }

    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_url_is_rejected_with_url_message() {
        let err = load_text(&PathBuf::from("https://example.com/x.pdf")).unwrap_err();
        let message = err.to_string().to_lowercase();
        assert!(message.contains("url") || message.contains("http"));
        assert!(!message.contains("no such file"));
    }

    #[test]
    fn test_plain_http_url_rejected() {
        let err = load_text(&PathBuf::from("http://example.com/paper.txt")).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("url"));
    }

    #[test]
    fn test_pdf_extension_rejected() {
        let err = load_text(&PathBuf::from("/tmp/paper.pdf")).unwrap_err();
        assert!(err.to_string().contains("PDF"));
    }

    #[test]
    fn test_local_file_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "paper text").unwrap();
        let text = load_text(file.path()).unwrap();
        assert!(text.contains("paper text"));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_text(&PathBuf::from("/nonexistent/peerjudge/input.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/peerjudge/input.txt"));
    }
}
