/*!
 * Lazy segment extraction from reStructuredText sources.
 *
 * The extractor is line based: it recognises the block-level constructs that
 * must never reach the translation service (literal blocks, directive options,
 * comments, hyperlink targets, tables) and yields everything else as
 * paragraph-level segments. It does not build a document tree.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use super::segment::{Segment, SourceLocation};

/// `.. name:: argument`
static DIRECTIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\.\.\s+([A-Za-z0-9][\w:.+-]*?)::(?:\s+(.*))?$").expect("valid directive regex")
});

/// `:option: value` directly under a directive
static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:[A-Za-z0-9_][\w .-]*:(?:\s|$)").expect("valid option regex"));

/// Bullet and enumerated list markers
static LIST_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*+\u{2022}]|#\.|\d+[.)]|\(\d+\))\s+").expect("valid list marker regex")
});

/// Directives whose whole block is code, paths or build instructions
const LITERAL_DIRECTIVES: &[&str] = &[
    "code-block",
    "code",
    "sourcecode",
    "literalinclude",
    "raw",
    "math",
    "toctree",
    "highlight",
    "include",
    "index",
    "csv-table",
    "graphviz",
    "productionlist",
    "only",
];

/// Directives whose argument is prose rather than a path or expression
const PROSE_ARGUMENT_DIRECTIVES: &[&str] = &[
    "note",
    "warning",
    "tip",
    "important",
    "caution",
    "attention",
    "danger",
    "error",
    "hint",
    "admonition",
    "seealso",
    "topic",
    "sidebar",
    "rubric",
];

/// Iterator over the translatable segments of one document.
///
/// Restartable by construction: create a new extractor over the same text to
/// get the same sequence again.
pub struct SegmentExtractor<'a> {
    path: PathBuf,
    lines: Vec<&'a str>,
    pos: usize,
    ordinal: usize,
    /// Indentation of a paragraph that announced a literal block with `::`
    literal_after: Option<usize>,
}

impl<'a> SegmentExtractor<'a> {
    pub fn new(path: impl AsRef<Path>, text: &'a str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lines: text.lines().collect(),
            pos: 0,
            ordinal: 0,
            literal_after: None,
        }
    }

    fn line(&self, index: usize) -> &'a str {
        self.lines[index]
    }

    fn is_blank(&self, index: usize) -> bool {
        self.lines[index].trim().is_empty()
    }

    /// Skip every following line indented deeper than `base`, blank lines included,
    /// as long as the block continues after them.
    fn skip_indented_block(&mut self, base: usize) {
        while self.pos < self.lines.len() {
            if self.is_blank(self.pos) {
                let next = (self.pos..self.lines.len()).find(|&i| !self.is_blank(i));
                match next {
                    Some(i) if indent_of(self.line(i)) > base => self.pos = i,
                    _ => return,
                }
            } else if indent_of(self.line(self.pos)) > base {
                self.pos += 1;
            } else {
                return;
            }
        }
    }

    fn emit(&mut self, lines: &[&str], start_line: usize) -> Option<Segment> {
        let raw = lines.join("\n");
        if !raw.chars().any(char::is_alphanumeric) {
            return None;
        }
        self.ordinal += 1;
        let location = SourceLocation::new(self.path.clone(), self.ordinal, start_line + 1);
        Some(Segment::new(&raw, location))
    }

    /// Handle a line starting with `..`. Returns a segment when the construct carries prose.
    fn explicit_markup(&mut self, start: usize) -> Option<Segment> {
        let line = self.line(start);
        let base = indent_of(line);
        let trimmed = line.trim();
        let rest = trimmed[2..].trim_start();
        self.pos = start + 1;

        if let Some(caps) = DIRECTIVE_RE.captures(trimmed) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_ascii_lowercase();
            let argument = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            return self.directive(&name, argument, base, start);
        }

        if rest.starts_with('[') {
            // Footnote or citation body is prose.
            if let Some(close) = rest.find(']') {
                let first = rest[close + 1..].trim();
                let mut lines = Vec::new();
                if !first.is_empty() {
                    lines.push(first);
                }
                lines.extend(self.continuation_lines(base));
                self.skip_indented_block(base);
                return self.emit(&lines, start);
            }
        }

        // Hyperlink targets, substitution definitions and comments.
        self.skip_indented_block(base);
        None
    }

    fn directive(&mut self, name: &str, argument: &str, base: usize, start: usize) -> Option<Segment> {
        // Lines directly after the directive line continue the argument.
        let continuation = self.continuation_lines(base);

        // Option lines, each possibly wrapped onto deeper lines.
        while self.pos < self.lines.len()
            && !self.is_blank(self.pos)
            && indent_of(self.line(self.pos)) > base
            && OPTION_RE.is_match(self.line(self.pos).trim())
        {
            let option_indent = indent_of(self.line(self.pos));
            self.pos += 1;
            while self.pos < self.lines.len()
                && !self.is_blank(self.pos)
                && indent_of(self.line(self.pos)) > option_indent
            {
                self.pos += 1;
            }
        }

        if LITERAL_DIRECTIVES.contains(&name) {
            self.skip_indented_block(base);
            return None;
        }

        if PROSE_ARGUMENT_DIRECTIVES.contains(&name) {
            let mut lines = Vec::new();
            if !argument.is_empty() {
                lines.push(argument);
            }
            lines.extend(continuation);
            if !lines.is_empty() {
                return self.emit(&lines, start);
            }
        }

        // Body paragraphs are picked up by the main loop.
        None
    }

    /// Non-blank, non-option lines indented deeper than `base`
    fn continuation_lines(&mut self, base: usize) -> Vec<&'a str> {
        let mut lines = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.line(self.pos);
            if line.trim().is_empty() || indent_of(line) <= base || OPTION_RE.is_match(line.trim()) {
                break;
            }
            lines.push(line.trim());
            self.pos += 1;
        }
        lines
    }

    fn skip_simple_table(&mut self) {
        // Runs until a border line that is followed by a blank line or the end.
        self.pos += 1;
        while self.pos < self.lines.len() {
            let is_border = is_simple_table_border(self.line(self.pos).trim());
            self.pos += 1;
            if is_border && (self.pos >= self.lines.len() || self.is_blank(self.pos)) {
                return;
            }
        }
    }

    fn paragraph(&mut self, start: usize) -> Option<Segment> {
        let first = self.line(start);
        let first_indent = indent_of(first);
        let first_trimmed = first.trim();

        let (text, content_indent, is_list_item) = match LIST_MARKER_RE.find(first_trimmed) {
            Some(marker) => {
                let mut text = &first_trimmed[marker.end()..];
                // Nested markers such as `* - cell` in list tables
                while let Some(inner) = LIST_MARKER_RE.find(text) {
                    text = &text[inner.end()..];
                }
                (text, first_indent + marker.end(), true)
            }
            None => (first_trimmed, first_indent, false),
        };

        let mut lines = vec![text];
        self.pos = start + 1;

        // A single line followed by an underline is a section title.
        if self.pos < self.lines.len() && is_adornment(self.line(self.pos).trim()) && !is_list_item {
            self.pos += 1;
            return self.emit(&lines, start);
        }

        while self.pos < self.lines.len() {
            let line = self.line(self.pos);
            let trimmed = line.trim();
            if trimmed.is_empty() || is_adornment(trimmed) || trimmed.starts_with("..") {
                break;
            }
            // Deeper lines open a nested block, shallower ones end the item.
            if indent_of(line) != content_indent {
                break;
            }
            lines.push(trimmed);
            self.pos += 1;
        }

        let last = lines.len() - 1;
        if !lines[last].ends_with("::") {
            return self.emit(&lines, start);
        }

        // Trailing `::` announces a literal block: `Text::` reads `Text:`, `Text ::` reads `Text`.
        self.literal_after = Some(first_indent);
        let stripped = lines[last].trim_end_matches("::");
        let rewritten = if stripped.is_empty() || stripped.ends_with(char::is_whitespace) {
            stripped.trim_end().to_string()
        } else {
            format!("{}:", stripped)
        };
        let mut owned: Vec<String> = lines[..last].iter().map(|l| l.to_string()).collect();
        if !rewritten.is_empty() {
            owned.push(rewritten);
        }
        if owned.is_empty() {
            return None;
        }
        let borrowed: Vec<&str> = owned.iter().map(String::as_str).collect();
        self.emit(&borrowed, start)
    }
}

impl<'a> Iterator for SegmentExtractor<'a> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        loop {
            if let Some(base) = self.literal_after.take() {
                self.skip_indented_block(base);
            }

            if self.pos >= self.lines.len() {
                return None;
            }

            let start = self.pos;
            let line = self.line(start);
            let trimmed = line.trim();

            if trimmed.is_empty() {
                self.pos += 1;
                continue;
            }

            if trimmed == ".." || trimmed.starts_with(".. ") {
                match self.explicit_markup(start) {
                    Some(segment) => return Some(segment),
                    None => continue,
                }
            }

            if is_simple_table_border(trimmed) {
                self.skip_simple_table();
                continue;
            }

            if is_adornment(trimmed)
                || is_grid_table_line(trimmed)
                || (trimmed.starts_with('|') && trimmed.ends_with('|'))
                || trimmed.starts_with(">>>")
            {
                self.pos += 1;
                continue;
            }

            if trimmed == "::" {
                self.pos += 1;
                self.literal_after = Some(indent_of(line));
                continue;
            }

            if let Some(segment) = self.paragraph(start) {
                return Some(segment);
            }
        }
    }
}

/// Extract every segment of a document eagerly
pub fn extract_segments(path: impl AsRef<Path>, text: &str) -> Vec<Segment> {
    SegmentExtractor::new(path, text).collect()
}

fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 8 } else { 1 })
        .sum()
}

/// Section over/underlines and transitions: one repeated punctuation character
fn is_adornment(trimmed: &str) -> bool {
    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_punctuation() && trimmed.len() >= 3 && chars.all(|c| c == first)
}

fn is_grid_table_line(trimmed: &str) -> bool {
    trimmed.starts_with('+') && trimmed.len() > 1 && trimmed.chars().all(|c| matches!(c, '+' | '-' | '=' | ':'))
}

/// `=====  ======` column borders of a simple table
fn is_simple_table_border(trimmed: &str) -> bool {
    trimmed.starts_with('=')
        && trimmed.contains(' ')
        && trimmed.chars().all(|c| c == '=' || c == ' ')
}
