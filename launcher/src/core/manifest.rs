//! Parsing of the dependency manifest (`requirements.txt` format).
//!
//! Only enough of the format is understood to tell whether the manifest
//! declares anything and to report what it declares. Installation itself
//! always hands the file to the installer unchanged.

/// One logical line of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// A package specifier such as `pandas>=2.0`.
    Package(String),
    /// An installer option line such as `-r base.txt` or `--index-url ...`.
    Option(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<Requirement>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            Requirement::Package(line) => Some(line.as_str()),
            Requirement::Option(_) => None,
        })
    }

    pub fn package_count(&self) -> usize {
        self.packages().count()
    }
}

pub fn parse_manifest(raw: &str) -> Manifest {
    let mut entries = Vec::new();
    let mut pending = String::new();

    for line in raw.lines() {
        let line = strip_comment(line);
        // A trailing backslash joins the next physical line.
        if let Some(head) = line.trim_end().strip_suffix('\\') {
            pending.push_str(head);
            pending.push(' ');
            continue;
        }
        pending.push_str(line);
        let logical = pending.split_whitespace().collect::<Vec<_>>().join(" ");
        pending.clear();
        if let Some(entry) = classify(&logical) {
            entries.push(entry);
        }
    }
    let tail = pending.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some(entry) = classify(&tail) {
        entries.push(entry);
    }

    Manifest { entries }
}

fn classify(logical: &str) -> Option<Requirement> {
    if logical.is_empty() {
        return None;
    }
    if logical.starts_with('-') {
        Some(Requirement::Option(logical.to_string()))
    } else {
        Some(Requirement::Package(logical.to_string()))
    }
}

/// Drop `#` comments: whole-line, or inline when preceded by whitespace.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    let bytes = line.as_bytes();
    for (idx, byte) in bytes.iter().enumerate() {
        if *byte == b'#' && idx > 0 && bytes[idx - 1].is_ascii_whitespace() {
            return &line[..idx];
        }
    }
    line
}
