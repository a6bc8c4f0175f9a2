//! Parameter cell filtering
//!
//! Parameter cells are written for interactive use and declare values that
//! the generated script receives from its execution context instead
//! (budget year, province code, ...). Those declarations are dropped, repeated
//! top-level declarations are collapsed to the first one, and an
//! `output_filename` declaration is guaranteed.

use indexmap::IndexSet;

/// Parameter names supplied by the execution context
pub const DENY_LIST: [&str; 9] = [
    "budget_year",
    "b_year",
    "budget_start_date",
    "budget_ended_date",
    "b_date_start",
    "b_date_end",
    "province_code",
    "hospcode",
    "DataframeEmpty",
];

/// Name of the declaration every generated script must carry
pub const OUTPUT_FILENAME: &str = "output_filename";

/// Declared identifier of a line: text before the first `=` or `:`, trimmed
///
/// Returns `None` for lines that do not declare anything (blank lines,
/// comments, imports, calls).
#[must_use]
pub fn declared_name(line: &str) -> Option<&str> {
    let end = line.find(|c: char| c == '=' || c == ':')?;
    let name = line[..end].trim();
    (is_identifier(name) && !BLOCK_KEYWORDS.contains(&name)).then_some(name)
}

/// Keywords that open a block with a bare `:`
const BLOCK_KEYWORDS: [&str; 4] = ["else", "try", "finally", "except"];

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn is_indented(line: &str) -> bool {
    line.starts_with([' ', '\t'])
}

/// Filtered parameter block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    lines: Vec<String>,
    names: IndexSet<String>,
    synthesized_output: bool,
}

impl ParameterSet {
    /// Lines in output order
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consume into lines
    #[inline]
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Declared names in first-seen order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Whether a name is declared
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether `output_filename` was added because the notebook lacked it
    #[inline]
    #[must_use]
    pub fn output_filename_synthesized(&self) -> bool {
        self.synthesized_output
    }
}

/// Filters raw parameter lines against a deny-list
#[derive(Debug, Clone, Copy)]
pub struct ParameterFilter {
    deny_list: &'static [&'static str],
}

impl Default for ParameterFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterFilter {
    /// Filter with the built-in deny-list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            deny_list: &DENY_LIST,
        }
    }

    /// Whether a name is reserved
    #[inline]
    #[must_use]
    pub fn is_denied(&self, name: &str) -> bool {
        self.deny_list.contains(&name)
    }

    /// Filter parameter lines for the document `document_name`
    #[must_use]
    pub fn filter(&self, lines: &[String], document_name: &str) -> ParameterSet {
        let mut set = ParameterSet::default();
        let mut nested_output = false;

        for line in lines {
            match declared_name(line) {
                Some(name) if self.is_denied(name) => {
                    tracing::debug!(name, "dropping reserved parameter");
                }
                // statements inside blocks and call arguments are not declarations
                Some(name) if is_indented(line) => {
                    nested_output |= name == OUTPUT_FILENAME;
                    set.lines.push(line.clone());
                }
                Some(name) if set.names.contains(name) => {
                    tracing::debug!(name, "dropping repeated parameter");
                }
                Some(name) => {
                    set.names.insert(name.to_string());
                    set.lines.push(line.clone());
                }
                None => set.lines.push(line.clone()),
            }
        }

        if !set.names.contains(OUTPUT_FILENAME) && !nested_output {
            set.lines.push(output_filename_line(document_name));
            set.names.insert(OUTPUT_FILENAME.to_string());
            set.synthesized_output = true;
        }

        set
    }
}

/// Default `output_filename` declaration for a document
#[must_use]
pub fn output_filename_line(document_name: &str) -> String {
    let escaped = document_name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("{OUTPUT_FILENAME} = '{escaped}'\n")
}
