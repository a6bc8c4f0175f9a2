//! Script templates and placeholder substitution
//!
//! A template is a plain script containing two marker tokens. Rendering keeps
//! every template line as-is and, after each line carrying a token, inserts
//! the matching line block indented to the token's column.
//!
//! Templates are looked up by name in an optional directory first, then among
//! the templates compiled into this crate, falling back to the default name.

use crate::error::{CodegenError, CodegenResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the template used when none is requested or the requested one is absent
pub const DEFAULT_TEMPLATE: &str = "by_hospcode";

/// File extension of template files (without dot)
pub const TEMPLATE_EXTENSION: &str = "py";

/// Templates shipped with the crate
const BUILTIN_TEMPLATES: [(&str, &str); 2] = [
    ("by_hospcode", include_str!("../templates/by_hospcode.py")),
    ("process_summary", include_str!("../templates/process_summary.py")),
];

/// Marker tokens recognised in templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Filtered parameter declarations
    Parameters,
    /// Processing code
    Process,
}

impl Placeholder {
    /// All placeholders, in substitution order
    pub const ALL: [Self; 2] = [Self::Parameters, Self::Process];

    /// Literal token text
    #[inline]
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Parameters => "__PYSCRIPT_PARAMETERS__",
            Self::Process => "__PROCESSING_CODE__",
        }
    }
}

/// Line blocks substituted into a template
#[derive(Debug, Clone, Copy)]
pub struct TemplateBundle<'a> {
    /// Parameter declaration lines
    pub parameters: &'a [String],
    /// Processing code lines
    pub process: &'a [String],
}

impl<'a> TemplateBundle<'a> {
    /// Create bundle
    #[inline]
    #[must_use]
    pub fn new(parameters: &'a [String], process: &'a [String]) -> Self {
        Self {
            parameters,
            process,
        }
    }

    /// Lines for a placeholder
    #[inline]
    #[must_use]
    pub fn lines_for(&self, placeholder: Placeholder) -> &'a [String] {
        match placeholder {
            Placeholder::Parameters => self.parameters,
            Placeholder::Process => self.process,
        }
    }
}

/// Loaded template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    text: String,
}

impl Template {
    /// Create template from text
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Template name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw template text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Placeholders present anywhere in the template
    #[must_use]
    pub fn placeholders(&self) -> Vec<Placeholder> {
        Placeholder::ALL
            .into_iter()
            .filter(|p| self.text.contains(p.token()))
            .collect()
    }

    /// Substitute the bundle into the template
    ///
    /// Pure and deterministic: the same template and bundle always give the
    /// same bytes.
    #[must_use]
    pub fn render(&self, bundle: &TemplateBundle<'_>) -> String {
        let mut out = String::with_capacity(self.text.len());

        for line in self.text.split_inclusive('\n') {
            out.push_str(line);
            for placeholder in Placeholder::ALL {
                if let Some(column) = line.find(placeholder.token()) {
                    out.push('\n');
                    push_block(&mut out, bundle.lines_for(placeholder), indentation(&line[..column]));
                    out.push('\n');
                }
            }
        }

        out
    }
}

/// Indentation implied by the text in front of a token
///
/// Whitespace-only prefixes are used as-is; otherwise only their leading
/// whitespace counts.
fn indentation(prefix: &str) -> &str {
    &prefix[..prefix.len() - prefix.trim_start().len()]
}

fn push_block(out: &mut String, lines: &[String], indent: &str) {
    for line in lines {
        out.push_str(indent);
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push('\n');
}

/// Template lookup by name
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: Option<PathBuf>,
    builtins: BTreeMap<&'static str, &'static str>,
    default_name: String,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateStore {
    /// Store serving only the compiled-in templates
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            dir: None,
            builtins: BUILTIN_TEMPLATES.into_iter().collect(),
            default_name: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Store reading `{dir}/{name}.py` before the compiled-in templates
    #[must_use]
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::builtin()
        }
    }

    /// Store reading only from `dir`, without compiled-in templates
    #[must_use]
    pub fn dir_only(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            builtins: BTreeMap::new(),
            default_name: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Override the fallback template name
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// Fallback template name
    #[inline]
    #[must_use]
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Load a template, falling back to the default one
    ///
    /// # Errors
    /// - `CodegenError::MissingTemplate` if neither template exists
    /// - `CodegenError::Io` if a template file exists but cannot be read
    pub fn load(&self, name: Option<&str>) -> CodegenResult<Template> {
        let requested = name.unwrap_or(&self.default_name);
        if let Some(template) = self.lookup(requested)? {
            return Ok(template);
        }

        tracing::debug!(
            requested,
            fallback = %self.default_name,
            "template not found, using default"
        );
        self.lookup(&self.default_name)?
            .ok_or_else(|| CodegenError::MissingTemplate {
                name: requested.to_string(),
            })
    }

    /// Names of all reachable templates, sorted
    ///
    /// # Errors
    /// `CodegenError::Io` if the template directory exists but cannot be listed.
    pub fn names(&self) -> CodegenResult<Vec<String>> {
        let mut names: Vec<String> = self.builtins.keys().map(|n| (*n).to_string()).collect();
        if let Some(dir) = self.dir.as_deref().filter(|d| d.is_dir()) {
            let entries = std::fs::read_dir(dir).map_err(|e| CodegenError::io_error(dir, e))?;
            for entry in entries {
                let path = entry.map_err(|e| CodegenError::io_error(dir, e))?.path();
                if path.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXTENSION) {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.push(stem.to_string());
                    }
                }
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn lookup(&self, name: &str) -> CodegenResult<Option<Template>> {
        if !is_plain_name(name) {
            return Ok(None);
        }

        if let Some(path) = self.file_for(name) {
            let text =
                std::fs::read_to_string(&path).map_err(|e| CodegenError::io_error(&path, e))?;
            return Ok(Some(Template::new(name, text)));
        }

        Ok(self
            .builtins
            .get(name)
            .map(|text| Template::new(name, *text)))
    }

    fn file_for(&self, name: &str) -> Option<PathBuf> {
        let dir = self.dir.as_deref()?;
        let path = dir.join(format!("{name}.{TEMPLATE_EXTENSION}"));
        path.is_file().then_some(path)
    }
}

/// Template names are single path components
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && Path::new(name).components().count() == 1
        && !name.contains(['/', '\\'])
}

/// Loads templates and renders bundles into them
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    store: TemplateStore,
}

impl TemplateEngine {
    /// Create engine over a template store
    #[inline]
    #[must_use]
    pub fn new(store: TemplateStore) -> Self {
        Self { store }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Render `bundle` into the template called `name` (or the default)
    ///
    /// # Errors
    /// Propagates template lookup errors.
    pub fn render(&self, name: Option<&str>, bundle: &TemplateBundle<'_>) -> CodegenResult<String> {
        let template = self.store.load(name)?;
        Ok(template.render(bundle))
    }
}
