// Diagnostics for shim resolution
// Coded, coloured messages for manifests, candidate probing and name lookups

use colored::Colorize;
use std::fmt;
use std::path::Path;

/// Where a diagnostic points: a manifest file, a module file, or a module path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub origin: String,
    pub line: Option<usize>,
}

impl Location {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            line: None,
        }
    }

    pub fn at_line(origin: impl Into<String>, line: usize) -> Self {
        Self {
            origin: origin.into(),
            line: Some(line),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.display().to_string())
    }

    pub fn unknown() -> Self {
        Self::new("<unknown>")
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.origin, line),
            None => write!(f, "{}", self.origin),
        }
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLevel {
    Error,
    Warning,
    Info,
    Note,
}

impl ErrorLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorLevel::Error => "error",
            ErrorLevel::Warning => "warning",
            ErrorLevel::Info => "info",
            ErrorLevel::Note => "note",
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorLevel::Error => write!(f, "{}", "error".red().bold()),
            ErrorLevel::Warning => write!(f, "{}", "warning".yellow().bold()),
            ErrorLevel::Info => write!(f, "{}", "info".blue().bold()),
            ErrorLevel::Note => write!(f, "{}", "note".cyan().bold()),
        }
    }
}

/// Structured diagnostic message
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: ErrorLevel,
    pub code: String,
    pub message: String,
    pub location: Location,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn new(level: ErrorLevel, code: &str, message: String, location: Location) -> Self {
        Self {
            level,
            code: code.to_string(),
            message,
            location,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn error(code: &str, message: String, location: Location) -> Self {
        Self::new(ErrorLevel::Error, code, message, location)
    }

    pub fn warning(code: &str, message: String, location: Location) -> Self {
        Self::new(ErrorLevel::Warning, code, message, location)
    }

    pub fn note(message: String, location: Location) -> Self {
        Self::new(ErrorLevel::Note, "", message, location)
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Render in compiler style:
    ///
    /// ```text
    /// warning[W0101]: candidate `pkg.legacy.widget` is unavailable
    ///  --> shim.json
    ///  = module not found
    /// ```
    pub fn format(&self) -> String {
        let mut output = String::new();

        if self.code.is_empty() {
            output.push_str(&format!("{}: {}\n", self.level, self.message.bold()));
        } else {
            output.push_str(&format!(
                "{}[{}]: {}\n",
                self.level,
                self.code,
                self.message.bold()
            ));
        }

        output.push_str(&format!(" {} {}\n", "-->".cyan().bold(), self.location));

        for note in &self.notes {
            output.push_str(&format!(" {} {}\n", "=".cyan().bold(), note.cyan()));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!(" {} {}\n", "help:".green().bold(), help));
        }

        output
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "level": self.level.as_str(),
            "code": self.code,
            "message": self.message,
            "origin": self.location.origin,
        });

        if let Some(map) = value.as_object_mut() {
            if let Some(line) = self.location.line {
                map.insert("line".to_string(), serde_json::json!(line));
            }
            if !self.notes.is_empty() {
                map.insert("notes".to_string(), serde_json::json!(self.notes));
            }
            if let Some(help) = &self.help {
                map.insert("help".to_string(), serde_json::json!(help));
            }
        }

        value
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Diagnostic collection and reporting engine
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            ErrorLevel::Error => self.error_count += 1,
            ErrorLevel::Warning => self.warning_count += 1,
            ErrorLevel::Info => self.info_count += 1,
            ErrorLevel::Note => {}
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn emit_error(&mut self, code: &str, message: String, location: Location) {
        self.emit(Diagnostic::error(code, message, location));
    }

    pub fn emit_warning(&mut self, code: &str, message: String, location: Location) {
        self.emit(Diagnostic::warning(code, message, location));
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn info_count(&self) -> usize {
        self.info_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print all diagnostics to stderr
    pub fn print_all(&self) {
        for diag in &self.diagnostics {
            eprintln!("{}", diag.format());
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        if self.error_count > 0 {
            eprintln!(
                "{}: {} error{} emitted",
                "error".red().bold(),
                self.error_count,
                if self.error_count == 1 { "" } else { "s" }
            );
        }

        if self.warning_count > 0 {
            eprintln!(
                "{}: {} warning{} emitted",
                "warning".yellow().bold(),
                self.warning_count,
                if self.warning_count == 1 { "" } else { "s" }
            );
        }
    }

    /// Export diagnostics as JSON for tooling
    pub fn to_json(&self) -> String {
        let diagnostics: Vec<serde_json::Value> = self
            .diagnostics
            .iter()
            .map(Diagnostic::to_json_value)
            .collect();

        serde_json::json!({ "diagnostics": diagnostics }).to_string()
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
        self.warning_count = 0;
        self.info_count = 0;
    }
}

/// Helpers for the diagnostics the resolver and CLI produce
impl DiagnosticEngine {
    /// A candidate was probed and could not be loaded
    pub fn candidate_unavailable(&mut self, canonical: &str, candidate: &str, reason: &str) {
        self.emit(
            Diagnostic::warning(
                error_codes::CANDIDATE_UNAVAILABLE,
                format!("candidate `{}` is unavailable", candidate),
                Location::new(canonical),
            )
            .with_note(reason.to_string()),
        );
    }

    /// Every candidate of a shim missed
    pub fn empty_surface(&mut self, canonical: &str, candidates: &[String]) {
        self.emit(
            Diagnostic::warning(
                error_codes::EMPTY_SURFACE,
                format!("`{}` resolved to an empty surface", canonical),
                Location::new(canonical),
            )
            .with_note(format!("tried: {}", candidates.join(", ")))
            .with_help("add a loadable candidate or check the search paths".to_string()),
        );
    }

    /// A name was looked up that the bound backend never exported
    pub fn unbound_name(&mut self, name: &str, location: Location, suggestions: &[String]) {
        let mut diag = Diagnostic::error(
            error_codes::UNBOUND_NAME,
            format!("cannot find `{}` in the public surface", name),
            location,
        );

        if !suggestions.is_empty() {
            diag = diag.with_help(format!("did you mean `{}`?", suggestions.join("`, `")));
        }

        self.emit(diag);
    }

    /// Two shims of one package export the same name; the later one wins
    pub fn name_shadowed(
        &mut self,
        name: &str,
        shadowed: &str,
        winner: &str,
        location: Location,
    ) {
        self.emit_warning(
            error_codes::NAME_SHADOWED,
            format!("`{}` from `{}` is shadowed by `{}`", name, shadowed, winner),
            location,
        );
    }

    /// The lock file no longer matches what resolution produces
    pub fn lock_drift(&mut self, location: Location, message: String) {
        self.emit(
            Diagnostic::error(error_codes::LOCK_DRIFT, message, location)
                .with_help("run `shim lock` to refresh the lock file".to_string()),
        );
    }
}

/// Diagnostic codes
pub mod error_codes {
    // Manifest errors (E0001-E0099)
    pub const INVALID_MANIFEST: &str = "E0001";
    pub const INVALID_MODULE_PATH: &str = "E0002";
    pub const EMPTY_CANDIDATES: &str = "E0003";
    pub const DUPLICATE_SHIM: &str = "E0004";

    // Name errors (E0400-E0499)
    pub const UNBOUND_NAME: &str = "E0425";

    // Lock errors (E0700-E0799)
    pub const LOCK_DRIFT: &str = "E0701";
    pub const LOCK_MISSING: &str = "E0702";

    // Warnings (W0100-W0199)
    pub const CANDIDATE_UNAVAILABLE: &str = "W0101";
    pub const EMPTY_SURFACE: &str = "W0102";
    pub const NAME_SHADOWED: &str = "W0103";
}

/// Fuzzy matching for "did you mean?" suggestions
pub mod fuzzy {
    use strsim::jaro_winkler;

    /// Names with Jaro-Winkler similarity above `threshold`, best first
    pub fn find_similar_names(
        target: &str,
        candidates: &[String],
        threshold: f64,
        max_suggestions: usize,
    ) -> Vec<String> {
        let mut scored: Vec<(String, f64)> = candidates
            .iter()
            .map(|candidate| (candidate.clone(), jaro_winkler(target, candidate)))
            .filter(|(_, score)| *score > threshold)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(max_suggestions)
            .map(|(name, _)| name)
            .collect()
    }

    /// Suggestions with the thresholds used for surface lookups
    pub fn suggest(target: &str, candidates: &[String]) -> Vec<String> {
        find_similar_names(target, candidates, 0.8, 3)
    }
}
