//! Output file naming and conflict handling.
//!
//! A naming scheme is a file stem template with three placeholders:
//!
//! | placeholder   | expands to                                   |
//! |---------------|----------------------------------------------|
//! | `{ORIGINAL}`  | input file stem                              |
//! | `{TIMESTAMP}` | local time as `YYYY-MM-DD HHMMSS`            |
//! | `{UNIX}`      | seconds since the Unix epoch                 |
//!
//! The input's extension is always kept.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MediaError, MediaResult};

/// Default output file stem template.
pub const DEFAULT_NAMING_SCHEME: &str = "{ORIGINAL}_trimmed";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H%M%S";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Original,
    Timestamp,
    Unix,
}

/// Validated output file stem template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    template: String,
    tokens: Vec<Token>,
}

impl NamingScheme {
    /// Parse and validate a template.
    pub fn parse(template: &str) -> MediaResult<Self> {
        let invalid = |reason: &str| MediaError::invalid_naming_scheme(template, reason);

        if template.trim().is_empty() {
            return Err(invalid("template is empty"));
        }
        if template.contains(['/', '\\']) {
            return Err(invalid("path separators are not allowed"));
        }

        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(invalid("nested '{'")),
                            other => name.push(other),
                        }
                    }
                    if !closed {
                        return Err(invalid("unclosed '{'"));
                    }
                    let token = match name.as_str() {
                        "ORIGINAL" => Token::Original,
                        "TIMESTAMP" => Token::Timestamp,
                        "UNIX" => Token::Unix,
                        other => {
                            return Err(invalid(&format!(
                                "unknown placeholder '{{{}}}', use {{ORIGINAL}}, {{TIMESTAMP}} or {{UNIX}}",
                                other
                            )))
                        }
                    };
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(token);
                }
                '}' => return Err(invalid("unmatched '}'")),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            template: template.to_string(),
            tokens,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expand the template for an input stem at time `now`.
    pub fn render(&self, original_stem: &str, now: DateTime<Local>) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Original => out.push_str(original_stem),
                Token::Timestamp => out.push_str(&now.format(TIMESTAMP_FORMAT).to_string()),
                Token::Unix => out.push_str(&now.timestamp().to_string()),
            }
        }
        out
    }
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            template: DEFAULT_NAMING_SCHEME.to_string(),
            tokens: vec![Token::Original, Token::Literal("_trimmed".to_string())],
        }
    }
}

impl FromStr for NamingScheme {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NamingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    Overwrite,
    /// Append `_1`, `_2`, ... until the name is free.
    #[default]
    Rename,
    /// Leave the existing file alone and skip the input.
    Fail,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Overwrite => "overwrite",
            ConflictPolicy::Rename => "rename",
            ConflictPolicy::Fail => "fail",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            "rename" => Ok(ConflictPolicy::Rename),
            "fail" => Ok(ConflictPolicy::Fail),
            other => Err(format!(
                "unknown conflict policy '{}': expected overwrite, rename or fail",
                other
            )),
        }
    }
}

/// Where a trimmed file should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Nothing exists at the path.
    New(PathBuf),
    /// An existing file will be replaced.
    Overwrite(PathBuf),
    /// The rendered name was taken; this is the first free `_N` variant.
    Renamed(PathBuf),
    /// The rendered name is taken and the policy is `fail`.
    Conflict(PathBuf),
}

impl OutputTarget {
    /// Path to write, or `None` for a conflict.
    pub fn writable_path(&self) -> Option<&Path> {
        match self {
            OutputTarget::New(p) | OutputTarget::Overwrite(p) | OutputTarget::Renamed(p) => Some(p),
            OutputTarget::Conflict(_) => None,
        }
    }
}

/// Output paths claimed by files of the current batch.
///
/// Files run concurrently, so a name is reserved here as soon as it is
/// chosen rather than when ffmpeg finally creates it. Two inputs with the
/// same stem (e.g. `week1/lecture.m4a` and `week2/lecture.m4a`) then get
/// distinct outputs.
#[derive(Debug, Default)]
pub struct OutputReservations {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl OutputReservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // The set stays consistent even if a holder panicked
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build the output path for `input`, apply the conflict policy and
/// reserve the result in `reservations`.
///
/// A name reserved by another file of the batch is never handed out
/// twice: `rename` and `overwrite` move on to the next `_N` variant, and
/// `fail` reports a conflict. `overwrite` only replaces files that were on
/// disk before the batch started.
pub fn resolve_output_path(
    input: &Path,
    scheme: &NamingScheme,
    output_dir: &Path,
    policy: ConflictPolicy,
    now: DateTime<Local>,
    reservations: &OutputReservations,
) -> MediaResult<OutputTarget> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut name = scheme.render(&stem, now);
    if let Some(ext) = input.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    let candidate = output_dir.join(name);

    if candidate == input {
        return Err(MediaError::OutputIsInput(candidate));
    }

    let mut claimed = reservations.lock();
    let reserved = claimed.contains(&candidate);

    let target = if !reserved && !candidate.exists() {
        OutputTarget::New(candidate)
    } else {
        match policy {
            ConflictPolicy::Overwrite if !reserved => {
                warn!(path = %candidate.display(), "Output exists, replacing (--on-conflict overwrite)");
                OutputTarget::Overwrite(candidate)
            }
            ConflictPolicy::Fail => {
                warn!(path = %candidate.display(), "Output exists, skipping (--on-conflict fail)");
                return Ok(OutputTarget::Conflict(candidate));
            }
            ConflictPolicy::Overwrite | ConflictPolicy::Rename => {
                let renamed = first_free_variant(&candidate, |p| claimed.contains(p) || p.exists());
                warn!(
                    path = %candidate.display(),
                    renamed = %renamed.display(),
                    "Output name taken, renaming"
                );
                OutputTarget::Renamed(renamed)
            }
        }
    };

    if let Some(path) = target.writable_path() {
        claimed.insert(path.to_path_buf());
    }
    Ok(target)
}

fn first_free_variant(path: &Path, is_taken: impl Fn(&Path) -> bool) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1u32;
    loop {
        let next = path.with_file_name(format!("{}_{}{}", stem, n, ext));
        if !is_taken(&next) {
            return next;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).single().unwrap()
    }

    #[test]
    fn test_render_placeholders() {
        let scheme = NamingScheme::parse("{ORIGINAL} - {TIMESTAMP}").unwrap();
        assert_eq!(scheme.render("lecture", fixed_now()), "lecture - 2024-03-05 140709");

        let unix = NamingScheme::parse("{UNIX}").unwrap();
        assert_eq!(unix.render("x", fixed_now()), fixed_now().timestamp().to_string());
    }

    #[test]
    fn test_default_scheme_matches_template() {
        let parsed = NamingScheme::parse(DEFAULT_NAMING_SCHEME).unwrap();
        assert_eq!(parsed, NamingScheme::default());
    }

    #[test]
    fn test_invalid_schemes() {
        for bad in ["", "{ORIGINAL", "ORIGINAL}", "{NAME}", "{ORI{GINAL}}", "a/{ORIGINAL}"] {
            assert!(
                matches!(NamingScheme::parse(bad), Err(MediaError::InvalidNamingScheme { .. })),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_conflict_policy_parsing() {
        assert_eq!("Rename".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Rename);
        assert!("skip".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn test_new_output_keeps_extension() {
        let dir = TempDir::new().unwrap();
        let target = resolve_output_path(
            Path::new("/recordings/week1.M4A"),
            &NamingScheme::default(),
            dir.path(),
            ConflictPolicy::Rename,
            fixed_now(),
            &OutputReservations::new(),
        )
        .unwrap();
        assert_eq!(target, OutputTarget::New(dir.path().join("week1_trimmed.M4A")));
    }

    #[test]
    fn test_conflict_policies() {
        let dir = TempDir::new().unwrap();
        let input = Path::new("/recordings/talk.m4a");
        let scheme = NamingScheme::default();
        std::fs::write(dir.path().join("talk_trimmed.m4a"), b"old").unwrap();
        std::fs::write(dir.path().join("talk_trimmed_1.m4a"), b"old").unwrap();

        let resolve = |policy| {
            resolve_output_path(input, &scheme, dir.path(), policy, fixed_now(), &OutputReservations::new())
                .unwrap()
        };

        let renamed = resolve(ConflictPolicy::Rename);
        assert_eq!(renamed, OutputTarget::Renamed(dir.path().join("talk_trimmed_2.m4a")));

        let overwrite = resolve(ConflictPolicy::Overwrite);
        assert_eq!(overwrite, OutputTarget::Overwrite(dir.path().join("talk_trimmed.m4a")));

        let fail = resolve(ConflictPolicy::Fail);
        assert!(fail.writable_path().is_none());
    }

    #[test]
    fn test_output_cannot_replace_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("talk.m4a");
        let scheme = NamingScheme::parse("{ORIGINAL}").unwrap();

        let reservations = OutputReservations::new();
        let err = resolve_output_path(
            &input,
            &scheme,
            dir.path(),
            ConflictPolicy::Overwrite,
            fixed_now(),
            &reservations,
        )
        .unwrap_err();
        assert!(matches!(err, MediaError::OutputIsInput(_)));
        assert!(reservations.is_empty());
    }

    #[test]
    fn test_same_stem_inputs_get_distinct_outputs() {
        let dir = TempDir::new().unwrap();
        let scheme = NamingScheme::default();
        let resolve = |input: &str, policy, reservations: &OutputReservations| {
            resolve_output_path(Path::new(input), &scheme, dir.path(), policy, fixed_now(), reservations)
                .unwrap()
        };

        // Both resolved before either file is written
        let reservations = OutputReservations::new();
        let first = resolve("/rec/week1/lecture.m4a", ConflictPolicy::Rename, &reservations);
        let second = resolve("/rec/week2/lecture.m4a", ConflictPolicy::Rename, &reservations);
        assert_eq!(first, OutputTarget::New(dir.path().join("lecture_trimmed.m4a")));
        assert_eq!(second, OutputTarget::Renamed(dir.path().join("lecture_trimmed_1.m4a")));
        assert_eq!(reservations.len(), 2);

        let reservations = OutputReservations::new();
        resolve("/rec/week1/lecture.m4a", ConflictPolicy::Overwrite, &reservations);
        let second = resolve("/rec/week2/lecture.m4a", ConflictPolicy::Overwrite, &reservations);
        assert_eq!(second, OutputTarget::Renamed(dir.path().join("lecture_trimmed_1.m4a")));

        let reservations = OutputReservations::new();
        resolve("/rec/week1/lecture.m4a", ConflictPolicy::Fail, &reservations);
        let second = resolve("/rec/week2/lecture.m4a", ConflictPolicy::Fail, &reservations);
        assert_eq!(second, OutputTarget::Conflict(dir.path().join("lecture_trimmed.m4a")));
        assert!(reservations.is_claimed(&dir.path().join("lecture_trimmed.m4a")));
        assert_eq!(reservations.len(), 1);
    }
}
