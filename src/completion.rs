//! Executable-name completion.
//!
//! Completion is split in two halves. A [`CandidateSource`] produces names that start
//! with the typed prefix; [`PathSearch`] does this by listing every directory on `PATH`.
//! [`CompletionResult`] then sorts and deduplicates those names, computes their longest
//! common prefix and tells the editor what to do with them through [`Completion`].
//! The second half never touches the filesystem.

use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::COMPLETION_INITIAL_CAPACITY;

/// Anything that can list completion candidates for a prefix.
pub trait CandidateSource {
    /// Returns every known name starting with `prefix`. Order and duplicates do not matter.
    fn candidates(&self, prefix: &str) -> Vec<String>;
}

/// Candidates from the executables on the live `PATH`.
///
/// `PATH` is read on every call, so changes to the environment are picked up
/// without rebuilding the editor.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathSearch;

impl PathSearch {
    pub fn new() -> Self {
        Self
    }
}

impl CandidateSource for PathSearch {
    fn candidates(&self, prefix: &str) -> Vec<String> {
        scan_dirs(search_dirs(), prefix)
    }
}

impl<S: AsRef<str>> CandidateSource for Vec<S> {
    fn candidates(&self, prefix: &str) -> Vec<String> {
        self.iter()
            .filter_map(|name| {
                let name: &str = name.as_ref();
                name.starts_with(prefix).then(|| name.to_string())
            })
            .collect()
    }
}

/// Directories named in `PATH`, in order. Empty components are skipped.
pub fn search_dirs() -> Vec<PathBuf> {
    match env::var_os("PATH") {
        Some(path) => env::split_paths(&path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Lists executable files whose name starts with `prefix` in each of `dirs`.
///
/// Unreadable directories are skipped. File names that are not valid UTF-8 are
/// skipped too, since they could never be typed into the line buffer.
pub fn scan_dirs<I, P>(dirs: I, prefix: &str) -> Vec<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut found = Vec::with_capacity(COMPLETION_INITIAL_CAPACITY);

    for dir in dirs {
        let dir = dir.as_ref();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable search directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with(prefix) && is_executable(&entry.path()) {
                found.push(name.to_string());
            }
        }
    }

    found
}

/// Returns `true` for a non-directory whose owner-execute bit is set.
///
/// Symlinks are followed, so a link to an executable counts as one.
pub fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => !meta.is_dir() && meta.permissions().mode() & 0o100 != 0,
        Err(_) => false,
    }
}

/// Finds the first executable called `name` on the live `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    search_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| is_executable(path))
}

/// Longest prefix shared by `a` and `b`, cut on a character boundary.
pub fn longest_common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((idx, _), _)| idx)
        .unwrap_or_else(|| a.len().min(b.len()));
    &a[..end]
}

/// What the editor should do after a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing matches. Ring the bell.
    NoMatch,
    /// Exactly one match. Append `suffix`, which ends with a separating space.
    Unique { suffix: String },
    /// Several matches sharing more than what is typed. Append `extension`.
    Extend { extension: String },
    /// Several matches and nothing to add. Bell first, then list.
    Ambiguous,
}

/// Sorted, deduplicated candidates for one prefix and their longest common prefix.
///
/// # Examples
///
/// ```
/// use rawsh::{Completion, CompletionResult};
///
/// let result = CompletionResult::new("gi", ["git", "gitk", "git"].map(String::from));
/// assert_eq!(result.candidates(), ["git", "gitk"]);
/// assert_eq!(result.common_prefix(), "git");
/// assert_eq!(result.classify(), Completion::Extend { extension: "t".into() });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    prefix: String,
    candidates: Vec<String>,
    common_prefix: String,
}

impl CompletionResult {
    /// Builds the result for `prefix` from unordered, possibly repeated names.
    ///
    /// Names that do not start with `prefix` are dropped.
    pub fn new<I>(prefix: &str, names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut candidates: Vec<String> = names
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        // After sorting, the first and last names bound the prefix shared by all of them.
        let common_prefix = match (candidates.first(), candidates.last()) {
            (Some(first), Some(last)) => longest_common_prefix(first, last).to_string(),
            _ => String::new(),
        };

        Self {
            prefix: prefix.to_string(),
            candidates,
            common_prefix,
        }
    }

    /// Scans `source` for `prefix` and builds the result.
    pub fn scan<C: CandidateSource + ?Sized>(source: &C, prefix: &str) -> Self {
        let result = Self::new(prefix, source.candidates(prefix));
        debug!(
            prefix,
            matches = result.len(),
            common_prefix = %result.common_prefix,
            "completion scan"
        );
        result
    }

    /// The prefix this result was built for.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Matching names in lexicographic order, without duplicates.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Longest prefix shared by every candidate; empty if there are none.
    pub fn common_prefix(&self) -> &str {
        &self.common_prefix
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Decides how the typed prefix can be completed.
    pub fn classify(&self) -> Completion {
        let typed = self.prefix.len();
        match self.candidates.as_slice() {
            [] => Completion::NoMatch,
            [only] => {
                let mut suffix = only[typed..].to_string();
                suffix.push(' ');
                Completion::Unique { suffix }
            }
            _ if self.common_prefix.len() > typed => Completion::Extend {
                extension: self.common_prefix[typed..].to_string(),
            },
            _ => Completion::Ambiguous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::fs::File;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn touch(dir: &Path, name: &str, mode: u32) {
        let path = dir.join(name);
        File::create(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn test_lcp() {
        assert_eq!(longest_common_prefix("gitk", "git"), "git");
        assert_eq!(longest_common_prefix("abc", "abd"), "ab");
        assert_eq!(longest_common_prefix("abc", "xyz"), "");
        assert_eq!(longest_common_prefix("", "abc"), "");
        assert_eq!(longest_common_prefix("same", "same"), "same");
        assert_eq!(longest_common_prefix("äb", "äc"), "ä");
    }

    #[test]
    fn test_result_sorts_and_dedups() {
        let result = CompletionResult::new("c", names(&["cut", "cat", "cut", "cp", "cat"]));
        assert_eq!(result.candidates(), names(&["cat", "cp", "cut"]).as_slice());
        assert_eq!(result.common_prefix(), "c");
    }

    #[test]
    fn test_result_filters_non_matching() {
        let result = CompletionResult::new("ls", names(&["ls", "cat", "lsblk"]));
        assert_eq!(result.candidates(), names(&["ls", "lsblk"]).as_slice());
    }

    #[test]
    fn test_classify_no_match() {
        let result = CompletionResult::new("zz", Vec::new());
        assert_eq!(result.classify(), Completion::NoMatch);
        assert_eq!(result.common_prefix(), "");
    }

    #[test]
    fn test_classify_unique() {
        let result = CompletionResult::new("ech", names(&["echo"]));
        assert_eq!(result.classify(), Completion::Unique { suffix: "o ".into() });
    }

    #[test]
    fn test_classify_unique_already_complete() {
        let result = CompletionResult::new("ls", names(&["ls"]));
        assert_eq!(result.classify(), Completion::Unique { suffix: " ".into() });
    }

    #[test]
    fn test_identical_matches_collapse_to_unique() {
        let result = CompletionResult::new("ca", names(&["cat", "cat", "cat"]));
        assert_eq!(result.len(), 1);
        assert_eq!(result.classify(), Completion::Unique { suffix: "t ".into() });
    }

    #[test]
    fn test_classify_extend() {
        let result = CompletionResult::new("xyz_", names(&["xyz_foo_bar", "xyz_foo_baz"]));
        assert_eq!(
            result.classify(),
            Completion::Extend { extension: "foo_ba".into() }
        );
    }

    #[test]
    fn test_classify_ambiguous() {
        let result = CompletionResult::new("", names(&["cat", "ls"]));
        assert_eq!(result.common_prefix(), "");
        assert_eq!(result.classify(), Completion::Ambiguous);

        let result = CompletionResult::new("git", names(&["git", "gitk"]));
        assert_eq!(result.classify(), Completion::Ambiguous);
    }

    #[test]
    fn test_vec_source() {
        let source = vec!["exit", "echo", "type"];
        let result = CompletionResult::scan(&source, "e");
        assert_eq!(result.candidates(), names(&["echo", "exit"]).as_slice());
    }

    #[test]
    fn test_scan_dirs_keeps_only_executables() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        touch(a.path(), "foo_run", 0o755);
        touch(a.path(), "foo_data", 0o644);
        fs::create_dir(a.path().join("foo_dir")).unwrap();
        touch(b.path(), "foo_run", 0o700);
        touch(b.path(), "foo_tool", 0o755);
        touch(b.path(), "bar", 0o755);

        let found = scan_dirs([a.path(), b.path()], "foo");
        let result = CompletionResult::new("foo", found);
        assert_eq!(result.candidates(), names(&["foo_run", "foo_tool"]).as_slice());
        assert_eq!(result.classify(), Completion::Extend { extension: "_".into() });
    }

    #[test]
    fn test_scan_dirs_skips_unreadable() {
        let a = tempfile::tempdir().unwrap();
        touch(a.path(), "only_here", 0o755);
        let missing = a.path().join("does-not-exist");

        let found = scan_dirs([missing.as_path(), a.path()], "only");
        assert_eq!(found, names(&["only_here"]));
    }

    #[test]
    #[serial]
    fn test_path_search_reads_live_path() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "rawsh_probe_tool", 0o755);

        let saved = env::var_os("PATH");
        env::set_var("PATH", dir.path());
        let hit = PathSearch::new().candidates("rawsh_probe");
        let exe = find_executable("rawsh_probe_tool");
        env::set_var("PATH", "");
        let miss = PathSearch::new().candidates("rawsh_probe");
        match saved {
            Some(path) => env::set_var("PATH", path),
            None => env::remove_var("PATH"),
        }

        assert_eq!(hit, names(&["rawsh_probe_tool"]));
        assert_eq!(exe, Some(dir.path().join("rawsh_probe_tool")));
        assert!(miss.is_empty());
    }
}
