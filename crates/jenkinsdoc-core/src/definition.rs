//! Best-effort go-to-definition for Groovy functions.
//!
//! There is no Groovy parser here. A declaration is anything that looks like
//! a type (or `def`) followed by the function name, a brace-free argument
//! list and an opening brace. Project files are found by walking the
//! workspace roots; walks are cached per root for a short time so repeated
//! hovers do not re-walk large trees.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::DEFAULT_GOTO_CACHE_TTL_SECS;
use crate::fs::FileSystem;

/// Extension of the files searched for declarations.
pub const SOURCE_EXTENSION: &str = "groovy";

const GOTO_SCHEME: &str = "goto:";

/// What the user asked to navigate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionTarget {
    /// `helper`: a function in the current file, or a file named `helper.groovy`
    Bare(String),
    /// `lib.helper`: function `helper` inside `lib.groovy`
    Qualified {
        file_name: String,
        function_name: String,
    },
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

impl DefinitionTarget {
    /// Parse `name` or `file.name`. Anything else is rejected.
    pub fn parse(text: &str) -> Option<Self> {
        match text.split_once('.') {
            None if is_identifier(text) => Some(Self::Bare(text.to_string())),
            Some((file_name, function_name))
                if is_identifier(file_name) && is_identifier(function_name) =>
            {
                Some(Self::Qualified {
                    file_name: file_name.to_string(),
                    function_name: function_name.to_string(),
                })
            }
            _ => None,
        }
    }

    /// The `goto:file:function` (or `goto:name`) link offered in hover popups.
    pub fn goto_link(&self) -> String {
        match self {
            Self::Bare(name) => format!("{GOTO_SCHEME}{name}"),
            Self::Qualified {
                file_name,
                function_name,
            } => format!("{GOTO_SCHEME}{file_name}:{function_name}"),
        }
    }

    /// Inverse of [`DefinitionTarget::goto_link`].
    pub fn parse_goto_link(href: &str) -> Option<Self> {
        let rest = href.strip_prefix(GOTO_SCHEME)?;
        let parts: Vec<&str> = rest.split(':').collect();
        match parts.as_slice() {
            [name] if is_identifier(name) => Some(Self::Bare(name.to_string())),
            [file_name, function_name]
                if is_identifier(file_name) && is_identifier(function_name) =>
            {
                Some(Self::Qualified {
                    file_name: file_name.to_string(),
                    function_name: function_name.to_string(),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for DefinitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare(name) => f.write_str(name),
            Self::Qualified {
                file_name,
                function_name,
            } => write!(f, "{file_name}.{function_name}"),
        }
    }
}

/// Where to look: the open document and the workspace roots.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchScope<'a> {
    pub current_text: Option<&'a str>,
    pub roots: &'a [PathBuf],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionFile {
    /// The document the request came from
    Current,
    Path(PathBuf),
}

/// A found definition; `line` is 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: DefinitionFile,
    pub line: usize,
}

/// Why navigation found nothing. The message is shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionMiss {
    #[error("No project folder open")]
    NoProjectFolder,

    #[error("File not found: {file_name}.groovy")]
    FileNotFound { file_name: String },

    #[error("Definition not found: {function_name} in {file_name}.groovy")]
    DefinitionNotFound {
        function_name: String,
        file_name: String,
    },
}

fn declaration_pattern(function_name: &str) -> Option<Regex> {
    let pattern = format!(
        r"(?s)\b(?:def|void|String|int|boolean|Object|[\w<>]+)\s+{}\s*\([^{{}}]*?\)\s*\{{",
        regex::escape(function_name)
    );
    Regex::new(&pattern).ok()
}

/// 0-based line of the first declaration of `function_name` in `text`.
pub fn find_declaration(text: &str, function_name: &str) -> Option<usize> {
    let found = declaration_pattern(function_name)?.find(text)?;
    Some(text[..found.start()].matches('\n').count())
}

#[derive(Debug, Clone)]
struct CachedListing {
    files: Arc<[PathBuf]>,
    fetched_at: Instant,
}

/// Per-root file listings with time-based expiry.
#[derive(Debug)]
pub struct FileListingCache {
    ttl: Duration,
    entries: Mutex<HashMap<PathBuf, CachedListing>>,
}

impl FileListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached listing for `root`, or a fresh one from `list` when the entry
    /// is missing or older than the TTL.
    pub fn get_or_refresh<F>(&self, root: &Path, list: F) -> Arc<[PathBuf]>
    where
        F: FnOnce() -> Vec<PathBuf>,
    {
        {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = entries.get(root) {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Arc::clone(&cached.files);
                }
            }
        }

        let files: Arc<[PathBuf]> = list().into();
        tracing::debug!(root = %root.display(), count = files.len(), "refreshed file listing");
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            root.to_path_buf(),
            CachedListing {
                files: Arc::clone(&files),
                fetched_at: Instant::now(),
            },
        );
        files
    }

    /// Drop every cached listing.
    pub fn invalidate(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Finds Groovy function declarations in the current document and project files.
#[derive(Debug)]
pub struct DefinitionLocator {
    fs: Arc<dyn FileSystem>,
    cache: FileListingCache,
}

impl DefinitionLocator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            cache: FileListingCache::new(Duration::from_secs(DEFAULT_GOTO_CACHE_TTL_SECS)),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = FileListingCache::new(ttl);
        self
    }

    pub fn cache(&self) -> &FileListingCache {
        &self.cache
    }

    pub fn locate(
        &self,
        target: &DefinitionTarget,
        scope: &SearchScope<'_>,
    ) -> Result<Location, DefinitionMiss> {
        match target {
            DefinitionTarget::Bare(name) => self.locate_bare(name, scope),
            DefinitionTarget::Qualified {
                file_name,
                function_name,
            } => self.locate_qualified(file_name, function_name, scope),
        }
    }

    fn project_files(&self, root: &Path) -> Arc<[PathBuf]> {
        self.cache
            .get_or_refresh(root, || self.fs.list_files(root, SOURCE_EXTENSION))
    }

    fn files_named<'r>(
        &'r self,
        roots: &'r [PathBuf],
        stem: &'r str,
    ) -> impl Iterator<Item = PathBuf> + 'r {
        roots.iter().flat_map(move |root| {
            self.project_files(root)
                .iter()
                .filter(|path| path.file_stem().and_then(|s| s.to_str()) == Some(stem))
                .cloned()
                .collect::<Vec<_>>()
        })
    }

    fn locate_bare(&self, name: &str, scope: &SearchScope<'_>) -> Result<Location, DefinitionMiss> {
        if let Some(line) = scope.current_text.and_then(|text| find_declaration(text, name)) {
            return Ok(Location {
                file: DefinitionFile::Current,
                line,
            });
        }
        if scope.roots.is_empty() {
            return Err(DefinitionMiss::NoProjectFolder);
        }

        self.files_named(scope.roots, name)
            .next()
            .map(|path| Location {
                file: DefinitionFile::Path(path),
                line: 0,
            })
            .ok_or_else(|| DefinitionMiss::FileNotFound {
                file_name: name.to_string(),
            })
    }

    fn locate_qualified(
        &self,
        file_name: &str,
        function_name: &str,
        scope: &SearchScope<'_>,
    ) -> Result<Location, DefinitionMiss> {
        if scope.roots.is_empty() {
            return Err(DefinitionMiss::NoProjectFolder);
        }

        let mut saw_file = false;
        for path in self.files_named(scope.roots, file_name) {
            saw_file = true;
            let content = match self.fs.read_file(&path) {
                Ok(content) => content,
                Err(error) => {
                    tracing::debug!(path = %path.display(), %error, "skipping unreadable file");
                    continue;
                }
            };
            if let Some(line) = find_declaration(&content, function_name) {
                return Ok(Location {
                    file: DefinitionFile::Path(path),
                    line,
                });
            }
        }

        if saw_file {
            Err(DefinitionMiss::DefinitionNotFound {
                function_name: function_name.to_string(),
                file_name: file_name.to_string(),
            })
        } else {
            Err(DefinitionMiss::FileNotFound {
                file_name: file_name.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn locator_over(mock: MockFileSystem) -> (DefinitionLocator, Arc<MockFileSystem>) {
        let fs = Arc::new(mock);
        (DefinitionLocator::new(fs.clone()), fs)
    }

    fn project() -> MockFileSystem {
        let mut mock = MockFileSystem::new();
        mock.add_file(
            "/ws/vars/lib.groovy",
            "// helpers\n\ndef other() {\n}\n\nString helper(String name, int n) {\n  return name\n}\n",
        );
        mock.add_file("/ws/vars/deploy.groovy", "def call() {}\n");
        mock
    }

    #[test]
    fn test_parse_targets() {
        assert_eq!(
            DefinitionTarget::parse("myFunc"),
            Some(DefinitionTarget::Bare("myFunc".to_string()))
        );
        assert_eq!(
            DefinitionTarget::parse("lib.helper"),
            Some(DefinitionTarget::Qualified {
                file_name: "lib".to_string(),
                function_name: "helper".to_string(),
            })
        );
        assert_eq!(DefinitionTarget::parse("a.b.c"), None);
        assert_eq!(DefinitionTarget::parse(".x"), None);
        assert_eq!(DefinitionTarget::parse("has space"), None);
        assert_eq!(DefinitionTarget::parse(""), None);
    }

    #[test]
    fn test_goto_link_round_trip() {
        let qualified = DefinitionTarget::parse("lib.helper").unwrap();
        assert_eq!(qualified.goto_link(), "goto:lib:helper");
        assert_eq!(qualified.to_string(), "lib.helper");
        assert_eq!(
            DefinitionTarget::parse_goto_link("goto:lib:helper"),
            Some(qualified)
        );
        assert_eq!(
            DefinitionTarget::parse_goto_link("goto:deploy"),
            Some(DefinitionTarget::Bare("deploy".to_string()))
        );
        assert_eq!(DefinitionTarget::parse_goto_link("https://x"), None);
        assert_eq!(DefinitionTarget::parse_goto_link("goto:a:b:c"), None);
    }

    #[test]
    fn test_find_declaration_line_numbers() {
        assert_eq!(find_declaration("def myFunc() {\n  echo 'x'\n}", "myFunc"), Some(0));
        assert_eq!(
            find_declaration("\n\nvoid run(Map args) {\n}", "run"),
            Some(2)
        );
        assert_eq!(
            find_declaration("List<String> names(\n  a,\n  b\n) {\n}", "names"),
            Some(0)
        );
        assert_eq!(find_declaration("myFunc()\n", "myFunc"), None);
        assert_eq!(find_declaration("def myFunc(x = { 1 }) {}", "myFunc"), None);
    }

    #[test]
    fn test_find_declaration_escapes_name() {
        assert_eq!(find_declaration("def a() {}", "a.*"), None);
    }

    #[test]
    fn test_bare_found_in_current_document() {
        let (locator, _) = locator_over(MockFileSystem::new());
        let scope = SearchScope {
            current_text: Some("def myFunc() {\n  echo 'x'\n}"),
            roots: &[],
        };
        let found = locator
            .locate(&DefinitionTarget::parse("myFunc").unwrap(), &scope)
            .unwrap();
        assert_eq!(
            found,
            Location {
                file: DefinitionFile::Current,
                line: 0
            }
        );
    }

    #[test]
    fn test_bare_falls_back_to_file_by_stem() {
        let (locator, _) = locator_over(project());
        let roots = [PathBuf::from("/ws")];
        let scope = SearchScope {
            current_text: Some("deploy()\n"),
            roots: &roots,
        };
        let found = locator
            .locate(&DefinitionTarget::Bare("deploy".to_string()), &scope)
            .unwrap();
        assert_eq!(
            found.file,
            DefinitionFile::Path(PathBuf::from("/ws/vars/deploy.groovy"))
        );
        assert_eq!(found.line, 0);
    }

    #[test]
    fn test_bare_misses() {
        let (locator, _) = locator_over(project());
        let target = DefinitionTarget::Bare("nothing".to_string());

        let no_roots = SearchScope {
            current_text: Some(""),
            roots: &[],
        };
        assert_eq!(
            locator.locate(&target, &no_roots),
            Err(DefinitionMiss::NoProjectFolder)
        );

        let roots = [PathBuf::from("/ws")];
        let scope = SearchScope {
            current_text: None,
            roots: &roots,
        };
        let miss = locator.locate(&target, &scope).unwrap_err();
        assert_eq!(miss.to_string(), "File not found: nothing.groovy");
    }

    #[test]
    fn test_qualified_found_in_named_file() {
        let (locator, _) = locator_over(project());
        let roots = [PathBuf::from("/ws")];
        let scope = SearchScope {
            current_text: None,
            roots: &roots,
        };
        let found = locator
            .locate(&DefinitionTarget::parse("lib.helper").unwrap(), &scope)
            .unwrap();
        assert_eq!(
            found,
            Location {
                file: DefinitionFile::Path(PathBuf::from("/ws/vars/lib.groovy")),
                line: 5,
            }
        );
    }

    #[test]
    fn test_qualified_without_file_is_not_found() {
        let (locator, _) = locator_over(project());
        let roots = [PathBuf::from("/ws")];
        let scope = SearchScope {
            current_text: Some("def helper() {}"),
            roots: &roots,
        };
        let miss = locator
            .locate(&DefinitionTarget::parse("util.helper").unwrap(), &scope)
            .unwrap_err();
        assert_eq!(
            miss,
            DefinitionMiss::FileNotFound {
                file_name: "util".to_string()
            }
        );
    }

    #[test]
    fn test_qualified_requires_exact_stem() {
        let mut mock = MockFileSystem::new();
        mock.add_file("/ws/mylib.groovy", "def helper() {}");
        let (locator, _) = locator_over(mock);
        let roots = [PathBuf::from("/ws")];
        let scope = SearchScope {
            current_text: None,
            roots: &roots,
        };
        assert!(locator
            .locate(&DefinitionTarget::parse("lib.helper").unwrap(), &scope)
            .is_err());
    }

    #[test]
    fn test_qualified_missing_function_message() {
        let (locator, _) = locator_over(project());
        let roots = [PathBuf::from("/ws")];
        let scope = SearchScope {
            current_text: None,
            roots: &roots,
        };
        let miss = locator
            .locate(&DefinitionTarget::parse("lib.absent").unwrap(), &scope)
            .unwrap_err();
        assert_eq!(miss.to_string(), "Definition not found: absent in lib.groovy");
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let mut mock = MockFileSystem::new();
        mock.add_unreadable_file("/a/lib.groovy");
        mock.add_file("/b/lib.groovy", "\ndef helper() {\n}");
        let (locator, _) = locator_over(mock);
        let roots = [PathBuf::from("/a"), PathBuf::from("/b")];
        let scope = SearchScope {
            current_text: None,
            roots: &roots,
        };
        let found = locator
            .locate(&DefinitionTarget::parse("lib.helper").unwrap(), &scope)
            .unwrap();
        assert_eq!(found.file, DefinitionFile::Path(PathBuf::from("/b/lib.groovy")));
        assert_eq!(found.line, 1);
    }

    #[test]
    fn test_listing_is_cached_per_root() {
        let (locator, fs) = locator_over(project());
        let roots = [PathBuf::from("/ws")];
        let scope = SearchScope {
            current_text: None,
            roots: &roots,
        };
        let target = DefinitionTarget::parse("lib.helper").unwrap();

        locator.locate(&target, &scope).unwrap();
        locator.locate(&target, &scope).unwrap();
        assert_eq!(fs.list_calls(), 1);

        locator.cache().invalidate();
        locator.locate(&target, &scope).unwrap();
        assert_eq!(fs.list_calls(), 2);
    }

    #[test]
    fn test_expired_listing_is_refreshed() {
        let fs = Arc::new(project());
        let locator = DefinitionLocator::new(fs.clone()).with_cache_ttl(Duration::ZERO);
        let roots = [PathBuf::from("/ws")];
        let scope = SearchScope {
            current_text: None,
            roots: &roots,
        };
        let target = DefinitionTarget::parse("lib.helper").unwrap();

        locator.locate(&target, &scope).unwrap();
        locator.locate(&target, &scope).unwrap();
        assert_eq!(fs.list_calls(), 2);
        assert_eq!(locator.cache().ttl(), Duration::ZERO);
    }
}
