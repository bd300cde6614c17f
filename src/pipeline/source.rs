// src/pipeline/source.rs

//! Glob resolution: turn ordered input patterns into assets.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::pipeline::Asset;

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// One input pattern, split into its static base and its matcher.
#[derive(Debug, Clone)]
pub struct SourceGlob {
    pattern: String,
    base: String,
    literal: bool,
    matcher: Option<GlobMatcher>,
}

impl SourceGlob {
    /// Parse a pattern. Malformed patterns are kept but match nothing.
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.trim_start_matches("./").to_string();
        let (base, literal) = glob_base(&pattern);

        let matcher = match GlobBuilder::new(&pattern).literal_separator(true).build() {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(err) => {
                warn!(pattern = %pattern, error = %err, "malformed glob; it will match nothing");
                None
            }
        };

        Self {
            pattern,
            base,
            literal,
            matcher,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Leading directory with no glob metacharacters.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_literal(&self) -> bool {
        self.literal
    }

    /// Does a project-relative, `/`-separated path match?
    pub fn is_match(&self, rel: &str) -> bool {
        match &self.matcher {
            Some(m) => m.is_match(rel),
            None => false,
        }
    }

    /// Path of `rel` below this glob's base.
    pub fn relative_to_base<'a>(&self, rel: &'a str) -> &'a str {
        if self.base.is_empty() {
            return rel;
        }
        rel.strip_prefix(self.base.as_str())
            .and_then(|r| r.strip_prefix('/'))
            .unwrap_or(rel)
    }

    /// Every matching file below `root`, sorted by path.
    fn matches(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<String>> {
        if self.matcher.is_none() {
            return Ok(Vec::new());
        }

        if self.literal {
            let path = root.join(&self.pattern);
            return Ok(if fs.is_file(&path) {
                vec![self.pattern.clone()]
            } else {
                Vec::new()
            });
        }

        let start = if self.base.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&self.base)
        };
        if !fs.is_dir(&start) {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for file in walk_files(fs, &start)? {
            if let Some(rel) = project_relative(root, &file) {
                if self.is_match(&rel) {
                    found.push(rel);
                }
            }
        }
        found.sort();
        Ok(found)
    }
}

/// Split a pattern into its static base and whether it is a literal path.
///
/// `src/assets/scss/**/*.scss` has base `src/assets/scss`; the literal
/// `src/assets/js/scripts.js` has its parent as base.
pub fn glob_base(pattern: &str) -> (String, bool) {
    let components: Vec<&str> = pattern.split('/').collect();
    let first_meta = components
        .iter()
        .position(|c| c.contains(|ch| GLOB_META.contains(&ch)));

    match first_meta {
        Some(idx) => (components[..idx].join("/"), false),
        None => {
            let parent = &components[..components.len().saturating_sub(1)];
            (parent.join("/"), true)
        }
    }
}

/// A resolved input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Project-relative path, `/`-separated.
    pub origin: String,
    /// Path below the matching glob's base.
    pub relative: String,
}

/// Resolve ordered pattern groups.
///
/// Groups are concatenated in order, each sorted, and a file appears once.
/// A file named literally by one group is never taken by a wildcard group,
/// so the literal keeps its declared position.
pub fn resolve(fs: &dyn FileSystem, root: &Path, patterns: &[String]) -> Result<Vec<SourceFile>> {
    let globs: Vec<SourceGlob> = patterns.iter().map(|p| SourceGlob::new(p)).collect();

    let reserved: HashSet<&str> = globs
        .iter()
        .filter(|g| g.is_literal())
        .map(|g| g.pattern())
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for glob in &globs {
        let matches = glob.matches(fs, root)?;
        debug!(pattern = %glob.pattern(), files = matches.len(), "resolved glob");

        for origin in matches {
            if !glob.is_literal() && reserved.contains(origin.as_str()) {
                continue;
            }
            if !seen.insert(origin.clone()) {
                continue;
            }
            let relative = glob.relative_to_base(&origin).to_string();
            out.push(SourceFile { origin, relative });
        }
    }

    Ok(out)
}

/// Resolve and read every matching file into an asset.
pub fn read_assets(fs: &dyn FileSystem, root: &Path, patterns: &[String]) -> Result<Vec<Asset>> {
    resolve(fs, root, patterns)?
        .into_iter()
        .map(|file| {
            let contents = fs.read(&root.join(&file.origin))?;
            Ok(Asset::new(file.relative, file.origin, contents))
        })
        .collect()
}

fn walk_files(fs: &dyn FileSystem, start: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![start.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in fs.read_dir(&dir)? {
            if fs.is_dir(&entry) {
                stack.push(entry);
            } else if fs.is_file(&entry) {
                files.push(entry);
            }
        }
    }

    Ok(files)
}

fn project_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn base_stops_at_first_meta_component() {
        assert_eq!(glob_base("src/assets/scss/**/*.scss"), ("src/assets/scss".into(), false));
        assert_eq!(glob_base("src/assets/img/**/*.{png,jpg}"), ("src/assets/img".into(), false));
        assert_eq!(glob_base("src/assets/js/scripts.js"), ("src/assets/js".into(), true));
        assert_eq!(glob_base("*.html"), (String::new(), false));
    }

    #[test]
    fn star_does_not_cross_directories() {
        let glob = SourceGlob::new("src/views/*.html");
        assert!(glob.is_match("src/views/index.html"));
        assert!(!glob.is_match("src/views/partials/nav.html"));
    }

    #[test]
    fn literal_files_keep_their_declared_position() {
        let fs = MockFileSystem::new();
        let root = Path::new(".");
        fs.add_file(root.join("src/app/app.module.js"), "m");
        fs.add_file(root.join("src/app/app.templates.js"), "t");
        fs.add_file(root.join("src/app/components/a/a.js"), "a");
        fs.add_file(root.join("src/app/components/b/b.js"), "b");

        let patterns = vec![
            "src/app/app.module.js".to_string(),
            "src/app/**/**/*.js".to_string(),
            "src/app/app.templates.js".to_string(),
        ];
        let files = resolve(&fs, root, &patterns).unwrap();
        let origins: Vec<&str> = files.iter().map(|f| f.origin.as_str()).collect();

        assert_eq!(
            origins,
            [
                "src/app/app.module.js",
                "src/app/components/a/a.js",
                "src/app/components/b/b.js",
                "src/app/app.templates.js",
            ]
        );
        assert_eq!(files[1].relative, "components/a/a.js");
    }

    #[test]
    fn malformed_and_empty_globs_match_nothing() {
        let fs = MockFileSystem::new();
        let root = Path::new(".");
        let files = resolve(
            &fs,
            root,
            &["src/[broken/*.js".to_string(), "src/missing/**/*.js".to_string()],
        )
        .unwrap();
        assert!(files.is_empty());
    }
}
