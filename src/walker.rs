use std::path::{Path, PathBuf};

use log::debug;
use regex::RegexSet;

/// Render `path` relative to `root` as a forward-slash string for ignore
/// matching. Paths outside `root` are rendered in full.
pub fn relative_str(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let rendered = relative.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        rendered.into_owned()
    } else {
        rendered.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Walk a directory tree and collect every file not excluded by the ignored
/// path patterns.
///
/// Respects `.gitignore` rules via the `ignore` crate's standard filters,
/// even when the directory is not inside a git repository. Walk errors
/// (unreadable subtrees, broken symlinks) are logged and skipped.
pub fn collect_files(root: &Path, ignores: &RegexSet) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(true)
        // Read .gitignore files even outside a git repository so exclusions
        // work for standalone directories and testing scenarios.
        .require_git(false)
        .build();

    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                debug!("walk error under {}: {err}", root.display());
                continue;
            }
        };

        let path = entry.path();

        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }

        if ignores.is_match(&relative_str(root, path)) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::WatchOptions;
    use std::fs;
    use tempfile::TempDir;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    fn default_ignores() -> RegexSet {
        WatchOptions::default().ignore_set().expect("default ignores")
    }

    #[test]
    fn test_collect_files_skips_default_ignored_dirs() {
        let dir = tmp();
        let nm = dir.path().join("node_modules").join("pkg");
        fs::create_dir_all(&nm).unwrap();
        fs::write(nm.join("index.js"), "// agent hidden").unwrap();
        let vcs = dir.path().join(".git");
        fs::create_dir_all(&vcs).unwrap();
        fs::write(vcs.join("HEAD"), "ref: refs/heads/main").unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();

        let files = collect_files(dir.path(), &default_ignores());

        let names: Vec<String> = files
            .iter()
            .map(|f| relative_str(dir.path(), f))
            .collect();

        assert!(names.contains(&"main.rs".to_string()), "should find main.rs");
        assert!(
            !names.iter().any(|n| n.contains("node_modules")),
            "should not descend into node_modules"
        );
        assert!(
            !names.iter().any(|n| n.contains(".git")),
            "should not descend into .git"
        );
    }

    #[test]
    fn test_collect_files_respects_gitignore() {
        let dir = tmp();
        fs::write(dir.path().join(".gitignore"), "generated/\n").unwrap();
        let generated = dir.path().join("generated");
        fs::create_dir_all(&generated).unwrap();
        fs::write(generated.join("output.rs"), "// generated").unwrap();
        fs::write(dir.path().join("kept.rs"), "// kept").unwrap();

        let files = collect_files(dir.path(), &default_ignores());

        let names: Vec<String> = files
            .iter()
            .map(|f| relative_str(dir.path(), f))
            .collect();

        assert!(names.contains(&"kept.rs".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("generated/")));
    }

    #[test]
    fn test_relative_str_handles_paths_outside_root() {
        let root = PathBuf::from("/repo");
        assert_eq!(relative_str(&root, &root.join("src/lib.rs")), "src/lib.rs");
        assert_eq!(relative_str(&root, Path::new("/elsewhere/x")), "/elsewhere/x");
    }
}
