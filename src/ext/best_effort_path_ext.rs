use std::path::{Component, Path, PathBuf};

/// Renders a path for messages: canonical when it exists, otherwise an
/// absolute, lexically normalized form.
pub fn best_effort_path_display(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| normalize_path(&absolute(path)))
        .display()
        .to_string()
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|current_dir| current_dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Drops `.` segments and resolves `..` against the preceding segment,
/// without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .fold(Vec::new(), |mut kept: Vec<Component>, component| {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if matches!(kept.last(), Some(Component::Normal(_))) {
                        kept.pop();
                    }
                }
                other => kept.push(other),
            }
            kept
        })
        .iter()
        .collect()
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl BestEffortPathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

impl BestEffortPathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}
