use std::path::PathBuf;

use walkdir::WalkDir;

/// Expand `paths` into files: directories are walked in name order, keeping files
/// with one of `extensions`, hidden entries are skipped. Files given directly are
/// always kept.
pub(crate) fn get_all_files(paths: &[PathBuf], extensions: &[&str]) -> Vec<PathBuf> {
    paths
        .iter()
        .flat_map(move |path| {
            if path.is_dir() {
                WalkDir::new(path)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|e| {
                        e.file_name()
                            .to_str()
                            .map(|s| !s.starts_with("."))
                            .unwrap_or(false)
                    })
                    .filter_map(Result::ok)
                    .filter(|e| e.path().is_file())
                    .filter(|e| {
                        e.path()
                            .extension()
                            .and_then(|ext| ext.to_str())
                            .is_some_and(|ext| extensions.iter().any(|x| ext.eq_ignore_ascii_case(x)))
                    })
                    .map(|e| e.path().to_path_buf())
                    .collect::<Vec<_>>()
            } else if path.is_file() {
                vec![path.clone()]
            } else {
                Vec::new()
            }
        })
        .collect()
}
