use std::path::Path;

/// The file name of a path, or the whole path if it has none.
pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn display_path(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(
            simplify_file_name(Path::new("/data/regions.csv")),
            "regions.csv"
        );
        assert_eq!(simplify_file_name(Path::new("regions.csv")), "regions.csv");
        assert_eq!(simplify_file_name(Path::new("/")), "/");
    }
}
