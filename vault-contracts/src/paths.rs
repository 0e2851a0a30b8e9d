use vault_model::{Result, VaultError};

/// Rejects paths containing `..`, normalizes the rest, and returns a
/// forward-slash relative path guaranteed to stay within the vault root
/// (spec.md §4.4, `validate_path`). Every public Explorer/Catalog/Search
/// operation that takes a caller-supplied path must call this first, before
/// any cache, catalog, or index state is touched.
pub fn validate_path(raw: &str) -> Result<String> {
    if raw.split('/').any(|segment| segment == "..") {
        return Err(VaultError::invalid_path(raw));
    }

    let mut normalized = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            other => normalized.push(other),
        }
    }

    Ok(normalized.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_traversal() {
        assert!(validate_path("../etc/passwd").is_err());
        assert!(validate_path("folder1/../../etc").is_err());
    }

    #[test]
    fn normalizes_dot_and_empty_segments() {
        assert_eq!(validate_path("./folder1").unwrap(), "folder1");
        assert_eq!(validate_path("folder1//notes.md").unwrap(), "folder1/notes.md");
        assert_eq!(validate_path("").unwrap(), "");
    }
}
