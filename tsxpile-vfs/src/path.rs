//! Virtual path normalization
//!
//! Virtual paths always use forward slashes and are absolute once
//! normalized. Bare specifiers (package names) are left untouched; the
//! externals mechanism resolves those later, not path math.

/// Resolve `path` against the directory of `base_file`.
///
/// - Absolute paths (leading `/`) are returned unchanged.
/// - Relative paths (leading `.`) are resolved segment by segment: each
///   `../` pops one directory level off the base's directory stack, each
///   `./` is stripped, and the remainder is appended.
/// - Anything else is a bare specifier and is returned unchanged.
///
/// Popping past the root clamps at the root instead of producing a
/// malformed path.
pub fn normalize_path(path: &str, base_file: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    if !path.starts_with('.') {
        return path.to_string();
    }

    let mut stack: Vec<&str> = base_file.split('/').collect();
    stack.pop();

    let mut rest = path;
    loop {
        if let Some(stripped) = rest.strip_prefix("../") {
            // Keep the leading empty segment so the result stays absolute.
            if stack.len() > 1 {
                stack.pop();
            }
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else {
            break;
        }
    }
    stack.push(rest);
    stack.join("/")
}
