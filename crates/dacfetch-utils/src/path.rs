use std::{
    env,
    path::{Path, PathBuf},
};

use crate::error::{PathError, PathResult};

/// Returns the user's home directory.
///
/// Checks `HOME` first and `USERPROFILE` second, falling back to the current
/// directory when neither is set.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolves `path` against `base` unless it is already absolute.
pub fn resolve_relative_to(base: &Path, path: &str) -> PathResult<PathBuf> {
    let path = path.trim();

    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let path_buf = PathBuf::from(path);
    if path_buf.is_absolute() {
        Ok(path_buf)
    } else {
        Ok(base.join(path_buf))
    }
}

/// Makes `path` absolute using the current working directory.
pub fn absolute(path: &Path) -> PathResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|err| PathError::CurrentDir { source: err })
}

/// Expands `%VAR%` references using the process environment.
///
/// `%%` is kept as a literal `%`.
///
/// # Errors
///
/// * [`PathError::MissingEnvVar`] if a referenced variable is not set
/// * [`PathError::UnclosedVariable`] if a `%` has no closing `%`
pub fn expand_percent_vars(input: &str) -> PathResult<String> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('%') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(end) = after.find('%') else {
            return Err(PathError::UnclosedVariable {
                input: rest[start..].to_string(),
            });
        };

        let var_name = &after[..end];
        if var_name.is_empty() {
            result.push('%');
        } else {
            let value = env::var(var_name).map_err(|_| {
                PathError::MissingEnvVar {
                    var: var_name.into(),
                    input: input.into(),
                }
            })?;
            result.push_str(&value);
        }

        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Returns `true` if the file extension of `path` equals `extension`,
/// ignoring ASCII case. `extension` is given without the leading dot.
pub fn has_extension<P: AsRef<Path>>(path: P, extension: &str) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Walks from `start` up through its ancestors and returns the first
/// directory for which `predicate` holds.
pub fn find_ancestor<F>(start: &Path, mut predicate: F) -> Option<PathBuf>
where
    F: FnMut(&Path) -> bool,
{
    start
        .ancestors()
        .filter(|dir| !dir.as_os_str().is_empty())
        .find(|dir| predicate(dir))
        .map(Path::to_path_buf)
}
