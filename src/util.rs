use std::path::absolute;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;
use crate::ErrorExt as _;
use crate::Result;


/// Parse a decimal number captured from an assembly directive.
pub(crate) fn parse_num(text: &str) -> Result<usize> {
    text.parse::<usize>()
        .map_err(|_err| Error::with_malformed_number(format!("'{text}' is not a number")))
}

/// Lexically normalize a path, resolving `.` and `..` components without
/// consulting the file system.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(..)) => {
                    let _popped = result.pop();
                }
                // `..` at the root stays at the root.
                Some(Component::RootDir) | Some(Component::Prefix(..)) => (),
                _ => result.push(".."),
            },
            _ => result.push(component.as_os_str()),
        }
    }
    result
}

/// Make a path absolute (against the current working directory, if
/// necessary) and lexically normalize it.
pub(crate) fn absolutize(path: &Path) -> Result<PathBuf> {
    let abs = absolute(path)
        .map_err(Error::from)
        .with_context(|| format!("failed to make {} absolute", path.display()))?;
    Ok(normalize(&abs))
}


#[cfg(test)]
mod tests {
    use super::*;


    /// Exercise lexical normalization over the interesting cases.
    #[test]
    fn path_normalization() {
        let norm = |s: &str| normalize(Path::new(s));

        assert_eq!(norm("/a/b/../c"), PathBuf::from("/a/c"));
        assert_eq!(norm("/a/./b/"), PathBuf::from("/a/b"));
        assert_eq!(norm("/a/../../b"), PathBuf::from("/b"));
        assert_eq!(norm("a/../b"), PathBuf::from("b"));
        assert_eq!(norm("../a"), PathBuf::from("../a"));
        assert_eq!(
            norm("/proj/./inner/header.hpp"),
            PathBuf::from("/proj/inner/header.hpp")
        );
    }

    /// Check that absolutized paths come out normalized.
    #[test]
    fn absolutization() {
        let abs = absolutize(Path::new("/proj/x/../source.cpp")).unwrap();
        assert_eq!(abs, PathBuf::from("/proj/source.cpp"));

        let rel = absolutize(Path::new("source.cpp")).unwrap();
        assert!(rel.is_absolute());
        assert!(rel.ends_with("source.cpp"));
    }

    /// Numbers parse, everything else reports `MalformedNumber`.
    #[test]
    fn number_parsing() {
        use crate::ErrorKind;

        assert_eq!(parse_num("42").unwrap(), 42);
        assert_eq!(
            parse_num("99999999999999999999999999").unwrap_err().kind(),
            ErrorKind::MalformedNumber
        );
    }
}
