use anyhow::{Context, Result};
use regex::Regex;
use std::fmt;

/// A regex that only matches when it covers the entire input string.
///
/// Asset names and archive entry names are always compared against the whole name. A pattern like
/// `foo\.zip` must not match `old-foo.zip.sha256`.
#[derive(Clone, Debug)]
pub struct FullMatch {
    pattern: String,
    re: Regex,
}

impl FullMatch {
    /// Compiles `pattern` so that it must match the whole input.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self> {
        let re = Regex::new(&format!("^(?:{pattern})$"))
            .with_context(|| format!("`{pattern}` is not a valid regex"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            re,
        })
    }

    // The caller guarantees that `re` is anchored at both ends.
    pub(crate) fn from_anchored(re: &Regex) -> Self {
        Self {
            pattern: re.as_str().to_string(),
            re: re.clone(),
        }
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.re.is_match(name)
    }

    /// The pattern as it was given, without the added anchors.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for FullMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::exact(r"foo\.zip", "foo.zip", true)]
    #[case::prefix_is_not_enough(r"foo", "foo.zip", false)]
    #[case::suffix_is_not_enough(r"\.zip", "foo.zip", false)]
    #[case::alternation_is_grouped(r"foo|bar", "foobar", false)]
    #[case::alternation_second_branch(r"foo|bar", "bar", true)]
    #[case::already_anchored(r"^foo\.zip$", "foo.zip", true)]
    fn full_match(
        #[case] pattern: &str,
        #[case] name: &str,
        #[case] expect: bool,
    ) -> Result<()> {
        let m = FullMatch::new(pattern)?;
        assert_eq!(m.is_match(name), expect, "{pattern} vs {name}");
        Ok(())
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let err = FullMatch::new("foo(").unwrap_err();
        assert!(err.to_string().contains("foo("), "{err}");
    }

    #[test]
    fn pattern_is_reported_without_anchors() -> Result<()> {
        let m = FullMatch::new(r"a\d+")?;
        assert_eq!(m.pattern(), r"a\d+");
        assert_eq!(m.to_string(), r"a\d+");
        Ok(())
    }
}
