use std::{convert::Infallible, str::FromStr};

/// Token that makes an [`AllowList`] match any non-empty subject.
pub const WILDCARD: &str = "*";

/// An immutable list of permitted string values, configured once at process
/// start. Comparison is exact, byte for byte; no normalization, no
/// case-folding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowList(Vec<String>);

impl AllowList {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList(items.into_iter().map(Into::into).collect())
    }

    /// Membership test of `subject` against the list.
    ///
    /// An empty subject never matches, not even against the `"*"` wildcard:
    /// an unspecified request field must never put a request in scope.
    pub fn matches(&self, subject: &str) -> bool {
        if subject.is_empty() {
            return false;
        }
        self.0.iter().any(|item| item == subject || item == WILDCARD)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for AllowList {
    type Err = Infallible;

    /// Builds the list from the comma-separated form used on the
    /// configuration surface. Blank tokens are discarded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AllowList(
            s.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(String::from)
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case::empty_subject_empty_list("", vec![], false)]
    #[case::empty_subject_wildcard("", vec!["*"], false)]
    #[case::empty_subject_verbatim("", vec![""], false)]
    #[case::empty_list("pods", vec![], false)]
    #[case::wildcard("pods", vec!["*"], true)]
    #[case::verbatim("pods", vec!["pods"], true)]
    #[case::other_token("pods", vec!["deployments"], false)]
    #[case::wildcard_among_others("pods", vec!["deployments", "*"], true)]
    #[case::case_sensitive("Pods", vec!["pods"], false)]
    fn matches(#[case] subject: &str, #[case] list: Vec<&str>, #[case] expected: bool) {
        let allow_list = AllowList::new(list);
        assert_eq!(allow_list.matches(subject), expected);
    }

    #[test]
    fn from_comma_separated_string() {
        let allow_list: AllowList = "apps, policy ,,batch".parse().unwrap();
        assert_eq!(allow_list, AllowList::new(["apps", "policy", "batch"]));

        let empty: AllowList = "".parse().unwrap();
        assert!(empty.is_empty());
    }
}
