//! Helpers for apiVersion strings

/// Join a group and a version into an apiVersion string.
///
/// The core group is empty, so its apiVersion is the bare version.
pub fn api_version(group: &str, version: &str) -> String {
    if group.is_empty() {
        version.to_string()
    } else {
        format!("{group}/{version}")
    }
}

/// Split an apiVersion string into its group and version halves.
///
/// Never fails; a string without a slash is a core group version.
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.rsplit_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_api_versions() {
        assert_eq!(api_version("teach.me.how", "v2"), "teach.me.how/v2");
        assert_eq!(api_version("", "v1"), "v1");
    }

    #[test]
    fn splits_api_versions() {
        assert_eq!(split_api_version("teach.me.how/v2"), ("teach.me.how", "v2"));
        assert_eq!(split_api_version("v1"), ("", "v1"));
        assert_eq!(split_api_version("a/b/v3"), ("a/b", "v3"));
    }
}
