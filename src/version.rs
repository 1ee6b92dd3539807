//! Build identity reported by `genoscore version` and sent to the
//! prediction service.
//!
//! The git fields come from `build.rs`. They read "unknown" when the crate
//! is built outside a checkout, e.g. from a crates.io download.

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// Uncommitted changes were present when the binary was built.
pub fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// Human-readable build identity.
///
/// `0.1.0+main.abc1234` from a clean checkout, with `.dirty` appended when
/// the tree had local edits, and plain `0.1.0` when git was unavailable.
pub fn version_string() -> String {
    if GIT_SHA == "unknown" {
        return PKG_VERSION.to_string();
    }
    let short_sha = &GIT_SHA[..GIT_SHA.len().min(7)];
    let mut version = format!("{PKG_VERSION}+{GIT_BRANCH}.{short_sha}");
    if git_dirty() {
        version.push_str(".dirty");
    }
    version
}

/// `User-Agent` header value for requests to the prediction service.
pub fn user_agent() -> String {
    format!("genoscore/{PKG_VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_contains_pkg_version() {
        let version = version_string();
        assert!(
            version.starts_with(PKG_VERSION),
            "version should start with pkg version"
        );
    }

    #[test]
    fn version_string_mentions_branch_when_git_is_known() {
        let version = version_string();
        if GIT_SHA != "unknown" {
            assert!(version.contains(GIT_BRANCH));
        } else {
            assert_eq!(version, PKG_VERSION);
        }
    }

    #[test]
    fn user_agent_names_the_crate() {
        assert_eq!(user_agent(), format!("genoscore/{PKG_VERSION}"));
    }
}
