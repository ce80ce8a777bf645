/// Application name used for data directories and temp prefixes.
pub const APP_NAME: &str = "artisan";

/// Project manifest file name.
pub const BUILD_FILE: &str = "build.yaml";

/// Ignore file name. Always excluded from archives.
pub const IGNORE_FILE: &str = ".buildignore";

/// Name of the synthetic profile wrapping an explicit target.
pub const CONTENT_ONLY_PROFILE: &str = "content-only";

/// Package type recorded for content-only packages.
pub const CONTENT_ONLY_TYPE: &str = "content/file";

/// Default domain for package names without one.
pub const DEFAULT_DOMAIN: &str = "artisan.library";

/// Default group for single segment package names.
pub const DEFAULT_GROUP: &str = "library";

/// Default package tag.
pub const DEFAULT_TAG: &str = "latest";

/// Number of commit hash characters embedded in a package id.
pub const SHORT_COMMIT_LEN: usize = 10;

/// Length of the random suffix ending every package id.
pub const ID_SUFFIX_LEN: usize = 8;

/// Builder-injected environment variables.
pub const ENV_REF: &str = "ARTISAN_REF";
pub const ENV_BUILD_PATH: &str = "ARTISAN_BUILD_PATH";
pub const ENV_GIT_COMMIT: &str = "ARTISAN_GIT_COMMIT";
pub const ENV_WORK_DIR: &str = "ARTISAN_WORK_DIR";
pub const ENV_FROM_URI: &str = "ARTISAN_FROM_URI";
