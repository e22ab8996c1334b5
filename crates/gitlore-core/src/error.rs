/// Errors that can occur while mining a repository.
///
/// Library crates use this type directly; it is also a `miette`
/// diagnostic so the binary can report it with help text.
///
/// # Examples
///
/// ```
/// use gitlore_core::GitloreError;
///
/// let err = GitloreError::RepositoryNotFound { path: "/tmp/nope".into() };
/// assert!(err.to_string().contains("/tmp/nope"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum GitloreError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(gitlore::config))]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// No repository at the given path, or it could not be read.
    #[error("repository not found: {path}")]
    #[diagnostic(
        code(gitlore::repository_not_found),
        help("pass the path of a git working tree or bare repository")
    )]
    RepositoryNotFound {
        /// The path that was opened.
        path: String,
    },

    /// A branch, tag or HEAD that could not be resolved to a commit.
    #[error("invalid commit reference: {reference}")]
    #[diagnostic(
        code(gitlore::invalid_reference),
        help("check the branch name, or commit something if the repository is empty")
    )]
    InvalidReference {
        /// The reference that failed to resolve.
        reference: String,
    },

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<git2::Error> for GitloreError {
    fn from(err: git2::Error) -> Self {
        GitloreError::Git(err.message().to_string())
    }
}
