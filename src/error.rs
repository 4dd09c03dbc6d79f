use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    UnsupportedUri(String),

    #[error("Contents found at {uri} resolved to the content hash {actual} \
             which doesn't match the uri content hash of {expected}.")]
    IntegrityMismatch {
        uri: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Installation conflict: A directory or file already exists at the install location \
             for the package '{package_name}' aliased to '{alias}' on the filesystem at {}.",
             .path.display())]
    InstallConflict {
        package_name: String,
        alias: String,
        path: PathBuf,
    },

    #[error("{} was not found in {} directory tree.", .parent.display(), .child.display())]
    PathTraversal { parent: PathBuf, child: PathBuf },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("{0} is not a valid package name. Aliases must match ^[a-z][-a-z0-9]{{0,255}}$.")]
    InvalidAlias(String),

    #[error("Contents of {0} are not valid UTF-8 text")]
    InvalidUtf8(String),

    #[error("{0}")]
    Other(String),
}
