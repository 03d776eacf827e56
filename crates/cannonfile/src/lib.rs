//! Keeps the package version of `cannonfile.toml` in sync with the version
//! of the Node.js package in `package.json`. Meant to run in the project root
//! after `changeset version` bumped `package.json`.

use regex::{NoExpand, Regex};
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

pub const PACKAGE_JSON: &str = "package.json";
pub const CANNONFILE: &str = "cannonfile.toml";

// `version = ...` with the key optionally quoted, anywhere at the start of a line
static VERSION_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?mR)^[ \t]*(version|"version"|'version')[ \t]*=.*$"#)
        .expect("version regex is valid")
});

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no 'version' field found in package.json")]
    MissingPackageVersion,

    #[error("no 'version' expression found in cannonfile.toml")]
    MissingCannonfileVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    InSync { version: String },
    Updated { version: String },
}

/// Reads the `version` field of a `package.json` document.
pub fn package_version(package_json: &str) -> Result<String, serde_json::Error> {
    let package: serde_json::Value = serde_json::from_str(package_json)?;
    Ok(package
        .get("version")
        .and_then(|version| version.as_str())
        .unwrap_or_default()
        .to_string())
}

/// Replaces the first `version = ...` line. Returns `None` when there is
/// none.
pub fn replace_version(cannonfile: &str, version: &str) -> Option<String> {
    if !VERSION_EXPR.is_match(cannonfile) {
        return None;
    }

    let replacement = format!("version = \"{version}\"");
    Some(
        VERSION_EXPR
            .replace(cannonfile, NoExpand(&replacement))
            .into_owned(),
    )
}

fn read(path: &Path) -> Result<String, Error> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the `package.json` version into the cannonfile, unless it is
/// already there.
pub fn sync(package_json: &Path, cannonfile: &Path) -> Result<Outcome, Error> {
    let version = package_version(&read(package_json)?).map_err(|source| Error::Json {
        path: package_json.to_path_buf(),
        source,
    })?;
    if version.is_empty() {
        return Err(Error::MissingPackageVersion);
    }

    let content = read(cannonfile)?;
    let updated = replace_version(&content, &version).ok_or(Error::MissingCannonfileVersion)?;

    if updated == content {
        tracing::debug!(%version, "cannonfile already up to date");
        return Ok(Outcome::InSync { version });
    }

    std::fs::write(cannonfile, updated).map_err(|source| Error::Io {
        path: cannonfile.to_path_buf(),
        source,
    })?;

    Ok(Outcome::Updated { version })
}

/// [`sync`] with both files looked up in `root`.
pub fn sync_dir(root: &Path) -> Result<Outcome, Error> {
    sync(&root.join(PACKAGE_JSON), &root.join(CANNONFILE))
}
