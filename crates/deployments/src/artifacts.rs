use alloy_primitives::{Address, Bytes};
use eyre::WrapErr;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Compiled contract: its ABI and creation bytecode.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub abi: serde_json::Value,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Creation bytecode followed by the ABI encoded constructor arguments.
    pub fn init_code(&self, args: &[Address]) -> Bytes {
        let mut code = self.bytecode.to_vec();
        for arg in args {
            code.extend_from_slice(arg.into_word().as_slice());
        }
        code.into()
    }
}

#[derive(Deserialize)]
struct RawArtifact {
    #[serde(default)]
    abi: serde_json::Value,
    bytecode: RawBytecode,
}

// hardhat writes the bytecode as a plain hex string, forge as `{ "object": .. }`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(Bytes),
    Object { object: Bytes },
}

/// Directory of artifact JSON files, either flat (`<dir>/<Name>.json`) or
/// laid out like forge's `out` (`<dir>/<Name>.sol/<Name>.json`).
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, name: &str) -> [PathBuf; 2] {
        [
            self.dir.join(format!("{name}.json")),
            self.dir.join(format!("{name}.sol")).join(format!("{name}.json")),
        ]
    }

    pub fn load(&self, name: &str) -> eyre::Result<Artifact> {
        let path = self
            .candidates(name)
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| {
                eyre::eyre!(
                    "No artifact for {} in {}",
                    name,
                    self.dir.display()
                )
            })?;

        parse(name, &path)
    }
}

fn parse(name: &str, path: &Path) -> eyre::Result<Artifact> {
    let contents = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read artifact: {}", path.display()))?;
    let raw: RawArtifact = serde_json::from_str(&contents)
        .wrap_err_with(|| format!("Failed to parse artifact: {}", path.display()))?;

    let bytecode = match raw.bytecode {
        RawBytecode::Hex(bytes) => bytes,
        RawBytecode::Object { object } => object,
    };

    if bytecode.is_empty() {
        eyre::bail!("Artifact {} has no bytecode, is it abstract?", name);
    }

    Ok(Artifact {
        name: name.to_string(),
        abi: raw.abi,
        bytecode,
    })
}
