//! Export file listing the deployed contracts of a network.

use crate::Deployment;
use alloy_primitives::Address;
use eyre::WrapErr;
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Export<'a> {
    name: &'a str,
    chain_id: String,
    contracts: BTreeMap<&'a str, ExportedContract<'a>>,
}

#[derive(Serialize)]
struct ExportedContract<'a> {
    address: Address,
    abi: &'a serde_json::Value,
}

pub fn render(network: &str, chain_id: u64, deployments: &[Deployment]) -> eyre::Result<String> {
    let export = Export {
        name: network,
        chain_id: chain_id.to_string(),
        contracts: deployments
            .iter()
            .map(|deployment| {
                (
                    deployment.name.as_str(),
                    ExportedContract {
                        address: deployment.address,
                        abi: &deployment.abi,
                    },
                )
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&export)?)
}

pub fn write(
    path: &Path,
    network: &str,
    chain_id: u64,
    deployments: &[Deployment],
) -> eyre::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, render(network, chain_id, deployments)?)
        .wrap_err_with(|| format!("Failed to write export file: {}", path.display()))?;

    tracing::info!(path = %path.display(), contracts = deployments.len(), "wrote export file");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export/abi/localhost.json");
        let deployments = vec![Deployment {
            name: "AuthorityFactory".to_string(),
            address: Address::repeat_byte(0x42),
            newly_deployed: true,
            abi: serde_json::json!([{"type": "function", "name": "newAuthority"}]),
        }];

        write(&path, "localhost", 31337, &deployments).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["name"], "localhost");
        assert_eq!(written["chainId"], "31337");

        let contract = &written["contracts"]["AuthorityFactory"];
        let address: Address = serde_json::from_value(contract["address"].clone()).unwrap();
        assert_eq!(address, Address::repeat_byte(0x42));
        assert_eq!(contract["abi"][0]["name"], "newAuthority");
    }
}
