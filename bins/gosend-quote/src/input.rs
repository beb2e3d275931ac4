//! Package input: one package or a list, from a file or stdin

use anyhow::{Context, Result};
use gosend_rates::Package;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum PackageInput {
    Many(Vec<Package>),
    One(Package),
}

/// Parse one package object or an array of them.
pub fn parse_packages(json: &str) -> Result<Vec<Package>> {
    let input: PackageInput = serde_json::from_str(json).context("package JSON is malformed")?;
    Ok(match input {
        PackageInput::Many(packages) => packages,
        PackageInput::One(package) => vec![package],
    })
}

/// Read packages from `path`, or stdin when it is `-`.
pub fn read_packages(path: &Path) -> Result<Vec<Package>> {
    let json = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read packages from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    parse_packages(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_package() {
        let json = r#"{
            "items": [{"weight": "1.5", "width": 10, "length": 20, "height": 5, "quantity": 2}],
            "destination": {"address_1": "Jl. Thamrin 10", "city": "Jakarta", "country": "ID"}
        }"#;
        let packages = parse_packages(json).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].items[0].weight, 1.5);
        assert_eq!(packages[0].destination.city, "Jakarta");
        assert_eq!(packages[0].subtotal, None);
    }

    #[test]
    fn test_package_list() {
        let json = r#"[{"items": []}, {"items": [], "subtotal": 150000}]"#;
        let packages = parse_packages(json).unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[1].subtotal, Some(150_000.0));
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");
        std::fs::write(&path, r#"{"items": [{"quantity": 3}]}"#).unwrap();
        assert_eq!(read_packages(&path).unwrap()[0].items[0].quantity, 3);
    }

    #[test]
    fn test_malformed() {
        assert!(parse_packages("{items: }").is_err());
    }
}
