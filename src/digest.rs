//! BLAKE3 fingerprint of load output, for checking that two loads of the
//! same tree produced byte-identical results.

use crate::core::types::OutputResourceConfig;

/// Hash a resource list in order. Each entry is hashed as its canonical
/// JSON line, so reordering the list changes the digest.
pub fn resource_digest(resources: &[OutputResourceConfig]) -> Result<String, String> {
    let mut hasher = blake3::Hasher::new();
    for resource in resources {
        let line = serde_json::to_vec(resource)
            .map_err(|e| format!("cannot serialize {}: {}", resource.id, e))?;
        hasher.update(&line);
        hasher.update(b"\n");
    }
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str) -> OutputResourceConfig {
        let (ty, name) = id.split_once('.').unwrap();
        OutputResourceConfig {
            id: id.to_string(),
            name: name.to_string(),
            resource_type: ty.to_string(),
            source: "main.tf".to_string(),
            line: 1,
            module_path: String::new(),
            config: serde_json::json!({}),
        }
    }

    #[test]
    fn test_resource_digest_format() {
        let h = resource_digest(&[resource("aws_vpc.a")]).unwrap();
        assert!(h.starts_with("blake3:"));
        assert_eq!(h.len(), 7 + 64);
    }

    #[test]
    fn test_resource_digest_is_order_sensitive() {
        let a = vec![resource("aws_vpc.a"), resource("aws_vpc.b")];
        let b = vec![resource("aws_vpc.b"), resource("aws_vpc.a")];
        assert_eq!(resource_digest(&a).unwrap(), resource_digest(&a).unwrap());
        assert_ne!(resource_digest(&a).unwrap(), resource_digest(&b).unwrap());
    }

    #[test]
    fn test_resource_digest_sees_config_changes() {
        let a = vec![resource("aws_vpc.a")];
        let mut b = a.clone();
        b[0].config = serde_json::json!({"cidr_block": "10.0.0.0/16"});
        assert_ne!(resource_digest(&a).unwrap(), resource_digest(&b).unwrap());
    }

    #[test]
    fn test_resource_digest_empty() {
        assert_eq!(
            resource_digest(&[]).unwrap(),
            format!("blake3:{}", blake3::hash(b"").to_hex())
        );
    }
}
