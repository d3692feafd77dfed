//! Deterministic physical names
//!
//! Auto-named resources get a suffix derived from the stack and logical
//! name, so the same declaration always maps to the same physical object.

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a
pub fn fnv1a(data: &[u8]) -> u64 {
    data.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Seven hex digits identifying `logical` within `stack`
pub fn suffix(stack: &str, logical: &str) -> String {
    let hash = fnv1a(format!("{}/{}", stack, logical).as_bytes());
    format!("{:07x}", hash & 0x0fff_ffff)
}

/// AWS style: `<logical>-<hex>`
pub fn aws_name(stack: &str, logical: &str) -> String {
    format!("{}-{}", logical, suffix(stack, logical))
}

/// Snowflake style: upper-case identifier, `-` replaced by `_`
pub fn snowflake_name(stack: &str, logical: &str) -> String {
    let base: String = logical
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{}_{}", base, suffix(stack, logical).to_ascii_uppercase())
}

/// `"DB"."SCHEMA"."OBJECT"` style qualified name
pub fn qualified(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| format!("\"{}\"", p))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_vectors() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_names_are_stable() {
        assert_eq!(aws_name("dev", "bucket"), aws_name("dev", "bucket"));
        assert_ne!(aws_name("dev", "bucket"), aws_name("prod", "bucket"));
        assert!(aws_name("dev", "bucket").starts_with("bucket-"));
        assert_eq!(aws_name("dev", "bucket").len(), "bucket-".len() + 7);
    }

    #[test]
    fn test_snowflake_name_shape() {
        let name = snowflake_name("dev", "pulumi-snowflake-demo");
        assert!(name.starts_with("PULUMI_SNOWFLAKE_DEMO_"));
        assert!(!name.chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_qualified() {
        assert_eq!(qualified(&["D", "S"]), "\"D\".\"S\"");
    }
}
