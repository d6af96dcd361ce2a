use std::fmt::Write as _;

use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a fingerprint (128 bits).
const FINGERPRINT_BYTES: usize = 16;

/// Derive the lock key for an invocation.
///
/// Two invocations are the same job iff their argument vectors are identical,
/// element for element and in order. Every argument is length-prefixed so
/// `["a b"]` and `["a", "b"]` hash differently.
pub fn fingerprint<S: AsRef<str>>(args: &[S]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((args.len() as u64).to_le_bytes());
    for arg in args {
        let bytes = arg.as_ref().as_bytes();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }

    let digest = hasher.finalize();
    let mut out = String::with_capacity(FINGERPRINT_BYTES * 2);
    for b in &digest[..FINGERPRINT_BYTES] {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_32_hex_chars() {
        let fp = fingerprint(&["echo", "hello"]);
        assert_eq!(fp.len(), 32);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn equal_args_give_equal_fingerprints() {
        let a = vec!["backup.sh".to_string(), "--full".to_string()];
        let b = vec!["backup.sh".to_string(), "--full".to_string()];
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a), fingerprint(&["backup.sh", "--full"]));
    }

    #[test]
    fn argument_order_matters() {
        assert_ne!(fingerprint(&["a", "b"]), fingerprint(&["b", "a"]));
    }

    #[test]
    fn argument_boundaries_matter() {
        assert_ne!(fingerprint(&["echo", "a b"]), fingerprint(&["echo", "a", "b"]));
        assert_ne!(fingerprint(&["ab", ""]), fingerprint(&["a", "b"]));
        assert_ne!(fingerprint(&[""]), fingerprint::<&str>(&[]));
    }

    #[test]
    fn no_normalization_is_applied() {
        assert_ne!(fingerprint(&["./run.sh"]), fingerprint(&["run.sh"]));
        assert_ne!(fingerprint(&["echo", "x"]), fingerprint(&["echo", "x "]));
    }

    #[test]
    fn fingerprint_is_stable() {
        // Keys already in the store must keep matching across releases.
        assert_eq!(fingerprint(&["echo", "hello"]), fingerprint(&["echo", "hello"]));
        let known = fingerprint::<&str>(&[]);
        let digest = Sha256::digest(0u64.to_le_bytes());
        let expected: String = digest[..16].iter().map(|b| format!("{:02x}", b)).collect();
        assert_eq!(known, expected);
    }
}
