use crate::{block::BlockId, crypto};

/// Fingerprint over the last five block ids, used as a light chain-identity for
/// peer consensus matching.
pub fn compute_broadhash(last_block_ids: &[BlockId]) -> String {
    let window = last_block_ids.iter().rev().take(5);
    let mut buf = Vec::new();
    for id in window {
        buf.extend_from_slice(id.as_bytes());
    }
    crypto::hash_hex(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadhash_only_considers_last_five() {
        let short = vec!["a".to_string(), "b".to_string()];
        let padded = vec!["z".to_string(), "z".to_string(), "a".to_string(), "b".to_string()];
        // the extra leading ids fall outside the 5-id window only once there are
        // more than five; with fewer than five entries the whole history counts,
        // so these two differ.
        assert_ne!(compute_broadhash(&short), compute_broadhash(&padded));

        let mut six = vec!["pad".to_string()];
        six.extend(padded.clone());
        six.push("last".to_string());
        let mut seven = vec!["other-pad".to_string(), "another".to_string()];
        seven.extend(padded);
        seven.push("last".to_string());
        // both only differ outside the trailing-5 window, so the broadhash matches.
        assert_eq!(compute_broadhash(&six), compute_broadhash(&seven));
    }
}
