/// Deterministic identifiers for actions and plans, derived via SHA-256.
use std::path::Path;

use sha2::{Digest as _, Sha256};

use crate::actions::ActionKind;

/// Hex digits kept from the digest. Enough to make collisions within one
/// plan practically impossible while staying readable in output.
const ID_HEX_LEN: usize = 12;

/// Id for an action of `kind` whose primary path is `path`.
/// `discriminator` separates several actions of one kind on one file
/// (e.g. the byte offset of a reference); pass `""` when there is only one.
pub fn action_id(kind: ActionKind, path: &Path, discriminator: &str) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let mut hasher = Sha256::new();
    hasher.update(kind.id_prefix().as_bytes());
    hasher.update([0]);
    hasher.update(normalized.as_bytes());
    hasher.update([0]);
    hasher.update(discriminator.as_bytes());
    return format!("{}-{}", kind.id_prefix(), short_hex(&hasher.finalize()));
}

/// Plan id from its action ids, independent of their order.
pub fn plan_id<'a>(action_ids: impl IntoIterator<Item = &'a str>) -> String {
    let mut ids: Vec<&str> = action_ids.into_iter().collect();
    ids.sort_unstable();

    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update([0]);
    }
    return format!("plan-{}", short_hex(&hasher.finalize()));
}

fn short_hex(digest: &[u8]) -> String {
    let full: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    return full.chars().take(ID_HEX_LEN).collect();
}
