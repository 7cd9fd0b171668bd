//! Allowlist Membership Proofs
//!
//! Inclusion proofs against a single committed digest. Every pair hashes
//! in a fixed canonical order (lexicographically smaller side first), so
//! a proof carries no left/right position data. This is a set-membership
//! commitment, not a position-binding tree; builder and verifier share
//! the one convention.

use lib_types::{Address, AllowlistDigest};

/// One proof step: the sibling digest at that level
pub type ProofNode = [u8; 32];

/// Leaf digest for an address
pub fn leaf_digest(address: &Address) -> [u8; 32] {
    blake3::hash(address.as_bytes()).into()
}

/// Hash two nodes in canonical order
fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    if a <= b {
        hasher.update(a);
        hasher.update(b);
    } else {
        hasher.update(b);
        hasher.update(a);
    }
    hasher.finalize().into()
}

/// Verify that `claimant` is a member of the committed set
///
/// Folds the claimant's leaf through the proof path and compares the
/// result against `digest`. Pure function with no side effects; the
/// empty-digest short circuit is the caller's decision, not the
/// verifier's.
pub fn verify_membership(
    claimant: &Address,
    proof: &[ProofNode],
    digest: &AllowlistDigest,
) -> bool {
    let mut acc = leaf_digest(claimant);
    for sibling in proof {
        acc = hash_pair(&acc, sibling);
    }
    &acc == digest.as_bytes()
}

/// Allowlist commitment builder
///
/// Builds the digest an operator commits to and produces per-member
/// proofs. Leaves are deduplicated and sorted; an odd trailing node
/// pairs with itself.
#[derive(Debug, Clone)]
pub struct AllowlistTree {
    levels: Vec<Vec<[u8; 32]>>,
}

impl AllowlistTree {
    /// Build the tree over a set of member addresses
    ///
    /// An empty member set produces the empty digest, which disables the
    /// private phase.
    pub fn from_members(members: &[Address]) -> Self {
        let mut leaves: Vec<[u8; 32]> = members.iter().map(leaf_digest).collect();
        leaves.sort();
        leaves.dedup();

        let mut levels = vec![leaves];
        loop {
            let next = {
                let current = match levels.last() {
                    Some(level) if level.len() > 1 => level,
                    _ => break,
                };

                let mut next = Vec::with_capacity((current.len() + 1) / 2);
                let mut i = 0;
                while i < current.len() {
                    let left = &current[i];
                    let right = if i + 1 < current.len() {
                        &current[i + 1]
                    } else {
                        &current[i]
                    };
                    next.push(hash_pair(left, right));
                    i += 2;
                }
                next
            };
            levels.push(next);
        }

        Self { levels }
    }

    /// The committed digest
    pub fn digest(&self) -> AllowlistDigest {
        self.levels
            .last()
            .and_then(|level| level.first())
            .map(|root| AllowlistDigest::new(*root))
            .unwrap_or(AllowlistDigest::EMPTY)
    }

    /// Number of distinct members committed
    pub fn member_count(&self) -> usize {
        self.levels.first().map(|leaves| leaves.len()).unwrap_or(0)
    }

    /// Produce the proof path for a member, None for non-members
    pub fn proof_for(&self, member: &Address) -> Option<Vec<ProofNode>> {
        let leaf = leaf_digest(member);
        let mut index = self.levels.first()?.iter().position(|l| *l == leaf)?;

        let mut proof = Vec::new();
        for level in &self.levels {
            if level.len() == 1 {
                break;
            }
            let sibling_index = if index % 2 == 0 { index + 1 } else { index - 1 };
            let sibling = if sibling_index < level.len() {
                level[sibling_index]
            } else {
                // Odd trailing node pairs with itself
                level[index]
            };
            proof.push(sibling);
            index /= 2;
        }

        Some(proof)
    }
}
