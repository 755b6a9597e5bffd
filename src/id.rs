use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

// Identity names a principal or a deployed object on the ledger.
// It is a 32 byte value resembling a public key; all zeroes is the NONE sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity([u8; 32]);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "id:none");
        }
        write!(f, "id:{}", hex::encode(&self.0[0..6]))
    }
}

impl Default for Identity {
    fn default() -> Self {
        Identity::NONE
    }
}

impl Deref for Identity {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Identity {
    /// The "no identity" sentinel. No caller can ever present it.
    pub const NONE: Identity = Identity([0; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Identity(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        *self == Identity::NONE
    }

    /// Identity of an external principal, derived from a human-readable seed.
    ///
    /// Principal identities are plain hashes; they are not searched off-curve,
    /// so they never collide with derived object identities in practice.
    pub fn principal(seed: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"CLAIMABLE_Principal");
        hasher.update(seed.as_bytes());
        Identity(hasher.finalize().into())
    }

    pub fn create_object_id(seeds: &[&[u8]], bump: u8) -> [u8; 32] {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"CLAIMABLE_Object");

        for seed in seeds {
            hasher.update(seed);
        }

        hasher.update([bump]);

        hasher.finalize().into()
    }

    /// Returns true if the bytes do not decompress to a point on the ed25519 curve.
    pub fn is_off_curve(bytes: &[u8; 32]) -> bool {
        let Ok(compressed_edwards_y) = CompressedEdwardsY::from_slice(bytes.as_ref()) else {
            return true;
        };
        compressed_edwards_y.decompress().is_none()
    }

    /// Try to find an off-curve identity for the given seeds
    pub fn try_find_uid(seeds: &[&[u8]]) -> Option<(Identity, u8)> {
        for bump in 0..=u8::MAX {
            let id = Identity::create_object_id(seeds, bump);
            if Identity::is_off_curve(&id) && id != [0; 32] {
                return Some((Identity(id), bump));
            }
        }
        None
    }

    /// Identity of the object deployed by `creator` at its `nonce`-th deployment.
    ///
    /// Derived identities lie off the ed25519 curve, so no key holder can
    /// present one as a caller.
    pub fn derive_object(creator: &Identity, nonce: u64) -> Option<(Identity, u8)> {
        Identity::try_find_uid(&[creator.bytes(), &nonce.to_le_bytes()])
    }
}
