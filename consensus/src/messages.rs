/// Protocol message types
///
/// These are the JSON records exchanged between peers and the coordinator.
/// The signed payloads are exact UTF-8 strings: `"<proposer_id>:<block_data>"`
/// for proposals and the bare literals `"prepared"` / `"commit"` for votes.
/// No further encoding is applied before hashing, so construction here must
/// stay byte-for-byte identical on the signer and verifier sides.

use crate::crypto::SecretKey;
use serde::{Deserialize, Serialize};

/// Payload signed by a prepare vote
pub const PREPARED_PAYLOAD: &str = "prepared";

/// Payload signed by a commit vote
pub const COMMIT_PAYLOAD: &str = "commit";

/// A signed block proposal, fanned out by the round's primary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub node_id: u64,
    pub block_data: String,
    pub signature: String,
}

impl Proposal {
    /// The exact string the proposer signs
    pub fn signing_payload(proposer_id: u64, block_data: &str) -> String {
        format!("{proposer_id}:{block_data}")
    }

    /// Construct and sign a proposal as `proposer_id`
    pub fn signed(proposer_id: u64, block_data: impl Into<String>, key: &SecretKey) -> Self {
        let block_data = block_data.into();
        let signature = key.sign(&Self::signing_payload(proposer_id, &block_data));
        Self {
            node_id: proposer_id,
            block_data,
            signature: signature.to_hex(),
        }
    }

    /// The payload a receiver must verify this proposal against
    pub fn payload(&self) -> String {
        Self::signing_payload(self.node_id, &self.block_data)
    }
}

/// A replica's signed prepare vote, sent to the round's primary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareVote {
    pub node_id: u64,
    pub status: String,
    pub signature: String,
}

impl PrepareVote {
    pub fn signed(node_id: u64, key: &SecretKey) -> Self {
        Self {
            node_id,
            status: PREPARED_PAYLOAD.to_string(),
            signature: key.sign(PREPARED_PAYLOAD).to_hex(),
        }
    }
}

/// A node's signed commit vote, sent to the coordinator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitVote {
    pub node_id: u64,
    pub status: String,
    pub signature: String,
}

impl CommitVote {
    pub fn signed(node_id: u64, key: &SecretKey) -> Self {
        Self {
            node_id,
            status: COMMIT_PAYLOAD.to_string(),
            signature: key.sign(COMMIT_PAYLOAD).to_hex(),
        }
    }
}

/// Registration request sent once at node startup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub node_id: u64,
    pub public_key: String,
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify_hex;

    #[test]
    fn test_proposal_payload_format() {
        assert_eq!(Proposal::signing_payload(3, "temp=21"), "3:temp=21");
    }

    #[test]
    fn test_signed_proposal_verifies() {
        let key = SecretKey::generate();
        let proposal = Proposal::signed(1, "X", &key);

        assert_eq!(proposal.payload(), "1:X");
        assert!(verify_hex(
            &key.public_key().to_hex(),
            &proposal.payload(),
            &proposal.signature,
        ));
    }

    #[test]
    fn test_proposal_claiming_another_proposer_fails() {
        // Signed by node 1 but rewritten to claim node 2: the payload the
        // receiver reconstructs no longer matches what was signed.
        let key = SecretKey::generate();
        let mut proposal = Proposal::signed(1, "X", &key);
        proposal.node_id = 2;

        assert!(!verify_hex(
            &key.public_key().to_hex(),
            &proposal.payload(),
            &proposal.signature,
        ));
    }

    #[test]
    fn test_vote_literals() {
        let key = SecretKey::generate();
        let public_key_hex = key.public_key().to_hex();

        let prepare = PrepareVote::signed(4, &key);
        assert_eq!(prepare.status, "prepared");
        assert!(verify_hex(&public_key_hex, PREPARED_PAYLOAD, &prepare.signature));

        let commit = CommitVote::signed(4, &key);
        assert_eq!(commit.status, "commit");
        assert!(verify_hex(&public_key_hex, COMMIT_PAYLOAD, &commit.signature));

        // The two literals are not interchangeable
        assert!(!verify_hex(&public_key_hex, COMMIT_PAYLOAD, &prepare.signature));
    }

    #[test]
    fn test_proposal_json_field_names() {
        let key = SecretKey::generate();
        let proposal = Proposal::signed(1, "X", &key);
        let json = serde_json::to_value(&proposal).unwrap();

        assert_eq!(json["node_id"], 1);
        assert_eq!(json["block_data"], "X");
        assert!(json["signature"].is_string());
    }
}
