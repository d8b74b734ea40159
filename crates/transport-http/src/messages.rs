use bytes::Bytes;
use caspaxos_consensus::Ballot;
use serde::{Deserialize, Serialize};

/// Body of a prepare request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareRequest {
    /// Ballot to promise
    pub ballot: Ballot,
    /// Key the ballot is for
    pub key: Bytes,
}

/// Body of an accept request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptRequest {
    /// Ballot the state is proposed under
    pub ballot: Ballot,
    /// Key the state is for
    pub key: Bytes,
    /// State to accept
    pub state: Bytes,
}
