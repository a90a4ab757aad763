//! Boundary to the SRP math.
//!
//! All modular arithmetic lives in the `srp` crate (SRP-6a, 2048-bit group,
//! SHA-256); this module only fixes the parameter choice and the byte-level
//! interface the coordinator works with. Nothing here keeps state: a fresh
//! ephemeral is generated per call, never cached.

use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use srp::{client::SrpClient, groups::G_2048, server::SrpServer, types::SrpAuthError};

/// Size of the random server secret ephemeral `b`.
const EPHEMERAL_SECRET_LEN: usize = 64;

/// A fresh server-side ephemeral key pair.
pub struct ServerEphemeral {
    pub secret: Vec<u8>,
    pub public: Vec<u8>,
}

/// The server's side of a completed exchange: its proof (`M2`) and the
/// derived shared session key.
pub struct ServerSession {
    pub proof: Vec<u8>,
    pub key: Vec<u8>,
}

/// Generate a fresh `(b, B)` pair for the given password verifier.
#[must_use]
pub fn generate_server_ephemeral(verifier: &[u8]) -> ServerEphemeral {
    let mut secret = vec![0u8; EPHEMERAL_SECRET_LEN];
    OsRng.fill_bytes(&mut secret);

    let server = SrpServer::<Sha256>::new(&G_2048);
    let public = server.compute_public_ephemeral(&secret, verifier);

    ServerEphemeral { secret, public }
}

/// Derive the shared session from a stored server secret and the client's
/// reply, verifying the client proof (`M1`) in the process.
///
/// # Errors
///
/// Fails if the client ephemeral is illegal (`A mod N == 0`) or the proof
/// does not match; the caller treats both as an invalid client proof.
pub fn derive_server_session(
    secret: &[u8],
    client_public_ephemeral: &[u8],
    verifier: &[u8],
    client_proof: &[u8],
) -> Result<ServerSession, SrpAuthError> {
    let server = SrpServer::<Sha256>::new(&G_2048);
    let session = server.process_reply(secret, verifier, client_public_ephemeral)?;
    session.verify_client(client_proof)?;

    Ok(ServerSession {
        proof: session.proof().to_vec(),
        key: session.key().to_vec(),
    })
}

/// Client-side verifier derivation, `v = g^H(salt | H(identity:password))`.
///
/// Used by the fake-exchange path to synthesize a credible throwaway
/// credential, and by tests playing the client role.
#[must_use]
pub fn derive_verifier(identity: &str, password: &str, salt: &[u8]) -> Vec<u8> {
    SrpClient::<Sha256>::new(&G_2048).compute_verifier(
        identity.as_bytes(),
        password.as_bytes(),
        salt,
    )
}
