//! RSA PKCS#1 v1.5 / SHA-1 signatures over the raw response fields.
//!
//! The WLS signs the fields exactly as they appear on the wire, escapes
//! included. Rebuilding the signed bytes from decoded values breaks
//! verification for any field containing `%` or `!`.

use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};

use crate::codec::{decode_signature, Fields, SEPARATOR};
use crate::error::{WlsError, WlsResult};
use crate::keys::{KeyId, KeyLookup};
use crate::layout::Layout;

/// Bytes covered by the signature: raw fields up to and including `params`,
/// joined with `!`.
pub fn signed_bytes(fields: &Fields<'_>, layout: Layout) -> Vec<u8> {
    join_raw(fields.raw_prefix(layout.signed_count())).into_bytes()
}

pub(crate) fn join_raw(raw: &[&str]) -> String {
    raw.join(SEPARATOR.encode_utf8(&mut [0; 4]))
}

/// Verify the `sig` field of a tokenized response and return the decoded
/// signature.
///
/// Order: key lookup, signature decoding, then the RSA check.
pub fn verify_response_signature<K: KeyLookup + ?Sized>(
    fields: &Fields<'_>,
    layout: Layout,
    kid: &KeyId,
    sig_field: &str,
    keys: &K,
) -> WlsResult<Vec<u8>> {
    let key = keys.lookup(kid).ok_or_else(|| WlsError::key_not_found(kid))?;
    let data = signed_bytes(fields, layout);
    let signature = decode_signature(sig_field)?;
    verify_pkcs1_sha1(key, &data, &signature)?;
    Ok(signature)
}

/// Verify an RSA PKCS#1 v1.5 signature with a SHA-1 digest.
pub fn verify_pkcs1_sha1(key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> WlsResult<()> {
    let digest = Sha1::digest(data);
    key.verify(Pkcs1v15Sign::new::<Sha1>(), &digest, signature)
        .map_err(|_| WlsError::invalid("signature invalid"))
}

/// Produce an RSA PKCS#1 v1.5 signature with a SHA-1 digest.
pub fn sign_pkcs1_sha1(key: &RsaPrivateKey, data: &[u8]) -> rsa::Result<Vec<u8>> {
    let digest = Sha1::digest(data);
    key.sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
}
