//! Wallet ownership proofs (EIP-191 personal_sign)

use crate::eth::error::{EthError, Result};
use alloy_primitives::{Address, Signature};

/// Message a member signs to prove control of a wallet
pub fn verification_message(user_id: impl std::fmt::Display) -> String {
    format!("cowork wallet verification: {user_id}")
}

/// Parse a checksummed or lowercase `0x` address
pub fn parse_address(value: &str) -> Result<Address> {
    value.trim().parse::<Address>().map_err(|e| EthError::InvalidAddress(format!("{value}: {e}")))
}

/// Recover the signer of `message` and require it to be `claimed`
pub fn verify_wallet_signature(claimed: Address, message: &str, signature_hex: &str) -> Result<()> {
    let raw = hex::decode(signature_hex.trim().trim_start_matches("0x"))
        .map_err(|e| EthError::SignatureError(format!("signature is not hex: {e}")))?;
    if raw.len() != 65 {
        return Err(EthError::SignatureError(format!(
            "signature must be 65 bytes, got {}",
            raw.len()
        )));
    }

    let signature =
        Signature::from_raw(&raw).map_err(|e| EthError::SignatureError(e.to_string()))?;
    let recovered = signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| EthError::SignatureError(e.to_string()))?;

    if recovered != claimed {
        return Err(EthError::SignatureError(format!(
            "signature was produced by {recovered}, not {claimed}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // personal_sign of the verification message for USER_ID by SIGNER
    const USER_ID: &str = "7d1f0c2e-5b8a-4e63-9f0a-2c4d6e8b1a35";
    const SIGNER: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";
    const SIGNATURE: &str = "0xbb50e2d89a4ed70663d080659fe0ad4b9bc3e06c17a227433966cb59ceee020d024db081b7ffdd42201dbbc3090fbb764a60c0d5f421d87dd8cde82522adc4861b";

    #[test]
    fn test_signature_recovers_claimed_wallet() {
        let signer = parse_address(SIGNER).unwrap();
        let message = verification_message(USER_ID);
        assert!(verify_wallet_signature(signer, &message, SIGNATURE).is_ok());
        assert!(verify_wallet_signature(signer, &message, SIGNATURE.trim_start_matches("0x")).is_ok());

        let other = parse_address("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf").unwrap();
        assert!(matches!(
            verify_wallet_signature(other, &message, SIGNATURE),
            Err(EthError::SignatureError(_))
        ));

        // Signed for a different account
        let foreign = verification_message("00000000-0000-4000-8000-000000000000");
        assert!(verify_wallet_signature(signer, &foreign, SIGNATURE).is_err());
    }

    #[test]
    fn test_verification_message() {
        assert_eq!(verification_message("abc"), "cowork wallet verification: abc");
    }

    #[test]
    fn test_parse_address() {
        let addr = parse_address(" 0x000000000000000000000000000000000000dEaD ").unwrap();
        assert_eq!(addr, Address::from_slice(&hex::decode("000000000000000000000000000000000000dead").unwrap()));
        assert!(parse_address("0x1234").is_err());
    }

    #[test]
    fn test_rejects_malformed_signatures() {
        let claimed = Address::ZERO;
        assert!(matches!(
            verify_wallet_signature(claimed, "msg", "zz"),
            Err(EthError::SignatureError(_))
        ));
        assert!(matches!(
            verify_wallet_signature(claimed, "msg", "0x1234"),
            Err(EthError::SignatureError(_))
        ));
    }
}
