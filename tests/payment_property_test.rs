//! Property tests for the money conversion and the confirmation signature.

use proptest::prelude::*;
use rust_decimal::Decimal;
use secrecy::Secret;

use framepress_api::config::GatewayConfig;
use framepress_api::services::gateway::{to_minor_units, PaymentGatewayClient};

const SECRET: &str = "property_test_secret";

fn client() -> PaymentGatewayClient {
    PaymentGatewayClient::new(GatewayConfig {
        key_id: "gw_prop_123".to_string(),
        key_secret: Secret::new(SECRET.to_string()),
        api_base_url: "https://gateway.invalid/v1".to_string(),
        currency: "INR".to_string(),
        timeout_secs: 5,
    })
    .expect("client")
}

fn sign(gateway_order_id: &str, payment_id: &str) -> String {
    use hmac::{Hmac, Mac};
    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(SECRET.as_bytes()).expect("hmac key");
    mac.update(format!("{}|{}", gateway_order_id, payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

proptest! {
    /// Two-decimal amounts convert exactly: 599.00 -> 59900 paise.
    #[test]
    fn paise_amounts_convert_exactly(minor in 1i64..100_000_000) {
        let major = Decimal::new(minor, 2);
        prop_assert_eq!(to_minor_units(major).unwrap(), minor);
    }

    /// Whole-rupee amounts scale by exactly 100.
    #[test]
    fn whole_amounts_scale_by_one_hundred(rupees in 1i64..1_000_000) {
        prop_assert_eq!(to_minor_units(Decimal::from(rupees)).unwrap(), rupees * 100);
    }

    /// A correctly computed signature always verifies.
    #[test]
    fn correct_signatures_verify(
        order_id in "[a-zA-Z0-9]{6,24}",
        payment_id in "[a-zA-Z0-9]{6,24}",
    ) {
        let c = client();
        let sig = sign(&order_id, &payment_id);
        prop_assert!(c.verify_signature(&order_id, &payment_id, &sig).unwrap());
    }

    /// Flipping any single character of the signature makes it fail.
    #[test]
    fn any_single_character_flip_breaks_the_signature(
        order_id in "[a-zA-Z0-9]{6,24}",
        payment_id in "[a-zA-Z0-9]{6,24}",
        flip in 0usize..64,
    ) {
        let c = client();
        let sig = sign(&order_id, &payment_id);

        let mut tampered: Vec<char> = sig.chars().collect();
        let i = flip % tampered.len();
        tampered[i] = if tampered[i] == '0' { '1' } else { '0' };
        let tampered: String = tampered.into_iter().collect();

        prop_assume!(tampered != sig);
        prop_assert!(!c.verify_signature(&order_id, &payment_id, &tampered).unwrap());
    }

    /// A signature only binds its own identifier pair.
    #[test]
    fn signatures_do_not_transfer_between_identifier_pairs(
        order_a in "[a-z0-9]{8,20}",
        order_b in "[a-z0-9]{8,20}",
        payment_id in "[a-z0-9]{8,20}",
    ) {
        prop_assume!(order_a != order_b);
        let c = client();
        let sig = sign(&order_a, &payment_id);
        prop_assert!(!c.verify_signature(&order_b, &payment_id, &sig).unwrap());
    }
}
