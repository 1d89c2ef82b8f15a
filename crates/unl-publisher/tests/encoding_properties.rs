//! Property tests for the canonical field encoding and manifests

use proptest::prelude::*;
use unl_crypto::KeyPair;
use unl_publisher::binary::{decode_vl_length, encode_vl_length, fields, MAX_VL_LENGTH};
use unl_publisher::{
    domain_to_hex, generate_manifest, FieldValue, Manifest, ManifestFields, StObject,
};

proptest! {
    /// Length prefixes decode to the length they encode, using the minimal width
    #[test]
    fn vl_length_prefix_is_reversible(len in 0usize..=MAX_VL_LENGTH) {
        let prefix = encode_vl_length(len).unwrap();
        let expected_width = match len {
            0..=192 => 1,
            193..=12_480 => 2,
            _ => 3,
        };
        prop_assert_eq!(prefix.len(), expected_width);
        prop_assert_eq!(decode_vl_length(&prefix).unwrap(), (len, expected_width));
    }

    /// Encoding is independent of insertion order
    #[test]
    fn object_encoding_is_canonical(
        sequence in any::<u32>(),
        domain in prop::collection::vec(any::<u8>(), 0..300),
        key in prop::collection::vec(any::<u8>(), 33),
    ) {
        let mut forward = StObject::new();
        forward.insert(fields::SEQUENCE, FieldValue::UInt32(sequence)).unwrap();
        forward.insert(fields::PUBLIC_KEY, FieldValue::Blob(key.clone())).unwrap();
        forward.insert(fields::DOMAIN, FieldValue::Blob(domain.clone())).unwrap();

        let mut backward = StObject::new();
        backward.insert(fields::DOMAIN, FieldValue::Blob(domain)).unwrap();
        backward.insert(fields::PUBLIC_KEY, FieldValue::Blob(key)).unwrap();
        backward.insert(fields::SEQUENCE, FieldValue::UInt32(sequence)).unwrap();

        let bytes = forward.encode().unwrap();
        prop_assert_eq!(&bytes, &backward.encode().unwrap());
        prop_assert_eq!(StObject::decode(&bytes).unwrap(), forward);
    }

    /// Manifests verify for any sequence and domain
    #[test]
    fn manifests_verify(
        sequence in any::<u32>(),
        domain in proptest::option::of("[a-z]{1,20}\\.[a-z]{2,4}"),
    ) {
        let master = KeyPair::from_seed(&[10u8; 32]).unwrap();
        let ephemeral = KeyPair::from_seed(&[11u8; 32]).unwrap();
        let encoded = generate_manifest(&ManifestFields {
            sequence,
            public_key: Some(master.node_public_key_hex.clone()),
            signing_pub_key: Some(ephemeral.node_public_key_hex.clone()),
            signing_private_key: ephemeral.secret_key.clone(),
            master_private_key: master.secret_key.clone(),
            domain: domain.as_deref().map(domain_to_hex),
        }).unwrap();

        let manifest = Manifest::from_base64(&encoded).unwrap();
        prop_assert!(manifest.verify());
        prop_assert_eq!(manifest.sequence, sequence);
        prop_assert_eq!(manifest.domain_text(), domain);
    }
}
