//! End-to-end tests for the envelope formats

mod common;

use common::{encryption_pair, other_encryption_pair, patterned, signing_pair};
use serde::{Deserialize, Serialize};
use strongbox_crypto::{
    Ciphertext, CryptoConfig, CryptoEngine, CryptoError, DecryptingKeySet, EncryptedEnvelope,
    EncryptingKeySet, EncryptionMode, ExportedKeySet, KeyPools, PasswordEncryptionMode,
    SigningMode, VerifyingKeySet, MAX_RSA_PAYLOAD_BYTES,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Message {
    from: String,
    subject: String,
    attachments: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Contact {
    email: String,
    phone: String,
}

fn message() -> Message {
    Message {
        from: "grace@example.org".into(),
        subject: "compiler notes".into(),
        attachments: vec!["a.pdf".into(), "b.txt".into()],
    }
}

#[test]
fn test_short_buffer_is_single_stage() {
    let engine = CryptoEngine::native();
    let pair = encryption_pair();
    let encrypted = engine
        .encrypt_buffer(EncryptionMode::default(), b"ok", &pair.encrypting, false)
        .unwrap();
    assert_eq!(encrypted[2], 1);
    assert_eq!(engine.decrypt_buffer(&encrypted, &pair.decrypting).unwrap(), b"ok");
}

#[test]
fn test_megabyte_buffer_is_two_stage() {
    let engine = CryptoEngine::native();
    let pair = encryption_pair();
    let plaintext = patterned(1_000_001);
    let encrypted = engine
        .encrypt_buffer(EncryptionMode::default(), &plaintext, &pair.encrypting, true)
        .unwrap();

    let envelope = EncryptedEnvelope::decode(&encrypted).unwrap();
    assert!(matches!(envelope.ciphertext, Ciphertext::Enveloped { .. }));
    assert_eq!(envelope.ciphertext.complexity(), 2);
    assert_eq!(engine.decrypt_buffer(&encrypted, &pair.decrypting).unwrap(), plaintext);
}

#[test]
fn test_threshold_boundary() {
    let engine = CryptoEngine::native();
    let pair = encryption_pair();
    for (len, complexity) in [(MAX_RSA_PAYLOAD_BYTES, 1), (MAX_RSA_PAYLOAD_BYTES + 1, 2)] {
        let plaintext = patterned(len);
        let encrypted = engine
            .encrypt_buffer(EncryptionMode::default(), &plaintext, &pair.encrypting, false)
            .unwrap();
        assert_eq!(encrypted[2], complexity, "length {}", len);
        assert_eq!(engine.decrypt_buffer(&encrypted, &pair.decrypting).unwrap(), plaintext);
    }
}

#[test]
fn test_wrong_decrypting_key_fails_with_crypto_error() {
    let engine = CryptoEngine::native();
    let encrypted = engine
        .encrypt_string(EncryptionMode::default(), "for one reader", &encryption_pair().encrypting, true)
        .unwrap();
    let err = engine
        .decrypt_string(&encrypted, &other_encryption_pair().decrypting)
        .unwrap_err();
    assert!(matches!(err, CryptoError::Decryption(_)));
}

#[test]
fn test_key_id_identifies_decrypting_key() {
    let engine = CryptoEngine::native();
    let candidates = [encryption_pair(), other_encryption_pair()];
    let encrypted = engine
        .encrypt_string(EncryptionMode::default(), "rotate me", &candidates[1].encrypting, true)
        .unwrap();

    let id = CryptoEngine::extract_key_id_from_encrypted_string(&encrypted).unwrap();
    let keys = candidates
        .iter()
        .find(|pair| pair.id() == &id)
        .expect("key id names one of the candidates");
    assert_eq!(engine.decrypt_string(&encrypted, &keys.decrypting).unwrap(), "rotate me");
}

#[test]
fn test_password_roundtrip_and_wrong_password() {
    let engine = CryptoEngine::native();
    let mode = PasswordEncryptionMode::default();
    let plaintext = patterned(70_000);
    let encrypted = engine
        .encrypt_buffer_with_password(mode, &plaintext, "correct horse")
        .unwrap();
    assert_eq!(
        engine.decrypt_buffer_with_password(&encrypted, "correct horse").unwrap(),
        plaintext
    );
    assert!(engine
        .decrypt_buffer_with_password(&encrypted, "battery staple")
        .is_err());
}

#[test]
fn test_typed_value_roundtrip_and_schema_mismatch() {
    let engine = CryptoEngine::native();
    let pair = encryption_pair();
    let encrypted = engine
        .encrypt_value(EncryptionMode::default(), &message(), &pair.encrypting, true)
        .unwrap();
    assert_eq!(engine.decrypt_value(&encrypted, &pair.decrypting).unwrap(), message());

    let err = engine
        .decrypt_value(&encrypted.clone().cast::<Contact>(), &pair.decrypting)
        .unwrap_err();
    assert!(err.is_schema_validation());
}

#[test]
fn test_value_signatures() {
    let engine = CryptoEngine::native();
    let pair = signing_pair();
    let mode = SigningMode::default();

    let signature = engine
        .generate_signature_for_value(mode, &message(), &pair.signing, true)
        .unwrap();
    assert!(engine
        .is_signature_valid_for_value(&signature, &message(), &pair.verifying)
        .unwrap());

    let mut edited = message();
    edited.subject.push('!');
    assert!(!engine
        .is_signature_valid_for_value(&signature, &edited, &pair.verifying)
        .unwrap());

    let extras = vec!["thread-42"];
    let bound = engine
        .generate_signature_for_value_with_extras(mode, &message(), Some(&extras), &pair.signing, false)
        .unwrap();
    assert!(engine
        .is_signature_valid_for_value_with_extras(&bound, &message(), Some(&extras), &pair.verifying)
        .unwrap());
    assert!(!engine
        .is_signature_valid_for_value(&bound, &message(), &pair.verifying)
        .unwrap());
    assert!(!engine
        .is_signature_valid_for_value_with_extras(&signature, &message(), Some(&extras), &pair.verifying)
        .unwrap());
}

#[test]
fn test_signed_buffer_travels_as_one_blob() {
    let engine = CryptoEngine::native();
    let pair = signing_pair();
    let signed = engine
        .generate_signed_buffer(SigningMode::default(), b"{\"row\":1}", &pair.signing, true)
        .unwrap();

    assert_eq!(CryptoEngine::extract_value_from_signed_buffer(&signed).unwrap(), b"{\"row\":1}");
    assert_eq!(&CryptoEngine::extract_key_id_from_signed_buffer(&signed).unwrap(), pair.id());
    assert!(engine.is_signature_valid_for_signed_buffer(&signed, &pair.verifying));
}

#[test]
fn test_exported_keys_still_work() {
    let engine = CryptoEngine::native();
    let pair = encryption_pair();

    let public = serde_json::to_string(&pair.encrypting.export().unwrap()).unwrap();
    let private = serde_json::to_string(&pair.decrypting.export().unwrap()).unwrap();

    let encrypting =
        EncryptingKeySet::import(&serde_json::from_str::<ExportedKeySet>(&public).unwrap()).unwrap();
    let decrypting =
        DecryptingKeySet::import(&serde_json::from_str::<ExportedKeySet>(&private).unwrap()).unwrap();
    assert_eq!(encrypting.id(), pair.id());

    let encrypted = engine
        .encrypt_buffer(EncryptionMode::default(), &patterned(900), &encrypting, true)
        .unwrap();
    assert_eq!(engine.decrypt_buffer(&encrypted, &decrypting).unwrap(), patterned(900));

    // a public encryption key is not a verifying key
    let exported = pair.encrypting.export().unwrap();
    assert!(VerifyingKeySet::import(&exported).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pool_hands_out_usable_pairs() {
    let config = CryptoConfig::default()
        .with_pool_sizes(1, 0)
        .with_key_namespace("pooled");
    let pools = KeyPools::from_config(&config);

    let pair = pools.encryption.get().await.unwrap();
    assert_eq!(pair.id().namespace(), "pooled");

    let engine = config.build_engine();
    let encrypted = engine
        .encrypt_string(EncryptionMode::default(), "fresh", &pair.encrypting, false)
        .unwrap();
    assert_eq!(engine.decrypt_string(&encrypted, &pair.decrypting).unwrap(), "fresh");

    pools.encryption.put_back(pair);
    assert_eq!(pools.encryption.len(), 1);
}
