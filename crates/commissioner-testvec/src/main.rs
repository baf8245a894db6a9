//! Known-answer test vector generator for the commissioner core.
//!
//! Emits `test_vectors.json`: PSKc derivation, COSE_Sign1 round trips, and
//! MeshCoP TLV encodings, so the PSKc/COSE/TLV know-answer values asserted
//! piecemeal across `commissioner-crypto` and `commissioner-types`' own
//! `#[cfg(test)]` modules have one shared, file-diffable ground truth.
//!
//! Usage:
//!   commissioner-testvec              # generate test_vectors.json
//!   commissioner-testvec --verify     # regenerate and diff against it

use std::collections::BTreeMap;

use anyhow::Context;
use commissioner_crypto::cose::Sign1;
use commissioner_crypto::ecdsa::{Algorithm, SigningKey};
use commissioner_crypto::pskc;
use commissioner_types::tlv::{Tlv, TlvSet};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, PartialEq)]
struct TestVectors {
    version: String,
    generated_by: String,
    vectors: BTreeMap<String, TestVector>,
}

#[derive(Serialize, Deserialize, PartialEq)]
struct TestVector {
    description: String,
    inputs: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
}

/// The Thread 1.2.0 §8.4.1.2.2 PSKc known-answer vector, restated in
/// spec.md §8 scenario 2.
fn generate_pskc_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let extended_pan_id = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
    let pskc = pskc::generate("12SECRETPASSWORD34", "Test Network", &extended_pan_id).expect("valid inputs");
    vectors.insert(
        "pskc_thread_1_2_0_known_answer".to_string(),
        TestVector {
            description: "Thread 1.2.0 §8.4.1.2.2 PSKc derivation".to_string(),
            inputs: BTreeMap::from([
                ("passphrase".to_string(), "12SECRETPASSWORD34".to_string()),
                ("network_name".to_string(), "Test Network".to_string()),
                ("extended_pan_id".to_string(), hex::encode(extended_pan_id)),
            ]),
            outputs: BTreeMap::from([("pskc".to_string(), hex::encode(pskc))]),
        },
    );

    vectors
}

/// COSE_Sign1 round trips for each of the three curves CCM's COM_TOK
/// exchange supports. Private keys are fixed (not `SigningKey::generate`,
/// which draws from the OS RNG) so the emitted signatures are
/// reproducible: `ecdsa`'s `Signer` impl derives its nonce deterministically
/// (RFC 6979) from the message and private scalar alone.
fn generate_cose_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let fixtures: &[(Algorithm, &str, usize)] = &[
        (Algorithm::Es256, "es256_detached_sign1", 32),
        (Algorithm::Es384, "es384_detached_sign1", 48),
        (Algorithm::Es512, "es512_detached_sign1", 66),
    ];

    for (algorithm, name, scalar_len) in fixtures {
        // A tiny nonzero scalar (`0x2A`, right-padded with zero bytes to the
        // curve's field width) is trivially below every supported curve's
        // group order, so this never risks an out-of-range rejection the
        // way a dense all-`0xFF` fixture would.
        let mut scalar = vec![0u8; *scalar_len];
        scalar[*scalar_len - 1] = 0x2A;
        let signing_key = SigningKey::from_sec1_bytes(*algorithm, &scalar).expect("fixed scalar is a valid key");
        let external_aad = b"MGMT_ACTIVE_SET.req TLVs";

        let sign1 = Sign1::sign(&signing_key, b"commissioner-testvec", None, external_aad).expect("sign");
        let encoded = sign1.to_bytes().expect("encode COSE_Sign1");

        let decoded = Sign1::from_bytes(*algorithm, &encoded).expect("decode COSE_Sign1");
        decoded
            .verify(&signing_key.verifying_key(), external_aad)
            .expect("verify round trip");

        vectors.insert(
            name.to_string(),
            TestVector {
                description: format!("{algorithm:?} detached COSE_Sign1 over a fixed external_aad"),
                inputs: BTreeMap::from([
                    ("private_scalar".to_string(), hex::encode(&scalar)),
                    ("external_aad".to_string(), hex::encode(external_aad)),
                    ("kid".to_string(), hex::encode(b"commissioner-testvec")),
                ]),
                outputs: BTreeMap::from([("cose_sign1_cbor".to_string(), hex::encode(&encoded))]),
            },
        );
    }

    vectors
}

/// MeshCoP TLV encodings: a short-form length, the canonical boundary case
/// at the long/short-form threshold, and a multi-TLV set in insertion order.
fn generate_tlv_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let commissioner_id = Tlv::new(10, b"OT-Commissioner".to_vec());
    let mut encoded = Vec::new();
    commissioner_id.encode_into(&mut encoded).expect("encode");
    vectors.insert(
        "tlv_short_form".to_string(),
        TestVector {
            description: "Commissioner ID TLV, short-form length".to_string(),
            inputs: BTreeMap::from([
                ("tlv_type".to_string(), "10".to_string()),
                ("value_ascii".to_string(), "OT-Commissioner".to_string()),
            ]),
            outputs: BTreeMap::from([("encoded".to_string(), hex::encode(&encoded))]),
        },
    );

    let boundary = Tlv::new(34, vec![0xAB; 255]);
    let mut encoded = Vec::new();
    boundary.encode_into(&mut encoded).expect("encode");
    vectors.insert(
        "tlv_extended_length_boundary".to_string(),
        TestVector {
            description: "255-byte value: smallest length requiring the extended (3-byte) form".to_string(),
            inputs: BTreeMap::from([
                ("tlv_type".to_string(), "34".to_string()),
                ("value_length".to_string(), "255".to_string()),
            ]),
            outputs: BTreeMap::from([("encoded".to_string(), hex::encode(&encoded))]),
        },
    );

    let set = TlvSet::new()
        .with(Tlv::new(0, vec![0x0D]))
        .with(Tlv::new(1, 0x2234u16.to_be_bytes().to_vec()))
        .clone();
    let encoded = set.encode().expect("encode set");
    vectors.insert(
        "tlv_set_channel_and_panid".to_string(),
        TestVector {
            description: "Channel + PAN ID TLVs in insertion order".to_string(),
            inputs: BTreeMap::from([
                ("channel".to_string(), "13".to_string()),
                ("pan_id".to_string(), "0x2234".to_string()),
            ]),
            outputs: BTreeMap::from([("encoded".to_string(), hex::encode(&encoded))]),
        },
    );

    vectors
}

fn generate_all() -> TestVectors {
    let mut vectors = BTreeMap::new();
    vectors.extend(generate_pskc_vectors());
    vectors.extend(generate_cose_vectors());
    vectors.extend(generate_tlv_vectors());

    TestVectors {
        version: "1".to_string(),
        generated_by: "commissioner-testvec".to_string(),
        vectors,
    }
}

const OUTPUT_PATH: &str = "test_vectors.json";

fn main() -> anyhow::Result<()> {
    let verify = std::env::args().any(|a| a == "--verify");
    let fresh = generate_all();

    if verify {
        let existing = std::fs::read_to_string(OUTPUT_PATH)
            .with_context(|| format!("failed to read {OUTPUT_PATH}"))?;
        let existing: TestVectors =
            serde_json::from_str(&existing).with_context(|| format!("failed to parse {OUTPUT_PATH}"))?;
        anyhow::ensure!(
            existing == fresh,
            "{OUTPUT_PATH} is stale; re-run without --verify to regenerate it"
        );
        println!("{OUTPUT_PATH} matches {} freshly generated vectors", fresh.vectors.len());
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&fresh).context("serialize test vectors")?;
    std::fs::write(OUTPUT_PATH, json).with_context(|| format!("failed to write {OUTPUT_PATH}"))?;
    println!("wrote {} vectors to {OUTPUT_PATH}", fresh.vectors.len());
    Ok(())
}
