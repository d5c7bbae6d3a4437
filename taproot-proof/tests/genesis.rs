mod support;

use bitcoin::hashes::{sha256::Hash as Sha256Hash, Hash};
use support::{init_logger, key_of, keypair, verifiers, Mint};
use taproot_proof::core::verify::{genesis, group_key_reveal, Error};
use taproot_proof::core::OpsError;
use taproot_proof::types::asset::SerializedKey;
use taproot_proof::types::meta::{MetaReveal, MetaType};
use taproot_proof::{verify_proof, Proof, VerifyContext};

fn verify(proof: &Proof) -> Result<(), Error> {
    verify_proof(proof, None, verifiers(), VerifyContext::default()).map(|_| ())
}

fn genesis_err(proof: &Proof) -> genesis::Error {
    match verify(proof) {
        Err(Error::Genesis(err)) => err,
        other => panic!("expected genesis error, got {other:?}"),
    }
}

#[test]
fn minted_asset_verifies() {
    init_logger();
    let hop = Mint::default().build();
    let snapshot = verify_proof(&hop.proof, None, verifiers(), VerifyContext::default()).unwrap();

    assert_eq!(snapshot.asset, hop.proof.asset);
    assert_eq!(snapshot.out_point, hop.proof.out_point());
    assert_eq!(snapshot.anchor_block_height, hop.proof.block_height);
    assert_eq!(snapshot.meta_reveal, hop.proof.meta_reveal);
    assert!(!snapshot.split_asset);
}

#[test]
fn mint_without_meta_needs_no_meta_reveal() {
    init_logger();
    let hop = Mint {
        meta: None,
        ..Mint::default()
    }
    .build();
    verify(&hop.proof).unwrap();
}

#[test]
fn json_meta_verifies() {
    let hop = Mint {
        meta: Some(MetaReveal::new(MetaType::Json, br#"{"name":"beef"}"#.to_vec())),
        ..Mint::default()
    }
    .build();
    verify(&hop.proof).unwrap();
}

#[test]
fn genesis_reveal_mutations() {
    init_logger();
    let hop = Mint::default().build();

    let mut proof = hop.proof.clone();
    proof.genesis_reveal = None;
    assert_eq!(genesis_err(&proof), genesis::Error::GenesisRevealRequired);

    let mut proof = hop.proof.clone();
    proof.meta_reveal = None;
    assert_eq!(genesis_err(&proof), genesis::Error::MetaRevealRequired);

    let mut proof = hop.proof.clone();
    proof.meta_reveal = Some(MetaReveal::new(MetaType::Opaque, b"other meta".to_vec()));
    assert_eq!(genesis_err(&proof), genesis::Error::MetaHashMismatch);

    let mut proof = hop.proof.clone();
    if let Some(reveal) = proof.genesis_reveal.as_mut() {
        reveal.meta_hash = Sha256Hash::hash(b"not the meta");
    }
    assert_eq!(genesis_err(&proof), genesis::Error::MetaHashMismatch);

    let mut proof = hop.proof.clone();
    if let Some(reveal) = proof.genesis_reveal.as_mut() {
        reveal.first_prev_out.vout += 1;
    }
    assert_eq!(genesis_err(&proof), genesis::Error::PrevOutMismatch);

    let mut proof = hop.proof.clone();
    if let Some(reveal) = proof.genesis_reveal.as_mut() {
        reveal.output_index = 1;
    }
    assert_eq!(genesis_err(&proof), genesis::Error::OutputIndexMismatch);

    let mut proof = hop.proof.clone();
    if let Some(reveal) = proof.genesis_reveal.as_mut() {
        reveal.tag.push('!');
    }
    assert_eq!(genesis_err(&proof), genesis::Error::AssetIdMismatch);
}

#[test]
fn reveals_on_a_transfer_are_rejected() {
    let mint = Mint::default().build();
    let mut hop = support::transfer(&mint, taproot_proof::types::codec::TransitionVersion::V0, 40);

    hop.proof.genesis_reveal = mint.proof.genesis_reveal.clone();
    assert_eq!(
        genesis_err(&hop.proof),
        genesis::Error::NonGenesisAssetWithGenesisReveal
    );

    hop.proof.genesis_reveal = None;
    hop.proof.meta_reveal = mint.proof.meta_reveal.clone();
    assert_eq!(
        genesis_err(&hop.proof),
        genesis::Error::NonGenesisAssetWithMetaReveal
    );
}

#[test]
fn grouped_mint_verifies() {
    init_logger();
    let bip86 = Mint {
        grouped: true,
        ..Mint::default()
    }
    .build();
    verify(&bip86.proof).unwrap();

    let scripted = Mint {
        seed: 2,
        grouped: true,
        group_tapscript_root: Some([0x5a; 32]),
        ..Mint::default()
    }
    .build();
    verify(&scripted.proof).unwrap();
    assert_ne!(bip86.proof.asset.group_key, scripted.proof.asset.group_key);
}

#[test]
fn group_key_reveal_mutations() {
    init_logger();
    let hop = Mint {
        grouped: true,
        group_tapscript_root: Some([0x5a; 32]),
        ..Mint::default()
    }
    .build();

    let mut proof = hop.proof.clone();
    if let Some(reveal) = proof.group_key_reveal.as_mut() {
        reveal.raw_key = key_of(&keypair(99));
    }
    assert!(matches!(
        verify(&proof),
        Err(Error::GroupKeyReveal(group_key_reveal::Error::GroupKeyMismatch))
    ));

    let mut proof = hop.proof.clone();
    if let Some(reveal) = proof.group_key_reveal.as_mut() {
        reveal.tapscript_root = Some([0x5b; 32]);
    }
    assert!(matches!(
        verify(&proof),
        Err(Error::GroupKeyReveal(group_key_reveal::Error::GroupKeyMismatch))
    ));

    let mut proof = hop.proof.clone();
    if let Some(reveal) = proof.group_key_reveal.as_mut() {
        reveal.tapscript_root = None;
    }
    assert!(matches!(
        verify(&proof),
        Err(Error::GroupKeyReveal(group_key_reveal::Error::GroupKeyMismatch))
    ));

    let mut proof = hop.proof.clone();
    if let Some(reveal) = proof.group_key_reveal.as_mut() {
        reveal.raw_key = SerializedKey { bytes: [0x05; 33] };
    }
    assert!(matches!(
        verify(&proof),
        Err(Error::GroupKeyReveal(group_key_reveal::Error::Ops(
            OpsError::InvalidRawGroupKey
        )))
    ));
}

#[test]
fn ungrouped_reveal_needs_a_group_key() {
    let mut hop = Mint::default().build();
    hop.proof.group_key_reveal = Some(taproot_proof::types::asset::GroupKeyReveal {
        raw_key: key_of(&keypair(7)),
        tapscript_root: None,
    });
    assert!(matches!(
        verify(&hop.proof),
        Err(Error::GroupKeyReveal(group_key_reveal::Error::MissingGroupKey))
    ));
}
