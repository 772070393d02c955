//! # MiMC over BN254 — the circuit hash
//!
//! One implementation, two frontends. The native path hashes `Fr`
//! elements directly; the gadget path emits the identical computation as
//! R1CS constraints over `FpVar<Fr>`. Both consume the same
//! round-constant table, derived once from the literal seed string
//! `"seed"`, so the account state root computed off-circuit is — by
//! construction, not by luck — the same field element the circuit
//! asserts against.
//!
//! ## Construction
//!
//! - **Permutation**: 110-round MiMC with the degree-5 S-box,
//!   `x ← (x + k + c_i)^5`, followed by a final key addition. The
//!   exponent 5 is coprime to `r - 1` on BN254, so each round is a
//!   permutation of the field.
//! - **Hash**: Miyaguchi–Preneel chaining over field-element blocks:
//!   `h ← E_h(m) + h + m`, starting from `h = 0`.
//! - **Constants**: `c_0 = SHA-256(seed)`, `c_{i+1} = SHA-256(c_i)`,
//!   each digest reduced into `Fr`. Derivation happens once behind a
//!   `OnceLock`.
//!
//! ## Folds
//!
//! [`state_root`] commits to an ordered balance list: hash each balance
//! alone, then hash pairwise upward; an odd trailing element is carried
//! to the next level *unchanged*. This is deliberately different from
//! the transport Merkle tree in [`super::merkle`], which duplicates odd
//! leaves — do not unify the two rules.

use std::str::FromStr;
use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_relations::r1cs::SynthesisError;

use crate::config::MIMC_SEED;
use crate::crypto::hash::sha256;
use crate::error::ChainError;

/// Number of rounds of the MiMC permutation. With the degree-5 S-box on
/// a ~254-bit field, 110 rounds clears the algebraic-attack margin.
const MIMC_ROUNDS: usize = 110;

/// Field elements are packed from byte strings 31 bytes at a time so a
/// block can never exceed the modulus.
const BYTES_PER_BLOCK: usize = 31;

// ---------------------------------------------------------------------------
// Round constants
// ---------------------------------------------------------------------------

/// The shared round-constant table. Derived from the seed on first use
/// and reused by both the native hash and the R1CS gadget.
fn round_constants() -> &'static [Fr; MIMC_ROUNDS] {
    static CONSTANTS: OnceLock<[Fr; MIMC_ROUNDS]> = OnceLock::new();
    CONSTANTS.get_or_init(|| {
        let mut digest = sha256(MIMC_SEED.as_bytes());
        let mut constants = [Fr::from(0u64); MIMC_ROUNDS];
        for c in constants.iter_mut() {
            digest = sha256(&digest);
            *c = Fr::from_be_bytes_mod_order(&digest);
        }
        constants
    })
}

// ---------------------------------------------------------------------------
// Native implementation
// ---------------------------------------------------------------------------

/// The MiMC block cipher: encrypt `msg` under `key`.
fn encrypt(key: Fr, msg: Fr) -> Fr {
    let mut x = msg;
    for c in round_constants() {
        let t = x + key + c;
        let t2 = t * t;
        x = t2 * t2 * t;
    }
    x + key
}

/// Hash a sequence of field elements (Miyaguchi–Preneel over the MiMC
/// permutation).
pub fn hash_fields(blocks: &[Fr]) -> Fr {
    let mut h = Fr::from(0u64);
    for m in blocks {
        h = encrypt(h, *m) + h + m;
    }
    h
}

/// Hash an arbitrary byte string by packing it into 31-byte big-endian
/// blocks. Used for batch-tree leaves (serialized transaction lines).
pub fn hash_bytes(data: &[u8]) -> Fr {
    let blocks: Vec<Fr> = data
        .chunks(BYTES_PER_BLOCK)
        .map(Fr::from_be_bytes_mod_order)
        .collect();
    hash_fields(&blocks)
}

/// Combine two field elements into one — the internal node of every
/// MiMC fold in this crate.
pub fn hash_two(left: Fr, right: Fr) -> Fr {
    hash_fields(&[left, right])
}

/// Commit to an ordered list of balances: hash each alone, then fold
/// pairwise upward, carrying an odd trailing element unchanged.
///
/// The caller is responsible for ordering — the canonical order is
/// ascending by account address.
pub fn state_root(balances: &[u64]) -> Fr {
    let mut level: Vec<Fr> = balances
        .iter()
        .map(|b| hash_fields(&[Fr::from(*b)]))
        .collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            if pair.len() == 2 {
                next.push(hash_two(pair[0], pair[1]));
            } else {
                next.push(pair[0]);
            }
        }
        level = next;
    }

    level.first().copied().unwrap_or_else(|| Fr::from(0u64))
}

// ---------------------------------------------------------------------------
// Field element <-> decimal string
// ---------------------------------------------------------------------------

/// Serialize a field element as the decimal string of its canonical
/// representative. This is the wire form of every state root and batch
/// root in headers and proof blobs.
pub fn field_to_decimal(f: &Fr) -> String {
    f.into_bigint().to_string()
}

/// Parse the decimal wire form back into a field element.
pub fn decimal_to_field(s: &str) -> Result<Fr, ChainError> {
    Fr::from_str(s)
        .map_err(|_| ChainError::MalformedRequest(format!("not a decimal field element: {s:?}")))
}

// ---------------------------------------------------------------------------
// R1CS gadget
// ---------------------------------------------------------------------------

/// In-circuit MiMC encryption. Identical round structure to [`encrypt`];
/// the constants enter the constraint system as compile-time constants,
/// not witnesses.
fn encrypt_gadget(key: &FpVar<Fr>, msg: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    let mut x = msg.clone();
    for c in round_constants() {
        let t = &x + key + FpVar::constant(*c);
        let t2 = t.square()?;
        x = t2.square()? * t;
    }
    Ok(x + key)
}

/// In-circuit counterpart of [`hash_fields`].
pub fn hash_fields_gadget(blocks: &[FpVar<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
    let mut h = FpVar::<Fr>::zero();
    for m in blocks {
        h = encrypt_gadget(&h, m)? + &h + m;
    }
    Ok(h)
}

/// In-circuit counterpart of [`hash_two`].
pub fn hash_two_gadget(left: &FpVar<Fr>, right: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    hash_fields_gadget(&[left.clone(), right.clone()])
}

/// In-circuit counterpart of [`state_root`], over already-allocated
/// balance variables. Same leaf rule, same odd-carry fold.
pub fn state_root_gadget(balances: &[FpVar<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
    let mut level = balances
        .iter()
        .map(|b| hash_fields_gadget(std::slice::from_ref(b)))
        .collect::<Result<Vec<_>, _>>()?;

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            if pair.len() == 2 {
                next.push(hash_two_gadget(&pair[0], &pair[1])?);
            } else {
                next.push(pair[0].clone());
            }
        }
        level = next;
    }

    Ok(level.into_iter().next().unwrap_or_else(FpVar::zero))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;
    use ark_r1cs_std::alloc::AllocVar;
    use ark_r1cs_std::R1CSVar;
    use ark_relations::r1cs::ConstraintSystem;
    use ark_std::rand::rngs::StdRng;
    use ark_std::rand::SeedableRng;

    #[test]
    fn hash_is_deterministic() {
        let a = hash_fields(&[Fr::from(42u64)]);
        let b = hash_fields(&[Fr::from(42u64)]);
        assert_eq!(a, b);
        assert_ne!(a, hash_fields(&[Fr::from(43u64)]));
    }

    #[test]
    fn two_blocks_differ_from_one() {
        let one = hash_fields(&[Fr::from(1u64)]);
        let two = hash_fields(&[Fr::from(1u64), Fr::from(1u64)]);
        assert_ne!(one, two);
    }

    #[test]
    fn hash_two_is_order_sensitive() {
        let l = Fr::from(7u64);
        let r = Fr::from(11u64);
        assert_ne!(hash_two(l, r), hash_two(r, l));
    }

    #[test]
    fn state_root_odd_carry() {
        // Three balances: the third leaf is carried up unchanged, so the
        // root is hash(hash(l0, l1), l2).
        let balances = [300u64, 500, 1_000];
        let leaves: Vec<Fr> = balances
            .iter()
            .map(|b| hash_fields(&[Fr::from(*b)]))
            .collect();
        let expected = hash_two(hash_two(leaves[0], leaves[1]), leaves[2]);
        assert_eq!(state_root(&balances), expected);
    }

    #[test]
    fn state_root_single_balance_is_its_leaf() {
        let root = state_root(&[123u64]);
        assert_eq!(root, hash_fields(&[Fr::from(123u64)]));
    }

    #[test]
    fn decimal_round_trip() {
        let f = hash_fields(&[Fr::from(9u64)]);
        let s = field_to_decimal(&f);
        assert!(s.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(decimal_to_field(&s).unwrap(), f);
    }

    #[test]
    fn decimal_rejects_garbage() {
        assert!(decimal_to_field("0x12").is_err());
        assert!(decimal_to_field("not a number").is_err());
    }

    #[test]
    fn gadget_matches_native_on_random_vectors() {
        // The cross-layer contract: the circuit's hash and the native
        // hash must agree on every input. Exercised on random blocks.
        let mut rng = StdRng::seed_from_u64(42);
        let cs = ConstraintSystem::<Fr>::new_ref();

        for len in 1..=4usize {
            let blocks: Vec<Fr> = (0..len).map(|_| Fr::rand(&mut rng)).collect();
            let native = hash_fields(&blocks);

            let vars: Vec<FpVar<Fr>> = blocks
                .iter()
                .map(|b| FpVar::new_witness(cs.clone(), || Ok(*b)).unwrap())
                .collect();
            let circuit = hash_fields_gadget(&vars).unwrap();

            assert_eq!(circuit.value().unwrap(), native, "mismatch at {len} blocks");
        }
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn state_root_gadget_matches_native() {
        let balances = [1_000_000u64, 500_000, 300_000];
        let native = state_root(&balances);

        let cs = ConstraintSystem::<Fr>::new_ref();
        let vars: Vec<FpVar<Fr>> = balances
            .iter()
            .map(|b| FpVar::new_witness(cs.clone(), || Ok(Fr::from(*b))).unwrap())
            .collect();
        let circuit = state_root_gadget(&vars).unwrap();

        assert_eq!(circuit.value().unwrap(), native);
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn hash_bytes_packs_long_inputs() {
        // 62 bytes = exactly two blocks; must differ from the first
        // block alone.
        let data = [0xabu8; 62];
        let full = hash_bytes(&data);
        let first = hash_bytes(&data[..31]);
        assert_ne!(full, first);
    }
}
