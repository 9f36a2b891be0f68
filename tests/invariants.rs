//! Longest-prefix-match invariants, checked as black-box properties
//! against the public `Builder`/`Poptrie` API rather than against
//! internal array layout (which is exercised by the `poptrie` module's
//! own unit tests).

use rand::Rng;

use poptrie_store::Builder;

mod common;
use common::ip;

/// Brute-force LPM over the same table a `Poptrie` was built from,
/// used as the oracle for the longest-prefix-wins property.
fn brute_force_lookup(table: &[(u32, u8, u32)], key: u32) -> Option<u32> {
    table
        .iter()
        .filter(|&&(addr, len, _)| covers(addr, len, key))
        .max_by_key(|&&(_, len, _)| len)
        .map(|&(_, _, fib)| fib)
}

fn covers(addr: u32, len: u8, key: u32) -> bool {
    if len == 0 {
        return true;
    }
    let mask = u32::MAX << (32 - len);
    addr & mask == key & mask
}

fn build(table: &[(u32, u8, u32)], direct_bits: u8) -> poptrie_store::Poptrie {
    let mut b = Builder::new();
    for &(addr, len, fib) in table {
        b.insert(addr, len, fib);
    }
    b.build_poptrie(direct_bits).unwrap()
}

#[test]
fn invariant_longest_prefix_wins_against_random_tables() {
    common::init();
    let mut rng = rand::rng();

    for direct_bits in [0u8, 6, 12] {
        // A default route guarantees every key resolves; without one,
        // "no matching prefix" is left unresolved by design.
        let mut table: Vec<(u32, u8, u32)> = vec![(0, 0, 0)];
        for fib in 1..80u32 {
            let addr: u32 = rng.random();
            let len: u8 = rng.random_range(1..=32);
            let mask = u32::MAX << (32 - len);
            table.push((addr & mask, len, fib));
        }
        let t = build(&table, direct_bits);

        for _ in 0..500 {
            let key: u32 = rng.random();
            let expected = brute_force_lookup(&table, key);
            assert_eq!(t.lookup(key), expected, "direct_bits={direct_bits} key={key:08x}");
        }
    }
}

#[test]
fn invariant_every_inserted_prefix_resolves_to_itself_when_uncovered() {
    common::init();
    // A prefix with no strictly-longer cover in the same table must
    // resolve to its own fib.
    let table: [(u32, u8, u32); 4] = [
        (0, 0, 0),
        (ip(10, 0, 0, 0), 8, 1),
        (ip(172, 16, 0, 0), 12, 2),
        (ip(192, 168, 1, 0), 24, 3),
    ];
    let t = build(&table, 12);
    for &(addr, _, fib) in &table {
        assert_eq!(t.lookup(addr), Some(fib));
    }
}

#[test]
fn invariant_build_is_deterministic() {
    common::init();
    let table: Vec<(u32, u8, u32)> = (0..200u32)
        .map(|i| (ip(10, (i / 256) as u8, (i % 256) as u8, 0), 24, i))
        .chain(std::iter::once((0, 0, 9999)))
        .collect();

    let a = build(&table, 12);
    let b = build(&table, 12);

    assert_eq!(a.internal_node_count(), b.internal_node_count());
    assert_eq!(a.leaf_count(), b.leaf_count());
    assert_eq!(a.direct_array_len(), b.direct_array_len());

    let mut rng = rand::rng();
    for _ in 0..1000 {
        let key: u32 = rng.random();
        assert_eq!(a.lookup(key), b.lookup(key));
    }
}

#[test]
fn invariant_direct_pointing_choice_does_not_change_answers() {
    common::init();
    let table: [(u32, u8, u32); 5] = [
        (0, 0, 0),
        (ip(10, 0, 0, 0), 8, 1),
        (ip(10, 1, 0, 0), 16, 2),
        (ip(172, 16, 0, 0), 12, 3),
        (ip(192, 168, 1, 0), 24, 4),
    ];

    let plain = build(&table, 0);
    let direct6 = build(&table, 6);
    let direct12 = build(&table, 12);
    let direct18 = build(&table, 18);

    let mut rng = rand::rng();
    for _ in 0..1000 {
        let key: u32 = rng.random();
        let want = plain.lookup(key);
        assert_eq!(direct6.lookup(key), want, "direct_bits=6 key={key:08x}");
        assert_eq!(direct12.lookup(key), want, "direct_bits=12 key={key:08x}");
        assert_eq!(direct18.lookup(key), want, "direct_bits=18 key={key:08x}");
    }
}

#[test]
fn empty_builder_rejected_not_a_silent_sentinel() {
    common::init();
    let b = Builder::new();
    assert!(b.build_poptrie(0).is_err());
}
