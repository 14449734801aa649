//! Property-based tests for decoding and normalization.

mod common;

use common::PolBuilder;
use proptest::prelude::*;
use regpol_parser::{
    DecodeOptions, Fingerprint, Hive, Normalizer, PolicyFile, RecordEntry, SizeFieldPolicy,
    ValueData, ValueType, TYPE_TABLE,
};
use std::collections::HashSet;

/// A setting written into a generated blob.
#[derive(Debug, Clone)]
enum Setting {
    Dword(String, String, u32),
    Text(String, String, String),
}

fn arb_key() -> impl Strategy<Value = String> {
    r"[A-Za-z][A-Za-z0-9 \\]{0,24}"
}

fn arb_setting() -> impl Strategy<Value = Setting> {
    prop_oneof![
        (arb_key(), "[A-Za-z]{0,10}", any::<u32>()).prop_map(|(k, v, n)| Setting::Dword(k, v, n)),
        (arb_key(), "[A-Za-z]{0,10}", "[ -~]{0,16}").prop_map(|(k, v, s)| Setting::Text(k, v, s)),
    ]
}

fn build(settings: &[Setting]) -> Vec<u8> {
    settings
        .iter()
        .fold(PolBuilder::new(), |builder, setting| match setting {
            Setting::Dword(k, v, n) => builder.dword(k, v, *n),
            Setting::Text(k, v, s) => builder.string(k, v, s),
        })
        .build()
}

fn decode(bytes: Vec<u8>, options: DecodeOptions) -> Vec<RecordEntry> {
    PolicyFile::from_vec(bytes, "gpo/Machine/Registry.pol").decode(options)
}

fn arb_entry() -> impl Strategy<Value = RecordEntry> {
    let data = prop_oneof![
        Just(ValueData::Blob),
        Just(ValueData::Unresolved),
        "[a-z?]{0,4}".prop_map(ValueData::String),
        any::<[u8; 4]>().prop_map(|b| ValueData::Dword(b.to_vec())),
    ];
    ("[ab]", "[xy]", 0usize..TYPE_TABLE.len(), data, "[12]").prop_map(
        |(key, value_name, index, data, source)| RecordEntry {
            hive: Hive::LocalMachine,
            key,
            value_name,
            value_type: TYPE_TABLE[index],
            data,
            source,
        },
    )
}

proptest! {
    #[test]
    fn prop_well_formed_blob_decodes_every_record(settings in prop::collection::vec(arb_setting(), 0..12)) {
        let records = decode(build(&settings), DecodeOptions::default());
        prop_assert_eq!(records.len(), settings.len());

        for (record, setting) in records.iter().zip(&settings) {
            match setting {
                Setting::Dword(k, v, n) => {
                    prop_assert_eq!(&record.key, k);
                    prop_assert_eq!(&record.value_name, v);
                    prop_assert_eq!(record.data.as_u32(), Some(*n));
                    prop_assert_eq!(record.rendered_data(), format!("0x{:08x}", n));
                }
                Setting::Text(k, v, s) => {
                    prop_assert_eq!(&record.key, k);
                    prop_assert_eq!(&record.value_name, v);
                    prop_assert_eq!(record.value_type, ValueType::String);
                    prop_assert_eq!(record.rendered_data(), s.clone());
                }
            }
        }
    }

    #[test]
    fn prop_truncation_yields_a_prefix(
        settings in prop::collection::vec(arb_setting(), 1..8),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = build(&settings);
        let full = decode(bytes.clone(), DecodeOptions::default());
        let len = cut.index(bytes.len() + 1);
        let partial = decode(bytes[..len].to_vec(), DecodeOptions::default());

        prop_assert!(partial.len() <= full.len());
        prop_assert_eq!(&full[..partial.len()], &partial[..]);
    }

    #[test]
    fn prop_arbitrary_bytes_terminate(
        bytes in prop::collection::vec(any::<u8>(), 0..512),
        realign in any::<bool>(),
    ) {
        let policy = if realign {
            SizeFieldPolicy::Realign { max_skips: 8 }
        } else {
            SizeFieldPolicy::FailFast
        };
        let options = DecodeOptions::default().with_size_field_policy(policy);

        let first = decode(bytes.clone(), options);
        let second = decode(bytes, options);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_normalized_set_is_clean(entries in prop::collection::vec(arb_entry(), 0..40)) {
        let mut normalizer = Normalizer::new();
        normalizer.extend(entries.clone());
        let results = normalizer.finish();

        let mut seen = HashSet::new();
        for entry in &results {
            prop_assert!(!entry.value_type.is_excluded());
            prop_assert!(!entry.rendered_data().contains("??"));
            prop_assert!(seen.insert(Fingerprint::of(entry)));
        }

        // Each surviving fingerprint carries the last entry seen for it
        for entry in &results {
            let fingerprint = Fingerprint::of(entry);
            let last = entries.iter().rev().find(|e| Fingerprint::of(e) == fingerprint);
            prop_assert_eq!(Some(entry), last);
        }
    }

    #[test]
    fn prop_merge_is_idempotent(entries in prop::collection::vec(arb_entry(), 0..40)) {
        let mut normalizer = Normalizer::new();
        normalizer.extend(entries);
        let once = normalizer.finish();

        let mut twice = once.clone();
        twice.merge(once.clone());
        prop_assert_eq!(once.into_vec(), twice.into_vec());
    }
}
