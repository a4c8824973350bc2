use comexe_blobstore::{BlobStore, Value};
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        any::<f64>().prop_map(Value::Double),
        any::<bool>().prop_map(Value::Boolean),
        Just(Value::Nil),
        any::<u64>().prop_map(Value::Opaque),
        proptest::collection::vec(any::<u8>(), 0..64).prop_map(Value::String),
    ]
}

proptest! {
    #[test]
    fn every_pushed_value_round_trips_bitwise(values in proptest::collection::vec(arb_value(), 1..64)) {
        let mut store = BlobStore::new(2, 8);
        let keys: Vec<_> = values.iter().map(|v| store.push_value(v)).collect();
        for (key, expected) in keys.iter().zip(values.iter()) {
            let actual = store.get_value(*key).unwrap();
            prop_assert_eq!(&actual, expected);
        }
    }

    #[test]
    fn every_key_resolves_after_doubling_growth_twice(count in 1usize..300) {
        let mut store = BlobStore::new(2, 8);
        let mut keys = Vec::new();
        for i in 0..count {
            keys.push(store.push_integer(i as i64));
        }
        for (i, key) in keys.iter().enumerate() {
            prop_assert_eq!(store.get_integer(*key).unwrap(), i as i64);
            prop_assert_eq!(store.address_of(*key).unwrap() % 8, 0);
        }
    }

    #[test]
    fn no_two_pushes_return_the_same_key_before_reset(count in 1usize..200) {
        let mut store = BlobStore::new(2, 8);
        let mut seen = std::collections::HashSet::new();
        for i in 0..count {
            let key = store.push_integer(i as i64);
            prop_assert!(seen.insert(key));
        }
    }
}
