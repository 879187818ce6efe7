use std::collections::BTreeMap;
use std::sync::Arc;

use deal_compiler::error::DealError;
use deal_compiler::compile_literal;
use deal_schema::{
    EnumSchema, FieldKind, FieldSchema, GoIdent, MapKey, MapValue, MessageSchema, Value,
};
use proptest::prelude::*;

const PKG: &str = "example.com/testpb";

fn go_name(ident: &GoIdent) -> String {
    ident.go_name.clone()
}

fn enum_field(members: usize) -> FieldSchema {
    let names: Vec<String> = (0..members).map(|i| format!("M{}", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let enum_type = EnumSchema::with_members("test.E", GoIdent::new("E", PKG), &names);
    FieldSchema::enumeration("e", 1, Arc::new(enum_type))
}

fn int64_map_field() -> FieldSchema {
    let entry = MessageSchema::map_entry(
        "test.Holder.ValuesEntry",
        GoIdent::new("Holder_ValuesEntry", PKG),
        FieldKind::Int64,
        FieldSchema::scalar("value", 2, FieldKind::Int64),
    );
    FieldSchema::map("values", 1, Arc::new(entry))
}

proptest! {
    #[test]
    fn enum_ordinal_in_range_iff_compiles(members in 1usize..8, ordinal in -20i32..20) {
        let field = enum_field(members);
        let result = compile_literal(&go_name, Some(&field), &Value::Enum(ordinal));

        if ordinal >= 0 && (ordinal as usize) < members {
            prop_assert_eq!(result.unwrap(), format!("E_M{}", ordinal));
        } else {
            let out_of_range = matches!(result, Err(DealError::EnumOutOfRange { count, .. }) if count == members);
            prop_assert!(out_of_range);
        }
    }

    #[test]
    fn list_keeps_order_and_length(values in proptest::collection::vec(any::<i32>(), 0..32)) {
        let field = FieldSchema::scalar("xs", 1, FieldKind::Int32).repeated();
        let list = Value::List(values.iter().copied().map(Value::Int32).collect());
        let literal = compile_literal(&go_name, Some(&field), &list).unwrap();

        let inner = literal
            .strip_prefix("[]int32{")
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap();
        let rendered: Vec<i32> = if inner.is_empty() {
            Vec::new()
        } else {
            inner.split(", ").map(|v| v.parse().unwrap()).collect()
        };
        prop_assert_eq!(rendered, values);
    }

    #[test]
    fn map_renders_every_entry_sorted(entries in proptest::collection::btree_map(any::<i64>(), any::<i64>(), 0..16)) {
        let field = int64_map_field();
        let map = entries
            .iter()
            .fold(MapValue::new(), |map, (k, v)| map.with(MapKey::Int64(*k), Value::Int64(*v)));
        let literal = compile_literal(&go_name, Some(&field), &Value::Map(map)).unwrap();

        let inner = literal
            .strip_prefix("map[int64]int64{")
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap();
        let rendered: Vec<(i64, i64)> = if inner.is_empty() {
            Vec::new()
        } else {
            inner
                .split(", ")
                .map(|entry| {
                    let (k, v) = entry.split_once(": ").unwrap();
                    (k.parse().unwrap(), v.parse().unwrap())
                })
                .collect()
        };
        let expected: Vec<(i64, i64)> = entries.into_iter().collect::<BTreeMap<_, _>>().into_iter().collect();
        prop_assert_eq!(rendered, expected);
    }
}
