//! In-memory protobuf schema and dynamic runtime values.
//!
//! A [Value] is always read together with the [FieldSchema] that declared it:
//! the bare value only knows its own shape, the schema knows which enum, which
//! nested message and which map key/value types it belongs to.
//!
//! ```
//! use deal_schema::*;
//!
//! let message = MessageSchema::new(
//!     "example.Point",
//!     GoIdent::new("Point", "example.com/point"),
//!     vec![
//!         FieldSchema::scalar("x", 1, FieldKind::Int64),
//!         FieldSchema::scalar("y", 2, FieldKind::Int64),
//!     ],
//! );
//!
//! let index = FieldsByNumber::new(&message.fields);
//! assert_eq!(index.get(2).map(|field| field.go_name.as_str()), Some("Y"));
//!
//! let value = MessageValue::new().with(1, Value::Int64(3));
//! assert_eq!(value.len(), 1);
//! ```

pub mod naming;
pub mod schema;
pub mod value;

pub use schema::*;
pub use value::*;

/// Protobuf field number.
pub type FieldNumber = u32;
