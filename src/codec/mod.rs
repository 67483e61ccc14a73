//! The codec module contains the components responsible for converting
//! between wire-level byte payloads and typed application values.

pub mod address;
pub mod value;

pub use address::GroupAddress;
pub use value::{decode, encode, BusValue, DataType, RawFrame, ValueKind};
