pub mod attributes;
pub mod codec;
pub mod custom;
pub mod numeric_kind;
pub mod value_cell;
