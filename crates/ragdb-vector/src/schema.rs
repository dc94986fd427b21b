use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const ID_COLUMN: &str = "id";
pub const CONTENT_COLUMN: &str = "content";
pub const SOURCE_COLUMN: &str = "source";
/// Full metadata map serialised as a JSON object.
pub const METADATA_COLUMN: &str = "metadata";
pub const VECTOR_COLUMN: &str = "vector";
/// Populated by LanceDB on vector search results.
pub const DISTANCE_COLUMN: &str = "_distance";

pub fn vector_field_type(dim: usize) -> DataType {
    DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32)
}

pub fn build_arrow_schema(dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new(CONTENT_COLUMN, DataType::Utf8, false),
        Field::new(SOURCE_COLUMN, DataType::Utf8, false),
        Field::new(METADATA_COLUMN, DataType::Utf8, false),
        Field::new(VECTOR_COLUMN, vector_field_type(dim), true),
    ]))
}

/// Dimensionality of the `vector` column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
        DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
        _ => None,
    }
}
