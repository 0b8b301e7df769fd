use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("doc_id", DataType::Utf8, false),
		Field::new("doc_project", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Length of the `vector` column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<i32> {
	match schema.field_with_name("vector").ok()?.data_type() {
		DataType::FixedSizeList(_, dim) => Some(*dim),
		_ => None,
	}
}
