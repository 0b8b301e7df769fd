//! LanceDB connection and table helpers.

use arrow_array::RecordBatchIterator;
use lancedb::{connect, Connection, Table};

use docrag_core::error::{Error, Result};

use crate::schema::{build_arrow_schema, vector_dim};

pub async fn open_db(uri: &str) -> Result<Connection> {
	connect(uri).execute().await.map_err(Error::index)
}

/// Open `name`, creating it empty when missing. An existing table must
/// have been created with the same vector dimension.
pub async fn ensure_table(conn: &Connection, name: &str, dim: i32) -> Result<Table> {
	let names = conn.table_names().execute().await.map_err(Error::index)?;
	if !names.iter().any(|n| n == name) {
		let schema = build_arrow_schema(dim);
		let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
		conn.create_table(name, Box::new(iter)).execute().await.map_err(Error::index)?;
	}
	let table = conn.open_table(name).execute().await.map_err(Error::index)?;
	let schema = table.schema().await.map_err(Error::index)?;
	match vector_dim(&schema) {
		Some(existing) if existing == dim => Ok(table),
		Some(existing) => Err(Error::InvalidConfig(format!(
			"vector table '{}' holds {}-dimensional vectors, embedding.dim is {}", name, existing, dim
		))),
		None => Err(Error::Index(format!("vector table '{}' has no vector column", name))),
	}
}

/// Quote `value` as a SQL string literal for LanceDB predicates.
pub fn sql_literal(value: &str) -> String {
	format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
	use super::sql_literal;

	#[test]
	fn quotes_are_doubled() {
		assert_eq!(sql_literal("svn/a"), "'svn/a'");
		assert_eq!(sql_literal("it's"), "'it''s'");
	}
}
