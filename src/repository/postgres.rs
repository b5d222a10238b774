//! PostgreSQL document store.
//!
//! Every collection lives in the `documents` table as JSONB bodies keyed by
//! `(collection, id)`. Equality and array-membership filters compile to a
//! single `@>` containment test; `AnyOf` compiles to `<@` against a JSON
//! array.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{types::Json, Pool, Postgres};

use super::{
    expand_documents, project, stamp_id, Collection, Condition, Document, EntityStore, Filter,
    FindOptions, SortOrder, UniqueInsert,
};
use crate::{
    error::{AppError, AppResult},
    models::EntityId,
};

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: Pool<Postgres>,
}

/// Positional argument of a generated statement
#[derive(Debug, Clone, PartialEq)]
enum SqlArg {
    Text(String),
    Json(Value),
}

/// WHERE clause for `filter`, numbering placeholders from `$2` (`$1` is the collection)
fn where_clause(filter: &Filter) -> (String, Vec<SqlArg>) {
    let mut containment = Map::new();
    let mut any_of = Vec::new();

    for condition in filter.conditions() {
        match condition {
            Condition::Eq(field, value) => {
                containment.insert(field.clone(), value.clone());
            }
            Condition::Contains(field, value) => {
                containment.insert(field.clone(), Value::Array(vec![value.clone()]));
            }
            Condition::AnyOf(field, values) => any_of.push((field.clone(), values.clone())),
        }
    }

    let mut sql = "collection = $1 AND body @> $2".to_string();
    let mut args = vec![SqlArg::Json(Value::Object(containment))];

    for (field, values) in any_of {
        let field_idx = args.len() + 2;
        sql.push_str(&format!(" AND (body -> ${}) <@ ${}", field_idx, field_idx + 1));
        args.push(SqlArg::Text(field));
        args.push(SqlArg::Json(Value::Array(values)));
    }

    (sql, args)
}

macro_rules! bind_args {
    ($query:expr, $args:expr) => {{
        let mut query = $query;
        for arg in $args {
            query = match arg {
                SqlArg::Text(text) => query.bind(text),
                SqlArg::Json(value) => query.bind(Json(value)),
            };
        }
        query
    }};
}

impl PgDocumentStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> AppResult<Option<Document>> {
        let row = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 AND body ->> $2 = $3 LIMIT 1",
        )
        .bind(collection.as_str())
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|Json(body)| body))
    }
}

#[async_trait]
impl EntityStore for PgDocumentStore {
    async fn find_by_id(&self, collection: Collection, id: &EntityId) -> AppResult<Option<Document>> {
        let row = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|Json(body)| body))
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        let (clause, mut args) = where_clause(filter);
        let mut sql = format!("SELECT body FROM documents WHERE {}", clause);
        if let Some(sort) = &options.sort {
            let direction = match sort.order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            sql.push_str(&format!(" ORDER BY body ->> ${} {} NULLS LAST", args.len() + 2, direction));
            args.push(SqlArg::Text(sort.field.clone()));
        } else {
            sql.push_str(" ORDER BY created_at");
        }

        let query = sqlx::query_scalar::<_, Json<Value>>(&sql).bind(collection.as_str());
        let rows = bind_args!(query, args).fetch_all(&self.pool).await?;

        let mut docs: Vec<Document> = rows.into_iter().map(|Json(body)| body).collect();
        if let Some(fields) = &options.projection {
            docs = docs.into_iter().map(|doc| project(doc, fields)).collect();
        }
        expand_documents(self, docs, &options.expand).await
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> AppResult<u64> {
        let (clause, args) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM documents WHERE {}", clause);
        let query = sqlx::query_scalar::<_, i64>(&sql).bind(collection.as_str());
        let count = bind_args!(query, args).fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, collection: Collection, mut doc: Document) -> AppResult<Document> {
        let id = EntityId::generate();
        stamp_id(&mut doc, &id)?;

        let Json(body) = sqlx::query_scalar::<_, Json<Value>>(
            "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) RETURNING body",
        )
        .bind(collection.as_str())
        .bind(id.as_str())
        .bind(Json(&doc))
        .fetch_one(&self.pool)
        .await?;
        Ok(body)
    }

    /// Atomic only where a unique index covers `field` (see the migrations)
    async fn insert_unique(
        &self,
        collection: Collection,
        field: &str,
        mut doc: Document,
    ) -> AppResult<UniqueInsert> {
        let id = EntityId::generate();
        stamp_id(&mut doc, &id)?;

        let inserted = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            RETURNING body
            "#,
        )
        .bind(collection.as_str())
        .bind(id.as_str())
        .bind(Json(&doc))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(Json(body)) = inserted {
            return Ok(UniqueInsert::Inserted(body));
        }

        let key = match doc.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        self.find_by_field(collection, field, &key)
            .await?
            .map(UniqueInsert::Existing)
            .ok_or_else(|| {
                AppError::Store(format!(
                    "insert into {} conflicted but no document has {} = {}",
                    collection, field, key
                ))
            })
    }

    async fn replace_by_id(
        &self,
        collection: Collection,
        id: &EntityId,
        mut doc: Document,
    ) -> AppResult<Option<Document>> {
        stamp_id(&mut doc, id)?;

        let row = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            UPDATE documents SET body = $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            RETURNING body
            "#,
        )
        .bind(collection.as_str())
        .bind(id.as_str())
        .bind(Json(&doc))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|Json(body)| body))
    }

    async fn delete_by_id(&self, collection: Collection, id: &EntityId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_where_clause_containment() {
        let filter = Filter::all().eq("book", "b1").contains("genre", "g1");
        let (sql, args) = where_clause(&filter);
        assert_eq!(sql, "collection = $1 AND body @> $2");
        assert_eq!(args, vec![SqlArg::Json(json!({"book": "b1", "genre": ["g1"]}))]);
    }

    #[test]
    fn test_where_clause_any_of() {
        let filter = Filter::all().any_of("id", ["g1", "g2"]);
        let (sql, args) = where_clause(&filter);
        assert_eq!(sql, "collection = $1 AND body @> $2 AND (body -> $3) <@ $4");
        assert_eq!(
            args,
            vec![
                SqlArg::Json(json!({})),
                SqlArg::Text("id".to_string()),
                SqlArg::Json(json!(["g1", "g2"])),
            ]
        );
    }
}
