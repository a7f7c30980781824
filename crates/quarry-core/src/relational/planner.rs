//! Lowering of fetch trees into a single statement.
//!
//! Each level selects from its table under an alias derived from the path
//! (`users`, `users_posts`, `users_posts_comments`, ...). Every requested
//! relation becomes a `LEFT JOIN LATERAL (...) "alias" ON TRUE` whose
//! subquery projects one JSON column named `data`:
//!
//! - to-one: `json_build_array(...)` over the child's ordered selection,
//!   limited to one row;
//! - to-many: `coalesce(json_agg(json_build_array(...) ORDER BY ...), '[]'::json)`,
//!   with the child's ordering inside the aggregate.
//!
//! A level with its own filter, ordering, limit or offset first selects from
//! an inner `SELECT *` carrying those clauses, and the clauses are cleared on
//! the level itself so they apply exactly once. The root repeats its ordering
//! on the outer select, after the lateral joins.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::trace;

use super::mapping::{map_relational_row, FieldKind, RelationalField};
use super::{Cardinality, ColumnSelection, FetchNode, RelationRegistry, Scope};
use crate::builder::{and, Field, FieldMap, JoinType, Select, SelectStatement, Source};
use crate::compiler::{Compiler, StatementKind, ToQuery};
use crate::dialect::Dialect;
use crate::error::{BuildError, MappingError, Result};
use crate::fragment::Sql;
use crate::schema::{ColumnRef, Table};
use crate::value::SqlValue;

/// A lowered relational fetch.
#[derive(Debug, Clone)]
pub struct RelationalQuery {
    statement: SelectStatement,
    selection: Vec<RelationalField>,
    tables: Vec<String>,
    has_relations: bool,
}

impl RelationalQuery {
    /// Fetches every matching row of a logical table.
    pub fn find_many(registry: &RelationRegistry, table: &str, node: FetchNode) -> Result<Self> {
        let mut planner = Planner {
            registry,
            tables: BTreeSet::new(),
            has_relations: false,
        };
        let root = registry.table(table)?;
        let lowered = planner.lower(table, root, &node, table, None)?;
        Ok(Self {
            statement: lowered.statement,
            selection: lowered.fields,
            tables: planner.tables.into_iter().collect(),
            has_relations: planner.has_relations,
        })
    }

    /// Fetches the first matching row of a logical table.
    pub fn find_first(registry: &RelationRegistry, table: &str, node: FetchNode) -> Result<Self> {
        Self::find_many(registry, table, node.limit(1))
    }

    /// Returns the lowered statement.
    #[must_use]
    pub const fn statement(&self) -> &SelectStatement {
        &self.statement
    }

    /// Returns the shape of each result row.
    #[must_use]
    pub fn selection(&self) -> &[RelationalField] {
        &self.selection
    }

    /// Maps a positional result row to a nested JSON object.
    pub fn map_row(&self, row: &[SqlValue]) -> std::result::Result<Value, MappingError> {
        map_relational_row(&self.selection, row)
    }
}

impl ToQuery for RelationalQuery {
    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }

    fn tables(&self) -> Vec<String> {
        self.tables.clone()
    }

    fn returns_rows(&self) -> bool {
        true
    }

    fn to_sql(&self, dialect: &dyn Dialect) -> Result<Sql> {
        if self.has_relations && !dialect.supports_json_agg() {
            return Err(BuildError::unsupported(dialect, "relational JSON aggregation"));
        }
        Compiler::new(dialect).select(&self.statement)
    }
}

struct Lowered {
    statement: SelectStatement,
    fields: Vec<RelationalField>,
}

struct Planner<'r> {
    registry: &'r RelationRegistry,
    tables: BTreeSet<String>,
    has_relations: bool,
}

/// A selected entry of one level: its result key, the field used when the
/// level is the root, and the expression placed in the JSON array otherwise.
struct Entry {
    key: String,
    field: Field,
    json: Sql,
    kind: FieldKind,
}

impl Planner<'_> {
    fn lower(
        &mut self,
        logical: &str,
        table: &Table,
        node: &FetchNode,
        alias: &str,
        parent: Option<(Cardinality, Sql)>,
    ) -> Result<Lowered> {
        self.tables.insert(table.name().to_owned());
        let aliased = table.aliased(alias);
        let scope = Scope::new(aliased.clone());

        let mut entries: Vec<Entry> = select_columns(&aliased, &node.columns)?
            .into_iter()
            .map(|column| Entry {
                key: column.name().to_owned(),
                json: Sql::column(column.clone()),
                field: Field::Column(column),
                kind: FieldKind::Scalar,
            })
            .collect();

        for (name, extra) in &node.extras {
            let sql = extra(&scope);
            entries.push(Entry {
                key: name.clone(),
                json: sql.clone(),
                field: Field::aliased(sql, name.as_str()),
                kind: FieldKind::Scalar,
            });
        }

        let mut joins = Vec::with_capacity(node.with.len());
        for (relation, child) in &node.with {
            let resolved = self.registry.resolve(logical, relation)?;
            let child_alias = format!("{alias}_{relation}");
            let child_table = resolved.table.aliased(child_alias.as_str());

            let mut pairs = Vec::with_capacity(resolved.local.len());
            for (local, referenced) in resolved.local.iter().zip(&resolved.referenced) {
                pairs.push(child_table.try_col(referenced)?.eq_col(&aliased.try_col(local)?));
            }
            let join_on = and(pairs).unwrap_or_else(|| Sql::raw("TRUE"));

            let lowered = self.lower(
                &resolved.target,
                &resolved.table,
                child,
                &child_alias,
                Some((resolved.cardinality, join_on)),
            )?;
            trace!(
                relation = %relation,
                alias = %child_alias,
                cardinality = ?resolved.cardinality,
                "lowered relation"
            );
            self.has_relations = true;

            let data = Sql::qualified(&child_alias, "data");
            entries.push(Entry {
                key: relation.clone(),
                json: data.clone(),
                field: Field::aliased(data, relation.as_str()),
                kind: FieldKind::Relation {
                    cardinality: resolved.cardinality,
                    fields: lowered.fields,
                },
            });
            joins.push(Source::subquery(lowered.statement, child_alias));
        }

        if entries.is_empty() {
            return Err(BuildError::NoFieldsSelected {
                table: table.name().to_owned(),
                alias: alias.to_owned(),
            });
        }

        let cardinality = parent.as_ref().map(|(c, _)| *c);
        let user_where = node.filter.as_ref().map(|f| f(&scope));
        let order_by = node.order_by.as_ref().map(|f| f(&scope)).unwrap_or_default();
        let limit = if cardinality == Some(Cardinality::One) {
            Some(1)
        } else {
            node.limit
        };
        let offset = node.offset;
        let where_clause = and(parent.map(|(_, on)| on).into_iter().chain(user_where.clone()));
        let needs_subquery =
            user_where.is_some() || !order_by.is_empty() || limit.is_some() || offset.is_some();

        let fields: Vec<RelationalField> = entries
            .iter()
            .map(|e| RelationalField {
                key: e.key.clone(),
                kind: e.kind.clone(),
            })
            .collect();

        let projection = match cardinality {
            None => entries
                .into_iter()
                .fold(FieldMap::new(), |map, e| map.field(e.key, e.field)),
            Some(cardinality) => {
                let mut json = Sql::raw("json_build_array(");
                json.push_sql(Sql::join(entries.into_iter().map(|e| e.json), ", "))
                    .push_str(")");
                if cardinality == Cardinality::Many {
                    let mut agg = Sql::raw("coalesce(json_agg(");
                    agg.push_sql(json);
                    if !order_by.is_empty() {
                        agg.push_str(" ORDER BY ")
                            .push_sql(Sql::join(order_by.iter().cloned(), ", "));
                    }
                    agg.push_str("), ").push_sql(Sql::literal("[]")).push_str("::json)");
                    json = agg;
                }
                FieldMap::new().field("data", Field::aliased(json, "data"))
            }
        };

        let mut select = if needs_subquery {
            // The root keeps its ordering: lateral joins do not preserve the
            // subquery's row order.
            let outer_order = if cardinality.is_none() { order_by.clone() } else { Vec::new() };
            let mut inner = Select::new()
                .from(&aliased)
                .fields(FieldMap::new().field("*", Sql::raw("*")))
                .order_by(order_by);
            if let Some(condition) = where_clause {
                inner = inner.where_clause(condition);
            }
            if let Some(limit) = limit {
                inner = inner.limit(limit);
            }
            if let Some(offset) = offset {
                inner = inner.offset(offset);
            }
            Select::new()
                .from(Source::subquery(inner.build()?, alias))
                .order_by(outer_order)
        } else {
            let select = Select::new().from(&aliased);
            match where_clause {
                Some(condition) => select.where_clause(condition),
                None => select,
            }
        };

        select = select.fields(projection);
        for source in joins {
            select = select.join(source, JoinType::Left, Some(Sql::raw("TRUE")), true);
        }

        Ok(Lowered {
            statement: select.build()?,
            fields,
        })
    }
}

fn select_columns(table: &Table, selection: &ColumnSelection) -> Result<Vec<ColumnRef>> {
    match selection {
        ColumnSelection::All => Ok(table.columns()),
        ColumnSelection::Include(names) => names.iter().map(|n| table.try_col(n)).collect(),
        ColumnSelection::Exclude(names) => {
            for name in names {
                table.try_col(name)?;
            }
            Ok(table
                .columns()
                .into_iter()
                .filter(|c| !names.iter().any(|n| n == c.name()))
                .collect())
        }
    }
}
