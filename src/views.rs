//! View assembly.
//!
//! Read endpoints never hand out raw rows. They describe a [`Pipeline`]:
//! filter the primary collection, join the owner or actor profile, project
//! display columns, sort, and optionally paginate. The pipeline renders to a
//! single SQL statement so a listing costs one query (plus one `COUNT(*)`
//! when paginated) no matter how many rows come back.
//!
//! Profile joins are always LEFT joins that project exactly `id`, `username`,
//! `full_name` and `avatar`. A row whose profile has disappeared is still
//! returned, with those fields set to `null`.

use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};
use serde::Serialize;

use crate::ids::EntityId;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_MAX_LIMIT: u32 = 100;

/// Page and page size, already coerced to positive numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Coerces caller-supplied values. Anything that is not a positive
    /// integer falls back to the default; `limit` is clamped to `max_limit`.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>, max_limit: u32) -> Self {
        let page = positive(page).unwrap_or(DEFAULT_PAGE);
        let limit = positive(limit)
            .unwrap_or(DEFAULT_LIMIT)
            .min(max_limit.max(1));
        Self { page, limit }
    }

    fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

fn positive(raw: Option<&str>) -> Option<u32> {
    raw?.trim().parse::<u32>().ok().filter(|value| *value >= 1)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u32,
    pub page: u32,
    pub total_pages: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    fn assemble(docs: Vec<T>, total_docs: u64, request: PageRequest) -> Self {
        let total_pages = total_docs.div_ceil(u64::from(request.limit)).max(1);
        let has_prev_page = request.page > 1;
        let has_next_page = u64::from(request.page) < total_pages;
        Self {
            docs,
            total_docs,
            limit: request.limit,
            page: request.page,
            total_pages,
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| request.page - 1),
            next_page: has_next_page.then(|| request.page + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    /// `"asc"` sorts ascending; every other token, or none, sorts descending.
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Sort key plus direction. Ties fall back to insertion order in the same
/// direction so equal timestamps still come out newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: &'static str,
    pub direction: Direction,
}

impl Sort {
    pub fn newest_first(column: &'static str) -> Self {
        Self {
            column,
            direction: Direction::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Inner,
}

/// Composable read query over one primary collection.
///
/// Column and table names passed to the builder are crate constants; only
/// values supplied through the `match_*` methods come from callers, and those
/// are always bound as parameters.
#[derive(Debug, Clone)]
pub struct Pipeline {
    table: &'static str,
    alias: &'static str,
    columns: Vec<String>,
    joins: Vec<String>,
    filters: Vec<String>,
    params: Vec<Value>,
    sort: Option<Sort>,
}

impl Pipeline {
    pub fn from(table: &'static str, alias: &'static str) -> Self {
        Self {
            table,
            alias,
            columns: Vec::new(),
            joins: Vec::new(),
            filters: Vec::new(),
            params: Vec::new(),
            sort: None,
        }
    }

    pub fn project(mut self, columns: &[&str]) -> Self {
        self.columns.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    pub fn match_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(format!("{column} = ?"));
        self.params.push(value.into());
        self
    }

    pub fn match_id(self, column: &str, id: &EntityId) -> Self {
        self.match_eq(column, id_value(id))
    }

    /// Restricts `column` to the given ids. An empty set matches nothing.
    pub fn match_any_id(mut self, column: &str, ids: &[EntityId]) -> Self {
        if ids.is_empty() {
            self.filters.push("0".to_string());
            return self;
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        self.filters.push(format!("{column} IN ({placeholders})"));
        self.params.extend(ids.iter().map(id_value));
        self
    }

    /// Case-insensitive literal substring match, satisfied when any of
    /// `columns` contains `needle`. A blank needle adds no filter.
    pub fn match_contains_any(mut self, columns: &[&str], needle: &str) -> Self {
        if needle.is_empty() || columns.is_empty() {
            return self;
        }
        let pattern = format!("%{}%", escape_like(needle));
        let clauses: Vec<String> = columns
            .iter()
            .map(|column| format!("{column} LIKE ? ESCAPE '\\'"))
            .collect();
        self.filters.push(format!("({})", clauses.join(" OR ")));
        for _ in columns {
            self.params.push(Value::Text(pattern.clone()));
        }
        self
    }

    pub fn join(mut self, kind: JoinKind, table: &str, alias: &str, on: &str) -> Self {
        let keyword = match kind {
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Inner => "JOIN",
        };
        self.joins.push(format!("{keyword} {table} AS {alias} ON {on}"));
        self
    }

    /// Joins the user referenced by `local_field` under `alias`, projecting
    /// only the public profile columns (`{alias}_id`, `{alias}_username`,
    /// `{alias}_full_name`, `{alias}_avatar`).
    pub fn lookup_profile(self, local_field: &str, alias: &'static str) -> Self {
        let on = format!("{alias}.id = {local_field}");
        let columns = [
            format!("{alias}.id AS {alias}_id"),
            format!("{alias}.username AS {alias}_username"),
            format!("{alias}.full_name AS {alias}_full_name"),
            format!("{alias}.avatar AS {alias}_avatar"),
        ];
        let mut pipeline = self.join(JoinKind::Left, "users", alias, &on);
        pipeline.columns.extend(columns);
        pipeline
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    fn from_clause(&self) -> String {
        let mut sql = format!("FROM {} AS {}", self.table, self.alias);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }
        sql
    }

    fn select_sql(&self) -> String {
        let columns = if self.columns.is_empty() {
            format!("{}.*", self.alias)
        } else {
            self.columns.join(", ")
        };
        let mut sql = format!("SELECT {columns} {}", self.from_clause());
        if let Some(sort) = self.sort {
            let dir = sort.direction.sql();
            sql.push_str(&format!(
                " ORDER BY {} {dir}, {}.rowid {dir}",
                sort.column, self.alias
            ));
        }
        sql
    }

    pub fn run<T, F>(&self, conn: &Connection, map: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.query(conn, &self.select_sql(), map)
    }

    /// First row of the assembled view, if any.
    pub fn first<T, F>(&self, conn: &Connection, map: F) -> rusqlite::Result<Option<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let sql = format!("{} LIMIT 1", self.select_sql());
        Ok(self.query(conn, &sql, map)?.into_iter().next())
    }

    pub fn count(&self, conn: &Connection) -> rusqlite::Result<u64> {
        let sql = format!("SELECT COUNT(*) {}", self.from_clause());
        let total: i64 = conn.query_row(&sql, params_from_iter(self.params.iter()), |row| {
            row.get(0)
        })?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    /// Counts the filtered set, then fetches one page of it.
    pub fn paginate<T, F>(
        &self,
        conn: &Connection,
        request: PageRequest,
        map: F,
    ) -> rusqlite::Result<Page<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let total = self.count(conn)?;
        let sql = format!(
            "{} LIMIT {} OFFSET {}",
            self.select_sql(),
            request.limit,
            request.offset()
        );
        let docs = self.query(conn, &sql, map)?;
        Ok(Page::assemble(docs, total, request))
    }

    fn query<T, F>(&self, conn: &Connection, sql: &str, mut map: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(self.params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(map(row)?);
        }
        Ok(out)
    }
}

fn id_value(id: &EntityId) -> Value {
    Value::Text(id.to_string())
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Joined profile fields promoted to the top level of a view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileFields {
    pub fn from_row(row: &Row<'_>, alias: &str) -> rusqlite::Result<Self> {
        Ok(Self {
            username: row.get(format!("{alias}_username").as_str())?,
            full_name: row.get(format!("{alias}_full_name").as_str())?,
            avatar: row.get(format!("{alias}_avatar").as_str())?,
        })
    }
}

/// Joined profile kept nested, e.g. a video's `owner`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProfile {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub username: String,
    pub full_name: String,
    pub avatar: Option<String>,
}

impl OwnerProfile {
    /// `None` when the join found no user.
    pub fn from_row(row: &Row<'_>, alias: &str) -> rusqlite::Result<Option<Self>> {
        let id: Option<EntityId> = row.get(format!("{alias}_id").as_str())?;
        let Some(id) = id else {
            return Ok(None);
        };
        Ok(Some(Self {
            id,
            username: row.get(format!("{alias}_username").as_str())?,
            full_name: row.get(format!("{alias}_full_name").as_str())?,
            avatar: row.get(format!("{alias}_avatar").as_str())?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Store, tweets, users};

    fn tweet_contents(store: &Store, pipeline: &Pipeline) -> Vec<String> {
        store
            .with_conn(|conn| Ok(pipeline.run(conn, |row| row.get("content"))?))
            .unwrap()
    }

    #[test]
    fn page_request_falls_back_on_garbage() {
        let req = PageRequest::from_raw(Some("abc"), Some("-4"), 100);
        assert_eq!(req, PageRequest::default());
        let req = PageRequest::from_raw(Some("0"), Some("2.5"), 100);
        assert_eq!(req, PageRequest::default());
        let req = PageRequest::from_raw(Some(" 3 "), Some("500"), 100);
        assert_eq!(req, PageRequest { page: 3, limit: 100 });
        let req = PageRequest::from_raw(None, None, 100);
        assert_eq!(req, PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn direction_only_honours_asc() {
        assert_eq!(Direction::from_token(Some("asc")), Direction::Asc);
        assert_eq!(Direction::from_token(Some("ASC")), Direction::Asc);
        assert_eq!(Direction::from_token(Some("desc")), Direction::Desc);
        assert_eq!(Direction::from_token(Some("sideways")), Direction::Desc);
        assert_eq!(Direction::from_token(None), Direction::Desc);
    }

    #[test]
    fn second_page_of_twelve() {
        let store = Store::open_in_memory().unwrap();
        let owner = EntityId::generate();
        store
            .with_conn(|conn| {
                for n in 1..=12 {
                    tweets::insert(conn, &owner, &format!("t{n}"))?;
                }
                Ok(())
            })
            .unwrap();

        let pipeline = Pipeline::from("tweets", "t")
            .project(&["t.content AS content"])
            .match_id("t.owner_id", &owner)
            .sort(Sort {
                column: "t.created_at",
                direction: Direction::Asc,
            });
        let page = store
            .with_conn(|conn| {
                Ok(pipeline.paginate(conn, PageRequest { page: 2, limit: 5 }, |row| {
                    row.get::<_, String>("content")
                })?)
            })
            .unwrap();

        assert_eq!(page.docs, vec!["t6", "t7", "t8", "t9", "t10"]);
        assert_eq!(page.total_docs, 12);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_prev_page && page.has_next_page);
        assert_eq!(page.prev_page, Some(1));
        assert_eq!(page.next_page, Some(3));
    }

    #[test]
    fn page_past_the_end_is_empty_with_totals() {
        let store = Store::open_in_memory().unwrap();
        let owner = EntityId::generate();
        store
            .with_conn(|conn| {
                tweets::insert(conn, &owner, "only")?;
                Ok(())
            })
            .unwrap();
        let pipeline = Pipeline::from("tweets", "t").project(&["t.content AS content"]);
        let page = store
            .with_conn(|conn| {
                Ok(pipeline.paginate(conn, PageRequest { page: 4, limit: 10 }, |row| {
                    row.get::<_, String>("content")
                })?)
            })
            .unwrap();
        assert!(page.docs.is_empty());
        assert_eq!(page.total_docs, 1);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next_page);
    }

    #[test]
    fn contains_any_is_case_insensitive_and_literal() {
        let store = Store::open_in_memory().unwrap();
        let owner = EntityId::generate();
        store
            .with_conn(|conn| {
                tweets::insert(conn, &owner, "Rust Tips")?;
                tweets::insert(conn, &owner, "100% cotton")?;
                tweets::insert(conn, &owner, "gardening")?;
                Ok(())
            })
            .unwrap();

        let search = |needle: &str| {
            let pipeline = Pipeline::from("tweets", "t")
                .project(&["t.content AS content"])
                .match_contains_any(&["t.content"], needle)
                .sort(Sort::newest_first("t.created_at"));
            tweet_contents(&store, &pipeline)
        };

        assert_eq!(search("rust"), vec!["Rust Tips"]);
        assert_eq!(search("0%"), vec!["100% cotton"]);
        assert!(search("_").is_empty());
        assert_eq!(search("").len(), 3);
    }

    #[test]
    fn empty_id_set_matches_nothing() {
        let store = Store::open_in_memory().unwrap();
        let owner = EntityId::generate();
        store
            .with_conn(|conn| {
                tweets::insert(conn, &owner, "x")?;
                Ok(())
            })
            .unwrap();
        let pipeline = Pipeline::from("tweets", "t")
            .project(&["t.content AS content"])
            .match_any_id("t.id", &[]);
        assert!(tweet_contents(&store, &pipeline).is_empty());
    }

    #[test]
    fn dangling_profile_keeps_the_row() {
        let store = Store::open_in_memory().unwrap();
        let ada = users::insert(&store, "ada", "Ada Lovelace", Some("ada.png")).unwrap();
        let ghost = EntityId::generate();
        store
            .with_conn(|conn| {
                tweets::insert(conn, &ada.id, "hello")?;
                tweets::insert(conn, &ghost, "boo")?;
                Ok(())
            })
            .unwrap();

        let pipeline = Pipeline::from("tweets", "t")
            .project(&["t.content AS content"])
            .lookup_profile("t.owner_id", "owner")
            .sort(Sort::newest_first("t.created_at"));
        let rows = store
            .with_conn(|conn| {
                Ok(pipeline.run(conn, |row| {
                    Ok((
                        row.get::<_, String>("content")?,
                        ProfileFields::from_row(row, "owner")?,
                        OwnerProfile::from_row(row, "owner")?,
                    ))
                })?)
            })
            .unwrap();

        assert_eq!(rows.len(), 2);
        let (content, fields, nested) = &rows[0];
        assert_eq!(content, "boo");
        assert_eq!(fields, &ProfileFields::default());
        assert!(nested.is_none());

        let (_, fields, nested) = &rows[1];
        assert_eq!(fields.username.as_deref(), Some("ada"));
        assert_eq!(fields.avatar.as_deref(), Some("ada.png"));
        assert_eq!(nested.as_ref().unwrap().full_name, "Ada Lovelace");
    }
}
