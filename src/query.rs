//! List-query parameters and their translation into SQL.
//!
//! Only the allow-listed sort columns and directions below are ever written
//! into the statement text; every user-supplied value goes through
//! `push_bind`.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};
use utoipa::IntoParams;

use crate::{
    error::AppError,
    models::{Priority, Status},
    validation::normalize_keyword,
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw query string of `GET /api/todos`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number (default 1).
    pub page: Option<i64>,
    /// Items per page, 1..=100 (default 20).
    pub page_size: Option<i64>,
    /// createdAt | updatedAt | dueDate | priority. Unknown values sort by createdAt.
    pub sort_by: Option<String>,
    /// asc | desc, case-insensitive (default desc).
    pub sort_order: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    /// Substring matched against title and description.
    pub q: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    CreatedAt,
    UpdatedAt,
    DueDate,
    Priority,
}

impl SortColumn {
    /// Unknown names fall back to `createdAt` instead of failing.
    pub fn from_param(name: Option<&str>) -> Self {
        match name {
            Some("updatedAt") => SortColumn::UpdatedAt,
            Some("dueDate") => SortColumn::DueDate,
            Some("priority") => SortColumn::Priority,
            _ => SortColumn::CreatedAt,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
            SortColumn::DueDate => "due_date",
            SortColumn::Priority => "priority",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_param(value: Option<&str>) -> Result<Self, AppError> {
        let Some(value) = value else {
            return Ok(SortOrder::Desc);
        };
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(AppError::validation("sortOrder must be asc or desc")),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A validated list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: i64,
    pub page_size: i64,
    pub sort: SortColumn,
    pub order: SortOrder,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub keyword: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortColumn::CreatedAt,
            order: SortOrder::Desc,
            status: None,
            priority: None,
            keyword: None,
        }
    }
}

impl TryFrom<ListParams> for ListQuery {
    type Error = AppError;

    fn try_from(params: ListParams) -> Result<Self, Self::Error> {
        let page = params.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::validation("page must be >= 1"));
        }
        let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::validation(format!(
                "pageSize must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let sort = SortColumn::from_param(params.sort_by.as_deref());
        let order = SortOrder::from_param(params.sort_order.as_deref())?;

        let status = match params.status.as_deref() {
            None | Some("") => None,
            Some(value) => Some(value.parse()?),
        };
        let priority = match params.priority.as_deref() {
            None | Some("") => None,
            Some(value) => Some(value.parse()?),
        };
        let keyword = normalize_keyword(params.q.as_deref())?;

        Ok(Self {
            page,
            page_size,
            sort,
            order,
            status,
            priority,
            keyword,
        })
    }
}

impl ListQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Appends the AND-joined filter predicates, if any.
    ///
    /// The keyword is wrapped in `%` but not LIKE-escaped, so `%` and `_`
    /// inside it act as wildcards.
    pub fn push_where<'a>(&'a self, qb: &mut QueryBuilder<'a, Sqlite>) {
        let mut sep = " WHERE ";
        if let Some(status) = self.status {
            qb.push(sep).push("status = ").push_bind(status.as_str());
            sep = " AND ";
        }
        if let Some(priority) = self.priority {
            qb.push(sep).push("priority = ").push_bind(priority.as_str());
            sep = " AND ";
        }
        if let Some(keyword) = &self.keyword {
            let pattern = format!("%{}%", keyword);
            qb.push(sep)
                .push("(title LIKE ")
                .push_bind(pattern.clone())
                .push(" OR description LIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    pub fn count_query(&self) -> QueryBuilder<'_, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT COUNT(1) FROM todos");
        self.push_where(&mut qb);
        qb
    }

    pub fn page_query(&self) -> QueryBuilder<'_, Sqlite> {
        let mut qb = QueryBuilder::new(
            "SELECT id, title, description, status, due_date, priority, created_at, updated_at FROM todos",
        );
        self.push_where(&mut qb);
        qb.push(" ORDER BY ")
            .push(self.sort.column())
            .push(" ")
            .push(self.order.keyword())
            .push(" LIMIT ")
            .push_bind(self.page_size)
            .push(" OFFSET ")
            .push_bind(self.offset());
        qb
    }
}
