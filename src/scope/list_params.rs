use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{all_of, Scope, ScopeColumns};
use crate::config;
use crate::error::ApiError;
use crate::filter::FilterData;

/// Per-entity knobs for turning list parameters into a filter
#[derive(Debug, Clone, Copy)]
pub struct ListSpec {
    pub table: &'static str,
    pub columns: ScopeColumns,
    /// Columns `search` matches against (ORed)
    pub search_fields: &'static [&'static str],
    /// Columns `sort_by` may name
    pub sortable: &'static [&'static str],
    /// Table carries an `is_active` flag
    pub has_active: bool,
}

/// Query-string parameters shared by every scoped listing.
///
/// Everything arrives as a string so malformed values can be reported as a
/// 406 naming the parameter, rather than a generic extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub is_active: Option<String>,
    pub id: Option<String>,
    pub city: Option<String>,
    pub venue: Option<String>,
    pub ground: Option<String>,
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl ListParams {
    /// Scope AND search AND is_active AND ids AND narrowing AND `extra`, plus
    /// pagination and ordering.
    pub fn to_filter(&self, scope: &Scope, spec: &ListSpec, extra: Vec<Value>) -> Result<FilterData, ApiError> {
        let mut parts = vec![scope.to_filter(spec.columns)];

        if let Some(term) = non_empty(&self.search) {
            let pattern = format!("%{}%", escape_like(term));
            let branches: Vec<Value> = spec
                .search_fields
                .iter()
                .map(|field| json!({ *field: { "$ilike": pattern } }))
                .collect();
            if !branches.is_empty() {
                parts.push(json!({ "$or": branches }));
            }
        }

        if let Some(raw) = non_empty(&self.is_active) {
            if !spec.has_active {
                return Err(ApiError::validation("is_active", format!("{} cannot be filtered by is_active", spec.table)));
            }
            let flags = parse_bool_list(raw).ok_or_else(|| {
                ApiError::validation("is_active", "is_active must be true, false or a list of them")
            })?;
            parts.push(json!({ "is_active": { "$in": flags } }));
        }

        if let Some(raw) = non_empty(&self.id) {
            let ids = parse_id_list(raw).ok_or_else(|| ApiError::validation("id", "id must be a UUID or a list of UUIDs"))?;
            parts.push(json!({ "id": { "$in": ids } }));
        }

        if let Some(city) = parse_uuid_param("city", &self.city)? {
            parts.push(json!({ spec.columns.city: city }));
        }
        if let Some(venue) = parse_uuid_param("venue", &self.venue)? {
            parts.push(json!({ spec.columns.venue: venue }));
        }
        if let Some(ground) = parse_uuid_param("ground", &self.ground)? {
            match spec.columns.ground {
                Some(column) => parts.push(json!({ column: ground })),
                None => return Err(ApiError::validation("ground", format!("{} cannot be filtered by ground", spec.table))),
            }
        }

        parts.extend(extra);

        let limit = match parse_non_negative("limit", &self.limit)? {
            Some(limit) => limit,
            None => config::config().filter.default_limit,
        };
        let offset = parse_non_negative("offset", &self.offset)?;

        Ok(FilterData {
            where_clause: Some(all_of(parts)),
            order: Some(json!(self.order_clause(spec)?)),
            limit: Some(limit),
            offset,
            ..Default::default()
        })
    }

    fn order_clause(&self, spec: &ListSpec) -> Result<String, ApiError> {
        let column = match non_empty(&self.sort_by) {
            Some(col) if spec.sortable.contains(&col) => col,
            Some(col) => {
                return Err(ApiError::validation("sort_by", format!("Cannot sort {} by {}", spec.table, col)));
            }
            None => "created_at",
        };
        let direction = match non_empty(&self.order).map(|o| o.to_ascii_lowercase()) {
            None => "desc",
            Some(o) if o == "asc" => "asc",
            Some(o) if o == "desc" => "desc",
            Some(_) => return Err(ApiError::validation("order", "order must be asc or desc")),
        };
        Ok(format!("{} {}", column, direction))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_uuid_param(field: &str, value: &Option<String>) -> Result<Option<Uuid>, ApiError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| ApiError::validation(field, format!("{} must be a valid id", field))),
    }
}

fn parse_non_negative(field: &str, value: &Option<String>) -> Result<Option<i32>, ApiError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => match raw.parse::<i32>() {
            Ok(n) if n >= 0 => Ok(Some(n)),
            _ => Err(ApiError::validation(field, format!("{} must be a non-negative integer", field))),
        },
    }
}

/// Escape LIKE metacharacters so a search term matches literally
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Accepts `true`, `false`, `[true]`, `[true,false]` and `true,false`
pub fn parse_bool_list(raw: &str) -> Option<Vec<bool>> {
    let inner = raw.trim();
    let inner = inner
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(inner);

    let mut flags = Vec::new();
    for item in inner.split(',') {
        match item.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "true" => flags.push(true),
            "false" => flags.push(false),
            _ => return None,
        }
    }
    if flags.is_empty() {
        None
    } else {
        Some(flags)
    }
}

/// Accepts a single id, a comma list, or a JSON array of ids
pub fn parse_id_list(raw: &str) -> Option<Vec<Uuid>> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        let values: Vec<String> = serde_json::from_str(raw).ok()?;
        return values.iter().map(|v| Uuid::parse_str(v.trim()).ok()).collect();
    }
    raw.split(',')
        .map(|item| Uuid::parse_str(item.trim()).ok())
        .collect::<Option<Vec<_>>>()
        .filter(|ids| !ids.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    const VENUES: ListSpec = ListSpec {
        table: "venues",
        columns: ScopeColumns::VENUES,
        search_fields: &["name", "address"],
        sortable: &["name", "created_at"],
        has_active: true,
    };

    fn params() -> ListParams {
        ListParams::default()
    }

    #[test]
    fn bool_list_forms() {
        assert_eq!(parse_bool_list("true"), Some(vec![true]));
        assert_eq!(parse_bool_list("[true]"), Some(vec![true]));
        assert_eq!(parse_bool_list("[true,false]"), Some(vec![true, false]));
        assert_eq!(parse_bool_list("true, false"), Some(vec![true, false]));
        assert_eq!(parse_bool_list("yes"), None);
        assert_eq!(parse_bool_list("[]"), None);
    }

    #[test]
    fn id_list_forms() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(parse_id_list(&a.to_string()), Some(vec![a]));
        assert_eq!(parse_id_list(&format!("{},{}", a, b)), Some(vec![a, b]));
        assert_eq!(parse_id_list(&format!("[\"{}\",\"{}\"]", a, b)), Some(vec![a, b]));
        assert_eq!(parse_id_list("not-an-id"), None);
    }

    #[test]
    fn search_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn search_and_active_are_anded_with_scope() {
        let city = Uuid::new_v4();
        let p = ListParams {
            search: Some("stadium".into()),
            is_active: Some("[true]".into()),
            ..params()
        };
        let data = p.to_filter(&Scope::City(city), &VENUES, vec![]).unwrap();
        let mut filter = Filter::new("venues").unwrap();
        filter.soft_delete(true);
        filter.assign(data).unwrap();
        let sql = filter.to_sql().unwrap();

        assert!(sql.query.contains("\"city_id\" = $1"));
        assert!(sql.query.contains("(\"name\" ILIKE $2) OR (\"address\" ILIKE $3)"));
        assert!(sql.query.contains("\"is_active\" IN ($4)"));
        assert!(sql.query.contains("\"is_deleted\" = false"));
        assert!(sql.query.contains("ORDER BY \"created_at\" DESC"));
        assert_eq!(sql.params[0], crate::filter::SqlParam::Uuid(city));
        assert_eq!(sql.params[1], crate::filter::SqlParam::Text("%stadium%".to_string()));
    }

    #[test]
    fn narrowing_never_widens_the_scope() {
        let own_city = Uuid::new_v4();
        let other_city = Uuid::new_v4();
        let p = ListParams { city: Some(other_city.to_string()), ..params() };
        let data = p.to_filter(&Scope::City(own_city), &VENUES, vec![]).unwrap();
        let doc = data.where_clause.unwrap();
        // both constraints survive, so the result is empty rather than foreign
        assert_eq!(doc["$and"][0], json!({ "city_id": own_city }));
        assert_eq!(doc["$and"][1], json!({ "city_id": other_city }));
    }

    #[test]
    fn bad_parameters_name_the_field() {
        let cases = [
            (ListParams { is_active: Some("maybe".into()), ..params() }, "is_active"),
            (ListParams { limit: Some("-1".into()), ..params() }, "limit"),
            (ListParams { offset: Some("x".into()), ..params() }, "offset"),
            (ListParams { sort_by: Some("password".into()), ..params() }, "sort_by"),
            (ListParams { order: Some("sideways".into()), ..params() }, "order"),
            (ListParams { ground: Some(Uuid::new_v4().to_string()), ..params() }, "ground"),
            (ListParams { venue: Some("nope".into()), ..params() }, "venue"),
        ];
        for (p, field) in cases {
            let err = p.to_filter(&Scope::Unrestricted, &VENUES, vec![]).unwrap_err();
            assert_eq!(err.status_code(), 406);
            assert_eq!(err.to_json()["data"]["field"], field);
        }
    }

    #[test]
    fn pagination_defaults_from_config() {
        let data = params().to_filter(&Scope::Unrestricted, &VENUES, vec![]).unwrap();
        assert_eq!(data.limit, Some(config::config().filter.default_limit));
        assert_eq!(data.offset, None);
        assert_eq!(data.where_clause, Some(json!({})));
    }
}
