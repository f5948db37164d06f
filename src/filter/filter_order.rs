use serde_json::Value;

use super::error::FilterError;
use super::types::{is_identifier, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["created_at desc", "name asc"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v { out.extend(Self::parse_order_string(s)); }
                }
                out
            }
            Value::Object(obj) => {
                // { "created_at": "desc", "name": "asc" }
                obj.iter()
                    .map(|(k, v)| FilterOrderInfo {
                        column: k.clone(),
                        sort: Self::parse_direction(v.as_str().unwrap_or("asc")),
                    })
                    .collect()
            }
            _ => vec![],
        };

        for info in &infos {
            if !is_identifier(&info.column) {
                return Err(FilterError::InvalidColumn(format!("Invalid sort column: {}", info.column)));
            }
        }
        Ok(infos)
    }

    fn parse_direction(dir: &str) -> SortDirection {
        if dir.eq_ignore_ascii_case("desc") || dir == "-1" { SortDirection::Desc } else { SortDirection::Asc }
    }

    fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let mut it = part.split_whitespace();
            if let Some(col) = it.next() {
                let sort = Self::parse_direction(it.next().unwrap_or("asc"));
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        out
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() { return String::new(); }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
