//! Minimal query-string parsing for `GET /tasks` and `GET /concepts/list`
//! (spec.md §6). Small enough, and specific enough to this wire shape,
//! that pulling in a full `serde_urlencoded` dependency isn't worth it —
//! `url::form_urlencoded` (already a workspace dependency) does the
//! percent-decoding.

use logoforge_domain::{TaskStatus, TaskType};

use crate::dto::TaskListQuery;

pub fn parse_query(query: Option<&str>) -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            map.insert(key.into_owned(), value.into_owned());
        }
    }
    map
}

pub fn parse_task_status(value: &str) -> Option<TaskStatus> {
    match value {
        "pending" => Some(TaskStatus::Pending),
        "processing" => Some(TaskStatus::Processing),
        "completed" => Some(TaskStatus::Completed),
        "failed" => Some(TaskStatus::Failed),
        _ => None,
    }
}

pub fn parse_task_type(value: &str) -> Option<TaskType> {
    match value {
        "generate" => Some(TaskType::Generate),
        "refine" => Some(TaskType::Refine),
        _ => None,
    }
}

pub fn parse_task_list_query(query: Option<&str>) -> TaskListQuery {
    let params = parse_query(query);
    TaskListQuery {
        status: params.get("status").and_then(|v| parse_task_status(v)),
        task_type: params.get("type").and_then(|v| parse_task_type(v)),
        limit: params.get("limit").and_then(|v| v.parse().ok()),
    }
}

pub fn parse_limit(query: Option<&str>, default: u32, max: u32) -> u32 {
    let params = parse_query(query);
    params
        .get("limit")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
        .clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_and_type_and_limit() {
        let parsed = parse_task_list_query(Some("status=completed&type=generate&limit=5"));
        assert_eq!(parsed.status, Some(TaskStatus::Completed));
        assert_eq!(parsed.task_type, Some(TaskType::Generate));
        assert_eq!(parsed.limit, Some(5));
    }

    #[test]
    fn ignores_unknown_status_value() {
        let parsed = parse_task_list_query(Some("status=bogus"));
        assert_eq!(parsed.status, None);
    }

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(parse_limit(None, 10, 100), 10);
        assert_eq!(parse_limit(Some("limit=500"), 10, 100), 100);
        assert_eq!(parse_limit(Some("limit=0"), 10, 100), 1);
    }
}
