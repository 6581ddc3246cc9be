//! Policy loading and validation.
//!
//! Policies are named rule sets persisted by the storage layer and read-only
//! here. Each carries a key-pattern regex, an optional required-field list
//! (the quality gate), default field values, and a flag controlling whether
//! duplicate suggestion runs on creation. Rows are parsed into strict
//! [`Policy`] structs at this boundary — the regex is compiled exactly once
//! per load, and rows that fail to parse are skipped, never propagated.

use anyhow::Result;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

/// A parsed policy. `key_pattern` is the compiled form of `pattern_source`.
#[derive(Debug, Clone)]
pub struct Policy {
    pub name: String,
    pub category: Option<String>,
    pub key_pattern: Regex,
    pub pattern_source: String,
    pub required_fields: Vec<String>,
    pub defaults: serde_json::Map<String, Value>,
    pub suggest_on_create: bool,
    pub match_priority: i64,
}

/// Outcome of validating a new record against the configured policies.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyValidation {
    pub valid: bool,
    pub violations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_policy: Option<String>,
}

impl PolicyValidation {
    fn vacuous() -> Self {
        Self {
            valid: true,
            violations: Vec::new(),
            matched_policy: None,
        }
    }
}

/// Load all policies in first-match scan order (match_priority, then name).
///
/// Rows with an invalid regex or malformed JSON columns are skipped with a
/// warning so one bad policy cannot take down the write path.
pub fn load_policies(conn: &Connection) -> Result<Vec<Policy>> {
    let mut stmt = conn.prepare(
        "SELECT name, category, key_pattern, required_fields, defaults, \
         suggest_on_create, match_priority \
         FROM policies ORDER BY match_priority, name",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut policies = Vec::with_capacity(rows.len());
    for (name, category, pattern, required, defaults, suggest_on_create, match_priority) in rows {
        let key_pattern = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(policy = %name, error = %e, "skipping policy with invalid key pattern");
                continue;
            }
        };
        let required_fields: Vec<String> = required
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        let defaults: serde_json::Map<String, Value> = defaults
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        policies.push(Policy {
            name,
            category,
            key_pattern,
            pattern_source: pattern,
            required_fields,
            defaults,
            suggest_on_create,
            match_priority,
        });
    }

    Ok(policies)
}

/// Validate a new record key and its provided fields against the policies.
///
/// With an explicit policy name, only that policy is consulted (a missing
/// name is itself a violation). Otherwise the first policy whose key pattern
/// matches wins; no match means validation is vacuously valid and the write
/// proceeds without policy involvement.
pub fn validate(
    policies: &[Policy],
    key: &str,
    provided: &serde_json::Map<String, Value>,
    explicit: Option<&str>,
) -> PolicyValidation {
    let matched = match explicit {
        Some(name) => match policies.iter().find(|p| p.name == name) {
            Some(policy) => policy,
            None => {
                return PolicyValidation {
                    valid: false,
                    violations: vec![format!("policy '{name}' not found")],
                    matched_policy: None,
                }
            }
        },
        None => match policies.iter().find(|p| p.key_pattern.is_match(key)) {
            Some(policy) => policy,
            None => return PolicyValidation::vacuous(),
        },
    };

    let mut violations = Vec::new();

    // With an explicit policy the key pattern still has to hold; on a scan
    // match it held by construction.
    if explicit.is_some() && !matched.key_pattern.is_match(key) {
        violations.push(format!(
            "policy '{}': key '{key}' does not match pattern '{}'",
            matched.name, matched.pattern_source
        ));
    }

    for field in &matched.required_fields {
        if !field_provided(provided, field) {
            violations.push(format!(
                "policy '{}': required field '{field}' is missing or empty",
                matched.name
            ));
        }
    }

    PolicyValidation {
        valid: violations.is_empty(),
        violations,
        matched_policy: Some(matched.name.clone()),
    }
}

/// A field counts as provided when present, non-null, and non-empty.
fn field_provided(provided: &serde_json::Map<String, Value>, field: &str) -> bool {
    match provided.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy(name: &str, pattern: &str, required: &[&str], priority: i64) -> Policy {
        Policy {
            name: name.into(),
            category: None,
            key_pattern: Regex::new(pattern).unwrap(),
            pattern_source: pattern.into(),
            required_fields: required.iter().map(|f| f.to_string()).collect(),
            defaults: serde_json::Map::new(),
            suggest_on_create: true,
            match_priority: priority,
        }
    }

    fn provided(pairs: &[(&str, Value)]) -> serde_json::Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn no_matching_policy_is_vacuously_valid() {
        let policies = vec![policy("security", r"^sec/", &["layer"], 0)];
        let result = validate(&policies, "ui/theme", &provided(&[]), None);
        assert!(result.valid);
        assert!(result.violations.is_empty());
        assert!(result.matched_policy.is_none());
    }

    #[test]
    fn first_pattern_match_wins() {
        let policies = vec![
            policy("broad", r"^sec/", &[], 0),
            policy("narrow", r"^sec/auth", &[], 1),
        ];
        let result = validate(&policies, "sec/auth-1", &provided(&[]), None);
        assert_eq!(result.matched_policy.as_deref(), Some("broad"));
    }

    #[test]
    fn missing_explicit_policy_is_a_violation() {
        let result = validate(&[], "sec/auth-1", &provided(&[]), Some("ghost"));
        assert!(!result.valid);
        assert_eq!(result.violations, vec!["policy 'ghost' not found"]);
        assert!(result.matched_policy.is_none());
    }

    #[test]
    fn explicit_policy_checks_its_key_pattern() {
        let policies = vec![policy("security", r"^sec/", &[], 0)];
        let result = validate(&policies, "ui/theme", &provided(&[]), Some("security"));
        assert!(!result.valid);
        assert!(result.violations[0].contains("does not match pattern"));
        assert_eq!(result.matched_policy.as_deref(), Some("security"));
    }

    #[test]
    fn quality_gate_reports_each_missing_field() {
        let policies = vec![policy("security", r"^sec/", &["layer", "tags"], 0)];
        let result = validate(
            &policies,
            "sec/auth-1",
            &provided(&[("layer", json!(""))]),
            None,
        );
        assert!(!result.valid);
        assert_eq!(result.violations.len(), 2);
        assert!(result.violations[0].contains("'layer'"));
        assert!(result.violations[1].contains("'tags'"));
    }

    #[test]
    fn satisfied_quality_gate_is_valid() {
        let policies = vec![policy("security", r"^sec/", &["layer", "tags"], 0)];
        let result = validate(
            &policies,
            "sec/auth-1",
            &provided(&[
                ("layer", json!("infrastructure")),
                ("tags", json!(["security"])),
            ]),
            None,
        );
        assert!(result.valid);
        assert_eq!(result.matched_policy.as_deref(), Some("security"));
    }

    #[test]
    fn empty_values_do_not_count_as_provided() {
        let fields = provided(&[
            ("blank", json!("   ")),
            ("null", json!(null)),
            ("empty_list", json!([])),
            ("ok", json!("x")),
            ("number", json!(0)),
        ]);
        assert!(!field_provided(&fields, "blank"));
        assert!(!field_provided(&fields, "null"));
        assert!(!field_provided(&fields, "empty_list"));
        assert!(!field_provided(&fields, "absent"));
        assert!(field_provided(&fields, "ok"));
        assert!(field_provided(&fields, "number"));
    }

    #[test]
    fn load_skips_invalid_regex_rows() {
        let conn = crate::db::open_memory_database().unwrap();
        let insert = "INSERT INTO policies (name, key_pattern, required_fields, \
                      suggest_on_create, match_priority, created_at) \
                      VALUES (?1, ?2, ?3, 1, ?4, '2026-01-01T00:00:00Z')";
        conn.execute(insert, rusqlite::params!["good", "^sec/", "[\"layer\"]", 0])
            .unwrap();
        conn.execute(insert, rusqlite::params!["broken", "([unclosed", "[]", 1])
            .unwrap();

        let policies = load_policies(&conn).unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].name, "good");
        assert_eq!(policies[0].required_fields, vec!["layer"]);
    }

    #[test]
    fn load_orders_by_match_priority() {
        let conn = crate::db::open_memory_database().unwrap();
        let insert = "INSERT INTO policies (name, key_pattern, suggest_on_create, \
                      match_priority, created_at) \
                      VALUES (?1, ?2, 1, ?3, '2026-01-01T00:00:00Z')";
        conn.execute(insert, rusqlite::params!["second", "^b/", 5]).unwrap();
        conn.execute(insert, rusqlite::params!["first", "^a/", 1]).unwrap();

        let policies = load_policies(&conn).unwrap();
        let names: Vec<&str> = policies.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
    }
}
