//! Insert-time defaulting for the secondary store.
//!
//! The store behind the gateway generates nothing on its own: no ids, no
//! timestamps. Every insert payload therefore passes through a per-entity
//! policy that fills the governed fields the caller left out. A field that
//! is present and non-null is never touched.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use plaza_types::{Entity, Payload, Row};
use serde_json::Value;
use uuid::Uuid;

/// How long a story stays visible when the caller gives no expiry.
pub const STORY_TTL_HOURS: i64 = 24;

/// Render a timestamp the way the gateway stores them (`...T..:..:..mmmZ`).
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_absent(row: &Row, field: &str) -> bool {
    row.get(field).map_or(true, Value::is_null)
}

/// One governed field and how to fill it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldRule {
    /// Fresh UUID v4 string.
    Id(&'static str),
    /// The current instant.
    Timestamp(&'static str),
    /// Copy of another field's (already defaulted) value.
    Mirror {
        field: &'static str,
        from: &'static str,
    },
    /// The current instant plus a fixed offset.
    Expiry {
        field: &'static str,
        after: Duration,
    },
    /// An empty JSON object instead of null.
    EmptyObject(&'static str),
}

impl FieldRule {
    pub fn field(&self) -> &'static str {
        match self {
            FieldRule::Id(f)
            | FieldRule::Timestamp(f)
            | FieldRule::EmptyObject(f) => *f,
            FieldRule::Mirror { field, .. } | FieldRule::Expiry { field, .. } => *field,
        }
    }

    fn fill(&self, row: &mut Row, now: DateTime<Utc>) {
        let field = self.field();
        if !is_absent(row, field) {
            return;
        }
        let value = match self {
            FieldRule::Id(_) => Value::String(Uuid::new_v4().to_string()),
            FieldRule::Timestamp(_) => Value::String(format_timestamp(now)),
            FieldRule::Mirror { from, .. } => match row.get(*from) {
                Some(v) if !v.is_null() => v.clone(),
                _ => return,
            },
            FieldRule::Expiry { after, .. } => Value::String(format_timestamp(now + *after)),
            FieldRule::EmptyObject(_) => Value::Object(Row::new()),
        };
        row.insert(field.to_string(), value);
    }
}

/// Fills absent fields on one row.
pub trait DefaultingPolicy: Send + Sync {
    fn apply(&self, row: Row, now: DateTime<Utc>) -> Row;
}

/// Policy made of an ordered list of field rules.
///
/// Rules run in order, so a `Mirror` placed after the field it copies sees
/// the defaulted value.
#[derive(Clone, Debug, Default)]
pub struct RulePolicy {
    rules: Vec<FieldRule>,
}

impl RulePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// `id` and `created_at`, the baseline every generated table needs.
    pub fn identified() -> Self {
        Self::new()
            .rule(FieldRule::Id("id"))
            .rule(FieldRule::Timestamp("created_at"))
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }
}

impl DefaultingPolicy for RulePolicy {
    fn apply(&self, mut row: Row, now: DateTime<Utc>) -> Row {
        for rule in &self.rules {
            rule.fill(&mut row, now);
        }
        row
    }
}

/// Entity to policy lookup, built once and read-only afterwards.
#[derive(Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<Entity, Arc<dyn DefaultingPolicy>>,
}

impl PolicyRegistry {
    /// Registry with no policies: every payload passes through.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The platform's catalogue of insert defaults.
    pub fn standard() -> Self {
        let mirrored = || {
            RulePolicy::identified().rule(FieldRule::Mirror {
                field: "updated_at",
                from: "created_at",
            })
        };

        let mut registry = Self::empty();
        for entity in [Entity::Posts, Entity::Comments, Entity::Rooms] {
            registry = registry.register(entity, mirrored());
        }
        for entity in [
            Entity::RoomMessages,
            Entity::Polls,
            Entity::PollVotes,
            Entity::Likes,
            Entity::Follows,
            Entity::Reports,
        ] {
            registry = registry.register(entity, RulePolicy::identified());
        }
        registry
            .register(
                Entity::Stories,
                RulePolicy::identified().rule(FieldRule::Expiry {
                    field: "expires_at",
                    after: Duration::hours(STORY_TTL_HOURS),
                }),
            )
            .register(
                Entity::Notifications,
                RulePolicy::identified().rule(FieldRule::EmptyObject("metadata")),
            )
    }

    pub fn register(mut self, entity: Entity, policy: impl DefaultingPolicy + 'static) -> Self {
        self.policies.insert(entity, Arc::new(policy));
        self
    }

    pub fn policy(&self, entity: Entity) -> Option<&Arc<dyn DefaultingPolicy>> {
        self.policies.get(&entity)
    }

    /// Fill absent governed fields, sampling "now" once for the whole payload.
    pub fn apply_defaults(&self, entity: Entity, payload: Payload) -> Payload {
        self.apply_defaults_at(entity, payload, Utc::now())
    }

    /// Same as [`apply_defaults`](Self::apply_defaults) against a fixed instant.
    pub fn apply_defaults_at(
        &self,
        entity: Entity,
        payload: Payload,
        now: DateTime<Utc>,
    ) -> Payload {
        let Some(policy) = self.policy(entity) else {
            return payload;
        };
        match payload {
            Payload::One(row) => Payload::One(policy.apply(row, now)),
            Payload::Many(rows) => {
                Payload::Many(rows.into_iter().map(|row| policy.apply(row, now)).collect())
            }
        }
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entities: Vec<_> = self.policies.keys().map(|e| e.table_name()).collect();
        entities.sort_unstable();
        f.debug_struct("PolicyRegistry")
            .field("entities", &entities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row(v: Value) -> Row {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn one(p: Payload) -> Row {
        match p {
            Payload::One(r) => r,
            Payload::Many(_) => panic!("expected single row"),
        }
    }

    #[test]
    fn post_gets_id_and_both_timestamps() {
        let reg = PolicyRegistry::standard();
        let out = one(reg.apply_defaults_at(
            Entity::Posts,
            row(json!({"content": "hi"})).into(),
            fixed_now(),
        ));

        assert_eq!(out["content"], json!("hi"));
        let id = out["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(out["created_at"], json!("2026-03-01T12:00:00.000Z"));
        assert_eq!(out["updated_at"], out["created_at"]);
    }

    #[test]
    fn updated_at_follows_caller_created_at() {
        let reg = PolicyRegistry::standard();
        let out = one(reg.apply_defaults_at(
            Entity::Comments,
            row(json!({"created_at": "2020-01-01T00:00:00.000Z"})).into(),
            fixed_now(),
        ));
        assert_eq!(out["updated_at"], json!("2020-01-01T00:00:00.000Z"));
    }

    #[test]
    fn story_expiry_is_a_day_out() {
        let reg = PolicyRegistry::standard();
        let out = one(reg.apply_defaults_at(Entity::Stories, Row::new().into(), fixed_now()));
        assert_eq!(out["expires_at"], json!("2026-03-02T12:00:00.000Z"));
        assert!(!out.contains_key("updated_at"));
    }

    #[test]
    fn notification_metadata_defaults_to_empty_object() {
        let reg = PolicyRegistry::standard();
        let out = one(reg.apply_defaults_at(
            Entity::Notifications,
            row(json!({"metadata": null, "kind": "like"})).into(),
            fixed_now(),
        ));
        assert_eq!(out["metadata"], json!({}));
        assert_eq!(out["kind"], json!("like"));
    }

    #[test]
    fn caller_values_are_never_overwritten() {
        let reg = PolicyRegistry::standard();
        let cases = [
            (
                Entity::Posts,
                json!({"id": "p1", "created_at": "t0", "updated_at": "t1"}),
            ),
            (
                Entity::Stories,
                json!({"id": "s1", "created_at": "t0", "expires_at": "t9"}),
            ),
            (
                Entity::Notifications,
                json!({"id": "n1", "created_at": "t0", "metadata": {"a": 1}}),
            ),
            (
                Entity::Likes,
                json!({"id": "l1", "created_at": "t0", "post_id": "p1"}),
            ),
        ];
        for (entity, input) in cases {
            let input = row(input);
            let out = one(reg.apply_defaults(entity, input.clone().into()));
            assert_eq!(out, input, "{entity} changed a complete row");
        }
    }

    #[test]
    fn applying_twice_changes_nothing() {
        let reg = PolicyRegistry::standard();
        for entity in Entity::ALL {
            let first = reg.apply_defaults(entity, row(json!({"body": "x"})).into());
            let second = reg.apply_defaults(entity, first.clone());
            assert_eq!(first, second, "{entity} is not idempotent");
        }
    }

    #[test]
    fn mirror_runs_after_the_field_it_copies() {
        let policy = RulePolicy::identified().rule(FieldRule::Mirror {
            field: "updated_at",
            from: "created_at",
        });
        let fields: Vec<&str> = policy.rules().iter().map(FieldRule::field).collect();
        assert_eq!(fields, ["id", "created_at", "updated_at"]);

        let out = policy.apply(Row::new(), fixed_now());
        assert_eq!(out["updated_at"], json!("2026-03-01T12:00:00.000Z"));
    }

    #[test]
    fn profiles_pass_through() {
        let reg = PolicyRegistry::standard();
        let input = row(json!({"username": "ada"}));
        let out = one(reg.apply_defaults(Entity::Profiles, input.clone().into()));
        assert_eq!(out, input);
    }

    #[test]
    fn batch_rows_are_defaulted_independently() {
        let reg = PolicyRegistry::standard();
        let payload = Payload::Many(vec![
            row(json!({"id": "keep"})),
            row(json!({})),
            row(json!({})),
        ]);
        let Payload::Many(rows) = reg.apply_defaults_at(Entity::PollVotes, payload, fixed_now())
        else {
            panic!("expected batch");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["id"], json!("keep"));
        assert_ne!(rows[1]["id"], rows[2]["id"]);
        for r in &rows {
            assert_eq!(r["created_at"], json!("2026-03-01T12:00:00.000Z"));
        }
    }
}
