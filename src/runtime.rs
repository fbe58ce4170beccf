//! Validator runtime: the combinator layer the schema compiler targets.
//!
//! A [`Validator`] is an immutable, composable node. The compiler only ever
//! builds these through the constructors below (primitive acceptors, array-of,
//! object shapes, unions, nullable wrapping, refinement predicates) and never
//! inspects a node it already built.
//!
//! Applying a validator via [`Validator::check`] walks the value once and
//! either returns the validated value (object shapes strip undeclared keys)
//! or an [`Issues`] list where every issue carries a JSON-Pointer-style path.
//!
//! Design goals:
//! - Nodes are plain data; `check` is pure and re-entrant, so a compiled
//!   validator is safe to share across threads and reuse indefinitely.
//! - Failures are collected per level: an object reports every failing field,
//!   an array every failing index, instead of stopping at the first.
pub mod format;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

pub use format::StringFormat;

// ------------------------------- Nodes ------------------------------------ //

#[derive(Clone, Debug)]
pub enum Validator {
    /// No constraint; accepts every value unchanged.
    Any,
    /// Accepts exactly the literal `null`.
    Null,
    Bool,
    /// Any numeric value, fractional included.
    Number,
    /// Numeric values with no fractional part.
    Integer,
    String {
        format: Option<StringFormat>,
    },
    Array {
        item: Box<Validator>,
    },
    Object(Shape),
    /// At least one branch must accept.
    Union(Vec<Validator>),
    /// Accepts `null` in addition to whatever the inner node accepts.
    Nullable(Box<Validator>),
    /// Inner node must accept, then the predicate must hold on the result.
    Refined {
        inner: Box<Validator>,
        test: Refinement,
    },
}

/// A value-level predicate with a custom rejection message.
#[derive(Clone)]
pub struct Refinement {
    message: String,
    test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinement")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Field-by-field object description.
///
/// Field order is insertion order (declaration order in the source schema),
/// which also fixes the key order of validated output.
#[derive(Clone, Debug, Default)]
pub struct Shape {
    fields: IndexMap<String, FieldRule>,
    unknown_keys: UnknownKeys,
}

#[derive(Clone, Debug)]
pub struct FieldRule {
    pub validator: Validator,
    pub required: bool,
}

/// Policy for keys not declared in the shape.
#[derive(Clone, Debug, Default)]
pub enum UnknownKeys {
    /// Any undeclared key rejects the whole object.
    #[default]
    Reject,
    /// Undeclared keys are accepted but dropped from the validated output.
    Strip,
    /// Undeclared keys must each validate against the given node; they are
    /// still dropped from the validated output.
    Typed(Box<Validator>),
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&mut self, name: impl Into<String>, validator: Validator, required: bool) {
        self.fields.insert(name.into(), FieldRule { validator, required });
    }

    pub fn unknown_keys(mut self, policy: UnknownKeys) -> Self {
        self.unknown_keys = policy;
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------- Constructors -------------------------------- //

impl Validator {
    pub fn any() -> Self {
        Validator::Any
    }

    pub fn null() -> Self {
        Validator::Null
    }

    pub fn boolean() -> Self {
        Validator::Bool
    }

    pub fn number() -> Self {
        Validator::Number
    }

    pub fn integer() -> Self {
        Validator::Integer
    }

    pub fn string() -> Self {
        Validator::String { format: None }
    }

    pub fn string_with_format(format: StringFormat) -> Self {
        Validator::String { format: Some(format) }
    }

    pub fn array_of(item: Validator) -> Self {
        Validator::Array { item: Box::new(item) }
    }

    pub fn object(shape: Shape) -> Self {
        Validator::Object(shape)
    }

    /// Choice of N alternatives. Callers guarantee N >= 2; smaller inputs
    /// should compile the branch directly instead.
    pub fn union(branches: Vec<Validator>) -> Self {
        Validator::Union(branches)
    }

    /// Wrap so the literal `null` is also accepted. Idempotent.
    pub fn nullable(self) -> Self {
        match self {
            Validator::Null | Validator::Nullable(_) => self,
            other => Validator::Nullable(Box::new(other)),
        }
    }

    /// Layer a predicate on top of this node.
    pub fn refine<F>(self, message: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Validator::Refined {
            inner: Box::new(self),
            test: Refinement {
                message: message.into(),
                test: Arc::new(test),
            },
        }
    }
}

// ------------------------------ Checking ---------------------------------- //

impl Validator {
    /// Validate `value`, returning the accepted (possibly key-stripped) value
    /// or every violation found.
    pub fn check(&self, value: &Value) -> Result<Value, Issues> {
        self.check_at("", value).map_err(|issues| Issues { issues })
    }

    fn check_at(&self, path: &str, value: &Value) -> Result<Value, Vec<Issue>> {
        match self {
            Validator::Any => Ok(value.clone()),

            Validator::Null => match value {
                Value::Null => Ok(Value::Null),
                other => Err(vec![type_issue(path, "null", other)]),
            },

            Validator::Bool => match value {
                Value::Bool(_) => Ok(value.clone()),
                other => Err(vec![type_issue(path, "boolean", other)]),
            },

            Validator::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                other => Err(vec![type_issue(path, "number", other)]),
            },

            Validator::Integer => match value {
                Value::Number(n) if is_integral(n) => Ok(value.clone()),
                other => Err(vec![type_issue(path, "integer", other)]),
            },

            Validator::String { format } => match value {
                Value::String(s) => match format {
                    Some(f) if !f.check(s) => Err(vec![Issue {
                        path: path.to_string(),
                        message: format!("string is not {}", f.expected()),
                    }]),
                    _ => Ok(value.clone()),
                },
                other => Err(vec![type_issue(path, "string", other)]),
            },

            Validator::Array { item } => {
                let elems = match value.as_array() {
                    Some(xs) => xs,
                    None => return Err(vec![type_issue(path, "array", value)]),
                };
                let mut issues = Vec::new();
                let mut out = Vec::with_capacity(elems.len());
                for (i, el) in elems.iter().enumerate() {
                    match item.check_at(&join_path(path, &i.to_string()), el) {
                        Ok(v) => out.push(v),
                        Err(mut errs) => issues.append(&mut errs),
                    }
                }
                if issues.is_empty() { Ok(Value::Array(out)) } else { Err(issues) }
            }

            Validator::Object(shape) => shape.check_at(path, value),

            Validator::Union(branches) => {
                for branch in branches {
                    if let Ok(v) = branch.check_at(path, value) {
                        return Ok(v);
                    }
                }
                Err(vec![type_issue(path, &self.expects(), value)])
            }

            Validator::Nullable(inner) => match value {
                Value::Null => Ok(Value::Null),
                other => inner.check_at(path, other).map_err(|errs| {
                    // Rewrite only the inner node's own top-level kind
                    // mismatch so it reads "expected X or null"; any deeper
                    // issues propagate untouched, paths and all.
                    if errs == [type_issue(path, &inner.expects(), other)] {
                        vec![type_issue(path, &self.expects(), other)]
                    } else {
                        errs
                    }
                }),
            },

            Validator::Refined { inner, test } => {
                let validated = inner.check_at(path, value)?;
                if (test.test)(&validated) {
                    Ok(validated)
                } else {
                    Err(vec![Issue {
                        path: path.to_string(),
                        message: test.message.clone(),
                    }])
                }
            }
        }
    }

    /// Short human tag used in "expected X, got Y" messages.
    fn expects(&self) -> String {
        match self {
            Validator::Any => "any value".to_string(),
            Validator::Null => "null".to_string(),
            Validator::Bool => "boolean".to_string(),
            Validator::Number => "number".to_string(),
            Validator::Integer => "integer".to_string(),
            Validator::String { .. } => "string".to_string(),
            Validator::Array { .. } => "array".to_string(),
            Validator::Object(_) => "object".to_string(),
            Validator::Union(branches) => {
                let alts: Vec<String> = branches.iter().map(|b| b.expects()).collect();
                alts.join(" or ")
            }
            Validator::Nullable(inner) => format!("{} or null", inner.expects()),
            Validator::Refined { inner, .. } => inner.expects(),
        }
    }
}

impl Shape {
    fn check_at(&self, path: &str, value: &Value) -> Result<Value, Vec<Issue>> {
        let map = match value.as_object() {
            Some(m) => m,
            None => return Err(vec![type_issue(path, "object", value)]),
        };

        let mut issues = Vec::new();
        let mut out = serde_json::Map::new();

        for (name, rule) in &self.fields {
            let field_path = join_path(path, name);
            match map.get(name) {
                Some(v) => match rule.validator.check_at(&field_path, v) {
                    Ok(validated) => {
                        out.insert(name.clone(), validated);
                    }
                    Err(mut errs) => issues.append(&mut errs),
                },
                None if rule.required => issues.push(Issue {
                    path: field_path,
                    message: format!("missing required property \"{name}\""),
                }),
                None => {}
            }
        }

        // Undeclared keys: acceptance depends on the policy; the validated
        // output only ever contains declared keys.
        match &self.unknown_keys {
            UnknownKeys::Reject => {
                for key in map.keys() {
                    if !self.fields.contains_key(key) {
                        issues.push(Issue {
                            path: join_path(path, key),
                            message: format!("unknown property \"{key}\""),
                        });
                    }
                }
            }
            UnknownKeys::Strip => {}
            UnknownKeys::Typed(catch_all) => {
                for (key, v) in map {
                    if !self.fields.contains_key(key) {
                        if let Err(mut errs) = catch_all.check_at(&join_path(path, key), v) {
                            issues.append(&mut errs);
                        }
                    }
                }
            }
        }

        if issues.is_empty() { Ok(Value::Object(out)) } else { Err(issues) }
    }
}

// ------------------------------- Issues ----------------------------------- //

/// A single violation with the JSON-Pointer-style path where it occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Everything that went wrong during one [`Validator::check`] call.
#[derive(Clone, Debug)]
pub struct Issues {
    issues: Vec<Issue>,
}

impl Issues {
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_inner(self) -> Vec<Issue> {
        self.issues
    }
}

impl fmt::Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Issues {}

// ------------------------------ Utilities ---------------------------------- //

fn is_integral(n: &serde_json::Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
}

fn join_path(base: &str, key: &str) -> String {
    format!("{base}/{key}")
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_issue(path: &str, expected: &str, got: &Value) -> Issue {
    Issue {
        path: path.to_string(),
        message: format!("expected {expected}, got {}", kind_of(got)),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_accept_their_own_kind_only() {
        assert!(Validator::number().check(&json!(1.5)).is_ok());
        assert!(Validator::number().check(&json!("1.5")).is_err());
        assert!(Validator::integer().check(&json!(7)).is_ok());
        assert!(Validator::integer().check(&json!(7.25)).is_err());
        assert!(Validator::boolean().check(&json!(false)).is_ok());
        assert!(Validator::boolean().check(&json!(0)).is_err());
        assert!(Validator::null().check(&json!(null)).is_ok());
        assert!(Validator::null().check(&json!("null")).is_err());
    }

    #[test]
    fn integer_accepts_integral_floats() {
        // 3.0 round-trips through f64 but has no fractional part.
        assert!(Validator::integer().check(&json!(3.0)).is_ok());
    }

    #[test]
    fn any_passes_everything_through_unchanged() {
        let v = Validator::any();
        for sample in [json!(null), json!(true), json!([1, 2]), json!({"k": "v"})] {
            assert_eq!(v.check(&sample).unwrap(), sample);
        }
    }

    #[test]
    fn union_reports_all_alternatives() {
        let v = Validator::union(vec![Validator::string(), Validator::integer()]);
        assert!(v.check(&json!("x")).is_ok());
        assert!(v.check(&json!(4)).is_ok());
        let err = v.check(&json!(true)).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.issues()[0].message.contains("string or integer"));
    }

    #[test]
    fn nullable_is_idempotent() {
        let v = Validator::string().nullable().nullable();
        assert!(matches!(v, Validator::Nullable(ref inner) if matches!(**inner, Validator::String { .. })));
        assert!(v.check(&json!(null)).is_ok());
        assert!(v.check(&json!("x")).is_ok());
        assert!(v.check(&json!(1)).is_err());
    }

    #[test]
    fn refinement_uses_custom_message() {
        let v = Validator::string().refine("must be lowercase", |val| {
            val.as_str().is_some_and(|s| s.chars().all(|c| !c.is_uppercase()))
        });
        assert!(v.check(&json!("ok")).is_ok());
        let err = v.check(&json!("NOPE")).unwrap_err();
        assert_eq!(err.issues()[0].message, "must be lowercase");
        // Non-strings still fail with the base string error, not the refinement.
        let err = v.check(&json!(1)).unwrap_err();
        assert!(err.issues()[0].message.contains("expected string"));
    }

    #[test]
    fn array_collects_every_failing_index() {
        let v = Validator::array_of(Validator::string());
        let err = v.check(&json!(["ok", 1, "ok", 2])).unwrap_err();
        assert_eq!(err.len(), 2);
        assert_eq!(err.issues()[0].path, "/1");
        assert_eq!(err.issues()[1].path, "/3");
    }

    #[test]
    fn object_strict_rejects_unknown_and_reports_missing() {
        let mut shape = Shape::new();
        shape.field("name", Validator::string(), true);
        shape.field("age", Validator::integer(), false);
        let v = Validator::object(shape);

        assert!(v.check(&json!({"name": "John"})).is_ok());
        let err = v.check(&json!({"extra": 1})).unwrap_err();
        let messages: Vec<&str> = err.issues().iter().map(|i| i.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("missing required property \"name\"")));
        assert!(messages.iter().any(|m| m.contains("unknown property \"extra\"")));
    }

    #[test]
    fn object_strip_drops_undeclared_keys_from_output() {
        let mut shape = Shape::new();
        shape.field("name", Validator::string(), true);
        let v = Validator::object(shape.unknown_keys(UnknownKeys::Strip));

        let out = v.check(&json!({"name": "John", "age": 30})).unwrap();
        assert_eq!(out, json!({"name": "John"}));
        assert!(out.get("age").is_none());
    }

    #[test]
    fn object_typed_unknown_keys_must_validate_but_are_stripped() {
        let mut shape = Shape::new();
        shape.field("name", Validator::string(), true);
        let v = Validator::object(
            shape.unknown_keys(UnknownKeys::Typed(Box::new(Validator::number()))),
        );

        let out = v.check(&json!({"name": "John", "age": 30})).unwrap();
        assert_eq!(out, json!({"name": "John"}));

        let err = v.check(&json!({"name": "John", "age": "thirty"})).unwrap_err();
        assert_eq!(err.issues()[0].path, "/age");
    }

    #[test]
    fn nested_paths_point_into_the_value() {
        let mut inner = Shape::new();
        inner.field("city", Validator::string(), true);
        let mut outer = Shape::new();
        outer.field("address", Validator::object(inner), true);
        let v = Validator::object(outer);

        let err = v.check(&json!({"address": {"city": 42}})).unwrap_err();
        assert_eq!(err.issues()[0].path, "/address/city");
    }

    #[test]
    fn nullable_object_keeps_field_paths_on_failure() {
        let mut shape = Shape::new();
        shape.field("name", Validator::string(), true);
        let v = Validator::object(shape).nullable();

        assert!(v.check(&json!(null)).is_ok());
        // A failing field inside the non-null side must surface with its own
        // path, not collapse into a root-level kind mismatch.
        let err = v.check(&json!({"name": 42})).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.issues()[0].path, "/name");
        assert!(err.issues()[0].message.contains("expected string"));
        // The wholesale kind mismatch still names both alternatives.
        let err = v.check(&json!(7)).unwrap_err();
        assert!(err.issues()[0].message.contains("object or null"));
    }

    #[test]
    fn nullable_refinement_message_survives_the_wrapper() {
        let v = Validator::string()
            .refine("must be lowercase", |val| {
                val.as_str().is_some_and(|s| s.chars().all(|c| !c.is_uppercase()))
            })
            .nullable();
        let err = v.check(&json!("NOPE")).unwrap_err();
        assert_eq!(err.issues()[0].message, "must be lowercase");
    }

    #[test]
    fn issues_display_is_line_per_violation() {
        let v = Validator::array_of(Validator::integer());
        let err = v.check(&json!(["a", "b"])).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("/0: expected integer, got string"));
        assert!(rendered.lines().count() == 2);
    }
}
