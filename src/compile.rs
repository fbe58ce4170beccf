//! Schema compiler: JSON Schema document → [`Validator`] graph.
//!
//! One pure recursive pass. Each schema node is routed by its `type` tag (or,
//! when `type` is absent, by its structural keywords) to a builder that
//! assembles runtime combinators. Nothing here checks values; value-level
//! work lives entirely in [`crate::runtime`].
//!
//! Dispatch order is load-bearing and must stay exactly:
//! 1. `type` as an array → nullable/union handling
//! 2. `type` as one of the six scalar/container tags → leaf/container builder
//! 3. no `type`, any of `oneOf`/`anyOf`/`allOf` → composite builder
//!    (composites outrank structural inference; schemas routinely carry
//!    `properties` next to `oneOf` and the composite is authoritative)
//! 4. no `type`, `properties` present → inferred object
//! 5. nothing at all → accept-any
//! 6. unrecognized `type` with no composite to fall back on → error
//!
//! Known approximations, kept on purpose (changing either alters acceptance
//! behavior for existing schemas):
//! - `allOf` is a shallow structural merge, not a logical intersection;
//!   conflicting non-mergeable keywords (two `format`s, say) resolve to the
//!   later branch.
//! - tuple-style `items` sequences validate every element against the union
//!   of all positions rather than the schema at its own index.
//! - `required` names with no matching `properties` entry are ignored; no
//!   field requirement is synthesized for an undeclared property.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::runtime::{Shape, StringFormat, UnknownKeys, Validator};

// ------------------------------- Errors ----------------------------------- //

/// Construction-time failure. Any of these aborts compilation of the whole
/// tree; there is no partial or best-effort validator.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("unsupported schema type `{0}`")]
    UnsupportedType(String),

    #[error("array schema must have items defined")]
    MissingItems,

    #[error("schema node must be a JSON object, got {0}")]
    MalformedNode(&'static str),

    #[error("`{0}` must be an array of schema nodes")]
    MalformedKeyword(&'static str),

    #[error("internal invariant violated: {0}")]
    Invariant(&'static str),
}

// ----------------------------- Entry point -------------------------------- //

/// Compile one schema node into a ready-to-use validator.
///
/// The input is never mutated; paths that need an adjusted node (`type`
/// arrays, `allOf`) build fresh copies. The result is immutable and safe to
/// share across concurrent validation calls.
pub fn convert(schema: &Value) -> Result<Validator, CompileError> {
    let node = schema
        .as_object()
        .ok_or_else(|| CompileError::MalformedNode(value_kind(schema)))?;
    compile_node(node)
}

// ---------------------------- Type dispatch -------------------------------- //

fn compile_node(node: &Map<String, Value>) -> Result<Validator, CompileError> {
    match node.get("type") {
        Some(Value::Array(tags)) => compile_type_array(node, tags),
        Some(Value::String(tag)) => compile_tagged(node, tag),
        Some(other) => fall_back_to_composite(node, other.to_string()),
        None => {
            if has_composite(node) {
                compile_composite(node)
            } else if node.contains_key("properties") {
                compile_object(node)
            } else {
                Ok(Validator::any())
            }
        }
    }
}

fn compile_tagged(node: &Map<String, Value>, tag: &str) -> Result<Validator, CompileError> {
    match tag {
        "string" => compile_string(node),
        "number" => Ok(Validator::number()),
        "integer" => Ok(Validator::integer()),
        "boolean" => Ok(Validator::boolean()),
        "array" => compile_array(node),
        "object" => compile_object(node),
        other => fall_back_to_composite(node, other.to_string()),
    }
}

/// An unrecognized `type` is only an error when there is no composite
/// keyword to route to instead.
fn fall_back_to_composite(
    node: &Map<String, Value>,
    tag: String,
) -> Result<Validator, CompileError> {
    if has_composite(node) {
        compile_composite(node)
    } else {
        Err(CompileError::UnsupportedType(tag))
    }
}

fn has_composite(node: &Map<String, Value>) -> bool {
    node.contains_key("oneOf") || node.contains_key("anyOf") || node.contains_key("allOf")
}

// ------------------------- Type arrays (nullable) -------------------------- //

/// `type: [..]` means "one of these tags". A `null` entry is stripped, the
/// residue recompiled with every other keyword carried over, and the result
/// wrapped nullable. A single surviving tag becomes a scalar `type` so the
/// single-type path (format/enum layering) is exercised.
fn compile_type_array(
    node: &Map<String, Value>,
    tags: &[Value],
) -> Result<Validator, CompileError> {
    let mut rest: Vec<&str> = Vec::with_capacity(tags.len());
    let mut has_null = false;
    for tag in tags {
        match tag.as_str() {
            Some("null") => has_null = true,
            Some(name) => rest.push(name),
            None => return Err(CompileError::UnsupportedType(tag.to_string())),
        }
    }

    if has_null {
        let residue = match rest.as_slice() {
            // `type: ["null"]` alone: only the literal null conforms.
            [] => return Ok(Validator::null()),
            [only] => retag(node, Value::String((*only).to_string())),
            many => retag(
                node,
                Value::Array(many.iter().map(|t| Value::String((*t).to_string())).collect()),
            ),
        };
        return Ok(compile_node(&residue)?.nullable());
    }

    match rest.len() {
        0 => Err(CompileError::Invariant("empty type array")),
        1 => compile_node(&retag(node, Value::String(rest[0].to_string()))),
        _ => {
            let branches = rest
                .iter()
                .map(|tag| compile_node(&retag(node, Value::String((*tag).to_string()))))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Validator::union(branches))
        }
    }
}

/// Copy of the node with `type` replaced. The original is never touched.
fn retag(node: &Map<String, Value>, ty: Value) -> Map<String, Value> {
    let mut copy = node.clone();
    copy.insert("type".to_string(), ty);
    copy
}

// ----------------------------- Leaf builders ------------------------------- //

/// Base string acceptance, then `format`, then `enum` membership. The enum
/// check is layered on top rather than replacing the base validator so a
/// non-string input still gets the runtime's native string-type error, and
/// the format refinement must be applied before the enum layer.
fn compile_string(node: &Map<String, Value>) -> Result<Validator, CompileError> {
    let mut v = match node.get("format").and_then(Value::as_str) {
        Some(tag) => match StringFormat::parse(tag) {
            Some(format) => Validator::string_with_format(format),
            // Unknown format tags pass through as plain strings.
            None => Validator::string(),
        },
        None => Validator::string(),
    };

    if let Some(Value::Array(literals)) = node.get("enum") {
        let listing = literals
            .iter()
            .map(render_literal)
            .collect::<Vec<_>>()
            .join(", ");
        let allowed = literals.clone();
        v = v.refine(format!("must be one of: {listing}"), move |candidate| {
            allowed.iter().any(|lit| lit == candidate)
        });
    }

    Ok(v)
}

fn render_literal(lit: &Value) -> String {
    match lit {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// --------------------------- Composite builders ---------------------------- //

fn compile_composite(node: &Map<String, Value>) -> Result<Validator, CompileError> {
    if let Some(branches) = node.get("oneOf") {
        return compile_choice(branches, "oneOf");
    }
    if let Some(branches) = node.get("anyOf") {
        return compile_any_of(branches);
    }
    if let Some(branches) = node.get("allOf") {
        return compile_all_of(branches);
    }
    Err(CompileError::Invariant("composite dispatch without composite keyword"))
}

/// `oneOf` compiled as plain choice: mutual exclusivity across branches is
/// not enforced, only "at least one branch accepts".
fn compile_choice(branches: &Value, keyword: &'static str) -> Result<Validator, CompileError> {
    let branches = branches
        .as_array()
        .ok_or(CompileError::MalformedKeyword(keyword))?;
    match branches.len() {
        0 => Ok(Validator::any()),
        1 => convert(&branches[0]),
        _ => {
            let compiled = branches.iter().map(convert).collect::<Result<Vec<_>, _>>()?;
            Ok(Validator::union(compiled))
        }
    }
}

/// Like `oneOf`, except a literal `{ "type": "null" }` branch becomes a
/// direct accept-null node instead of taking the type-array null-stripping
/// path through a degenerate recompilation.
fn compile_any_of(branches: &Value) -> Result<Validator, CompileError> {
    let branches = branches
        .as_array()
        .ok_or(CompileError::MalformedKeyword("anyOf"))?;

    let mut compiled = Vec::with_capacity(branches.len());
    for branch in branches {
        if branch.get("type").and_then(Value::as_str) == Some("null") {
            compiled.push(Validator::null());
        } else {
            compiled.push(convert(branch)?);
        }
    }

    match compiled.len() {
        0 => Ok(Validator::any()),
        1 => Ok(compiled.remove(0)),
        _ => Ok(Validator::union(compiled)),
    }
}

/// `allOf` as a left-fold structural merge followed by a single compile pass.
/// A value can satisfy the merged schema without satisfying every branch
/// independently when branches define conflicting non-mergeable keywords;
/// that is the documented contract, not a bug.
fn compile_all_of(branches: &Value) -> Result<Validator, CompileError> {
    let branches = branches
        .as_array()
        .ok_or(CompileError::MalformedKeyword("allOf"))?;
    if branches.is_empty() {
        return Ok(Validator::any());
    }

    let mut merged = Map::new();
    for branch in branches {
        let node = branch
            .as_object()
            .ok_or_else(|| CompileError::MalformedNode(value_kind(branch)))?;
        merged = merge_nodes(merged, node);
    }
    compile_node(&merged)
}

/// Shallow merge: later keys win, except `properties` (shallow union keyed by
/// property name, later definitions win) and `required` (set union). Child
/// schemas are never merged recursively.
fn merge_nodes(mut base: Map<String, Value>, extra: &Map<String, Value>) -> Map<String, Value> {
    for (key, add) in extra {
        let merged = match (key.as_str(), base.get(key), add) {
            ("properties", Some(Value::Object(have)), Value::Object(incoming)) => {
                let mut union = have.clone();
                for (name, child) in incoming {
                    union.insert(name.clone(), child.clone());
                }
                Value::Object(union)
            }
            ("required", Some(Value::Array(have)), Value::Array(incoming)) => {
                let mut union = have.clone();
                for name in incoming {
                    if !union.contains(name) {
                        union.push(name.clone());
                    }
                }
                Value::Array(union)
            }
            _ => add.clone(),
        };
        base.insert(key.clone(), merged);
    }
    base
}

// ---------------------------- Container builders --------------------------- //

/// Field-by-field shape; a property is optional unless named in `required`.
/// Unknown-key policy, in priority order: `additionalProperties: true` →
/// accept and strip, a schema → accept-typed and strip, absent or `false` →
/// strict reject.
fn compile_object(node: &Map<String, Value>) -> Result<Validator, CompileError> {
    let required: Vec<&str> = node
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut shape = Shape::new();
    if let Some(Value::Object(props)) = node.get("properties") {
        for (name, child) in props {
            let compiled = convert(child)?;
            shape.field(name, compiled, required.contains(&name.as_str()));
        }
    }

    let policy = match node.get("additionalProperties") {
        Some(Value::Bool(true)) => UnknownKeys::Strip,
        Some(catch_all @ Value::Object(_)) => UnknownKeys::Typed(Box::new(convert(catch_all)?)),
        _ => UnknownKeys::Reject,
    };

    Ok(Validator::object(shape.unknown_keys(policy)))
}

/// `items` is mandatory. A single node yields a homogeneous array; a sequence
/// yields one choice validator over all positions, applied to every element.
fn compile_array(node: &Map<String, Value>) -> Result<Validator, CompileError> {
    match node.get("items") {
        None => Err(CompileError::MissingItems),
        Some(Value::Array(positions)) => {
            let mut compiled = positions.iter().map(convert).collect::<Result<Vec<_>, _>>()?;
            let element = match compiled.len() {
                0 => Validator::any(),
                1 => compiled.remove(0),
                _ => Validator::union(compiled),
            };
            Ok(Validator::array_of(element))
        }
        Some(single) => Ok(Validator::array_of(convert(single)?)),
    }
}

// ------------------------------ Utilities ---------------------------------- //

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ------------------------------- Tests ------------------------------------ //
