#![forbid(unsafe_code)]

//! Field-level shape checks on a parsed IR document. Fail-fast: the first
//! defect found is returned with its field path.

use crate::IrError;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;

const EXPECTATION_VARIANTS: [&str; 3] = ["raises", "equals", "predicate"];

pub fn validate_structure(document: &JsonValue) -> Result<(), IrError> {
    let Some(root) = document.as_object() else {
        return Err(IrError::structural("$", "IR document must be a JSON object"));
    };

    let target = root
        .get("target")
        .ok_or_else(|| IrError::structural("target", "missing required field"))?;
    let cases = root
        .get("cases")
        .ok_or_else(|| IrError::structural("cases", "missing required field"))?;
    let Some(cases) = cases.as_array() else {
        return Err(IrError::structural("cases", "must be an array"));
    };

    for (idx, case) in cases.iter().enumerate() {
        let path = format!("cases[{idx}]");
        let Some(case) = case.as_object() else {
            return Err(IrError::structural(path, "case must be an object"));
        };
        for field in ["id", "call", "expectation"] {
            if !case.contains_key(field) {
                return Err(IrError::structural(
                    format!("{path}.{field}"),
                    "missing required field",
                ));
            }
        }
    }

    check_target(target)?;

    let mut seen_ids = BTreeSet::new();
    for (idx, case) in cases.iter().enumerate() {
        let path = format!("cases[{idx}]");
        let Some(case) = case.as_object() else {
            continue;
        };
        let id = check_id(case, &path)?;
        if !seen_ids.insert(id) {
            return Err(IrError::structural(
                format!("{path}.id"),
                format!("duplicate case id `{id}`"),
            ));
        }
        check_call(case, &path)?;
        check_expectation(case, &path)?;
    }
    Ok(())
}

fn check_target(target: &JsonValue) -> Result<(), IrError> {
    let Some(raw) = target.as_str() else {
        return Err(IrError::structural("target", "must be a string"));
    };
    let mut parts = raw.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(module), Some(function), None)
            if !module.trim().is_empty() && !function.trim().is_empty() =>
        {
            Ok(())
        }
        _ => Err(IrError::structural(
            "target",
            format!("`{raw}` must have the form <module>:<function>"),
        )),
    }
}

fn check_id<'a>(case: &'a Map<String, JsonValue>, path: &str) -> Result<&'a str, IrError> {
    match case.get("id").and_then(JsonValue::as_str) {
        Some(id) if !id.is_empty() => Ok(id),
        Some(_) => Err(IrError::structural(format!("{path}.id"), "must not be empty")),
        None => Err(IrError::structural(format!("{path}.id"), "must be a string")),
    }
}

fn check_call(case: &Map<String, JsonValue>, path: &str) -> Result<(), IrError> {
    let Some(call) = case.get("call").and_then(JsonValue::as_object) else {
        return Err(IrError::structural(format!("{path}.call"), "must be an object"));
    };
    if let Some(args) = call.get("args")
        && !args.is_array()
    {
        return Err(IrError::structural(
            format!("{path}.call.args"),
            "must be an array",
        ));
    }
    if let Some(kwargs) = call.get("kwargs")
        && !kwargs.is_object()
    {
        return Err(IrError::structural(
            format!("{path}.call.kwargs"),
            "must be an object",
        ));
    }
    Ok(())
}

fn check_expectation(case: &Map<String, JsonValue>, path: &str) -> Result<(), IrError> {
    let field = format!("{path}.expectation");
    let Some(expectation) = case.get("expectation").and_then(JsonValue::as_object) else {
        return Err(IrError::structural(field, "must be an object"));
    };

    let present: Vec<&str> = EXPECTATION_VARIANTS
        .into_iter()
        .filter(|variant| expectation.contains_key(*variant))
        .collect();
    if expectation.len() != 1 || present.len() != 1 {
        return Err(IrError::structural(
            field,
            format!(
                "must contain exactly one of {} (found keys: {})",
                EXPECTATION_VARIANTS.join(", "),
                expectation.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        ));
    }

    let variant = present[0];
    let body_path = format!("{field}.{variant}");
    let Some(body) = expectation.get(variant).and_then(JsonValue::as_object) else {
        return Err(IrError::structural(body_path, "must be an object"));
    };

    match variant {
        "raises" => {
            let types = body.get("types").and_then(JsonValue::as_array);
            match types {
                Some(types) if !types.is_empty() && types.iter().all(JsonValue::is_string) => {
                    Ok(())
                }
                _ => Err(IrError::structural(
                    format!("{body_path}.types"),
                    "must be a non-empty array of error kind names",
                )),
            }
        }
        "equals" => {
            if !body.contains_key("value") {
                return Err(IrError::structural(
                    format!("{body_path}.value"),
                    "missing required field",
                ));
            }
            match body.get("tolerance") {
                None | Some(JsonValue::Null) => Ok(()),
                Some(tolerance) => match tolerance.as_f64() {
                    Some(tol) if tol.is_finite() && tol >= 0.0 => Ok(()),
                    _ => Err(IrError::structural(
                        format!("{body_path}.tolerance"),
                        "must be a finite number >= 0",
                    )),
                },
            }
        }
        _ => match body.get("name") {
            Some(JsonValue::String(_)) => Ok(()),
            _ => Err(IrError::structural(
                format!("{body_path}.name"),
                "must be a string",
            )),
        },
    }
}
