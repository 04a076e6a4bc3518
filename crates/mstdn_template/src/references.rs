//! Static analysis of deferred references in a template.

use std::collections::BTreeSet;

use crate::template::{Template, OUTPUTS, RESOURCES};
use crate::value::Value;

/// A `Ref` or `Fn::GetAtt` expression found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Dotted location of the expression, e.g. `Resources.DBInstance.Properties.VPCSecurityGroups[0]`.
    pub location: String,
    /// Logical name the expression points at.
    pub target: String,
    /// Attribute path for `Fn::GetAtt`.
    pub attribute: Option<String>,
}

/// Collect every reference under `value`, depth first, in document order.
pub fn collect_references(value: &Value, location: &str) -> Vec<Reference> {
    let mut found = Vec::new();
    walk(value, location, &mut found);
    found
}

fn walk(value: &Value, location: &str, found: &mut Vec<Reference>) {
    match value {
        Value::Ref(target) => found.push(Reference {
            location: location.to_string(),
            target: target.clone(),
            attribute: None,
        }),
        Value::GetAtt {
            resource,
            attribute,
        } => found.push(Reference {
            location: location.to_string(),
            target: resource.clone(),
            attribute: Some(attribute.clone()),
        }),
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &format!("{}[{}]", location, i), found);
            }
        }
        Value::Mapping(mapping) => {
            for (key, child) in mapping.iter() {
                walk(child, &format!("{}.{}", location, key), found);
            }
        }
        Value::Literal(_) => {}
    }
}

/// References that do not resolve.
///
/// A reference inside a resource must name a parameter, a resource declared
/// earlier in the Resources section, or a name accepted by `is_external`.
/// A reference inside Outputs may name any declared resource.
pub fn unresolved_references<F>(template: &Template, is_external: F) -> Vec<Reference>
where
    F: Fn(&str) -> bool,
{
    let mut declared: BTreeSet<&str> = template
        .parameters()
        .map(|p| p.keys().collect())
        .unwrap_or_default();
    let mut unresolved = Vec::new();

    if let Some(resources) = template.resources() {
        for (name, body) in resources.iter() {
            let location = format!("{}.{}", RESOURCES, name);
            unresolved.extend(
                collect_references(body, &location)
                    .into_iter()
                    .filter(|r| !declared.contains(r.target.as_str()) && !is_external(&r.target)),
            );
            declared.insert(name);
        }
    }

    if let Some(outputs) = template.outputs() {
        for (name, body) in outputs.iter() {
            let location = format!("{}.{}", OUTPUTS, name);
            unresolved.extend(
                collect_references(body, &location)
                    .into_iter()
                    .filter(|r| !declared.contains(r.target.as_str()) && !is_external(&r.target)),
            );
        }
    }

    unresolved
}
