//! Double opt-in between databases and archivers.
//!
//! An archiver declares which databases it accepts ([`AllowedConsumers`]);
//! a database either pins one archiver by reference or picks up the single
//! archiver whose rules it satisfies. Both sides have to agree before a
//! database is archived.

use crate::apis::archiver::{AllowedConsumers, Archiver, FromNamespaces};
use crate::apis::v1::ArchivedDatabase;
use crate::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

static LABEL_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$").expect("label value pattern compiles")
});
static QUALIFIED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("qualified name pattern compiles")
});
static DNS_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("dns subdomain pattern compiles")
});

/// The metadata of a database the archiver rules are evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct ConsumerMeta<'a> {
    pub namespace: &'a str,
    pub labels: &'a BTreeMap<String, String>,
    pub namespace_labels: &'a BTreeMap<String, String>,
}

fn validate_label_key(key: &str) -> Result<()> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    if let Some(prefix) = prefix {
        if prefix.is_empty() || prefix.len() > 253 || !DNS_SUBDOMAIN.is_match(prefix) {
            return Err(Error::InvalidLabelSelector(format!("invalid label key prefix {prefix:?}")));
        }
    }
    if name.is_empty() || name.len() > 63 || !QUALIFIED_NAME.is_match(name) {
        return Err(Error::InvalidLabelSelector(format!("invalid label key {key:?}")));
    }
    Ok(())
}

fn validate_label_value(value: &str) -> Result<()> {
    if value.len() > 63 || !LABEL_VALUE.is_match(value) {
        return Err(Error::InvalidLabelSelector(format!("invalid label value {value:?}")));
    }
    Ok(())
}

fn requirement_matches(req: &LabelSelectorRequirement, labels: &BTreeMap<String, String>) -> Result<bool> {
    validate_label_key(&req.key)?;
    let values = req.values.as_deref().unwrap_or_default();
    let actual = labels.get(&req.key);

    match req.operator.as_str() {
        "In" | "NotIn" => {
            if values.is_empty() {
                return Err(Error::InvalidLabelSelector(format!(
                    "operator {} on {:?} needs at least one value",
                    req.operator, req.key
                )));
            }
            for value in values {
                validate_label_value(value)?;
            }
            let contained = actual.is_some_and(|v| values.contains(v));
            Ok(if req.operator == "In" { contained } else { !contained })
        }
        "Exists" | "DoesNotExist" => {
            if !values.is_empty() {
                return Err(Error::InvalidLabelSelector(format!(
                    "operator {} on {:?} takes no values",
                    req.operator, req.key
                )));
            }
            Ok(actual.is_some() == (req.operator == "Exists"))
        }
        op => Err(Error::InvalidLabelSelector(format!("unknown operator {op:?}"))),
    }
}

/// Evaluates a label selector the way the API server does.
///
/// `matchLabels` and `matchExpressions` are ANDed and an empty selector
/// matches everything. The whole selector is validated before the result
/// is returned, so a malformed selector is an error even when an earlier
/// requirement already failed to match.
pub fn label_selector_matches(selector: &LabelSelector, labels: &BTreeMap<String, String>) -> Result<bool> {
    let mut matched = true;
    for (key, value) in selector.match_labels.iter().flatten() {
        validate_label_key(key)?;
        validate_label_value(value)?;
        matched &= labels.get(key) == Some(value);
    }
    for req in selector.match_expressions.iter().flatten() {
        matched &= requirement_matches(req, labels)?;
    }
    Ok(matched)
}

/// An absent selector matches everything.
fn matches_optional(selector: Option<&LabelSelector>, labels: &BTreeMap<String, String>) -> Result<bool> {
    selector.map_or(Ok(true), |s| label_selector_matches(s, labels))
}

pub fn is_in_allowed_namespaces(
    consumers: &AllowedConsumers,
    db: ConsumerMeta<'_>,
    archiver_namespace: &str,
) -> Result<bool> {
    let Some(namespaces) = &consumers.namespaces else {
        return Ok(false);
    };
    match namespaces.from {
        None => Ok(false),
        Some(FromNamespaces::All) => Ok(true),
        Some(FromNamespaces::Same) => Ok(db.namespace == archiver_namespace),
        Some(FromNamespaces::Selector) => matches_optional(namespaces.selector.as_ref(), db.namespace_labels),
    }
}

/// Whether an archiver in `archiver_namespace` accepts the database.
pub fn is_double_opt_in(
    consumers: Option<&AllowedConsumers>,
    db: ConsumerMeta<'_>,
    archiver_namespace: &str,
) -> Result<bool> {
    let Some(consumers) = consumers else {
        return Ok(false);
    };
    if !is_in_allowed_namespaces(consumers, db, archiver_namespace)? {
        return Ok(false);
    }
    matches_optional(consumers.selector.as_ref(), db.labels)
}

/// Picks the archiver for `db` out of `archivers`.
///
/// A referenced archiver is used when it exists and accepts the database.
/// Without a reference, every unpaused archiver accepting the database is a
/// candidate and more than one candidate is an error.
pub fn select_archiver<'a, D, A>(
    db: &D,
    namespace_labels: &BTreeMap<String, String>,
    archivers: &'a [A],
) -> Result<Option<&'a A>>
where
    D: ArchivedDatabase,
    A: Archiver,
{
    let namespace = db.namespace().unwrap_or_default();
    let meta = ConsumerMeta {
        namespace: &namespace,
        labels: db.labels(),
        namespace_labels,
    };

    if let Some(reference) = db.archiver_ref() {
        let ref_ns = reference.namespace.as_deref().unwrap_or(&namespace);
        let Some(archiver) = archivers
            .iter()
            .find(|a| a.name_any() == reference.name && a.namespace().as_deref() == Some(ref_ns))
        else {
            debug!("archiver {}/{} referenced by {} not found", ref_ns, reference.name, db.name_any());
            return Ok(None);
        };
        let accepted = is_double_opt_in(archiver.consumers(), meta, ref_ns)?;
        return Ok(accepted.then_some(archiver));
    }

    let mut candidates = Vec::new();
    for archiver in archivers.iter().filter(|a| !a.paused()) {
        let archiver_ns = archiver.namespace().unwrap_or_default();
        if is_double_opt_in(archiver.consumers(), meta, &archiver_ns)? {
            candidates.push(archiver);
        }
    }

    match candidates.as_slice() {
        [] => Ok(None),
        [archiver] => Ok(Some(*archiver)),
        many => Err(Error::AmbiguousArchiver(
            many.iter()
                .map(|a| format!("{}/{}", a.namespace().unwrap_or_default(), a.name_any()))
                .collect(),
        )),
    }
}
