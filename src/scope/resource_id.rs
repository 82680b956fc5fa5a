//! Azure resource ID helpers
//!
//! IDs look like
//! `/subscriptions/<sub>/resourceGroups/<rg>/providers/<ns>/<type>/<name>`;
//! ARM does not guarantee the casing of the fixed segments.

/// Value following the first segment equal (ignoring case) to `segment`
fn segment_value<'a>(id: &'a str, segment: &str) -> Option<&'a str> {
    let mut parts = id.split('/');
    parts.find(|p| p.eq_ignore_ascii_case(segment))?;
    parts.next().filter(|v| !v.is_empty())
}

/// Resource group name from a resource ID, lower-cased
pub fn resource_group_from_id(id: &str) -> Option<String> {
    segment_value(id, "resourceGroups").map(|rg| rg.to_lowercase())
}

/// Subscription ID from a resource ID, lower-cased
pub fn subscription_from_id(id: &str) -> Option<String> {
    segment_value(id, "subscriptions").map(|s| s.to_lowercase())
}
