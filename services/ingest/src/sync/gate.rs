use lark_db::users::models::UserProfile;

/// Fields compared before a profile write, paired with their accessor.
const TRACKED: &[(&str, fn(&UserProfile) -> Option<&str>)] = &[
    ("name", name),
    ("mobile", mobile),
    ("description", description),
    ("union_id", union_id),
    ("open_id", open_id),
];

fn name(p: &UserProfile) -> Option<&str> {
    p.name.as_deref()
}

fn mobile(p: &UserProfile) -> Option<&str> {
    p.mobile.as_deref()
}

fn description(p: &UserProfile) -> Option<&str> {
    p.description.as_deref()
}

fn union_id(p: &UserProfile) -> Option<&str> {
    p.union_id.as_deref()
}

fn open_id(p: &UserProfile) -> Option<&str> {
    p.open_id.as_deref()
}

/// Names of the tracked fields that differ between the stored and fetched profile.
///
/// An absent value and an empty string are the same thing: a field only counts
/// as changed when at least one side carries a non-empty value.
pub fn changed_fields(old: &UserProfile, new: &UserProfile) -> Vec<&'static str> {
    TRACKED
        .iter()
        .filter(|(_, get)| non_empty(get(old)) != non_empty(get(new)))
        .map(|(name, _)| *name)
        .collect()
}

pub fn profile_changed(old: &UserProfile, new: &UserProfile) -> bool {
    !changed_fields(old, new).is_empty()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
