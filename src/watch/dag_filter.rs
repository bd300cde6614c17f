// src/watch/dag_filter.rs

//! DAG-aware filtering of watch matches.

use std::collections::{HashMap, HashSet};

/// Return true if `task` has any ancestor whose name is in `matching_names`.
///
/// Ancestors are followed transitively through `dep_map` (the `after`
/// lists). Such a task will run anyway as a dependent of that ancestor.
pub fn has_ancestor_in_matching(
    task: &str,
    matching_names: &HashSet<&str>,
    dep_map: &HashMap<String, Vec<String>>,
) -> bool {
    let mut stack: Vec<&str> = dep_map
        .get(task)
        .map(|deps| deps.iter().map(String::as_str).collect())
        .unwrap_or_default();
    let mut visited: HashSet<&str> = HashSet::new();

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        if matching_names.contains(current) {
            return true;
        }
        if let Some(parents) = dep_map.get(current) {
            stack.extend(parents.iter().map(String::as_str));
        }
    }

    false
}

/// Keep only the matching tasks that have no matching ancestor.
pub fn roots<'a>(matching: &[&'a str], dep_map: &HashMap<String, Vec<String>>) -> Vec<&'a str> {
    let names: HashSet<&str> = matching.iter().copied().collect();
    matching
        .iter()
        .copied()
        .filter(|task| !has_ancestor_in_matching(task, &names, dep_map))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependents_of_a_matching_task_are_dropped() {
        let dep_map: HashMap<String, Vec<String>> = [
            ("app-ngdocs".to_string(), vec!["app-annotate".to_string()]),
            ("app-annotate".to_string(), vec![]),
        ]
        .into_iter()
        .collect();

        assert_eq!(roots(&["app-annotate", "app-ngdocs"], &dep_map), ["app-annotate"]);
        assert_eq!(roots(&["app-ngdocs"], &dep_map), ["app-ngdocs"]);
    }
}
