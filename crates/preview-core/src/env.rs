//! `.env` text merging.
//!
//! The environment file is deliberately treated as an opaque text blob, not
//! parsed into a map: whatever formatting, comments, or oddities the file
//! already has must survive untouched. Edits are positional substitutions on
//! `KEY=` lines only.

use indexmap::IndexMap;

/// One assignment to merge into the env text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    /// Set (or replace) the key's value.
    Set(String),
    /// Remove the key's line entirely.
    Unset,
}

impl EnvValue {
    pub fn set(value: impl Into<String>) -> Self {
        Self::Set(value.into())
    }
}

/// Ordered key → assignment map. Iteration order is insertion order, and
/// re-inserting an existing key keeps its original position — both matter
/// for how defaults and caller overrides interleave.
pub type EnvAssignments = IndexMap<String, EnvValue>;

/// Merge `assignments` into `.env`-formatted text.
///
/// For each key in insertion order: if a line starting with `KEY=` exists,
/// its value (through end of line) is replaced, or the whole line removed
/// for [`EnvValue::Unset`]; otherwise a `KEY=value` line is appended at the
/// end, preceded by a blank line. Lines for keys not in `assignments` are
/// never touched.
pub fn update_env_text(env: &str, assignments: &EnvAssignments) -> String {
    let mut env = env.to_owned();
    for (key, value) in assignments {
        env = apply(&env, key, value);
    }
    env
}

fn apply(env: &str, key: &str, value: &EnvValue) -> String {
    let Some(start) = find_assignment(env, key) else {
        return match value {
            EnvValue::Unset => env.to_owned(),
            EnvValue::Set(v) => format!("{env}\n{key}={v}\n"),
        };
    };

    // End of the matched line, including its newline if present.
    let end = env[start..]
        .find('\n')
        .map_or(env.len(), |i| start + i + 1);

    match value {
        EnvValue::Unset => format!("{}{}", &env[..start], &env[end..]),
        EnvValue::Set(v) => format!("{}{key}={v}\n{}", &env[..start], &env[end..]),
    }
}

/// Byte offset of the first line starting with `KEY=`, if any.
fn find_assignment(env: &str, key: &str) -> Option<usize> {
    let needle = format!("{key}=");
    let mut from = 0;
    while let Some(found) = env[from..].find(&needle) {
        let at = from + found;
        if at == 0 || env.as_bytes()[at - 1] == b'\n' {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}
