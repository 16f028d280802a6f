//! Permission-role extraction from authorization guards
//!
//! Which guard syntax denotes a role requirement is project convention, so
//! recognition sits behind [`RoleGuardStrategy`]. The default,
//! [`AuthModifierGuards`], understands the `auth`/`authP` modifiers of
//! Aragon-style apps and the `onlyRole` modifier of OpenZeppelin's
//! `AccessControl`.

use std::fmt::Debug;

/// A role a function requires before executing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleRequirement {
    /// Role identifier as written in source (`CREATE_PAYMENTS_ROLE`)
    pub id: String,
    /// Number of permission parameters the guard passes, when knowable
    pub param_count: Option<usize>,
}

impl RoleRequirement {
    #[must_use]
    pub fn new(id: impl Into<String>, param_count: Option<usize>) -> Self {
        Self {
            id: id.into(),
            param_count,
        }
    }
}

/// A modifier applied to a function: `authP(ROLE, arr(a, b))`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierInvocation<'a> {
    pub name: &'a str,
    /// Top-level arguments, trimmed
    pub args: Vec<&'a str>,
}

impl<'a> ModifierInvocation<'a> {
    /// Split invocation text into name and top-level arguments
    #[must_use]
    pub fn parse(text: &'a str) -> Self {
        let text = text.trim();
        match text.find('(') {
            Some(open) => {
                let inner = text[open + 1..].strip_suffix(')').unwrap_or(&text[open + 1..]);
                Self {
                    name: text[..open].trim(),
                    args: split_arguments(inner),
                }
            }
            None => Self {
                name: text,
                args: Vec::new(),
            },
        }
    }
}

/// Recognizes role requirements in modifier invocations
pub trait RoleGuardStrategy: Send + Sync + Debug {
    /// Roles required by one modifier invocation (usually zero or one)
    fn roles(&self, invocation: &ModifierInvocation<'_>) -> Vec<RoleRequirement>;
}

/// `auth(ROLE)`, `authP(ROLE, arr(...))` and `onlyRole(ROLE)`
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthModifierGuards;

impl RoleGuardStrategy for AuthModifierGuards {
    fn roles(&self, invocation: &ModifierInvocation<'_>) -> Vec<RoleRequirement> {
        let Some(role) = invocation.args.first().copied().filter(|a| is_identifier_path(a)) else {
            return Vec::new();
        };
        let id = role.rsplit('.').next().unwrap_or(role);

        let param_count = match invocation.name {
            "auth" => Some(0),
            "authP" => invocation.args.get(1).and_then(|params| arr_arity(params)),
            "onlyRole" => None,
            _ => return Vec::new(),
        };

        vec![RoleRequirement::new(id, param_count)]
    }
}

/// Arity of an `arr(...)` parameter builder, `None` for anything else
fn arr_arity(expr: &str) -> Option<usize> {
    let inner = expr.trim().strip_prefix("arr")?.trim_start();
    let inner = inner.strip_prefix('(')?.strip_suffix(')')?;
    Some(split_arguments(inner).len())
}

fn is_identifier_path(text: &str) -> bool {
    !text.is_empty()
        && text
            .split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// Comma-split at nesting depth zero; empty input yields no arguments
pub(crate) fn split_arguments(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut quote: Option<char> = None;

    for (i, c) in inner.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth -= 1,
            (None, ',') if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(text: &str) -> Vec<RoleRequirement> {
        AuthModifierGuards.roles(&ModifierInvocation::parse(text))
    }

    #[test]
    fn parses_invocation_text() {
        let inv = ModifierInvocation::parse("authP(ROLE, arr(_a, uint256(_b)))");
        assert_eq!(inv.name, "authP");
        assert_eq!(inv.args, vec!["ROLE", "arr(_a, uint256(_b))"]);
        assert_eq!(ModifierInvocation::parse("isInitialized").args.len(), 0);
    }

    #[test]
    fn auth_has_no_params() {
        assert_eq!(roles("auth(MANAGE_ROLE)"), vec![RoleRequirement::new("MANAGE_ROLE", Some(0))]);
    }

    #[test]
    fn auth_p_counts_arr_arguments() {
        assert_eq!(
            roles("authP(CREATE_PAYMENTS_ROLE, arr(_token, _receiver, _amount))"),
            vec![RoleRequirement::new("CREATE_PAYMENTS_ROLE", Some(3))]
        );
        assert_eq!(roles("authP(R, arr())")[0].param_count, Some(0));
        assert_eq!(roles("authP(R, params)")[0].param_count, None);
    }

    #[test]
    fn only_role_has_unknown_params() {
        assert_eq!(roles("onlyRole(Roles.MINTER_ROLE)"), vec![RoleRequirement::new("MINTER_ROLE", None)]);
    }

    #[test]
    fn other_modifiers_and_expressions_are_ignored() {
        assert!(roles("nonReentrant").is_empty());
        assert!(roles("onlyOwner()").is_empty());
        assert!(roles("auth(keccak256(\"X\"))").is_empty());
    }

    #[test]
    fn split_respects_nesting_and_strings() {
        assert_eq!(split_arguments("a, f(b, c), \"x,y\""), vec!["a", "f(b, c)", "\"x,y\""]);
        assert!(split_arguments("  ").is_empty());
    }
}
