//! Callable function extraction

use crate::error::ParseError;
use crate::guards::{ModifierInvocation, RoleGuardStrategy, RoleRequirement};
use crate::natspec::notice_for;
use crate::syntax::{children, ContractDecl, ParsedSource};
use crate::types::TypeResolver;
use indexmap::IndexMap;
use std::collections::HashSet;
use tree_sitter::Node;

/// A state-changing entry point found in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractFunction {
    /// Declared name (`constructor`, `fallback`, `receive` for special forms)
    pub name: String,
    /// Canonical signature (`newPayment(address,uint256)`)
    pub signature: String,
    /// Roles required by the function's guards, first use first
    pub roles: Vec<RoleRequirement>,
    pub notice: Option<String>,
    /// Contract that declares the function
    pub contract: String,
}

impl ContractFunction {
    /// Role ids only
    pub fn role_ids(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|r| r.id.as_str())
    }
}

/// Options for [`extract`](crate::ContractIntrospector::extract)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Skip functions inherited from base contracts
    pub only_target_contract: bool,
}

impl ExtractOptions {
    #[must_use]
    pub fn only_target() -> Self {
        Self {
            only_target_contract: true,
        }
    }
}

pub(crate) fn extract_functions(
    parsed: &ParsedSource<'_>,
    target: &str,
    options: ExtractOptions,
    guards: &dyn RoleGuardStrategy,
) -> Result<Vec<ContractFunction>, ParseError> {
    let contracts = parsed.contracts();
    if !contracts.contains_key(target) {
        return Err(ParseError::ContractNotFound(target.to_string()));
    }

    let order = if options.only_target_contract {
        vec![target]
    } else {
        linearize(&contracts, target)
    };

    let resolver = TypeResolver::from_source(parsed);
    let mut seen = HashSet::new();
    let mut functions = Vec::new();

    for name in order {
        let Some(contract) = contracts.get(name) else {
            continue;
        };
        for member in contract.members() {
            let Some(function) = describe(parsed, &resolver, guards, contract, member) else {
                continue;
            };
            // Overrides in derived contracts shadow base declarations
            if seen.insert(function.signature.clone()) {
                functions.push(function);
            }
        }
    }

    Ok(functions)
}

/// Target first, then bases depth-first, each contract once
fn linearize<'s>(contracts: &IndexMap<&'s str, ContractDecl<'_, 's>>, target: &'s str) -> Vec<&'s str> {
    fn visit<'s>(
        contracts: &IndexMap<&'s str, ContractDecl<'_, 's>>,
        name: &'s str,
        out: &mut Vec<&'s str>,
    ) {
        if out.contains(&name) {
            return;
        }
        out.push(name);
        if let Some(contract) = contracts.get(name) {
            for &base in &contract.bases {
                visit(contracts, base, out);
            }
        }
    }

    let mut out = Vec::new();
    visit(contracts, target, &mut out);
    out
}

fn describe(
    parsed: &ParsedSource<'_>,
    resolver: &TypeResolver,
    guards: &dyn RoleGuardStrategy,
    contract: &ContractDecl<'_, '_>,
    node: Node<'_>,
) -> Option<ContractFunction> {
    let name = match node.kind() {
        "function_definition" if is_state_changing_entry(parsed, node) => {
            parsed.field_text(node, "name").to_string()
        }
        "constructor_definition" => "constructor".to_string(),
        "fallback_receive_definition" => {
            if children(node).any(|c| c.kind() == "receive") {
                "receive".to_string()
            } else {
                "fallback".to_string()
            }
        }
        _ => return None,
    };

    let params: Vec<String> = children(node)
        .filter(|c| c.kind() == "parameter")
        .map(|p| resolver.canonical(parsed.field_text(p, "type")))
        .collect();

    let mut roles: Vec<RoleRequirement> = Vec::new();
    for invocation in children(node).filter(|c| c.kind() == "modifier_invocation") {
        for role in guards.roles(&ModifierInvocation::parse(parsed.text(invocation))) {
            if !roles.iter().any(|r| r.id == role.id) {
                roles.push(role);
            }
        }
    }

    Some(ContractFunction {
        signature: format!("{}({})", name, params.join(",")),
        name,
        roles,
        notice: notice_for(parsed, node),
        contract: contract.name.to_string(),
    })
}

/// Public or external (or unmarked), and neither `view` nor `pure`
fn is_state_changing_entry(parsed: &ParsedSource<'_>, node: Node<'_>) -> bool {
    let mut visible = true;
    let mut mutating = true;
    for child in children(node) {
        match child.kind() {
            "visibility" => visible = matches!(parsed.text(child), "public" | "external"),
            "state_mutability" => {
                mutating = !matches!(parsed.text(child), "view" | "pure" | "constant");
            }
            _ => {}
        }
    }
    visible && mutating
}
