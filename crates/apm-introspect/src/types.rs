//! Canonical ABI type names for Solidity parameter types

use crate::syntax::{children, descendants, last_segment, ParsedSource};
use std::collections::{HashMap, HashSet};

/// Struct nesting beyond this is left unexpanded
const MAX_STRUCT_DEPTH: usize = 16;

/// User-defined names declared in one source file
#[derive(Debug, Default)]
pub(crate) struct TypeResolver {
    structs: HashMap<String, Vec<String>>,
    enums: HashSet<String>,
    contracts: HashSet<String>,
    aliases: HashMap<String, String>,
}

impl TypeResolver {
    pub(crate) fn from_source(parsed: &ParsedSource<'_>) -> Self {
        let mut resolver = Self::default();

        for node in descendants(parsed.root()) {
            match node.kind() {
                "struct_declaration" => {
                    let members = node
                        .child_by_field_name("body")
                        .into_iter()
                        .flat_map(children)
                        .filter(|m| m.kind() == "struct_member")
                        .map(|m| parsed.field_text(m, "type").to_string())
                        .collect();
                    resolver
                        .structs
                        .insert(parsed.field_text(node, "name").to_string(), members);
                }
                "enum_declaration" => {
                    resolver
                        .enums
                        .insert(parsed.field_text(node, "name").to_string());
                }
                "contract_declaration" | "interface_declaration" | "library_declaration" => {
                    resolver
                        .contracts
                        .insert(parsed.field_text(node, "name").to_string());
                }
                "user_defined_type_definition" => {
                    // type Price is uint128;
                    let text = parsed.text(node).trim_end_matches(';');
                    let mut words = text.split_whitespace().skip(1);
                    if let (Some(name), Some("is"), Some(underlying)) =
                        (words.next(), words.next(), words.next())
                    {
                        resolver
                            .aliases
                            .insert(name.to_string(), underlying.to_string());
                    }
                }
                _ => {}
            }
        }

        resolver
    }

    /// Canonical ABI form of a declared type (`uint` → `uint256`,
    /// `Config[]` → `(address,uint64)[]`)
    pub(crate) fn canonical(&self, declared: &str) -> String {
        self.canonical_at(declared, 0)
    }

    fn canonical_at(&self, declared: &str, depth: usize) -> String {
        let compact = declared.split_whitespace().collect::<Vec<_>>().join(" ");
        let (base, suffix) = match compact.find('[') {
            Some(i) => (compact[..i].trim(), compact[i..].replace(' ', "")),
            None => (compact.as_str(), String::new()),
        };

        format!("{}{}", self.canonical_base(base, depth), suffix)
    }

    fn canonical_base(&self, base: &str, depth: usize) -> String {
        match base {
            "uint" => return "uint256".to_string(),
            "int" => return "int256".to_string(),
            "byte" => return "bytes1".to_string(),
            "fixed" => return "fixed128x18".to_string(),
            "ufixed" => return "ufixed128x18".to_string(),
            "address payable" => return "address".to_string(),
            _ => {}
        }
        if base.starts_with("function") {
            return "function".to_string();
        }

        let name = last_segment(base);
        if let Some(members) = self.structs.get(name) {
            if depth < MAX_STRUCT_DEPTH {
                let inner: Vec<String> = members
                    .iter()
                    .map(|m| self.canonical_at(m, depth + 1))
                    .collect();
                return format!("({})", inner.join(","));
            }
        }
        if self.enums.contains(name) {
            return "uint8".to_string();
        }
        if self.contracts.contains(name) {
            return "address".to_string();
        }
        if let Some(underlying) = self.aliases.get(name) {
            return self.canonical_at(underlying, depth + 1);
        }

        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r"
        pragma solidity ^0.8.0;
        interface IERC20 {}
        type Price is uint128;
        contract Shop {
            enum Status { Open, Closed }
            struct Item { address seller; uint price; Status status; }
            struct Order { Item[] items; bytes32 id; }
        }
    ";

    fn resolver() -> TypeResolver {
        let parsed = ParsedSource::parse(SOURCE).unwrap();
        TypeResolver::from_source(&parsed)
    }

    #[test]
    fn elementary_aliases_expand() {
        let r = resolver();
        assert_eq!(r.canonical("uint"), "uint256");
        assert_eq!(r.canonical("int[]"), "int256[]");
        assert_eq!(r.canonical("byte"), "bytes1");
        assert_eq!(r.canonical("address payable"), "address");
        assert_eq!(r.canonical("bytes32"), "bytes32");
        assert_eq!(r.canonical("uint8[ 3 ]"), "uint8[3]");
    }

    #[test]
    fn user_types_resolve() {
        let r = resolver();
        assert_eq!(r.canonical("IERC20"), "address");
        assert_eq!(r.canonical("Shop.Status"), "uint8");
        assert_eq!(r.canonical("Price"), "uint128");
        assert_eq!(r.canonical("Item"), "(address,uint256,uint8)");
        assert_eq!(r.canonical("Order[2]"), "((address,uint256,uint8)[],bytes32)[2]");
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(resolver().canonical("Imported"), "Imported");
    }
}
