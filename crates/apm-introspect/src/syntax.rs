//! Tree-sitter parsing of Solidity source

use crate::error::ParseError;
use indexmap::IndexMap;
use tree_sitter::{Node, Parser, Tree};

/// Node kinds that declare a contract-like scope
const CONTRACT_KINDS: &[&str] = &[
    "contract_declaration",
    "interface_declaration",
    "library_declaration",
];

/// A successfully parsed source file
///
/// Construction fails on any `ERROR` or `MISSING` node, so every tree held
/// here is complete.
pub(crate) struct ParsedSource<'s> {
    tree: Tree,
    source: &'s str,
}

impl<'s> ParsedSource<'s> {
    pub(crate) fn parse(source: &'s str) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_solidity::LANGUAGE.into())
            .map_err(|e| ParseError::ParserInit(e.to_string()))?;

        let tree = parser.parse(source, None).ok_or(ParseError::ParseFailed)?;
        let parsed = Self { tree, source };

        let root = parsed.root();
        if root.has_error() {
            return Err(parsed.first_error(root));
        }

        Ok(parsed)
    }

    pub(crate) fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub(crate) fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Text of a named field, empty when absent
    pub(crate) fn field_text(&self, node: Node<'_>, field: &str) -> &'s str {
        node.child_by_field_name(field)
            .map(|child| self.text(child))
            .unwrap_or("")
    }

    /// Every contract, interface and library, in declaration order
    pub(crate) fn contracts(&self) -> IndexMap<&'s str, ContractDecl<'_, 's>> {
        let mut contracts = IndexMap::new();
        for node in descendants(self.root()) {
            if !CONTRACT_KINDS.contains(&node.kind()) {
                continue;
            }
            let name = self.field_text(node, "name");
            let bases = children(node)
                .filter(|c| c.kind() == "inheritance_specifier")
                .map(|c| last_segment(self.field_text(c, "ancestor")))
                .collect();
            contracts
                .entry(name)
                .or_insert(ContractDecl { name, node, bases });
        }
        contracts
    }

    fn first_error(&self, root: Node<'_>) -> ParseError {
        let broken = descendants(root).find(|n| n.is_error() || n.is_missing());
        match broken {
            Some(node) if node.is_missing() => {
                ParseError::syntax(node.start_position(), format!("missing {}", node.kind()))
            }
            Some(node) => {
                let snippet: String = self.text(node).chars().take(32).collect();
                ParseError::syntax(node.start_position(), format!("unexpected '{snippet}'"))
            }
            None => ParseError::syntax(root.start_position(), "malformed source"),
        }
    }
}

/// A contract-like declaration
pub(crate) struct ContractDecl<'t, 's> {
    pub(crate) name: &'s str,
    pub(crate) node: Node<'t>,
    /// Direct base names, in `is A, B` order
    pub(crate) bases: Vec<&'s str>,
}

impl<'t> ContractDecl<'t, '_> {
    /// Direct members of the contract body
    pub(crate) fn members(&self) -> impl Iterator<Item = Node<'t>> {
        self.node
            .child_by_field_name("body")
            .into_iter()
            .flat_map(children)
    }
}

/// Direct children of a node
pub(crate) fn children(node: Node<'_>) -> impl Iterator<Item = Node<'_>> {
    (0..node.child_count()).filter_map(move |i| node.child(i))
}

/// Pre-order traversal of a subtree, `node` included
pub(crate) fn descendants(node: Node<'_>) -> impl Iterator<Item = Node<'_>> {
    let mut stack = vec![node];
    std::iter::from_fn(move || {
        let next = stack.pop()?;
        for i in (0..next.child_count()).rev() {
            if let Some(child) = next.child(i) {
                stack.push(child);
            }
        }
        Some(next)
    })
}

/// `Lib.Type` → `Type`
pub(crate) fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path).trim()
}
