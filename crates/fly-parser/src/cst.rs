//! rowan bindings for the Flylang CST.

use crate::syntax_kind::SyntaxKind;

/// The rowan [`rowan::Language`] instance for Flylang.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlyLanguage {}

impl rowan::Language for FlyLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> SyntaxKind {
        SyntaxKind::from_raw(raw.0)
    }

    fn kind_to_raw(kind: SyntaxKind) -> rowan::SyntaxKind {
        rowan::SyntaxKind(kind as u16)
    }
}

pub type SyntaxNode = rowan::SyntaxNode<FlyLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<FlyLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<FlyLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<FlyLanguage>;

/// First child node of the given kind.
pub fn child_of_kind(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxNode> {
    node.children().find(|n| n.kind() == kind)
}

/// All child nodes of the given kind.
pub fn children_of_kind<'a>(
    node: &'a SyntaxNode,
    kind: SyntaxKind,
) -> impl Iterator<Item = SyntaxNode> + 'a {
    node.children().filter(move |n| n.kind() == kind)
}

/// First child token of the given kind.
pub fn token_of_kind(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == kind)
}

/// All child tokens of the given kind.
pub fn tokens_of_kind<'a>(
    node: &'a SyntaxNode,
    kind: SyntaxKind,
) -> impl Iterator<Item = SyntaxToken> + 'a {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(move |t| t.kind() == kind)
}
