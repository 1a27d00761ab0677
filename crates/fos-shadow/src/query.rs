//! Logical Tree Queries
//!
//! Element queries walk logical children only, so light children of a host
//! are found where they were authored, not where a slot rendered them.
//! Selectors cover compound selectors (type, `#id`, `.class`, attribute
//! matchers) joined into comma-separated groups; combinators are rejected.

use std::iter::Peekable;
use std::str::Chars;

use crate::node::{ElementData, Node};
use crate::tree::ShadowTree;
use crate::{DomError, DomResult, NodeId};

/// A component of a compound selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorComponent {
    /// Universal selector *
    Universal,
    /// Type selector (local name, lowercase)
    Type(String),
    /// ID selector #id
    Id(String),
    /// Class selector .class
    Class(String),
    /// Attribute selector [attr], [attr=value], etc.
    Attribute(AttributeSelector),
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeMatcher {
    /// [attr=value] - exact match
    Exact(String),
    /// [attr~=value] - whitespace-separated list contains
    Contains(String),
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch(String),
    /// [attr^=value] - starts with
    Prefix(String),
    /// [attr$=value] - ends with
    Suffix(String),
    /// [attr*=value] - contains substring
    Substring(String),
}

impl AttributeSelector {
    /// Check if an attribute value matches
    pub fn matches(&self, value: Option<&str>) -> bool {
        let (Some(matcher), Some(value)) = (&self.matcher, value) else {
            return self.matcher.is_none() && value.is_some();
        };
        let fold = |s: &str| {
            if self.case_insensitive {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };
        let value = fold(value);
        match matcher {
            AttributeMatcher::Exact(expected) => value == fold(expected),
            AttributeMatcher::Contains(expected) => {
                let expected = fold(expected);
                value.split_whitespace().any(|w| w == expected)
            }
            AttributeMatcher::DashMatch(expected) => {
                let expected = fold(expected);
                value == expected || value.starts_with(&format!("{expected}-"))
            }
            AttributeMatcher::Prefix(expected) => {
                !expected.is_empty() && value.starts_with(&fold(expected))
            }
            AttributeMatcher::Suffix(expected) => {
                !expected.is_empty() && value.ends_with(&fold(expected))
            }
            AttributeMatcher::Substring(expected) => {
                !expected.is_empty() && value.contains(&fold(expected))
            }
        }
    }
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Comma-separated compound selectors
    pub groups: Vec<Vec<SelectorComponent>>,
}

impl Selector {
    /// Parse a selector list
    pub fn parse(input: &str) -> DomResult<Self> {
        let invalid = || DomError::InvalidSelector(input.to_string());
        let mut groups = Vec::new();
        let mut chars = input.chars().peekable();
        loop {
            skip_whitespace(&mut chars);
            let compound = parse_compound(&mut chars).ok_or_else(invalid)?;
            skip_whitespace(&mut chars);
            groups.push(compound);
            match chars.next() {
                None => break,
                Some(',') => continue,
                // whitespace or an explicit combinator between compounds
                Some(_) => return Err(invalid()),
            }
        }
        Ok(Self { groups })
    }

    /// Check if any group matches the element
    pub fn matches(&self, element: &ElementData) -> bool {
        self.groups
            .iter()
            .any(|group| group.iter().all(|c| match_component(c, element)))
    }
}

/// Match a selector component against an element
pub fn match_component(component: &SelectorComponent, element: &ElementData) -> bool {
    match component {
        SelectorComponent::Universal => true,
        SelectorComponent::Type(tag) => element.name.eq_ignore_ascii_case(tag),
        SelectorComponent::Id(id) => element.id() == Some(id.as_str()),
        SelectorComponent::Class(class) => element.classes().any(|c| c == class),
        SelectorComponent::Attribute(attr) => attr.matches(element.get_attr(&attr.name)),
    }
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn parse_ident(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut ident = String::new();
    while let Some(c) = chars.next_if(|&c| is_ident_char(c)) {
        ident.push(c);
    }
    (!ident.is_empty()).then_some(ident)
}

fn parse_compound(chars: &mut Peekable<Chars<'_>>) -> Option<Vec<SelectorComponent>> {
    let mut components = Vec::new();
    while let Some(&c) = chars.peek() {
        let component = match c {
            '*' => {
                chars.next();
                SelectorComponent::Universal
            }
            '#' => {
                chars.next();
                SelectorComponent::Id(parse_ident(chars)?)
            }
            '.' => {
                chars.next();
                SelectorComponent::Class(parse_ident(chars)?)
            }
            '[' => {
                chars.next();
                SelectorComponent::Attribute(parse_attribute(chars)?)
            }
            c if is_ident_char(c) => {
                SelectorComponent::Type(parse_ident(chars)?.to_ascii_lowercase())
            }
            _ => break,
        };
        components.push(component);
    }
    (!components.is_empty()).then_some(components)
}

/// Parse the inside of `[...]`, consuming the closing bracket.
fn parse_attribute(chars: &mut Peekable<Chars<'_>>) -> Option<AttributeSelector> {
    skip_whitespace(chars);
    let name = parse_ident(chars)?;
    skip_whitespace(chars);

    let op = match chars.next()? {
        ']' => {
            return Some(AttributeSelector {
                name,
                matcher: None,
                case_insensitive: false,
            });
        }
        '=' => None,
        op @ ('~' | '|' | '^' | '$' | '*') => {
            chars.next_if_eq(&'=')?;
            Some(op)
        }
        _ => return None,
    };

    skip_whitespace(chars);
    let value = match chars.peek().copied()? {
        quote @ ('"' | '\'') => {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next()? {
                    c if c == quote => break,
                    c => value.push(c),
                }
            }
            value
        }
        _ => parse_ident(chars)?,
    };
    skip_whitespace(chars);

    let case_insensitive = chars.next_if(|&c| matches!(c, 'i' | 'I')).is_some();
    if !case_insensitive {
        chars.next_if(|&c| matches!(c, 's' | 'S'));
    }
    skip_whitespace(chars);
    chars.next_if_eq(&']')?;

    let matcher = match op {
        None => AttributeMatcher::Exact(value),
        Some('~') => AttributeMatcher::Contains(value),
        Some('|') => AttributeMatcher::DashMatch(value),
        Some('^') => AttributeMatcher::Prefix(value),
        Some('$') => AttributeMatcher::Suffix(value),
        Some(_) => AttributeMatcher::Substring(value),
    };
    Some(AttributeSelector {
        name,
        matcher: Some(matcher),
        case_insensitive,
    })
}

impl ShadowTree {
    /// Collect logical element descendants of `node` accepted by `matcher`,
    /// in tree order. With `halt_on_first` the walk stops at the first hit.
    pub fn query<F>(&self, node: NodeId, mut matcher: F, halt_on_first: bool) -> Vec<NodeId>
    where
        F: FnMut(NodeId, &Node) -> bool,
    {
        let mut found = Vec::new();
        self.query_elements(node, &mut matcher, halt_on_first, &mut found);
        found
    }

    /// Returns true once the walk must halt.
    fn query_elements<F>(
        &self,
        parent: NodeId,
        matcher: &mut F,
        halt_on_first: bool,
        found: &mut Vec<NodeId>,
    ) -> bool
    where
        F: FnMut(NodeId, &Node) -> bool,
    {
        for child in self.child_nodes(parent) {
            let Some(node) = self.get(child).filter(|n| n.is_element()) else {
                continue;
            };
            if matcher(child, node) {
                found.push(child);
                if halt_on_first {
                    return true;
                }
            }
            if self.query_elements(child, matcher, halt_on_first, found) {
                return true;
            }
        }
        false
    }

    /// First logical descendant element matching `selector`
    pub fn query_selector(&self, node: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
        let selector = Selector::parse(selector)?;
        Ok(self.select(node, &selector, true).into_iter().next())
    }

    /// All logical descendant elements matching `selector`
    pub fn query_selector_all(&self, node: NodeId, selector: &str) -> DomResult<Vec<NodeId>> {
        let selector = Selector::parse(selector)?;
        Ok(self.select(node, &selector, false))
    }

    fn select(&self, node: NodeId, selector: &Selector, halt_on_first: bool) -> Vec<NodeId> {
        self.query(
            node,
            |_, n| n.as_element().is_some_and(|e| selector.matches(e)),
            halt_on_first,
        )
    }
}
