//! Selector engine - locate descendants of a node.
//!
//! Supported grammar:
//!
//! ```text
//! selector  := group ("," group)*
//! group     := compound (combinator compound)* filter?
//! combinator:= " " | ">"
//! compound  := (tag | "*")? ("#" id | "." class | "[" attr ("=" value)? "]")*
//! filter    := ":first" | ":last"
//! ```
//!
//! Ancestor steps only consider nodes inside the search root, so
//! `root.find("ul li")` never matches through a `ul` above `root`.
//! `:first`/`:last` narrow the matched set of their group to one node.

use std::collections::BTreeSet;

use super::node::NodeRef;
use crate::error::SelectorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SetFilter {
    First,
    Last,
}

#[derive(Clone, Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, node: &NodeRef) -> bool {
        let Some(tag) = node.tag() else {
            return false;
        };
        if self.tag.as_ref().is_some_and(|t| *t != tag) {
            return false;
        }
        if self.id.is_some() && node.id() != self.id {
            return false;
        }
        if !self.classes.is_empty() {
            let classes = node.classes();
            if !self.classes.iter().all(|c| classes.contains(c)) {
                return false;
            }
        }
        self.attributes.iter().all(|(name, expected)| match node.attr(name) {
            None => false,
            Some(actual) => expected.as_ref().is_none_or(|e| *e == actual),
        })
    }
}

#[derive(Clone, Debug)]
struct Group {
    /// Each step is joined to the previous one by its combinator; the first
    /// step's combinator is unused.
    steps: Vec<(Combinator, Compound)>,
    filter: Option<SetFilter>,
}

/// A parsed selector.
#[derive(Clone, Debug)]
pub struct Selector {
    groups: Vec<Group>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let fail = |message: &str| SelectorError {
            selector: source.to_string(),
            message: message.to_string(),
        };

        let groups = source
            .split(',')
            .map(|group| parse_group(group.trim()).map_err(|m| fail(&m)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups })
    }

    /// Matching descendants of `root`, in document order, without duplicates.
    pub fn find(&self, root: &NodeRef) -> Vec<NodeRef> {
        let descendants = root.descendants();
        let mut hits = BTreeSet::new();

        for group in &self.groups {
            let matched: Vec<usize> = descendants
                .iter()
                .enumerate()
                .filter(|(_, node)| match_step(node, &group.steps, group.steps.len() - 1, root))
                .map(|(index, _)| index)
                .collect();

            let narrowed = match group.filter {
                None => matched,
                Some(SetFilter::First) => matched.first().copied().into_iter().collect(),
                Some(SetFilter::Last) => matched.last().copied().into_iter().collect(),
            };
            hits.extend(narrowed);
        }

        hits.into_iter().map(|i| descendants[i].clone()).collect()
    }
}

fn match_step(node: &NodeRef, steps: &[(Combinator, Compound)], index: usize, root: &NodeRef) -> bool {
    let (combinator, compound) = &steps[index];
    if !compound.matches(node) {
        return false;
    }
    if index == 0 {
        return true;
    }

    match combinator {
        Combinator::Child => node
            .parent()
            .filter(|parent| !parent.ptr_eq(root))
            .is_some_and(|parent| match_step(&parent, steps, index - 1, root)),
        Combinator::Descendant => {
            let mut current = node.parent();
            while let Some(ancestor) = current {
                if ancestor.ptr_eq(root) {
                    return false;
                }
                if match_step(&ancestor, steps, index - 1, root) {
                    return true;
                }
                current = ancestor.parent();
            }
            false
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], pos: &mut usize) -> Result<String, String> {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    if start == *pos {
        return Err(format!("expected a name at position {start}"));
    }
    Ok(chars[start..*pos].iter().collect())
}

fn parse_group(source: &str) -> Result<Group, String> {
    if source.is_empty() {
        return Err("empty selector".to_string());
    }

    let chars: Vec<char> = source.chars().collect();
    let mut pos = 0;
    let mut steps = Vec::new();
    let mut filter = None;
    let mut combinator = Combinator::Descendant;

    while pos < chars.len() {
        if filter.is_some() {
            return Err(":first/:last must end the selector".to_string());
        }

        let mut saw_space = false;
        while pos < chars.len() && chars[pos].is_whitespace() {
            saw_space = true;
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }
        if chars[pos] == '>' {
            if steps.is_empty() {
                return Err("selector cannot start with '>'".to_string());
            }
            combinator = Combinator::Child;
            pos += 1;
            continue;
        }
        if saw_space && combinator != Combinator::Child {
            combinator = Combinator::Descendant;
        }

        let mut compound = Compound::default();
        let mut empty = true;

        if chars[pos] == '*' {
            pos += 1;
            empty = false;
        } else if chars[pos].is_ascii_alphabetic() {
            compound.tag = Some(take_ident(&chars, &mut pos)?.to_ascii_lowercase());
            empty = false;
        }

        while pos < chars.len() {
            match chars[pos] {
                '#' => {
                    pos += 1;
                    compound.id = Some(take_ident(&chars, &mut pos)?);
                }
                '.' => {
                    pos += 1;
                    compound.classes.push(take_ident(&chars, &mut pos)?);
                }
                '[' => {
                    pos += 1;
                    let name = take_ident(&chars, &mut pos)?.to_ascii_lowercase();
                    let value = if chars.get(pos) == Some(&'=') {
                        pos += 1;
                        Some(take_attribute_value(&chars, &mut pos)?)
                    } else {
                        None
                    };
                    if chars.get(pos) != Some(&']') {
                        return Err("unclosed attribute selector".to_string());
                    }
                    pos += 1;
                    compound.attributes.push((name, value));
                }
                ':' => {
                    pos += 1;
                    filter = Some(match take_ident(&chars, &mut pos)?.as_str() {
                        "first" => SetFilter::First,
                        "last" => SetFilter::Last,
                        other => return Err(format!("unsupported pseudo-class :{other}")),
                    });
                }
                c if c.is_whitespace() || c == '>' => break,
                c => return Err(format!("unexpected '{c}'")),
            }
            empty = false;
        }

        if empty {
            return Err("empty compound selector".to_string());
        }
        steps.push((combinator, compound));
        combinator = Combinator::Descendant;
    }

    if steps.is_empty() {
        return Err("empty selector".to_string());
    }
    if combinator == Combinator::Child {
        return Err("selector cannot end with '>'".to_string());
    }
    Ok(Group { steps, filter })
}

fn take_attribute_value(chars: &[char], pos: &mut usize) -> Result<String, String> {
    match chars.get(*pos) {
        Some(&quote) if quote == '"' || quote == '\'' => {
            *pos += 1;
            let start = *pos;
            while *pos < chars.len() && chars[*pos] != quote {
                *pos += 1;
            }
            if *pos >= chars.len() {
                return Err("unterminated attribute value".to_string());
            }
            let value = chars[start..*pos].iter().collect();
            *pos += 1;
            Ok(value)
        }
        _ => take_ident(chars, pos),
    }
}
