//! Text outline parser
//!
//! Turns an indented outline into draft nodes:
//!
//! ```text
//! Feature: Checkout
//! -User Story: Pay by card
//! --Task: Card form
//! -Bug: Total rounds wrong
//! ```
//!
//! Leading dashes give the depth. Each line may only be one level deeper
//! than the line before it. Type names match the configured rules
//! case-insensitively.
//!
//! Hard errors make `success` false. Structural errors (an indented first
//! line, a skipped level) leave the outline's shape untrustworthy, so no
//! nodes are returned. Content errors (missing `:`, empty title, unknown
//! type) drop just that line and anything nested under it. Parent/child
//! rule mismatches are only warnings.

mod render;

pub use render::render_outline;

use serde::Serialize;
use tracing::debug;

use crate::domain::{PathContext, TypeName, WorkItemNode};
use crate::rules::TypeRules;

/// A diagnostic tied to a 1-based line number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    pub line: usize,
    pub message: String,
}

impl ParseIssue {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

/// Outcome of parsing an outline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    /// True iff there were no hard errors
    pub success: bool,
    /// Whatever nodes could be built, possibly partial
    pub nodes: Vec<WorkItemNode>,
    pub errors: Vec<ParseIssue>,
    pub warnings: Vec<ParseIssue>,
}

/// An entry on the open-ancestor stack
enum Open {
    Node { depth: usize, node: WorkItemNode },
    /// A line that could not be turned into a node; `origin` is the line
    /// whose error caused it to be dropped
    Dropped { depth: usize, origin: usize },
}

impl Open {
    fn depth(&self) -> usize {
        match self {
            Open::Node { depth, .. } | Open::Dropped { depth, .. } => *depth,
        }
    }
}

/// Parser bound to a set of type rules
pub struct TextHierarchyParser<'a> {
    rules: &'a TypeRules,
}

impl<'a> TextHierarchyParser<'a> {
    pub fn new(rules: &'a TypeRules) -> Self {
        Self { rules }
    }

    /// Parse an outline
    ///
    /// `path_context` is copied onto every node. `root_type` is the type of
    /// the item being decomposed; root-level lines are checked against it.
    pub fn parse(&self, text: &str, path_context: Option<&PathContext>, root_type: Option<&TypeName>) -> ParseResult {
        debug!(bytes = text.len(), ?root_type, "TextHierarchyParser::parse: called");
        let path = path_context.cloned().unwrap_or_default();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut roots = Vec::new();
        let mut stack: Vec<Open> = Vec::new();
        let mut prev_depth: Option<usize> = None;
        let mut structural_error = false;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            let depth = trimmed.chars().take_while(|c| *c == '-').count();
            let rest = trimmed[depth..].trim();

            match prev_depth {
                None if depth > 0 => {
                    errors.push(ParseIssue::new(line, "First item must be at the root level (no leading dashes)"));
                    structural_error = true;
                }
                Some(prev) if depth > prev + 1 => {
                    errors.push(ParseIssue::new(
                        line,
                        format!(
                            "Depth jumps from {} to {}; each line may only be one dash deeper than the line above",
                            prev, depth
                        ),
                    ));
                    structural_error = true;
                }
                _ => {}
            }
            prev_depth = Some(depth);

            while stack.last().is_some_and(|open| open.depth() >= depth) {
                close_top(&mut stack, &mut roots);
            }

            let (item_type, title) = match self.parse_content(rest) {
                Ok(parsed) => parsed,
                Err(message) => {
                    errors.push(ParseIssue::new(line, message));
                    stack.push(Open::Dropped { depth, origin: line });
                    continue;
                }
            };

            let parent_type = match stack.last() {
                Some(Open::Dropped { origin, .. }) => {
                    let origin = *origin;
                    warnings.push(ParseIssue::new(
                        line,
                        format!("Skipped because line {} above it could not be parsed", origin),
                    ));
                    stack.push(Open::Dropped { depth, origin });
                    continue;
                }
                Some(Open::Node { node, .. }) => Some(node.item_type.clone()),
                None => root_type.cloned(),
            };

            if let Some(parent_type) = parent_type
                && !self.rules.can_be_child_of(&item_type, &parent_type)
            {
                let allowed = self.rules.child_types_for(&parent_type);
                warnings.push(ParseIssue::new(
                    line,
                    format!(
                        "{} is not a valid child of {} (allowed: {})",
                        item_type,
                        parent_type,
                        join_or_none(&allowed)
                    ),
                ));
            }

            let node = WorkItemNode::new(item_type, Some(title), path.clone());
            stack.push(Open::Node { depth, node });
        }

        while !stack.is_empty() {
            close_top(&mut stack, &mut roots);
        }

        if structural_error {
            roots.clear();
        }

        debug!(
            roots = roots.len(),
            errors = errors.len(),
            warnings = warnings.len(),
            "TextHierarchyParser::parse: complete"
        );
        ParseResult {
            success: errors.is_empty(),
            nodes: roots,
            errors,
            warnings,
        }
    }

    /// Split `Type: Title` and validate both halves
    fn parse_content(&self, rest: &str) -> Result<(TypeName, String), String> {
        let Some((raw_type, raw_title)) = rest.split_once(':') else {
            return Err(format!("Missing ':' between type and title in \"{}\"", rest));
        };
        let raw_type = raw_type.trim();
        let title = raw_title.trim();
        if raw_type.is_empty() {
            return Err("Missing type before ':'".to_string());
        }
        let Some(item_type) = self.rules.resolve_type_name(raw_type) else {
            let valid: Vec<TypeName> = self.rules.type_names().into_iter().cloned().collect();
            return Err(format!("Unknown type '{}'. Valid types: {}", raw_type, join_or_none(&valid)));
        };
        if title.is_empty() {
            return Err(format!("Title is empty for {}", item_type));
        }
        Ok((item_type.clone(), title.to_string()))
    }
}

/// Parse an outline with the given rules
pub fn parse_work_item_text(
    text: &str,
    rules: &TypeRules,
    path_context: Option<&PathContext>,
    root_type: Option<&TypeName>,
) -> ParseResult {
    TextHierarchyParser::new(rules).parse(text, path_context, root_type)
}

/// Pop the top of the stack, attaching it to its parent or the roots
fn close_top(stack: &mut Vec<Open>, roots: &mut Vec<WorkItemNode>) {
    let Some(Open::Node { mut node, .. }) = stack.pop() else {
        return;
    };
    match stack.last_mut() {
        Some(Open::Node { node: parent, .. }) => {
            node.parent_id = Some(parent.id.clone());
            parent.children.push(node);
        }
        // Nodes never open under a dropped line
        Some(Open::Dropped { .. }) => {}
        None => roots.push(node),
    }
}

fn join_or_none(types: &[TypeName]) -> String {
    if types.is_empty() {
        "none".to_string()
    } else {
        types.iter().map(TypeName::as_str).collect::<Vec<_>>().join(", ")
    }
}
