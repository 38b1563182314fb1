//! XPath expression evaluation over the document tree.

use dom_query::NodeRef;

use super::ast::{Axis, BinaryOp, Expr, NodeTest, PathExpr, Step};
use crate::document::Document;
use crate::dom;

/// One member of a node-set: an element, a text node, or a synthesized
/// attribute node.
#[derive(Debug, Clone)]
pub(crate) enum NodeItem<'a> {
    Element(NodeRef<'a>),
    Text(NodeRef<'a>),
    Attr {
        owner: NodeRef<'a>,
        name: String,
        value: String,
    },
}

impl<'a> NodeItem<'a> {
    /// The XPath string-value of the node.
    pub(crate) fn string_value(&self) -> String {
        match self {
            NodeItem::Element(node) => dom::full_text(node),
            NodeItem::Text(node) => dom::text_content(node),
            NodeItem::Attr { value, .. } => value.clone(),
        }
    }
}

/// An XPath value.
#[derive(Debug, Clone)]
pub(crate) enum Value<'a> {
    Nodes(Vec<NodeItem<'a>>),
    Str(String),
    Num(f64),
    Bool(bool),
}

pub(crate) struct Evaluator<'a> {
    doc: &'a Document,
    context: NodeRef<'a>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(doc: &'a Document, context: NodeRef<'a>) -> Self {
        Self { doc, context }
    }

    /// Evaluate a parsed expression with the evaluator's context node.
    pub(crate) fn evaluate(&self, expr: &Expr) -> Result<Value<'a>, String> {
        let context = NodeItem::Element(self.context);
        self.eval(expr, &context, 1, 1)
    }

    fn eval(
        &self,
        expr: &Expr,
        context: &NodeItem<'a>,
        position: usize,
        size: usize,
    ) -> Result<Value<'a>, String> {
        match expr {
            Expr::Literal(text) => Ok(Value::Str(text.clone())),
            Expr::Number(number) => Ok(Value::Num(*number)),
            Expr::Negate(inner) => {
                let value = self.eval(inner, context, position, size)?;
                Ok(Value::Num(-to_number(&value)))
            }
            Expr::Binary(op, left, right) => {
                self.eval_binary(*op, left, right, context, position, size)
            }
            Expr::Union(left, right) => {
                let left = self.eval(left, context, position, size)?;
                let right = self.eval(right, context, position, size)?;
                match (left, right) {
                    (Value::Nodes(mut a), Value::Nodes(b)) => {
                        a.extend(b);
                        Ok(Value::Nodes(self.sorted_unique(a)))
                    }
                    _ => Err("union requires node-sets on both sides".to_string()),
                }
            }
            Expr::Path(path) => Ok(Value::Nodes(self.eval_path(path, context)?)),
            Expr::Call(name, args) => self.eval_call(name, args, context, position, size),
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        context: &NodeItem<'a>,
        position: usize,
        size: usize,
    ) -> Result<Value<'a>, String> {
        // Boolean operators short-circuit.
        if matches!(op, BinaryOp::Or | BinaryOp::And) {
            let left_bool = to_bool(&self.eval(left, context, position, size)?);
            let result = match op {
                BinaryOp::Or => left_bool || to_bool(&self.eval(right, context, position, size)?),
                _ => left_bool && to_bool(&self.eval(right, context, position, size)?),
            };
            return Ok(Value::Bool(result));
        }

        let lhs = self.eval(left, context, position, size)?;
        let rhs = self.eval(right, context, position, size)?;

        match op {
            BinaryOp::Eq => Ok(Value::Bool(compare_eq(&lhs, &rhs))),
            BinaryOp::NotEq => Ok(Value::Bool(!compare_eq(&lhs, &rhs))),
            BinaryOp::Lt => Ok(Value::Bool(compare_num(&lhs, &rhs, |a, b| a < b))),
            BinaryOp::LtEq => Ok(Value::Bool(compare_num(&lhs, &rhs, |a, b| a <= b))),
            BinaryOp::Gt => Ok(Value::Bool(compare_num(&lhs, &rhs, |a, b| a > b))),
            BinaryOp::GtEq => Ok(Value::Bool(compare_num(&lhs, &rhs, |a, b| a >= b))),
            BinaryOp::Add => Ok(Value::Num(to_number(&lhs) + to_number(&rhs))),
            BinaryOp::Sub => Ok(Value::Num(to_number(&lhs) - to_number(&rhs))),
            BinaryOp::Mul => Ok(Value::Num(to_number(&lhs) * to_number(&rhs))),
            BinaryOp::Div => Ok(Value::Num(to_number(&lhs) / to_number(&rhs))),
            BinaryOp::Mod => Ok(Value::Num(to_number(&lhs) % to_number(&rhs))),
            BinaryOp::Or | BinaryOp::And => unreachable!("handled above"),
        }
    }

    fn eval_call(
        &self,
        name: &str,
        args: &[Expr],
        context: &NodeItem<'a>,
        position: usize,
        size: usize,
    ) -> Result<Value<'a>, String> {
        let arg = |index: usize| -> Result<Value<'a>, String> {
            args.get(index)
                .map(|expr| self.eval(expr, context, position, size))
                .transpose()?
                .ok_or_else(|| format!("{name}() is missing argument {}", index + 1))
        };

        match name {
            "position" => Ok(Value::Num(position as f64)),
            "last" => Ok(Value::Num(size as f64)),
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "count" => match arg(0)? {
                Value::Nodes(nodes) => Ok(Value::Num(nodes.len() as f64)),
                _ => Err("count() requires a node-set".to_string()),
            },
            "not" => Ok(Value::Bool(!to_bool(&arg(0)?))),
            "contains" => {
                let haystack = to_string(&arg(0)?);
                let needle = to_string(&arg(1)?);
                Ok(Value::Bool(haystack.contains(&needle)))
            }
            "starts-with" => {
                let haystack = to_string(&arg(0)?);
                let prefix = to_string(&arg(1)?);
                Ok(Value::Bool(haystack.starts_with(&prefix)))
            }
            "string" => {
                if args.is_empty() {
                    Ok(Value::Str(context.string_value()))
                } else {
                    Ok(Value::Str(to_string(&arg(0)?)))
                }
            }
            "number" => {
                if args.is_empty() {
                    Ok(Value::Num(parse_number(&context.string_value())))
                } else {
                    Ok(Value::Num(to_number(&arg(0)?)))
                }
            }
            "boolean" => Ok(Value::Bool(to_bool(&arg(0)?))),
            "normalize-space" => {
                let text = if args.is_empty() {
                    context.string_value()
                } else {
                    to_string(&arg(0)?)
                };
                Ok(Value::Str(
                    text.split_whitespace().collect::<Vec<_>>().join(" "),
                ))
            }
            "string-length" => {
                let text = if args.is_empty() {
                    context.string_value()
                } else {
                    to_string(&arg(0)?)
                };
                Ok(Value::Num(text.chars().count() as f64))
            }
            "concat" => {
                let mut out = String::new();
                for index in 0..args.len() {
                    out.push_str(&to_string(&arg(index)?));
                }
                Ok(Value::Str(out))
            }
            "name" => {
                let target = if args.is_empty() {
                    Some(context.clone())
                } else {
                    match arg(0)? {
                        Value::Nodes(nodes) => self.sorted_unique(nodes).into_iter().next(),
                        _ => None,
                    }
                };
                let name = match target {
                    Some(NodeItem::Element(node)) => dom::tag_name(&node).unwrap_or_default(),
                    Some(NodeItem::Attr { name, .. }) => name,
                    _ => String::new(),
                };
                Ok(Value::Str(name))
            }
            other => Err(format!("unsupported function {other}()")),
        }
    }

    fn eval_path(
        &self,
        path: &PathExpr,
        context: &NodeItem<'a>,
    ) -> Result<Vec<NodeItem<'a>>, String> {
        let mut current: Vec<NodeItem<'a>> = if path.absolute {
            vec![NodeItem::Element(self.doc.doc_node())]
        } else {
            vec![context.clone()]
        };

        if path.absolute && path.steps.is_empty() {
            // A lone `/`: hand back the root element.
            return Ok(vec![NodeItem::Element(self.doc.root().node())]);
        }

        for step in &path.steps {
            current = self.eval_step(step, &current)?;
            if current.is_empty() {
                break;
            }
        }
        Ok(current)
    }

    fn eval_step(
        &self,
        step: &Step,
        contexts: &[NodeItem<'a>],
    ) -> Result<Vec<NodeItem<'a>>, String> {
        let mut expanded: Vec<NodeItem<'a>> = Vec::new();
        if step.descendant {
            // `//` is descendant-or-self::node() before the step proper.
            for context in contexts {
                if let NodeItem::Element(node) = context {
                    expanded.push(context.clone());
                    for descendant in dom::descendant_nodes(node) {
                        if descendant.is_element() {
                            expanded.push(NodeItem::Element(descendant));
                        } else if descendant.is_text() {
                            expanded.push(NodeItem::Text(descendant));
                        }
                    }
                } else {
                    expanded.push(context.clone());
                }
            }
        } else {
            expanded.extend(contexts.iter().cloned());
        }

        let mut merged: Vec<NodeItem<'a>> = Vec::new();
        for context in &expanded {
            let mut candidates: Vec<NodeItem<'a>> = self
                .axis_candidates(step.axis, context)
                .into_iter()
                .filter(|item| test_matches(&step.test, item, step.axis))
                .collect();

            for predicate in &step.predicates {
                let size = candidates.len();
                let mut kept = Vec::new();
                for (index, item) in candidates.into_iter().enumerate() {
                    let value = self.eval(predicate, &item, index + 1, size)?;
                    let keep = match value {
                        Value::Num(wanted) => (index + 1) as f64 == wanted,
                        other => to_bool(&other),
                    };
                    if keep {
                        kept.push(item);
                    }
                }
                candidates = kept;
            }
            merged.extend(candidates);
        }

        Ok(self.sorted_unique(merged))
    }

    fn axis_candidates(&self, axis: Axis, context: &NodeItem<'a>) -> Vec<NodeItem<'a>> {
        match context {
            NodeItem::Element(node) => self.element_axis(axis, node),
            NodeItem::Text(node) => match axis {
                Axis::SelfAxis => vec![context.clone()],
                Axis::Parent => dom::parent_element(node)
                    .map(NodeItem::Element)
                    .into_iter()
                    .collect(),
                Axis::Ancestor => dom::ancestor_elements(node)
                    .into_iter()
                    .map(NodeItem::Element)
                    .collect(),
                Axis::FollowingSibling | Axis::PrecedingSibling => {
                    sibling_items(node, axis == Axis::FollowingSibling)
                }
                _ => Vec::new(),
            },
            NodeItem::Attr { owner, .. } => match axis {
                Axis::SelfAxis => vec![context.clone()],
                Axis::Parent => vec![NodeItem::Element(*owner)],
                Axis::Ancestor => {
                    let mut out = vec![NodeItem::Element(*owner)];
                    out.extend(
                        dom::ancestor_elements(owner)
                            .into_iter()
                            .map(NodeItem::Element),
                    );
                    out
                }
                _ => Vec::new(),
            },
        }
    }

    fn element_axis(&self, axis: Axis, node: &NodeRef<'a>) -> Vec<NodeItem<'a>> {
        match axis {
            Axis::Child => dom::child_nodes(node)
                .into_iter()
                .filter_map(node_item)
                .collect(),
            Axis::Descendant => dom::descendant_nodes(node)
                .into_iter()
                .filter_map(node_item)
                .collect(),
            Axis::DescendantOrSelf => {
                let mut out = vec![NodeItem::Element(*node)];
                out.extend(dom::descendant_nodes(node).into_iter().filter_map(node_item));
                out
            }
            Axis::SelfAxis => vec![NodeItem::Element(*node)],
            Axis::Parent => dom::parent_element(node)
                .map(NodeItem::Element)
                .into_iter()
                .collect(),
            Axis::Ancestor => dom::ancestor_elements(node)
                .into_iter()
                .map(NodeItem::Element)
                .collect(),
            Axis::Attribute => dom::attributes(node)
                .into_iter()
                .map(|(name, value)| NodeItem::Attr {
                    owner: *node,
                    name,
                    value,
                })
                .collect(),
            Axis::FollowingSibling | Axis::PrecedingSibling => {
                sibling_items(node, axis == Axis::FollowingSibling)
            }
        }
    }

    /// Sort into document order and drop duplicates.
    fn sorted_unique(&self, mut items: Vec<NodeItem<'a>>) -> Vec<NodeItem<'a>> {
        items.sort_by_key(|item| self.order_key(item));
        items.dedup_by_key(|item| self.order_key(item));
        items
    }

    fn order_key(&self, item: &NodeItem<'a>) -> (usize, usize) {
        match item {
            NodeItem::Element(node) | NodeItem::Text(node) => (self.doc.order_of(node.id), 0),
            NodeItem::Attr { owner, name, .. } => {
                let index = dom::attributes(owner)
                    .get_index_of(name.as_str())
                    .unwrap_or(0);
                (self.doc.order_of(owner.id), index + 1)
            }
        }
    }
}

fn node_item(node: NodeRef<'_>) -> Option<NodeItem<'_>> {
    if node.is_element() {
        Some(NodeItem::Element(node))
    } else if node.is_text() {
        Some(NodeItem::Text(node))
    } else {
        None
    }
}

fn sibling_items<'a>(node: &NodeRef<'a>, following: bool) -> Vec<NodeItem<'a>> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    let siblings = dom::child_nodes(&parent);
    let own_index = siblings.iter().position(|sibling| sibling.id == node.id);
    let Some(own_index) = own_index else {
        return Vec::new();
    };

    let picked: Vec<NodeRef<'a>> = if following {
        siblings[own_index + 1..].to_vec()
    } else {
        let mut before: Vec<NodeRef<'a>> = siblings[..own_index].to_vec();
        before.reverse();
        before
    };
    picked.into_iter().filter_map(node_item).collect()
}

fn test_matches(test: &NodeTest, item: &NodeItem<'_>, axis: Axis) -> bool {
    if axis == Axis::Attribute {
        let NodeItem::Attr { name, .. } = item else {
            return false;
        };
        return match test {
            NodeTest::Name(wanted) => name == wanted,
            NodeTest::Wildcard | NodeTest::Node => true,
            NodeTest::Text => false,
        };
    }

    match (test, item) {
        (NodeTest::Name(wanted), NodeItem::Element(node)) => {
            dom::tag_name(node).as_deref() == Some(wanted.as_str())
        }
        (NodeTest::Wildcard, NodeItem::Element(node)) => node.is_element(),
        (NodeTest::Text, NodeItem::Text(_)) => true,
        (NodeTest::Node, NodeItem::Element(node)) => node.is_element(),
        (NodeTest::Node, NodeItem::Text(_)) => true,
        _ => false,
    }
}

fn to_bool(value: &Value<'_>) -> bool {
    match value {
        Value::Nodes(nodes) => !nodes.is_empty(),
        Value::Str(text) => !text.is_empty(),
        Value::Num(number) => *number != 0.0 && !number.is_nan(),
        Value::Bool(flag) => *flag,
    }
}

fn to_number(value: &Value<'_>) -> f64 {
    match value {
        Value::Num(number) => *number,
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        Value::Str(text) => parse_number(text),
        Value::Nodes(nodes) => nodes
            .first()
            .map_or(f64::NAN, |node| parse_number(&node.string_value())),
    }
}

fn parse_number(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn to_string(value: &Value<'_>) -> String {
    match value {
        Value::Str(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Num(number) => format_number(*number),
        Value::Nodes(nodes) => nodes
            .first()
            .map(NodeItem::string_value)
            .unwrap_or_default(),
    }
}

pub(crate) fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.is_finite() {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

fn compare_eq(lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    match (lhs, rhs) {
        (Value::Nodes(nodes), other) | (other, Value::Nodes(nodes)) => match other {
            Value::Nodes(other_nodes) => nodes.iter().any(|a| {
                other_nodes
                    .iter()
                    .any(|b| a.string_value() == b.string_value())
            }),
            Value::Str(text) => nodes.iter().any(|node| node.string_value() == *text),
            Value::Num(number) => nodes
                .iter()
                .any(|node| parse_number(&node.string_value()) == *number),
            Value::Bool(flag) => !nodes.is_empty() == *flag,
        },
        (Value::Bool(a), other) | (other, Value::Bool(a)) => *a == to_bool(other),
        (Value::Num(a), other) | (other, Value::Num(a)) => *a == to_number(other),
        (Value::Str(a), Value::Str(b)) => a == b,
    }
}

fn compare_num(lhs: &Value<'_>, rhs: &Value<'_>, op: impl Fn(f64, f64) -> bool) -> bool {
    match (lhs, rhs) {
        (Value::Nodes(nodes), other) => nodes
            .iter()
            .any(|node| op(parse_number(&node.string_value()), to_number(other))),
        (other, Value::Nodes(nodes)) => nodes
            .iter()
            .any(|node| op(to_number(other), parse_number(&node.string_value()))),
        _ => op(to_number(lhs), to_number(rhs)),
    }
}
