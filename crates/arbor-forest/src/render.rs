//! JSON and Graphviz DOT renderings of a fitted tree.

use serde::Serialize;

use crate::{
    RfError,
    column::Value,
    node::{Entropy, Node, NodeIndex},
    tree::DecisionTree,
};

/// Pending output of the JSON writer.
enum JsonStep {
    Node(NodeIndex),
    Text(&'static str),
}

fn json_value(value: &impl Serialize) -> Result<String, RfError> {
    serde_json::to_string(value).map_err(|source| RfError::RenderJson { source })
}

fn push_entropy(out: &mut String, entropy: Entropy) {
    if !entropy.is_zero() {
        out.push_str(",\"E\":\"");
        out.push_str(&entropy.to_string());
        out.push('"');
    }
}

impl DecisionTree {
    /// Render the tree as compact JSON; the empty model is `{}`.
    ///
    /// Split nodes render as `{var, val|cat, n, E, left, right}` and leaves as
    /// `{predict, n, E}`. `E` is the node entropy with two decimals, omitted
    /// when it is zero. The walk keeps its own stack, so any depth the builder
    /// produces can be rendered.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::RenderJson`] if a name or label cannot be encoded.
    pub fn to_json(&self) -> Result<String, RfError> {
        if self.nodes.is_empty() {
            return Ok("{}".to_string());
        }
        let schema = &self.schema;
        let mut out = String::new();
        let mut stack = vec![JsonStep::Node(NodeIndex::new(0))];

        while let Some(step) = stack.pop() {
            let index = match step {
                JsonStep::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                JsonStep::Node(index) => index,
            };
            match self.node(index) {
                Node::Leaf {
                    prediction,
                    n_samples,
                    entropy,
                    ..
                } => {
                    let label = schema.decode(schema.target_index(), Value::Int(*prediction));
                    out.push_str("{\"predict\":");
                    out.push_str(&json_value(&label)?);
                    out.push_str(",\"n\":");
                    out.push_str(&n_samples.to_string());
                    push_entropy(&mut out, *entropy);
                    out.push('}');
                }
                Node::NumericSplit {
                    feature,
                    threshold,
                    left,
                    right,
                    n_samples,
                    entropy,
                } => {
                    out.push_str("{\"var\":");
                    out.push_str(&json_value(&schema.name(feature.index()))?);
                    out.push_str(",\"val\":");
                    out.push_str(&json_value(threshold)?);
                    out.push_str(",\"n\":");
                    out.push_str(&n_samples.to_string());
                    push_entropy(&mut out, *entropy);
                    out.push_str(",\"left\":");
                    stack.extend([
                        JsonStep::Text("}"),
                        JsonStep::Node(*right),
                        JsonStep::Text(",\"right\":"),
                        JsonStep::Node(*left),
                    ]);
                }
                Node::CategoricalSplit {
                    feature,
                    category,
                    left,
                    right,
                    n_samples,
                    entropy,
                } => {
                    let cat = schema.decode(feature.index(), Value::Int(*category));
                    out.push_str("{\"var\":");
                    out.push_str(&json_value(&schema.name(feature.index()))?);
                    out.push_str(",\"cat\":");
                    out.push_str(&json_value(&cat.to_string())?);
                    out.push_str(",\"n\":");
                    out.push_str(&n_samples.to_string());
                    push_entropy(&mut out, *entropy);
                    out.push_str(",\"left\":");
                    stack.extend([
                        JsonStep::Text("}"),
                        JsonStep::Node(*right),
                        JsonStep::Text(",\"right\":"),
                        JsonStep::Node(*left),
                    ]);
                }
            }
        }
        Ok(out)
    }

    /// Render the tree as a Graphviz `digraph`.
    ///
    /// Node definitions come first in pre-order, then the edges in the same
    /// order. Node ids are `n{arena index}`.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut definitions = Vec::with_capacity(self.nodes.len());
        let mut edges = Vec::with_capacity(self.nodes.len().saturating_sub(1));

        let mut stack = Vec::new();
        if !self.nodes.is_empty() {
            stack.push(NodeIndex::new(0));
        }
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            definitions.push(self.dot_definition(index, node));
            if let Some((left, right)) = node.children() {
                let (left_label, right_label) = self.dot_edge_labels(node);
                edges.push(format!("n{index} -> n{left} [label=\"{left_label}\"];"));
                edges.push(format!("n{index} -> n{right} [label=\"{right_label}\"];"));
                stack.push(right);
                stack.push(left);
            }
        }

        let mut out = String::from("digraph dtree {\n");
        for line in definitions.iter().chain(&edges) {
            out.push('\t');
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }

    fn dot_definition(&self, index: NodeIndex, node: &Node) -> String {
        let schema = &self.schema;
        match node {
            Node::Leaf {
                prediction,
                n_samples,
                entropy,
                ..
            } => {
                let label = schema.decode(schema.target_index(), Value::Int(*prediction));
                format!("n{index} [shape=box, label=\"{label}\\nn={n_samples}\\nE={entropy}\"];")
            }
            Node::NumericSplit {
                feature,
                n_samples,
                entropy,
                ..
            }
            | Node::CategoricalSplit {
                feature,
                n_samples,
                entropy,
                ..
            } => {
                let name = schema.name(feature.index());
                format!("n{index} [label=\"{name}\\nn={n_samples}\\nE={entropy}\"];")
            }
        }
    }

    fn dot_edge_labels(&self, node: &Node) -> (String, String) {
        match node {
            Node::NumericSplit { threshold, .. } => {
                (format!("<{threshold:.2}"), format!(">={threshold:.2}"))
            }
            Node::CategoricalSplit {
                feature, category, ..
            } => {
                let cat = self.schema.decode(feature.index(), Value::Int(*category));
                (cat.to_string(), format!("!{cat}"))
            }
            Node::Leaf { .. } => unreachable!("leaves have no edges"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::column::ColumnKind;
    use crate::frame::{DataFrame, FrameBuilder};
    use crate::tree::DecisionTreeConfig;

    fn json_of(rows: &[&[i32]]) -> String {
        let data =
            DataFrame::from_ints(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap();
        let tree = DecisionTreeConfig::new().fit(&data).unwrap();
        for i in 0..data.len() {
            let _ = tree.classify(&data.row(i)).unwrap();
        }
        tree.to_json().unwrap().replace('"', "'")
    }

    #[test]
    fn empty_tree_renders_empty_object() {
        let data = DataFrame::empty(vec![ColumnKind::NumericInt, ColumnKind::TargetCategoricalInt])
            .unwrap();
        let tree = DecisionTreeConfig::new().fit(&data).unwrap();
        assert_eq!(tree.to_json().unwrap(), "{}");
        assert_eq!(tree.to_dot(), "digraph dtree {\n}\n");
    }

    #[test]
    fn single_row() {
        assert_eq!(json_of(&[&[1, 99]]), "{'predict':99,'n':1}");
    }

    #[test]
    fn two_rows_same_category() {
        assert_eq!(json_of(&[&[1, 2, 3, 99], &[2, 4, 6, 99]]), "{'predict':99,'n':2}");
    }

    #[test]
    fn two_rows_different_category() {
        assert_eq!(
            json_of(&[&[1, 2, 3, 99], &[2, 4, 6, 100]]),
            "{'var':'x0','val':1.5,'n':2,'E':'1.00','left':{'predict':99,'n':1},'right':{'predict':100,'n':1}}"
        );
    }

    #[test]
    fn good_splitter_beats_bad_one_in_either_position() {
        assert_eq!(
            json_of(&[&[1, 4, 99], &[1, 5, 99], &[2, 4, 100], &[2, 5, 100]]),
            "{'var':'x0','val':1.5,'n':4,'E':'1.00','left':{'predict':99,'n':2},'right':{'predict':100,'n':2}}"
        );
        assert_eq!(
            json_of(&[&[4, 1, 99], &[5, 1, 99], &[4, 2, 100], &[5, 2, 100]]),
            "{'var':'x1','val':1.5,'n':4,'E':'1.00','left':{'predict':99,'n':2},'right':{'predict':100,'n':2}}"
        );
    }

    #[test]
    fn noisy_targets_keep_entropy_on_leaves() {
        assert_eq!(
            json_of(&[&[1, 1], &[1, 1], &[1, 2], &[1, 1], &[2, 2], &[2, 1], &[2, 2], &[2, 0]]),
            "{'var':'x0','val':1.5,'n':8,'E':'1.41','left':{'predict':1,'n':4,'E':'0.81'},'right':{'predict':2,'n':4,'E':'1.50'}}"
        );
    }

    #[test]
    fn noisy_predictor() {
        assert_eq!(
            json_of(&[&[1, 1], &[1, 1], &[2, 1], &[1, 1], &[2, 2], &[1, 2], &[2, 2], &[0, 2]]),
            "{'var':'x0','val':0.5,'n':8,'E':'1.00','left':{'predict':2,'n':1},'right':{'var':'x0','val':1.5,'n':7,'E':'0.99','left':{'predict':1,'n':4,'E':'0.81'},'right':{'predict':2,'n':3,'E':'0.92'}}}"
        );
    }

    #[test]
    fn good_predictor_alongside_noise() {
        assert_eq!(
            json_of(&[
                &[1, 9, 1],
                &[1, 9, 1],
                &[2, 9, 1],
                &[1, 9, 1],
                &[2, 7, 2],
                &[1, 7, 2],
                &[2, 7, 2],
                &[0, 7, 2],
            ]),
            "{'var':'x1','val':8.0,'n':8,'E':'1.00','left':{'predict':2,'n':4},'right':{'predict':1,'n':4}}"
        );
    }

    #[test]
    fn four_predictor_values_nest_to_the_right() {
        assert_eq!(
            json_of(&[
                &[1, 9, 1],
                &[1, 9, 1],
                &[1, 12, 1],
                &[1, 12, 1],
                &[1, 7, 2],
                &[1, 7, 2],
                &[1, 11, 2],
                &[1, 11, 2],
            ]),
            "{'var':'x1','val':8.0,'n':8,'E':'1.00','left':{'predict':2,'n':2},'right':{'var':'x1','val':10.0,'n':6,'E':'0.92','left':{'predict':1,'n':2},'right':{'var':'x1','val':11.5,'n':4,'E':'1.00','left':{'predict':2,'n':2},'right':{'predict':1,'n':2}}}}"
        );
    }

    #[test]
    fn timestamp_column_is_ignored() {
        assert_eq!(
            json_of(&[&[1, 9, 2], &[2, 12, 1], &[3, 7, 2], &[4, 11, 1]]),
            "{'var':'x1','val':10.0,'n':4,'E':'1.00','left':{'predict':2,'n':2},'right':{'predict':1,'n':2}}"
        );
    }

    #[test]
    fn categorical_split_names_the_category() {
        let rows: Vec<Vec<i32>> = vec![
            vec![1, 9, 1],
            vec![1, 9, 1],
            vec![2, 9, 1],
            vec![1, 9, 1],
            vec![2, 7, 2],
            vec![1, 7, 2],
            vec![2, 7, 2],
            vec![0, 7, 2],
        ];
        let mut data = DataFrame::from_ints(&rows).unwrap();
        data.set_column_kind(0, ColumnKind::CategoricalInt).unwrap();
        data.set_column_kind(1, ColumnKind::CategoricalInt).unwrap();
        let tree = DecisionTreeConfig::new().fit(&data).unwrap();
        assert_eq!(
            tree.to_json().unwrap().replace('"', "'"),
            "{'var':'x1','cat':'7','n':8,'E':'1.00','left':{'predict':2,'n':4},'right':{'predict':1,'n':4}}"
        );
    }

    #[test]
    fn string_targets_render_as_strings() {
        let rows = vec![vec!["Some", "Yes"], vec!["None", "No"], vec!["Some", "Yes"]];
        let data = FrameBuilder::new()
            .with_names(vec!["Patrons".into(), "WillWait".into()])
            .build_from_strings(&rows)
            .unwrap();
        let tree = DecisionTreeConfig::new().fit(&data).unwrap();
        assert_eq!(
            tree.to_json().unwrap().replace('"', "'"),
            "{'var':'Patrons','cat':'Some','n':3,'E':'0.92','left':{'predict':'Yes','n':2},'right':{'predict':'No','n':1}}"
        );
    }

    #[test]
    fn chain_of_thousands_of_splits_renders() {
        // Alternating targets over a sorted predictor force one split per row.
        let rows: Vec<Vec<i32>> = (0..5000).map(|i| vec![i, i % 2]).collect();
        let data = DataFrame::from_ints(&rows).unwrap();
        let tree = DecisionTreeConfig::new().fit(&data).unwrap();
        assert_eq!(tree.depth(), 4999);

        let json = tree.to_json().unwrap();
        assert!(json.starts_with("{\"var\":\"x0\",\"val\":"));
        assert_eq!(json.matches('{').count(), tree.n_nodes());
        assert_eq!(json.matches('}').count(), tree.n_nodes());
        assert_eq!(json.matches("\"predict\"").count(), tree.n_leaves());
        assert!(json.ends_with("}}}"));

        let dot = tree.to_dot();
        assert_eq!(dot.lines().count(), 2 + tree.n_nodes() + (tree.n_nodes() - 1));
    }

    #[test]
    fn dot_lists_nodes_then_edges() {
        let data = DataFrame::from_ints(&[vec![1, 99], vec![2, 100]]).unwrap();
        let tree = DecisionTreeConfig::new().fit(&data).unwrap();
        let expected = "digraph dtree {\n\
            \tn0 [label=\"x0\\nn=2\\nE=1.00\"];\n\
            \tn1 [shape=box, label=\"99\\nn=1\\nE=0.00\"];\n\
            \tn2 [shape=box, label=\"100\\nn=1\\nE=0.00\"];\n\
            \tn0 -> n1 [label=\"<1.50\"];\n\
            \tn0 -> n2 [label=\">=1.50\"];\n\
            }\n";
        assert_eq!(tree.to_dot(), expected);
    }

    #[test]
    fn dot_categorical_edges() {
        let rows = vec![vec!["red", "a"], vec!["blue", "b"]];
        let data = DataFrame::from_strings(&rows).unwrap();
        let tree = DecisionTreeConfig::new().fit(&data).unwrap();
        let dot = tree.to_dot();
        assert!(dot.contains("\tn0 -> n1 [label=\"red\"];\n"));
        assert!(dot.contains("\tn0 -> n2 [label=\"!red\"];\n"));
    }
}
