//! Graphical model tree.
//!
//! The server owns the authoritative model; the client only ever receives
//! whole trees (`setModel`, `updateModel`) and decorates them with transient
//! view state such as CSS classes. Elements are addressed by their string id.

use serde::{Deserialize, Serialize};

/// A 2D position in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// A node in the graphical model tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelElement {
    /// Unique element id within the model.
    pub id: String,

    /// Element type identifier (e.g. `node`, `edge`, `label`).
    #[serde(rename = "type")]
    pub element_type: String,

    /// CSS classes currently applied to this element.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub css_classes: Vec<String>,

    /// Child elements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ModelElement>,

    /// Position, if this element is placed explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,

    /// Text content for label-like elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ModelElement {
    /// Create an element with no children and no decorations.
    pub fn new(id: impl Into<String>, element_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            element_type: element_type.into(),
            css_classes: Vec::new(),
            children: Vec::new(),
            position: None,
            text: None,
        }
    }

    /// Apply a CSS class if not already present.
    ///
    /// Idempotent: re-applying an existing class never duplicates it.
    pub fn add_css_class(&mut self, class: &str) {
        if !self.css_classes.iter().any(|c| c == class) {
            self.css_classes.push(class.to_string());
        }
    }

    /// Remove a CSS class if present.
    pub fn remove_css_class(&mut self, class: &str) {
        self.css_classes.retain(|c| c != class);
    }
}

/// Root of the graphical model tree.
///
/// Carries a `revision` that increases with every committed model change, so
/// downstream consumers can detect stale trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRoot {
    /// Unique id of the root element.
    pub id: String,

    /// Root type identifier (e.g. `graph`).
    #[serde(rename = "type")]
    pub root_type: String,

    /// Monotonic model revision.
    #[serde(default)]
    pub revision: u64,

    /// CSS classes applied to the root itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub css_classes: Vec<String>,

    /// Top-level child elements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ModelElement>,
}

impl ModelRoot {
    /// The placeholder root a client shows before the first model arrives.
    pub fn empty() -> Self {
        Self::new("EMPTY", "NONE")
    }

    /// Create an empty root at revision 0.
    pub fn new(id: impl Into<String>, root_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            root_type: root_type.into(),
            revision: 0,
            css_classes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Find an element by id anywhere in the tree. `None` if absent.
    ///
    /// The root id itself is not addressable through this method; root
    /// decorations go through [`ModelRoot::add_css_classes`] with the root id.
    pub fn find_element(&self, id: &str) -> Option<&ModelElement> {
        fn walk<'a>(elements: &'a [ModelElement], id: &str) -> Option<&'a ModelElement> {
            for element in elements {
                if element.id == id {
                    return Some(element);
                }
                if let Some(found) = walk(&element.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.children, id)
    }

    /// Find an element by id anywhere in the tree, mutably.
    pub fn find_element_mut(&mut self, id: &str) -> Option<&mut ModelElement> {
        fn walk<'a>(elements: &'a mut [ModelElement], id: &str) -> Option<&'a mut ModelElement> {
            for element in elements {
                if element.id == id {
                    return Some(element);
                }
                if let Some(found) = walk(&mut element.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&mut self.children, id)
    }

    /// Apply CSS classes to the element with the given id (or the root
    /// itself). Returns `false` if no such element exists.
    ///
    /// Application is idempotent per class.
    pub fn add_css_classes(&mut self, element_id: &str, classes: &[String]) -> bool {
        if element_id == self.id {
            for class in classes {
                if !self.css_classes.iter().any(|c| c == class) {
                    self.css_classes.push(class.clone());
                }
            }
            return true;
        }
        match self.find_element_mut(element_id) {
            Some(element) => {
                for class in classes {
                    element.add_css_class(class);
                }
                true
            },
            None => false,
        }
    }

    /// Remove CSS classes from the element with the given id (or the root
    /// itself). Returns `false` if no such element exists.
    pub fn remove_css_classes(&mut self, element_id: &str, classes: &[String]) -> bool {
        if element_id == self.id {
            self.css_classes.retain(|c| !classes.contains(c));
            return true;
        }
        match self.find_element_mut(element_id) {
            Some(element) => {
                element.css_classes.retain(|c| !classes.contains(c));
                true
            },
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_root() -> ModelRoot {
        let mut root = ModelRoot::new("graph", "graph");
        let mut node = ModelElement::new("n1", "node");
        node.children.push(ModelElement::new("n1.label", "label"));
        root.children.push(node);
        root.children.push(ModelElement::new("n2", "node"));
        root
    }

    #[test]
    fn find_element_walks_nested_children() {
        let root = sample_root();
        assert!(root.find_element("n1.label").is_some());
        assert!(root.find_element("n2").is_some());
        assert!(root.find_element("missing").is_none());
    }

    #[test]
    fn add_css_class_is_idempotent() {
        let mut root = sample_root();
        assert!(root.add_css_classes("n1", &["pulse".to_string()]));
        assert!(root.add_css_classes("n1", &["pulse".to_string()]));

        let n1 = root.find_element("n1").unwrap();
        assert_eq!(n1.css_classes, vec!["pulse".to_string()]);
    }

    #[test]
    fn remove_css_class_clears_entry() {
        let mut root = sample_root();
        root.add_css_classes("n1", &["pulse".to_string(), "hover".to_string()]);
        root.remove_css_classes("n1", &["pulse".to_string()]);

        let n1 = root.find_element("n1").unwrap();
        assert_eq!(n1.css_classes, vec!["hover".to_string()]);
    }

    #[test]
    fn root_id_is_addressable_for_css() {
        let mut root = sample_root();
        assert!(root.add_css_classes("graph", &["debug".to_string()]));
        assert_eq!(root.css_classes, vec!["debug".to_string()]);
    }

    #[test]
    fn css_on_unknown_element_reports_miss() {
        let mut root = sample_root();
        assert!(!root.add_css_classes("missing", &["pulse".to_string()]));
    }

    #[test]
    fn model_round_trips_through_json() {
        let mut root = sample_root();
        root.revision = 7;
        root.add_css_classes("n1", &["selected".to_string()]);

        let json = serde_json::to_string(&root).unwrap();
        let back: ModelRoot = serde_json::from_str(&json).unwrap();
        assert_eq!(root, back);
    }

    #[test]
    fn element_type_serializes_as_type_field() {
        let element = ModelElement::new("n1", "node");
        let value = serde_json::to_value(&element).unwrap();
        assert_eq!(value["type"], "node");
        assert!(value.get("cssClasses").is_none());
    }
}
