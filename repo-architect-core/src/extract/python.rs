//! Structural extraction for Python via tree-sitter.

use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

use super::Language;
use crate::model::FileRecord;

/// Base classes that mark a class as a data model (ORM or schema).
const DATA_MODEL_BASES: &[&str] = &[
    "BaseModel",
    "Model",
    "Base",
    "DeclarativeBase",
    "SQLModel",
    "Schema",
    "Document",
];

/// Decorator attribute names treated as HTTP route registrations.
const ROUTE_VERBS: &[&str] = &["get", "post", "put", "delete"];

/// Walk a Python module and collect imports, classes, functions and hints.
///
/// A file that does not parse cleanly yields a degraded record rather than an
/// error.
pub fn extract(content: &str, path: &str) -> FileRecord {
    let tag = Language::Python.tag();
    let tree = match parse(content) {
        Ok(tree) => tree,
        Err(marker) => return FileRecord::degraded(path, tag, marker),
    };

    let root = tree.root_node();
    let error_node = first_error(root);
    if error_node.is_some() || root.has_error() {
        let marker = error_node
            .map(|n| {
                let pos = n.start_position();
                format!("syntax error at line {}, column {}", pos.row + 1, pos.column + 1)
            })
            .unwrap_or_else(|| "syntax error".to_owned());
        debug!(path, marker = %marker, "Python source did not parse; recording degraded file");
        return FileRecord::degraded(path, tag, marker);
    }

    let src = content.as_bytes();
    let mut record = FileRecord::new(path, tag);

    // Imports count at module level only.
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "import_statement" => {
                for name in children_by_field(node, "name") {
                    record.imports.insert(imported_module(name, src).to_owned());
                }
            }
            "import_from_statement" => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    record.imports.insert(text(module, src).to_owned());
                }
            }
            "future_import_statement" => {
                record.imports.insert("__future__".to_owned());
            }
            _ => {}
        }
    }

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "class_definition" => visit_class(node, src, &mut record),
            "function_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    record.declared_functions.push(text(name, src).to_owned());
                }
            }
            "decorated_definition" => visit_decorated(node, src, &mut record),
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    record
}

fn parse(content: &str) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| format!("python grammar unavailable: {e}"))?;
    parser
        .parse(content, None)
        .ok_or_else(|| "parser produced no tree".to_owned())
}

/// Python 2 statements the grammar still accepts but Python 3 rejects.
const PY2_ONLY_STATEMENTS: &[&str] = &["print_statement", "exec_statement"];

fn first_error(root: Node) -> Option<Node> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() || PY2_ONLY_STATEMENTS.contains(&node.kind()) {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn visit_class(node: Node, src: &[u8], record: &mut FileRecord) {
    let Some(name) = node.child_by_field_name("name").map(|n| text(n, src)) else {
        return;
    };
    record.declared_types.push(name.to_owned());

    let Some(bases) = node.child_by_field_name("superclasses") else {
        return;
    };
    let mut cursor = bases.walk();
    let is_model = bases
        .named_children(&mut cursor)
        .filter(|b| matches!(b.kind(), "identifier" | "attribute"))
        .any(|b| {
            let last = text(b, src).rsplit('.').next().unwrap_or_default();
            DATA_MODEL_BASES.contains(&last)
        });
    if is_model {
        record.framework_hints.push(format!("Data Model: {name}"));
    }
}

/// `@app.get("/items")` on a function adds `Route: GET <function>`.
fn visit_decorated(node: Node, src: &[u8], record: &mut FileRecord) {
    let Some(definition) = node.child_by_field_name("definition") else {
        return;
    };
    if definition.kind() != "function_definition" {
        return;
    }
    let Some(function_name) = definition.child_by_field_name("name").map(|n| text(n, src))
    else {
        return;
    };

    let mut cursor = node.walk();
    for decorator in node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
    {
        let Some(expr) = decorator.named_child(0) else {
            continue;
        };
        if expr.kind() != "call" {
            continue;
        }
        let Some(attribute) = expr
            .child_by_field_name("function")
            .filter(|f| f.kind() == "attribute")
            .and_then(|f| f.child_by_field_name("attribute"))
        else {
            continue;
        };
        let verb = text(attribute, src);
        if ROUTE_VERBS.contains(&verb) {
            record.framework_hints.push(format!(
                "Route: {} {}",
                verb.to_ascii_uppercase(),
                function_name
            ));
        }
    }
}

/// `a.b` for `import a.b` and `import a.b as c`.
fn imported_module<'a>(name: Node, src: &'a [u8]) -> &'a str {
    match name.kind() {
        "aliased_import" => name
            .child_by_field_name("name")
            .map(|n| text(n, src))
            .unwrap_or_default(),
        _ => text(name, src),
    }
}

fn children_by_field<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or_default()
}
