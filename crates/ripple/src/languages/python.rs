//! Python language support for Ripple.
//!
//! Implements entity extraction for Python source files. The walker is generic
//! over [`ParseNode`] and tracks nesting with an explicit scope stack, so the
//! enclosing function or class of any node is always the top of the stack.

use std::collections::HashSet;

use super::common::{
    AccessType, AttributeAccessSite, AttributeRecord, CallSite, ClassRecord, DecoratorRecord,
    DecoratorTarget, ExceptionContext, ExceptionRecord, FileAnalysis, FunctionRecord,
    ImportRecord, ModuleRecord, VariableRecord, VariableUsageSite,
};
use super::{ExtractContext, LanguageSupport};
use crate::parser::{ParseNode, TreeSitterNode};
use crate::types::Language;

/// Tree-sitter node kind constants for the Python grammar.
mod node_kinds {
    // Definitions
    pub const FUNCTION_DEFINITION: &str = "function_definition";
    pub const CLASS_DEFINITION: &str = "class_definition";
    pub const DECORATED_DEFINITION: &str = "decorated_definition";
    pub const DECORATOR: &str = "decorator";
    pub const LAMBDA: &str = "lambda";
    pub const PARAMETERS: &str = "parameters";

    // Statements
    pub const ASSIGNMENT: &str = "assignment";
    pub const AUGMENTED_ASSIGNMENT: &str = "augmented_assignment";
    pub const EXPRESSION_STATEMENT: &str = "expression_statement";
    pub const IMPORT_STATEMENT: &str = "import_statement";
    pub const IMPORT_FROM_STATEMENT: &str = "import_from_statement";
    pub const RAISE_STATEMENT: &str = "raise_statement";
    pub const EXCEPT_CLAUSE: &str = "except_clause";
    pub const GLOBAL_STATEMENT: &str = "global_statement";
    pub const NONLOCAL_STATEMENT: &str = "nonlocal_statement";
    pub const BLOCK: &str = "block";
    pub const COMMENT: &str = "comment";

    // Import parts
    pub const DOTTED_NAME: &str = "dotted_name";
    pub const ALIASED_IMPORT: &str = "aliased_import";
    pub const WILDCARD_IMPORT: &str = "wildcard_import";

    // Expressions
    pub const CALL: &str = "call";
    pub const ATTRIBUTE: &str = "attribute";
    pub const IDENTIFIER: &str = "identifier";
    pub const KEYWORD_ARGUMENT: &str = "keyword_argument";
    pub const AS_PATTERN: &str = "as_pattern";
    pub const STRING: &str = "string";

    // Assignment targets
    pub const PATTERN_LIST: &str = "pattern_list";
    pub const TUPLE_PATTERN: &str = "tuple_pattern";
    pub const LIST_PATTERN: &str = "list_pattern";
    pub const TUPLE: &str = "tuple";
    pub const LIST: &str = "list";
    pub const PARENTHESIZED_EXPRESSION: &str = "parenthesized_expression";
}

/// Python language support implementation.
pub struct PythonLanguage;

impl LanguageSupport for PythonLanguage {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn extract(&self, root: &TreeSitterNode<'_>, ctx: &ExtractContext<'_>) -> FileAnalysis {
        extract(root, ctx)
    }
}

/// Extract every entity from a Python module tree.
pub fn extract<N: ParseNode>(root: &N, ctx: &ExtractContext<'_>) -> FileAnalysis {
    let mut extractor = Extractor {
        include_source: ctx.include_source,
        analysis: FileAnalysis::new(ctx.rel_path, Language::Python, ctx.content_hash),
        scopes: Vec::new(),
        reads: Vec::new(),
    };

    extractor.analysis.module = Some(module_record(ctx.rel_path, root));
    extractor.visit_children(root);
    extractor.finish()
}

/// A lexical scope on the walker's stack. Module scope is the empty stack.
#[derive(Debug, Clone)]
enum Scope {
    Class(String),
    Function {
        name: String,
        class: Option<String>,
    },
}

struct Extractor {
    include_source: bool,
    analysis: FileAnalysis,
    scopes: Vec<Scope>,
    /// Identifier reads inside functions, filtered to known variables at the end
    reads: Vec<VariableUsageSite>,
}

impl Extractor {
    fn finish(mut self) -> FileAnalysis {
        let defined: HashSet<&str> = self
            .analysis
            .variables
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        let usages: Vec<VariableUsageSite> = self
            .reads
            .into_iter()
            .filter(|r| defined.contains(r.variable_name.as_str()))
            .collect();
        self.analysis.variable_usages = usages;
        self.analysis
    }

    /// Innermost function, if the walker is directly inside one.
    fn current_function(&self) -> Option<&str> {
        match self.scopes.last() {
            Some(Scope::Function { name, .. }) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Class owning the current method, if the walker is inside a method.
    fn method_class(&self) -> Option<&str> {
        match self.scopes.last() {
            Some(Scope::Function {
                class: Some(class), ..
            }) => Some(class.as_str()),
            _ => None,
        }
    }

    fn visit<N: ParseNode>(&mut self, node: &N) {
        use node_kinds::{
            ASSIGNMENT, ATTRIBUTE, AUGMENTED_ASSIGNMENT, CALL, CLASS_DEFINITION,
            DECORATED_DEFINITION, EXCEPT_CLAUSE, FUNCTION_DEFINITION, GLOBAL_STATEMENT,
            IDENTIFIER, IMPORT_FROM_STATEMENT, IMPORT_STATEMENT, KEYWORD_ARGUMENT, LAMBDA,
            NONLOCAL_STATEMENT, PARAMETERS, RAISE_STATEMENT,
        };

        match node.kind() {
            FUNCTION_DEFINITION => self.visit_function(node),
            CLASS_DEFINITION => self.visit_class(node),
            DECORATED_DEFINITION => self.visit_decorated(node),
            IMPORT_STATEMENT => self.visit_import(node),
            IMPORT_FROM_STATEMENT => self.visit_import_from(node),
            ASSIGNMENT => self.visit_assignment(node),
            AUGMENTED_ASSIGNMENT => self.visit_augmented_assignment(node),
            RAISE_STATEMENT => self.visit_raise(node),
            EXCEPT_CLAUSE => self.visit_except(node),
            CALL => self.visit_call(node),
            ATTRIBUTE => self.visit_attribute(node),
            IDENTIFIER => self.record_read(node),
            KEYWORD_ARGUMENT => {
                if let Some(value) = node.child_by_field("value") {
                    self.visit(&value);
                }
            }
            LAMBDA => {
                if let Some(body) = node.child_by_field("body") {
                    self.visit(&body);
                }
            }
            PARAMETERS | GLOBAL_STATEMENT | NONLOCAL_STATEMENT => {}
            _ => self.visit_children(node),
        }
    }

    fn visit_children<N: ParseNode>(&mut self, node: &N) {
        for child in node.children() {
            self.visit(&child);
        }
    }

    fn excerpt<N: ParseNode>(&self, node: &N) -> Option<String> {
        self.include_source.then(|| node.text().to_string())
    }

    fn visit_function<N: ParseNode>(&mut self, node: &N) {
        let Some(name) = node.name() else {
            return;
        };
        let parent_class = match self.scopes.last() {
            Some(Scope::Class(class)) => Some(class.clone()),
            _ => None,
        };

        let source_excerpt = self.excerpt(node);
        self.analysis.functions.push(FunctionRecord {
            name: name.clone(),
            start_line: node.start_line(),
            end_line: node.end_line(),
            is_public: !name.starts_with('_'),
            source_excerpt,
            parent_class: parent_class.clone(),
        });

        if let Some(body) = node.child_by_field("body") {
            self.scopes.push(Scope::Function {
                name,
                class: parent_class,
            });
            self.visit_children(&body);
            self.scopes.pop();
        }
    }

    fn visit_class<N: ParseNode>(&mut self, node: &N) {
        use node_kinds::{ATTRIBUTE, IDENTIFIER};

        let Some(name) = node.name() else {
            return;
        };

        let bases = node
            .child_by_field("superclasses")
            .map(|list| {
                list.children()
                    .iter()
                    .filter_map(|base| match base.kind() {
                        IDENTIFIER => Some(base.text().to_string()),
                        ATTRIBUTE => base
                            .child_by_field("attribute")
                            .map(|attr| attr.text().to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let source_excerpt = self.excerpt(node);
        self.analysis.classes.push(ClassRecord {
            name: name.clone(),
            start_line: node.start_line(),
            end_line: node.end_line(),
            bases,
            is_public: !name.starts_with('_'),
            source_excerpt,
        });

        if let Some(body) = node.child_by_field("body") {
            self.scopes.push(Scope::Class(name));
            self.visit_children(&body);
            self.scopes.pop();
        }
    }

    fn visit_decorated<N: ParseNode>(&mut self, node: &N) {
        use node_kinds::{CALL, CLASS_DEFINITION, DECORATOR, FUNCTION_DEFINITION};

        let Some(definition) = node.child_by_field("definition") else {
            return;
        };
        let target_type = match definition.kind() {
            FUNCTION_DEFINITION => DecoratorTarget::Function,
            CLASS_DEFINITION => DecoratorTarget::Class,
            _ => {
                self.visit(&definition);
                return;
            }
        };
        let target_name = definition.name().unwrap_or_default();

        for decorator in node.children().iter().filter(|c| c.kind() == DECORATOR) {
            let Some(expr) = decorator.first_child() else {
                continue;
            };
            let (name, arguments) = if expr.kind() == CALL {
                let name = expr
                    .child_by_field("function")
                    .map(|f| f.text().to_string())
                    .unwrap_or_default();
                let args: Vec<String> = expr
                    .child_by_field("arguments")
                    .map(|list| list.children().iter().map(|a| a.text().to_string()).collect())
                    .unwrap_or_default();
                (name, args)
            } else {
                (expr.text().to_string(), Vec::new())
            };

            self.analysis.decorators.push(DecoratorRecord {
                name,
                line: decorator.start_line(),
                arguments: serde_json::to_string(&arguments).unwrap_or_else(|_| "[]".to_string()),
                target_name: target_name.clone(),
                target_type,
            });
        }

        self.visit(&definition);
    }

    fn visit_import<N: ParseNode>(&mut self, node: &N) {
        use node_kinds::{ALIASED_IMPORT, DOTTED_NAME};

        let line = node.start_line();
        for child in node.children() {
            let (name, alias) = match child.kind() {
                DOTTED_NAME => (child.text().to_string(), None),
                ALIASED_IMPORT => aliased(&child),
                _ => continue,
            };
            self.analysis.imports.push(ImportRecord {
                imported_name: name,
                import_type: "module".to_string(),
                alias,
                line,
                is_relative: false,
                module: None,
            });
        }
    }

    fn visit_import_from<N: ParseNode>(&mut self, node: &N) {
        use node_kinds::{ALIASED_IMPORT, DOTTED_NAME, WILDCARD_IMPORT};

        let line = node.start_line();
        let mut children = node.children().into_iter();
        // The source module always comes first
        let Some(module) = children.next() else {
            return;
        };
        let module = module.text().to_string();
        let is_relative = module.starts_with('.');

        for child in children {
            let (name, alias, import_type) = match child.kind() {
                DOTTED_NAME => (child.text().to_string(), None, "name"),
                ALIASED_IMPORT => {
                    let (name, alias) = aliased(&child);
                    (name, alias, "name")
                }
                WILDCARD_IMPORT => ("*".to_string(), None, "*"),
                _ => continue,
            };
            self.analysis.imports.push(ImportRecord {
                imported_name: name,
                import_type: import_type.to_string(),
                alias,
                line,
                is_relative,
                module: Some(module.clone()),
            });
        }
    }

    fn visit_assignment<N: ParseNode>(&mut self, node: &N) {
        let type_hint = node.child_by_field("type").map(|t| t.text().to_string());
        if let Some(left) = node.child_by_field("left") {
            self.assign_target(&left, type_hint);
        }
        if let Some(right) = node.child_by_field("right") {
            self.visit(&right);
        }
    }

    fn assign_target<N: ParseNode>(&mut self, target: &N, type_hint: Option<String>) {
        use node_kinds::{
            ATTRIBUTE, IDENTIFIER, LIST, LIST_PATTERN, PARENTHESIZED_EXPRESSION, PATTERN_LIST,
            TUPLE, TUPLE_PATTERN,
        };

        match target.kind() {
            IDENTIFIER => {
                let name = target.text().to_string();
                let line = target.start_line();
                match self.scopes.last() {
                    None => self.analysis.variables.push(VariableRecord {
                        name,
                        definition_line: line,
                        scope: "module".to_string(),
                    }),
                    Some(Scope::Function { name: func, .. }) => {
                        let scope = format!("function:{func}");
                        self.analysis.variables.push(VariableRecord {
                            name,
                            definition_line: line,
                            scope,
                        });
                    }
                    Some(Scope::Class(class)) => {
                        let class_name = class.clone();
                        self.analysis.attributes.push(AttributeRecord {
                            name,
                            class_name,
                            definition_line: line,
                            type_hint,
                            is_class_attribute: true,
                        });
                    }
                }
            }
            PATTERN_LIST | TUPLE_PATTERN | LIST_PATTERN | TUPLE | LIST
            | PARENTHESIZED_EXPRESSION => {
                for element in target.children() {
                    self.assign_target(&element, None);
                }
            }
            ATTRIBUTE => match self.self_attribute(target) {
                Some((class_name, attribute)) => {
                    let line = target.start_line();
                    self.analysis.attributes.push(AttributeRecord {
                        name: attribute.clone(),
                        class_name: class_name.clone(),
                        definition_line: line,
                        type_hint,
                        is_class_attribute: false,
                    });
                    self.record_access(class_name, attribute, line, AccessType::Write);
                }
                None => self.visit_children(target),
            },
            _ => self.visit_children(target),
        }
    }

    fn visit_augmented_assignment<N: ParseNode>(&mut self, node: &N) {
        if let Some(left) = node.child_by_field("left") {
            match self.self_attribute(&left) {
                Some((class_name, attribute)) => {
                    self.record_access(class_name, attribute, left.start_line(), AccessType::Write);
                }
                None => self.visit(&left),
            }
        }
        if let Some(right) = node.child_by_field("right") {
            self.visit(&right);
        }
    }

    fn visit_call<N: ParseNode>(&mut self, node: &N) {
        use node_kinds::{ATTRIBUTE, IDENTIFIER};

        if let Some(function) = node.child_by_field("function") {
            let called_name = match function.kind() {
                IDENTIFIER => Some(function.text().to_string()),
                ATTRIBUTE => function
                    .child_by_field("attribute")
                    .map(|a| a.text().to_string()),
                _ => None,
            };
            let caller = self.current_function().map(str::to_string);
            if let (Some(caller), Some(called_name)) = (caller, called_name) {
                self.analysis.calls.push(CallSite {
                    caller,
                    called_name,
                    call_line: node.start_line(),
                });
            }

            match function.kind() {
                IDENTIFIER => {}
                ATTRIBUTE => {
                    if let Some(object) = function.child_by_field("object") {
                        self.visit(&object);
                    }
                }
                _ => self.visit(&function),
            }
        }

        if let Some(arguments) = node.child_by_field("arguments") {
            self.visit(&arguments);
        }
    }

    fn visit_attribute<N: ParseNode>(&mut self, node: &N) {
        match self.self_attribute(node) {
            Some((class_name, attribute)) => {
                self.record_access(class_name, attribute, node.start_line(), AccessType::Read);
            }
            None => {
                if let Some(object) = node.child_by_field("object") {
                    self.visit(&object);
                }
            }
        }
    }

    fn visit_raise<N: ParseNode>(&mut self, node: &N) {
        if let Some(expr) = node.first_child() {
            if let Some(name) = exception_name(&expr) {
                self.record_exception(name, expr.start_line(), ExceptionContext::Raise);
            }
        }
        self.visit_children(node);
    }

    fn visit_except<N: ParseNode>(&mut self, node: &N) {
        use node_kinds::{AS_PATTERN, BLOCK, COMMENT, PARENTHESIZED_EXPRESSION, TUPLE};

        let children = node.children();
        let caught = children
            .iter()
            .find(|c| c.kind() != BLOCK && c.kind() != COMMENT);

        if let Some(caught) = caught {
            // `except X as e` wraps the type in an as_pattern on newer grammars
            let caught = if caught.kind() == AS_PATTERN {
                caught.first_child()
            } else {
                Some(caught.clone())
            };

            let types = match caught {
                Some(c) if c.kind() == TUPLE || c.kind() == PARENTHESIZED_EXPRESSION => {
                    c.children()
                }
                Some(c) => vec![c],
                None => Vec::new(),
            };
            for ty in &types {
                if let Some(name) = exception_name(ty) {
                    self.record_exception(name, ty.start_line(), ExceptionContext::Catch);
                }
            }
        }

        for block in children.iter().filter(|c| c.kind() == BLOCK) {
            self.visit_children(block);
        }
    }

    fn record_read<N: ParseNode>(&mut self, node: &N) {
        let Some(function) = self.current_function() else {
            return;
        };
        let site = VariableUsageSite {
            variable_name: node.text().to_string(),
            function_name: function.to_string(),
            usage_line: node.start_line(),
        };
        self.reads.push(site);
    }

    fn record_access(
        &mut self,
        class_name: String,
        attribute_name: String,
        line: u32,
        access_type: AccessType,
    ) {
        let Some(function) = self.current_function() else {
            return;
        };
        let site = AttributeAccessSite {
            function_name: function.to_string(),
            class_name,
            attribute_name,
            line,
            access_type,
        };
        self.analysis.attribute_accesses.push(site);
    }

    fn record_exception(&mut self, name: String, line: u32, context: ExceptionContext) {
        let function_name = self.current_function().map(str::to_string);
        self.analysis.exceptions.push(ExceptionRecord {
            name,
            line,
            context,
            function_name,
        });
    }

    /// `(class, attribute)` if `node` is `self.<attribute>` inside a method.
    fn self_attribute<N: ParseNode>(&self, node: &N) -> Option<(String, String)> {
        if node.kind() != node_kinds::ATTRIBUTE {
            return None;
        }
        let class = self.method_class()?;
        let object = node.child_by_field("object")?;
        if object.kind() != node_kinds::IDENTIFIER || object.text() != "self" {
            return None;
        }
        let attribute = node.child_by_field("attribute")?;
        Some((class.to_string(), attribute.text().to_string()))
    }
}

/// `(name, alias)` of an `aliased_import`.
fn aliased<N: ParseNode>(node: &N) -> (String, Option<String>) {
    let name = node
        .child_by_field("name")
        .map(|n| n.text().to_string())
        .unwrap_or_default();
    let alias = node.child_by_field("alias").map(|a| a.text().to_string());
    (name, alias)
}

/// Name of a raised or caught exception expression.
fn exception_name<N: ParseNode>(expr: &N) -> Option<String> {
    use node_kinds::{ATTRIBUTE, CALL, IDENTIFIER};

    match expr.kind() {
        IDENTIFIER | ATTRIBUTE => Some(expr.text().to_string()),
        CALL => expr
            .child_by_field("function")
            .and_then(|f| exception_name(&f)),
        _ => None,
    }
}

/// Module info derived from the project-relative path and the first statement.
fn module_record<N: ParseNode>(rel_path: &str, root: &N) -> ModuleRecord {
    let (name, is_package) = module_name(rel_path);
    let docstring = root.first_child().and_then(|first| {
        if first.kind() != node_kinds::EXPRESSION_STATEMENT {
            return None;
        }
        let expr = first.first_child()?;
        (expr.kind() == node_kinds::STRING).then(|| string_value(expr.text()))
    });
    ModuleRecord {
        name,
        is_package,
        docstring,
    }
}

/// Dotted module name for a relative path; `__init__.py` names its package.
fn module_name(rel_path: &str) -> (String, bool) {
    let stem = rel_path.strip_suffix(".py").unwrap_or(rel_path);
    let (path, is_package) = match stem.strip_suffix("__init__") {
        Some(package) => (package.trim_end_matches('/'), true),
        None => (stem, false),
    };
    if path.is_empty() {
        return ("__init__".to_string(), is_package);
    }
    (path.replace('/', "."), is_package)
}

/// Contents of a string literal, without prefix and quotes.
fn string_value(literal: &str) -> String {
    let unprefixed = literal.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|q| {
            unprefixed
                .strip_prefix(q)
                .and_then(|rest| rest.strip_suffix(q))
        })
        .unwrap_or(unprefixed);
    inner.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    const FIXTURE: &str = r#""""Order processing."""
import os
import collections.abc as cabc
from .models import Order, Item as LineItem
from util import *

TAX_RATE = 0.2
a, b = 1, 2


@dataclass
class Base:
    kind: str = "base"


class Cart(Base, cabc.Sized):
    limit = 10

    def __init__(self):
        self.items = []

    @property
    def total(self):
        subtotal = sum(self.items)
        return subtotal * TAX_RATE

    def _add(self, item):
        self.items.append(item)
        validate(item)


@app.route("/checkout", methods=["POST"])
@login_required
def checkout(cart):
    try:
        cart.total
        process(cart)
    except (KeyError, ValueError) as err:
        raise CheckoutError("failed") from err


def validate(item):
    if not item:
        raise ValueError("empty")
"#;

    fn analyze(source: &str, rel_path: &str) -> FileAnalysis {
        let tree = parse_source(&PythonLanguage.tree_sitter_language(), source).unwrap();
        let root = TreeSitterNode::root(&tree, source);
        assert!(!root.has_error(), "fixture must parse cleanly");
        let ctx = ExtractContext {
            rel_path,
            content_hash: "hash",
            include_source: false,
        };
        PythonLanguage.extract(&root, &ctx)
    }

    fn fixture() -> FileAnalysis {
        analyze(FIXTURE, "shop/cart.py")
    }

    #[test]
    fn extracts_functions_with_parent_class() {
        let analysis = fixture();
        let functions: Vec<(&str, u32, Option<&str>, bool)> = analysis
            .functions
            .iter()
            .map(|f| {
                (
                    f.name.as_str(),
                    f.start_line,
                    f.parent_class.as_deref(),
                    f.is_public,
                )
            })
            .collect();

        assert_eq!(
            functions,
            vec![
                ("__init__", 19, Some("Cart"), false),
                ("total", 23, Some("Cart"), true),
                ("_add", 27, Some("Cart"), false),
                ("checkout", 34, None, true),
                ("validate", 42, None, true),
            ]
        );
        assert!(analysis.functions.iter().all(|f| f.source_excerpt.is_none()));
    }

    #[test]
    fn extracts_classes_with_reduced_bases() {
        let analysis = fixture();
        let cart = analysis.classes.iter().find(|c| c.name == "Cart").unwrap();
        assert_eq!(cart.start_line, 16);
        assert_eq!(cart.bases, vec!["Base".to_string(), "Sized".to_string()]);

        let base = analysis.classes.iter().find(|c| c.name == "Base").unwrap();
        assert!(base.bases.is_empty());
    }

    #[test]
    fn extracts_call_sites_inside_functions() {
        let analysis = fixture();
        let calls: Vec<(&str, &str, u32)> = analysis
            .calls
            .iter()
            .map(|c| (c.caller.as_str(), c.called_name.as_str(), c.call_line))
            .collect();

        assert!(calls.contains(&("total", "sum", 24)));
        assert!(calls.contains(&("_add", "append", 28)));
        assert!(calls.contains(&("_add", "validate", 29)));
        assert!(calls.contains(&("checkout", "process", 37)));
        assert!(calls.contains(&("validate", "ValueError", 44)));
        // Decorator arguments at module level are not call sites
        assert!(!calls.iter().any(|(_, name, _)| *name == "route"));
    }

    #[test]
    fn extracts_variables_by_scope() {
        let analysis = fixture();
        let variables: Vec<(&str, u32, &str)> = analysis
            .variables
            .iter()
            .map(|v| (v.name.as_str(), v.definition_line, v.scope.as_str()))
            .collect();

        assert_eq!(
            variables,
            vec![
                ("TAX_RATE", 7, "module"),
                ("a", 8, "module"),
                ("b", 8, "module"),
                ("subtotal", 24, "function:total"),
            ]
        );
    }

    #[test]
    fn usage_sites_are_limited_to_known_variables() {
        let analysis = fixture();
        let mut usages: Vec<(&str, &str, u32)> = analysis
            .variable_usages
            .iter()
            .map(|u| (u.variable_name.as_str(), u.function_name.as_str(), u.usage_line))
            .collect();
        usages.sort_unstable();

        assert_eq!(
            usages,
            vec![("TAX_RATE", "total", 25), ("subtotal", "total", 25)]
        );
    }

    #[test]
    fn extracts_imports() {
        let analysis = fixture();
        let imports: Vec<(&str, &str, Option<&str>, bool)> = analysis
            .imports
            .iter()
            .map(|i| {
                (
                    i.imported_name.as_str(),
                    i.import_type.as_str(),
                    i.alias.as_deref(),
                    i.is_relative,
                )
            })
            .collect();

        assert_eq!(
            imports,
            vec![
                ("os", "module", None, false),
                ("collections.abc", "module", Some("cabc"), false),
                ("Order", "name", None, true),
                ("Item", "name", Some("LineItem"), true),
                ("*", "*", None, false),
            ]
        );
        assert_eq!(analysis.imports[2].module.as_deref(), Some(".models"));
    }

    #[test]
    fn extracts_decorators_with_targets() {
        let analysis = fixture();
        let decorators: Vec<(&str, u32, &str, DecoratorTarget)> = analysis
            .decorators
            .iter()
            .map(|d| (d.name.as_str(), d.line, d.target_name.as_str(), d.target_type))
            .collect();

        assert_eq!(
            decorators,
            vec![
                ("dataclass", 11, "Base", DecoratorTarget::Class),
                ("property", 22, "total", DecoratorTarget::Function),
                ("app.route", 32, "checkout", DecoratorTarget::Function),
                ("login_required", 33, "checkout", DecoratorTarget::Function),
            ]
        );

        let route = &analysis.decorators[2];
        let args: Vec<String> = serde_json::from_str(&route.arguments).unwrap();
        assert_eq!(args, vec!["\"/checkout\"", "methods=[\"POST\"]"]);
        assert_eq!(analysis.decorators[0].arguments, "[]");
    }

    #[test]
    fn extracts_class_and_instance_attributes() {
        let analysis = fixture();
        let attributes: Vec<(&str, &str, u32, Option<&str>, bool)> = analysis
            .attributes
            .iter()
            .map(|a| {
                (
                    a.class_name.as_str(),
                    a.name.as_str(),
                    a.definition_line,
                    a.type_hint.as_deref(),
                    a.is_class_attribute,
                )
            })
            .collect();

        assert_eq!(
            attributes,
            vec![
                ("Base", "kind", 13, Some("str"), true),
                ("Cart", "limit", 17, None, true),
                ("Cart", "items", 20, None, false),
            ]
        );
    }

    #[test]
    fn extracts_attribute_accesses() {
        let analysis = fixture();
        let accesses: Vec<(&str, &str, u32, AccessType)> = analysis
            .attribute_accesses
            .iter()
            .map(|a| {
                (
                    a.function_name.as_str(),
                    a.attribute_name.as_str(),
                    a.line,
                    a.access_type,
                )
            })
            .collect();

        assert_eq!(
            accesses,
            vec![
                ("__init__", "items", 20, AccessType::Write),
                ("total", "items", 24, AccessType::Read),
                ("_add", "items", 28, AccessType::Read),
            ]
        );
        assert!(analysis.attribute_accesses.iter().all(|a| a.class_name == "Cart"));
    }

    #[test]
    fn extracts_raised_and_caught_exceptions() {
        let analysis = fixture();
        let exceptions: Vec<(&str, u32, ExceptionContext, Option<&str>)> = analysis
            .exceptions
            .iter()
            .map(|e| (e.name.as_str(), e.line, e.context, e.function_name.as_deref()))
            .collect();

        assert_eq!(
            exceptions,
            vec![
                ("KeyError", 38, ExceptionContext::Catch, Some("checkout")),
                ("ValueError", 38, ExceptionContext::Catch, Some("checkout")),
                ("CheckoutError", 39, ExceptionContext::Raise, Some("checkout")),
                ("ValueError", 44, ExceptionContext::Raise, Some("validate")),
            ]
        );
    }

    #[test]
    fn derives_module_info_from_path() {
        let analysis = fixture();
        let module = analysis.module.unwrap();
        assert_eq!(module.name, "shop.cart");
        assert!(!module.is_package);
        assert_eq!(module.docstring.as_deref(), Some("Order processing."));

        let package = analyze("x = 1\n", "shop/__init__.py").module.unwrap();
        assert_eq!(package.name, "shop");
        assert!(package.is_package);
        assert_eq!(package.docstring, None);
    }

    #[test]
    fn source_excerpts_are_optional() {
        let source = "def f():\n    return 1\n";
        let tree = parse_source(&PythonLanguage.tree_sitter_language(), source).unwrap();
        let root = TreeSitterNode::root(&tree, source);
        let ctx = ExtractContext {
            rel_path: "f.py",
            content_hash: "h",
            include_source: true,
        };

        let analysis = PythonLanguage.extract(&root, &ctx);
        assert_eq!(
            analysis.functions[0].source_excerpt.as_deref(),
            Some("def f():\n    return 1")
        );
    }

    #[test]
    fn string_value_strips_prefix_and_quotes() {
        assert_eq!(string_value("\"\"\" Doc. \"\"\""), "Doc.");
        assert_eq!(string_value("r'raw'"), "raw");
        assert_eq!(string_value("'''x'''"), "x");
    }
}
