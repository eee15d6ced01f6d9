//! Local binding resolution.
//!
//! Resolution only sees the current compilation unit: declarations made in
//! the file bind, everything else stays [`Symbol::UNKNOWN`]. Expression
//! types are tracked just far enough to pick between overloads declared in
//! the file.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::kind::Kind;
use crate::problem::{Problem, ProblemKind};
use crate::symbols::{JavaType, Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::tree::{NodeData, NodeId, SyntaxTree};

/// Binds identifiers, declarations and invocations of `tree` and returns
/// the problems found on the way.
pub(crate) fn resolve(tree: &mut SyntaxTree) -> Vec<Problem> {
    let (symbols, bindings, problems) = {
        let mut resolver = Resolver::new(tree);
        resolver.run();
        (resolver.symbols, resolver.bindings, resolver.problems)
    };
    debug!(
        symbols = symbols.len(),
        bindings = bindings.len(),
        problems = problems.len(),
        "resolved compilation unit"
    );
    tree.symbols = symbols;
    tree.bindings = bindings;
    problems
}

/// Members declared by one type.
#[derive(Debug, Default)]
struct Members {
    fields: FxHashMap<SmolStr, SymbolId>,
    methods: Vec<SymbolId>,
}

struct Resolver<'t> {
    tree: &'t SyntaxTree,
    symbols: SymbolTable,
    bindings: FxHashMap<NodeId, SymbolId>,
    problems: Vec<Problem>,
    /// Types by simple name: declared in the file or imported.
    types: FxHashMap<SmolStr, SymbolId>,
    /// Type declarations (anonymous bodies included) and their symbols.
    classes: FxHashMap<NodeId, SymbolId>,
    members: FxHashMap<SymbolId, Members>,
    /// Variable scopes, innermost last.
    scopes: Vec<FxHashMap<SmolStr, SymbolId>>,
    /// Enclosing types, innermost last.
    class_stack: Vec<SymbolId>,
    /// Enclosing types and methods, innermost last.
    owners: Vec<SymbolId>,
}

impl<'t> Resolver<'t> {
    fn new(tree: &'t SyntaxTree) -> Self {
        Self {
            tree,
            symbols: SymbolTable::new(),
            bindings: FxHashMap::default(),
            problems: Vec::new(),
            types: FxHashMap::default(),
            classes: FxHashMap::default(),
            members: FxHashMap::default(),
            scopes: Vec::new(),
            class_stack: Vec::new(),
            owners: Vec::new(),
        }
    }

    fn run(&mut self) {
        let root = self.tree.root();
        let NodeData::CompilationUnit { imports, types, .. } = self.tree.data(root).clone() else {
            return;
        };

        for &import in &imports {
            self.declare_import(import);
        }
        self.declare_types();
        self.declare_members();

        for &ty in &types {
            self.visit(ty);
        }

        self.report_unused_imports(&imports);
    }

    fn bind(&mut self, node: NodeId, symbol: SymbolId) {
        self.bindings.insert(node, symbol);
    }

    fn name_of(&self, id: NodeId) -> SmolStr {
        self.tree
            .name(id)
            .map(SmolStr::new)
            .unwrap_or_default()
    }

    fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn report(&mut self, kind: ProblemKind, message: String, node: NodeId) {
        let Some(range) = self.tree.range(node) else {
            return;
        };
        trace!(?kind, %message, "problem");
        self.problems.push(Problem {
            kind,
            message,
            range,
        });
    }

    // === Declarations ===

    fn declare_import(&mut self, import: NodeId) {
        let NodeData::Import {
            is_static,
            qualified_name,
            on_demand,
        } = *self.tree.data(import)
        else {
            return;
        };
        if is_static || on_demand {
            return;
        }
        let qualified: SmolStr = compact(self.tree.text(qualified_name)).into();
        let name = SmolStr::new(qualified.rsplit('.').next().unwrap_or(&qualified));
        let symbol = self.symbols.push(Symbol {
            kind: SymbolKind::Type,
            name: name.clone(),
            owner: None,
            declaration: None,
            java_type: JavaType::Known(qualified),
            parameter_types: Vec::new(),
        });
        self.bind(import, symbol);
        self.types.insert(name, symbol);
    }

    /// Creates a symbol for every type declaration, anonymous bodies included.
    fn declare_types(&mut self) {
        let tree = self.tree;
        for (id, node) in tree.nodes() {
            let NodeData::ClassDecl { name, .. } = &node.data else {
                continue;
            };
            let simple = name.map(|name| self.name_of(name)).unwrap_or_default();
            let java_type = if simple.is_empty() {
                JavaType::Unknown
            } else {
                JavaType::Known(simple.clone())
            };
            let symbol = self.symbols.push(Symbol {
                kind: SymbolKind::Type,
                name: simple.clone(),
                owner: None,
                declaration: Some(id),
                java_type,
                parameter_types: Vec::new(),
            });
            self.bind(id, symbol);
            if let Some(name) = *name {
                self.bind(name, symbol);
                self.types.insert(simple, symbol);
            }
            self.classes.insert(id, symbol);
            self.members.insert(symbol, Members::default());
        }

        // Nodes are stored children first, so owners are linked afterwards.
        let classes: Vec<(NodeId, SymbolId)> = self.classes.iter().map(|(&n, &s)| (n, s)).collect();
        for (node, symbol) in classes {
            let owner = tree
                .ancestors(node)
                .find_map(|ancestor| self.classes.get(&ancestor).copied());
            if let Some(entry) = self.symbols.get_mut(symbol) {
                entry.owner = owner;
            }
        }
    }

    /// Declares fields, enum constants and methods with their signatures.
    fn declare_members(&mut self) {
        let tree = self.tree;
        let mut classes: Vec<(NodeId, SymbolId)> = self.classes.iter().map(|(&n, &s)| (n, s)).collect();
        classes.sort_unstable();

        for (class, class_symbol) in classes {
            let NodeData::ClassDecl {
                superclass,
                interfaces,
                members,
                ..
            } = tree.data(class).clone()
            else {
                continue;
            };
            for ty in superclass.into_iter().chain(interfaces) {
                self.type_ref(ty);
            }
            let class_type = self.symbols.get(class_symbol).java_type.clone();

            for member in members {
                match tree.data(member).clone() {
                    NodeData::Variable { ty, name, .. } => {
                        let java_type = ty.map(|ty| self.type_ref(ty)).unwrap_or(JavaType::Unknown);
                        self.declare_field(class_symbol, member, name, java_type);
                    }
                    NodeData::EnumConstant { name, .. } => {
                        self.declare_field(class_symbol, member, name, class_type.clone());
                    }
                    NodeData::Method {
                        return_type,
                        name,
                        parameters,
                        throws,
                        ..
                    } => {
                        let java_type = match return_type {
                            Some(ty) => self.type_ref(ty),
                            None => class_type.clone(),
                        };
                        let parameter_types = parameters
                            .iter()
                            .map(|&parameter| match tree.data(parameter) {
                                NodeData::Variable { ty: Some(ty), .. } => self.type_ref(*ty),
                                _ => JavaType::Unknown,
                            })
                            .collect();
                        for ty in throws {
                            self.type_ref(ty);
                        }
                        let method_name = self.name_of(name);
                        let symbol = self.symbols.push(Symbol {
                            kind: SymbolKind::Method,
                            name: method_name,
                            owner: Some(class_symbol),
                            declaration: Some(member),
                            java_type,
                            parameter_types,
                        });
                        self.bind(member, symbol);
                        self.bind(name, symbol);
                        if let Some(members) = self.members.get_mut(&class_symbol) {
                            members.methods.push(symbol);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn declare_field(&mut self, class: SymbolId, member: NodeId, name: NodeId, java_type: JavaType) {
        let simple = self.name_of(name);
        let symbol = self.symbols.push(Symbol {
            kind: SymbolKind::Variable,
            name: simple.clone(),
            owner: Some(class),
            declaration: Some(member),
            java_type,
            parameter_types: Vec::new(),
        });
        self.bind(member, symbol);
        self.bind(name, symbol);
        if let Some(members) = self.members.get_mut(&class) {
            members.fields.insert(simple, symbol);
        }
    }

    /// Declares a local variable or parameter in the innermost scope.
    fn declare_local(&mut self, declaration: NodeId, name: NodeId, java_type: JavaType) -> SymbolId {
        let simple = self.name_of(name);
        let owner = self.owners.last().copied();
        let symbol = self.symbols.push(Symbol {
            kind: SymbolKind::Variable,
            name: simple.clone(),
            owner,
            declaration: Some(declaration),
            java_type,
            parameter_types: Vec::new(),
        });
        self.bind(declaration, symbol);
        self.bind(name, symbol);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(simple, symbol);
        }
        symbol
    }

    // === Walk ===

    fn visit_children(&mut self, id: NodeId) {
        let tree = self.tree;
        for child in tree.node(id).children.iter().filter_map(|child| child.as_node()) {
            self.visit(child);
        }
    }

    fn visit(&mut self, id: NodeId) {
        let tree = self.tree;
        match tree.kind(id) {
            Kind::Class | Kind::Interface | Kind::Enum | Kind::AnnotationType => self.class_body(id),
            Kind::Method | Kind::Constructor => self.method(id),
            Kind::Variable => self.variable(id),
            Kind::EnumConstant => {
                if let NodeData::EnumConstant {
                    arguments, body, ..
                } = tree.data(id)
                {
                    for &argument in arguments {
                        self.expression(argument);
                    }
                    if let Some(body) = *body {
                        self.class_body(body);
                    }
                }
            }
            Kind::Block
            | Kind::Initializer
            | Kind::StaticInitializer
            | Kind::ForStatement
            | Kind::TryStatement
            | Kind::Catch
            | Kind::SwitchStatement => {
                self.push_scope();
                self.visit_children(id);
                self.pop_scope();
            }
            Kind::ForEachStatement => self.for_each(id),
            Kind::LabeledStatement => {
                if let NodeData::Labeled { statement, .. } = *tree.data(id) {
                    self.visit(statement);
                }
            }
            Kind::BreakStatement | Kind::ContinueStatement | Kind::ImportDeclaration => {}
            Kind::Modifiers => self.visit_children(id),
            Kind::PrimitiveType
            | Kind::ArrayType
            | Kind::ParameterizedType
            | Kind::UnionType
            | Kind::Wildcard
            | Kind::VarType
            | Kind::TypeParameters => {
                self.type_ref(id);
            }
            kind if is_statement(kind) || kind == Kind::CaseGroup || kind == Kind::CaseLabel => {
                self.visit_children(id)
            }
            _ => {
                self.expression(id);
            }
        }
    }

    fn class_body(&mut self, id: NodeId) {
        let Some(&symbol) = self.classes.get(&id) else {
            self.visit_children(id);
            return;
        };
        let NodeData::ClassDecl {
            modifiers, members, ..
        } = self.tree.data(id).clone()
        else {
            return;
        };
        self.visit(modifiers);

        let fields = self
            .members
            .get(&symbol)
            .map(|members| members.fields.clone())
            .unwrap_or_default();
        self.scopes.push(fields);
        self.class_stack.push(symbol);
        self.owners.push(symbol);
        for member in members {
            self.visit(member);
        }
        self.owners.pop();
        self.class_stack.pop();
        self.pop_scope();
    }

    fn method(&mut self, id: NodeId) {
        let NodeData::Method {
            modifiers,
            parameters,
            default_value,
            body,
            ..
        } = self.tree.data(id).clone()
        else {
            return;
        };
        self.visit(modifiers);
        let symbol = self.bindings.get(&id).copied();

        self.push_scope();
        if let Some(symbol) = symbol {
            self.owners.push(symbol);
        }
        for parameter in parameters {
            self.variable(parameter);
        }
        if let Some(value) = default_value {
            self.expression(value);
        }
        if let Some(body) = body {
            self.visit(body);
        }
        if symbol.is_some() {
            self.owners.pop();
        }
        self.pop_scope();
    }

    fn variable(&mut self, id: NodeId) {
        let NodeData::Variable {
            modifiers,
            ty,
            name,
            initializer,
        } = *self.tree.data(id)
        else {
            return;
        };
        self.visit(modifiers);

        // fields were declared up front
        if self.bindings.contains_key(&id) {
            if let Some(initializer) = initializer {
                self.expression(initializer);
            }
            return;
        }

        let declared = ty.map(|ty| self.type_ref(ty)).unwrap_or(JavaType::Unknown);
        let initialized = initializer.map(|initializer| self.expression(initializer));
        let java_type = match (declared, initialized) {
            (JavaType::Unknown, Some(initialized)) => initialized,
            (declared, _) => declared,
        };
        self.declare_local(id, name, java_type);
    }

    fn for_each(&mut self, id: NodeId) {
        let NodeData::ForEach {
            variable,
            expression,
            statement,
        } = *self.tree.data(id)
        else {
            return;
        };
        let iterable = self.expression(expression);

        self.push_scope();
        if let NodeData::Variable {
            modifiers, ty, name, ..
        } = *self.tree.data(variable)
        {
            self.visit(modifiers);
            let java_type = match ty.map(|ty| self.type_ref(ty)) {
                Some(JavaType::Unknown) | None => iterable.element(),
                Some(declared) => declared,
            };
            self.declare_local(variable, name, java_type);
        }
        self.visit(statement);
        self.pop_scope();
    }

    // === Types ===

    /// Resolves a type reference, binding simple type names declared in the file.
    fn type_ref(&mut self, id: NodeId) -> JavaType {
        let tree = self.tree;
        match tree.data(id) {
            NodeData::PrimitiveType { keyword } => JavaType::known(tree.token(*keyword).text.clone()),
            NodeData::Identifier { .. } => {
                let name = self.name_of(id);
                match self.types.get(&name).copied() {
                    Some(symbol) => {
                        self.bind(id, symbol);
                        self.symbols.get(symbol).java_type.clone()
                    }
                    None => JavaType::Known(name),
                }
            }
            NodeData::MemberSelect { .. } => JavaType::known(compact(tree.text(id))),
            NodeData::ParameterizedType { ty, arguments } => {
                for &argument in arguments {
                    self.type_ref(argument);
                }
                self.type_ref(*ty)
            }
            NodeData::ArrayType { ty } => self.type_ref(*ty).array(),
            NodeData::UnionType { types } => {
                for &ty in types {
                    self.type_ref(ty);
                }
                JavaType::Unknown
            }
            _ => {
                for child in tree.node(id).children.iter().filter_map(|child| child.as_node()) {
                    self.type_ref(child);
                }
                JavaType::Unknown
            }
        }
    }

    // === Expressions ===

    /// Resolves an expression and returns its static type.
    fn expression(&mut self, id: NodeId) -> JavaType {
        let tree = self.tree;
        let kind = tree.kind(id);
        match tree.data(id).clone() {
            NodeData::Literal { .. } => literal_type(kind),
            NodeData::Identifier { .. } => self.identifier(id),
            NodeData::MemberSelect {
                expression,
                identifier,
            } => self.member_select(expression, identifier),
            NodeData::MethodInvocation {
                method_select,
                arguments,
            } => self.method_invocation(id, method_select, &arguments),
            NodeData::NewClass {
                enclosing,
                identifier,
                arguments,
                body,
            } => {
                if let Some(enclosing) = enclosing {
                    self.expression(enclosing);
                }
                let java_type = self.type_ref(identifier);
                for argument in arguments {
                    self.expression(argument);
                }
                if let Some(body) = body {
                    self.class_body(body);
                }
                java_type
            }
            NodeData::NewArray {
                ty,
                dimensions,
                initializers,
            } => {
                let element = ty.map(|ty| self.type_ref(ty));
                for dimension in &dimensions {
                    self.visit_children(*dimension);
                }
                for initializer in initializers {
                    self.expression(initializer);
                }
                let mut java_type = element.unwrap_or(JavaType::Unknown);
                for _ in 0..dimensions.len().max(1) {
                    java_type = java_type.array();
                }
                java_type
            }
            NodeData::TypeCast { ty, expression } => {
                let target = self.type_ref(ty);
                let operand = self.expression(expression);
                if let (JavaType::Known(from), JavaType::Known(to)) = (&operand, &target) {
                    if operand.is(to) {
                        self.report(
                            ProblemKind::UnnecessaryCast,
                            format!("Unnecessary cast from {from} to {to}"),
                            id,
                        );
                    }
                }
                target
            }
            NodeData::InstanceOf { expression, ty } => {
                self.expression(expression);
                self.type_ref(ty);
                JavaType::known("boolean")
            }
            NodeData::Parenthesized { expression } => self.expression(expression),
            NodeData::Conditional {
                condition,
                true_expression,
                false_expression,
            } => {
                self.expression(condition);
                let when_true = self.expression(true_expression);
                let when_false = self.expression(false_expression);
                match (when_true, when_false) {
                    (JavaType::Null, other) | (other, JavaType::Null) => other,
                    (a, b) if a == b => a,
                    _ => JavaType::Unknown,
                }
            }
            NodeData::Lambda { parameters, body } => {
                self.push_scope();
                for parameter in parameters {
                    self.variable(parameter);
                }
                self.visit(body);
                self.pop_scope();
                JavaType::Unknown
            }
            NodeData::MethodReference { expression, .. } => {
                self.expression(expression);
                JavaType::Unknown
            }
            NodeData::Assignment {
                variable,
                expression,
            } => {
                let target = self.expression(variable);
                self.expression(expression);
                if kind == Kind::Assignment {
                    self.check_self_assignment(id, variable, expression);
                }
                target
            }
            NodeData::Binary { .. } => self.binary(id),
            NodeData::Unary { expression } => {
                let operand = self.expression(expression);
                if kind == Kind::LogicalComplement {
                    JavaType::known("boolean")
                } else {
                    operand
                }
            }
            NodeData::ArrayAccess { expression, index } => {
                let array = self.expression(expression);
                self.expression(index);
                array.element()
            }
            NodeData::PrimitiveType { .. }
            | NodeData::ArrayType { .. }
            | NodeData::ParameterizedType { .. } => self.type_ref(id),
            NodeData::Annotation {
                annotation_type,
                arguments,
            } => {
                self.type_ref(annotation_type);
                for argument in arguments {
                    // `name = value` pairs name an annotation element, not a variable
                    match *tree.data(argument) {
                        NodeData::Assignment { expression, .. } => {
                            self.expression(expression);
                        }
                        _ => {
                            self.expression(argument);
                        }
                    }
                }
                JavaType::Unknown
            }
            _ => {
                self.visit_children(id);
                JavaType::Unknown
            }
        }
    }

    /// Resolves a binary operator chain along its left spine.
    fn binary(&mut self, id: NodeId) -> JavaType {
        let tree = self.tree;
        let mut spine = Vec::new();
        let mut current = id;
        while let NodeData::Binary { left, right } = *tree.data(current) {
            spine.push((tree.kind(current), right));
            current = left;
        }
        let mut java_type = self.expression(current);
        for (kind, right) in spine.into_iter().rev() {
            let right = self.expression(right);
            java_type = binary_type(kind, &java_type, &right);
        }
        java_type
    }

    fn identifier(&mut self, id: NodeId) -> JavaType {
        let name = self.name_of(id);
        match name.as_str() {
            "this" => {
                return self
                    .class_stack
                    .last()
                    .map(|&class| self.symbols.get(class).java_type.clone())
                    .unwrap_or(JavaType::Unknown);
            }
            "super" => return JavaType::Unknown,
            _ => {}
        }

        let variable = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).copied());
        if let Some(symbol) = variable {
            trace!(%name, ?symbol, "bound variable");
            self.bind(id, symbol);
            return self.symbols.get(symbol).java_type.clone();
        }
        if let Some(&symbol) = self.types.get(&name) {
            self.bind(id, symbol);
            return self.symbols.get(symbol).java_type.clone();
        }
        JavaType::Unknown
    }

    /// Returns the type declared in this file that `java_type` names.
    fn class_of(&self, java_type: &JavaType) -> Option<SymbolId> {
        let JavaType::Known(name) = java_type else {
            return None;
        };
        let simple = name.rsplit('.').next().unwrap_or(name);
        let symbol = *self.types.get(simple)?;
        self.members.contains_key(&symbol).then_some(symbol)
    }

    fn member_select(&mut self, expression: NodeId, identifier: NodeId) -> JavaType {
        let receiver = self.expression(expression);
        let name = self.name_of(identifier);
        if name == "class" {
            return JavaType::known("Class");
        }
        if receiver.element() != JavaType::Unknown && name == "length" {
            return JavaType::known("int");
        }
        let field = self
            .class_of(&receiver)
            .and_then(|class| self.members.get(&class))
            .and_then(|members| members.fields.get(&name).copied());
        match field {
            Some(symbol) => {
                self.bind(identifier, symbol);
                self.symbols.get(symbol).java_type.clone()
            }
            None => JavaType::Unknown,
        }
    }

    fn method_invocation(&mut self, id: NodeId, method_select: NodeId, arguments: &[NodeId]) -> JavaType {
        let tree = self.tree;
        let (name_node, candidates) = match *tree.data(method_select) {
            NodeData::Identifier { .. } => {
                let name = self.name_of(method_select);
                let candidates = self
                    .class_stack
                    .iter()
                    .rev()
                    .map(|class| self.methods_named(*class, &name))
                    .find(|methods| !methods.is_empty())
                    .unwrap_or_default();
                (method_select, candidates)
            }
            NodeData::MemberSelect {
                expression,
                identifier,
            } => {
                let receiver = self.expression(expression);
                let name = self.name_of(identifier);
                let candidates = self
                    .class_of(&receiver)
                    .map(|class| self.methods_named(class, &name))
                    .unwrap_or_default();
                (identifier, candidates)
            }
            _ => {
                self.expression(method_select);
                (method_select, Vec::new())
            }
        };

        let argument_types: Vec<JavaType> = arguments.iter().map(|&argument| self.expression(argument)).collect();

        match self.select_overload(&candidates, &argument_types) {
            Some(symbol) => {
                trace!(name = %self.symbols.get(symbol).name, ?symbol, "bound invocation");
                self.bind(id, symbol);
                self.bind(name_node, symbol);
                self.symbols.get(symbol).java_type.clone()
            }
            None => JavaType::Unknown,
        }
    }

    fn methods_named(&self, class: SymbolId, name: &str) -> Vec<SymbolId> {
        self.members
            .get(&class)
            .map(|members| {
                members
                    .methods
                    .iter()
                    .copied()
                    .filter(|&method| self.symbols.get(method).name == name)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Picks the unique best applicable overload.
    fn select_overload(&self, candidates: &[SymbolId], arguments: &[JavaType]) -> Option<SymbolId> {
        let mut best: Option<(u32, SymbolId)> = None;
        let mut ambiguous = false;
        for &candidate in candidates {
            let parameters = &self.symbols.get(candidate).parameter_types;
            if parameters.len() != arguments.len() {
                continue;
            }
            let score = parameters
                .iter()
                .zip(arguments)
                .try_fold(0u32, |total, (parameter, argument)| {
                    Some(total + applicability(parameter, argument)?)
                });
            let Some(score) = score else {
                continue;
            };
            match best {
                Some((best_score, _)) if score < best_score => {}
                Some((best_score, _)) if score == best_score => ambiguous = true,
                _ => {
                    best = Some((score, candidate));
                    ambiguous = false;
                }
            }
        }
        if ambiguous {
            debug!(candidates = candidates.len(), "ambiguous invocation left unresolved");
            return None;
        }
        best.map(|(_, symbol)| symbol)
    }

    // === Problems ===

    fn check_self_assignment(&mut self, assignment: NodeId, variable: NodeId, expression: NodeId) {
        let target = self.bindings.get(&self.assigned_name(variable)).copied();
        let value = self.bindings.get(&self.assigned_name(expression)).copied();
        let (Some(target), Some(value)) = (target, value) else {
            return;
        };
        if target == value && self.symbols.get(target).is_variable() {
            let name = self.symbols.get(target).name.clone();
            self.report(
                ProblemKind::AssignmentHasNoEffect,
                format!("The assignment to variable {name} has no effect"),
                assignment,
            );
        }
    }

    /// Returns the identifier naming the variable of `x` or `this.x`.
    fn assigned_name(&self, id: NodeId) -> NodeId {
        match *self.tree.data(id) {
            NodeData::MemberSelect {
                expression,
                identifier,
            } if self.tree.name(expression) == Some("this") => identifier,
            NodeData::Parenthesized { expression } => self.assigned_name(expression),
            _ => id,
        }
    }

    fn report_unused_imports(&mut self, imports: &[NodeId]) {
        let tree = self.tree;
        let used: FxHashSet<&str> = tree
            .nodes()
            .filter(|(_, node)| node.kind == Kind::Identifier)
            .filter(|(id, _)| {
                !tree.ancestors(*id).any(|ancestor| {
                    matches!(
                        tree.kind(ancestor),
                        Kind::ImportDeclaration | Kind::PackageDeclaration
                    )
                })
            })
            .filter_map(|(id, _)| tree.name(id))
            .collect();

        for &import in imports {
            let NodeData::Import {
                qualified_name,
                on_demand,
                ..
            } = *tree.data(import)
            else {
                continue;
            };
            if on_demand {
                continue;
            }
            let qualified = compact(tree.text(qualified_name));
            let simple = qualified.rsplit('.').next().unwrap_or(&qualified);
            if !used.contains(simple) {
                self.report(
                    ProblemKind::UnusedImport,
                    format!("The import {qualified} is never used"),
                    qualified_name,
                );
            }
        }
    }
}

/// Removes whitespace and comments from a qualified name.
fn compact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with("//") {
            rest = rest.find('\n').map_or("", |end| &rest[end..]);
        } else if rest.starts_with("/*") {
            rest = rest.find("*/").map_or("", |end| &rest[end + 2..]);
        } else {
            if !c.is_whitespace() {
                out.push(c);
            }
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

fn is_statement(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::EmptyStatement
            | Kind::ExpressionStatement
            | Kind::IfStatement
            | Kind::AssertStatement
            | Kind::WhileStatement
            | Kind::DoStatement
            | Kind::ReturnStatement
            | Kind::ThrowStatement
            | Kind::SynchronizedStatement
    )
}

fn literal_type(kind: Kind) -> JavaType {
    let name = match kind {
        Kind::IntLiteral => "int",
        Kind::LongLiteral => "long",
        Kind::FloatLiteral => "float",
        Kind::DoubleLiteral => "double",
        Kind::BooleanLiteral => "boolean",
        Kind::CharLiteral => "char",
        Kind::StringLiteral | Kind::TextBlock => "String",
        Kind::NullLiteral => return JavaType::Null,
        _ => return JavaType::Unknown,
    };
    JavaType::known(name)
}

const NUMERIC_RANK: &[&str] = &["byte", "short", "char", "int", "long", "float", "double"];

fn numeric_rank(java_type: &JavaType) -> Option<usize> {
    match java_type {
        JavaType::Known(name) => NUMERIC_RANK.iter().position(|n| *n == name.as_str()),
        _ => None,
    }
}

fn binary_type(kind: Kind, left: &JavaType, right: &JavaType) -> JavaType {
    match kind {
        Kind::LessThan
        | Kind::GreaterThan
        | Kind::LessThanOrEqualTo
        | Kind::GreaterThanOrEqualTo
        | Kind::EqualTo
        | Kind::NotEqualTo
        | Kind::ConditionalAnd
        | Kind::ConditionalOr => JavaType::known("boolean"),
        Kind::Plus if left.is("String") || right.is("String") => JavaType::known("String"),
        Kind::LeftShift | Kind::RightShift | Kind::UnsignedRightShift => match numeric_rank(left) {
            Some(rank) => JavaType::known(NUMERIC_RANK[rank.max(3)]),
            None => JavaType::Unknown,
        },
        Kind::And | Kind::Or | Kind::Xor if left.is("boolean") && right.is("boolean") => {
            JavaType::known("boolean")
        }
        _ => match (numeric_rank(left), numeric_rank(right)) {
            // binary numeric promotion: at least int
            (Some(a), Some(b)) => JavaType::known(NUMERIC_RANK[a.max(b).max(3)]),
            _ => JavaType::Unknown,
        },
    }
}

/// Returns true if a primitive `from` widens to `to`.
fn widens(from: &str, to: &str) -> bool {
    let targets: &[&str] = match from {
        "byte" => &["short", "int", "long", "float", "double"],
        "short" | "char" => &["int", "long", "float", "double"],
        "int" => &["long", "float", "double"],
        "long" => &["float", "double"],
        "float" => &["double"],
        _ => &[],
    };
    targets.contains(&to)
}

/// Scores how well an argument fits a parameter; `None` if it cannot.
///
/// An exact match scores 2, a conversion (to `Object`, from `null`, primitive
/// widening) scores 1. Unknown types and unrelated reference types score 0
/// since the class hierarchy is not known here.
fn applicability(parameter: &JavaType, argument: &JavaType) -> Option<u32> {
    match (parameter, argument) {
        (JavaType::Unknown, _) | (_, JavaType::Unknown) => Some(0),
        (JavaType::Null, _) => Some(0),
        (_, JavaType::Null) => (!parameter.is_primitive()).then_some(1),
        (JavaType::Known(p), JavaType::Known(a)) => {
            if argument.is(p) {
                Some(2)
            } else if parameter.is("Object") || parameter.is("java.lang.Object") {
                Some(1)
            } else if parameter.is_primitive() && argument.is_primitive() {
                widens(a, p).then_some(1)
            } else if parameter.is_primitive() || argument.is_primitive() {
                None
            } else {
                Some(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use pretty_assertions::assert_eq;

    fn invocations(tree: &SyntaxTree) -> Vec<NodeId> {
        tree.nodes()
            .filter(|(_, node)| node.kind == Kind::MethodInvocation)
            .map(|(id, _)| id)
            .collect()
    }

    #[test]
    fn test_locals_shadow_fields() {
        let result = parse("class A { int x; void f() { int x = 1; x = 2; this.x = 3; } }");
        let tree = &result.tree;
        let identifiers: Vec<NodeId> = tree
            .nodes()
            .filter(|(id, node)| node.kind == Kind::Identifier && tree.name(*id) == Some("x"))
            .map(|(id, _)| id)
            .collect();
        // field name, local name, `x = 2`, `this.x`
        assert_eq!(identifiers.len(), 4);
        let field = tree.symbol_id(identifiers[0]);
        let local = tree.symbol_id(identifiers[1]);
        assert_ne!(field, local);
        assert_eq!(tree.symbol_id(identifiers[2]), local);
        assert_eq!(tree.symbol_id(identifiers[3]), field);
        assert_eq!(tree.symbol(identifiers[1]).java_type, JavaType::known("int"));
    }

    #[test]
    fn test_overload_prefers_exact_match() {
        let result = parse(
            "class A { void m(String s) {} void m(Object o) {} void f() { m(\"a\"); m(new Object()); m(1); } }",
        );
        let tree = &result.tree;
        let calls = invocations(tree);
        assert_eq!(calls.len(), 3);
        assert_eq!(tree.symbol(calls[0]).parameter_types, vec![JavaType::known("String")]);
        assert_eq!(tree.symbol(calls[1]).parameter_types, vec![JavaType::known("Object")]);
        assert_eq!(tree.symbol(calls[2]).parameter_types, vec![JavaType::known("Object")]);
    }

    #[test]
    fn test_ambiguous_and_external_calls_are_unknown() {
        let result = parse(
            "class A { void m(String s) {} void m(Integer i) {} void f(Object o) { m(o); o.toString(); } }",
        );
        let tree = &result.tree;
        for call in invocations(tree) {
            assert!(tree.symbol(call).is_unknown());
        }
    }

    #[test]
    fn test_select_on_declared_type() {
        let result = parse(
            "class A { B b; void f() { b.g(1); } } class B { void g(long l) {} }",
        );
        let tree = &result.tree;
        let call = invocations(tree)[0];
        assert_eq!(tree.symbol(call).name, "g");
        assert!(tree.symbol(call).is_method());
    }

    #[test]
    fn test_lambda_and_catch_parameters() {
        let result = parse(
            "class A { void f() { try { } catch (Exception e) { e.printStackTrace(); } run(x -> x); } }",
        );
        let tree = &result.tree;
        let names: Vec<(&str, bool)> = tree
            .nodes()
            .filter(|(_, node)| node.kind == Kind::Identifier)
            .filter_map(|(id, _)| Some((tree.name(id)?, tree.symbol(id).is_variable())))
            .filter(|(name, _)| *name == "e" || *name == "x")
            .collect();
        assert_eq!(names, vec![("e", true), ("e", true), ("x", true), ("x", true)]);
    }

    #[test]
    fn test_problems() {
        let result = parse(
            "import java.util.List;\nimport java.util.Map;\nclass A { int x; List<String> l; void f(int y) { y = y; this.x = x; int z = (int) y; } }",
        );
        let messages: Vec<&str> = result.problems.iter().map(|p| p.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "The assignment to variable y has no effect",
                "The assignment to variable x has no effect",
                "Unnecessary cast from int to int",
                "The import java.util.Map is never used",
            ]
        );
        let unused = &result.problems[3];
        assert_eq!(unused.range.start.line, 2);
        assert_eq!(unused.range.start.column, 7);
    }

    #[test]
    fn test_long_operator_chain_type() {
        let terms = vec!["y"; 4000].join(" + ");
        let result = parse(&format!("class A {{ void f(int y) {{ int z = (int) ({terms}); String s = \"\" + {terms}; }} }}"));
        assert!(result.errors.is_empty());
        let messages: Vec<&str> = result.problems.iter().map(|p| p.message.as_str()).collect();
        assert_eq!(messages, vec!["Unnecessary cast from int to int"]);
        let y = result
            .tree
            .nodes()
            .filter(|(id, node)| node.kind == Kind::Identifier && result.tree.name(*id) == Some("y"))
            .count();
        assert_eq!(y, 8001);
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact("java . util /* c */ .List"), "java.util.List");
    }
}
