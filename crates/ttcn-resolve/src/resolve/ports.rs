//! Port type bodies and the connection rules between them.
//!
//! Checking a port type builds four [`TypeSet`]s from its `in`, `out` and
//! `inout` lists, interprets its extension attributes and, for translation
//! ports, validates the providers and type mappings (see
//! [`mappings`](crate::resolve::mappings)). The finished [`PortInfo`] is
//! what `connect` and `map` statements are checked against.
//!
//! Asking for the [`PortInfo`] of a port type that has not been checked is
//! a broken invariant and panics.

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::{Checker, Context};
use crate::resolve::mappings::MappingTable;
use crate::resolve::types::Ty;
use indexmap::IndexSet;
use serde::Serialize;
use ttcn_ast::ast::{
    DefKind, PortAttribute, PortAttributeKind, PortBody, PortMode, TypeExpr, TypeKind, TypeMapping,
};
use ttcn_ast::foundation::{Identifier, RefId, Span, TypeId};

/// Ordered set of message types or signatures.
///
/// Types are stored after alias resolution; the position of a type is the
/// index the emitter uses for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeSet {
    types: IndexSet<Ty>,
    names: Vec<String>,
}

impl TypeSet {
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, ty: Ty) -> bool {
        self.types.contains(&ty)
    }

    /// Position of a type in the set.
    pub fn index_of(&self, ty: Ty) -> Option<usize> {
        self.types.get_index_of(&ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = Ty> + '_ {
        self.types.iter().copied()
    }

    /// Display name of the type at `index`.
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    fn entries(&self) -> impl Iterator<Item = (Ty, &str)> + '_ {
        self.types
            .iter()
            .copied()
            .zip(self.names.iter().map(String::as_str))
    }

    /// Whether every type of `other` is in this set.
    pub fn covers(&self, other: &TypeSet) -> bool {
        other.iter().all(|ty| self.contains(ty))
    }

    fn insert(&mut self, ty: Ty, name: String) -> bool {
        if self.types.insert(ty) {
            self.names.push(name);
            true
        } else {
            false
        }
    }
}

/// Role of a port type in translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PortCategory {
    #[default]
    Regular,
    /// Carries the `provider` attribute
    Provider,
    /// Translation port on top of one or more providers
    User,
}

/// Test port interface the generated port class implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TestPortApi {
    #[default]
    Regular,
    /// Connections only
    Internal,
    /// Uses the module's `address` type
    Address,
}

/// Checked port type.
#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    pub mode: PortMode,
    pub category: PortCategory,
    pub api: TestPortApi,
    /// Translation written as a `user` extension attribute
    pub legacy: bool,
    pub in_msgs: TypeSet,
    pub out_msgs: TypeSet,
    pub in_sigs: TypeSet,
    pub out_sigs: TypeSet,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<TypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_table: Option<MappingTable>,
    #[serde(skip)]
    queue: bool,
    #[serde(skip)]
    getreply: bool,
    #[serde(skip)]
    catch: bool,
}

impl PortInfo {
    fn new(mode: PortMode) -> Self {
        Self {
            mode,
            category: PortCategory::Regular,
            api: TestPortApi::Regular,
            legacy: false,
            in_msgs: TypeSet::default(),
            out_msgs: TypeSet::default(),
            in_sigs: TypeSet::default(),
            out_sigs: TypeSet::default(),
            providers: Vec::new(),
            mapping_table: None,
            queue: false,
            getreply: false,
            catch: false,
        }
    }

    /// Whether the port needs an incoming queue.
    pub fn has_queue(&self) -> bool {
        self.queue
    }

    /// Whether `getreply` is allowed: some outgoing signature is blocking.
    pub fn getreply_allowed(&self) -> bool {
        self.getreply
    }

    /// Whether `catch` is allowed: some outgoing signature has exceptions.
    pub fn catch_allowed(&self) -> bool {
        self.catch
    }

    pub fn is_internal(&self) -> bool {
        self.api == TestPortApi::Internal
    }

    pub fn is_translation(&self) -> bool {
        self.category == PortCategory::User
    }

    /// Whether `provider` is one of the providers of this translation port.
    pub fn is_translate(&self, provider: TypeId) -> bool {
        self.providers.contains(&provider)
    }

    /// Whether everything this port sends can be received by `other`.
    pub fn is_connectable(&self, other: &PortInfo) -> bool {
        other.in_msgs.covers(&self.out_msgs) && other.in_sigs.covers(&self.out_sigs)
    }

    /// Whether this test component port can be mapped to the system port
    /// `system`.
    pub fn is_mappable(&self, system: &PortInfo) -> bool {
        system.out_msgs.covers(&self.out_msgs)
            && system.out_sigs.covers(&self.out_sigs)
            && self.in_msgs.covers(&system.in_msgs)
            && self.in_sigs.covers(&system.in_sigs)
    }
}

impl<'p> Checker<'p> {
    /// Checked body of a port type.
    ///
    /// # Panics
    /// Panics if the port type has not been checked.
    pub fn port_info(&self, port: TypeId) -> &PortInfo {
        match self.ports.get(&port) {
            Some(info) => info,
            None => panic!("port type {port} used before it was checked"),
        }
    }

    /// `connect`-style compatibility in one direction.
    pub fn is_connectable(&self, port: TypeId, other: TypeId) -> bool {
        self.port_info(port).is_connectable(self.port_info(other))
    }

    /// `map`-style compatibility of a test component port with a system
    /// port. A port type is always mappable to itself.
    pub fn is_mappable(&self, port: TypeId, system: TypeId) -> bool {
        port == system || self.port_info(port).is_mappable(self.port_info(system))
    }

    /// Notes naming each outgoing type of `port` that `other` cannot receive.
    pub(crate) fn report_connection_errors(&self, port: TypeId, other: TypeId) -> Vec<String> {
        let mine = self.port_info(port);
        let theirs = self.port_info(other);
        let my_name = self.type_display(Ty::Defined(port));
        let other_name = self.type_display(Ty::Defined(other));
        let mut notes = Vec::new();
        for (ty, name) in mine.out_msgs.entries() {
            if !theirs.in_msgs.contains(ty) {
                notes.push(format!(
                    "Outgoing message type `{name}' of port type `{my_name}' is not present on the incoming list of port type `{other_name}'"
                ));
            }
        }
        for (ty, name) in mine.out_sigs.entries() {
            if !theirs.in_sigs.contains(ty) {
                notes.push(format!(
                    "Outgoing signature `{name}' of port type `{my_name}' is not present on the incoming list of port type `{other_name}'"
                ));
            }
        }
        notes
    }

    /// Notes naming each type that breaks the mapping of `port` to the
    /// system port `system`.
    pub(crate) fn report_mapping_errors(&self, port: TypeId, system: TypeId) -> Vec<String> {
        let mine = self.port_info(port);
        let theirs = self.port_info(system);
        let my_name = self.type_display(Ty::Defined(port));
        let system_name = self.type_display(Ty::Defined(system));
        let mut notes = Vec::new();
        for (ty, name) in mine.out_msgs.entries() {
            if !theirs.out_msgs.contains(ty) {
                notes.push(format!(
                    "Outgoing message type `{name}' of test component port type `{my_name}' is not present on the outgoing list of system port type `{system_name}'"
                ));
            }
        }
        for (ty, name) in mine.out_sigs.entries() {
            if !theirs.out_sigs.contains(ty) {
                notes.push(format!(
                    "Outgoing signature `{name}' of test component port type `{my_name}' is not present on the outgoing list of system port type `{system_name}'"
                ));
            }
        }
        for (ty, name) in theirs.in_msgs.entries() {
            if !mine.in_msgs.contains(ty) {
                notes.push(format!(
                    "Incoming message type `{name}' of system port type `{system_name}' is not present on the incoming list of test component port type `{my_name}'"
                ));
            }
        }
        for (ty, name) in theirs.in_sigs.entries() {
            if !mine.in_sigs.contains(ty) {
                notes.push(format!(
                    "Incoming signature `{name}' of system port type `{system_name}' is not present on the incoming list of test component port type `{my_name}'"
                ));
            }
        }
        notes
    }

    // === Port type bodies ===

    /// Check a port type body once.
    ///
    /// A provider chain that leads back to a port being checked is left to
    /// the outer check.
    pub(crate) fn check_port_type(&mut self, port: TypeId) {
        if self.ports.contains_key(&port) || !self.ports_in_progress.insert(port) {
            return;
        }
        let program = self.program;
        let type_def = program.type_def(port);
        let Some(body) = type_def.as_port() else {
            self.ports_in_progress.remove(&port);
            return;
        };
        let span = type_def.span;
        self.push_context(Context::static_context());

        let mut info = PortInfo::new(body.mode);
        self.chk_all_directives(body, span);
        self.chk_port_list(&mut info, &body.in_list, true, false, span);
        self.chk_port_list(&mut info, &body.out_list, false, true, span);
        self.chk_port_list(&mut info, &body.inout_list, true, true, span);

        let has_providers = body.translation.is_some() || body.user_attribute().is_some();
        if !has_providers && !body.variables.is_empty() {
            self.emit(CompileError::new(
                ErrorKind::InvalidPort,
                span,
                "Port variables can only be used when the port is a translation port".to_string(),
            ));
        }

        self.chk_port_attributes(body, &mut info);
        if info.category == PortCategory::User {
            self.chk_user_side(port, body, &mut info);
        } else if info.api == TestPortApi::Address {
            self.chk_address_type(port, span);
        }
        self.set_signature_flags(&mut info);

        self.pop_context();
        self.ports_in_progress.remove(&port);
        tracing::debug!(
            port = %self.type_display(Ty::Defined(port)),
            category = ?info.category,
            in_msgs = info.in_msgs.len(),
            out_msgs = info.out_msgs.len(),
            "port type checked"
        );
        self.ports.insert(port, info);
    }

    fn chk_all_directives(&mut self, body: &PortBody, span: Span) {
        let mut warnings = Vec::new();
        if body.inout_all {
            if body.in_all {
                warnings.push("Redundant `in all' and `inout all' directives");
            }
            if body.out_all {
                warnings.push("Redundant `out all' and `inout all' directives");
            }
            warnings.push("Unsupported `inout all' directive was ignored");
        } else {
            if body.in_all {
                warnings.push("Unsupported `in all' directive was ignored");
            }
            if body.out_all {
                warnings.push("Unsupported `out all' directive was ignored");
            }
        }
        for warning in warnings {
            self.emit(CompileError::warning(
                ErrorKind::InvalidPort,
                span,
                warning.to_string(),
            ));
        }
    }

    fn chk_port_list(
        &mut self,
        info: &mut PortInfo,
        list: &[TypeExpr],
        incoming: bool,
        outgoing: bool,
        span: Span,
    ) {
        let verb = match (incoming, outgoing) {
            (true, true) => "sent or received",
            (true, false) => "received",
            _ => "sent",
        };
        for entry in list {
            let ty = self.chk_type_expr(entry);
            let last = self.refd_last(ty);
            if last.is_error() {
                continue;
            }
            let name = self.type_display(last);
            if self.is_component_internal(ty) {
                self.emit(CompileError::new(
                    ErrorKind::InvalidPort,
                    span,
                    format!(
                        "Type `{name}' cannot be {verb} on a port, because it is or contains a port or default type"
                    ),
                ));
            }
            if matches!(self.last_kind(ty), Some(TypeKind::Signature(_))) {
                if info.mode == PortMode::Message {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidPort,
                        span,
                        format!("Signature `{name}' cannot be used on a message based port"),
                    ));
                }
                if incoming {
                    self.add_listed(&mut info.in_sigs, last, &name, "incoming signature", "Signature", span);
                }
                if outgoing {
                    self.add_listed(&mut info.out_sigs, last, &name, "outgoing signature", "Signature", span);
                }
            } else {
                if info.mode == PortMode::Procedure {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidPort,
                        span,
                        format!("Data type `{name}' cannot be {verb} on a procedure based port"),
                    ));
                }
                if incoming {
                    self.add_listed(&mut info.in_msgs, last, &name, "incoming message type", "Type", span);
                }
                if outgoing {
                    self.add_listed(&mut info.out_msgs, last, &name, "outgoing message type", "Type", span);
                }
            }
        }
    }

    fn add_listed(&mut self, set: &mut TypeSet, ty: Ty, name: &str, what: &str, noun: &str, span: Span) {
        if !set.insert(ty, name.to_string()) {
            self.emit(
                CompileError::new(ErrorKind::DuplicateName, span, format!("Duplicate {what} `{name}'"))
                    .with_note(format!("{noun} `{name}' is already listed here")),
            );
        }
    }

    fn chk_port_attributes(&mut self, body: &PortBody, info: &mut PortInfo) {
        let translation = body.translation.is_some();
        if translation {
            info.category = PortCategory::User;
        }
        for PortAttribute { kind, span } in &body.attributes {
            let span = *span;
            match kind {
                PortAttributeKind::Internal => {
                    match info.api {
                        TestPortApi::Regular => {}
                        TestPortApi::Internal => self.attribute_warning(span, "Duplicate attribute `internal'"),
                        TestPortApi::Address => self.attribute_error(
                            span,
                            "Attributes `address' and `internal' cannot be used at the same time",
                        ),
                    }
                    info.api = TestPortApi::Internal;
                }
                PortAttributeKind::Address => {
                    match info.api {
                        TestPortApi::Regular => {}
                        TestPortApi::Internal => self.attribute_error(
                            span,
                            "Attributes `internal' and `address' cannot be used at the same time",
                        ),
                        TestPortApi::Address => self.attribute_warning(span, "Duplicate attribute `address'"),
                    }
                    info.api = TestPortApi::Address;
                }
                PortAttributeKind::Provider => match info.category {
                    PortCategory::Regular => info.category = PortCategory::Provider,
                    PortCategory::Provider => self.attribute_warning(span, "Duplicate attribute `provider'"),
                    PortCategory::User if translation => self.attribute_error(
                        span,
                        "The `provider' attribute cannot be used on translation ports",
                    ),
                    PortCategory::User => self.attribute_error(
                        span,
                        "Attributes `user' and `provider' cannot be used at the same time",
                    ),
                },
                PortAttributeKind::User { .. } => match info.category {
                    PortCategory::Regular => {
                        info.category = PortCategory::User;
                        info.legacy = true;
                    }
                    PortCategory::Provider => self.attribute_error(
                        span,
                        "Attributes `provider' and `user' cannot be used at the same time",
                    ),
                    PortCategory::User if translation => {
                        self.attribute_error(span, "Attribute `user' cannot be used on translation ports")
                    }
                    PortCategory::User => self.attribute_error(span, "Duplicate attribute `user'"),
                },
                PortAttributeKind::Other(text) => self.attribute_error(
                    span,
                    &format!(
                        "Port can only have the following extension attributes: `provider', `user', `internal' or `address' instead of `{text}'"
                    ),
                ),
            }
        }
    }

    fn attribute_error(&mut self, span: Span, message: &str) {
        self.emit(CompileError::new(ErrorKind::InvalidPort, span, message.to_string()));
    }

    fn attribute_warning(&mut self, span: Span, message: &str) {
        self.emit(CompileError::warning(ErrorKind::InvalidPort, span, message.to_string()));
    }

    fn chk_address_type(&mut self, port: TypeId, span: Span) {
        let program = self.program;
        let module = program.type_module(port);
        let scope = program.module_scope(module);
        let found = self
            .lookup_local(scope, &Identifier::new("address"))
            .is_some_and(|def| matches!(program.definition(def).kind, DefKind::Type(_)));
        if !found {
            self.emit(CompileError::new(
                ErrorKind::InvalidPort,
                span,
                format!(
                    "Type `address' is not defined in module `{}'",
                    program.module(module).name
                ),
            ));
        }
    }

    fn set_signature_flags(&mut self, info: &mut PortInfo) {
        let mut blocking = false;
        let mut exceptions = false;
        for ty in info.out_sigs.iter() {
            if let Some(TypeKind::Signature(signature)) = self.last_kind(ty) {
                blocking |= !signature.nonblocking;
                exceptions |= !signature.exceptions.is_empty();
            }
        }
        info.queue = !info.in_msgs.is_empty() || !info.in_sigs.is_empty() || blocking || exceptions;
        info.getreply = blocking;
        info.catch = exceptions;
    }

    /// Whether a signature is non-blocking and declares no exceptions.
    pub(crate) fn is_exempt_signature(&mut self, ty: Ty) -> bool {
        matches!(
            self.last_kind(ty),
            Some(TypeKind::Signature(signature))
                if signature.nonblocking && signature.exceptions.is_empty()
        )
    }

    // === Translation ports ===

    fn chk_user_side(&mut self, port: TypeId, body: &'p PortBody, info: &mut PortInfo) {
        let (provider_refs, in_mappings, out_mappings): (Vec<RefId>, &'p [TypeMapping], &'p [TypeMapping]) =
            match (&body.translation, body.user_attribute()) {
                (Some(translation), _) => (
                    translation.providers.clone(),
                    translation.in_mappings.as_slice(),
                    translation.out_mappings.as_slice(),
                ),
                (
                    None,
                    Some(PortAttribute {
                        kind:
                            PortAttributeKind::User {
                                provider,
                                in_mappings,
                                out_mappings,
                            },
                        ..
                    }),
                ) => (vec![*provider], in_mappings.as_slice(), out_mappings.as_slice()),
                _ => return,
            };
        self.chk_providers(&provider_refs, info);
        self.chk_translation(port, body, info, in_mappings, out_mappings);
        if !info.legacy {
            self.chk_unique(&body.variables);
            for &variable in &body.variables {
                self.chk_def(variable);
            }
        }
    }

    fn chk_providers(&mut self, provider_refs: &[RefId], info: &mut PortInfo) {
        let program = self.program;
        for &reference in provider_refs {
            let node = program.reference(reference);
            let Some(target) = self.resolve(reference).target else {
                continue;
            };
            let DefKind::Type(ty) = &program.definition(target).kind else {
                self.emit(CompileError::new(
                    ErrorKind::InvalidPort,
                    node.span,
                    format!("Reference `{}' does not refer to a type", node.display()),
                ));
                continue;
            };
            let provider = match self.refd_last(Ty::Defined(*ty)) {
                Ty::Defined(body) if program.type_def(body).as_port().is_some() => body,
                Ty::Error => continue,
                _ => {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidPort,
                        node.span,
                        format!("Type reference `{}' does not refer to a port type", node.display()),
                    ));
                    continue;
                }
            };
            let provider_name = self.type_display(Ty::Defined(provider));
            if info.providers.contains(&provider) {
                self.emit(CompileError::new(
                    ErrorKind::InvalidPort,
                    node.span,
                    format!(
                        "Duplicate port mappings, the type `{provider_name}' appears more than once"
                    ),
                ));
                continue;
            }
            info.providers.push(provider);
            self.check_port_type(provider);
            let Some(provider_info) = self.ports.get(&provider) else {
                continue;
            };
            let (category, api) = (provider_info.category, provider_info.api);
            if info.api == TestPortApi::Internal {
                continue;
            }
            if info.legacy && category != PortCategory::Provider {
                self.emit(CompileError::new(
                    ErrorKind::InvalidPort,
                    node.span,
                    format!(
                        "The referenced port type `{provider_name}' must have the `provider' attribute"
                    ),
                ));
            }
            match api {
                TestPortApi::Regular if info.api == TestPortApi::Address => {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidPort,
                        node.span,
                        format!(
                            "Attribute `address' cannot be used because the provider port type `{provider_name}' does not have attribute `address'"
                        ),
                    ));
                }
                TestPortApi::Internal => {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidPort,
                        node.span,
                        format!(
                            "Missing attribute `internal'. Provider port type `{provider_name}' has attribute `internal', which must be also present here"
                        ),
                    ));
                }
                _ => {}
            }
            info.api = api;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use ttcn_ast::ast::{Builtin, PortBody, SignatureBody};
    use ttcn_ast::ProgramBuilder;

    const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);
    const BOOL: TypeExpr = TypeExpr::Builtin(Builtin::Boolean);
    const CHARS: TypeExpr = TypeExpr::Builtin(Builtin::Charstring);

    fn port(in_list: Vec<TypeExpr>, out_list: Vec<TypeExpr>) -> TypeKind {
        TypeKind::Port(PortBody {
            in_list,
            out_list,
            ..PortBody::new(PortMode::Message)
        })
    }

    fn messages(checker: &Checker<'_>) -> Vec<String> {
        checker
            .diagnostics()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn test_connectability_is_directional() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let a = b.type_def(m, "A", port(vec![], vec![INT]));
        let c = b.type_def(m, "B", port(vec![INT], vec![BOOL]));
        let (a, c) = (b.type_of(a), b.type_of(c));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.check_port_type(a);
        checker.check_port_type(c);
        assert!(checker.is_connectable(a, c));
        assert!(!checker.is_connectable(c, a));
        assert_eq!(
            checker.report_connection_errors(c, a),
            vec!["Outgoing message type `boolean' of port type `B' is not present on the incoming list of port type `A'"]
        );
        assert!(checker.diagnostics().is_empty());
    }

    #[test]
    fn test_mappability() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let component_port = b.type_def(m, "P", port(vec![INT, CHARS], vec![INT]));
        let system_port = b.type_def(m, "S", port(vec![INT], vec![INT, BOOL]));
        let narrow = b.type_def(m, "N", port(vec![], vec![INT]));
        let (p, s, n) = (b.type_of(component_port), b.type_of(system_port), b.type_of(narrow));
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        for ty in [p, s, n] {
            checker.check_port_type(ty);
        }
        assert!(checker.is_mappable(p, s));
        assert!(checker.is_mappable(n, n));
        assert!(!checker.is_mappable(n, s));
        assert_eq!(
            checker.report_mapping_errors(n, s),
            vec!["Incoming message type `integer' of system port type `S' is not present on the incoming list of test component port type `N'"]
        );
    }

    #[test]
    fn test_list_checks() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        b.type_def(
            m,
            "Sig",
            TypeKind::Signature(SignatureBody {
                params: Vec::new(),
                returns: None,
                exceptions: Vec::new(),
                nonblocking: false,
            }),
        );
        let sig_ref = b.type_ref("Sig");
        let bad = b.type_def(m, "P", port(vec![INT, INT, sig_ref], vec![]));
        let bad = b.type_of(bad);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.check_port_type(bad);
        checker.check_port_type(bad);
        assert_eq!(
            messages(&checker),
            vec![
                "Duplicate incoming message type `integer'",
                "Signature `Sig' cannot be used on a message based port",
            ]
        );
        assert!(checker.port_info(bad).has_queue());
        assert!(!checker.port_info(bad).getreply_allowed());
    }

    #[test]
    fn test_attribute_conflicts() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let mut body = PortBody::new(PortMode::Message);
        let span = b.span();
        body.attributes = vec![
            PortAttribute {
                kind: PortAttributeKind::Internal,
                span,
            },
            PortAttribute {
                kind: PortAttributeKind::Internal,
                span,
            },
            PortAttribute {
                kind: PortAttributeKind::Address,
                span,
            },
        ];
        let p = b.type_def(m, "P", TypeKind::Port(body));
        let p = b.type_of(p);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.check_port_type(p);
        assert_eq!(
            messages(&checker),
            vec![
                "Duplicate attribute `internal'",
                "Attributes `internal' and `address' cannot be used at the same time",
                "Type `address' is not defined in module `Main'",
            ]
        );
    }

    #[test]
    fn test_port_variables_need_translation() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let variable = b.var("v", INT, None);
        let mut body = PortBody::new(PortMode::Message);
        body.variables = vec![variable];
        let p = b.type_def(m, "P", TypeKind::Port(body));
        let p = b.type_of(p);
        let program = b.finish();
        let mut checker = Checker::new(&program, CheckConfig::default());

        checker.check_port_type(p);
        assert_eq!(
            messages(&checker),
            vec!["Port variables can only be used when the port is a translation port"]
        );
    }

    #[test]
    #[should_panic(expected = "used before it was checked")]
    fn test_unchecked_port_info_panics() {
        let mut b = ProgramBuilder::new();
        let m = b.module("Main");
        let p = b.type_def(m, "P", port(vec![], vec![]));
        let p = b.type_of(p);
        let program = b.finish();
        let checker = Checker::new(&program, CheckConfig::default());
        checker.port_info(p);
    }
}
