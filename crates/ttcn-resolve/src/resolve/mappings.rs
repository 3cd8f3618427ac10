//! Type mappings of translation ports.
//!
//! A translation port lists, per direction, which of its own message types
//! correspond to which provider message types and how a value is carried
//! across (`simple`, `discard`, a conversion `function`, `encode` or
//! `decode`).
//!
//! The two notations differ in direction. In the `user` attribute notation
//! an incoming mapping goes from a provider type to a user type and its
//! conversion function takes the provider type. In the `map to` notation an
//! incoming mapping names the user type first and the provider type as its
//! target, and the conversion function takes the provider type, so input
//! and output are paired the other way round.
//!
//! | direction | notation  | function input | function output | index into    |
//! |-----------|-----------|----------------|-----------------|---------------|
//! | in        | attribute | source         | target          | own in-list   |
//! | in        | `map to`  | target         | source          | provider in   |
//! | out       | both      | source         | target          | provider out  |

use crate::error::{CompileError, ErrorKind};
use crate::resolve::checker::Checker;
use crate::resolve::ports::{PortInfo, TypeSet};
use crate::resolve::types::Ty;
use serde::Serialize;
use std::collections::HashMap;
use ttcn_ast::ast::{DefKind, MappingKind, PortBody, Prototype, TypeMapping};
use ttcn_ast::foundation::{DefId, RefId, Span, TypeId};

/// One target of a mapping in the finished table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingTableTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Ty>,
    pub kind: MappingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<DefId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prototype: Option<Prototype>,
    /// Position of the target in the destination type set; `None` when the
    /// target is discarded or not listed there
    pub index: Option<usize>,
}

/// All targets of one source type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingEntry {
    pub source: Ty,
    pub source_name: String,
    pub targets: Vec<MappingTableTarget>,
}

/// Finished mappings of a translation port.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappingTable {
    pub incoming: Vec<MappingEntry>,
    pub outgoing: Vec<MappingEntry>,
}

impl MappingTable {
    pub fn incoming_for(&self, source: Ty) -> Option<&MappingEntry> {
        self.incoming.iter().find(|e| e.source == source)
    }

    pub fn outgoing_for(&self, source: Ty) -> Option<&MappingEntry> {
        self.outgoing.iter().find(|e| e.source == source)
    }
}

struct CheckedTarget<'p> {
    target: Option<Ty>,
    kind: &'p MappingKind,
    function: Option<(DefId, Prototype)>,
}

struct CheckedMapping<'p> {
    source: Ty,
    name: String,
    targets: Vec<CheckedTarget<'p>>,
}

/// Mapping of `ty`; erroneous types count as mapped.
fn mapping_for<'a, 'p>(mappings: &'a [CheckedMapping<'p>], ty: Ty) -> Option<&'a CheckedMapping<'p>> {
    mappings.iter().find(|m| m.source == ty)
}

fn is_mapped(mappings: &[CheckedMapping<'_>], ty: Ty) -> bool {
    ty.is_error() || mapping_for(mappings, ty).is_some()
}

/// Direction-dependent parameters of one mapping list.
#[derive(Clone, Copy)]
struct Direction {
    legacy: bool,
    incoming: bool,
}

impl<'p> Checker<'p> {
    /// Mapping table of a translation port.
    ///
    /// # Panics
    /// Panics if the port type has not been checked.
    pub fn mapping_table(&self, port: TypeId) -> Option<&MappingTable> {
        self.port_info(port).mapping_table.as_ref()
    }

    /// Check both mapping lists of a translation port against its
    /// providers and fill in the mapping table.
    pub(crate) fn chk_translation(
        &mut self,
        port: TypeId,
        body: &'p PortBody,
        info: &mut PortInfo,
        in_mappings: &'p [TypeMapping],
        out_mappings: &'p [TypeMapping],
    ) {
        let program = self.program;
        let span = program.type_def(port).span;
        let legacy = info.legacy;
        let incoming = self.chk_type_mappings(port, in_mappings, Direction { legacy, incoming: true });
        let outgoing = self.chk_type_mappings(port, out_mappings, Direction { legacy, incoming: false });
        let providers: Vec<(String, PortInfo)> = info
            .providers
            .iter()
            .filter_map(|p| {
                let provider = self.ports.get(p)?.clone();
                Some((self.type_display(Ty::Defined(*p)), provider))
            })
            .collect();

        if legacy {
            self.chk_legacy_translation(port, info, providers.first(), &incoming, &outgoing, span);
        } else {
            self.chk_map_translation(body, info, &providers, &incoming, &outgoing, span);
        }

        let in_destinations: Vec<&TypeSet> = if legacy {
            vec![&info.in_msgs]
        } else {
            providers.iter().map(|(_, p)| &p.in_msgs).collect()
        };
        let out_destinations: Vec<&TypeSet> = providers.iter().map(|(_, p)| &p.out_msgs).collect();
        let table = MappingTable {
            incoming: table_entries(&incoming, &in_destinations),
            outgoing: table_entries(&outgoing, &out_destinations),
        };
        info.mapping_table = Some(table);
    }

    fn chk_type_mappings(
        &mut self,
        port: TypeId,
        mappings: &'p [TypeMapping],
        direction: Direction,
    ) -> Vec<CheckedMapping<'p>> {
        let mut checked: Vec<CheckedMapping<'p>> = Vec::new();
        let mut first_span: HashMap<Ty, Span> = HashMap::new();
        for mapping in mappings {
            let source = self.chk_type_expr(&mapping.source);
            let source = self.refd_last(source);
            let name = self.type_display(source);
            let mut targets = Vec::new();
            for target in &mapping.targets {
                let target_ty = match &target.target {
                    Some(ty) => {
                        let ty = self.chk_type_expr(ty);
                        Some(self.refd_last(ty))
                    }
                    None => None,
                };
                let function = self.chk_mapping_target(port, source, target_ty, &target.kind, target.span, direction);
                targets.push(CheckedTarget {
                    target: target_ty,
                    kind: &target.kind,
                    function,
                });
            }
            if mapping.targets.len() > 1 {
                self.chk_multiple_targets(mapping, &targets, direction.legacy);
            }
            if source.is_error() {
                continue;
            }
            if let Some(previous) = first_span.get(&source) {
                self.emit(
                    CompileError::new(
                        ErrorKind::InvalidMapping,
                        mapping.span,
                        format!("Duplicate mapping for type `{name}'"),
                    )
                    .with_label(*previous, format!("The mapping of type `{name}' is already given here")),
                );
                continue;
            }
            first_span.insert(source, mapping.span);
            checked.push(CheckedMapping { source, name, targets });
        }
        checked
    }

    fn chk_mapping_target(
        &mut self,
        port: TypeId,
        source: Ty,
        target: Option<Ty>,
        kind: &MappingKind,
        span: Span,
        direction: Direction,
    ) -> Option<(DefId, Prototype)> {
        match kind {
            MappingKind::Simple => {
                if let Some(target) = target {
                    if !self.is_identical(source, target) {
                        self.emit(CompileError::new(
                            ErrorKind::InvalidMapping,
                            span,
                            format!(
                                "The source and target types must be the same: `{}' was expected instead of `{}'",
                                self.type_display(source),
                                self.type_display(target)
                            ),
                        ));
                    }
                }
                None
            }
            MappingKind::Discard => None,
            MappingKind::Function(function) => {
                self.chk_mapping_function(port, *function, source, target, direction)
            }
            MappingKind::Encode { encoding, .. } => {
                let stream = Ty::Builtin(encoding.stream_type());
                if !self.supports_encoding(source, *encoding) {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidMapping,
                        span,
                        format!(
                            "Source type `{}' does not support {} encoding",
                            self.type_display(source),
                            encoding.name()
                        ),
                    ));
                }
                if let Some(target) = target {
                    if !self.is_identical(stream, target) {
                        self.emit(CompileError::new(
                            ErrorKind::InvalidMapping,
                            span,
                            format!(
                                "Target type of {} encoding should be `{}' instead of `{}'",
                                encoding.name(),
                                self.type_display(stream),
                                self.type_display(target)
                            ),
                        ));
                    }
                }
                None
            }
            MappingKind::Decode { encoding, .. } => {
                let stream = Ty::Builtin(encoding.stream_type());
                if !self.is_identical(stream, source) {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidMapping,
                        span,
                        format!(
                            "Source type of {} encoding should be `{}' instead of `{}'",
                            encoding.name(),
                            self.type_display(stream),
                            self.type_display(source)
                        ),
                    ));
                }
                if let Some(target) = target {
                    if !self.supports_encoding(target, *encoding) {
                        self.emit(CompileError::new(
                            ErrorKind::InvalidMapping,
                            span,
                            format!(
                                "Target type `{}' does not support {} encoding",
                                self.type_display(target),
                                encoding.name()
                            ),
                        ));
                    }
                }
                None
            }
        }
    }

    fn chk_mapping_function(
        &mut self,
        port: TypeId,
        reference: RefId,
        source: Ty,
        target: Option<Ty>,
        direction: Direction,
    ) -> Option<(DefId, Prototype)> {
        let program = self.program;
        let node = program.reference(reference);
        let def = self.resolve(reference).target?;
        let definition = program.definition(def);
        let description = definition.kind.description();
        let name = &definition.name;
        let function = match &definition.kind {
            DefKind::Function(function) => function,
            DefKind::ExtFunction(function) if direction.legacy => function,
            _ => {
                let wanted = if direction.legacy {
                    "a function or external function"
                } else {
                    "a function"
                };
                self.emit(CompileError::new(
                    ErrorKind::InvalidMapping,
                    node.span,
                    format!("Reference to {wanted} was expected instead of {description} `{name}'"),
                ));
                return None;
            }
        };
        self.chk_def(def);
        let prototype = function.prototype;
        if direction.legacy && prototype == Prototype::None {
            self.emit(CompileError::new(
                ErrorKind::InvalidMapping,
                node.span,
                format!("The referenced {description} `{name}' does not have `prototype' attribute"),
            ));
            return None;
        }
        if !direction.legacy
            && !matches!(prototype, Prototype::Fast | Prototype::Backtrack | Prototype::Sliding)
        {
            self.emit(CompileError::new(
                ErrorKind::InvalidMapping,
                node.span,
                format!(
                    "The referenced {description} `{name}' must have attribute `prototype(fast)', `prototype(backtrack)' or `prototype(sliding)'"
                ),
            ));
            return None;
        }

        if let Some((input, output)) = self.function_io_types(def) {
            let input = self.refd_last(input);
            let output = self.refd_last(output);
            let pairs = if direction.legacy || !direction.incoming {
                [("input", "source", Some(source), input), ("output", "target", target, output)]
            } else {
                [("input", "target", target, input), ("output", "source", Some(source), output)]
            };
            for (what, role, expected, actual) in pairs {
                let Some(expected) = expected else {
                    continue;
                };
                if !actual.is_error() && !self.is_identical(expected, actual) {
                    self.emit(CompileError::new(
                        ErrorKind::InvalidMapping,
                        node.span,
                        format!(
                            "The {what} type of {description} `{name}' must be the same as the {role} type of the mapping: `{}' was expected instead of `{}'",
                            self.type_display(expected),
                            self.type_display(actual)
                        ),
                    ));
                }
            }
        }

        if !direction.legacy {
            if let Some(clause) = function.port_clause {
                if let Some(clause_port) = self.clause_port(clause) {
                    if clause_port != port {
                        self.emit(CompileError::new(
                            ErrorKind::InvalidMapping,
                            node.span,
                            format!(
                                "The {description} `{name}' has a port clause of `{}' but is referenced in another port `{}'",
                                self.type_display(Ty::Defined(clause_port)),
                                self.type_display(Ty::Defined(port))
                            ),
                        ));
                    }
                }
            }
        }
        Some((def, prototype))
    }

    fn chk_multiple_targets(&mut self, mapping: &TypeMapping, targets: &[CheckedTarget<'_>], legacy: bool) {
        let program = self.program;
        let mut has_sliding = false;
        let mut has_backtrack = false;
        let mut fast_count = 0;
        let last = targets.len() - 1;
        for (position, (checked, target)) in targets.iter().zip(&mapping.targets).enumerate() {
            let error = match checked.kind {
                MappingKind::Discard if has_sliding => Some(
                    "Mapping `discard' cannot be used if functions with `prototype(sliding)' are referred from the same source type"
                        .to_string(),
                ),
                MappingKind::Discard if position < last => {
                    Some("Mapping `discard' must be the last target of the source type".to_string())
                }
                MappingKind::Discard | MappingKind::Decode { .. } => None,
                MappingKind::Function(_) => match checked.function {
                    None => None,
                    Some((_, Prototype::Backtrack)) => {
                        has_backtrack = true;
                        None
                    }
                    Some((_, Prototype::Sliding)) => {
                        has_sliding = true;
                        None
                    }
                    Some((_, Prototype::Fast)) if !legacy => {
                        fast_count += 1;
                        (fast_count > 1).then(|| {
                            "At most one function with attribute `prototype(fast)' can be referred from the same source type"
                                .to_string()
                        })
                    }
                    Some((def, _)) => {
                        let definition = program.definition(def);
                        Some(format!(
                            "The referenced {} `{}' must have the attribute `prototype(backtrack)' or `prototype(sliding)' when more than one targets are present",
                            definition.kind.description(),
                            definition.name
                        ))
                    }
                },
                other => Some(format!(
                    "The type of the mapping must be `function', `decode' or `discard' instead of `{}' when more than one targets are present",
                    other.keyword()
                )),
            };
            if let Some(message) = error {
                self.emit(CompileError::new(ErrorKind::InvalidMapping, target.span, message));
            }
        }
        if has_sliding && has_backtrack {
            self.emit(CompileError::new(
                ErrorKind::InvalidMapping,
                mapping.span,
                "If one of the mappings refers to a function with attribute `prototype(sliding)' then mappings of this source type cannot refer to functions with attribute `prototype(backtrack)'"
                    .to_string(),
            ));
        }
    }

    // === Attribute notation ===

    fn chk_legacy_translation(
        &mut self,
        port: TypeId,
        info: &PortInfo,
        provider: Option<&(String, PortInfo)>,
        incoming: &[CheckedMapping<'_>],
        outgoing: &[CheckedMapping<'_>],
        span: Span,
    ) {
        let user = self.type_display(Ty::Defined(port));
        let mut errors = Vec::new();

        if !incoming.is_empty() {
            if let Some((provider_name, provider)) = provider {
                if provider.in_msgs.is_empty() {
                    errors.push(format!(
                        "Invalid incoming mappings. Provider port type `{provider_name}' does not have incoming message types"
                    ));
                } else {
                    for mapping in incoming {
                        if !provider.in_msgs.contains(mapping.source) {
                            errors.push(format!(
                                "Source type `{}' of the `in' mapping is not present on the list of incoming messages in provider port type `{provider_name}'",
                                mapping.name
                            ));
                        }
                    }
                    for (index, ty) in provider.in_msgs.iter().enumerate() {
                        if !is_mapped(incoming, ty) {
                            errors.push(format!(
                                "Incoming message type `{}' of provider port type `{provider_name}' is not handled by the incoming mappings",
                                provider.in_msgs.name(index)
                            ));
                        }
                    }
                }
            }
            for target in incoming.iter().flat_map(|m| &m.targets) {
                if let Some(ty) = target.target {
                    if !info.in_msgs.contains(ty) {
                        errors.push(format!(
                            "Target type `{}' of the `in' mapping is not present on the list of incoming messages in user port type `{user}'",
                            self.type_display(ty)
                        ));
                    }
                }
            }
        } else if let Some((provider_name, provider)) = provider {
            if !provider.in_msgs.is_empty() {
                errors.push(format!(
                    "Missing `in' mappings to handle the incoming message types of provider port type `{provider_name}'"
                ));
            }
        }

        if !outgoing.is_empty() {
            if info.out_msgs.is_empty() {
                errors.push(format!(
                    "Invalid outgoing mappings. User port type `{user}' does not have outgoing message types"
                ));
            } else {
                for mapping in outgoing {
                    if !info.out_msgs.contains(mapping.source) {
                        errors.push(format!(
                            "Source type `{}' of the `out' mapping is not present on the list of outgoing messages in user port type `{user}'",
                            mapping.name
                        ));
                    }
                }
                for (index, ty) in info.out_msgs.iter().enumerate() {
                    if !is_mapped(outgoing, ty) {
                        errors.push(format!(
                            "Outgoing message type `{}' of user port type `{user}' is not handled by the outgoing mappings",
                            info.out_msgs.name(index)
                        ));
                    }
                }
            }
            if let Some((provider_name, provider)) = provider {
                for target in outgoing.iter().flat_map(|m| &m.targets) {
                    if let Some(ty) = target.target {
                        if !provider.out_msgs.contains(ty) {
                            errors.push(format!(
                                "Target type `{}' of the `out' mapping is not present on the list of outgoing messages in provider port type `{provider_name}'",
                                self.type_display(ty)
                            ));
                        }
                    }
                }
            }
        } else if !info.out_msgs.is_empty() {
            errors.push(format!(
                "Missing `out' mappings to handle the outgoing message types of user port type `{user}'"
            ));
        }

        if let Some((provider_name, provider)) = provider {
            for (index, ty) in info.in_sigs.iter().enumerate() {
                if !provider.in_sigs.contains(ty) && !self.is_exempt_signature(ty) {
                    errors.push(format!(
                        "Incoming signature `{}' of user port type `{user}' is not present on the list of incoming signatures in provider port type `{provider_name}'",
                        info.in_sigs.name(index)
                    ));
                }
            }
            for (index, ty) in provider.in_sigs.iter().enumerate() {
                if !info.in_sigs.contains(ty) {
                    errors.push(format!(
                        "Incoming signature `{}' of provider port type `{provider_name}' is not present on the list of incoming signatures in user port type `{user}'",
                        provider.in_sigs.name(index)
                    ));
                }
            }
            for (index, ty) in info.out_sigs.iter().enumerate() {
                if !provider.out_sigs.contains(ty) {
                    errors.push(format!(
                        "Outgoing signature `{}' of user port type `{user}' is not present on the list of outgoing signatures in provider port type `{provider_name}'",
                        info.out_sigs.name(index)
                    ));
                }
            }
            for (index, ty) in provider.out_sigs.iter().enumerate() {
                if !info.out_sigs.contains(ty) && !self.is_exempt_signature(ty) {
                    errors.push(format!(
                        "Outgoing signature `{}' of provider port type `{provider_name}' is not present on the list of outgoing signatures in user port type `{user}'",
                        provider.out_sigs.name(index)
                    ));
                }
            }
        }

        for message in errors {
            self.emit(CompileError::new(ErrorKind::InvalidMapping, span, message));
        }
    }

    // === `map to` notation ===

    fn chk_map_translation(
        &mut self,
        body: &PortBody,
        info: &PortInfo,
        providers: &[(String, PortInfo)],
        incoming: &[CheckedMapping<'_>],
        outgoing: &[CheckedMapping<'_>],
        span: Span,
    ) {
        let mut inout = Vec::new();
        for entry in &body.inout_list {
            let ty = self.resolve_type_expr(entry);
            inout.push(self.refd_last(ty));
        }
        let mut out = Vec::new();
        for entry in &body.out_list {
            let ty = self.resolve_type_expr(entry);
            out.push(self.refd_last(ty));
        }
        let mapped_in: Vec<Ty> = incoming
            .iter()
            .flat_map(|m| m.targets.iter().filter_map(|t| t.target))
            .collect();

        let mut errors = Vec::new();
        for (provider_name, provider) in providers {
            for (index, ty) in provider.in_msgs.iter().enumerate() {
                if !info.in_msgs.contains(ty) && !mapped_in.contains(&ty) && !inout.contains(&ty) {
                    errors.push(format!(
                        "Incoming message type `{}' is not present in the in(out) message list or in the from mapping types, coming from port `{provider_name}'",
                        provider.in_msgs.name(index)
                    ));
                }
            }
            for &ty in &inout {
                if ty.is_error() {
                    continue;
                }
                if !provider.in_msgs.contains(ty) || !provider.out_msgs.contains(ty) {
                    errors.push(format!(
                        "Inout message type `{}' is not present on the in and out messages or the inout messages of port `{provider_name}'",
                        self.type_display(ty)
                    ));
                }
            }
            for &ty in &out {
                if ty.is_error() || provider.out_msgs.contains(ty) {
                    continue;
                }
                let through_mapping = mapping_for(outgoing, ty).is_some_and(|m| {
                    m.targets
                        .iter()
                        .filter_map(|t| t.target)
                        .any(|t| provider.out_msgs.contains(t))
                });
                if !through_mapping {
                    errors.push(format!(
                        "Neither out message type `{}', nor one of its target mappings are present in the out or inout message list of the port `{provider_name}'",
                        self.type_display(ty)
                    ));
                }
            }
        }
        for message in errors {
            self.emit(CompileError::new(ErrorKind::InvalidMapping, span, message));
        }
    }
}

fn table_entries(mappings: &[CheckedMapping<'_>], destinations: &[&TypeSet]) -> Vec<MappingEntry> {
    mappings
        .iter()
        .map(|mapping| MappingEntry {
            source: mapping.source,
            source_name: mapping.name.clone(),
            targets: mapping
                .targets
                .iter()
                .map(|target| {
                    let index = match (target.kind, target.target) {
                        (MappingKind::Discard, _) | (_, None) => None,
                        (_, Some(ty)) => destinations.iter().find_map(|set| set.index_of(ty)),
                    };
                    MappingTableTarget {
                        target: target.target,
                        kind: target.kind.clone(),
                        function: target.function.map(|(def, _)| def),
                        prototype: target.function.map(|(_, prototype)| prototype),
                        index,
                    }
                })
                .collect(),
        })
        .collect()
}
