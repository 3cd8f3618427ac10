//! End-to-end tests for port type contracts, connection checks and
//! translation mapping tables.

use ttcn_ast::ast::{
    Block, Builtin, ComponentBody, ComponentKeyword, DefKind, Encoding, Expr, ExprKind,
    FormalParList, MappingKind, MappingTarget, PortAttribute, PortAttributeKind, PortBody,
    PortEndpoint, PortMode, Statement, StatementKind, TestcaseDef, TypeExpr, TypeKind,
    TypeMapping,
};
use ttcn_ast::foundation::Identifier;
use ttcn_ast::{DefId, ModuleId, ProgramBuilder};
use ttcn_resolve::{ErrorKind, Ty};
use ttcn_tests::TestHarness;

const INT: TypeExpr = TypeExpr::Builtin(Builtin::Integer);
const BOOL: TypeExpr = TypeExpr::Builtin(Builtin::Boolean);
const OCT: TypeExpr = TypeExpr::Builtin(Builtin::Octetstring);

fn message_port(in_list: Vec<TypeExpr>, out_list: Vec<TypeExpr>) -> TypeKind {
    TypeKind::Port(PortBody {
        in_list,
        out_list,
        ..PortBody::new(PortMode::Message)
    })
}

/// Port types `A` (out integer) and `B` (in integer, out boolean).
fn asymmetric_ports(b: &mut ProgramBuilder) -> (ModuleId, DefId, DefId) {
    let m = b.module("Main");
    let a = b.type_def(m, "A", message_port(vec![], vec![INT]));
    let port_b = b.type_def(m, "B", message_port(vec![INT], vec![BOOL]));
    (m, a, port_b)
}

#[test]
fn test_connectability_is_not_symmetric() {
    let mut b = ProgramBuilder::new();
    let (_, a, port_b) = asymmetric_ports(&mut b);
    let harness = TestHarness::check(b.finish());

    harness.assert_no_errors();
    let (a, port_b) = (harness.port(a), harness.port(port_b));
    assert!(a.is_connectable(port_b));
    assert!(!port_b.is_connectable(a));
}

#[test]
fn test_connect_statement_reports_inconsistent_direction() {
    let mut b = ProgramBuilder::new();
    let (m, _, _) = asymmetric_ports(&mut b);
    let pa_ty = b.type_ref("A");
    let pa = b.def(
        "pa",
        DefKind::Port {
            port_type: pa_ty,
            dims: Vec::new(),
        },
    );
    let pb_ty = b.type_ref("B");
    let pb = b.def(
        "pb",
        DefKind::Port {
            port_type: pb_ty,
            dims: Vec::new(),
        },
    );
    b.type_def(
        m,
        "C",
        TypeKind::Component(ComponentBody {
            extends: Vec::new(),
            definitions: vec![pa, pb],
        }),
    );
    let self_component = || Expr::synthetic(ExprKind::Component(ComponentKeyword::SelfComponent));
    let left = PortEndpoint {
        component: self_component(),
        port: Identifier::new("pa"),
        span: b.span(),
    };
    let right = PortEndpoint {
        component: self_component(),
        port: Identifier::new("pb"),
        span: b.span(),
    };
    let runs_on = b.reference("C");
    b.testcase(
        m,
        "tc",
        TestcaseDef {
            params: FormalParList::default(),
            runs_on,
            system: None,
            body: Block::new(vec![Statement::new(StatementKind::Connect { left, right })]),
        },
    );
    let harness = TestHarness::check(b.finish());

    assert_eq!(
        harness.errors(),
        vec!["The connection between port types `B' and `A' is not consistent"]
    );
    let diag = harness
        .output()
        .diagnostics
        .iter()
        .find(|d| d.is_error())
        .map(|d| (d.kind, d.notes.clone()));
    assert_eq!(
        diag,
        Some((
            ErrorKind::InconsistentConnection,
            vec!["Outgoing message type `boolean' of port type `B' is not present on the incoming list of port type `A'".to_string()]
        ))
    );
}

#[test]
fn test_translation_port_mapping_table() {
    let mut b = ProgramBuilder::new();
    let m = b.module("Main");
    let provider_span = b.span();
    let provider = PortBody {
        in_list: vec![OCT],
        out_list: vec![OCT],
        attributes: vec![PortAttribute {
            kind: PortAttributeKind::Provider,
            span: provider_span,
        }],
        ..PortBody::new(PortMode::Message)
    };
    b.type_def(m, "P", TypeKind::Port(provider));

    let decode = MappingTarget {
        target: Some(INT),
        kind: MappingKind::Decode {
            encoding: Encoding::Raw,
            options: None,
        },
        span: b.span(),
    };
    let in_mapping = TypeMapping {
        source: OCT,
        targets: vec![decode],
        span: b.span(),
    };
    let encode = MappingTarget {
        target: Some(OCT),
        kind: MappingKind::Encode {
            encoding: Encoding::Raw,
            options: None,
        },
        span: b.span(),
    };
    let out_mapping = TypeMapping {
        source: INT,
        targets: vec![encode],
        span: b.span(),
    };
    let provider_ref = b.reference("P");
    let user_span = b.span();
    let user = PortBody {
        in_list: vec![BOOL, INT],
        out_list: vec![INT],
        attributes: vec![PortAttribute {
            kind: PortAttributeKind::User {
                provider: provider_ref,
                in_mappings: vec![in_mapping],
                out_mappings: vec![out_mapping],
            },
            span: user_span,
        }],
        ..PortBody::new(PortMode::Message)
    };
    let user = b.type_def(m, "U", TypeKind::Port(user));
    let harness = TestHarness::check(b.finish());

    harness.assert_no_errors();
    let info = harness.port(user);
    assert!(info.is_translation());
    assert!(info.legacy);
    let table = match &info.mapping_table {
        Some(table) => table,
        None => panic!("translation port without mapping table"),
    };
    let incoming = table.incoming_for(Ty::Builtin(Builtin::Octetstring));
    assert_eq!(incoming.map(|e| e.targets[0].index), Some(Some(1)));
    let outgoing = table.outgoing_for(Ty::integer());
    assert_eq!(outgoing.map(|e| e.targets[0].index), Some(Some(0)));
}
