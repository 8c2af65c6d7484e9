//! Session lifecycle, registration and dispatch against a scripted master.

mod common;

use std::{
    collections::BTreeMap,
    sync::Arc,
    time::Duration,
};

use agentx_subagent::{
    error::{Error, ResponseError},
    oid::known,
    pdu::{
        Body, CloseReason, ClosePdu, Flags, GetBulkPdu, GetNextPdu, GetPdu, Header, Pdu, PduType,
        ResponsePdu, SearchRange,
    },
    session::State,
    table::{Table, TableEntry},
    value::{Value, VarBind},
    variable::{shared, Scalar, SharedVariable, Variable},
    Oid,
};
use common::{FakeMaster, SESSION_ID};

const POLL: Duration = Duration::from_millis(50);

fn oid(s: &str) -> Oid {
    s.parse().unwrap()
}

fn response_of(master: &FakeMaster) -> ResponsePdu {
    match master.last_sent().map(|pdu| pdu.body) {
        Some(Body::Response(response)) => response,
        other => panic!("Expected Response, got {:?}", other),
    }
}

/// Connected session serving 1.3.6.1, 1.3.6.2 and 1.3.6.4 under 1.3.6.
fn serving_session(master: &FakeMaster) -> agentx_subagent::session::Session {
    let mut session = master.connected_session();
    session.register(&oid("1.3.6")).unwrap();
    for (name, value) in [("1.3.6.1", 1), ("1.3.6.2", 2), ("1.3.6.4", 4)] {
        session
            .add_variable(oid(name), shared(Scalar::writable(Value::Integer(value))))
            .unwrap();
    }
    master.clear_sent();
    session
}

// --- Lifecycle ---

#[test]
fn test_connect_opens_session() {
    let master = FakeMaster::new();
    let session = master.connected_session();
    assert_eq!(session.state(), State::Connected);
    assert_eq!(session.session_id(), Some(SESSION_ID));
    match &master.sent_of(PduType::Open)[0].body {
        Body::Open(open) => assert_eq!(open.description, b"test sub-agent"),
        other => panic!("Expected Open, got {:?}", other),
    }
}

#[test]
fn test_connect_when_connected_is_noop() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    let sent_before = master.sent().len();
    session.connect().unwrap();
    assert_eq!(master.sent().len(), sent_before);
    assert_eq!(session.session_id(), Some(SESSION_ID));
}

#[test]
fn test_connect_refused() {
    let master = FakeMaster::new();
    master.refuse_connect();
    let mut session = master.session();
    assert!(matches!(session.connect(), Err(Error::Connect(_))));
    assert_eq!(session.state(), State::Disconnected);
    assert!(master.sent().is_empty());
}

#[test]
fn test_open_rejected_closes_transport() {
    let master = FakeMaster::new();
    master.fail(PduType::Open, ResponseError::OpenFailed);
    let mut session = master.session();
    assert!(matches!(
        session.connect(),
        Err(Error::Protocol(ResponseError::OpenFailed))
    ));
    assert_eq!(session.state(), State::Disconnected);
    assert!(!master.is_open());
}

#[test]
fn test_open_timeout() {
    let master = FakeMaster::new();
    master.respond_with(|_| None);
    let mut session = master.session();
    assert!(matches!(session.connect(), Err(Error::Timeout)));
    assert!(!master.is_open());
}

#[test]
fn test_disconnect_when_disconnected_is_noop() {
    let master = FakeMaster::new();
    let mut session = master.session();
    session.disconnect(CloseReason::Shutdown);
    assert!(master.sent().is_empty());
}

#[test]
fn test_disconnect_unregisters_then_closes() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    session.register(&oid("1.3.6.1.4.1.42")).unwrap();
    master.clear_sent();

    session.disconnect(CloseReason::ByManager);
    let types: Vec<PduType> = master.sent().iter().map(|p| p.pdu_type()).collect();
    assert_eq!(types, vec![PduType::Unregister, PduType::Close]);
    match &master.sent()[1].body {
        Body::Close(close) => assert_eq!(close.reason, CloseReason::ByManager),
        other => panic!("Expected Close, got {:?}", other),
    }
    assert_eq!(session.state(), State::Disconnected);
    assert!(session.registrations().is_empty());
    assert!(!master.is_open());
}

#[test]
fn test_disconnect_ignores_close_errors() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    master.respond_with(|_| None);
    session.disconnect(CloseReason::Shutdown);
    assert_eq!(session.state(), State::Disconnected);
    assert!(!master.is_open());
}

#[test]
fn test_drop_sends_exactly_one_close() {
    let master = FakeMaster::new();
    let session = master.connected_session();
    drop(session);
    let closes = master.sent_of(PduType::Close);
    assert_eq!(closes.len(), 1);
    match &closes[0].body {
        Body::Close(close) => assert_eq!(close.reason, CloseReason::Shutdown),
        other => panic!("Expected Close, got {:?}", other),
    }
}

#[test]
fn test_reconnect_forgets_registrations() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    session.register(&oid("1.3.6.1.4.1.42")).unwrap();
    session.reconnect().unwrap();
    assert!(session.is_connected());
    assert!(session.registrations().is_empty());
    assert_eq!(master.sent_of(PduType::Open).len(), 2);
}

#[test]
fn test_packet_ids_increase() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    session.ping().unwrap();
    session.register(&oid("1.3.6.1.4.1.42")).unwrap();
    let ids: Vec<u32> = master.sent().iter().map(|p| p.header.packet_id).collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

// --- Registration ---

#[test]
fn test_register_records_registration() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    session.register_subtree(&oid("1.3.6.1.4.1.42"), 100, 5).unwrap();
    let registration = &session.registrations()[0];
    assert_eq!(registration.priority, 100);
    assert_eq!(registration.timeout, 5);
    match &master.last_sent().unwrap().body {
        Body::Register(register) => {
            assert_eq!(register.subtree, oid("1.3.6.1.4.1.42"));
            assert_eq!(register.priority, 100);
        }
        other => panic!("Expected Register, got {:?}", other),
    }
    assert_eq!(master.last_sent().unwrap().header.session_id, SESSION_ID);
}

#[test]
fn test_register_duplicate_keeps_list() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    session.register(&oid("1.3.6.1.4.1.42")).unwrap();
    master.fail(PduType::Register, ResponseError::DuplicateRegistration);
    assert!(matches!(
        session.register(&oid("1.3.6.1.4.1.42")),
        Err(Error::DuplicateRegistration)
    ));
    assert_eq!(session.registrations().len(), 1);
}

#[test]
fn test_register_denied_and_unable() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    master.fail(PduType::Register, ResponseError::RequestDenied);
    assert!(matches!(
        session.register(&oid("1.3.6.1.4.1.42")),
        Err(Error::MasterUnwilling)
    ));
    master.fail(PduType::Register, ResponseError::ProcessingError);
    assert!(matches!(
        session.register(&oid("1.3.6.1.4.1.42")),
        Err(Error::MasterUnable)
    ));
    master.fail(PduType::Register, ResponseError::IndexWrongType);
    assert!(matches!(
        session.register(&oid("1.3.6.1.4.1.42")),
        Err(Error::Parse(_))
    ));
    assert!(session.registrations().is_empty());
}

#[test]
fn test_register_requires_connection() {
    let master = FakeMaster::new();
    let mut session = master.session();
    assert!(matches!(
        session.register(&oid("1.3.6.1.4.1.42")),
        Err(Error::Disconnected)
    ));
}

#[test]
fn test_unregister() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    session.register_subtree(&oid("1.3.6.1.4.1.42"), 127, 0).unwrap();
    master.clear_sent();

    // Wrong priority: nothing to do.
    session.unregister_subtree(&oid("1.3.6.1.4.1.42"), 1).unwrap();
    assert!(master.sent().is_empty());

    session.unregister_subtree(&oid("1.3.6.1.4.1.42"), 127).unwrap();
    assert!(session.registrations().is_empty());
    match &master.last_sent().unwrap().body {
        Body::Unregister(unregister) => assert_eq!(unregister.priority, 127),
        other => panic!("Expected Unregister, got {:?}", other),
    }
}

#[test]
fn test_unregister_unknown_at_master() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    session.register(&oid("1.3.6.1.4.1.42")).unwrap();
    master.fail(PduType::Unregister, ResponseError::UnknownRegistration);
    assert!(matches!(
        session.unregister_subtree(&oid("1.3.6.1.4.1.42"), 127),
        Err(Error::UnknownRegistration)
    ));
}

// --- Variables ---

#[test]
fn test_add_variable_needs_registration() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    let var = shared(Scalar::new(Value::Integer(1)));
    assert!(matches!(
        session.add_variable(oid("1.3.6.1.4.1.42.1.0"), var.clone()),
        Err(Error::UnknownRegistration)
    ));
    session.register(&oid("1.3.6.1.4.1.42")).unwrap();
    session
        .add_variable(oid("1.3.6.1.4.1.42.1.0"), var.clone())
        .unwrap();
    assert_eq!(session.variables().len(), 1);

    let batch = vec![
        (oid("1.3.6.1.4.1.42.2.0"), var.clone()),
        (oid("1.3.6.1.4.1.43.1.0"), var.clone()),
    ];
    assert!(matches!(
        session.add_variables(batch),
        Err(Error::UnknownRegistration)
    ));
    assert_eq!(session.variables().len(), 1);

    assert!(session.remove_variable(&oid("1.3.6.1.4.1.42.1.0")).is_some());
    assert!(session.remove_variable(&oid("1.3.6.1.4.1.42.1.0")).is_none());
}

// --- Dispatch ---

#[test]
fn test_get_next_dispatch() {
    let master = FakeMaster::new();
    let mut session = serving_session(&master);

    let cases = [
        (oid("1.3.6.1"), Oid::null(), "1.3.6.2", Value::Integer(2)),
        (
            oid("1.3.6.1").with_include(true),
            Oid::null(),
            "1.3.6.1",
            Value::Integer(1),
        ),
        (oid("1.3.6.1"), oid("1.3.6.2"), "1.3.6.1", Value::EndOfMibView),
    ];
    for (packet_id, (start, end, name, value)) in (100u32..).zip(cases) {
        master.push_request(
            SESSION_ID,
            packet_id,
            Body::GetNext(GetNextPdu {
                ranges: vec![SearchRange::new(start, end)],
            }),
        );
        assert!(session.process_one(POLL).unwrap());
        let sent = master.last_sent().unwrap();
        assert_eq!(sent.header.packet_id, packet_id);
        assert_eq!(sent.header.transaction_id, 9);
        let response = response_of(&master);
        assert!(response.error.is_ok());
        assert_eq!(response.varbinds, vec![VarBind::new(oid(name), value)]);
    }
}

#[test]
fn test_get_dispatch() {
    let master = FakeMaster::new();
    let mut session = serving_session(&master);
    master.push_request(
        SESSION_ID,
        7,
        Body::Get(GetPdu {
            names: vec![oid("1.3.6.4"), oid("1.3.6.3")],
        }),
    );
    session.process_one(POLL).unwrap();
    let response = response_of(&master);
    assert_eq!(response.varbinds[0].value, Value::Integer(4));
    assert_eq!(response.varbinds[1].value, Value::NoSuchObject);
}

#[test]
fn test_get_bulk_dispatch() {
    let master = FakeMaster::new();
    let mut session = serving_session(&master);
    master.push_request(
        SESSION_ID,
        8,
        Body::GetBulk(GetBulkPdu {
            non_repeaters: 0,
            max_repetitions: 5,
            ranges: vec![SearchRange::new(oid("1.3.6"), Oid::null())],
        }),
    );
    session.process_one(POLL).unwrap();
    let response = response_of(&master);
    let names: Vec<String> = response.varbinds.iter().map(|v| v.oid.to_string()).collect();
    assert_eq!(names, vec!["1.3.6.1", "1.3.6.2", "1.3.6.4", "1.3.6.4"]);
    assert_eq!(response.varbinds[3].value, Value::EndOfMibView);
}

#[test]
fn test_wrong_session_gets_not_open() {
    let master = FakeMaster::new();
    let mut session = serving_session(&master);
    master.push_request(
        SESSION_ID + 1,
        11,
        Body::Get(GetPdu {
            names: vec![oid("1.3.6.1")],
        }),
    );
    session.process_one(POLL).unwrap();
    let sent = master.last_sent().unwrap();
    assert_eq!(sent.header.packet_id, 11);
    let response = response_of(&master);
    assert_eq!(response.error, ResponseError::NotOpen);
    assert!(response.varbinds.is_empty());
}

#[test]
fn test_malformed_body_gets_parse_error() {
    let master = FakeMaster::new();
    let mut session = serving_session(&master);

    // A Get whose OID claims more sub-identifiers than the payload holds.
    let mut frame = agentx_subagent::pdu::Pdu {
        header: agentx_subagent::pdu::Header {
            session_id: SESSION_ID,
            packet_id: 12,
            ..Default::default()
        },
        context: None,
        body: Body::Get(GetPdu {
            names: vec![oid("1.3")],
        }),
    }
    .serialize()
    .unwrap();
    frame[20] = 9;
    master.push_frame(frame);
    session.process_one(POLL).unwrap();
    let sent = master.last_sent().unwrap();
    assert_eq!(sent.header.packet_id, 12);
    assert_eq!(response_of(&master).error, ResponseError::ParseError);
}

#[test]
fn test_malformed_header_is_dropped() {
    let master = FakeMaster::new();
    let mut session = serving_session(&master);
    let mut frame = agentx_subagent::pdu::Pdu::new(Body::Ping).serialize().unwrap();
    frame[0] = 3; // version
    master.push_frame(frame);
    assert!(session.process_one(POLL).unwrap());
    assert!(master.sent().is_empty());
    assert!(session.is_connected());
}

#[test]
fn test_set_transaction() {
    let master = FakeMaster::new();
    let mut session = serving_session(&master);

    master.push_request(
        SESSION_ID,
        20,
        Body::TestSet(vec![VarBind::new(oid("1.3.6.2"), Value::Integer(22))]),
    );
    session.process_one(POLL).unwrap();
    assert!(response_of(&master).error.is_ok());
    assert_eq!(session.variables().setlist_len(), 1);

    // Second variable has the wrong type: setlist must not change.
    master.push_request(
        SESSION_ID,
        21,
        Body::TestSet(vec![
            VarBind::new(oid("1.3.6.1"), Value::Integer(11)),
            VarBind::new(oid("1.3.6.4"), Value::OctetString(b"x".to_vec())),
        ]),
    );
    session.process_one(POLL).unwrap();
    let failed = response_of(&master);
    assert_eq!(failed.error, ResponseError::WrongType);
    assert_eq!(failed.index, 2);
    assert_eq!(session.variables().setlist_len(), 1);

    master.push_request(SESSION_ID, 22, Body::CommitSet);
    session.process_one(POLL).unwrap();
    assert!(response_of(&master).error.is_ok());

    let sent_before = master.sent().len();
    master.push_request(SESSION_ID, 23, Body::CleanupSet);
    session.process_one(POLL).unwrap();
    assert_eq!(master.sent().len(), sent_before);
    assert_eq!(session.variables().setlist_len(), 0);

    master.push_request(
        SESSION_ID,
        24,
        Body::Get(GetPdu {
            names: vec![oid("1.3.6.2")],
        }),
    );
    session.process_one(POLL).unwrap();
    assert_eq!(response_of(&master).varbinds[0].value, Value::Integer(22));
}

#[test]
fn test_master_close_disconnects() {
    let master = FakeMaster::new();
    let mut session = serving_session(&master);
    master.push_request(
        SESSION_ID,
        30,
        Body::Close(ClosePdu {
            reason: CloseReason::Shutdown,
        }),
    );
    session.process_one(POLL).unwrap();
    assert_eq!(session.state(), State::Disconnected);
    assert!(session.registrations().is_empty());
    assert!(master.sent().is_empty());
    assert!(matches!(session.process_one(POLL), Err(Error::Disconnected)));

    // Nothing left to close on drop.
    drop(session);
    assert!(master.sent_of(PduType::Close).is_empty());
}

#[test]
fn test_requests_served_while_waiting() {
    let master = FakeMaster::new();
    let mut session = serving_session(&master);
    master.push_request(
        SESSION_ID,
        40,
        Body::Get(GetPdu {
            names: vec![oid("1.3.6.1")],
        }),
    );
    session.ping().unwrap();
    let types: Vec<PduType> = master.sent().iter().map(|p| p.pdu_type()).collect();
    assert_eq!(types, vec![PduType::Ping, PduType::Response]);
    assert_eq!(master.sent()[1].header.packet_id, 40);
}

/// Queues a Response from the master for `packet_id`.
fn push_response(master: &FakeMaster, packet_id: u32, response: ResponsePdu) {
    let header = Header {
        session_id: SESSION_ID,
        packet_id,
        ..Header::default()
    };
    master.push_frame(Pdu::response(&header, response).serialize().unwrap());
}

#[test]
fn test_unawaited_response_is_discarded() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    push_response(
        &master,
        9999,
        ResponsePdu::error(ResponseError::ProcessingError, 0),
    );

    session.ping().unwrap();
    assert!(matches!(
        session.wait_for_response(9999, POLL),
        Err(Error::Timeout)
    ));
    assert!(master.sent().iter().all(|pdu| pdu.pdu_type() != PduType::Response));
}

#[test]
fn test_outstanding_requests_answered_out_of_order() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    master.respond_with(|_| None);

    let first = session.send_request(Body::Ping, Flags::default()).unwrap();
    let second = session.send_request(Body::Ping, Flags::default()).unwrap();
    assert_ne!(first, second);

    push_response(&master, first, ResponsePdu::error(ResponseError::GenErr, 1));
    push_response(&master, second, ResponsePdu::default());

    let answer = session.wait_for_response(second, Duration::from_secs(1)).unwrap();
    assert_eq!(answer.packet_id(), second);

    // The first answer arrived while waiting for the second and was kept.
    let answer = session.wait_for_response(first, POLL).unwrap();
    assert_eq!(answer.packet_id(), first);
    match answer.body {
        Body::Response(response) => assert_eq!(response.error, ResponseError::GenErr),
        other => panic!("Expected Response, got {:?}", other),
    }
}

#[test]
fn test_send_request_requires_connection() {
    let master = FakeMaster::new();
    let mut session = master.session();
    assert!(matches!(
        session.send_request(Body::Ping, Flags::default()),
        Err(Error::Disconnected)
    ));
}

#[test]
fn test_overlong_variable_oid_rejected() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    session.register(&oid("1.3.6")).unwrap();
    let mut long = oid("1.3.6");
    for _ in 0..200 {
        long.push(1);
    }
    let variable = shared(Scalar::new(Value::Integer(1)));
    assert!(matches!(
        session.add_variable(long.clone(), variable.clone()),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        session.add_variables(vec![(oid("1.3.6.1"), variable.clone()), (long, variable)]),
        Err(Error::InvalidParameter(_))
    ));
    assert!(session.variables().is_empty());
}

#[test]
fn test_unencodable_value_answered_with_gen_err() {
    let master = FakeMaster::new();
    let mut session = serving_session(&master);
    session
        .add_variable(
            oid("1.3.6.3"),
            shared(Scalar::new(Value::ObjectIdentifier(Oid::from_slice(
                &[1; 300],
            )))),
        )
        .unwrap();
    master.push_request(
        SESSION_ID,
        41,
        Body::Get(GetPdu {
            names: vec![oid("1.3.6.3")],
        }),
    );
    session.process_one(POLL).unwrap();
    let response = response_of(&master);
    assert_eq!(response.error, ResponseError::GenErr);
    assert_eq!(response.index, 1);
    assert!(session.is_connected());
}

#[test]
fn test_ping_timeout() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    master.respond_with(|_| None);
    assert!(matches!(session.ping(), Err(Error::Timeout)));
    assert!(session.is_connected());
}

// --- Other requests ---

#[test]
fn test_send_notification_prepends_trap_oid() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    let trap = oid("1.3.6.1.4.1.42.0.1");
    session
        .send_notification(
            &trap,
            vec![VarBind::new(oid("1.3.6.1.4.1.42.1.0"), Value::Integer(5))],
        )
        .unwrap();
    match &master.last_sent().unwrap().body {
        Body::Notify(varbinds) => {
            assert_eq!(varbinds.len(), 2);
            assert_eq!(varbinds[0].oid, known::snmp_trap_oid().child(0));
            assert_eq!(varbinds[0].value, Value::ObjectIdentifier(trap));
        }
        other => panic!("Expected Notify, got {:?}", other),
    }
}

#[test]
fn test_index_allocation() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    master.respond_with(|pdu| match &pdu.body {
        Body::IndexAllocate(varbinds) => Some(ResponsePdu {
            varbinds: varbinds
                .iter()
                .map(|vb| VarBind::new(vb.oid.clone(), Value::Integer(17)))
                .collect(),
            ..ResponsePdu::default()
        }),
        Body::IndexDeallocate(_) => Some(ResponsePdu::error(ResponseError::IndexNotAllocated, 1)),
        _ => Some(ResponsePdu::default()),
    });

    let request = vec![VarBind::new(oid("1.3.6.1.4.1.42.2.1.1"), Value::Integer(0))];
    let allocated = session.allocate_index(request.clone(), false, true).unwrap();
    assert_eq!(allocated[0].value, Value::Integer(17));
    assert!(master.last_sent().unwrap().header.flags.any_index);

    assert!(matches!(
        session.deallocate_index(request),
        Err(Error::Protocol(ResponseError::IndexNotAllocated))
    ));
}

#[test]
fn test_agent_caps() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    let caps = oid("1.3.6.1.4.1.42.5");
    session.add_agent_caps(&caps, "test capabilities").unwrap();
    master.fail(PduType::RemoveAgentCaps, ResponseError::UnknownAgentCaps);
    assert!(matches!(
        session.remove_agent_caps(&caps),
        Err(Error::Protocol(ResponseError::UnknownAgentCaps))
    ));
}

// --- Tables ---

struct Row {
    index: SharedVariable,
    columns: BTreeMap<u32, SharedVariable>,
}

impl TableEntry for Row {
    fn index_variables(&self) -> Vec<SharedVariable> {
        vec![self.index.clone()]
    }

    fn variables(&self) -> BTreeMap<u32, SharedVariable> {
        self.columns.clone()
    }
}

fn row(index: Value, name: &str) -> Arc<dyn TableEntry> {
    let index = shared(Scalar::writable(index));
    let mut columns = BTreeMap::new();
    columns.insert(1, index.clone());
    columns.insert(2, shared(Scalar::new(Value::OctetString(name.as_bytes().to_vec()))));
    Arc::new(Row { index, columns })
}

#[test]
fn test_table_add_and_remove() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    session.register(&oid("1.3.6.1.4.1.42.2")).unwrap();
    let mut table = Table::new(oid("1.3.6.1.4.1.42.2.1"));

    let first = row(Value::Integer(3), "eth0");
    table.add_entry(&mut session, first.clone()).unwrap();
    assert!(session.variables().contains(&oid("1.3.6.1.4.1.42.2.1.1.3")));
    assert!(session.variables().contains(&oid("1.3.6.1.4.1.42.2.1.2.3")));
    assert!(matches!(
        table.add_entry(&mut session, first.clone()),
        Err(Error::InvalidParameter(_))
    ));

    // The index variable changes after insertion; removal still uses .3.
    {
        let entry_vars = first.index_variables();
        let mut guard = entry_vars[0].lock().unwrap();
        assert!(guard.test(&Value::Integer(8)).is_ok());
        assert!(guard.commit());
    }
    assert_eq!(table.index_of(&first), Some(&oid("3")));
    assert!(table.remove_entry(&mut session, &first));
    assert!(session.variables().is_empty());
    assert!(!table.remove_entry(&mut session, &first));
}

#[test]
fn test_table_rejects_unusable_index() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    session.register(&oid("1.3.6.1.4.1.42.2")).unwrap();
    let mut table = Table::new(oid("1.3.6.1.4.1.42.2.1"));
    let bad = row(Value::Counter64(1), "lo");
    assert!(matches!(
        table.add_entry(&mut session, bad),
        Err(Error::InvalidParameter(_))
    ));
    assert!(table.is_empty());
    assert!(session.variables().is_empty());
}

#[test]
fn test_table_outside_registration() {
    let master = FakeMaster::new();
    let mut session = master.connected_session();
    let mut table = Table::new(oid("1.3.6.1.4.1.42.2.1"));
    assert!(matches!(
        table.add_entry(&mut session, row(Value::Integer(1), "eth1")),
        Err(Error::UnknownRegistration)
    ));
    assert!(table.is_empty());
}
