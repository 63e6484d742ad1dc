//! Catalog reads: list length handshake, the first page of names, and lazy
//! fetching past the ring.

mod common;

use common::*;
use wyb_engine::{Haptic, ProtocolState, Session, Trigger};
use wyb_protocol::{DeviceMessage, Request, CMD_REREAD_LIST, IMAGE_CURRENTLY_PENDING};

// ============================================================================
// Initial Fetch
// ============================================================================

#[test]
fn test_initial_fetch_stops_at_catalog_or_ring() {
    for length in 1..=254u8 {
        let mut engine = engine();
        let mut session = Session::new();

        engine.on_trigger(&mut session, Trigger::Refresh);
        engine.on_message(&mut session, DeviceMessage::ListLength(length));

        let mut replies = 0;
        while matches!(session.state(), ProtocolState::AwaitingInitialNames) {
            let index = session.fetched_count();
            engine.on_message(&mut session, name_reply(index));
            replies += 1;
            assert!(replies <= 10, "length {} fetched too many names", length);
        }

        let expected = u16::from(length).min(10);
        assert!(session.state().is_idle(), "length {}", length);
        assert_eq!(session.fetched_count(), expected, "length {}", length);
        assert_eq!(session.catalog_size(), u16::from(length));
    }
}

#[test]
fn test_three_names_in_sequence() {
    let mut engine = engine();
    let mut session = Session::new();

    engine.on_trigger(&mut session, Trigger::Refresh);
    engine.on_message(&mut session, DeviceMessage::ListLength(3));
    for i in 0..3 {
        engine.on_message(&mut session, name_reply(i));
    }

    assert_eq!(
        engine.channel_mut().drain(),
        vec![
            Request::ListLength { version: 30 },
            Request::Name { index: 0 },
            Request::Name { index: 1 },
            Request::Name { index: 2 },
        ]
    );
    assert!(session.state().is_idle());
    assert_eq!(session.fetched_count(), 3);
    for i in 0..3 {
        assert_eq!(session.name_at(i).unwrap().name, format!("card{}", i));
        assert_eq!(session.names().get(usize::from(i)).unwrap().format, "CODE_128");
    }
    assert_eq!(
        engine.ui_mut().drain(),
        vec![UiEvent::CatalogChanged { total: 3, fetched: 3 }]
    );
}

#[test]
fn test_empty_catalog() {
    let mut engine = engine();
    let mut session = Session::new();
    load_catalog(&mut engine, &mut session, 4);

    engine.on_trigger(&mut session, Trigger::Refresh);
    engine.on_message(&mut session, DeviceMessage::ListLength(0));

    assert!(session.state().is_idle());
    assert_eq!(session.catalog_size(), 0);
    assert_eq!(session.fetched_count(), 0);
    assert_eq!(
        engine.ui_mut().drain(),
        vec![UiEvent::CatalogChanged { total: 0, fetched: 0 }]
    );
    // Only the list length request went out
    assert_eq!(engine.channel_mut().drain(), vec![Request::ListLength { version: 30 }]);
}

#[test]
fn test_display_now_sentinel_opens_pending_image() {
    let mut engine = engine();
    let mut session = Session::new();

    engine.on_trigger(&mut session, Trigger::Refresh);
    engine.channel_mut().drain();
    engine.on_message(&mut session, DeviceMessage::ListLength(255));

    assert!(matches!(session.state(), ProtocolState::ReceivingImage(_)));
    assert!(session.auto_display());
    assert!(session.is_image_screen_open());
    assert_eq!(
        engine.channel_mut().drain(),
        vec![Request::Image {
            index: IMAGE_CURRENTLY_PENDING
        }]
    );
    assert_eq!(
        engine.ui_mut().drain(),
        vec![UiEvent::OpenImageScreen(IMAGE_CURRENTLY_PENDING)]
    );
    assert_eq!(session.fetched_count(), 0);
}

// ============================================================================
// Refresh
// ============================================================================

type Setup = fn(&mut TestEngine, &mut Session);

fn in_idle(e: &mut TestEngine, s: &mut Session) {
    load_catalog(e, s, 5);
}

fn awaiting_length(e: &mut TestEngine, s: &mut Session) {
    e.on_trigger(s, Trigger::Refresh);
}

fn initial_names(e: &mut TestEngine, s: &mut Session) {
    e.on_trigger(s, Trigger::Refresh);
    e.on_message(s, DeviceMessage::ListLength(5));
    e.on_message(s, name_reply(0));
}

fn more_names(e: &mut TestEngine, s: &mut Session) {
    load_catalog(e, s, 20);
    e.request_more_names_if_needed(s, 10);
}

fn receiving_image(e: &mut TestEngine, s: &mut Session) {
    load_catalog(e, s, 5);
    e.on_trigger(s, Trigger::Select(2));
    e.on_message(s, DeviceMessage::ImageSize(0));
}

#[test]
fn test_refresh_from_every_state() {
    let setups = [
        ("idle", in_idle as Setup),
        ("awaiting length", awaiting_length as Setup),
        ("initial names", initial_names as Setup),
        ("more names", more_names as Setup),
        ("receiving image", receiving_image as Setup),
    ];

    for (label, setup) in setups {
        let mut engine = engine();
        let mut session = Session::new();
        setup(&mut engine, &mut session);
        engine.channel_mut().drain();

        engine.on_trigger(&mut session, Trigger::Refresh);

        assert!(
            matches!(session.state(), ProtocolState::AwaitingListLength),
            "{}",
            label
        );
        assert_eq!(session.fetched_count(), 0, "{}", label);
        assert_eq!(session.catalog_size(), 0, "{}", label);
        assert_eq!(session.selected(), None, "{}", label);
        assert_eq!(
            engine.channel_mut().drain(),
            vec![Request::ListLength { version: 30 }],
            "{}",
            label
        );
    }
}

#[test]
fn test_reread_command() {
    let mut engine = engine();
    let mut session = Session::new();
    load_catalog(&mut engine, &mut session, 2);

    engine.on_message(&mut session, DeviceMessage::Command(CMD_REREAD_LIST));
    assert!(matches!(session.state(), ProtocolState::AwaitingListLength));

    // Other command codes do nothing
    let mut session = Session::new();
    engine.channel_mut().drain();
    engine.on_message(&mut session, DeviceMessage::Command(0x05));
    assert!(session.state().is_idle());
    assert!(engine.channel_mut().drain().is_empty());
}

#[test]
fn test_names_survive_refresh() {
    let mut engine = engine();
    let mut session = Session::new();
    load_catalog(&mut engine, &mut session, 3);

    engine.on_trigger(&mut session, Trigger::Refresh);
    assert_eq!(session.names().cursor(), 0);
    assert_eq!(session.names().get(1).unwrap().name, "card1");
}

#[test]
fn test_reread_writes_names_from_first_slot() {
    let mut engine = engine();
    let mut session = Session::new();
    load_catalog(&mut engine, &mut session, 3);
    assert_eq!(session.names().cursor(), 3);

    engine.on_trigger(&mut session, Trigger::Refresh);
    engine.on_message(&mut session, DeviceMessage::ListLength(2));
    engine.on_message(
        &mut session,
        DeviceMessage::Name {
            name: "renamed".to_string(),
            format: "EAN_13".to_string(),
        },
    );

    assert_eq!(session.name_at(0).unwrap().name, "renamed");
    assert_eq!(session.names().cursor(), 1);
    assert_eq!(session.fetched_count(), 1);
    // Not refetched yet, still the old catalog's entry
    assert_eq!(session.names().get(1).unwrap().name, "card1");
}

// ============================================================================
// Lazy Fetch
// ============================================================================

#[test]
fn test_lazy_fetch_past_first_page() {
    let mut engine = engine();
    let mut session = Session::new();
    load_catalog(&mut engine, &mut session, 12);
    assert_eq!(session.fetched_count(), 10);

    // Rows already fetched need nothing
    assert!(!engine.request_more_names_if_needed(&mut session, 3));

    assert!(engine.request_more_names_if_needed(&mut session, 10));
    engine.on_message(&mut session, name_reply(10));
    assert_eq!(session.fetched_count(), 11);
    assert!(matches!(
        session.state(),
        ProtocolState::AwaitingMoreNames { requested: None }
    ));

    assert!(engine.request_more_names_if_needed(&mut session, 11));
    engine.on_message(&mut session, name_reply(11));
    assert!(session.state().is_idle());
    assert_eq!(session.fetched_count(), 12);

    assert_eq!(
        engine.channel_mut().drain(),
        vec![Request::Name { index: 10 }, Request::Name { index: 11 }]
    );
    assert_eq!(
        engine.ui_mut().drain(),
        vec![
            UiEvent::CatalogChanged { total: 12, fetched: 11 },
            UiEvent::CatalogChanged { total: 12, fetched: 12 },
        ]
    );

    // Index 10 and 11 wrapped over slots 0 and 1
    assert_eq!(session.name_at(0).unwrap().name, "card10");
    assert_eq!(session.name_at(11).unwrap().name, "card11");
    assert_eq!(session.name_at(5).unwrap().name, "card5");
}

#[test]
fn test_no_lazy_fetch_while_busy() {
    let mut engine = engine();
    let mut session = Session::new();
    load_catalog(&mut engine, &mut session, 20);

    engine.on_trigger(&mut session, Trigger::Select(4));
    engine.channel_mut().drain();

    assert!(!engine.request_more_names_if_needed(&mut session, 10));
    assert!(matches!(session.state(), ProtocolState::ReceivingImage(_)));
    assert!(engine.channel_mut().drain().is_empty());

    // Catalog counters are reset by a refresh: nothing left to fetch
    engine.on_trigger(&mut session, Trigger::Refresh);
    assert!(!engine.request_more_names_if_needed(&mut session, 15));
}

#[test]
fn test_unexpected_message_while_fetching_more_rereads() {
    let mut engine = engine();
    let mut session = Session::new();
    load_catalog(&mut engine, &mut session, 15);
    engine.request_more_names_if_needed(&mut session, 10);
    engine.channel_mut().drain();

    engine.on_message(&mut session, DeviceMessage::ImageDone);

    assert!(matches!(session.state(), ProtocolState::AwaitingListLength));
    assert_eq!(engine.channel_mut().drain(), vec![Request::ListLength { version: 30 }]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_error_during_initial_fetch_keeps_names() {
    let mut engine = engine();
    let mut session = Session::new();

    engine.on_trigger(&mut session, Trigger::Refresh);
    engine.on_message(&mut session, DeviceMessage::ListLength(5));
    engine.on_message(&mut session, name_reply(0));
    engine.on_message(&mut session, name_reply(1));
    engine.ui_mut().drain();

    engine.on_message(
        &mut session,
        DeviceMessage::Error {
            message: "disk full".to_string(),
        },
    );

    assert!(session.state().is_idle());
    assert_eq!(session.error_message(), Some("ERROR: disk full"));
    assert_eq!(session.fetched_count(), 2);
    assert_eq!(session.catalog_size(), 5);
    assert_eq!(session.name_at(1).unwrap().name, "card1");
    assert_eq!(
        engine.ui_mut().drain(),
        vec![
            UiEvent::ShowError("ERROR: disk full".to_string()),
            UiEvent::Haptic(Haptic::Error),
        ]
    );
}

#[test]
fn test_unavailable_channel_drops_requests() {
    let mut engine = engine();
    let mut session = Session::new();
    engine.channel_mut().available = false;

    engine.on_trigger(&mut session, Trigger::Refresh);

    // State still advances; nothing was sent
    assert!(matches!(session.state(), ProtocolState::AwaitingListLength));
    assert!(engine.channel_mut().drain().is_empty());

    // A lazy request that cannot be sent leaves the state alone
    let mut engine = common::engine();
    let mut session = Session::new();
    load_catalog(&mut engine, &mut session, 12);
    engine.channel_mut().available = false;
    assert!(!engine.request_more_names_if_needed(&mut session, 10));
    assert!(session.state().is_idle());
}
