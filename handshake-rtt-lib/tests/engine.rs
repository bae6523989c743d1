mod helpers;

use handshake_rtt_lib::correlation::extract_tuple;
use handshake_rtt_lib::telemetry::build_metrics;
use handshake_rtt_lib::{
    DecodedPacket, HandshakeError, NetworkLayer, Progress, TcpFlags, TupleError, Vantage,
};
use helpers::*;
use prometheus::Registry;
use std::time::Duration;

fn unrelated_syn(ms: u64, client_port: u16) -> DecodedPacket {
    tcp_v4(at(ms), CLIENT, client_port, SERVER, 80, 1, 0, TcpFlags::SYN)
}

#[test]
fn completed_handshake_yields_one_sample_and_retires() -> TestResult {
    let h = harness(Vantage::Server);
    let [syn, syn_ack, ack] = handshake(0, 5, 8);
    let key = extract_tuple(&syn)?;

    assert_eq!(h.engine.process(syn)?, Progress::Syn);
    assert_eq!(h.engine.process(syn_ack)?, Progress::SynAck);
    assert!(h.table.contains(&key));
    assert_eq!(h.engine.process(ack)?, Progress::Completed(Duration::from_millis(3)));

    assert_eq!(h.table.samples(), vec![Duration::from_millis(3)]);
    assert!(!h.table.contains(&key));
    assert!(h.table.is_empty());
    Ok(())
}

#[test]
fn client_vantage_measures_syn_to_syn_ack() -> TestResult {
    let h = harness(Vantage::Client);
    for packet in handshake(0, 5, 8) {
        h.engine.process(packet)?;
    }
    assert_eq!(h.table.samples(), vec![Duration::from_millis(5)]);
    Ok(())
}

#[test]
fn ack_before_syn_ack_is_rejected_without_side_effects() -> TestResult {
    let h = harness(Vantage::Server);
    let syn = client_syn(0, 1000);
    let key = extract_tuple(&syn)?;
    h.engine.process(syn)?;

    let before = h.table.get(&key);
    let result = h.engine.process(client_ack(8, 1001, 5001));
    assert_eq!(result, Err(HandshakeError::NoSynAck));

    let after = h.table.get(&key);
    let (Some(before), Some(after)) = (before, after) else {
        return Err("connection state disappeared".into());
    };
    assert_eq!(before.syn(), after.syn());
    assert!(after.syn_ack().is_none());
    assert!(after.ack().is_none());
    assert!(h.table.samples().is_empty());
    Ok(())
}

#[test]
fn ack_for_unknown_connection_is_rejected() {
    let h = harness(Vantage::Server);
    assert_eq!(h.engine.process(client_ack(0, 1001, 5001)), Err(HandshakeError::NoSynAck));
    assert!(h.table.samples().is_empty());
}

#[test]
fn syn_ack_without_syn_is_rejected() {
    let h = harness(Vantage::Server);
    let result = h.engine.process(server_syn_ack(5, 5000, 1001));
    assert_eq!(result, Err(HandshakeError::NoSyn));
}

#[test]
fn mismatched_acknowledgement_is_not_part_of_handshake() -> TestResult {
    let h = harness(Vantage::Server);
    h.engine.process(client_syn(0, 1000))?;
    assert_eq!(
        h.engine.process(server_syn_ack(5, 5000, 1002)),
        Err(HandshakeError::NonHandshakeAck)
    );

    h.engine.process(server_syn_ack(5, 5000, 1001))?;
    assert_eq!(
        h.engine.process(client_ack(8, 1001, 5002)),
        Err(HandshakeError::NonHandshakeAck)
    );
    assert!(h.table.samples().is_empty());

    assert!(matches!(
        h.engine.process(client_ack(9, 1001, 5001))?,
        Progress::Completed(_)
    ));
    Ok(())
}

#[test]
fn data_segments_are_ignored_but_keep_connection_alive() -> TestResult {
    let h = harness(Vantage::Server);
    let syn = client_syn(0, 1000);
    let key = extract_tuple(&syn)?;
    h.engine.process(syn)?;

    assert_eq!(h.engine.process(client_data(20_000, 1001, 5001))?, Progress::Ignored);
    assert_eq!(h.table.get(&key).map(|s| s.last_seen()), Some(at(20_000)));

    // 31s after the SYN but only 11s after the data segment.
    h.clock.set(at(31_000));
    assert_eq!(h.engine.process(client_data(31_000, 1001, 5001))?, Progress::Ignored);
    assert!(h.table.contains(&key));
    Ok(())
}

#[test]
fn retransmitted_syn_replaces_the_first() -> TestResult {
    let h = harness(Vantage::Client);
    h.engine.process(client_syn(0, 1000))?;
    h.engine.process(client_syn(1_000, 2000))?;

    // Acknowledges the retransmission, not the first SYN.
    h.engine.process(server_syn_ack(1_004, 5000, 2001))?;
    h.engine.process(client_ack(1_006, 2001, 5001))?;

    assert_eq!(h.table.samples(), vec![Duration::from_millis(4)]);
    Ok(())
}

#[test]
fn non_ip_packet_has_no_four_tuple() {
    let h = harness(Vantage::Server);
    let packet = DecodedPacket::new(base(), NetworkLayer::Other, None);
    let err = h.engine.process(packet);
    assert_eq!(err, Err(HandshakeError::NoFourTuple(TupleError::NotIp)));
    assert!(h.table.is_empty());
}

#[test]
fn idle_connection_is_pruned_on_next_packet() -> TestResult {
    let h = harness(Vantage::Server);
    let syn = client_syn(0, 1000);
    let key = extract_tuple(&syn)?;
    h.engine.process(syn)?;

    h.clock.set(at(29_000));
    h.engine.process(unrelated_syn(29_000, 40000))?;
    assert!(h.table.contains(&key));

    h.clock.set(at(31_000));
    h.engine.process(unrelated_syn(31_000, 40001))?;
    assert!(!h.table.contains(&key));

    // The SYN/ACK now finds no SYN to pair with.
    assert_eq!(
        h.engine.process(server_syn_ack(31_001, 5000, 1001)),
        Err(HandshakeError::NoSyn)
    );
    Ok(())
}

#[test]
fn backwards_timestamps_discard_the_handshake() -> TestResult {
    let h = harness(Vantage::Server);
    let [syn, syn_ack, ack] = handshake(0, 10, 4);
    let key = extract_tuple(&syn)?;
    h.engine.process(syn)?;
    h.engine.process(syn_ack)?;

    let result = h.engine.process(ack);
    assert_eq!(result, Err(HandshakeError::NegativeRtt(Duration::from_millis(6))));
    assert!(h.table.samples().is_empty());
    assert!(!h.table.contains(&key));
    Ok(())
}

#[test]
fn concurrent_handshakes_are_tracked_independently() -> TestResult {
    let h = harness(Vantage::Server);
    let other_port = CLIENT_PORT + 1;
    let other = |ms, seq, ack, flags| {
        tcp_v4(at(ms), CLIENT, other_port, SERVER, SERVER_PORT, seq, ack, flags)
    };
    let reply = |ms, seq, ack, flags| {
        tcp_v4(at(ms), SERVER, SERVER_PORT, CLIENT, other_port, seq, ack, flags)
    };

    h.engine.process(client_syn(0, 1000))?;
    h.engine.process(other(1, 7000, 0, TcpFlags::SYN))?;
    h.engine.process(server_syn_ack(5, 5000, 1001))?;
    h.engine.process(reply(6, 9000, 7001, TcpFlags::SYN | TcpFlags::ACK))?;
    assert_eq!(h.table.len(), 2);

    h.engine.process(other(16, 7001, 9001, TcpFlags::ACK))?;
    h.engine.process(client_ack(8, 1001, 5001))?;

    assert_eq!(h.table.samples(), vec![Duration::from_millis(10), Duration::from_millis(3)]);
    assert!(h.table.is_empty());
    Ok(())
}

#[test]
fn metrics_are_recorded_when_attached() -> TestResult {
    let registry = Registry::new();
    let (metrics, _provider) = build_metrics(&registry)?;
    let h = harness(Vantage::Server);
    let engine = h.engine.with_metrics(metrics);

    for packet in handshake(0, 5, 8) {
        engine.process(packet)?;
    }
    // Leaves an empty state behind for the pruning below.
    assert_eq!(engine.process(client_ack(9, 1, 1)), Err(HandshakeError::NoSynAck));

    h.clock.set(at(40_000));
    let not_ip = DecodedPacket::new(at(40_000), NetworkLayer::Other, None);
    assert!(engine.process(not_ip).is_err());
    assert!(h.table.is_empty());

    let [syn, syn_ack, ack] = handshake(40_000, 40_010, 40_004);
    engine.process(syn)?;
    engine.process(syn_ack)?;
    assert!(matches!(engine.process(ack), Err(HandshakeError::NegativeRtt(_))));

    let text = scrape(&registry);
    let value = |name: &str, label: &str| sample_value(&text, name, label);
    assert_eq!(value("handshake_rtt_packets_total", ""), Some(8.0), "{text}");
    assert_eq!(value("handshake_rtt_handshakes_completed_total", ""), Some(1.0));
    for kind in ["no_syn_ack", "not_ip", "negative_rtt"] {
        let label = format!("error_type=\"{kind}\"");
        assert_eq!(value("handshake_rtt_packet_errors_total", &label), Some(1.0), "{kind}");
    }
    assert_eq!(value("handshake_rtt_connections_pruned_total", ""), Some(1.0));
    assert_eq!(value("handshake_rtt_rtt_anomalies_total", ""), Some(1.0));
    assert_eq!(value("handshake_rtt_connections_tracked", ""), Some(0.0));
    assert!(!text.contains("_total_total"), "{text}");
    Ok(())
}

#[test]
fn rtt_histogram_resolves_milliseconds() -> TestResult {
    let registry = Registry::new();
    let (metrics, _provider) = build_metrics(&registry)?;
    let h = harness(Vantage::Server);
    let engine = h.engine.with_metrics(metrics);

    for packet in handshake(0, 5, 8) {
        engine.process(packet)?;
    }

    let text = scrape(&registry);
    let bucket = |le: &str| {
        sample_value(&text, "handshake_rtt_rtt_seconds_bucket", &format!("le=\"{le}\""))
    };
    assert_eq!(bucket("0.0025"), Some(0.0), "{text}");
    assert_eq!(bucket("0.005"), Some(1.0), "{text}");
    assert_eq!(sample_value(&text, "handshake_rtt_rtt_seconds_count", ""), Some(1.0));
    Ok(())
}
