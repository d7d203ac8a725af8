use latencydb_stress_tests::server::pick_free_ports;

// Only `pick_free_ports` is testable without a built server binary.
// `ServerProcess::build_and_spawn` invokes cargo, spawns the server and polls
// it over TCP, and `ServerProcess::drop` kills that child; both run on every
// stress invocation instead.

#[test]
fn test_single_free_port_is_bindable() {
    let ports = pick_free_ports(1).unwrap();
    assert_eq!(ports.len(), 1);
    assert!(ports[0] > 0, "port must be non-zero");
    let listener = std::net::TcpListener::bind(("127.0.0.1", ports[0]));
    assert!(listener.is_ok(), "port {} should be bindable after release", ports[0]);
}

#[test]
fn test_multiple_free_ports_are_distinct() {
    let mut ports = pick_free_ports(4).unwrap();
    ports.sort_unstable();
    ports.dedup();
    assert_eq!(ports.len(), 4, "ports must be distinct");
}

#[test]
fn test_zero_ports() {
    assert!(pick_free_ports(0).unwrap().is_empty());
}
