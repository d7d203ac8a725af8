use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::{Duration, Instant};

pub struct ServerProcess {
    child: Child,
    pub addr: SocketAddr,
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        self.child.kill().ok();
    }
}

/// Ask the OS for `count` distinct unused local ports. All listeners stay
/// bound until every port is read so no port is handed out twice.
pub fn pick_free_ports(count: usize) -> std::io::Result<Vec<u16>> {
    let listeners = (0..count)
        .map(|_| std::net::TcpListener::bind("127.0.0.1:0"))
        .collect::<std::io::Result<Vec<_>>>()?;
    listeners.iter().map(|l| l.local_addr().map(|a| a.port())).collect()
}

/// Return the path to the `latencydb-server` binary that sits alongside this
/// executable in `target/debug/` (or `target/debug/deps/` when run as a test).
fn server_binary_path() -> Result<PathBuf, String> {
    let mut path = std::env::current_exe().map_err(|e| format!("cannot determine own executable path: {e}"))?;
    path.pop(); // remove own filename
    if path.file_name().map(|n| n == "deps").unwrap_or(false) {
        path.pop(); // step out of target/debug/deps → target/debug/
    }
    path.push("latencydb-server");
    Ok(path)
}

const READY_TIMEOUT: Duration = Duration::from_secs(30);

impl ServerProcess {
    /// Build the `latencydb-server` binary, spawn it on a free local port, wait
    /// until it accepts connections, and return the live process.
    ///
    /// Returns `Err` if the build fails, the process cannot be spawned, or the
    /// readiness deadline elapses.  The caller maps this error to exit code 3.
    pub fn build_and_spawn() -> Result<Self, String> {
        let status = Command::new("cargo")
            .args(["build", "-p", "latencydb-server"])
            .status()
            .map_err(|e| format!("Failed to invoke cargo build: {e}"))?;
        if !status.success() {
            return Err(format!("cargo build -p latencydb-server failed: {status}"));
        }

        let port = pick_free_ports(1).map_err(|e| format!("Failed to reserve a port: {e}"))?[0];
        let addr: SocketAddr = SocketAddr::from(([127, 0, 0, 1], port));

        let child = Command::new(server_binary_path()?)
            .args(["--address", &addr.to_string(), "--log-filter", "warn"])
            .spawn()
            .map_err(|e| format!("Failed to spawn server: {e}"))?;
        // If polling fails, `server` drops here and kills the process.
        let server = ServerProcess { child, addr };

        poll_until_ready(addr, Instant::now() + READY_TIMEOUT)
            .map_err(|e| format!("Server not ready within timeout: {e}"))?;

        Ok(server)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Poll `addr` with a TCP connect attempt until the connection succeeds
/// or `deadline` is reached.
///
/// axum starts accepting the moment it binds, so a successful `connect`
/// implies it will also answer HTTP requests.
fn poll_until_ready(addr: SocketAddr, deadline: Instant) -> Result<(), String> {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(format!("timed out waiting for {addr}"));
        }
        let probe = Duration::min(remaining, Duration::from_millis(200));
        if TcpStream::connect_timeout(&addr, probe).is_ok() {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
