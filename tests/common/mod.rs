//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use mcp_bootstrap::bootstrap::{BootstrapContext, BootstrapError, BootstrapPlan, Sequencer};
use mcp_bootstrap::capability::EnvironmentProbe;
use mcp_bootstrap::lifecycle::Shutdown;
use mcp_bootstrap::service::ServiceRegistry;
use mcp_bootstrap::RuntimeConfig;

/// A port that was free a moment ago.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// A request seen by a mock backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub user_agent: Option<String>,
}

/// Start a mock backend answering per path. Returns its address and a log of requests.
#[allow(dead_code)]
pub async fn start_mock_backend<F>(respond: F) -> (SocketAddr, Arc<Mutex<Vec<SeenRequest>>>)
where
    F: Fn(&str) -> (u16, &'static str, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let log = Arc::clone(&seen);
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let respond = Arc::clone(&respond);
                    let log = Arc::clone(&log);
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let request = parse_head(&head);
                        let (status, content_type, body) = respond(&request.path);
                        log.lock().unwrap().push(request);

                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            405 => "405 Method Not Allowed",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            content_type,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, seen)
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

fn parse_head(head: &str) -> SeenRequest {
    let mut lines = head.lines();
    let path = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let user_agent = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("user-agent"))
        .map(|(_, value)| value.trim().to_string());
    SeenRequest { path, user_agent }
}

/// A bootstrap run serving on a background thread.
#[allow(dead_code)]
pub struct RunningBootstrap {
    pub tier: u8,
    pub name: String,
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl RunningBootstrap {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the async tiers. The raw socket tier ignores this.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

/// Run the standard plan on its own thread, which owns the tier's runtime.
///
/// Resolves once a tier is bound, or with the sequencer's error.
#[allow(dead_code)]
pub async fn start_bootstrap(
    config: RuntimeConfig,
    registry: ServiceRegistry,
) -> Result<RunningBootstrap, BootstrapError> {
    let shutdown = Shutdown::new();
    let (tx, rx) = oneshot::channel();

    let stop = shutdown.clone();
    std::thread::spawn(move || {
        let registry = Arc::new(registry);
        let probe = EnvironmentProbe::new(Arc::clone(&registry), &config);
        let ctx = BootstrapContext::new(&config, &probe, &registry).with_shutdown(stop);

        let mut sequencer = Sequencer::from_plan(BootstrapPlan::standard(&config));
        match sequencer.select(&ctx) {
            Ok(serving) => {
                let bound = (serving.tier, serving.name.clone(), serving.server.local_addr());
                let _ = tx.send(Ok(bound));
                let _ = serving.serve();
            }
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }
    });

    let (tier, name, addr) = rx.await.expect("bootstrap thread ended without reporting")?;
    Ok(RunningBootstrap {
        tier,
        name,
        addr,
        shutdown,
    })
}

/// Loopback config on an ephemeral port.
#[allow(dead_code)]
pub fn loopback_config() -> RuntimeConfig {
    RuntimeConfig::new("127.0.0.1", 0)
}
